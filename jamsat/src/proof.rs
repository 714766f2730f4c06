//! Proof generation.
//!
//! The solver emits [`jamsat_proof::ProofStep`]s for every learned/deleted clause and every
//! assumption-related event. They are written out either in JamSAT's native format (verified by
//! the independent `jamsat-checker` crate) or as DRAT/binary DRAT for general-purpose checkers.
use std::io::{sink, BufWriter, Write};

use jamsat_formula::lit::Lit;
pub use jamsat_proof::{clause_hash, lit_hash, ClauseHash, DeleteClauseProof, ProofStep};
use jamsat_proof::binary_format;

/// Proof formats that can be generated during solving.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProofFormat {
    /// JamSAT's native format, verified by `jamsat-checker`.
    Native,
    Drat,
    BinaryDrat,
}

/// Proof generation.
pub struct Proof {
    format: Option<ProofFormat>,
    target: BufWriter<Box<dyn Write>>,
}

impl Default for Proof {
    fn default() -> Proof {
        Proof {
            format: None,
            target: BufWriter::new(Box::new(sink())),
        }
    }
}

macro_rules! handle_io_errors {
    ($s:expr, $e:expr) => {{
        let res = $e;
        $s.handle_io_errors(res)
    }};
}

impl Proof {
    /// Start writing proof steps to the given target with the given format.
    pub fn write_proof(&mut self, target: impl Write + 'static, format: ProofFormat) {
        self.format = Some(format);
        self.target = BufWriter::new(Box::new(target))
    }

    /// Stop writing proof steps.
    pub fn close_proof(&mut self) {
        if self.format.is_some() {
            self.add_step(&ProofStep::End);
        }
        // We need to explicitly flush to handle IO errors.
        handle_io_errors!(self, self.target.flush());
        self.format = None;
        self.target = BufWriter::new(Box::new(sink()));
    }

    /// Whether proof generation is active.
    pub fn is_active(&self) -> bool {
        self.format.is_some()
    }

    /// Whether clause hashes are required for steps that support them.
    ///
    /// Only the native format uses them; DRAT checkers re-derive unit propagation themselves.
    pub fn clause_hashes_required(&self) -> bool {
        self.format == Some(ProofFormat::Native)
    }

    /// Whether unit clauses discovered through unit propagation have to be proven.
    pub fn prove_propagated_unit_clauses(&self) -> bool {
        self.clause_hashes_required()
    }

    /// Add a step to the proof.
    ///
    /// Ignored when proof generation is disabled.
    pub fn add_step(&mut self, step: &ProofStep) {
        match self.format {
            None => (),
            Some(ProofFormat::Native) => self.write_native_step(step),
            Some(ProofFormat::Drat) | Some(ProofFormat::BinaryDrat) => self.write_drat_step(step),
        }
    }

    /// Writes a proof step in JamSAT's native format.
    fn write_native_step(&mut self, step: &ProofStep) {
        handle_io_errors!(self, binary_format::write_step(&mut self.target, step));
    }

    /// Writes a proof step in DRAT or binary DRAT format.
    fn write_drat_step(&mut self, step: &ProofStep) {
        match *step {
            ProofStep::AtClause { clause, .. } | ProofStep::AddClause { clause } => {
                self.drat_add_clause();
                self.drat_literals(clause)
            }
            ProofStep::DeleteClause { clause, .. } => {
                self.drat_delete_clause();
                self.drat_literals(clause);
            }
            ProofStep::UnitClauses(..)
            | ProofStep::Model(..)
            | ProofStep::Assumptions(..)
            | ProofStep::FailedAssumptions { .. }
            | ProofStep::End => (),
        }
    }

    /// Writes an add clause step to the DRAT proof.
    fn drat_add_clause(&mut self) {
        if self.format == Some(ProofFormat::BinaryDrat) {
            handle_io_errors!(self, self.target.write_all(b"a"));
        }
    }

    /// Writes a delete clause step to the DRAT proof.
    fn drat_delete_clause(&mut self) {
        if self.format == Some(ProofFormat::BinaryDrat) {
            handle_io_errors!(self, self.target.write_all(b"d"));
        } else {
            handle_io_errors!(self, self.target.write_all(b"d "));
        }
    }

    /// Writes the literals of a clause for a step in a DRAT proof.
    fn drat_literals(&mut self, literals: &[Lit]) {
        if self.format == Some(ProofFormat::BinaryDrat) {
            for &lit in literals {
                let drat_code = lit.code() as u64 + 2;
                handle_io_errors!(self, leb128::write::unsigned(&mut self.target, drat_code));
            }
            handle_io_errors!(self, self.target.write_all(&[0]));
        } else {
            for &lit in literals {
                handle_io_errors!(self, itoa::write(&mut self.target, lit.to_dimacs()));
                handle_io_errors!(self, self.target.write_all(b" "));
            }
            handle_io_errors!(self, self.target.write_all(b"0\n"));
        }
    }

    /// Handles IO errors.
    ///
    /// Right now this panics. In the future it should set an error flag that will be checked in the
    /// solver main loop to abort when proof writing failed.
    fn handle_io_errors<V, E: std::fmt::Debug>(&self, result: Result<V, E>) -> Option<V> {
        // TODO better error handling
        // on error we want to abort solving eventually but not panic
        // we also don't want to force error handling on proof generating code
        Some(result.expect("unable to write to proof file"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use std::fs::File;
    use std::process::Command;

    use tempfile::TempDir;

    use jamsat_dimacs::write_dimacs;

    use crate::solver::Solver;

    use jamsat_formula::test::sgen_unsat_formula;

    proptest! {

        #[cfg_attr(not(test_drat_trim), ignore)]
        #[test]
        fn sgen_unsat_drat(
            formula in sgen_unsat_formula(1..7usize),
        ) {
            let mut solver = Solver::new();

            let tmp = TempDir::new()?;

            let drat_proof = tmp.path().join("proof.drat");
            let cnf_file = tmp.path().join("input.cnf");

            write_dimacs(&mut File::create(&cnf_file)?, &formula)?;

            solver.write_proof(File::create(&drat_proof)?, ProofFormat::Drat);

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(false));

            solver.close_proof();

            let output = Command::new("drat-trim")
                .arg(&cnf_file)
                .arg(&drat_proof)
                .output()?;

            prop_assert!(std::str::from_utf8(&output.stdout)?.contains("s VERIFIED"));
        }

        #[cfg_attr(not(test_drat_trim), ignore)]
        #[test]
        fn sgen_unsat_binary_drat(
            formula in sgen_unsat_formula(1..7usize),
        ) {
            let mut solver = Solver::new();

            let tmp = TempDir::new()?;

            let drat_proof = tmp.path().join("proof.bdrat");
            let cnf_file = tmp.path().join("input.cnf");

            write_dimacs(&mut File::create(&cnf_file)?, &formula)?;

            solver.write_proof(File::create(&drat_proof)?, ProofFormat::BinaryDrat);

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(false));

            solver.close_proof();

            let output = Command::new("drat-trim")
                .arg(&cnf_file)
                .arg(&drat_proof)
                .arg("-i")
                .output()?;

            prop_assert!(std::str::from_utf8(&output.stdout)?.contains("s VERIFIED"));
        }
    }
}
