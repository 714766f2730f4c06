//! Boolean satisfiability solver.
use std::io;

use anyhow::Error;
use log::info;

use jamsat_formula::cnf::CnfFormula;
use jamsat_formula::lit::{Lit, Var};

use jamsat_dimacs::DimacsParser;

use crate::assumptions::set_assumptions;
use crate::config::SolverConfig;
use crate::context::Context;
use crate::load::load_clause;
use crate::proof::ProofFormat;
use crate::schedule::schedule_step;
use crate::state::SatState;

/// A boolean satisfiability solver.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Replace the solver's configuration.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.ctx.solver_config = config;
        self.ctx.config_changed();
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        if formula.var_count() > 0 {
            self.ctx
                .variables
                .increase_max_var(Var::from_index(formula.var_count() - 1));
            self.ctx.ensure_var_count();
        }
        for clause in formula.iter() {
            load_clause(&mut self.ctx, clause);
        }
    }

    /// Add a single clause to the solver.
    pub fn add_clause(&mut self, lits: &[Lit]) {
        for &lit in lits {
            self.ctx.variables.increase_max_var(lit.var());
        }
        self.ctx.ensure_var_count();
        load_clause(&mut self.ctx, lits);
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = DimacsParser::new();

        loop {
            let data = buffer.fill_buf()?;
            if data.is_empty() {
                break;
            }
            parser.parse_chunk(data)?;
            let len = data.len();
            buffer.consume(len);

            self.add_formula(&parser.take_formula());
        }
        parser.eof()?;
        self.add_formula(&parser.take_formula());
        parser.check_header()?;

        info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Restrict the next call to [`Solver::solve`] to assignments satisfying `assumptions`.
    ///
    /// Assumptions stay active until the next call to [`Solver::assume`], [`Solver::add_formula`]
    /// or [`Solver::add_clause`].
    pub fn assume(&mut self, assumptions: &[Lit]) {
        set_assumptions(&mut self.ctx, assumptions);
    }

    /// The subset of the active assumptions that made the formula unsatisfiable.
    ///
    /// Only meaningful right after [`Solver::solve`] returned `Some(false)` while assumptions
    /// were active.
    pub fn failed_core(&self) -> Option<&[Lit]> {
        if self.ctx.solver_state.sat_state == SatState::UnsatUnderAssumptions {
            Some(self.ctx.assumptions.failed_core())
        } else {
            None
        }
    }

    /// Check the satisfiability of the current formula.
    pub fn solve(&mut self) -> Option<bool> {
        while schedule_step(&mut self.ctx) {}

        match self.ctx.solver_state.sat_state {
            SatState::Unknown => None,
            SatState::Sat => Some(true),
            SatState::Unsat | SatState::UnsatUnderAssumptions => Some(false),
        }
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only `Some` right after [`Solver::solve`] returned `Some(true)`.
    pub fn model(&self) -> Option<Vec<Lit>> {
        if self.ctx.solver_state.sat_state == SatState::Sat {
            Some(
                self.ctx
                    .model
                    .assignment()
                    .iter()
                    .enumerate()
                    .filter_map(|(index, assignment)| {
                        assignment.map(|polarity| Lit::from_var(Var::from_index(index), polarity))
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    /// Start writing proof steps to the given target with the given format.
    pub fn write_proof(&mut self, target: impl io::Write + 'static, format: ProofFormat) {
        self.ctx.proof.write_proof(target, format);
    }

    /// Stop writing proof steps.
    pub fn close_proof(&mut self) {
        self.ctx.proof.close_proof();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use jamsat_dimacs::write_dimacs;
    use jamsat_formula::test::{sat_formula, sgen_unsat_formula};

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(false));
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            let mut last_state = Some(true);

            for clause in formula.iter() {
                let single_clause = CnfFormula::from(Some(clause));
                solver.add_formula(&single_clause);

                let state = solver.solve();
                if state != last_state {
                    prop_assert_eq!(state, Some(false));
                    prop_assert_eq!(last_state, Some(true));
                    last_state = state;
                }
            }

            prop_assert_eq!(last_state, Some(false));
        }
    }
}
