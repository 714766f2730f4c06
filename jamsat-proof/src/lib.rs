//! Proof steps exchanged between the JamSAT solver and an independent proof checker.
//!
//! The solver emits a [`ProofStep`] for every clause-learning, clause-deletion and
//! model/failed-assumption event; [`binary_format`] gives these steps a compact
//! native on-disk representation distinct from the external binary-DRAT format
//! the solver also supports (see `jamsat::proof::drat`).
use jamsat_formula::Lit;

pub mod binary_format;

mod vli_enc;

/// Integer type used to store a hash of a clause.
pub type ClauseHash = u64;

/// Hash a single literal.
///
/// Multiple literals can be combined with xor, as done in [`clause_hash`].
pub fn lit_hash(lit: Lit) -> ClauseHash {
    lit_code_hash(lit.code())
}

/// Hash a single literal from a code.
///
/// This doesn't require the code to correspond to a valid literal.
pub fn lit_code_hash(lit_code: usize) -> ClauseHash {
    // Constant based on the golden ratio provides good mixing for the resulting upper bits
    (!(lit_code as u64)).wrapping_mul(0x61c8_8646_80b5_83eb_u64)
}

/// A fast hash function for clauses (or other *sets* of literals).
///
/// This hash function interprets the given slice as a set and will not change when the input is
/// permuted. It does not handle duplicated items.
pub fn clause_hash(lits: &[Lit]) -> ClauseHash {
    let mut hash = 0;
    for &lit in lits {
        hash ^= lit_hash(lit);
    }
    hash
}

/// Justifications for a simple clause deletion.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DeleteClauseProof {
    /// The clause is known to be redundant.
    Redundant,
    /// The clause is irredundant and subsumed by the clause added in the previous step.
    Simplified,
    /// The clause contains a true literal.
    ///
    /// Also used to justify deletion of tautological clauses.
    Satisfied,
}

/// A single proof step.
///
/// Represents a mutation of the current formula and a justification for the mutation's validity.
#[derive(Copy, Clone, Debug)]
pub enum ProofStep<'a> {
    /// Add a new input clause.
    ///
    /// Only emitted for clauses added incrementally after an initial solve call.
    AddClause { clause: &'a [Lit] },
    /// Add a clause that is an asymmetric tautology (AT).
    ///
    /// Assuming the negation of the clause's literals leads to a unit propagation conflict.
    ///
    /// The second slice contains the hashes of all clauses involved in the resulting conflict, in
    /// the order in which they propagate when all literals of the clause are set false. Ignored
    /// when generating DRAT proofs.
    AtClause {
        redundant: bool,
        clause: &'a [Lit],
        propagation_hashes: &'a [ClauseHash],
    },
    /// Unit clauses found by top-level unit propagation.
    ///
    /// Pairs of unit clauses and the original clause that became unit, in chronological order.
    /// Ignored when generating DRAT proofs.
    UnitClauses(&'a [(Lit, ClauseHash)]),
    /// Delete a clause consisting of the given literals.
    DeleteClause {
        clause: &'a [Lit],
        proof: DeleteClauseProof,
    },
    /// A (partial) assignment that satisfies all clauses and assumptions.
    Model(&'a [Lit]),
    /// Change the active set of assumptions.
    ///
    /// Checked against future model or failed-assumptions steps.
    Assumptions(&'a [Lit]),
    /// A subset of the assumptions that make the formula unsat.
    FailedAssumptions {
        failed_core: &'a [Lit],
        propagation_hashes: &'a [ClauseHash],
    },
    /// Signals the end of a proof.
    ///
    /// A proof must end with this step or else the checker reports an incomplete proof.
    End,
}

impl<'a> ProofStep<'a> {
    /// Does this proof step use clause hashes?
    pub fn contains_hashes(&self) -> bool {
        matches!(
            self,
            ProofStep::AtClause { .. }
                | ProofStep::UnitClauses(..)
                | ProofStep::FailedAssumptions { .. }
        )
    }
}
