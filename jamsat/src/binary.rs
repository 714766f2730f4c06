//! Binary clauses.

use jamsat_formula::lit::Lit;

use crate::context::Context;

/// Binary clauses.
#[derive(Default)]
pub struct BinaryClauses {
    by_lit: Vec<Vec<Lit>>,
    count: usize,
}

impl BinaryClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a binary clause.
    pub fn add_binary_clause(&mut self, lits: [Lit; 2]) {
        for i in 0..2 {
            self.by_lit[(!lits[i]).code()].push(lits[i ^ 1]);
        }
        self.count += 1;
    }

    /// Implications of a given literal
    pub fn implied(&self, lit: Lit) -> &[Lit] {
        &self.by_lit[lit.code()]
    }

    /// Number of binary clauses.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Remove binary clauses that are satisfied or subsumed by the current (level 0) assignment.
///
/// Called during simplification after unit propagation has fixed some variables permanently.
/// Rebuilds the whole `by_lit` table, since a single false literal in a binary clause means the
/// clause no longer constrains anything (it would have already propagated its other literal).
pub fn simplify_binary(ctx: &mut Context) {
    let var_count = ctx.binary_clauses.by_lit.len() / 2;
    let old_by_lit = std::mem::replace(&mut ctx.binary_clauses.by_lit, vec![vec![]; var_count * 2]);

    let mut entries = 0;

    for lit_code in 0..old_by_lit.len() {
        let lit = Lit::from_code(lit_code);
        if ctx.assignment.lit_is_false(lit) {
            // The clause (lit, other) is equivalent to (other), already enforced at level 0.
            continue;
        }
        for &other in &old_by_lit[lit_code] {
            if ctx.assignment.lit_is_true(lit) || ctx.assignment.lit_is_true(other) {
                // Clause satisfied by the fixed assignment, drop it.
                continue;
            }
            if ctx.assignment.lit_is_false(other) {
                // The clause degenerates to (lit), which is already implied at level 0.
                continue;
            }
            ctx.binary_clauses.by_lit[lit_code].push(other);
            entries += 1;
        }
    }

    ctx.binary_clauses.count = entries / 2;
}
