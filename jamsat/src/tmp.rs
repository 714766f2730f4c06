//! Temporary data.
use jamsat_formula::{Lit, Var};

/// Temporary data used by various parts of the solver.
///
/// Make sure to check any documented invariants when using this. Also make sure to check all
/// existing users when adding invariants.
#[derive(Default)]
pub struct TmpData {
    pub lits: Vec<Lit>,
    pub lits_2: Vec<Lit>,
    /// A boolean for each literal.
    ///
    /// Reset to all-false, keep size.
    pub flags: Vec<bool>,
    /// Per-variable stamp used by the clause minimizer and the simplifier.
    ///
    /// A variable is stamped iff `stamps[v] == generation`. Bumping `generation` resets every
    /// variable's stamp in O(1); the backing vector is only wiped on generation overflow.
    stamps: Vec<u32>,
    generation: u32,
}

impl TmpData {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.flags.resize(count * 2, false);
        self.stamps.resize(count, 0);
    }

    /// Start a new stamping pass.
    pub fn new_stamp_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            for stamp in self.stamps.iter_mut() {
                *stamp = 0;
            }
            self.generation = 1;
        }
    }

    pub fn is_stamped(&self, var: Var) -> bool {
        self.stamps[var.index()] == self.generation
    }

    pub fn stamp(&mut self, var: Var) {
        self.stamps[var.index()] = self.generation;
    }
}
