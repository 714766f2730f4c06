//! Variable bookkeeping.

use jamsat_formula::lit::Var;

/// Tracks how many variables the solver knows about.
///
/// JamSAT uses the DIMACS variables directly as solver variables: there is no separate
/// user/global/solver variable remapping, so this only needs to track the high watermark. New
/// variables are registered with [`Context::ensure_var_count`](crate::context::Context::ensure_var_count),
/// which grows every other per-variable table to match.
#[derive(Default)]
pub struct Variables {
    max_var: Option<Var>,
}

impl Variables {
    /// Number of variables allocated so far.
    pub fn watermark(&self) -> usize {
        self.max_var.map_or(0, |var| var.index() + 1)
    }

    /// Registers `var` as known to the solver, growing the watermark if necessary.
    pub fn increase_max_var(&mut self, var: Var) {
        if self.max_var.map_or(true, |max| var > max) {
            self.max_var = Some(var);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_tracks_highest_var() {
        let mut variables = Variables::default();
        assert_eq!(variables.watermark(), 0);

        variables.increase_max_var(Var::from_index(3));
        assert_eq!(variables.watermark(), 4);

        variables.increase_max_var(Var::from_index(1));
        assert_eq!(variables.watermark(), 4);

        variables.increase_max_var(Var::from_index(7));
        assert_eq!(variables.watermark(), 8);
    }
}
