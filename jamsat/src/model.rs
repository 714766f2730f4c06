//! Model reconstruction.

use jamsat_formula::lit::{Lit, Var};
use jamsat_proof::ProofStep;

use crate::context::Context;
use crate::state::SatState;

/// A satisfying assignment.
#[derive(Default)]
pub struct Model {
    assignment: Vec<Option<bool>>,
}

impl Model {
    /// The assignment, indexed by variable. Only valid while the solver state is `Sat`.
    pub fn assignment(&self) -> &[Option<bool>] {
        &self.assignment
    }

    /// Whether a given literal is true in the model.
    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.assignment[lit.index()] == Some(lit.is_positive())
    }
}

/// Snapshot the current (fully propagated, decision-free) assignment as the solver's model.
pub fn reconstruct_model(ctx: &mut Context) {
    ctx.model.assignment.clear();
    ctx.model.assignment.extend_from_slice(ctx.assignment.assignment());

    if ctx.proof.is_active() {
        let lits: Vec<Lit> = ctx
            .model
            .assignment
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                value.map(|polarity| Lit::from_var(Var::from_index(index), polarity))
            })
            .collect();
        ctx.proof.add_step(&ProofStep::Model(&lits));
    }

    ctx.solver_state.sat_state = SatState::Sat;
}
