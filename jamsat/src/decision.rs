//! Decision heuristics.

pub mod vsids;

use crate::context::Context;
use crate::prop::{enqueue_assignment, Reason};
use jamsat_formula::lit::{Lit, Var};

/// Make a variable available for future decisions again.
///
/// Called when a variable becomes unassigned, either because it was just allocated or because a
/// backtrack undid its assignment.
pub fn make_available(ctx: &mut Context, var: Var) {
    ctx.vsids.make_available(var);
}

/// Make a decision and enqueue it.
///
/// Picks the unassigned variable with the highest VSIDS activity and assigns it to its saved
/// phase, defaulting to false for variables that were never assigned before.
///
/// Returns `false` if no decision was made because all variables are assigned.
pub fn make_decision(ctx: &mut Context) -> bool {
    while let Some(var) = ctx.vsids.next() {
        if ctx.assignment.var_value(var).is_some() {
            // Already assigned, e.g. by a unit clause added after the variable was made
            // available. Skip it and keep looking.
            continue;
        }

        let decision = Lit::from_var(var, ctx.assignment.last_var_value(var));

        ctx.trail.new_decision_level();
        enqueue_assignment(ctx, decision, Reason::Unit);

        return true;
    }
    false
}
