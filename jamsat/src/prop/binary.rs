//! Propagation of binary clauses.
use jamsat_formula::Lit;

use crate::context::Context;

use super::enqueue_assignment;
use super::{Conflict, Reason};

/// Propagate all literals implied by the given literal via binary clauses.
///
/// On conflict return the binary clause propgating the conflicting assignment.
pub fn propagate_binary(ctx: &mut Context, lit: Lit) -> Result<(), Conflict> {
    for i in 0..ctx.binary_clauses.implied(lit).len() {
        let implied = ctx.binary_clauses.implied(lit)[i];

        if ctx.assignment.lit_is_false(implied) {
            return Err(Conflict::Binary([implied, !lit]));
        } else if !ctx.assignment.lit_is_true(implied) {
            enqueue_assignment(ctx, implied, Reason::Binary([!lit]));
        }
    }

    Ok(())
}
