//! Unit propagation.
pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{
    backtrack, enqueue_assignment, enqueue_assignment_fields, full_restart, restart, Assignment,
    Trail,
};
pub use binary::propagate_binary;
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use long::propagate_long;
pub use watch::{Watch, Watchlists};

use crate::context::Context;

/// Rebuild the watchlists from scratch.
///
/// Needed after a clause database garbage collection, which invalidates watches since clauses
/// may have moved. Requires the trail to be empty (watches only need to be correct for
/// unassigned/true literals reachable from further propagation).
fn rebuild_watchlists(ctx: &mut Context) {
    for &cref in ctx.clause_db.clauses().to_vec().iter() {
        let header = ctx.clause_alloc.header(cref);
        if header.deleted() {
            continue;
        }
        let lits = ctx.clause_alloc.clause(cref).lits();
        if lits.len() >= 2 {
            ctx.watchlists.watch_clause(cref, [lits[0], lits[1]]);
        }
    }
    ctx.watchlists.enable();
}

/// Propagate all consequences of the assignments already on the trail.
///
/// Processes the trail queue until either it is exhausted or a conflict is found.
pub fn propagate(ctx: &mut Context) -> Result<(), Conflict> {
    if !ctx.watchlists.enabled() {
        rebuild_watchlists(ctx);
    }

    while let Some(lit) = ctx.trail.pop_queue() {
        propagate_binary(ctx, lit)?;
        propagate_long(ctx, lit)?;
    }

    Ok(())
}
