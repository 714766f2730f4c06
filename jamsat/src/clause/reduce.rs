//! Clause database reduction (Glucose-style, driven by glue/LBD).
use std::mem::replace;

use crate::context::Context;
use crate::vec_mut_scan::VecMutScan;

use super::db::{set_tier, try_delete_clause};
use super::Tier;

/// Remove deleted and duplicate entries from the by_tier clause lists.
///
/// This has the side effect of setting the mark bit on all clauses of the tier.
pub fn dedup_and_mark_by_tier(ctx: &mut Context, tier: Tier) {
    let alloc = &mut ctx.clause_alloc;
    let by_tier = &mut ctx.clause_db.by_tier[tier as usize];

    by_tier.retain(|&cref| {
        let header = alloc.header_mut(cref);
        let retain = !header.deleted() && !header.mark() && header.tier() == tier;
        if retain {
            header.set_mark(true);
        }
        retain
    })
}

/// Reduce the local tier by deleting roughly the least glue-worthy half, Glucose-style.
///
/// Clauses are sorted by `(glue ascending, size ascending)`, the lower-glue half is kept
/// unconditionally as "known-good", and deletion of the upper half is skipped entirely if the
/// tier's median glue is already `<= 3` (still glue-like, not worth collapsing the tier over).
pub fn reduce_locals(ctx: &mut Context) {
    dedup_and_mark_by_tier(ctx, Tier::Local);

    let mut locals = replace(&mut ctx.clause_db.by_tier[Tier::Local as usize], vec![]);

    locals.sort_unstable_by_key(|&cref| {
        let header = ctx.clause_alloc.header(cref);
        (header.glue(), header.len())
    });

    let known_good = locals.len() / 2;
    let median_glue = locals
        .get(locals.len() / 2)
        .map(|&cref| ctx.clause_alloc.header(cref).glue());

    let mut to_delete = if median_glue.map_or(false, |glue| glue <= 3) {
        0
    } else {
        locals.len() - known_good
    };

    let mut scan = VecMutScan::new(&mut locals);
    let mut kept = 0;

    while let Some(cref) = scan.next() {
        ctx.clause_alloc.header_mut(*cref).set_mark(false);

        if kept < known_good {
            kept += 1;
            continue;
        }

        if to_delete > 0 && try_delete_clause(ctx, *cref) {
            cref.remove();
            to_delete -= 1;
        }
    }

    drop(scan);

    ctx.clause_db.count_by_tier[Tier::Local as usize] = locals.len();
    ctx.clause_db.by_tier[Tier::Local as usize] = locals;
}

/// Reduce the number of mid tier clauses by demoting inactive ones to the local tier.
///
/// A mid-tier clause is kept at its tier for one more reduction round if it participated in a
/// conflict (its `active` scratch bit, set by [`crate::analyze_conflict`]) since the last pass.
pub fn reduce_mids(ctx: &mut Context) {
    dedup_and_mark_by_tier(ctx, Tier::Mid);

    let mut mids = replace(&mut ctx.clause_db.by_tier[Tier::Mid as usize], vec![]);

    mids.retain(|&cref| {
        let header = ctx.clause_alloc.header_mut(cref);
        header.set_mark(false);

        if header.active() {
            header.set_active(false);
            true
        } else {
            set_tier(ctx, cref, Tier::Local);
            false
        }
    });

    ctx.clause_db.count_by_tier[Tier::Mid as usize] = mids.len();
    ctx.clause_db.by_tier[Tier::Mid as usize] = mids;
}
