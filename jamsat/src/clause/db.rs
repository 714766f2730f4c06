//! Database for long clauses, including garbage collection and reduction.
use jamsat_formula::Lit;

use crate::context::Context;
use crate::prop::Reason;

use super::header::HEADER_LEN;
use super::{ClauseAlloc, ClauseHeader, ClauseRef, Tier};

#[derive(Default)]
/// Database for long clauses.
///
/// Removal of clauses from the `clauses` and the `by_tier` fields can be delayed. The clause
/// header's deleted and tier fields need to be checked when iterating over these. `by_tier` may
/// also contain duplicate entries.
pub struct ClauseDb {
    /// May contain deleted clauses, see above
    pub(crate) clauses: Vec<ClauseRef>,
    /// May contain deleted and moved clauses, see above
    pub(crate) by_tier: [Vec<ClauseRef>; Tier::count()],
    /// These counts should always be up to date
    pub(crate) count_by_tier: [usize; Tier::count()],
    /// Size of deleted but not collected clauses
    pub(crate) garbage_size: usize,
}

impl ClauseDb {
    /// The number of long clauses of a given tier.
    pub fn count_by_tier(&self, tier: Tier) -> usize {
        self.count_by_tier[tier as usize]
    }

    /// All non-deleted long clauses, possibly interleaved with stale deleted entries.
    pub fn clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }
}

/// Add a long clause to the database.
pub fn add_clause(ctx: &mut Context, mut header: ClauseHeader, lits: &[Lit]) -> ClauseRef {
    let tier = header.tier();

    header.set_len(lits.len());
    let cref = ctx.clause_alloc.add_clause(header, lits);

    ctx.clause_db.clauses.push(cref);
    ctx.clause_db.by_tier[tier as usize].push(cref);
    ctx.clause_db.count_by_tier[tier as usize] += 1;

    cref
}

/// Change the tier of a long clause.
///
/// This is a noop for a clause already of the specified tier.
pub fn set_tier(ctx: &mut Context, cref: ClauseRef, tier: Tier) {
    let old_tier = ctx.clause_alloc.header(cref).tier();
    if old_tier != tier {
        ctx.clause_db.count_by_tier[old_tier as usize] -= 1;
        ctx.clause_db.count_by_tier[tier as usize] += 1;

        ctx.clause_alloc.header_mut(cref).set_tier(tier);
        ctx.clause_db.by_tier[tier as usize].push(cref);
    }
}

/// Delete a long clause from the database.
///
/// The clause must not currently be the reason of an assigned literal; use
/// [`try_delete_clause`] if this cannot be ruled out statically.
pub fn delete_clause(ctx: &mut Context, cref: ClauseRef) {
    let header = ctx.clause_alloc.header_mut(cref);

    debug_assert!(
        !header.deleted(),
        "delete_clause for already deleted clause"
    );

    header.set_deleted(true);

    ctx.clause_db.count_by_tier[header.tier() as usize] -= 1;
    ctx.clause_db.garbage_size += header.len() + HEADER_LEN;
}

/// Delete a long clause unless it is currently the reason of an assigned literal.
///
/// Returns whether the clause was deleted.
pub fn try_delete_clause(ctx: &mut Context, cref: ClauseRef) -> bool {
    let asserted_lit = ctx.clause_alloc.clause(cref).lits()[0];
    if ctx.assignment.lit_is_true(asserted_lit) && *ctx.impl_graph.reason(asserted_lit.var()) == Reason::Long(cref)
    {
        return false;
    }

    delete_clause(ctx, cref);
    true
}

/// Perform a garbage collection of long clauses if necessary.
pub fn collect_garbage(ctx: &mut Context) {
    // Collecting when a fixed fraction of the allocation is garbage amortizes collection costs.
    if ctx.clause_db.garbage_size * 2 > ctx.clause_alloc.buffer_size() {
        collect_garbage_now(ctx);
    }
}

/// Unconditionally perform a garbage collection of long clauses.
///
/// This needs to invalidate or update any other data structure containing references to
/// clauses: watchlists are disabled (and must be rebuilt by the next propagation run) and
/// reason pointers on the trail are rewritten to point at the relocated clauses.
pub fn collect_garbage_now(ctx: &mut Context) {
    ctx.watchlists.disable();

    mark_asserting_clauses(ctx);

    let db = &mut ctx.clause_db;
    let alloc = &ctx.clause_alloc;

    assert!(
        db.garbage_size <= alloc.buffer_size(),
        "Inconsistent garbage tracking in ClauseDb"
    );
    let current_size = alloc.buffer_size() - db.garbage_size;

    // Allocating just the current size would lead to an immediate growing when new clauses are
    // learned, overallocating here avoids that.
    let mut new_alloc = ClauseAlloc::with_capacity(current_size * 2);

    let mut new_clauses = vec![];
    let mut new_by_tier: [Vec<ClauseRef>; Tier::count()] = Default::default();

    for &cref in db.clauses.iter() {
        let clause = alloc.clause(cref);
        let mut header = clause.header().clone();
        if header.deleted() {
            continue;
        }

        let clause_is_asserting = header.mark();
        header.set_mark(false);

        let new_cref = new_alloc.add_clause(header.clone(), clause.lits());

        new_clauses.push(new_cref);
        new_by_tier[header.tier() as usize].push(new_cref);

        if clause_is_asserting {
            let asserted_lit = clause.lits()[0];
            debug_assert_eq!(ctx.impl_graph.reason(asserted_lit.var()), &Reason::Long(cref));
            ctx.impl_graph
                .update_reason(asserted_lit.var(), Reason::Long(new_cref));
        }
    }

    ctx.clause_alloc = new_alloc;
    ctx.clause_db.clauses = new_clauses;
    ctx.clause_db.by_tier = new_by_tier;
    ctx.clause_db.garbage_size = 0;
}

/// Mark asserting clauses to track them through GC.
fn mark_asserting_clauses(ctx: &mut Context) {
    for &lit in ctx.trail.trail().iter() {
        if let &Reason::Long(cref) = ctx.impl_graph.reason(lit.var()) {
            ctx.clause_alloc.header_mut(cref).set_mark(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::*;

    use jamsat_formula::{cnf::strategy::*, cnf_formula, Lit};

    use crate::prop::enqueue_assignment;

    #[test]
    fn set_tiers_and_deletes() {
        let mut ctx = Context::default();

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5, 6;
            -2, 3, -4;
            -3, 5, 2, 7, 5;
        ];

        let tiers = vec![Tier::Irred, Tier::Core, Tier::Mid, Tier::Local];
        let new_tiers = vec![Tier::Irred, Tier::Local, Tier::Local, Tier::Core];

        let mut crefs = vec![];

        for (clause, &tier) in clauses.iter().zip(tiers.iter()) {
            let mut header = ClauseHeader::new();
            header.set_tier(tier);
            let cref = add_clause(&mut ctx, header, clause);
            crefs.push(cref);
        }

        for (&cref, &tier) in crefs.iter().rev().zip(new_tiers.iter().rev()) {
            set_tier(&mut ctx, cref, tier);
        }

        assert!(ctx.clause_db.by_tier[Tier::Irred as usize].contains(&crefs[0]));
        assert!(ctx.clause_db.by_tier[Tier::Core as usize].contains(&crefs[3]));
        assert!(ctx.clause_db.by_tier[Tier::Local as usize].contains(&crefs[1]));
        assert!(ctx.clause_db.by_tier[Tier::Local as usize].contains(&crefs[2]));

        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 1);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Mid), 0);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Local), 2);

        delete_clause(&mut ctx, crefs[0]);
        delete_clause(&mut ctx, crefs[2]);

        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 0);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Mid), 0);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Local), 1);
    }

    proptest! {
        #[test]
        fn garbage_collection(
            input_a in cnf_formula(2..100usize, 500..1000, 3..30),
            input_b in cnf_formula(2..100usize, 10..500, 4..20),
        ) {
            let mut ctx = Context::default();
            let var_count = input_a.var_count().max(input_b.var_count());
            ctx.variables.increase_max_var(jamsat_formula::Var::from_index(var_count.saturating_sub(1)));
            ctx.ensure_var_count();

            let mut crefs_a = vec![];
            let mut crefs_b = vec![];

            for lits in input_a.iter() {
                let header = ClauseHeader::new();
                let cref = add_clause(&mut ctx, header, lits);
                crefs_a.push(cref);
            }

            for lits in input_b.iter() {
                let header = ClauseHeader::new();
                let cref = add_clause(&mut ctx, header, lits);
                crefs_b.push(cref);

                if ctx.assignment.lit_value(lits[0]).is_none() {
                    // This isn't consistent, as the clause isn't actually propagating, but that
                    // isn't checked during garbage collection
                    enqueue_assignment(&mut ctx, lits[0], Reason::Long(cref));
                }
            }

            for cref in crefs_a {
                delete_clause(&mut ctx, cref);
                prop_assert!(ctx.clause_db.garbage_size > 0);
            }

            let old_buffer_size = ctx.clause_alloc.buffer_size();

            collect_garbage(&mut ctx);

            prop_assert!(ctx.clause_db.garbage_size * 2 < ctx.clause_alloc.buffer_size());
            prop_assert!(old_buffer_size > ctx.clause_alloc.buffer_size());
            prop_assert!(!ctx.watchlists.enabled());

            let mut output_clauses: Vec<Vec<Lit>> = vec![];

            for &cref in ctx.clause_db.clauses.iter() {
                let clause = ctx.clause_alloc.clause(cref);
                if clause.header().deleted() {
                    continue;
                }
                prop_assert!(!clause.header().mark());
                output_clauses.push(clause.lits().iter().cloned().collect());
            }

            let mut input_clauses: Vec<Vec<Lit>> = input_b
                .iter()
                .map(|c| c.iter().cloned().collect())
                .collect();

            output_clauses.sort();
            input_clauses.sort();

            prop_assert_eq!(input_clauses, output_clauses);

            for &lit in ctx.trail.trail() {
                if let &Reason::Long(cref) = ctx.impl_graph.reason(lit.var()) {
                    prop_assert_eq!(ctx.clause_alloc.clause(cref).lits()[0], lit)
                }
            }
        }
    }
}
