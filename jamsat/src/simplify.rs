//! Simplification using unit clauses.
//!
//! Run at level 0, right after [`prove_units`] has cleared the trail. Because of that, no long
//! clause is ever the active reason of a currently-assigned literal while this module deletes or
//! rewrites clauses, so the plain [`db::delete_clause`] can be used directly instead of
//! [`db::try_delete_clause`].
use jamsat_formula::lit::{Lit, Var};

use crate::clause::{db, ClauseHeader, ClauseRef, Tier};
use crate::context::Context;
use crate::proof::{clause_hash, lit_hash, DeleteClauseProof, ProofStep};
use crate::prop::{backtrack, enqueue_assignment, propagate, Reason};
use crate::state::SatState;

/// Per-literal occurrence map used by the self-subsuming resolution and variable elimination
/// passes below.
///
/// Rebuilt from scratch at the start of each pass that needs it (see [`rebuild_occurrences`]),
/// rather than maintained incrementally: clause deletions and shrinks happen throughout
/// simplification, and a lazily-retained map (in the style of [`crate::clause::db::ClauseDb`]'s
/// `by_tier` vectors) would still need every reader to check for deleted clauses and re-fetch
/// the clause's current literals anyway.
#[derive(Default)]
pub struct Simplifier {
    occurs: Vec<Vec<ClauseRef>>,
}

impl Simplifier {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.occurs.resize(count * 2, vec![]);
    }
}

/// Turn propagated level-0 facts into permanent units, clearing the trail.
///
/// Only has an effect at decision level 0. Returns whether any fact was removed from the trail.
pub fn prove_units(ctx: &mut Context) -> bool {
    let mut new_unit = false;

    if ctx.trail.current_level() == 0 {
        let mut unit_proofs = vec![];

        for &lit in ctx.trail.trail().to_vec().iter() {
            new_unit = true;

            if ctx.proof.prove_propagated_unit_clauses() {
                let reason = *ctx.impl_graph.reason(lit.var());
                if !reason.is_unit() {
                    let lits = reason.lits(&ctx.clause_alloc).to_vec();
                    let hash = clause_hash(&lits) ^ lit_hash(lit);
                    unit_proofs.push((lit, hash));
                }
            }

            ctx.impl_graph.update_removed_unit(lit.var());
        }

        ctx.trail.clear();

        if !unit_proofs.is_empty() {
            ctx.proof.add_step(&ProofStep::UnitClauses(&unit_proofs));
        }
    }

    new_unit
}

/// Simplify the formula using the facts fixed at level 0.
///
/// Must only be called with an empty trail at decision level 0, i.e. right after
/// [`prove_units`] reported new units.
pub fn simplify(ctx: &mut Context) {
    db::collect_garbage(ctx);

    crate::binary::simplify_binary(ctx);
    rewrite_long_clauses(ctx);

    ssr_hbr_and_failed_literals(ctx);
    eliminate_variables(ctx);
}

/// Remove satisfied clauses and false literals from long clauses.
fn rewrite_long_clauses(ctx: &mut Context) {
    for cref in ctx.clause_db.clauses().to_vec() {
        if ctx.clause_alloc.header(cref).deleted() {
            continue;
        }

        let old_lits = ctx.clause_alloc.clause(cref).lits().to_vec();
        let mut new_lits = Vec::with_capacity(old_lits.len());
        let mut satisfied = false;

        for &lit in &old_lits {
            match ctx.assignment.lit_value(lit) {
                None => new_lits.push(lit),
                Some(true) => {
                    satisfied = true;
                    break;
                }
                Some(false) => (),
            }
        }

        if satisfied {
            if ctx.proof.is_active() {
                ctx.proof.add_step(&ProofStep::DeleteClause {
                    clause: &old_lits,
                    proof: DeleteClauseProof::Satisfied,
                });
            }
            db::delete_clause(ctx, cref);
        } else if new_lits.len() < old_lits.len() {
            shrink_clause(ctx, cref, &new_lits);
        }
    }
}

/// Replace a long clause's literals with a strict subset, emitting the matching proof steps and
/// dispatching the result to whichever storage its new length belongs in.
///
/// `new_lits` must not be equal to the clause's current literals.
fn shrink_clause(ctx: &mut Context, cref: ClauseRef, new_lits: &[Lit]) {
    let old_lits = ctx.clause_alloc.clause(cref).lits().to_vec();

    if ctx.proof.is_active() {
        let hash = [clause_hash(new_lits)];
        ctx.proof.add_step(&ProofStep::AtClause {
            redundant: false,
            clause: new_lits,
            propagation_hashes: &hash,
        });
        ctx.proof.add_step(&ProofStep::DeleteClause {
            clause: &old_lits,
            proof: DeleteClauseProof::Simplified,
        });
    }

    match new_lits {
        [] => {
            ctx.solver_state.sat_state = SatState::Unsat;
            db::delete_clause(ctx, cref);
        }
        &[lit] => {
            db::delete_clause(ctx, cref);
            match ctx.assignment.lit_value(lit) {
                Some(true) => (),
                Some(false) => ctx.solver_state.sat_state = SatState::Unsat,
                None => enqueue_assignment(ctx, lit, Reason::Unit),
            }
        }
        &[lit_0, lit_1] => {
            ctx.binary_clauses.add_binary_clause([lit_0, lit_1]);
            db::delete_clause(ctx, cref);
        }
        lits => {
            let clause = ctx.clause_alloc.clause_mut(cref);
            clause.lits_mut()[..lits.len()].copy_from_slice(lits);
            clause.header_mut().set_len(lits.len());
        }
    }
}

/// Rebuild [`Simplifier::occurs`] from the current long clause database.
fn rebuild_occurrences(ctx: &mut Context) {
    for occ in ctx.simplifier.occurs.iter_mut() {
        occ.clear();
    }

    for cref in ctx.clause_db.clauses().to_vec() {
        if ctx.clause_alloc.header(cref).deleted() {
            continue;
        }

        for lit in ctx.clause_alloc.clause(cref).lits().to_vec() {
            ctx.simplifier.occurs[lit.code()].push(cref);
        }
    }
}

/// Temporarily assigns `p`, propagates, and reports the consequences.
///
/// On success, returns the literals implied by `p` (not including `p` itself), and restores the
/// trail to empty at level 0. On conflict, `p` is a failed literal: asserts `!p` as a permanent
/// level-0 fact instead and returns `None`. If asserting `!p` also conflicts, the formula is
/// UNSAT.
///
/// This is a simpler analysis than the original's full first-UIP learning on the failed-literal
/// conflict: it only keeps `!p`, not the stronger asserting literal a full conflict analysis over
/// the conflicting clause would derive. That forgoes some potential unit clauses in exchange for
/// not needing a second conflict-analysis entry point outside of [`crate::cdcl`].
///
/// Must only be called with an empty trail at decision level 0.
fn probe(ctx: &mut Context, p: Lit) -> Option<Vec<Lit>> {
    debug_assert_eq!(ctx.trail.current_level(), 0);

    if ctx.assignment.lit_value(p).is_some() {
        return None;
    }

    let start = ctx.trail.trail().len();

    ctx.trail.new_decision_level();
    enqueue_assignment(ctx, p, Reason::Unit);

    if propagate(ctx).is_ok() {
        let implied = ctx.trail.trail()[start + 1..].to_vec();
        backtrack(ctx, 0);
        return Some(implied);
    }

    backtrack(ctx, 0);

    debug_assert!(ctx.assignment.lit_value(!p).is_none());
    enqueue_assignment(ctx, !p, Reason::Unit);

    if propagate(ctx).is_err() {
        ctx.solver_state.sat_state = SatState::Unsat;
    }

    None
}

/// Self-subsuming resolution with hyper-binary resolution, combined with failed-literal
/// analysis.
///
/// For each unassigned literal `pivot`, probes `!pivot`. A conflict makes `pivot` a failed
/// literal (handled by [`probe`] itself). Otherwise, every literal `x` implied by `!pivot` gives a
/// virtual binary clause `(pivot, x)`; clauses containing `pivot` alongside `x` are subsumed by
/// it, and clauses containing `pivot` alongside `!x` can be strengthened by dropping `!x`, since
/// resolving `(pivot, x)` with `(pivot, !x, rest)` over `x` yields `(pivot, rest)`.
///
/// Skipped entirely when proof generation requires clause hashes: unlike the propagation this
/// module otherwise performs, the intermediate virtual binary clauses used here are never
/// persisted, so they cannot be hashed for the native proof format. DRAT/binary DRAT checkers
/// re-derive propagation themselves and are unaffected.
fn ssr_hbr_and_failed_literals(ctx: &mut Context) {
    if ctx.proof.clause_hashes_required() {
        return;
    }

    rebuild_occurrences(ctx);

    let var_count = ctx.variables.watermark();

    for index in 0..var_count {
        if ctx.solver_state.sat_state == SatState::Unsat {
            return;
        }

        let var = Var::from_index(index);
        if ctx.assignment.var_value(var).is_some() {
            continue;
        }

        for &pivot in &[Lit::from_var(var, true), Lit::from_var(var, false)] {
            if ctx.assignment.lit_value(pivot).is_some() {
                continue;
            }

            let implied = match probe(ctx, !pivot) {
                Some(implied) => implied,
                None => continue,
            };

            if !implied.is_empty() {
                strengthen_with_implied(ctx, pivot, &implied);
            }
        }
    }
}

/// Apply the self-subsuming resolution/subsumption step of [`ssr_hbr_and_failed_literals`] for a
/// single pivot literal and its implied consequences.
fn strengthen_with_implied(ctx: &mut Context, pivot: Lit, implied: &[Lit]) {
    for cref in ctx.simplifier.occurs[pivot.code()].to_vec() {
        if ctx.solver_state.sat_state == SatState::Unsat {
            return;
        }

        if ctx.clause_alloc.header(cref).deleted() {
            continue;
        }

        let lits = ctx.clause_alloc.clause(cref).lits().to_vec();
        if !lits.contains(&pivot) {
            // Stale occurrence entry: the clause has already been rewritten since the
            // occurrence map was built and no longer contains the pivot.
            continue;
        }

        let mut subsumed = false;
        let mut new_lits = Vec::with_capacity(lits.len());

        for &lit in &lits {
            if lit == pivot {
                new_lits.push(lit);
            } else if implied.contains(&lit) {
                // (pivot, lit) is a valid binary clause and this clause already contains both,
                // so it is subsumed by it.
                subsumed = true;
                break;
            } else if implied.contains(&!lit) {
                // Resolving (pivot, !lit) with this clause over lit removes lit.
            } else {
                new_lits.push(lit);
            }
        }

        if subsumed {
            if ctx.proof.is_active() {
                ctx.proof.add_step(&ProofStep::DeleteClause {
                    clause: &lits,
                    proof: DeleteClauseProof::Redundant,
                });
            }
            db::delete_clause(ctx, cref);
        } else if new_lits.len() < lits.len() {
            shrink_clause(ctx, cref, &new_lits);
        }
    }
}

/// Eliminate variables that occur only in long clauses by resolving away every clause pair on
/// that variable, as long as doing so does not increase the clause count.
///
/// Restricted to variables without binary-clause occurrences, so that the resolution only has to
/// consider one clause representation. Grounded on the `numDistCl < numClTotal` worthwhileness
/// check from the original variable elimination pass this is based on: elimination is abandoned
/// for a variable as soon as the resolvents generated so far would not be offset by the clauses
/// removed.
///
/// Skipped when proof generation requires clause hashes, for the same reason as
/// [`ssr_hbr_and_failed_literals`]: full native-format justification for the resolvent clauses
/// generated here is out of scope.
fn eliminate_variables(ctx: &mut Context) {
    if ctx.proof.clause_hashes_required() {
        return;
    }

    rebuild_occurrences(ctx);

    let var_count = ctx.variables.watermark();

    for index in 0..var_count {
        if ctx.solver_state.sat_state == SatState::Unsat {
            return;
        }

        let var = Var::from_index(index);
        if ctx.assignment.var_value(var).is_some() {
            continue;
        }

        let pos = Lit::from_var(var, true);
        let neg = Lit::from_var(var, false);

        if !ctx.binary_clauses.implied(pos).is_empty() || !ctx.binary_clauses.implied(neg).is_empty()
        {
            continue;
        }

        eliminate_variable(ctx, pos, neg);
    }
}

/// Attempt to eliminate a single variable, given its positive and negative literal.
fn eliminate_variable(ctx: &mut Context, pos: Lit, neg: Lit) {
    let pos_clauses: Vec<ClauseRef> = ctx.simplifier.occurs[pos.code()]
        .iter()
        .copied()
        .filter(|&cref| !ctx.clause_alloc.header(cref).deleted())
        .collect();
    let neg_clauses: Vec<ClauseRef> = ctx.simplifier.occurs[neg.code()]
        .iter()
        .copied()
        .filter(|&cref| !ctx.clause_alloc.header(cref).deleted())
        .collect();

    if pos_clauses.is_empty() || neg_clauses.is_empty() {
        return;
    }

    let total = pos_clauses.len() + neg_clauses.len();
    let mut resolvents: Vec<Vec<Lit>> = vec![];

    for &pos_cref in &pos_clauses {
        let pos_lits = ctx.clause_alloc.clause(pos_cref).lits().to_vec();

        for &neg_cref in &neg_clauses {
            let neg_lits = ctx.clause_alloc.clause(neg_cref).lits().to_vec();

            let mut resolvent: Vec<Lit> = pos_lits.iter().copied().filter(|&l| l != pos).collect();
            let mut tautological = false;

            for &lit in &neg_lits {
                if lit == neg {
                    continue;
                }
                if resolvent.contains(&!lit) {
                    tautological = true;
                    break;
                }
                if !resolvent.contains(&lit) {
                    resolvent.push(lit);
                }
            }

            if tautological {
                continue;
            }

            if resolvents.len() >= total {
                // Not worthwhile: resolution would not reduce the clause count.
                return;
            }

            resolvents.push(resolvent);
        }
    }

    for &cref in pos_clauses.iter().chain(neg_clauses.iter()) {
        let lits = ctx.clause_alloc.clause(cref).lits().to_vec();
        if ctx.proof.is_active() {
            ctx.proof.add_step(&ProofStep::DeleteClause {
                clause: &lits,
                proof: DeleteClauseProof::Redundant,
            });
        }
        db::delete_clause(ctx, cref);
    }

    for resolvent in resolvents {
        add_resolvent(ctx, &resolvent);
    }
}

/// Add a resolvent clause produced by [`eliminate_variable`], dispatching by its length.
fn add_resolvent(ctx: &mut Context, lits: &[Lit]) {
    if ctx.solver_state.sat_state == SatState::Unsat {
        return;
    }

    if ctx.proof.is_active() {
        let hash = [clause_hash(lits)];
        ctx.proof.add_step(&ProofStep::AtClause {
            redundant: true,
            clause: lits,
            propagation_hashes: &hash,
        });
    }

    match lits {
        [] => ctx.solver_state.sat_state = SatState::Unsat,
        &[lit] => match ctx.assignment.lit_value(lit) {
            Some(true) => (),
            Some(false) => ctx.solver_state.sat_state = SatState::Unsat,
            None => enqueue_assignment(ctx, lit, Reason::Unit),
        },
        &[lit_0, lit_1] => ctx.binary_clauses.add_binary_clause([lit_0, lit_1]),
        _ => {
            let mut header = ClauseHeader::new();
            header.set_tier(Tier::Irred);
            db::add_clause(ctx, header, lits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jamsat_formula::lits;

    use crate::load::load_clause;

    fn ctx_with_vars(var_count: usize) -> Context {
        let mut ctx = Context::default();
        if var_count > 0 {
            ctx.variables
                .increase_max_var(jamsat_formula::Var::from_index(var_count - 1));
        }
        ctx.ensure_var_count();
        ctx
    }

    #[test]
    fn prove_units_clears_level_0_trail() {
        let mut ctx = ctx_with_vars(3);

        load_clause(&mut ctx, &lits![1]);
        load_clause(&mut ctx, &lits![1, 2, 3]);
        propagate(&mut ctx).unwrap();

        assert!(!ctx.trail.trail().is_empty());

        let new_unit = prove_units(&mut ctx);

        assert!(new_unit);
        assert!(ctx.trail.trail().is_empty());
        assert_eq!(ctx.assignment.lit_value(lits![1][0]), Some(true));
    }

    #[test]
    fn rewrite_long_clauses_shrinks_and_drops() {
        let mut ctx = ctx_with_vars(5);

        load_clause(&mut ctx, &lits![-1]);
        load_clause(&mut ctx, &lits![1, 2, 3]);
        load_clause(&mut ctx, &lits![1, 4, 5]);

        propagate(&mut ctx).unwrap();
        prove_units(&mut ctx);

        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 2);

        simplify(&mut ctx);

        // Both clauses lose the false literal 1 (from the unit -1) and shrink from ternary to
        // binary, so they move out of the long clause database entirely.
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 0);
        assert_eq!(ctx.binary_clauses.count(), 2);
    }

    #[test]
    fn failed_literal_is_asserted_false() {
        let mut ctx = ctx_with_vars(2);

        // 1 -> 2 and 1 -> !2, so 1 is a failed literal.
        load_clause(&mut ctx, &lits![-1, 2]);
        load_clause(&mut ctx, &lits![-1, -2]);

        propagate(&mut ctx).unwrap();
        prove_units(&mut ctx);

        simplify(&mut ctx);

        assert_eq!(ctx.assignment.lit_value(lits![1][0]), Some(false));
    }
}
