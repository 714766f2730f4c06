//! Conflict driven clause learning.

use crate::analyze_conflict::analyze_conflict;
use crate::assumptions::{enqueue_assumption, EnqueueAssumption};
use crate::clause::{assess_learned_clause, bump_clause_activity, db, decay_clause_activities};
use crate::context::Context;
use crate::decision::make_decision;
use crate::glue::compute_glue;
use crate::model::reconstruct_model;
use crate::proof::ProofStep;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;

/// Return type of [`find_conflict`].
///
/// Specifies whether a conflict was found during propagation or while enqueuing assumptions.
enum FoundConflict {
    Conflict(Conflict),
    Assumption,
}

/// Find a conflict, learn a clause and backtrack.
pub fn conflict_step(ctx: &mut Context) {
    let conflict = match find_conflict(ctx) {
        Ok(()) => {
            reconstruct_model(ctx);
            return;
        }
        Err(FoundConflict::Assumption) => {
            ctx.solver_state.sat_state = SatState::UnsatUnderAssumptions;
            return;
        }
        Err(FoundConflict::Conflict(conflict)) => conflict,
    };

    let backtrack_to = analyze_conflict(ctx, conflict);

    for &cref in ctx.analyze_conflict.involved().to_vec().iter() {
        bump_clause_activity(ctx, cref);
    }

    decay_clause_activities(ctx);

    backtrack(ctx, backtrack_to);

    let clause = ctx.analyze_conflict.clause().to_vec();

    if !clause.is_empty() {
        let glue = compute_glue(ctx, &clause).saturating_sub(1);
        ctx.schedule.register_conflict(glue);
    }

    if ctx.proof.is_active() {
        ctx.proof.add_step(&ProofStep::AtClause {
            redundant: clause.len() > 2,
            clause: &clause,
            propagation_hashes: ctx.analyze_conflict.clause_hashes(),
        });
    }

    let reason = match clause[..] {
        [] => {
            ctx.solver_state.sat_state = SatState::Unsat;
            return;
        }
        [_] => Reason::Unit,
        [_, lit_1] => {
            ctx.binary_clauses.add_binary_clause([clause[0], lit_1]);
            Reason::Binary([lit_1])
        }
        _ => {
            let header = assess_learned_clause(ctx, &clause);
            let cref = db::add_clause(ctx, header, &clause);
            Reason::Long(cref)
        }
    };

    enqueue_assignment(ctx, clause[0], reason);

    db::collect_garbage(ctx);
}

/// Find a conflict.
///
/// Returns `Err` if a conflict was found and `Ok` if a satisfying assignment was found instead.
fn find_conflict(ctx: &mut Context) -> Result<(), FoundConflict> {
    loop {
        let propagation_result = propagate(ctx);

        let new_unit = prove_units(ctx);

        propagation_result.map_err(FoundConflict::Conflict)?;

        if new_unit {
            simplify(ctx);
        }

        match enqueue_assumption(ctx) {
            EnqueueAssumption::Enqueued => continue,
            EnqueueAssumption::Conflict => return Err(FoundConflict::Assumption),
            EnqueueAssumption::Done => (),
        }

        if !make_decision(ctx) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use jamsat_formula::{cnf_formula, test::sat_formula, test::sgen_unsat_formula};

    use crate::load::load_clause;

    fn ensure_vars(ctx: &mut Context, var_count: usize) {
        if var_count > 0 {
            ctx.variables
                .increase_max_var(jamsat_formula::Var::from_index(var_count - 1));
        }
        ctx.ensure_var_count();
    }

    #[test]
    fn level_0_unsat() {
        let mut ctx = Context::default();

        let formula = cnf_formula![
            1, 2, 3;
            -1;
            1, -2;
            2, -3;
        ];

        ensure_vars(&mut ctx, formula.var_count());

        for clause in formula.iter() {
            load_clause(&mut ctx, clause);
        }

        while ctx.solver_state.sat_state == SatState::Unknown {
            conflict_step(&mut ctx);
        }

        assert_eq!(ctx.solver_state.sat_state, SatState::Unsat);
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();

            ensure_vars(&mut ctx, formula.var_count());

            for clause in formula.iter() {
                load_clause(&mut ctx, clause);
            }

            while ctx.solver_state.sat_state == SatState::Unknown {
                conflict_step(&mut ctx);
            }

            prop_assert_eq!(ctx.solver_state.sat_state, SatState::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut ctx = Context::default();

            ensure_vars(&mut ctx, formula.var_count());

            for clause in formula.iter() {
                load_clause(&mut ctx, clause);
            }

            while ctx.solver_state.sat_state == SatState::Unknown {
                conflict_step(&mut ctx);
            }

            prop_assert_eq!(ctx.solver_state.sat_state, SatState::Sat);

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|&lit| ctx.assignment.lit_is_true(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();

            ensure_vars(&mut ctx, formula.var_count());

            let mut last_state = SatState::Sat;

            for clause in formula.iter() {
                load_clause(&mut ctx, clause);
                while ctx.solver_state.sat_state == SatState::Unknown {
                    conflict_step(&mut ctx);
                }

                if ctx.solver_state.sat_state != last_state {
                    prop_assert_eq!(ctx.solver_state.sat_state, SatState::Unsat);
                    prop_assert_eq!(last_state, SatState::Sat);
                    last_state = ctx.solver_state.sat_state;
                }
            }

            prop_assert_eq!(last_state, SatState::Unsat);
        }
    }
}
