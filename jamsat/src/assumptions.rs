//! Incremental solving via assumptions.
use jamsat_formula::Lit;
use jamsat_proof::{clause_hash, lit_hash, ClauseHash, ProofStep};

use crate::context::Context;
use crate::prop::{enqueue_assignment, full_restart, Reason};
use crate::state::SatState;

/// State tracking the currently active assumptions and, after a conflict under assumptions, the
/// subset of them responsible for unsatisfiability.
#[derive(Default)]
pub struct Assumptions {
    assumptions: Vec<Lit>,
    failed_core: Vec<Lit>,
    assumption_levels: usize,
    failed_propagation_hashes: Vec<ClauseHash>,
}

impl Assumptions {
    /// Current number of decision levels used for assumptions.
    pub fn assumption_levels(&self) -> usize {
        self.assumption_levels
    }

    /// Resets assumption_levels to zero, e.g. on a full restart.
    pub fn clear(&mut self) {
        self.assumption_levels = 0;
    }

    /// Subset of assumptions that made the formula unsatisfiable.
    pub fn failed_core(&self) -> &[Lit] {
        &self.failed_core
    }

    /// Propagation hashes justifying the failed core, for AT proof generation.
    pub fn failed_propagation_hashes(&self) -> &[ClauseHash] {
        &self.failed_propagation_hashes
    }

    /// Current assumptions.
    pub fn assumptions(&self) -> &[Lit] {
        &self.assumptions
    }
}

/// Return type of [`enqueue_assumption`].
pub enum EnqueueAssumption {
    Done,
    Enqueued,
    Conflict,
}

/// Change the currently active assumptions.
pub fn set_assumptions(ctx: &mut Context, new_assumptions: &[Lit]) {
    full_restart(ctx);

    ctx.solver_state.sat_state = match ctx.solver_state.sat_state {
        SatState::Unsat => SatState::Unsat,
        SatState::Sat | SatState::UnsatUnderAssumptions | SatState::Unknown => SatState::Unknown,
    };

    ctx.assumptions.assumptions.clear();
    ctx.assumptions.assumptions.extend_from_slice(new_assumptions);

    let assumptions = ctx.assumptions.assumptions.clone();
    ctx.proof.add_step(&ProofStep::Assumptions(&assumptions));
}

/// Enqueue another assumption if possible.
///
/// Returns whether an assumption was enqueued, whether no assumptions are left or whether the
/// assumptions result in a conflict.
pub fn enqueue_assumption(ctx: &mut Context) -> EnqueueAssumption {
    while let Some(&assumption) = ctx
        .assumptions
        .assumptions
        .get(ctx.trail.current_level())
    {
        match ctx.assignment.lit_value(assumption) {
            Some(false) => {
                analyze_assumption_conflict(ctx, assumption);
                return EnqueueAssumption::Conflict;
            }
            Some(true) => {
                // The next assumption is already implied by other assumptions so we can remove it.
                let level = ctx.trail.current_level();
                ctx.assumptions.assumptions.swap_remove(level);
            }
            None => {
                ctx.trail.new_decision_level();
                enqueue_assignment(ctx, assumption, Reason::Unit);
                ctx.assumptions.assumption_levels = ctx.trail.current_level();
                return EnqueueAssumption::Enqueued;
            }
        }
    }
    EnqueueAssumption::Done
}

/// Analyze a conflicting set of assumptions.
///
/// Compute a set of incompatible assumptions given an assumption that is incompatible with the
/// assumptions enqueued so far.
fn analyze_assumption_conflict(ctx: &mut Context, assumption: Lit) {
    ctx.tmp_data.new_stamp_generation();

    ctx.assumptions.failed_core.clear();
    ctx.assumptions.failed_core.push(assumption);
    ctx.assumptions.failed_propagation_hashes.clear();

    ctx.tmp_data.stamp(assumption.var());
    let mut stamped_count = 1;

    for i in (0..ctx.trail.trail().len()).rev() {
        let lit = ctx.trail.trail()[i];
        if !ctx.tmp_data.is_stamped(lit.var()) {
            continue;
        }
        stamped_count -= 1;

        match *ctx.impl_graph.reason(lit.var()) {
            Reason::Unit => {
                if ctx.impl_graph.level(lit.var()) > 0 {
                    ctx.assumptions.failed_core.push(lit);
                }
            }
            reason => {
                let reason_lits: Vec<Lit> = reason.lits(&ctx.clause_alloc).to_vec();

                if ctx.proof.clause_hashes_required() {
                    let hash = clause_hash(&reason_lits) ^ lit_hash(lit);
                    ctx.assumptions.failed_propagation_hashes.push(hash);
                }

                for &reason_lit in &reason_lits {
                    if !ctx.tmp_data.is_stamped(reason_lit.var()) {
                        ctx.tmp_data.stamp(reason_lit.var());
                        stamped_count += 1;
                    }
                }
            }
        }

        if stamped_count == 0 {
            break;
        }
    }

    ctx.assumptions.failed_propagation_hashes.reverse();

    let failed_core = ctx.assumptions.failed_core.clone();
    let hashes = ctx.assumptions.failed_propagation_hashes.clone();
    ctx.proof.add_step(&ProofStep::FailedAssumptions {
        failed_core: &failed_core,
        propagation_hashes: &hashes,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::{bool, prelude::*};

    use jamsat_formula::test::conditional_pigeon_hole;

    use crate::cdcl::conflict_step;
    use crate::load::load_clause;
    use crate::solver::Solver;
    use crate::state::SatState;

    proptest! {
        #[test]
        fn pigeon_hole_unsat_assumption_core_internal(
            (enable_row, columns, formula) in conditional_pigeon_hole(1..5usize, 1..5usize),
            chain in bool::ANY,
        ) {
            let mut ctx = Context::default();

            for clause in formula.iter() {
                load_clause(&mut ctx, clause);
            }

            if chain {
                for (&a, &b) in enable_row.iter().zip(enable_row.iter().skip(1)) {
                    load_clause(&mut ctx, &[!a, b]);
                }
            }

            while ctx.solver_state.sat_state == SatState::Unknown {
                conflict_step(&mut ctx);
            }

            prop_assert_eq!(ctx.solver_state.sat_state, SatState::Sat);

            set_assumptions(&mut ctx, &enable_row);

            prop_assert_eq!(ctx.solver_state.sat_state, SatState::Unknown);

            while ctx.solver_state.sat_state == SatState::Unknown {
                conflict_step(&mut ctx);
            }

            prop_assert_eq!(ctx.solver_state.sat_state, SatState::UnsatUnderAssumptions);

            let mut candidates = ctx.assumptions.failed_core().to_owned();
            let mut core: Vec<Lit> = vec![];

            loop {
                set_assumptions(&mut ctx, &candidates[0..candidates.len() - 1]);

                while ctx.solver_state.sat_state == SatState::Unknown {
                    conflict_step(&mut ctx);
                }

                match ctx.solver_state.sat_state {
                    SatState::Unknown => unreachable!(),
                    SatState::Unsat => break,
                    SatState::Sat => {
                        let skipped = *candidates.last().unwrap();
                        core.push(skipped);
                        load_clause(&mut ctx, &[skipped]);
                    },
                    SatState::UnsatUnderAssumptions => {
                        candidates = ctx.assumptions.failed_core().to_owned();
                    }
                }
            }
            if chain {
                prop_assert_eq!(core.len(), 1);
            } else {
                prop_assert_eq!(core.len(), columns + 1);
            }
        }

        #[test]
        fn pigeon_hole_unsat_assumption_core_solver(
            (enable_row, columns, formula) in conditional_pigeon_hole(1..5usize, 1..5usize),
        ) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            solver.assume(&enable_row);

            prop_assert_eq!(solver.solve(), Some(false));

            let mut candidates = solver.failed_core().unwrap().to_owned();
            let mut core: Vec<Lit> = vec![];

            while !candidates.is_empty() {
                solver.assume(&candidates[0..candidates.len() - 1]);

                match solver.solve() {
                    None => unreachable!(),
                    Some(true) => {
                        let skipped = *candidates.last().unwrap();
                        core.push(skipped);

                        solver.add_clause(&[skipped]);
                    },
                    Some(false) => {
                        candidates = solver.failed_core().unwrap().to_owned();
                    }
                }
            }

            prop_assert_eq!(core.len(), columns + 1);
        }
    }
}
