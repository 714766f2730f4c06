//! Loading a formula into the solver.
use jamsat_formula::lit::Lit;
use jamsat_proof::{clause_hash, DeleteClauseProof, ProofStep};

use crate::clause::{db, ClauseHeader, Tier};
use crate::context::Context;
use crate::prop::{enqueue_assignment, full_restart, Reason};
use crate::state::SatState;

/// Adds a clause to the current formula.
///
/// Removes duplicated literals, ignores tautological clauses (e.g. x v -x v y), handles empty
/// clauses and dispatches among unit, binary and long clauses.
///
/// Does not adjust the solver's variable count. If necessary that has to be done before calling
/// this (see [`Context::ensure_var_count`]).
pub fn load_clause(ctx: &mut Context, lits: &[Lit]) {
    match ctx.solver_state.sat_state {
        SatState::Unsat => return,
        SatState::Sat => {
            ctx.solver_state.sat_state = SatState::Unknown;
        }
        _ => {}
    }

    // Restart the search when the user adds new clauses.
    full_restart(ctx);

    let mut sorted_lits = lits.to_vec();
    sorted_lits.sort_unstable();
    sorted_lits.dedup();

    // Detect tautological clauses.
    let mut last = None;
    for &lit in sorted_lits.iter() {
        if last == Some(!lit) {
            if ctx.proof.is_active() {
                ctx.proof.add_step(&ProofStep::DeleteClause {
                    clause: &sorted_lits,
                    proof: DeleteClauseProof::Satisfied,
                });
            }
            return;
        }
        last = Some(lit);
    }

    // Remove false literals and satisfied clauses.
    let mut simplified_lits = vec![];
    for &lit in sorted_lits.iter() {
        match ctx.assignment.lit_value(lit) {
            Some(true) => {
                if ctx.proof.is_active() {
                    ctx.proof.add_step(&ProofStep::DeleteClause {
                        clause: &sorted_lits,
                        proof: DeleteClauseProof::Satisfied,
                    });
                }
                return;
            }
            Some(false) => (),
            None => simplified_lits.push(lit),
        }
    }

    if ctx.proof.is_active() && simplified_lits.len() < sorted_lits.len() {
        let hash = [clause_hash(&sorted_lits)];
        ctx.proof.add_step(&ProofStep::AtClause {
            redundant: false,
            clause: &simplified_lits,
            propagation_hashes: &hash,
        });
        ctx.proof.add_step(&ProofStep::DeleteClause {
            clause: &sorted_lits,
            proof: DeleteClauseProof::Simplified,
        });
    }

    match simplified_lits[..] {
        [] => ctx.solver_state.sat_state = SatState::Unsat,
        [lit] => enqueue_assignment(ctx, lit, Reason::Unit),
        [lit_0, lit_1] => {
            ctx.binary_clauses.add_binary_clause([lit_0, lit_1]);
        }
        _ => {
            let mut header = ClauseHeader::new();
            header.set_tier(Tier::Irred);

            db::add_clause(ctx, header, &simplified_lits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jamsat_formula::lits;

    #[test]
    fn unsat_on_empty_clause() {
        let mut ctx = Context::default();
        ctx.variables.increase_max_var(jamsat_formula::Var::from_index(9));
        ctx.ensure_var_count();

        load_clause(&mut ctx, &[]);

        assert_eq!(ctx.solver_state.sat_state, SatState::Unsat);
    }

    #[test]
    fn unit_clauses() {
        let mut ctx = Context::default();
        ctx.variables.increase_max_var(jamsat_formula::Var::from_index(9));
        ctx.ensure_var_count();

        load_clause(&mut ctx, &lits![1]);
        assert_eq!(ctx.trail.trail().len(), 1);

        load_clause(&mut ctx, &lits![3, -3]);
        assert_eq!(ctx.trail.trail().len(), 1);

        load_clause(&mut ctx, &lits![-2]);
        assert_eq!(ctx.trail.trail().len(), 2);

        load_clause(&mut ctx, &lits![1, 1]);
        assert_eq!(ctx.trail.trail().len(), 2);

        assert_eq!(ctx.solver_state.sat_state, SatState::Unknown);

        load_clause(&mut ctx, &lits![2]);
        assert_eq!(ctx.trail.trail().len(), 2);

        assert_eq!(ctx.solver_state.sat_state, SatState::Unsat);
    }

    #[test]
    fn binary_clauses() {
        let mut ctx = Context::default();
        ctx.variables.increase_max_var(jamsat_formula::Var::from_index(9));
        ctx.ensure_var_count();

        load_clause(&mut ctx, &lits![1, 2]);
        assert_eq!(ctx.binary_clauses.count(), 1);

        load_clause(&mut ctx, &lits![-1, 3, 3]);
        assert_eq!(ctx.binary_clauses.count(), 2);

        load_clause(&mut ctx, &lits![4, -4]);
        assert_eq!(ctx.binary_clauses.count(), 2);

        assert_eq!(ctx.solver_state.sat_state, SatState::Unknown);
    }

    #[test]
    fn long_clauses() {
        let mut ctx = Context::default();
        ctx.variables.increase_max_var(jamsat_formula::Var::from_index(9));
        ctx.ensure_var_count();

        load_clause(&mut ctx, &lits![1, 2, 3]);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 1);

        load_clause(&mut ctx, &lits![-2, 3, 3, 4]);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 2);

        load_clause(&mut ctx, &lits![4, -5, 5, 2]);
        assert_eq!(ctx.clause_db.count_by_tier(Tier::Irred), 2);

        assert_eq!(ctx.solver_state.sat_state, SatState::Unknown);
    }
}
