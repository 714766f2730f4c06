//! Compute glue levels of clauses.
//!
//! The glue level of a propagating clause is the number of distinct decision levels of the clause's
//! variables. This is also called the literal block distance (LBD). For each clause the smallest
//! glue level observed is used as an indicator of how useful that clause is.

use jamsat_formula::Lit;

use crate::context::Context;

/// Compute the glue level of a clause.
pub fn compute_glue(ctx: &mut Context, lits: &[Lit]) -> usize {
    let flags = &mut ctx.tmp_data.flags;

    let mut glue = 0;

    for &lit in lits {
        let level = ctx.impl_graph.level(lit.var());
        let flag = &mut flags[level];
        if !*flag {
            *flag = true;
            glue += 1
        }
    }

    for &lit in lits {
        let level = ctx.impl_graph.level(lit.var());
        ctx.tmp_data.flags[level] = false;
    }

    glue
}
