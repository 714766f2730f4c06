//! Scheduling of restarts, clause database reductions and simplification passes.
use log::info;

use crate::cdcl::conflict_step;
use crate::clause::reduce::{reduce_locals, reduce_mids};
use crate::clause::Tier;
use crate::config::{RestartPolicyKind, SolverConfig};
use crate::context::Context;
use crate::prop::restart;
use crate::simplify::simplify;
use crate::state::SatState;

mod glucose;
mod luby;

use glucose::GlucoseRestartPolicy;
use luby::LubySequence;

/// Scheduling of processing and solving steps.
///
/// Reduction and restart intervals are config-driven (see [`SolverConfig`]);
/// [`Context::config_changed`] calls [`Schedule::reconfigure`] to re-derive them whenever the
/// configuration is replaced.
pub struct Schedule {
    conflicts: u64,
    restarts: u64,

    next_reduce_locals: u64,
    local_reduce_interval: u64,
    next_reduce_mids: u64,
    mid_reduce_interval: u64,

    next_simplify: u64,

    luby: LubySequence,
    next_luby_restart: u64,

    glucose: GlucoseRestartPolicy,
}

impl Default for Schedule {
    fn default() -> Schedule {
        let mut schedule = Schedule {
            conflicts: 0,
            restarts: 0,
            next_reduce_locals: 0,
            local_reduce_interval: 0,
            next_reduce_mids: 0,
            mid_reduce_interval: 0,
            next_simplify: 0,
            luby: LubySequence::default(),
            next_luby_restart: 0,
            glucose: GlucoseRestartPolicy::new(0, 0.0),
        };
        schedule.reconfigure(&SolverConfig::default());
        schedule
    }
}

impl Schedule {
    /// Re-derive the scheduling intervals from a (possibly just replaced) configuration.
    ///
    /// Resets the growing reduction intervals and the Glucose policy's recent-LBD window, but
    /// keeps the conflict/restart counters used for logging.
    pub fn reconfigure(&mut self, config: &SolverConfig) {
        self.local_reduce_interval = config.reduce_locals_interval;
        self.next_reduce_locals = self.conflicts + self.local_reduce_interval;

        self.mid_reduce_interval = config.reduce_mids_interval;
        self.next_reduce_mids = self.conflicts + self.mid_reduce_interval;

        self.next_simplify = self.conflicts + config.simplify_interval;

        self.next_luby_restart = self.conflicts + config.luby_grace_time;

        self.glucose = GlucoseRestartPolicy::new(config.glucose_window_size, config.glucose_k);
    }

    /// Record the LBD of the clause learned from the most recent conflict.
    ///
    /// Feeds the Glucose restart policy regardless of which restart policy is active, so
    /// switching policies at runtime does not start the Glucose policy off with a stale window.
    pub fn register_conflict(&mut self, learned_clause_lbd: usize) {
        self.glucose.register_conflict(learned_clause_lbd);
    }
}

/// Perform one step of the schedule.
pub fn schedule_step(ctx: &mut Context) -> bool {
    if ctx.solver_state.sat_state != SatState::Unknown {
        return false;
    }

    if ctx.schedule.conflicts > 0 && ctx.schedule.conflicts % 5000 == 0 {
        let units = ctx.trail.top_level_assignment_count();
        info!(
            "confl: {}k rest: {} vars: {} bin: {} irred: {} core: {} mid: {} local: {}",
            ctx.schedule.conflicts / 1000,
            ctx.schedule.restarts,
            ctx.assignment.assignment().len() - units,
            ctx.binary_clauses.count(),
            ctx.clause_db.count_by_tier(Tier::Irred),
            ctx.clause_db.count_by_tier(Tier::Core),
            ctx.clause_db.count_by_tier(Tier::Mid),
            ctx.clause_db.count_by_tier(Tier::Local),
        );
    }

    maybe_restart(ctx);

    if ctx.schedule.conflicts >= ctx.schedule.next_reduce_locals {
        reduce_locals(ctx);
        ctx.schedule.local_reduce_interval += ctx.solver_config.reduction_interval_increase;
        ctx.schedule.next_reduce_locals =
            ctx.schedule.conflicts + ctx.schedule.local_reduce_interval;
    }
    if ctx.schedule.conflicts >= ctx.schedule.next_reduce_mids {
        reduce_mids(ctx);
        ctx.schedule.mid_reduce_interval += ctx.solver_config.reduction_interval_increase;
        ctx.schedule.next_reduce_mids = ctx.schedule.conflicts + ctx.schedule.mid_reduce_interval;
    }

    if ctx.solver_config.enable_simplification
        && ctx.schedule.conflicts >= ctx.schedule.next_simplify
        && ctx.trail.current_level() == 0
    {
        simplify(ctx);
        ctx.schedule.next_simplify =
            ctx.schedule.conflicts + ctx.solver_config.simplify_interval;
    }

    conflict_step(ctx);
    ctx.schedule.conflicts += 1;
    true
}

/// Check the active restart policy and restart if it indicates we should.
fn maybe_restart(ctx: &mut Context) {
    let should_restart = match ctx.solver_config.restart_policy {
        RestartPolicyKind::Luby => ctx.schedule.conflicts >= ctx.schedule.next_luby_restart,
        RestartPolicyKind::Glucose => ctx.schedule.glucose.should_restart(),
    };

    if !should_restart {
        return;
    }

    restart(ctx);
    ctx.schedule.restarts += 1;

    match ctx.solver_config.restart_policy {
        RestartPolicyKind::Luby => {
            let scale = ctx.solver_config.luby_restart_interval_scale;
            let advance = ctx.schedule.luby.advance();
            ctx.schedule.next_luby_restart = ctx.schedule.conflicts + scale * advance;
        }
        RestartPolicyKind::Glucose => {
            ctx.schedule.glucose.register_restart();
        }
    }
}
