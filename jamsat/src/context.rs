//! Central solver data structure.
//!
//! This module defines the `Context` data structure which holds all data used by the solver.
//! It also contains global notification functions that likely need to be extended when new
//! parts are added to the solver.
use crate::analyze_conflict::AnalyzeConflict;
use crate::assumptions::Assumptions;
use crate::binary::BinaryClauses;
use crate::clause::{ClauseActivity, ClauseAlloc, ClauseDb};
use crate::config::SolverConfig;
use crate::decision::vsids::Vsids;
use crate::model::Model;
use crate::proof::Proof;
use crate::prop::{Assignment, ImplGraph, Trail, Watchlists};
use crate::schedule::Schedule;
use crate::simplify::Simplifier;
use crate::state::SolverState;
use crate::tmp::TmpData;
use crate::variables::Variables;

/// Central solver data structure.
///
/// This struct contains all data kept by the solver. A single `&mut Context` is threaded
/// through the search loop; functions that need several fields at once take plain field
/// accesses rather than going through a borrow-splitting abstraction.
#[derive(Default)]
pub struct Context {
    pub analyze_conflict: AnalyzeConflict,
    pub assignment: Assignment,
    pub assumptions: Assumptions,
    pub binary_clauses: BinaryClauses,
    pub clause_activity: ClauseActivity,
    pub clause_alloc: ClauseAlloc,
    pub clause_db: ClauseDb,
    pub impl_graph: ImplGraph,
    pub model: Model,
    pub proof: Proof,
    pub schedule: Schedule,
    pub simplifier: Simplifier,
    pub solver_config: SolverConfig,
    pub solver_state: SolverState,
    pub tmp_data: TmpData,
    pub trail: Trail,
    pub variables: Variables,
    pub vsids: Vsids,
    pub watchlists: Watchlists,
}

impl Context {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.analyze_conflict.set_var_count(count);
        self.assignment.set_var_count(count);
        self.binary_clauses.set_var_count(count);
        self.impl_graph.set_var_count(count);
        self.simplifier.set_var_count(count);
        self.tmp_data.set_var_count(count);
        self.vsids.set_var_count(count);
        self.watchlists.set_var_count(count);
    }

    /// Increases the variable count to at least the given value.
    pub fn ensure_var_count(&mut self) {
        let count = self.variables.watermark();
        if count > self.assignment.assignment().len() {
            self.set_var_count(count)
        }
    }

    /// Propagates a change to `solver_config` to the parts that cache derived values from it.
    pub fn config_changed(&mut self) {
        self.vsids.set_decay(self.solver_config.vsids_decay);
        self.clause_activity
            .set_decay(self.solver_config.clause_activity_decay);
        self.schedule.reconfigure(&self.solver_config);
    }
}
