//! Miscellaneous solver state.

/// Satisfiability state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatState {
    Unknown,
    Sat,
    Unsat,
    UnsatUnderAssumptions,
}

impl Default for SatState {
    fn default() -> SatState {
        SatState::Unknown
    }
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be moved into a separate
/// part of [`Context`](crate::context::Context).
#[derive(Default)]
pub struct SolverState {
    pub sat_state: SatState,
    /// Cooperative stop flag, polled once per [`crate::schedule::schedule_step`] call.
    ///
    /// Set by an external interrupt watcher or timeout; never touched by the search loop itself.
    pub stop_requested: bool,
}
