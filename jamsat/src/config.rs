//! Solver configuration.
use jamsat_macros::DocDefault;

/// Which restart policy drives [`crate::schedule::schedule_step`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RestartPolicyKind {
    Luby,
    Glucose,
}

impl Default for RestartPolicyKind {
    fn default() -> RestartPolicyKind {
        RestartPolicyKind::Glucose
    }
}

/// Configurable parameters used during solving.
#[derive(DocDefault)]
pub struct SolverConfig {
    /// Multiplicative decay for the VSIDS decision heuristic. (Default: 0.95)
    pub vsids_decay: f32,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Number of conflicts between local clause reductions. (Default: 15000)
    pub reduce_locals_interval: u64,

    /// Number of conflicts between mid clause reductions. (Default: 10000)
    pub reduce_mids_interval: u64,

    /// Which restart policy to use. (Default: RestartPolicyKind::Glucose)
    pub restart_policy: RestartPolicyKind,

    /// Scaling factor for luby sequence based restarts (number of conflicts). (Default: 128)
    pub luby_restart_interval_scale: u64,

    /// Conflicts suppressed before the first luby restart is allowed. (Default: 0)
    pub luby_grace_time: u64,

    /// Sliding window length for the glucose restart policy's recent LBD average. (Default: 50)
    pub glucose_window_size: usize,

    /// Restart aggressiveness constant for the glucose restart policy. (Default: 0.8)
    pub glucose_k: f32,

    /// Number of conflicts between reduction passes, and the amount that interval grows by after
    /// each pass. (Default: 300)
    pub reduction_interval_increase: u64,

    /// Whether periodic level-0 simplification is enabled. (Default: true)
    pub enable_simplification: bool,

    /// Number of conflicts between simplification passes. (Default: 25000)
    pub simplify_interval: u64,
}
