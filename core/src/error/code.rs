/// Process exit codes surfaced by the CLI entry points.
///
/// Each escalation class gets its own code so wrapper scripts can branch on
/// the failure without parsing stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ValidationError = 2,
    CycleDetected = 3,
    DependencyTimeout = 4,
    GateFailure = 5,
    MergeConflict = 6,
    TrackFailure = 7,
    ConfigError = 10,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
