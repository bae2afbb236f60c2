#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more thresholds failed (or had no data to judge).
    ThresholdsFailed = 11,

    /// Invalid CLI/config/scenario file. Nothing was run.
    InvalidInput = 30,

    /// The run was aborted, or an unexpected runtime failure occurred.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_run(result: &surge_core::RunResult) -> Self {
        if result.aborted() {
            Self::RuntimeError
        } else if result.passed() {
            Self::Success
        } else {
            Self::ThresholdsFailed
        }
    }
}
