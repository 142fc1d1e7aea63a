//! Engine limits. Compile, bare-run, and per-test budgets are independent
//! deadlines; the output cap bounds memory against infinite-output programs.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RUN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecLimits {
    /// Wall-clock budget for a bare run of user code.
    pub run_timeout_ms: u64,
    /// Budget for a compiler invocation; longer than the run budget since
    /// `javac`/`g++` cold starts dominate.
    pub compile_timeout_ms: u64,
    /// Budget for one synthesized test-case run.
    pub test_timeout_ms: u64,
    /// Cap on captured stdout and stderr, each.
    pub max_output_bytes: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        ExecLimits {
            run_timeout_ms: DEFAULT_RUN_TIMEOUT_MS,
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
            test_timeout_ms: DEFAULT_TEST_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_budget_exceeds_run_budget() {
        let limits = ExecLimits::default();
        assert!(limits.compile_timeout_ms > limits.run_timeout_ms);
        assert!(limits.test_timeout_ms < limits.run_timeout_ms);
    }
}
