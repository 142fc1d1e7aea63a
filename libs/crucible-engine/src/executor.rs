//! Execution orchestrator: the single public entry point.
//!
//! Dispatches to the right language adapter, runs the bare execution,
//! delegates test-case scoring to the harness, and folds every internal
//! failure into one `ExecutionResult`. Scratch directories are owned here
//! and dropped on every path, success or failure.

use std::time::Instant;

use crucible_common::error::ExecError;
use crucible_common::types::{
    ExecutionRequest, ExecutionResult, ExecutionStatus, TestCase,
};
use tracing::{info, instrument, warn};

use crate::config::ExecLimits;
use crate::harness;
use crate::languages::LanguageRegistry;
use crate::scratch::Scratch;

pub struct Executor {
    registry: LanguageRegistry,
    limits: ExecLimits,
}

impl Executor {
    pub fn new(registry: LanguageRegistry, limits: ExecLimits) -> Self {
        Executor { registry, limits }
    }

    /// Builtin language table with default limits.
    pub fn with_defaults() -> Self {
        Executor::new(LanguageRegistry::builtin(), ExecLimits::default())
    }

    pub fn limits(&self) -> &ExecLimits {
        &self.limits
    }

    /// Execute one request. Infallible from the caller's perspective:
    /// unsupported languages, compile errors, spawn failures, and timeouts
    /// all come back as a result with the matching status.
    #[instrument(
        skip(self, request),
        fields(language = %request.language, test_count = request.test_cases.len())
    )]
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();
        match self.try_execute(request, started).await {
            Ok(result) => {
                info!(
                    status = ?result.status,
                    execution_time_ms = result.execution_time_ms,
                    tests_passed = result.tests_passed,
                    total_tests = result.total_tests,
                    "execution completed"
                );
                result
            }
            Err(err) => {
                warn!(error = %err, "execution failed");
                failure_result(err, started)
            }
        }
    }

    /// Convenience for callers holding the language as a string: parses the
    /// id and runs, folding an unknown id into an `ERROR` result before any
    /// filesystem or process activity.
    pub async fn execute_parts(
        &self,
        code: &str,
        language: &str,
        test_cases: Vec<TestCase>,
    ) -> ExecutionResult {
        match language.parse() {
            Ok(language) => {
                let request = ExecutionRequest {
                    code: code.to_string(),
                    language,
                    test_cases,
                };
                self.execute(&request).await
            }
            Err(err) => {
                warn!(language, "unknown language id");
                failure_result(err, Instant::now())
            }
        }
    }

    async fn try_execute(
        &self,
        request: &ExecutionRequest,
        started: Instant,
    ) -> Result<ExecutionResult, ExecError> {
        let spec = self.registry.get(request.language)?;

        // Bare run: raw output of the user's program, no test input.
        // Failures here (compile, spawn, timeout) abort the whole request.
        let scratch = Scratch::new()?;
        let artifact = spec
            .prepare(scratch.path(), &request.code, &self.limits)
            .await?;
        let output = spec
            .invoke(&artifact, None, self.limits.run_timeout_ms, &self.limits)
            .await?;
        drop(scratch);

        let mut result = ExecutionResult {
            status: ExecutionStatus::Success,
            output: Some(output.stdout),
            // A clean exit with stderr content stays SUCCESS; the stderr is
            // surfaced so the caller can decide what it means.
            error: if output.stderr.is_empty() {
                None
            } else {
                Some(output.stderr)
            },
            execution_time_ms: started.elapsed().as_millis() as u64,
            memory_usage_bytes: None,
            tests_passed: None,
            total_tests: None,
            test_results: None,
        };

        if !request.test_cases.is_empty() {
            let test_results =
                harness::run_test_cases(&request.code, spec, &request.test_cases, &self.limits)
                    .await;
            result.tests_passed = Some(test_results.iter().filter(|r| r.passed).count());
            result.total_tests = Some(request.test_cases.len());
            result.test_results = Some(test_results);
            result.execution_time_ms = started.elapsed().as_millis() as u64;
        }

        Ok(result)
    }
}

fn failure_result(err: ExecError, started: Instant) -> ExecutionResult {
    let elapsed = started.elapsed().as_millis() as u64;
    match err {
        ExecError::Timeout { .. } => {
            ExecutionResult::failed(ExecutionStatus::Timeout, err.to_string(), elapsed)
        }
        // Surface raw compiler diagnostics, not the wrapping message.
        ExecError::Compile(diagnostics) => {
            ExecutionResult::failed(ExecutionStatus::Error, diagnostics, elapsed)
        }
        other => ExecutionResult::failed(ExecutionStatus::Error, other.to_string(), elapsed),
    }
}
