//! CLI commands: thin glue around the engine.

use anyhow::{Context, Result};
use crucible_common::types::{ExecutionStatus, TestCase};
use crucible_engine::{ExecLimits, Executor, LanguageRegistry};
use tracing::debug;

pub async fn run(
    file: &str,
    language: &str,
    tests_path: Option<&str>,
    timeout_ms: Option<u64>,
    compile_timeout_ms: Option<u64>,
    test_timeout_ms: Option<u64>,
) -> Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read source file: {file}"))?;

    let test_cases: Vec<TestCase> = match tests_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read test case file: {path}"))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse test cases in {path}"))?
        }
        None => Vec::new(),
    };

    let mut limits = ExecLimits::default();
    if let Some(ms) = timeout_ms {
        limits.run_timeout_ms = ms;
    }
    if let Some(ms) = compile_timeout_ms {
        limits.compile_timeout_ms = ms;
    }
    if let Some(ms) = test_timeout_ms {
        limits.test_timeout_ms = ms;
    }
    debug!(?limits, language, test_count = test_cases.len(), "executing");

    let executor = Executor::new(LanguageRegistry::builtin(), limits);
    let result = executor.execute_parts(&code, language, test_cases).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.status != ExecutionStatus::Success {
        std::process::exit(1);
    }
    Ok(())
}

pub fn languages() {
    for language in LanguageRegistry::builtin().languages() {
        println!("{language}");
    }
}
