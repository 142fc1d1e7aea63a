//! Cleanup property: no scratch directory survives an `execute` call,
//! whatever the outcome. Kept in its own test binary so the temp-dir scan
//! cannot race scratch directories created by other tests.

use std::collections::HashSet;
use std::path::PathBuf;

use crucible_common::types::{ExecutionRequest, ExecutionStatus, Language};
use crucible_engine::languages::{LanguageSpec, Toolchain};
use crucible_engine::{ExecLimits, Executor, LanguageRegistry};

fn scratch_entries() -> HashSet<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("crucible-"))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn scratch_directories_are_removed_on_every_path() {
    let mut registry = LanguageRegistry::new();
    registry.insert(LanguageSpec {
        language: Language::Python,
        file_stem: "solution",
        extension: "sh",
        toolchain: Toolchain::Interpreted { interpreter: "sh" },
    });
    let limits = ExecLimits {
        run_timeout_ms: 500,
        ..ExecLimits::default()
    };
    let executor = Executor::new(registry, limits);

    let before = scratch_entries();

    let run = |code: &str| ExecutionRequest {
        code: code.to_string(),
        language: Language::Python,
        test_cases: Vec::new(),
    };

    let success = executor.execute(&run("echo done")).await;
    assert_eq!(success.status, ExecutionStatus::Success);

    let timeout = executor.execute(&run("sleep 30")).await;
    assert_eq!(timeout.status, ExecutionStatus::Timeout);

    let failure = executor.execute(&run("exit 1")).await;
    assert_eq!(failure.status, ExecutionStatus::Success);

    let after = scratch_entries();
    let leaked: Vec<_> = after.difference(&before).collect();
    assert!(leaked.is_empty(), "leaked scratch directories: {leaked:?}");
}
