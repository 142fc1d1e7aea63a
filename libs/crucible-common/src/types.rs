//! Shared data model for code execution requests and results.
//!
//! Wire shape matches what the surrounding service persists: camelCase
//! fields, `SCREAMING` status strings, optional fields omitted when unset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Closed set of supported languages. The registry maps each variant to its
/// toolchain; an id outside this set fails at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Python,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Javascript,
        Language::Python,
        Language::Java,
        Language::Cpp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "javascript" => Ok(Language::Javascript),
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "cpp" => Ok(Language::Cpp),
            other => Err(ExecError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// One test case. Identity is `id`; output equality is trimmed string
/// comparison. `is_hidden` is display metadata for the caller; the engine
/// does not branch on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
}

/// Immutable input to one `execute` call; read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
}

/// Per-test verdict; one entry per input test case, input order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub expected: String,
    pub actual: String,
}

/// Produced exactly once per request. When test cases were supplied,
/// `test_results.len() == total_tests` and `tests_passed` counts the
/// `passed` entries; all three are `None` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tests: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_results: Option<Vec<TestResult>>,
}

impl ExecutionResult {
    /// A failure result with no output and no test-case fields.
    pub fn failed(status: ExecutionStatus, error: String, execution_time_ms: u64) -> Self {
        ExecutionResult {
            status,
            output: None,
            error: Some(error),
            execution_time_ms,
            memory_usage_bytes: None,
            tests_passed: None,
            total_tests: None,
            test_results: None,
        }
    }
}
