//! Test harness: wraps user code in a per-test driver program, runs it
//! through the normal adapter path, and scores trimmed stdout against the
//! expected output.
//!
//! The harness knows nothing about how processes run; it only synthesizes
//! source text and compares strings. A failure in one test case becomes a
//! failing verdict for that case and never aborts the rest.

use std::io;

use crucible_common::error::ExecError;
use crucible_common::types::{Language, TestCase, TestResult};
use tracing::{debug, warn};

use crate::config::ExecLimits;
use crate::languages::LanguageSpec;
use crate::scratch::Scratch;

/// Entry class for the synthesized Java driver. Lives in the same source
/// file as the user's `Solution` class, so it must not be public.
const JAVA_TEST_CLASS: &str = "TestSolution";

/// Run every test case in order, one verdict per case.
pub async fn run_test_cases(
    code: &str,
    spec: &LanguageSpec,
    test_cases: &[TestCase],
    limits: &ExecLimits,
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(test_cases.len());
    for test_case in test_cases {
        let result = match run_single(code, spec, test_case, limits).await {
            Ok(result) => result,
            Err(err) => {
                warn!(test_id = %test_case.id, error = %err, "test case failed to run");
                TestResult {
                    passed: false,
                    input: test_case.input.clone(),
                    expected: test_case.expected_output.clone(),
                    actual: err.to_string(),
                }
            }
        };
        debug!(test_id = %test_case.id, passed = result.passed, "test case evaluated");
        results.push(result);
    }
    results
}

async fn run_single(
    code: &str,
    spec: &LanguageSpec,
    test_case: &TestCase,
    limits: &ExecLimits,
) -> Result<TestResult, ExecError> {
    let wrapper = synthesize(code, spec.language, &test_case.input)?;
    let scratch = Scratch::new()?;
    let artifact = spec
        .prepare_with_main(scratch.path(), &wrapper, limits, Some(JAVA_TEST_CLASS))
        .await?;
    let output = spec
        .invoke(&artifact, None, limits.test_timeout_ms, limits)
        .await?;

    let actual = output.stdout.trim();
    Ok(TestResult {
        passed: actual == test_case.expected_output.trim(),
        input: test_case.input.clone(),
        expected: test_case.expected_output.clone(),
        actual: actual.to_string(),
    })
}

/// Build the driver program: the user's code verbatim, then a call to the
/// fixed `solution` entry point with the test input embedded as a JSON
/// string literal (valid literal syntax in all four target languages, and
/// safe against quotes and control characters in the input).
pub fn synthesize(code: &str, language: Language, input: &str) -> Result<String, ExecError> {
    let literal = serde_json::to_string(input)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let wrapper = match language {
        Language::Javascript => format!(
            "{code}\n\nconst input = {literal};\nconst result = solution(input);\nconsole.log(result);\n"
        ),
        Language::Python => format!(
            "{code}\n\ninput = {literal}\nresult = solution(input)\nprint(result)\n"
        ),
        Language::Java => format!(
            "{code}\n\nclass {JAVA_TEST_CLASS} {{\n    public static void main(String[] args) {{\n        String input = {literal};\n        String result = Solution.solution(input);\n        System.out.println(result);\n    }}\n}}\n"
        ),
        Language::Cpp => format!(
            "{code}\n\nint main() {{\n    string input = {literal};\n    string result = solution(input);\n    cout << result << endl;\n    return 0;\n}}\n"
        ),
    };
    Ok(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_embeds_user_code_verbatim() {
        let code = "def solution(x):\n    return x";
        let wrapper = synthesize(code, Language::Python, "5").unwrap();
        assert!(wrapper.starts_with(code));
        assert!(wrapper.contains("input = \"5\""));
        assert!(wrapper.ends_with("print(result)\n"));
    }

    #[test]
    fn input_with_quotes_is_escaped() {
        let wrapper = synthesize("function solution(s) { return s; }", Language::Javascript, "say \"hi\"\n")
            .unwrap();
        assert!(wrapper.contains(r#"const input = "say \"hi\"\n";"#));
    }

    #[test]
    fn java_wrapper_drives_the_solution_class() {
        let wrapper = synthesize("public class Solution {}", Language::Java, "in").unwrap();
        assert!(wrapper.contains("class TestSolution"));
        assert!(wrapper.contains("Solution.solution(input)"));
    }

    #[test]
    fn cpp_wrapper_appends_a_main() {
        let wrapper = synthesize("string solution(string s) { return s; }", Language::Cpp, "in").unwrap();
        assert!(wrapper.contains("int main()"));
        assert!(wrapper.contains("cout << result << endl;"));
    }
}
