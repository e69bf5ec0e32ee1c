use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Error text shown for a case whose judging call ran out of wall-clock time.
pub const TIME_LIMIT_EXCEEDED: &str = "Time Limit Exceeded";

/// One input/expected-output pair. Both sides are opaque text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> TestCase {
        TestCase {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// How a submission is judged.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum JudgeMode {
    /// Quick feedback on a single case.
    Run,
    /// Final judgment over every case.
    Submit,
}

impl Display for JudgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeMode::Run => f.write_str("run"),
            JudgeMode::Submit => f.write_str("submit"),
        }
    }
}

/// The input to one judging cycle.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
    pub mode: JudgeMode,
}

/// The result of running a source against exactly one test case.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionOutcome {
    Success { output: String },
    RuntimeFailure { message: String },
    ValidationFailure { message: String },
    Timeout,
}

impl ExecutionOutcome {
    /// The user-facing error text of a failed outcome, `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::RuntimeFailure { message } => {
                Some(format!("Runtime Error: {}", message))
            }
            ExecutionOutcome::ValidationFailure { message } => Some(message.clone()),
            ExecutionOutcome::Timeout => Some(TIME_LIMIT_EXCEEDED.to_owned()),
        }
    }
}

/// One row of a judging result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub index: usize,
    pub input: String,
    pub expected: String,
    pub actual: Option<String>,
    pub pass: bool,
    pub error: Option<String>,
}

impl Verdict {
    /// Judge `outcome` against `case`.
    ///
    /// A verdict passes only when the outcome is a success whose output is
    /// byte-for-byte the expected output. No numeric or whitespace
    /// normalization happens here.
    pub fn from_outcome(index: usize, case: &TestCase, outcome: ExecutionOutcome) -> Verdict {
        let error = outcome.error_message();
        let actual = match outcome {
            ExecutionOutcome::Success { output } => Some(output),
            _ => None,
        };
        let pass = actual.as_deref() == Some(case.output.as_str());
        Verdict {
            index,
            input: case.input.clone(),
            expected: case.output.clone(),
            actual,
            pass,
            error,
        }
    }

    /// A failing verdict that carries `error` and no output.
    pub fn failed(index: usize, case: &TestCase, error: impl Into<String>) -> Verdict {
        Verdict {
            index,
            input: case.input.clone(),
            expected: case.output.clone(),
            actual: None,
            pass: false,
            error: Some(error.into()),
        }
    }

    /// Re-derive this verdict against the host's own copy of the case.
    ///
    /// Verdicts coming back from an isolated worker are not trusted as-is:
    /// position, input, expected output and the pass flag are all recomputed.
    pub fn rejudge(self, index: usize, case: &TestCase) -> Verdict {
        let actual = if self.error.is_some() {
            None
        } else {
            self.actual
        };
        let pass = self.error.is_none() && actual.as_deref() == Some(case.output.as_str());
        Verdict {
            index,
            input: case.input.clone(),
            expected: case.output.clone(),
            actual,
            pass,
            error: self.error,
        }
    }
}

/// What the result dialog shows for a finished judging cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JudgeSummary {
    pub total: usize,
    pub passed: usize,
    /// `true` when there was at least one case and every case passed.
    pub accepted: bool,
    /// The first error among the verdicts, if any.
    pub error: Option<String>,
}

impl JudgeSummary {
    pub fn from_verdicts(verdicts: &[Verdict]) -> JudgeSummary {
        let total = verdicts.len();
        let passed = verdicts.iter().filter(|v| v.pass).count();
        JudgeSummary {
            total,
            passed,
            accepted: total > 0 && passed == total,
            error: verdicts.iter().find_map(|v| v.error.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case() -> TestCase {
        TestCase::new("3 5", "8")
    }

    #[test]
    fn pass_requires_exact_string_match() {
        let ok = Verdict::from_outcome(
            0,
            &case(),
            ExecutionOutcome::Success {
                output: "8".into(),
            },
        );
        assert!(ok.pass);

        let spaced = Verdict::from_outcome(
            0,
            &case(),
            ExecutionOutcome::Success {
                output: "8\n".into(),
            },
        );
        assert!(!spaced.pass);
        assert_eq!(spaced.actual.as_deref(), Some("8\n"));
        assert_eq!(spaced.error, None);
    }

    #[test]
    fn failures_carry_their_message_and_no_output() {
        let v = Verdict::from_outcome(
            2,
            &case(),
            ExecutionOutcome::RuntimeFailure {
                message: "boom".into(),
            },
        );
        assert_eq!(
            v,
            Verdict {
                index: 2,
                input: "3 5".into(),
                expected: "8".into(),
                actual: None,
                pass: false,
                error: Some("Runtime Error: boom".into()),
            }
        );

        let t = Verdict::from_outcome(0, &case(), ExecutionOutcome::Timeout);
        assert_eq!(t.error.as_deref(), Some(TIME_LIMIT_EXCEEDED));
        assert!(!t.pass);
    }

    #[test]
    fn rejudge_ignores_a_forged_pass_flag() {
        let forged = Verdict {
            index: 9,
            input: "whatever".into(),
            expected: "-2".into(),
            actual: Some("-2".into()),
            pass: true,
            error: None,
        };
        let v = forged.rejudge(0, &case());
        assert_eq!(v.index, 0);
        assert_eq!(v.expected, "8");
        assert!(!v.pass);
    }

    #[test]
    fn summary_counts_passes() {
        let verdicts = vec![
            Verdict::from_outcome(
                0,
                &case(),
                ExecutionOutcome::Success {
                    output: "8".into(),
                },
            ),
            Verdict::from_outcome(1, &case(), ExecutionOutcome::Timeout),
        ];
        let summary = JudgeSummary::from_verdicts(&verdicts);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert!(!summary.accepted);
        assert_eq!(summary.error.as_deref(), Some(TIME_LIMIT_EXCEEDED));
        assert!(!JudgeSummary::from_verdicts(&[]).accepted);
    }
}
