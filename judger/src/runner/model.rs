//! Messages crossing the isolation boundary. These are the only values the
//! host and an isolated worker exchange.

use serde::{Deserialize, Serialize};

use crate::tester::model::{JudgeMode, TestCase, Verdict};

/// Work posted to a fresh isolated worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub mode: JudgeMode,
    pub user_code: String,
    pub test_cases: Vec<TestCase>,
}

/// Output of a run-mode request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub output: String,
}

/// Why a worker answered with `success: false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Validation,
    Runtime,
}

/// The worker's one-shot reply.
///
/// Callers branch on `success` first. A successful run-mode reply carries
/// `result`, a successful submit-mode reply carries `results`, and a failed
/// reply carries `error` (and, from this worker, `failure`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Verdict>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl WorkerReply {
    pub fn ran(output: String) -> WorkerReply {
        WorkerReply {
            success: true,
            result: Some(RunResult { output }),
            results: None,
            error: None,
            failure: None,
        }
    }

    pub fn judged(results: Vec<Verdict>) -> WorkerReply {
        WorkerReply {
            success: true,
            result: None,
            results: Some(results),
            error: None,
            failure: None,
        }
    }

    pub fn failed(kind: FailureKind, error: impl Into<String>) -> WorkerReply {
        WorkerReply {
            success: false,
            result: None,
            results: None,
            error: Some(error.into()),
            failure: Some(kind),
        }
    }
}
