//! The isolation and cancellation harness.
//!
//! Validation and execution never happen on the caller's thread. Each call
//! hands a [`WorkerRequest`] to a fresh isolated worker, races its reply
//! against a wall-clock timer, and tears the worker down afterwards. A
//! worker that outlives the timer is stopped forcibly; user code is never
//! asked to cooperate.

pub mod model;
pub mod process;
pub mod thread;
pub mod worker;

use std::{borrow::Cow, time::Duration};

use async_trait::async_trait;

use crate::tester::model::ExecutionOutcome;
use model::{FailureKind, WorkerReply, WorkerRequest};

/// How one request/reply exchange with an isolated worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The worker answered in time.
    Reply(WorkerReply),
    /// The timer fired first and the worker was terminated.
    Timeout,
    /// The worker could not be started, or its reply could not be read.
    Transport(String),
}

impl Exchange {
    /// Interpret this exchange as the outcome of a run-mode request.
    pub fn into_run_outcome(self) -> ExecutionOutcome {
        match self {
            Exchange::Reply(WorkerReply {
                success: true,
                result: Some(result),
                ..
            }) => ExecutionOutcome::Success {
                output: result.output,
            },
            Exchange::Reply(WorkerReply { success: true, .. }) => {
                ExecutionOutcome::RuntimeFailure {
                    message: "Worker reply has no result".into(),
                }
            }
            Exchange::Reply(WorkerReply { error, failure, .. }) => {
                let message = error.unwrap_or_else(|| "Unknown worker error".into());
                match failure {
                    Some(FailureKind::Validation) => ExecutionOutcome::ValidationFailure { message },
                    _ => ExecutionOutcome::RuntimeFailure { message },
                }
            }
            Exchange::Timeout => ExecutionOutcome::Timeout,
            Exchange::Transport(message) => ExecutionOutcome::RuntimeFailure { message },
        }
    }
}

/// Something that can run a [`WorkerRequest`] in an isolated context.
///
/// Implementations must create a fresh context for every call, share
/// nothing mutable with it besides the request and the reply, hard-stop it
/// when `timeout` elapses, and never retry.
#[async_trait]
pub trait Isolate: Sync + Send {
    /// The name of this backend, used in logs.
    fn name(&self) -> Cow<'static, str>;

    async fn exchange(&self, request: WorkerRequest, timeout: Duration) -> Exchange;
}

/// Run one run-mode request in isolation and report its outcome.
pub async fn run_isolated(
    isolate: &dyn Isolate,
    request: WorkerRequest,
    timeout: Duration,
) -> ExecutionOutcome {
    isolate.exchange(request, timeout).await.into_run_outcome()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_outcome_mapping() {
        assert_eq!(
            Exchange::Reply(WorkerReply::ran("8".into())).into_run_outcome(),
            ExecutionOutcome::Success {
                output: "8".into()
            }
        );
        assert_eq!(
            Exchange::Reply(WorkerReply::failed(FailureKind::Validation, "nope"))
                .into_run_outcome(),
            ExecutionOutcome::ValidationFailure {
                message: "nope".into()
            }
        );
        assert_eq!(
            Exchange::Reply(WorkerReply::judged(vec![])).into_run_outcome(),
            ExecutionOutcome::RuntimeFailure {
                message: "Worker reply has no result".into()
            }
        );
        assert_eq!(Exchange::Timeout.into_run_outcome(), ExecutionOutcome::Timeout);
        assert_eq!(
            Exchange::Transport("spawn failed".into()).into_run_outcome(),
            ExecutionOutcome::RuntimeFailure {
                message: "spawn failed".into()
            }
        );
    }
}
