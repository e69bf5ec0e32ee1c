//! The judging protocol: drives the isolation harness over a problem's test
//! cases and turns what comes back into [`Verdict`]s.
//!
//! [`Judge`] holds configuration only. Callers own the source text and the
//! verdicts; nothing is remembered between calls.

pub mod diff;
pub mod engine;
pub mod model;
pub mod validate;

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, info_span, Instrument};

use crate::{
    prelude::FlowSnake,
    runner::{model::WorkerRequest, run_isolated, Exchange, Isolate},
};
use model::{
    ExecutionOutcome, JudgeMode, SubmissionRequest, TestCase, Verdict, TIME_LIMIT_EXCEEDED,
};
use validate::validate;

pub struct Judge {
    isolate: Arc<dyn Isolate>,
    timeout: Duration,
}

impl Judge {
    /// `timeout` bounds each judging call as a whole, in wall-clock time.
    pub fn new(isolate: Arc<dyn Isolate>, timeout: Duration) -> Judge {
        Judge { isolate, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Judge `source` on a single case. This is the quick "Run" action.
    pub async fn run_single(&self, source: &str, case: &TestCase) -> Verdict {
        let id = FlowSnake::generate();
        let span = info_span!("judge", %id, mode = "run", isolate = %self.isolate.name());
        async move {
            let request = WorkerRequest {
                mode: JudgeMode::Run,
                user_code: source.to_owned(),
                test_cases: vec![case.clone()],
            };
            let outcome = run_isolated(self.isolate.as_ref(), request, self.timeout).await;
            let verdict = Verdict::from_outcome(0, case, outcome);
            info!(pass = verdict.pass, "Run finished");
            verdict
        }
        .instrument(span)
        .await
    }

    /// Judge `source` on every case, returning one verdict per case in the
    /// order given.
    ///
    /// Validation is a property of the source, so it is checked once up
    /// front. A rejected source fails every case with the same message and
    /// nothing is executed.
    pub async fn judge_all(&self, source: &str, cases: &[TestCase]) -> Vec<Verdict> {
        let id = FlowSnake::generate();
        let span = info_span!(
            "judge",
            %id,
            mode = "submit",
            isolate = %self.isolate.name(),
            cases = cases.len()
        );
        async move {
            if let Err(e) = validate(source) {
                info!(category = %e.category, "Source rejected before execution");
                let message = e.to_string();
                return fail_all(cases, &message);
            }
            if cases.is_empty() {
                return vec![];
            }

            let request = WorkerRequest {
                mode: JudgeMode::Submit,
                user_code: source.to_owned(),
                test_cases: cases.to_vec(),
            };
            let verdicts = match self.isolate.exchange(request, self.timeout).await {
                Exchange::Reply(reply) if reply.success => match reply.results {
                    Some(results) if results.len() == cases.len() => results
                        .into_iter()
                        .zip(cases)
                        .enumerate()
                        .map(|(index, (verdict, case))| verdict.rejudge(index, case))
                        .collect(),
                    Some(results) => {
                        let message = format!(
                            "Runtime Error: worker returned {} results for {} cases",
                            results.len(),
                            cases.len()
                        );
                        fail_all(cases, &message)
                    }
                    None => fail_all(cases, "Runtime Error: worker reply has no results"),
                },
                Exchange::Reply(reply) => {
                    let outcome = Exchange::Reply(reply).into_run_outcome();
                    let message = outcome
                        .error_message()
                        .unwrap_or_else(|| "Runtime Error: unknown worker error".into());
                    fail_all(cases, &message)
                }
                Exchange::Timeout => fail_all(cases, TIME_LIMIT_EXCEEDED),
                Exchange::Transport(message) => {
                    let outcome = ExecutionOutcome::RuntimeFailure { message };
                    let message = outcome.error_message().unwrap_or_default();
                    fail_all(cases, &message)
                }
            };

            let passed = verdicts.iter().filter(|v| v.pass).count();
            info!(passed, total = verdicts.len(), "Submission judged");
            verdicts
        }
        .instrument(span)
        .await
    }

    /// Judge a whole [`SubmissionRequest`] according to its mode. Run mode
    /// judges the first case only.
    pub async fn judge(&self, request: &SubmissionRequest) -> Vec<Verdict> {
        match request.mode {
            JudgeMode::Run => match request.test_cases.first() {
                Some(case) => vec![self.run_single(&request.source_code, case).await],
                None => {
                    debug!("Run requested without test cases");
                    vec![]
                }
            },
            JudgeMode::Submit => {
                self.judge_all(&request.source_code, &request.test_cases)
                    .await
            }
        }
    }
}

fn fail_all(cases: &[TestCase], message: &str) -> Vec<Verdict> {
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| Verdict::failed(index, case, message))
        .collect()
}
