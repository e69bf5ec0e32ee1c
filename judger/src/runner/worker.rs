//! The code that runs on the far side of the isolation boundary.

use std::io::{Read, Write};

use tracing::debug;

use super::model::{FailureKind, WorkerReply, WorkerRequest};
use crate::{
    prelude::CancellationToken,
    tester::{
        engine::{Engine, EngineLimits},
        model::{ExecutionOutcome, JudgeMode, Verdict},
        validate::validate,
    },
};

/// Handle one request: validate, build a fresh engine, execute, reply.
///
/// Never panics on bad user code; every failure becomes a reply.
pub fn handle(
    request: WorkerRequest,
    limits: &EngineLimits,
    interrupt: CancellationToken,
) -> WorkerReply {
    let WorkerRequest {
        mode,
        user_code,
        test_cases,
    } = request;

    if let Err(e) = validate(&user_code) {
        debug!(category = %e.category, "Source rejected");
        return WorkerReply::failed(FailureKind::Validation, e.to_string());
    }

    let engine = match Engine::new(limits, interrupt) {
        Ok(engine) => engine,
        Err(e) => {
            return WorkerReply::failed(
                FailureKind::Runtime,
                format!("Failed to start script engine: {}", e),
            )
        }
    };

    match mode {
        JudgeMode::Run => {
            let case = match test_cases.first() {
                Some(case) => case,
                None => return WorkerReply::failed(FailureKind::Runtime, "No test case to run"),
            };
            match engine.run(&user_code, &case.input) {
                ExecutionOutcome::Success { output } => WorkerReply::ran(output),
                ExecutionOutcome::RuntimeFailure { message }
                | ExecutionOutcome::ValidationFailure { message } => {
                    WorkerReply::failed(FailureKind::Runtime, message)
                }
                ExecutionOutcome::Timeout => {
                    WorkerReply::failed(FailureKind::Runtime, "Execution interrupted")
                }
            }
        }
        JudgeMode::Submit => {
            let outcomes = engine.run_batch(&user_code, &test_cases);
            let verdicts = test_cases
                .iter()
                .zip(outcomes)
                .enumerate()
                .map(|(index, (case, outcome))| Verdict::from_outcome(index, case, outcome))
                .collect();
            WorkerReply::judged(verdicts)
        }
    }
}

/// Serve exactly one request over stdio: a JSON [`WorkerRequest`] on stdin,
/// a JSON [`WorkerReply`] on stdout.
pub fn serve_stdio(limits: &EngineLimits) -> anyhow::Result<()> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let request: WorkerRequest = serde_json::from_str(&raw)?;
    debug!(mode = %request.mode, cases = request.test_cases.len(), "Worker got request");

    let reply = handle(request, limits, CancellationToken::never());

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &reply)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runner::model::RunResult;
    use crate::tester::model::TestCase;
    use pretty_assertions::assert_eq;

    fn request(mode: JudgeMode, code: &str, cases: Vec<TestCase>) -> WorkerRequest {
        WorkerRequest {
            mode,
            user_code: code.into(),
            test_cases: cases,
        }
    }

    fn handle_now(req: WorkerRequest) -> WorkerReply {
        handle(req, &EngineLimits::default(), CancellationToken::never())
    }

    #[test]
    fn run_mode_uses_the_first_case() {
        let reply = handle_now(request(
            JudgeMode::Run,
            "function solution(x){ return x.length; }",
            vec![TestCase::new("abc", "3"), TestCase::new("zz", "2")],
        ));
        assert_eq!(
            reply.result,
            Some(RunResult {
                output: "3".into()
            })
        );
        assert!(reply.success);
    }

    #[test]
    fn validation_happens_before_execution() {
        let reply = handle_now(request(
            JudgeMode::Submit,
            "function solution(){ return require('fs'); }",
            vec![TestCase::new("", "")],
        ));
        assert!(!reply.success);
        assert_eq!(reply.failure, Some(FailureKind::Validation));
        assert!(reply.results.is_none());
    }

    #[test]
    fn run_mode_runtime_error_is_a_failed_reply() {
        let reply = handle_now(request(
            JudgeMode::Run,
            "function solution(){ return undefinedThing; }",
            vec![TestCase::new("", "")],
        ));
        assert!(!reply.success);
        assert_eq!(reply.failure, Some(FailureKind::Runtime));
        let error = reply.error.unwrap();
        assert!(error.contains("undefinedThing"), "{}", error);
        assert!(error.contains("not defined"), "{}", error);
    }

    #[test]
    fn run_mode_without_cases_fails_cleanly() {
        let reply = handle_now(request(JudgeMode::Run, "function solution(){}", vec![]));
        assert!(!reply.success);
    }

    #[test]
    fn submit_mode_judges_every_case() {
        let reply = handle_now(request(
            JudgeMode::Submit,
            "function solution(x){ return Number(x) * 2; }",
            vec![TestCase::new("2", "4"), TestCase::new("5", "11")],
        ));
        let results = reply.results.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].pass);
        assert!(!results[1].pass);
        assert_eq!(results[1].actual.as_deref(), Some("10"));
    }
}
