//! Judging through real `codetest worker` child processes.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use codetest_judger::{
    runner::process::ProcessIsolate,
    tester::{
        engine::EngineLimits,
        model::{TestCase, TIME_LIMIT_EXCEEDED},
        Judge,
    },
};
use test_log::test;

fn process_judge(timeout: Duration) -> Judge {
    let isolate =
        ProcessIsolate::worker_command(env!("CARGO_BIN_EXE_codetest"), &EngineLimits::default());
    Judge::new(Arc::new(isolate), timeout)
}

#[test(tokio::test)]
async fn submit_through_worker_process() {
    let judge = process_judge(Duration::from_secs(5));
    let cases = vec![TestCase::new("3 5", "8"), TestCase::new("1 2", "4")];
    let verdicts = judge
        .judge_all(
            r#"function solution(input){ const [a,b]=input.split(" ").map(Number); return a+b; }"#,
            &cases,
        )
        .await;

    assert_eq!(verdicts.len(), 2);
    assert!(verdicts[0].pass);
    assert!(!verdicts[1].pass);
    assert_eq!(verdicts[1].actual.as_deref(), Some("3"));
}

#[test(tokio::test)]
async fn run_rejects_disallowed_code_in_worker() {
    let judge = process_judge(Duration::from_secs(5));
    let verdict = judge
        .run_single(
            r#"function solution(){ return new WebSocket("ws://x"); }"#,
            &TestCase::new("", ""),
        )
        .await;
    assert!(!verdict.pass);
    assert!(verdict.error.unwrap().contains("WebSocket"));
}

#[test(tokio::test)]
async fn runaway_worker_is_killed() {
    let judge = process_judge(Duration::from_millis(500));
    let start = Instant::now();
    let verdict = judge
        .run_single("function solution(){ while(true){} }", &TestCase::new("", ""))
        .await;

    assert_eq!(verdict.error.as_deref(), Some(TIME_LIMIT_EXCEEDED));
    assert!(start.elapsed() < Duration::from_secs(3));
}
