use std::{borrow::Cow, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use super::{
    model::{WorkerReply, WorkerRequest},
    worker, Exchange, Isolate,
};
use crate::{prelude::CancellationTokenHandle, tester::engine::EngineLimits};

const MIN_WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Runs every request on a fresh OS thread with its own script runtime.
///
/// The request is moved into the thread and the reply comes back over a
/// one-shot channel; the only other link is the cancellation token wired to
/// the engine's interrupt handler. When the timer fires the token is
/// cancelled and the caller gets its answer without waiting for the worker.
///
/// The thread only stops at the engine's next interrupt poll. A native call
/// that never returns to the interpreter, such as a catastrophically
/// backtracking regex, keeps its thread and a core busy until it finishes.
/// Use [`super::process::ProcessIsolate`] for untrusted code.
#[derive(Debug, Clone, Default)]
pub struct ThreadIsolate {
    limits: EngineLimits,
}

impl ThreadIsolate {
    pub fn new(limits: EngineLimits) -> ThreadIsolate {
        ThreadIsolate { limits }
    }

    fn stack_size(&self) -> usize {
        MIN_WORKER_STACK_SIZE.max(self.limits.max_stack_size.saturating_mul(4))
    }
}

#[async_trait]
impl Isolate for ThreadIsolate {
    fn name(&self) -> Cow<'static, str> {
        "thread".into()
    }

    async fn exchange(&self, request: WorkerRequest, timeout: Duration) -> Exchange {
        let (tx, rx) = tokio::sync::oneshot::channel::<WorkerReply>();
        let handle = CancellationTokenHandle::new();
        let token = handle.get_token();
        // Stop the worker whenever we stop waiting for it, including when this
        // future is dropped half-way.
        let _stop_worker = scopeguard::guard(handle, |h| h.cancel());

        let limits = self.limits.clone();
        let spawned = std::thread::Builder::new()
            .name("judge-worker".into())
            .stack_size(self.stack_size())
            .spawn(move || {
                let reply = worker::handle(request, &limits, token);
                // The receiver is gone if we already timed out.
                let _ = tx.send(reply);
            });
        if let Err(e) = spawned {
            return Exchange::Transport(format!("Failed to start worker thread: {}", e));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Exchange::Reply(reply),
            Ok(Err(_)) => Exchange::Transport("Worker exited without replying".into()),
            Err(_) => {
                debug!(?timeout, "Worker thread timed out, interrupting");
                Exchange::Timeout
            }
        }
    }
}
