use std::{borrow::Cow, path::PathBuf, process::Stdio, time::Duration};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, Command},
};
use tracing::{debug, warn};

use super::{
    model::{WorkerReply, WorkerRequest},
    Exchange, Isolate,
};
use crate::tester::engine::EngineLimits;

/// Runs every request in a fresh child process.
///
/// The request is written to the child's stdin as JSON and a single JSON
/// reply is read back from its stdout; stderr is inherited so the worker's
/// logs stay visible. On timeout the child is killed and reaped.
#[derive(Debug, Clone)]
pub struct ProcessIsolate {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessIsolate {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> ProcessIsolate {
        ProcessIsolate {
            program: program.into(),
            args,
        }
    }

    /// The hidden `worker` subcommand of `program`, with `limits` passed on
    /// its command line.
    pub fn worker_command(program: impl Into<PathBuf>, limits: &EngineLimits) -> ProcessIsolate {
        let args = vec![
            "worker".to_owned(),
            "--memory-limit".to_owned(),
            limits.memory_limit.to_string(),
            "--max-stack-size".to_owned(),
            limits.max_stack_size.to_string(),
        ];
        ProcessIsolate::new(program, args)
    }
}

#[async_trait]
impl Isolate for ProcessIsolate {
    fn name(&self) -> Cow<'static, str> {
        "process".into()
    }

    async fn exchange(&self, request: WorkerRequest, timeout: Duration) -> Exchange {
        let payload = match serde_json::to_vec(&request) {
            Ok(payload) => payload,
            Err(e) => return Exchange::Transport(format!("Failed to encode request: {}", e)),
        };

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return Exchange::Transport(format!(
                    "Failed to start worker process `{}`: {}",
                    self.program.display(),
                    e
                ))
            }
        };

        let res = tokio::time::timeout(timeout, talk(&mut child, &payload)).await;
        match res {
            Ok(Ok(reply)) => Exchange::Reply(reply),
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Exchange::Transport(format!("{:#}", e))
            }
            Err(_) => {
                debug!(?timeout, pid = ?child.id(), "Worker process timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed-out worker process: {}", e);
                }
                Exchange::Timeout
            }
        }
    }
}

/// Send `payload`, collect the whole of stdout, wait for exit, parse.
async fn talk(child: &mut Child, payload: &[u8]) -> anyhow::Result<WorkerReply> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("Worker stdin is not piped"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Worker stdout is not piped"))?;

    // Written and read concurrently, so neither side blocks on a full pipe.
    let write = async move {
        stdin.write_all(payload).await?;
        stdin.shutdown().await
    };
    let mut buf = Vec::new();
    let (written, read) = tokio::join!(write, stdout.read_to_end(&mut buf));
    written.context("Failed to send request to worker")?;
    read.context("Failed to read worker reply")?;

    let status = child
        .wait()
        .await
        .context("Failed to wait for worker process")?;
    serde_json::from_slice(&buf)
        .with_context(|| format!("Worker exited ({}) without a valid reply", status))
}
