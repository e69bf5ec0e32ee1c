use crate::{
    err::JudgerErr,
    runner::{process::ProcessIsolate, thread::ThreadIsolate, Isolate},
    tester::engine::EngineLimits,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Timeouts at or above this are accepted but probably a typo.
const SUSPICIOUS_TIMEOUT_MS: u64 = 10_000;

/// Where each judging exchange runs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IsolationKind {
    /// A fresh OS thread with its own engine runtime. Only the engine's
    /// interrupt poll stops it, so native work that never polls (a
    /// backtracking regex, say) outlives the timeout. For trusted code and
    /// fast tests.
    Thread,
    /// A fresh `codetest worker` child process, killed on timeout.
    Process,
}

impl Default for IsolationKind {
    fn default() -> Self {
        IsolationKind::Process
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct JudgeConfig {
    /// Wall-clock limit of one judging call, in milliseconds.
    pub timeout_ms: u64,
    pub isolation: IsolationKind,
    pub engine: EngineLimits,
    /// Extra problem files layered over the builtin catalog.
    pub problem_dir: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            isolation: IsolationKind::default(),
            engine: EngineLimits::default(),
            problem_dir: None,
        }
    }
}

impl JudgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `$CONFIG_DIR/codetest/judger.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("codetest").join("judger.toml"))
    }

    pub async fn load(path: &Path) -> Result<JudgeConfig, JudgerErr> {
        let raw = tokio::fs::read_to_string(path).await?;
        let cfg: JudgeConfig = toml::from_str(&raw)?;
        tracing::info!(path = %path.display(), "Loaded config");
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads the config at [`JudgeConfig::default_path`], falling back to
    /// defaults when there is no such file.
    pub async fn load_default() -> Result<JudgeConfig, JudgerErr> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path).await,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(JudgeConfig::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), JudgerErr> {
        if self.timeout_ms == 0 {
            return Err(JudgerErr::InvalidConfig(
                "timeout-ms must be greater than zero".into(),
            ));
        }
        if self.timeout_ms >= SUSPICIOUS_TIMEOUT_MS {
            tracing::warn!(
                timeout_ms = self.timeout_ms,
                "Judging timeout is unusually long"
            );
        }
        if self.engine.memory_limit == 0 || self.engine.max_stack_size == 0 {
            return Err(JudgerErr::InvalidConfig(
                "engine limits must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The configured backend. Process workers run the `worker` subcommand
    /// of the current executable.
    pub fn make_isolate(&self) -> Result<Arc<dyn Isolate>, JudgerErr> {
        Ok(self.make_isolate_with(std::env::current_exe()?))
    }

    /// Like [`JudgeConfig::make_isolate`], with `worker_exe` serving the
    /// `worker` subcommand.
    pub fn make_isolate_with(&self, worker_exe: impl Into<PathBuf>) -> Arc<dyn Isolate> {
        match self.isolation {
            IsolationKind::Thread => Arc::new(ThreadIsolate::new(self.engine.clone())),
            IsolationKind::Process => {
                Arc::new(ProcessIsolate::worker_command(worker_exe, &self.engine))
            }
        }
    }
}
