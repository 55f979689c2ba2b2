use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use contracts::{ResourceUsage, SandboxLogs, SandboxRun, SandboxRunRequest};
use tokio::sync::RwLock;
use tracing::warn;

use crate::logging::category_sandbox;
use crate::transport::{ApiClient, TransportError};

/// Memory limits the console offers. The string is passed through to the
/// sandbox executor verbatim; the console never interprets the magnitude.
pub const MEMORY_LIMIT_OPTIONS: [&str; 5] = ["50M", "100M", "256M", "512M", "1G"];

/// Timeout choices, same pass-through contract as memory limits.
pub const TIMEOUT_OPTIONS: [&str; 5] = ["1s", "5s", "10s", "30s", "60s"];

/// Drives bounded sandbox executions. While a run is in flight the last
/// settled run stays visible; a failed run leaves it untouched, since a
/// run either produced a record or never started.
pub struct SandboxWorkflow {
    client: Arc<ApiClient>,
    inner: Arc<RwLock<SandboxSnapshot>>,
    generation: AtomicU64,
}

#[derive(Clone, Debug, Default)]
pub struct SandboxSnapshot {
    pub running: bool,
    pub last_run: Option<SandboxRun>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SandboxConfigError {
    MissingProgram,
    AmbiguousProgram,
    InvalidMemoryLimit(String),
    InvalidTimeout(String),
}

impl std::fmt::Display for SandboxConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxConfigError::MissingProgram => {
                write!(f, "either code or a binary path must be provided")
            }
            SandboxConfigError::AmbiguousProgram => {
                write!(f, "code and binary path are mutually exclusive")
            }
            SandboxConfigError::InvalidMemoryLimit(value) => {
                write!(
                    f,
                    "unsupported memory limit '{value}' (choose one of {})",
                    MEMORY_LIMIT_OPTIONS.join(", ")
                )
            }
            SandboxConfigError::InvalidTimeout(value) => {
                write!(
                    f,
                    "unsupported timeout '{value}' (choose one of {})",
                    TIMEOUT_OPTIONS.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for SandboxConfigError {}

/// Checks a run request against the fixed option sets before anything is
/// sent over the wire. Exactly one of `code`/`binary_path` must be set.
pub fn validate_run_request(request: &SandboxRunRequest) -> Result<(), SandboxConfigError> {
    match (&request.code, &request.binary_path) {
        (None, None) => return Err(SandboxConfigError::MissingProgram),
        (Some(_), Some(_)) => return Err(SandboxConfigError::AmbiguousProgram),
        _ => {}
    }
    if let Some(limit) = &request.memory_limit
        && !MEMORY_LIMIT_OPTIONS.contains(&limit.as_str())
    {
        return Err(SandboxConfigError::InvalidMemoryLimit(limit.clone()));
    }
    if let Some(timeout) = &request.timeout
        && !TIMEOUT_OPTIONS.contains(&timeout.as_str())
    {
        return Err(SandboxConfigError::InvalidTimeout(timeout.clone()));
    }
    Ok(())
}

impl SandboxWorkflow {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            inner: Arc::new(RwLock::new(SandboxSnapshot::default())),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> SandboxSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn run(&self, request: SandboxRunRequest) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut guard = self.inner.write().await;
            guard.running = true;
        }

        match self.client.run_sandbox(&request).await {
            Ok(run) => {
                let mut guard = self.inner.write().await;
                if self.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                guard.last_run = Some(run);
                guard.running = false;
            }
            Err(err) => {
                warn!("{} run failed: {err}", category_sandbox());
                let mut guard = self.inner.write().await;
                if self.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                guard.running = false;
            }
        }
    }

    pub async fn run_history(&self) -> Result<Vec<SandboxRun>, TransportError> {
        self.client.list_sandbox_runs().await
    }

    pub async fn run_logs(&self, id: &str) -> Result<SandboxLogs, TransportError> {
        self.client.sandbox_logs(id).await
    }

    pub async fn run_resources(&self, id: &str) -> Result<ResourceUsage, TransportError> {
        self.client.sandbox_resources(id).await
    }
}
