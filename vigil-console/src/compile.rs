use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use contracts::{CompileRequest, CompileResponse, PolicyValidation};
use tokio::sync::RwLock;
use tracing::warn;

use crate::logging::category_compile;
use crate::transport::{ApiClient, TransportError};

/// Drives a single compile request/response cycle against the backend.
///
/// A submission always settles into a renderable [`CompileResponse`]: when
/// the transport fails, a synthetic response carrying the failure as a
/// policy violation takes its place. Submissions supersede each other via
/// a generation counter, so a stale in-flight response can never overwrite
/// the result of a newer one.
pub struct CompileWorkflow {
    client: Arc<ApiClient>,
    inner: Arc<RwLock<CompileSnapshot>>,
    generation: AtomicU64,
}

#[derive(Clone, Debug, Default)]
pub struct CompileSnapshot {
    pub compiling: bool,
    pub result: Option<CompileResponse>,
}

impl CompileWorkflow {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            inner: Arc::new(RwLock::new(CompileSnapshot::default())),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> CompileSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn compile(&self, source: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut guard = self.inner.write().await;
            guard.compiling = true;
        }

        let request = CompileRequest {
            code: source.to_string(),
        };
        let response = match self.client.compile(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!("{} compile request failed: {err}", category_compile());
                fallback_compile_response(&err)
            }
        };

        let mut guard = self.inner.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer submission owns the snapshot now; drop this response.
            return;
        }
        guard.result = Some(response);
        guard.compiling = false;
    }
}

/// Stand-in result for a compile whose request never reached the backend,
/// shaped so the view always has a policy verdict to show.
pub fn fallback_compile_response(err: &TransportError) -> CompileResponse {
    CompileResponse {
        success: false,
        ast: None,
        bytecode: None,
        policy_validation: PolicyValidation {
            passed: false,
            violations: vec![format!("failed to reach the compile service: {err}")],
            warnings: Vec::new(),
        },
        error: Some(err.to_string()),
        output: None,
    }
}
