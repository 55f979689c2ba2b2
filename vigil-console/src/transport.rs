use contracts::{
    CompileRequest, CompileResponse, CrashInfo, CreateProjectRequest, FuzzCampaign,
    FuzzStartRequest, FuzzStopResponse, HealthStatus, LogEntry, Project, ResourceUsage,
    SandboxLogs, SandboxRun, SandboxRunRequest, TimelineResponse,
};
use reqwest::header::CONTENT_TYPE;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

/// JSON-over-HTTP client for the research backend. One instance is shared
/// by every workflow; no retries are performed here, retry policy belongs
/// to the caller.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug)]
pub enum TransportError {
    /// No response was received at all.
    Network(reqwest::Error),
    /// The server answered with a non-2xx status.
    Http { status: u16, status_text: String },
    /// The body arrived but did not parse as the expected shape.
    Decode(reqwest::Error),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Network(err) => write!(f, "network error: {err}"),
            TransportError::Http {
                status,
                status_text,
            } => write!(f, "HTTP {status}: {status_text}"),
            TransportError::Decode(err) => write!(f, "malformed response body: {err}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, TransportError> {
        let request = self
            .http
            .get(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json");
        self.dispatch(endpoint, request).await
    }

    async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.post(self.url(endpoint)).json(body);
        self.dispatch(endpoint, request).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, TransportError> {
        let request = self
            .http
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json");
        self.dispatch(endpoint, request).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request.send().await.map_err(|err| {
            warn!("api request failed endpoint={endpoint} err={err}");
            TransportError::Network(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("api request rejected endpoint={endpoint} status={status}");
            return Err(TransportError::Http {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        response.json::<T>().await.map_err(|err| {
            warn!("failed to decode api response endpoint={endpoint} err={err}");
            TransportError::Decode(err)
        })
    }

    // Compile

    pub async fn compile(&self, request: &CompileRequest) -> Result<CompileResponse, TransportError> {
        self.post("/api/compile", request).await
    }

    pub async fn compile_ast(&self) -> Result<serde_json::Value, TransportError> {
        self.get("/api/compile/ast").await
    }

    pub async fn compile_bytecode(&self) -> Result<serde_json::Value, TransportError> {
        self.get("/api/compile/bytecode").await
    }

    // Sandbox

    pub async fn run_sandbox(&self, request: &SandboxRunRequest) -> Result<SandboxRun, TransportError> {
        self.post("/api/sandbox/run", request).await
    }

    pub async fn sandbox_logs(&self, id: &str) -> Result<SandboxLogs, TransportError> {
        self.get(&format!("/api/sandbox/logs/{id}")).await
    }

    pub async fn sandbox_resources(&self, id: &str) -> Result<ResourceUsage, TransportError> {
        self.get(&format!("/api/sandbox/resources/{id}")).await
    }

    pub async fn list_sandbox_runs(&self) -> Result<Vec<SandboxRun>, TransportError> {
        self.get("/api/sandbox/runs").await
    }

    // Fuzzing

    pub async fn start_fuzzing(&self, request: &FuzzStartRequest) -> Result<FuzzCampaign, TransportError> {
        self.post("/api/fuzz/start", request).await
    }

    pub async fn stop_fuzzing(&self, id: &str) -> Result<FuzzStopResponse, TransportError> {
        self.post_empty(&format!("/api/fuzz/stop/{id}")).await
    }

    pub async fn fuzz_status(&self, id: &str) -> Result<FuzzCampaign, TransportError> {
        self.get(&format!("/api/fuzz/status/{id}")).await
    }

    pub async fn fuzz_crashes(&self, id: &str) -> Result<Vec<CrashInfo>, TransportError> {
        self.get(&format!("/api/fuzz/crashes/{id}")).await
    }

    pub async fn list_campaigns(&self) -> Result<Vec<FuzzCampaign>, TransportError> {
        self.get("/api/fuzz/campaigns").await
    }

    // Logs

    pub async fn logs(&self) -> Result<Vec<LogEntry>, TransportError> {
        self.get("/api/logs").await
    }

    pub async fn timeline(&self) -> Result<TimelineResponse, TransportError> {
        self.get("/api/logs/timeline").await
    }

    // Projects

    pub async fn list_projects(&self) -> Result<Vec<Project>, TransportError> {
        self.get("/api/projects").await
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project, TransportError> {
        self.post("/api/projects", request).await
    }

    // Health

    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        self.get("/health").await
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_base_url;

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        assert_eq!(normalize_base_url("http://x:3000/"), "http://x:3000");
        assert_eq!(normalize_base_url("http://x:3000"), "http://x:3000");
    }
}
