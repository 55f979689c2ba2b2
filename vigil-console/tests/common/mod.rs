#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use contracts::{
    CrashInfo, FuzzCampaign, FuzzStats, FuzzStatus, LogEntry, LogLevel, LogSource, ResourceUsage,
    RunStatus, SandboxRun,
};
use tokio::task::JoinHandle;

pub async fn spawn_server(app: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    (addr, handle)
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

pub fn campaign(id: &str, status: FuzzStatus) -> FuzzCampaign {
    FuzzCampaign {
        id: id.to_string(),
        name: format!("campaign-{id}"),
        status,
        target_binary: "test_target".to_string(),
        stats: FuzzStats {
            executions: 120_000,
            crashes: 2,
            corpus_size: 412,
            coverage_percent: 78.5,
            execs_per_second: 2_100.0,
            mutations_applied: 98_000,
        },
        started_at: "2026-08-23T10:00:00Z".to_string(),
        stopped_at: None,
    }
}

pub fn crash(id: &str, campaign_id: &str) -> CrashInfo {
    CrashInfo {
        id: id.to_string(),
        campaign_id: campaign_id.to_string(),
        input: "\\x41\\x41\\x41\\x41".to_string(),
        signal: Some(11),
        output: "segmentation fault".to_string(),
        discovered_at: "2026-08-23T10:01:00Z".to_string(),
    }
}

pub fn log_entry(id: &str, level: LogLevel, source: LogSource, message: &str) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        level,
        source,
        message: message.to_string(),
        details: None,
        timestamp: format!("2026-08-23T10:00:00.{id:0>3}Z"),
    }
}

pub fn sandbox_run(id: &str) -> SandboxRun {
    SandboxRun {
        id: id.to_string(),
        status: RunStatus::Completed,
        stdout: "50\n".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        syscall_log: Vec::new(),
        resource_usage: ResourceUsage {
            memory_mb: 42.0,
            cpu_percent: 10.0,
            execution_time_ms: 120,
            syscalls_count: 7,
        },
        created_at: "2026-08-23T10:00:00Z".to_string(),
        completed_at: Some("2026-08-23T10:00:01Z".to_string()),
    }
}
