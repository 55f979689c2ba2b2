//! Plain-text rendering of workflow snapshots for the console.

use std::fmt::Write as _;

use contracts::{
    CompileResponse, CrashInfo, FuzzCampaign, HealthStatus, LogEntry, Project, ResourceUsage,
    SandboxRun,
};

use crate::logging::{level_label, source_label};

/// Full scale of the memory gauge in megabytes.
pub const MEMORY_GAUGE_FULL_SCALE_MB: f64 = 1000.0;

const GAUGE_WIDTH: usize = 20;

/// Percentage of `full_scale` that `value` represents. The result is not
/// clamped; values below the full scale stay below 100.
pub fn gauge_percent(value: f64, full_scale: f64) -> f64 {
    if full_scale <= 0.0 {
        return 0.0;
    }
    value / full_scale * 100.0
}

fn gauge_bar(percent: f64) -> String {
    let filled = ((percent / 100.0 * GAUGE_WIDTH as f64).round() as usize).min(GAUGE_WIDTH);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(GAUGE_WIDTH - filled))
}

pub fn render_compile(response: &CompileResponse) -> String {
    let mut out = String::new();
    let verdict = if response.success { "ok" } else { "failed" };
    let _ = writeln!(out, "compile: {verdict}");

    let policy = &response.policy_validation;
    if policy.passed {
        let _ = writeln!(out, "policy: all checks passed");
    } else {
        let _ = writeln!(out, "policy: FAILED");
        for violation in &policy.violations {
            let _ = writeln!(out, "  violation: {violation}");
        }
    }
    for warning in &policy.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }

    if let Some(output) = &response.output {
        let _ = writeln!(out, "output:\n{output}");
    }
    if let Some(error) = &response.error {
        let _ = writeln!(out, "error: {error}");
    }
    if let Some(ast) = &response.ast {
        let pretty = serde_json::to_string_pretty(ast).unwrap_or_else(|_| ast.to_string());
        let _ = writeln!(out, "ast:\n{pretty}");
    }
    if let Some(bytecode) = &response.bytecode {
        let _ = writeln!(out, "bytecode:\n{bytecode}");
    }
    out
}

pub fn render_resources(usage: &ResourceUsage) -> String {
    let memory_pct = gauge_percent(usage.memory_mb, MEMORY_GAUGE_FULL_SCALE_MB);
    let cpu_pct = usage.cpu_percent;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "memory {} {:.1}% ({:.1} MB)",
        gauge_bar(memory_pct),
        memory_pct,
        usage.memory_mb
    );
    let _ = writeln!(out, "cpu    {} {:.1}%", gauge_bar(cpu_pct), cpu_pct);
    let _ = writeln!(
        out,
        "time   {} ms, syscalls {}",
        usage.execution_time_ms, usage.syscalls_count
    );
    out
}

pub fn render_run(run: &SandboxRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "run {} [{}]", run.id, run.status.as_str());
    if let Some(code) = run.exit_code {
        let _ = writeln!(out, "exit code: {code}");
    }
    out.push_str(&render_resources(&run.resource_usage));
    if !run.stdout.is_empty() {
        let _ = writeln!(out, "stdout:\n{}", run.stdout);
    }
    if !run.stderr.is_empty() {
        let _ = writeln!(out, "stderr:\n{}", run.stderr);
    }
    if !run.syscall_log.is_empty() {
        let _ = writeln!(out, "syscalls:");
        for entry in &run.syscall_log {
            let flag = if entry.allowed { "allow" } else { "DENY " };
            let _ = writeln!(
                out,
                "  {flag} {}({}) -> {} @ {}",
                entry.syscall, entry.args, entry.result, entry.timestamp
            );
        }
    }
    out
}

pub fn render_campaign(campaign: &FuzzCampaign) -> String {
    let stats = &campaign.stats;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "campaign {} '{}' [{}] target={}",
        campaign.id,
        campaign.name,
        campaign.status.as_str(),
        campaign.target_binary
    );
    let _ = writeln!(
        out,
        "  execs={} crashes={} corpus={} coverage={:.1}% rate={:.0}/s mutations={}",
        stats.executions,
        stats.crashes,
        stats.corpus_size,
        stats.coverage_percent,
        stats.execs_per_second,
        stats.mutations_applied
    );
    let _ = writeln!(out, "  started {}", campaign.started_at);
    if let Some(stopped) = &campaign.stopped_at {
        let _ = writeln!(out, "  stopped {stopped}");
    }
    out
}

pub fn render_crash(crash: &CrashInfo) -> String {
    let signal = crash
        .signal
        .map(|s| format!("SIG {s}"))
        .unwrap_or_else(|| "no signal".to_string());
    format!(
        "crash {} ({signal}) at {}\n  input: {}\n  {}\n",
        crash.id, crash.discovered_at, crash.input, crash.output
    )
}

pub fn render_log_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} [{}] {} {}",
        entry.timestamp,
        source_label(entry.source),
        level_label(entry.level),
        entry.message
    );
    if let Some(details) = &entry.details {
        let _ = write!(line, "\n  details: {details}");
    }
    line
}

pub fn render_project(project: &Project) -> String {
    format!(
        "{} {} - {} (updated {})",
        project.id, project.name, project.description, project.updated_at
    )
}

pub fn render_health(health: &HealthStatus) -> String {
    format!(
        "{} {} ({})",
        health.service, health.version, health.status
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_percent_scales_without_clamping() {
        // 42 MB against a 1000 MB scale is 4.2%, shown as-is.
        let memory = gauge_percent(42.0, MEMORY_GAUGE_FULL_SCALE_MB);
        assert!((memory - 4.2).abs() < 1e-9);
        assert!((gauge_percent(10.0, 100.0) - 10.0).abs() < 1e-9);
        // Over-scale values are reported above 100 rather than capped.
        assert!(gauge_percent(1500.0, MEMORY_GAUGE_FULL_SCALE_MB) > 100.0);
        assert_eq!(gauge_percent(5.0, 0.0), 0.0);
    }

    #[test]
    fn gauge_bar_fill_tracks_percent() {
        assert_eq!(gauge_bar(0.0), format!("[{}]", " ".repeat(20)));
        assert_eq!(gauge_bar(100.0), format!("[{}]", "#".repeat(20)));
        assert_eq!(gauge_bar(50.0).matches('#').count(), 10);
        // Display stays inside the bar even for over-scale values.
        assert_eq!(gauge_bar(250.0).matches('#').count(), 20);
    }
}
