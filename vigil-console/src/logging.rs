use owo_colors::OwoColorize;
use std::sync::OnceLock;
use supports_color::Stream;
use tracing_subscriber::EnvFilter;

use contracts::{LogLevel, LogSource};

static ANSI_ENABLED: OnceLock<bool> = OnceLock::new();

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let ansi = detect_ansi();
    let _ = ANSI_ENABLED.set(ansi);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(())
}

pub fn category_compile() -> String {
    if ansi_enabled() {
        format!("{}", "COMPILE".bright_magenta().bold())
    } else {
        "COMPILE".to_string()
    }
}

pub fn category_sandbox() -> String {
    if ansi_enabled() {
        format!("{}", "SANDBOX".bright_green().bold())
    } else {
        "SANDBOX".to_string()
    }
}

pub fn category_fuzz() -> String {
    if ansi_enabled() {
        format!("{}", "FUZZ".bright_yellow().bold())
    } else {
        "FUZZ".to_string()
    }
}

pub fn source_label(source: LogSource) -> String {
    let text = source.as_str();
    if !ansi_enabled() {
        return text.to_string();
    }

    match source {
        LogSource::Compiler => format!("{}", text.bright_magenta()),
        LogSource::Sandbox => format!("{}", text.bright_green()),
        LogSource::Fuzzer => format!("{}", text.bright_yellow()),
        LogSource::System => format!("{}", text.bright_white()),
    }
}

pub fn level_label(level: LogLevel) -> String {
    let text = level.as_str().to_uppercase();
    if !ansi_enabled() {
        return text;
    }

    match level {
        LogLevel::Debug => format!("{}", text.bright_black()),
        LogLevel::Info => format!("{}", text.bright_blue()),
        LogLevel::Warning => format!("{}", text.bright_yellow()),
        LogLevel::Error => format!("{}", text.bright_red()),
        LogLevel::Critical => format!("{}", text.bright_red().bold()),
    }
}

fn ansi_enabled() -> bool {
    *ANSI_ENABLED.get_or_init(detect_ansi)
}

fn detect_ansi() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    supports_color::on_cached(Stream::Stdout).is_some()
}
