use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use contracts::{LogEntry, LogLevel};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::warn;

use crate::transport::ApiClient;

pub const DEFAULT_TIMELINE_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Holds the unified event log and refreshes it on a fixed cadence.
///
/// A refresh replaces the held set wholesale, so server-side deletions and
/// reorderings are reflected exactly. Filtering is a pure view over the
/// snapshot; it never mutates the set and never touches the network.
pub struct TimelineFeed {
    client: Arc<ApiClient>,
    inner: Arc<RwLock<TimelineSnapshot>>,
    refresh_gate: tokio::sync::Mutex<()>,
    refresh_handle: Mutex<Option<JoinHandle<()>>>,
    refresh_interval: Duration,
    weak_self: Weak<TimelineFeed>,
}

#[derive(Clone, Debug, Default)]
pub struct TimelineSnapshot {
    pub entries: Vec<LogEntry>,
    pub total_count: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LevelFilter {
    #[default]
    All,
    Exact(LogLevel),
}

impl LevelFilter {
    /// Parses `all` or a level name, case-insensitively.
    pub fn parse(raw: &str) -> Option<LevelFilter> {
        if raw.eq_ignore_ascii_case("all") {
            return Some(LevelFilter::All);
        }
        LogLevel::parse(raw).map(LevelFilter::Exact)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TimelineFilter {
    pub level: LevelFilter,
    pub search: String,
}

impl TimelineFilter {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        let level_ok = match self.level {
            LevelFilter::All => true,
            LevelFilter::Exact(level) => entry.level == level,
        };
        if !level_ok {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        entry.message.to_lowercase().contains(&needle)
            || entry.source.as_str().to_lowercase().contains(&needle)
    }

    /// Filters in server order; applying the result to itself is a no-op.
    pub fn apply<'a>(&self, entries: &'a [LogEntry]) -> Vec<&'a LogEntry> {
        entries.iter().filter(|entry| self.matches(entry)).collect()
    }
}

impl TimelineFeed {
    pub fn new(client: Arc<ApiClient>, refresh_interval: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            client,
            inner: Arc::new(RwLock::new(TimelineSnapshot::default())),
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_handle: Mutex::new(None),
            refresh_interval,
            weak_self: weak_self.clone(),
        })
    }

    pub async fn snapshot(&self) -> TimelineSnapshot {
        self.inner.read().await.clone()
    }

    /// Filter-matching entries of the current snapshot, cloned for display.
    pub async fn filtered(&self, filter: &TimelineFilter) -> Vec<LogEntry> {
        let guard = self.inner.read().await;
        filter.apply(&guard.entries).into_iter().cloned().collect()
    }

    /// Fetches the timeline and replaces the snapshot in full. On failure
    /// the previous snapshot stays visible. Skips if a refresh is already
    /// in flight.
    pub async fn refresh(&self) {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            return;
        };

        match self.client.timeline().await {
            Ok(timeline) => {
                let mut guard = self.inner.write().await;
                guard.entries = timeline.entries;
                guard.total_count = timeline.total_count;
            }
            Err(err) => {
                warn!("timeline refresh failed: {err}");
            }
        }
    }

    pub fn spawn_refresh_loop(&self) {
        let mut slot = self
            .refresh_handle
            .lock()
            .expect("refresh handle lock poisoned");
        if slot.is_some() {
            return;
        }
        let weak = self.weak_self.clone();
        let interval = self.refresh_interval;
        *slot = Some(tokio::spawn(async move {
            loop {
                let Some(feed) = weak.upgrade() else {
                    return;
                };
                feed.refresh().await;
                drop(feed);
                tokio::time::sleep(interval).await;
            }
        }));
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self
            .refresh_handle
            .lock()
            .expect("refresh handle lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for TimelineFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::LogSource;

    fn entry(id: &str, level: LogLevel, source: LogSource, message: &str) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            level,
            source,
            message: message.to_string(),
            details: None,
            timestamp: format!("2026-08-23T10:00:0{id}Z"),
        }
    }

    fn sample_entries() -> Vec<LogEntry> {
        vec![
            entry("1", LogLevel::Info, LogSource::Compiler, "compile finished"),
            entry("2", LogLevel::Error, LogSource::Sandbox, "syscall denied"),
            entry("3", LogLevel::Debug, LogSource::Fuzzer, "corpus reloaded"),
        ]
    }

    #[test]
    fn level_filter_selects_exact_level() {
        let entries = sample_entries();
        let filter = TimelineFilter {
            level: LevelFilter::parse("error").expect("filter should parse"),
            search: String::new(),
        };
        let shown = filter.apply(&entries);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "2");
    }

    #[test]
    fn search_matches_message_or_source_case_insensitively() {
        let entries = sample_entries();
        let by_message = TimelineFilter {
            level: LevelFilter::All,
            search: "SYSCALL".to_string(),
        };
        assert_eq!(by_message.apply(&entries).len(), 1);

        let by_source = TimelineFilter {
            level: LevelFilter::All,
            search: "fuzzer".to_string(),
        };
        let shown = by_source.apply(&entries);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "3");
    }

    #[test]
    fn filtering_twice_equals_filtering_once() {
        let entries = sample_entries();
        let filter = TimelineFilter {
            level: LevelFilter::Exact(LogLevel::Error),
            search: "denied".to_string(),
        };
        let once: Vec<LogEntry> = filter.apply(&entries).into_iter().cloned().collect();
        let twice: Vec<LogEntry> = filter.apply(&once).into_iter().cloned().collect();
        assert_eq!(
            once.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            twice.iter().map(|e| e.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn filter_preserves_server_order() {
        let mut entries = sample_entries();
        entries.push(entry("4", LogLevel::Error, LogSource::System, "disk full"));
        let filter = TimelineFilter {
            level: LevelFilter::Exact(LogLevel::Error),
            search: String::new(),
        };
        let shown = filter.apply(&entries);
        assert_eq!(
            shown.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["2", "4"]
        );
    }

    #[test]
    fn bogus_level_name_does_not_parse() {
        assert_eq!(LevelFilter::parse("ALL"), Some(LevelFilter::All));
        assert_eq!(
            LevelFilter::parse("Warning"),
            Some(LevelFilter::Exact(LogLevel::Warning))
        );
        assert_eq!(LevelFilter::parse("verbose"), None);
    }
}
