use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use contracts::{CrashInfo, FuzzCampaign, FuzzStartRequest};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{info, warn};

use crate::logging::category_fuzz;
use crate::transport::{ApiClient, TransportError};

pub const DEFAULT_FUZZ_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Manages a fuzz campaign and the recurring poll that keeps its stats and
/// crash list fresh.
///
/// The poll loop fetches the campaign list on a fixed interval, adopts the
/// `Running` entry if one exists and replaces the crash set wholesale from
/// the server (the server deduplicates; appending locally would drift).
/// Cycles never overlap: a tick that finds the previous round trip still
/// in flight is skipped, not queued. `shutdown` aborts the loop so a late
/// response cannot touch state owned by a torn-down view.
pub struct FuzzWorkflow {
    client: Arc<ApiClient>,
    inner: Arc<RwLock<FuzzSnapshot>>,
    poll_gate: tokio::sync::Mutex<()>,
    poll_handle: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
    weak_self: Weak<FuzzWorkflow>,
}

#[derive(Clone, Debug, Default)]
pub struct FuzzSnapshot {
    pub campaign: Option<FuzzCampaign>,
    pub crashes: Vec<CrashInfo>,
}

#[derive(Debug)]
pub enum FuzzControlError {
    /// A campaign is already running; the backend enforces a single active
    /// campaign, so the request is rejected before any network call.
    CampaignAlreadyActive { id: String },
    /// The given id does not match the currently tracked running campaign.
    CampaignNotActive { id: String },
    Transport(TransportError),
}

impl std::fmt::Display for FuzzControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuzzControlError::CampaignAlreadyActive { id } => {
                write!(f, "campaign {id} is already running; stop it first")
            }
            FuzzControlError::CampaignNotActive { id } => {
                write!(f, "campaign {id} is not the active campaign")
            }
            FuzzControlError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FuzzControlError {}

impl FuzzWorkflow {
    pub fn new(client: Arc<ApiClient>, poll_interval: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            client,
            inner: Arc::new(RwLock::new(FuzzSnapshot::default())),
            poll_gate: tokio::sync::Mutex::new(()),
            poll_handle: Mutex::new(None),
            poll_interval,
            weak_self: weak_self.clone(),
        })
    }

    pub async fn snapshot(&self) -> FuzzSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn start_campaign(
        &self,
        request: FuzzStartRequest,
    ) -> Result<FuzzCampaign, FuzzControlError> {
        {
            let guard = self.inner.read().await;
            if let Some(campaign) = &guard.campaign
                && campaign.status.is_running()
            {
                return Err(FuzzControlError::CampaignAlreadyActive {
                    id: campaign.id.clone(),
                });
            }
        }

        let campaign = self
            .client
            .start_fuzzing(&request)
            .await
            .map_err(FuzzControlError::Transport)?;
        info!(
            "{} campaign started id={} target={}",
            category_fuzz(),
            campaign.id,
            campaign.target_binary
        );

        {
            let mut guard = self.inner.write().await;
            guard.campaign = Some(campaign.clone());
        }
        self.spawn_poll_loop();
        Ok(campaign)
    }

    pub async fn stop_campaign(&self, id: &str) -> Result<(), FuzzControlError> {
        {
            let guard = self.inner.read().await;
            let matches_active = guard
                .campaign
                .as_ref()
                .is_some_and(|campaign| campaign.id == id && campaign.status.is_running());
            if !matches_active {
                return Err(FuzzControlError::CampaignNotActive { id: id.to_string() });
            }
        }

        self.client
            .stop_fuzzing(id)
            .await
            .map_err(FuzzControlError::Transport)?;
        info!("{} campaign stopped id={id}", category_fuzz());

        // Reflect the new status right away instead of waiting for a tick.
        self.poll_once().await;
        Ok(())
    }

    /// One poll cycle. Skips silently if another cycle is still in flight.
    pub async fn poll_once(&self) {
        let Ok(_gate) = self.poll_gate.try_lock() else {
            return;
        };

        let campaigns = match self.client.list_campaigns().await {
            Ok(campaigns) => campaigns,
            Err(err) => {
                warn!("{} campaign poll failed: {err}", category_fuzz());
                return;
            }
        };

        let running = campaigns
            .iter()
            .find(|campaign| campaign.status.is_running())
            .cloned();

        match running {
            Some(active) => {
                let crashes = self.client.fuzz_crashes(&active.id).await;
                let mut guard = self.inner.write().await;
                guard.campaign = Some(active);
                match crashes {
                    Ok(list) => guard.crashes = list,
                    // Keep the previous crash set; the next tick retries.
                    Err(err) => warn!("{} crash fetch failed: {err}", category_fuzz()),
                }
            }
            None => {
                // Nothing is running. Refresh the tracked campaign's record
                // if the server still lists it; crashes stay displayed.
                let mut guard = self.inner.write().await;
                let tracked_id = guard.campaign.as_ref().map(|c| c.id.clone());
                if let Some(id) = tracked_id
                    && let Some(updated) = campaigns.iter().find(|c| c.id == id)
                {
                    guard.campaign = Some(updated.clone());
                }
            }
        }
    }

    /// Starts the recurring poll if it is not already running. The task
    /// holds only a weak reference, so dropping every external handle ends
    /// the loop as well.
    pub fn spawn_poll_loop(&self) {
        let mut slot = self.poll_handle.lock().expect("poll handle lock poisoned");
        if slot.is_some() {
            return;
        }
        let weak = self.weak_self.clone();
        let interval = self.poll_interval;
        *slot = Some(tokio::spawn(async move {
            loop {
                let Some(workflow) = weak.upgrade() else {
                    return;
                };
                workflow.poll_once().await;
                drop(workflow);
                tokio::time::sleep(interval).await;
            }
        }));
    }

    /// Cancels the poll loop. An in-flight cycle is aborted at its next
    /// suspension point, so its response is never applied.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .poll_handle
            .lock()
            .expect("poll handle lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for FuzzWorkflow {
    fn drop(&mut self) {
        self.shutdown();
    }
}
