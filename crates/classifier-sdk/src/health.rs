use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ClassifierApi;

/// Backend reachability as shown by the connectivity indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    /// Reachable, but reporting itself unhealthy or without a loaded model.
    Degraded,
    Unavailable,
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Connectivity::Online => "online",
            Connectivity::Degraded => "degraded",
            Connectivity::Unavailable => "unavailable",
        })
    }
}

pub trait ConnectivityView: Send + Sync {
    fn show_connectivity(&self, connectivity: Connectivity);
}

pub struct HealthMonitor {
    api: Arc<dyn ClassifierApi>,
    view: Arc<dyn ConnectivityView>,
    last: Mutex<Option<Connectivity>>,
    latest_seq: AtomicU64,
}

impl HealthMonitor {
    pub fn new(api: Arc<dyn ClassifierApi>, view: Arc<dyn ConnectivityView>) -> Self {
        Self {
            api,
            view,
            last: Mutex::new(None),
            latest_seq: AtomicU64::new(0),
        }
    }

    pub fn last(&self) -> Option<Connectivity> {
        *self.last.lock()
    }

    /// Probes `/health` once. Any failure, including a missing endpoint, reads
    /// as unavailable. The view is only told about changes, and a check that
    /// finishes after a newer one started is returned but not applied.
    pub async fn probe(&self) -> Connectivity {
        let seq = self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let connectivity = match self.api.health().await {
            Ok(status) if status.is_healthy() => Connectivity::Online,
            Ok(status) => {
                warn!(
                    target: "classifier.health",
                    status = %status.status,
                    model_loaded = status.model_loaded,
                    "backend reports degraded health"
                );
                Connectivity::Degraded
            }
            Err(err) => {
                warn!(target: "classifier.health", error = %err, "health probe failed");
                Connectivity::Unavailable
            }
        };
        let changed = {
            let mut last = self.last.lock();
            let latest = self.latest_seq.load(Ordering::SeqCst);
            if latest != seq {
                debug!(
                    target: "classifier.health",
                    seq,
                    latest,
                    %connectivity,
                    "dropping superseded health result"
                );
                return connectivity;
            }
            last.replace(connectivity) != Some(connectivity)
        };
        if changed {
            info!(target: "classifier.health", %connectivity, "connectivity changed");
            self.view.show_connectivity(connectivity);
        }
        connectivity
    }

    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.probe().await;
            }
        })
    }
}
