use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::ClassifierApi;
use crate::config::ClientConfig;
use crate::health::{ConnectivityView, HealthMonitor};
use crate::history::{HistoryPaginator, HistoryView};
use crate::segmenter::{DebouncedSegmenter, InputSurface};
use crate::session::{PredictionSession, PredictionView};

/// Presentation surfaces of one classifier screen.
#[derive(Clone)]
pub struct Views {
    pub input: Arc<dyn InputSurface>,
    pub prediction: Arc<dyn PredictionView>,
    pub history: Arc<dyn HistoryView>,
    pub connectivity: Arc<dyn ConnectivityView>,
}

/// All engine components wired for one input surface: the segmenter feeds
/// the session's word-count check, and the session refreshes history.
pub struct Workbench {
    pub segmenter: DebouncedSegmenter,
    pub session: Arc<PredictionSession>,
    pub history: HistoryPaginator,
    pub health: Arc<HealthMonitor>,
    background: Vec<JoinHandle<()>>,
}

impl Workbench {
    pub fn new(config: &ClientConfig, api: Arc<dyn ClassifierApi>, views: Views) -> Self {
        let segmenter = DebouncedSegmenter::attach(
            api.clone(),
            views.input,
            config.max_words,
            config.debounce_window(),
        );
        let history = HistoryPaginator::new(api.clone(), views.history, config.page_size);
        let session = Arc::new(
            PredictionSession::new(api.clone(), views.prediction, config.max_input_chars)
                .with_history(history.clone())
                .with_word_counts(Arc::new(segmenter.clone())),
        );
        let health = Arc::new(HealthMonitor::new(api, views.connectivity));
        Self {
            segmenter,
            session,
            history,
            health,
            background: Vec::new(),
        }
    }

    /// Starts health polling and, when configured, periodic history refresh.
    /// Tasks stop when the workbench is dropped, together with any pending
    /// word-count evaluation.
    pub fn start_background(&mut self, config: &ClientConfig) {
        self.background
            .push(self.health.clone().spawn(config.health_interval()));
        if let Some(interval) = config.history_refresh_interval() {
            self.background
                .push(self.history.spawn_auto_refresh(interval));
        }
    }
}

impl Drop for Workbench {
    fn drop(&mut self) {
        for task in self.background.drain(..) {
            task.abort();
        }
        self.segmenter.cancel();
    }
}
