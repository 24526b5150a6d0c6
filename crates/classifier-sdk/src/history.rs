use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::ClassifierApi;
use crate::error::{ApiResult, UserMessage};
use crate::model::{HistorySource, PredictionId, PredictionRecord};

pub const EMPTY_HISTORY_TEXT: &str = "No predictions yet. Make your first prediction!";

/// The page currently shown. Rebuilt wholesale from every successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    pub page_number: u32,
    pub total_pages: u32,
    pub rows: Vec<PredictionRecord>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page_number: 1,
            total_pages: 1,
            rows: Vec::new(),
        }
    }
}

impl PageState {
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn contains(&self, page: u32) -> bool {
        (1..=self.total_pages).contains(&page)
    }

    pub fn position_label(&self) -> String {
        format!("Page {} of {}", self.page_number, self.total_pages)
    }
}

pub trait HistoryView: Send + Sync {
    fn show_loading(&self, page: u32);
    fn show_page(&self, page: &PageState);
    fn show_error(&self, message: &UserMessage);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Rejected before any network call.
    OutOfRange,
    /// A newer load was requested while this one was in flight.
    Superseded,
}

struct HistoryState {
    page: PageState,
    /// Page of the newest load, applied or still in flight.
    requested_page: u32,
    latest_seq: u64,
}

struct HistoryInner {
    api: Arc<dyn ClassifierApi>,
    view: Arc<dyn HistoryView>,
    page_size: u32,
    state: Mutex<HistoryState>,
}

/// Paged view over past predictions. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct HistoryPaginator {
    inner: Arc<HistoryInner>,
}

impl HistoryPaginator {
    pub fn new(api: Arc<dyn ClassifierApi>, view: Arc<dyn HistoryView>, page_size: u32) -> Self {
        Self {
            inner: Arc::new(HistoryInner {
                api,
                view,
                page_size: page_size.max(1),
                state: Mutex::new(HistoryState {
                    page: PageState::default(),
                    requested_page: 1,
                    latest_seq: 0,
                }),
            }),
        }
    }

    pub fn page(&self) -> PageState {
        self.inner.state.lock().page.clone()
    }

    pub fn current_page(&self) -> u32 {
        self.inner.state.lock().page.page_number
    }

    /// Navigation steps from here so a refresh never undoes a page change
    /// that is still loading.
    fn requested_page(&self) -> u32 {
        self.inner.state.lock().requested_page
    }

    /// Fetches `page` and replaces the current page state with it.
    ///
    /// Pages outside `[1, total_pages]` are a no-op. When loads race, only the
    /// most recently requested one is applied.
    pub async fn load(&self, page: u32) -> ApiResult<LoadOutcome> {
        let seq = {
            let mut state = self.inner.state.lock();
            if !state.page.contains(page) {
                debug!(
                    target: "classifier.history",
                    page,
                    total_pages = state.page.total_pages,
                    "ignoring out-of-range page request"
                );
                return Ok(LoadOutcome::OutOfRange);
            }
            state.latest_seq += 1;
            state.requested_page = page;
            state.latest_seq
        };
        self.inner.view.show_loading(page);

        let result = self.inner.api.predictions(page, self.inner.page_size).await;

        let mut state = self.inner.state.lock();
        if state.latest_seq != seq {
            debug!(
                target: "classifier.history",
                page,
                seq,
                latest = state.latest_seq,
                "dropping superseded history response"
            );
            return Ok(LoadOutcome::Superseded);
        }
        match result {
            Ok(fetched) => {
                if fetched.source == HistorySource::Legacy {
                    debug!(target: "classifier.history", page, "served by legacy history endpoint");
                }
                let total_pages = fetched.total_pages.max(1);
                state.page = PageState {
                    page_number: page.min(total_pages),
                    total_pages,
                    rows: fetched.rows,
                };
                state.requested_page = state.page.page_number;
                let snapshot = state.page.clone();
                drop(state);
                self.inner.view.show_page(&snapshot);
                Ok(LoadOutcome::Loaded)
            }
            Err(err) => {
                state.requested_page = state.page.page_number;
                drop(state);
                warn!(target: "classifier.history", page, error = %err, "history load failed");
                self.inner.view.show_error(&err.user_message());
                Err(err)
            }
        }
    }

    pub async fn next(&self) -> ApiResult<LoadOutcome> {
        let page = self.requested_page().saturating_add(1);
        self.load(page).await
    }

    pub async fn previous(&self) -> ApiResult<LoadOutcome> {
        let page = self.requested_page().saturating_sub(1);
        self.load(page).await
    }

    pub async fn go_to(&self, page: u32) -> ApiResult<LoadOutcome> {
        self.load(page).await
    }

    pub async fn refresh(&self) -> ApiResult<LoadOutcome> {
        let page = self.requested_page();
        self.load(page).await
    }

    /// Records feedback for any row, then reloads the current page so the row
    /// reflects what the server stored.
    pub async fn feedback(&self, id: &PredictionId, liked: bool) -> ApiResult<LoadOutcome> {
        if let Err(err) = self.inner.api.send_feedback(id, liked).await {
            warn!(target: "classifier.history", id = %id, error = %err, "row feedback failed");
            self.inner.view.show_error(&err.user_message());
            return Err(err);
        }
        debug!(target: "classifier.history", id = %id, liked, "row feedback stored");
        self.refresh().await
    }

    /// Reloads the current page every `interval` until the handle is aborted.
    pub fn spawn_auto_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let paginator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = paginator.refresh().await {
                    debug!(target: "classifier.history", error = %err, "auto refresh failed");
                }
            }
        })
    }
}
