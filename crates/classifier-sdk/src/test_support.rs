//! Scripted backend and recording views for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::client::ClassifierApi;
use crate::error::{ApiError, ApiResult, ErrorDetail, UserMessage};
use crate::health::{Connectivity, ConnectivityView};
use crate::history::{HistoryView, PageState};
use crate::label::Label;
use crate::model::{
    Feedback, HealthStatus, HistoryPage, PredictionId, PredictionRecord, SegmentationResult,
};
use crate::segmenter::{InputSurface, WordCount, WordCountSource};
use crate::session::PredictionView;

pub(crate) fn record(id: u64) -> PredictionRecord {
    PredictionRecord {
        id: PredictionId::from(id),
        input_text: format!("text {id}"),
        label: Label::Economic,
        confidence: 91.2,
        created_at: None,
        feedback: Feedback::Unset,
    }
}

pub(crate) fn server_error() -> ApiError {
    ApiError::ServerError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: String::new(),
    }
}

pub(crate) fn client_error(message: &str) -> ApiError {
    ApiError::ClientError {
        status: StatusCode::BAD_REQUEST,
        detail: ErrorDetail {
            message: message.to_string(),
            suggestion: None,
        },
    }
}

fn unscripted<T>(operation: &str) -> ApiResult<T> {
    Err(ApiError::MalformedResponse(format!(
        "no scripted {operation} response"
    )))
}

/// Gate that holds the next call of one operation until notified.
#[derive(Default)]
struct Gate(Mutex<Option<Arc<Notify>>>);

impl Gate {
    fn arm(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.0.lock() = Some(notify.clone());
        notify
    }

    async fn pass(&self) {
        let notify = self.0.lock().take();
        if let Some(notify) = notify {
            notify.notified().await;
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    predict: Mutex<VecDeque<ApiResult<PredictionRecord>>>,
    feedback: Mutex<VecDeque<ApiResult<()>>>,
    segment: Mutex<VecDeque<ApiResult<SegmentationResult>>>,
    history: Mutex<VecDeque<ApiResult<HistoryPage>>>,
    health: Mutex<VecDeque<ApiResult<HealthStatus>>>,
    predict_calls: Mutex<Vec<String>>,
    feedback_calls: Mutex<Vec<(String, bool)>>,
    segment_calls: Mutex<Vec<String>>,
    history_calls: Mutex<Vec<(u32, u32)>>,
    health_calls: AtomicUsize,
    predict_gate: Gate,
    segment_gate: Gate,
    history_gate: Gate,
    health_gate: Gate,
}

impl FakeApi {
    pub(crate) fn push_predict(&self, result: ApiResult<PredictionRecord>) {
        self.predict.lock().push_back(result);
    }

    pub(crate) fn push_feedback(&self, result: ApiResult<()>) {
        self.feedback.lock().push_back(result);
    }

    pub(crate) fn push_segment(&self, result: ApiResult<SegmentationResult>) {
        self.segment.lock().push_back(result);
    }

    pub(crate) fn push_history(&self, result: ApiResult<HistoryPage>) {
        self.history.lock().push_back(result);
    }

    pub(crate) fn push_health(&self, result: ApiResult<HealthStatus>) {
        self.health.lock().push_back(result);
    }

    pub(crate) fn gate_predict(&self) -> Arc<Notify> {
        self.predict_gate.arm()
    }

    pub(crate) fn gate_segment(&self) -> Arc<Notify> {
        self.segment_gate.arm()
    }

    pub(crate) fn gate_history(&self) -> Arc<Notify> {
        self.history_gate.arm()
    }

    pub(crate) fn gate_health(&self) -> Arc<Notify> {
        self.health_gate.arm()
    }

    pub(crate) fn predict_calls(&self) -> Vec<String> {
        self.predict_calls.lock().clone()
    }

    pub(crate) fn feedback_calls(&self) -> Vec<(String, bool)> {
        self.feedback_calls.lock().clone()
    }

    pub(crate) fn segment_calls(&self) -> Vec<String> {
        self.segment_calls.lock().clone()
    }

    pub(crate) fn history_calls(&self) -> Vec<(u32, u32)> {
        self.history_calls.lock().clone()
    }

    pub(crate) fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassifierApi for FakeApi {
    async fn predict(&self, text: &str) -> ApiResult<PredictionRecord> {
        self.predict_calls.lock().push(text.to_string());
        let next = self.predict.lock().pop_front();
        self.predict_gate.pass().await;
        next.unwrap_or_else(|| unscripted("predict"))
    }

    async fn send_feedback(&self, id: &PredictionId, liked: bool) -> ApiResult<()> {
        self.feedback_calls
            .lock()
            .push((id.as_str().to_string(), liked));
        let next = self.feedback.lock().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn segment(&self, text: &str, _max_words: usize) -> ApiResult<SegmentationResult> {
        self.segment_calls.lock().push(text.to_string());
        let next = self.segment.lock().pop_front();
        self.segment_gate.pass().await;
        next.unwrap_or_else(|| unscripted("segment"))
    }

    async fn predictions(&self, page: u32, limit: u32) -> ApiResult<HistoryPage> {
        self.history_calls.lock().push((page, limit));
        let next = self.history.lock().pop_front();
        self.history_gate.pass().await;
        next.unwrap_or_else(|| unscripted("history"))
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.health.lock().pop_front();
        self.health_gate.pass().await;
        next.unwrap_or_else(|| unscripted("health"))
    }
}

pub(crate) struct FixedCount(pub Option<usize>);

impl WordCountSource for FixedCount {
    fn authoritative_count(&self) -> Option<usize> {
        self.0
    }
}

pub(crate) struct RecordingSurface {
    text: Mutex<String>,
    caret: Mutex<usize>,
    counts: Mutex<Vec<WordCount>>,
    warnings: Mutex<Vec<usize>>,
}

impl RecordingSurface {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
            caret: Mutex::new(text.chars().count()),
            counts: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Simulates the user editing the field.
    pub(crate) fn type_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
        *self.caret.lock() = text.chars().count();
    }

    pub(crate) fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub(crate) fn last_count(&self) -> Option<WordCount> {
        self.counts.lock().last().copied()
    }

    pub(crate) fn warnings(&self) -> Vec<usize> {
        self.warnings.lock().clone()
    }
}

impl InputSurface for RecordingSurface {
    fn caret(&self) -> usize {
        *self.caret.lock()
    }

    fn replace_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }

    fn set_caret(&self, offset: usize) {
        *self.caret.lock() = offset;
    }

    fn show_word_count(&self, count: WordCount) {
        self.counts.lock().push(count);
    }

    fn warn_truncated(&self, max_words: usize) {
        self.warnings.lock().push(max_words);
    }
}

#[derive(Default)]
pub(crate) struct RecordingPredictionView {
    submitting: AtomicUsize,
    predictions: Mutex<Vec<PredictionRecord>>,
    failures: Mutex<Vec<UserMessage>>,
    feedback: Mutex<Vec<Feedback>>,
    feedback_errors: Mutex<Vec<UserMessage>>,
}

impl RecordingPredictionView {
    pub(crate) fn submitting_count(&self) -> usize {
        self.submitting.load(Ordering::SeqCst)
    }

    pub(crate) fn predictions(&self) -> Vec<PredictionRecord> {
        self.predictions.lock().clone()
    }

    pub(crate) fn failures(&self) -> Vec<UserMessage> {
        self.failures.lock().clone()
    }

    pub(crate) fn feedback(&self) -> Vec<Feedback> {
        self.feedback.lock().clone()
    }

    pub(crate) fn feedback_errors(&self) -> Vec<UserMessage> {
        self.feedback_errors.lock().clone()
    }
}

impl PredictionView for RecordingPredictionView {
    fn show_submitting(&self) {
        self.submitting.fetch_add(1, Ordering::SeqCst);
    }

    fn show_prediction(&self, record: &PredictionRecord) {
        self.predictions.lock().push(record.clone());
    }

    fn show_failure(&self, message: &UserMessage) {
        self.failures.lock().push(message.clone());
    }

    fn show_feedback(&self, feedback: Feedback) {
        self.feedback.lock().push(feedback);
    }

    fn show_feedback_error(&self, message: &UserMessage) {
        self.feedback_errors.lock().push(message.clone());
    }
}

#[derive(Default)]
pub(crate) struct RecordingHistoryView {
    pages: Mutex<Vec<PageState>>,
    errors: Mutex<Vec<UserMessage>>,
}

impl RecordingHistoryView {
    pub(crate) fn pages(&self) -> Vec<PageState> {
        self.pages.lock().clone()
    }

    pub(crate) fn errors(&self) -> Vec<UserMessage> {
        self.errors.lock().clone()
    }
}

impl HistoryView for RecordingHistoryView {
    fn show_loading(&self, _page: u32) {}

    fn show_page(&self, page: &PageState) {
        self.pages.lock().push(page.clone());
    }

    fn show_error(&self, message: &UserMessage) {
        self.errors.lock().push(message.clone());
    }
}

#[derive(Default)]
pub(crate) struct RecordingConnectivity {
    seen: Mutex<Vec<Connectivity>>,
}

impl RecordingConnectivity {
    pub(crate) fn seen(&self) -> Vec<Connectivity> {
        self.seen.lock().clone()
    }
}

impl ConnectivityView for RecordingConnectivity {
    fn show_connectivity(&self, connectivity: Connectivity) {
        self.seen.lock().push(connectivity);
    }
}
