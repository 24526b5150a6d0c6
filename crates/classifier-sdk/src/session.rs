use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::ClassifierApi;
use crate::error::{ApiError, UserMessage};
use crate::history::HistoryPaginator;
use crate::model::{Feedback, PredictionRecord};
use crate::segmenter::WordCountSource;
use crate::text::{sanitize, whitespace_word_count};

pub trait PredictionView: Send + Sync {
    fn show_submitting(&self);
    fn show_prediction(&self, record: &PredictionRecord);
    fn show_failure(&self, message: &UserMessage);
    fn show_feedback(&self, feedback: Feedback);
    fn show_feedback_error(&self, message: &UserMessage);
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Submitting,
    Displayed(PredictionRecord),
    Failed(ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("a prediction is already in progress")]
    InFlight,
    #[error("please enter some text")]
    EmptyText,
    #[error("the text contains no words")]
    NoWords,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] SubmitRejected),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeedbackRejected {
    #[error("make a prediction first")]
    NoActivePrediction,
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error(transparent)]
    Rejected(#[from] FeedbackRejected),
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A newer feedback action or prediction replaced this one in flight.
    #[error("feedback superseded by a newer action")]
    Superseded,
}

struct SessionInner {
    state: SessionState,
    feedback_seq: u64,
}

/// Lifecycle of one prediction on one input surface.
///
/// `Idle → Submitting → Displayed | Failed`, re-armed by the next submit. At
/// most one submit is in flight; a second one is rejected, not queued.
pub struct PredictionSession {
    api: Arc<dyn ClassifierApi>,
    view: Arc<dyn PredictionView>,
    history: Option<HistoryPaginator>,
    word_counts: Option<Arc<dyn WordCountSource>>,
    max_input_chars: usize,
    inner: Mutex<SessionInner>,
}

/// Returns the session to `Idle` if a submit future is dropped mid-flight.
struct SubmitGuard<'a> {
    inner: &'a Mutex<SessionInner>,
    armed: bool,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.lock();
            if matches!(inner.state, SessionState::Submitting) {
                inner.state = SessionState::Idle;
            }
        }
    }
}

impl PredictionSession {
    pub fn new(
        api: Arc<dyn ClassifierApi>,
        view: Arc<dyn PredictionView>,
        max_input_chars: usize,
    ) -> Self {
        Self {
            api,
            view,
            history: None,
            word_counts: None,
            max_input_chars,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                feedback_seq: 0,
            }),
        }
    }

    /// Refreshes `history` after every prediction and feedback.
    pub fn with_history(mut self, history: HistoryPaginator) -> Self {
        self.history = Some(history);
        self
    }

    /// Consults `source` for the authoritative word count before submitting.
    pub fn with_word_counts(mut self, source: Arc<dyn WordCountSource>) -> Self {
        self.word_counts = Some(source);
        self
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn current(&self) -> Option<PredictionRecord> {
        match &self.inner.lock().state {
            SessionState::Displayed(record) => Some(record.clone()),
            _ => None,
        }
    }

    pub async fn submit(&self, text: &str) -> Result<PredictionRecord, SubmitError> {
        let sanitized = sanitize(text, self.max_input_chars);
        {
            let mut inner = self.inner.lock();
            if matches!(inner.state, SessionState::Submitting) {
                debug!(target: "classifier.session", "submit rejected: already in flight");
                return Err(SubmitRejected::InFlight.into());
            }
            if sanitized.is_empty() {
                return Err(SubmitRejected::EmptyText.into());
            }
            let words = self
                .word_counts
                .as_ref()
                .and_then(|source| source.authoritative_count())
                .unwrap_or_else(|| whitespace_word_count(&sanitized));
            if words == 0 {
                return Err(SubmitRejected::NoWords.into());
            }
            inner.state = SessionState::Submitting;
            inner.feedback_seq += 1;
        }
        let mut guard = SubmitGuard {
            inner: &self.inner,
            armed: true,
        };
        self.view.show_submitting();
        info!(
            target: "classifier.session",
            chars = sanitized.chars().count(),
            "submitting prediction"
        );

        let result = self.api.predict(&sanitized).await;
        guard.armed = false;

        match result {
            Ok(mut record) => {
                record.feedback = Feedback::Unset;
                self.inner.lock().state = SessionState::Displayed(record.clone());
                info!(
                    target: "classifier.session",
                    id = %record.id,
                    label = record.label.wire_id(),
                    confidence = record.confidence,
                    "prediction displayed"
                );
                self.view.show_prediction(&record);
                self.refresh_history().await;
                Ok(record)
            }
            Err(err) => {
                warn!(target: "classifier.session", error = %err, "prediction failed");
                self.inner.lock().state = SessionState::Failed(err.clone());
                self.view.show_failure(&err.user_message());
                Err(err.into())
            }
        }
    }

    pub async fn like(&self) -> Result<Feedback, FeedbackError> {
        self.send_feedback(Feedback::Liked).await
    }

    pub async fn dislike(&self) -> Result<Feedback, FeedbackError> {
        self.send_feedback(Feedback::Disliked).await
    }

    /// Moves the displayed record to `target`. Last write wins; there is no
    /// transition back to `Unset`.
    async fn send_feedback(&self, target: Feedback) -> Result<Feedback, FeedbackError> {
        let liked = match target {
            Feedback::Liked => true,
            Feedback::Disliked => false,
            Feedback::Unset => return Err(FeedbackRejected::NoActivePrediction.into()),
        };
        let (id, seq) = {
            let mut inner = self.inner.lock();
            let record = match &inner.state {
                SessionState::Displayed(record) => record,
                _ => return Err(FeedbackRejected::NoActivePrediction.into()),
            };
            if record.feedback == target {
                return Ok(target);
            }
            let id = record.id.clone();
            inner.feedback_seq += 1;
            (id, inner.feedback_seq)
        };

        if let Err(err) = self.api.send_feedback(&id, liked).await {
            warn!(target: "classifier.session", id = %id, error = %err, "feedback failed");
            self.view.show_feedback_error(&err.user_message());
            return Err(err.into());
        }

        {
            let mut inner = self.inner.lock();
            if inner.feedback_seq != seq {
                debug!(target: "classifier.session", id = %id, "feedback completion superseded");
                return Err(FeedbackError::Superseded);
            }
            match &mut inner.state {
                SessionState::Displayed(record) if record.id == id => record.feedback = target,
                _ => return Err(FeedbackError::Superseded),
            }
        }
        info!(target: "classifier.session", id = %id, liked, "feedback stored");
        self.view.show_feedback(target);
        self.refresh_history().await;
        Ok(target)
    }

    async fn refresh_history(&self) {
        if let Some(history) = &self.history {
            if let Err(err) = history.refresh().await {
                debug!(target: "classifier.session", error = %err, "history refresh failed");
            }
        }
    }
}
