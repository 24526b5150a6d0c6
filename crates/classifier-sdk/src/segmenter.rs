use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ClassifierApi;
use crate::text::{char_len, whitespace_word_count};

/// The text field being watched, together with its word counter.
///
/// Caret offsets are in characters. `replace_text` is a programmatic write and
/// must not be reported back to the segmenter as user input.
pub trait InputSurface: Send + Sync {
    fn caret(&self) -> usize;
    fn replace_text(&self, text: &str);
    fn set_caret(&self, offset: usize);
    fn show_word_count(&self, count: WordCount);
    fn warn_truncated(&self, max_words: usize);
}

/// Source of the latest authoritative word count, consulted before submitting.
pub trait WordCountSource: Send + Sync {
    fn authoritative_count(&self) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCount {
    pub count: usize,
    pub max: usize,
    /// False when the count comes from the local whitespace fallback.
    pub authoritative: bool,
}

impl WordCount {
    pub fn over_limit(&self) -> bool {
        self.count > self.max
    }
}

impl fmt::Display for WordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} words", self.count, self.max)
    }
}

/// What happened to one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Counted(WordCount),
    Truncated { count: WordCount, replacement: String },
    Fallback(WordCount),
    /// The input changed while the evaluation was in flight.
    Stale,
}

struct SegmenterState {
    generation: u64,
    snapshot: String,
    pending: Option<JoinHandle<()>>,
    truncation_warned: bool,
    authoritative: Option<usize>,
}

struct Inner {
    api: Arc<dyn ClassifierApi>,
    surface: Arc<dyn InputSurface>,
    max_words: usize,
    window: Duration,
    state: Mutex<SegmenterState>,
}

/// Keeps the word counter of an input in sync with the segmentation service
/// and enforces the word limit.
///
/// Every evaluation is tagged with the generation and text snapshot it was
/// scheduled for; a result is applied only while both still match the latest
/// input.
#[derive(Clone)]
pub struct DebouncedSegmenter {
    inner: Arc<Inner>,
}

impl DebouncedSegmenter {
    pub fn attach(
        api: Arc<dyn ClassifierApi>,
        surface: Arc<dyn InputSurface>,
        max_words: usize,
        window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                surface,
                max_words,
                window,
                state: Mutex::new(SegmenterState {
                    generation: 0,
                    snapshot: String::new(),
                    pending: None,
                    truncation_warned: false,
                    authoritative: None,
                }),
            }),
        }
    }

    pub fn max_words(&self) -> usize {
        self.inner.max_words
    }

    /// Schedules an evaluation after the quiet period, replacing any pending
    /// one. Must be called from within a tokio runtime.
    pub fn on_input(&self, text: &str) {
        let generation = self.inner.begin(text);
        let inner = Arc::clone(&self.inner);
        let snapshot = text.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            inner.evaluate(generation, snapshot).await;
        });
        let mut state = self.inner.state.lock();
        if state.generation == generation {
            state.pending = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Bulk insert: evaluates immediately, skipping the quiet period.
    pub async fn on_paste(&self, text: &str) -> Evaluation {
        let generation = self.inner.begin(text);
        self.inner.evaluate(generation, text.to_string()).await
    }

    /// Drops the scheduled or in-flight evaluation. Results of evaluations
    /// already running, pasted ones included, are discarded.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }

    /// Whether a debounced evaluation is still scheduled or in flight.
    pub fn has_pending(&self) -> bool {
        self.inner
            .state
            .lock()
            .pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl WordCountSource for DebouncedSegmenter {
    fn authoritative_count(&self) -> Option<usize> {
        self.inner.state.lock().authoritative
    }
}

impl Inner {
    /// Records a new input snapshot and cancels the pending evaluation.
    fn begin(&self, text: &str) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.snapshot = text.to_string();
        state.authoritative = None;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.generation
    }

    async fn evaluate(&self, generation: u64, snapshot: String) -> Evaluation {
        let result = self.api.segment(&snapshot, self.max_words).await;

        let mut state = self.state.lock();
        if state.generation != generation || state.snapshot != snapshot {
            debug!(
                target: "classifier.segmenter",
                generation,
                latest = state.generation,
                "discarding stale segmentation result"
            );
            return Evaluation::Stale;
        }
        state.pending = None;

        let segmentation = match result {
            Ok(segmentation) => segmentation,
            Err(err) => {
                let count = WordCount {
                    count: whitespace_word_count(&snapshot),
                    max: self.max_words,
                    authoritative: false,
                };
                drop(state);
                warn!(
                    target: "classifier.segmenter",
                    error = %err,
                    count = count.count,
                    "segmentation unavailable, using whitespace count"
                );
                self.surface.show_word_count(count);
                return Evaluation::Fallback(count);
            }
        };

        let count = WordCount {
            count: segmentation.word_count,
            max: self.max_words,
            authoritative: true,
        };
        state.authoritative = Some(count.count);

        if !segmentation.truncated {
            state.truncation_warned = false;
            drop(state);
            self.surface.show_word_count(count);
            return Evaluation::Counted(count);
        }

        let replacement = segmentation.replacement_text(self.max_words);
        // The input now holds the replacement; later results must match it.
        state.snapshot = replacement.clone();
        let first_warning = !state.truncation_warned;
        state.truncation_warned = true;
        drop(state);

        let caret = self.surface.caret();
        self.surface.replace_text(&replacement);
        self.surface.set_caret(caret.min(char_len(&replacement)));
        self.surface.show_word_count(count);
        if first_warning {
            info!(
                target: "classifier.segmenter",
                max_words = self.max_words,
                "input truncated to word limit"
            );
            self.surface.warn_truncated(self.max_words);
        }
        Evaluation::Truncated { count, replacement }
    }
}
