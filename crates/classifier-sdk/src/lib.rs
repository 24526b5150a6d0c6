//! Asynchronous client engine for the article classifier service.
//!
//! Responsibilities:
//! - issuing backend calls with a per-attempt deadline and exponential backoff
//! - keeping an input's word count in sync with server-side segmentation
//! - the single-flight lifecycle of a prediction and its feedback
//! - paginated prediction history and backend health polling
//!
//! Presentation is left to the caller through the view traits
//! ([`InputSurface`], [`PredictionView`], [`HistoryView`],
//! [`ConnectivityView`]). Completions that lose a race are dropped by
//! snapshot or sequence checks before they reach a view.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod health;
pub mod history;
pub mod label;
pub mod model;
pub mod segmenter;
pub mod session;
pub mod text;
pub mod workbench;

#[cfg(test)]
mod test_support;

pub use client::{ClassifierApi, ClassifierClient};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorDetail, MessageKind, UserMessage};
pub use executor::{RequestExecutor, RetryPolicy};
pub use health::{Connectivity, ConnectivityView, HealthMonitor};
pub use history::{HistoryPaginator, HistoryView, LoadOutcome, PageState};
pub use label::Label;
pub use model::{
    Feedback, HealthStatus, HistoryPage, HistorySource, PredictionId, PredictionRecord,
    SegmentationResult,
};
pub use segmenter::{DebouncedSegmenter, Evaluation, InputSurface, WordCount, WordCountSource};
pub use session::{
    FeedbackError, FeedbackRejected, PredictionSession, PredictionView, SessionState,
    SubmitError, SubmitRejected,
};
pub use workbench::{Views, Workbench};
