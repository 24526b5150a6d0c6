use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::label::Label;

/// Server-assigned prediction identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PredictionId(String);

impl PredictionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PredictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PredictionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for PredictionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(value) => PredictionId(value.to_string()),
            RawId::Text(value) => PredictionId(value),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    Unset,
    Liked,
    Disliked,
}

impl Feedback {
    pub fn from_wire(value: Option<bool>) -> Self {
        match value {
            None => Feedback::Unset,
            Some(true) => Feedback::Liked,
            Some(false) => Feedback::Disliked,
        }
    }

    pub fn from_liked(liked: bool) -> Self {
        Feedback::from_wire(Some(liked))
    }

    pub fn status_text(self) -> &'static str {
        match self {
            Feedback::Unset => "No feedback given yet",
            Feedback::Liked => "Thank you! You liked this prediction",
            Feedback::Disliked => "Sorry! You disliked this prediction",
        }
    }
}

/// Client-side projection of a stored prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub id: PredictionId,
    pub input_text: String,
    pub label: Label,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub feedback: Feedback,
}

/// Authoritative segmentation of one text snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmentationResult {
    pub word_count: usize,
    pub truncated: bool,
    pub cleaned_text: String,
    pub words: Vec<String>,
}

impl SegmentationResult {
    /// Text that should replace the input after a truncation: the first
    /// `max_words` segmented units when present, else the cleaned text.
    pub fn replacement_text(&self, max_words: usize) -> String {
        if self.words.is_empty() {
            return self.cleaned_text.clone();
        }
        self.words
            .iter()
            .take(max_words)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Paginated,
    Legacy,
}

/// One page of history as returned by the API client.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub rows: Vec<PredictionRecord>,
    pub total_pages: u32,
    pub source: HistorySource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && self.model_loaded
    }
}

// Wire shapes. Kept private: everything leaves this module as one of the
// typed values above.

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest<'a> {
    pub text_input: &'a str,
    pub feedback: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackRequest {
    pub feedback: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SegmentRequest<'a> {
    pub text_input: &'a str,
    pub max_words: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPrediction {
    id: PredictionId,
    #[serde(default)]
    text_input: Option<String>,
    #[serde(default)]
    label_classified: Option<String>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    feedback: Option<bool>,
}

impl RawPrediction {
    pub(crate) fn into_record(self, fallback_text: Option<&str>) -> PredictionRecord {
        let confidence = self
            .accuracy
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        PredictionRecord {
            id: self.id,
            input_text: self
                .text_input
                .or_else(|| fallback_text.map(str::to_string))
                .unwrap_or_default(),
            label: Label::from_wire(self.label_classified.as_deref()),
            confidence,
            created_at: self.created_at,
            feedback: Feedback::from_wire(self.feedback),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSegmentation {
    khmer_word_count: usize,
    #[serde(default)]
    khmer_words: Vec<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    cleaned_text: String,
}

impl From<RawSegmentation> for SegmentationResult {
    fn from(raw: RawSegmentation) -> Self {
        Self {
            word_count: raw.khmer_word_count,
            truncated: raw.truncated,
            cleaned_text: raw.cleaned_text,
            words: raw.khmer_words,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawHistory {
    Paginated {
        predictions: Vec<RawPrediction>,
        #[serde(default)]
        total_pages: Option<u32>,
    },
    Legacy(Vec<RawPrediction>),
}

impl RawHistory {
    /// Normalizes either response shape into a page. The legacy flat array is
    /// sorted newest first and sliced client-side.
    pub(crate) fn into_page(self, page: u32, limit: u32) -> HistoryPage {
        match self {
            RawHistory::Paginated {
                predictions,
                total_pages,
            } => HistoryPage {
                rows: predictions
                    .into_iter()
                    .map(|raw| raw.into_record(None))
                    .collect(),
                total_pages: total_pages.unwrap_or(1).max(1),
                source: HistorySource::Paginated,
            },
            RawHistory::Legacy(predictions) => {
                let mut rows: Vec<_> = predictions
                    .into_iter()
                    .map(|raw| raw.into_record(None))
                    .collect();
                rows.sort_by(|a, b| newest_first(a.created_at, b.created_at));
                let limit = limit.max(1) as usize;
                let total_pages = rows.len().div_ceil(limit).max(1) as u32;
                let skip = (page.max(1) as usize - 1) * limit;
                HistoryPage {
                    rows: rows.into_iter().skip(skip).take(limit).collect(),
                    total_pages,
                    source: HistorySource::Legacy,
                }
            }
        }
    }
}

fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHealth {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    model_loaded: bool,
}

impl From<RawHealth> for HealthStatus {
    fn from(raw: RawHealth) -> Self {
        Self {
            status: raw.status.unwrap_or_else(|| "unknown".to_string()),
            model_loaded: raw.model_loaded,
        }
    }
}

/// Accepts RFC 3339 timestamps as well as the naive ISO timestamps the backend
/// emits (interpreted as UTC). Anything else becomes `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
