//! Terminal renderings of the engine's views.

use classifier_sdk::history::EMPTY_HISTORY_TEXT;
use classifier_sdk::label::{category_table, format_confidence};
use classifier_sdk::text::{preview, PREVIEW_CHARS};
use classifier_sdk::{
    Connectivity, ConnectivityView, Feedback, HistoryView, InputSurface, MessageKind, PageState,
    PredictionRecord, PredictionView, UserMessage, WordCount,
};
use parking_lot::Mutex;

/// The text being edited. The terminal has no real caret, so it tracks the end
/// of the last edit.
#[derive(Default)]
pub struct TextBuffer {
    text: Mutex<String>,
    caret: Mutex<usize>,
}

impl TextBuffer {
    pub fn set(&self, text: &str) {
        *self.text.lock() = text.to_string();
        *self.caret.lock() = text.chars().count();
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl InputSurface for TextBuffer {
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
        let marker = if count.authoritative { "" } else { " (estimated)" };
        let limit = if count.over_limit() { "  over limit" } else { "" };
        eprintln!("[{count}{marker}]{limit}");
    }

    fn warn_truncated(&self, max_words: usize) {
        eprintln!("⚠️  Text trimmed to the first {max_words} words");
    }
}

fn print_message(message: &UserMessage) {
    let icon = match message.kind {
        MessageKind::TryAgain => "⏳",
        MessageKind::CheckConnection => "🔌",
        MessageKind::InvalidInput => "✏️ ",
    };
    eprintln!("{icon} {}", message.text);
}

pub fn render_prediction(record: &PredictionRecord) -> String {
    let mut out = format!(
        "#{}  {}  {}\n",
        record.id,
        record.label,
        format_confidence(record.confidence)
    );
    for row in category_table(&record.label) {
        let marker = if row.predicted { "▶" } else { " " };
        out.push_str(&format!("  {marker} {}\n", row.label));
    }
    out
}

#[derive(Default)]
pub struct PredictionPrinter;

impl PredictionView for PredictionPrinter {
    fn show_submitting(&self) {
        eprintln!("Classifying…");
    }

    fn show_prediction(&self, record: &PredictionRecord) {
        print!("{}", render_prediction(record));
    }

    fn show_failure(&self, message: &UserMessage) {
        print_message(message);
    }

    fn show_feedback(&self, feedback: Feedback) {
        println!("{}", feedback.status_text());
    }

    fn show_feedback_error(&self, message: &UserMessage) {
        print_message(message);
    }
}

pub fn render_page(page: &PageState) -> String {
    if page.rows.is_empty() {
        return format!("{EMPTY_HISTORY_TEXT}\n");
    }
    let mut out = String::new();
    for row in &page.rows {
        let created = row
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let feedback = match row.feedback {
            Feedback::Liked => "👍",
            Feedback::Disliked => "👎",
            Feedback::Unset => "  ",
        };
        out.push_str(&format!(
            "{:>6}  {created:<16}  {:<14}  {:>8}  {feedback}  {}\n",
            row.id.as_str(),
            row.label.short_name(),
            format_confidence(row.confidence),
            preview(&row.input_text, PREVIEW_CHARS),
        ));
    }
    out.push_str(&page.position_label());
    out.push('\n');
    out
}

#[derive(Default)]
pub struct HistoryPrinter {
    only_page: Option<u32>,
}

impl HistoryPrinter {
    /// Prints nothing but `page`; used when earlier pages are loaded only to
    /// learn the page count.
    pub fn only(page: u32) -> Self {
        Self {
            only_page: Some(page),
        }
    }

    fn wants(&self, page: &PageState) -> bool {
        self.only_page.map_or(true, |only| only == page.page_number)
    }
}

impl HistoryView for HistoryPrinter {
    fn show_loading(&self, page: u32) {
        tracing::debug!(target: "classifier.cli", page, "loading history");
    }

    fn show_page(&self, page: &PageState) {
        if self.wants(page) {
            print!("{}", render_page(page));
        }
    }

    fn show_error(&self, message: &UserMessage) {
        print_message(message);
    }
}

#[derive(Default)]
pub struct ConnectivityPrinter;

impl ConnectivityView for ConnectivityPrinter {
    fn show_connectivity(&self, connectivity: Connectivity) {
        eprintln!("backend {connectivity}");
    }
}
