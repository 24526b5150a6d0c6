use std::fmt;

/// Category assigned by the classifier.
///
/// The set is closed on the server side today, but any label the client does
/// not know is kept verbatim in [`Label::Unrecognized`] and rendered by its raw
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Economic,
    Entertainment,
    Life,
    Politic,
    Sport,
    Technology,
    Unrecognized(String),
}

pub const UNKNOWN_LABEL: &str = "UNKNOWN";

impl Label {
    pub fn known() -> [Label; 6] {
        [
            Label::Economic,
            Label::Entertainment,
            Label::Life,
            Label::Politic,
            Label::Sport,
            Label::Technology,
        ]
    }

    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("LABEL_0") => Label::Economic,
            Some("LABEL_1") => Label::Entertainment,
            Some("LABEL_2") => Label::Life,
            Some("LABEL_3") => Label::Politic,
            Some("LABEL_4") => Label::Sport,
            Some("LABEL_5") => Label::Technology,
            Some(other) if !other.is_empty() => Label::Unrecognized(other.to_string()),
            _ => Label::Unrecognized(UNKNOWN_LABEL.to_string()),
        }
    }

    pub fn wire_id(&self) -> &str {
        match self {
            Label::Economic => "LABEL_0",
            Label::Entertainment => "LABEL_1",
            Label::Life => "LABEL_2",
            Label::Politic => "LABEL_3",
            Label::Sport => "LABEL_4",
            Label::Technology => "LABEL_5",
            Label::Unrecognized(raw) => raw,
        }
    }

    pub fn english(&self) -> Option<&'static str> {
        match self {
            Label::Economic => Some("Economic"),
            Label::Entertainment => Some("Entertainment"),
            Label::Life => Some("Life"),
            Label::Politic => Some("Politic"),
            Label::Sport => Some("Sport"),
            Label::Technology => Some("Technology"),
            Label::Unrecognized(raw) if raw == UNKNOWN_LABEL => Some("Unknown"),
            Label::Unrecognized(_) => None,
        }
    }

    pub fn khmer(&self) -> Option<&'static str> {
        match self {
            Label::Economic => Some("សេដ្ឋកិច្ច"),
            Label::Entertainment => Some("កម្សាន្ត"),
            Label::Life => Some("ជីវិត"),
            Label::Politic => Some("នយោបាយ"),
            Label::Sport => Some("កីឡា"),
            Label::Technology => Some("បច្ចេកវិទ្យា"),
            Label::Unrecognized(raw) if raw == UNKNOWN_LABEL => Some("មិនស្គាល់"),
            Label::Unrecognized(_) => None,
        }
    }

    /// Short form used in history rows.
    pub fn short_name(&self) -> &str {
        self.english().unwrap_or_else(|| self.wire_id())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.khmer(), self.english()) {
            (Some(khmer), Some(english)) => write!(f, "{khmer} / {english}"),
            _ => f.write_str(self.wire_id()),
        }
    }
}

/// One line of the category overview shown next to a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub label: Label,
    pub predicted: bool,
}

pub fn category_table(selected: &Label) -> Vec<CategoryRow> {
    Label::known()
        .into_iter()
        .map(|label| CategoryRow {
            predicted: &label == selected,
            label,
        })
        .collect()
}

/// Confidence as displayed to the user, e.g. `91.20 %`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{confidence:.2} %")
}
