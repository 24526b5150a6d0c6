//! Text helpers shared by the segmenter, the session and history rendering.
//!
//! Offsets and lengths are counted in `char`s, the unit carets move in.

pub const PREVIEW_CHARS: usize = 30;

/// Collapses whitespace runs, trims both edges and caps the result at
/// `max_chars` characters.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let capped: String = collapsed.chars().take(max_chars).collect();
    capped.trim_end().to_string()
}

/// Word count used when the segmentation service cannot be reached.
pub fn whitespace_word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn preview(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
