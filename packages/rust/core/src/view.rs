//! Plain-text views of decoded results.

use std::fmt::Write as _;

use autoresearch_shared::{DecodedResults, FieldMap};

/// Shown when an item has neither a `title` nor a `component`.
const NO_TITLE: &str = "N/A";

/// How much of each item to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// One `Title:` line per item.
    #[default]
    Summary,
    /// Every field of every item.
    Detailed,
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Item heading used by the summary view: `title`, then `component`, then `N/A`.
/// Absent values fall through to the next candidate.
pub fn item_title(item: &FieldMap) -> &str {
    ["title", "component"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Option::as_deref))
        .unwrap_or(NO_TITLE)
}

/// `{field: value, ...}`, with `None` for absent values.
pub fn item_line(item: &FieldMap) -> String {
    let fields: Vec<String> = item
        .iter()
        .map(|(k, v)| format!("{k}: {}", v.as_deref().unwrap_or("None")))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// Render every category as a heading followed by one line per item.
/// Categories are separated by a blank line. Empty results render as `""`.
pub fn render(results: &DecodedResults, mode: ViewMode) -> String {
    let label = match mode {
        ViewMode::Summary => "Summary",
        ViewMode::Detailed => "Detailed",
    };

    let mut out = String::new();
    for (i, (category, items)) in results.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{} ({label})", capitalize(category));
        for item in items {
            match mode {
                ViewMode::Summary => {
                    let _ = writeln!(out, "Title: {}", item_title(item));
                }
                ViewMode::Detailed => {
                    let _ = writeln!(out, "{}", item_line(item));
                }
            }
        }
    }
    out
}
