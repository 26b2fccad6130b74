//! Pure helpers for composing the reservation's side-effect payloads:
//! the sheet row writes and the forum reply body.

use chrono::{DateTime, Utc};

use crate::gateways::CellWrite;
use crate::types::TopicId;

/// Where the reservation row lives in the spreadsheet.
///
/// The sheet has a fixed-format region, so new entries are inserted at the
/// index named by a pointer cell rather than appended. All of this is
/// deployment policy and comes from configuration.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    /// A1 range of the cell holding the next insertion row index (0-based).
    pub pointer_range: String,

    /// Name of the tab the reservation rows go into.
    pub sheet_name: String,

    /// Numeric sheet ID of that tab (used by the row-insert request).
    pub sheet_id: i64,

    /// Column receiving the topic's creation date.
    pub date_column: char,

    /// Column receiving the hyperlink to the topic.
    pub link_column: char,
}

/// Parses the pointer cell's value into a row index.
///
/// Returns `None` for empty or non-numeric values; the orchestrator treats
/// that as a malformed-pointer failure rather than guessing a row.
pub fn parse_row_pointer(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Builds an A1 range for one cell, quoting the sheet name.
///
/// Sheet names may contain spaces; single quotes inside the name are doubled
/// per A1 escaping rules.
pub fn cell_range(sheet_name: &str, column: char, row: u32) -> String {
    format!("'{}'!{}{}", sheet_name.replace('\'', "''"), column, row)
}

/// The public URL of a topic on the forum.
pub fn topic_url(forum_base_url: &str, topic: TopicId) -> String {
    format!("{}/t/{}", forum_base_url.trim_end_matches('/'), topic)
}

/// Builds the HYPERLINK formula linking the sheet row back to the topic.
///
/// Double quotes in the title are doubled so user-controlled titles cannot
/// break out of the formula's string literals.
pub fn hyperlink_formula(forum_base_url: &str, topic: TopicId, title: &str) -> String {
    format!(
        "=HYPERLINK(\"{}\",\"{}\")",
        topic_url(forum_base_url, topic),
        title.replace('"', "\"\"")
    )
}

/// Composes the reservation reply posted on the topic.
pub fn reservation_reply(topic: TopicId, title: &str) -> String {
    format!(
        "This topic has been reserved for its proposal summary (topic {}: {}).",
        topic, title
    )
}

/// Builds the cell writes for a reservation row.
///
/// The pointer holds a 0-based insert index; A1 rows are 1-based, so the
/// writes land on row `pointer_row + 1` (the row just inserted).
pub fn row_writes(
    layout: &SheetLayout,
    forum_base_url: &str,
    topic: TopicId,
    title: &str,
    created_at: DateTime<Utc>,
    pointer_row: u32,
) -> Vec<CellWrite> {
    let a1_row = pointer_row + 1;
    vec![
        CellWrite::new(
            cell_range(&layout.sheet_name, layout.date_column, a1_row),
            created_at.format("%Y-%m-%d").to_string(),
        ),
        CellWrite::new(
            cell_range(&layout.sheet_name, layout.link_column, a1_row),
            hyperlink_formula(forum_base_url, topic, title),
        ),
    ]
}
