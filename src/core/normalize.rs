//! Column-name normalization for audit spreadsheets.
//!
//! Crawler exports rename headers between versions ("Title 1 Length",
//! "Title Length", "Page Title Length"). Normalization case-folds, replaces
//! separators with `_`, and maps known aliases onto canonical names so the
//! reduction logic sees a stable schema.

use serde_json::Value;

use super::table::Row;

/// Canonical column → accepted aliases (already in normalized form).
pub const COLUMN_SYNONYMS: &[(&str, &[&str])] = &[
    ("address", &["address", "url", "u_r_l", "page_url"]),
    ("content_type", &["content_type", "content"]),
    ("status_code", &["status_code", "code", "http_status", "response_code"]),
    ("status", &["status", "status_text"]),
    ("indexability", &["indexability", "indexable"]),
    (
        "indexability_status",
        &["indexability_status", "indexability_reason"],
    ),
    ("title", &["title", "title_1", "page_title"]),
    (
        "title_length",
        &["title_length", "title_1_length", "page_title_length"],
    ),
    (
        "meta_description",
        &["meta_description", "meta_description_1", "description"],
    ),
    (
        "meta_desc_length",
        &[
            "meta_desc_length",
            "meta_description_1_length",
            "meta_description_length",
            "description_length",
        ],
    ),
    ("h1", &["h1", "h1_1", "heading_1"]),
    ("h1_length", &["h1_length", "h1_1_length"]),
    (
        "canonical",
        &["canonical", "canonical_link_element_1", "canonical_url"],
    ),
    ("word_count", &["word_count", "words"]),
    ("response_time", &["response_time", "response_time_ms"]),
    ("crawl_depth", &["crawl_depth", "depth"]),
    ("inlinks", &["inlinks", "unique_inlinks"]),
    ("outlinks", &["outlinks", "unique_outlinks"]),
];

/// Normalizes a raw header into its canonical column name.
///
/// Lower-cases, turns runs of whitespace, `-`, `.` and `/` into a single
/// `_`, trims stray underscores, then applies [`COLUMN_SYNONYMS`]. Unknown
/// headers are returned in normalized form.
#[must_use]
pub fn normalize_column(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || matches!(ch, '-' | '.' | '/' | '_') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }

    COLUMN_SYNONYMS
        .iter()
        .find(|(_, aliases)| aliases.contains(&out.as_str()))
        .map_or(out, |(canonical, _)| (*canonical).to_string())
}

/// Returns a copy of `row` with every key normalized.
///
/// When two raw headers collapse onto the same canonical name the first
/// non-blank value wins.
#[must_use]
pub fn normalize_row(row: &Row) -> Row {
    let mut out = Row::new();
    for (key, value) in row {
        let name = normalize_column(key);
        match out.get(&name) {
            Some(existing) if !is_blank(existing) => {}
            _ => {
                out.insert(name, value.clone());
            }
        }
    }
    out
}

/// Normalizes every row.
#[must_use]
pub fn normalize_rows(rows: &[Row]) -> Vec<Row> {
    rows.iter().map(normalize_row).collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("Title 1 Length", "title_length")]
    #[test_case("Page Title Length", "title_length")]
    #[test_case("TITLE_LENGTH", "title_length")]
    #[test_case("Address", "address")]
    #[test_case("URL", "address")]
    #[test_case("Status Code", "status_code")]
    #[test_case("Meta Description 1 Length", "meta_desc_length")]
    #[test_case("H1-1", "h1")]
    #[test_case("Canonical Link Element 1", "canonical")]
    #[test_case("  Crawl   Depth ", "crawl_depth")]
    #[test_case("Some Custom Column", "some_custom_column")]
    fn test_normalize_column(raw: &str, expected: &str) {
        assert_eq!(normalize_column(raw), expected);
    }

    #[test]
    fn test_normalize_row_keeps_first_non_blank() {
        let row: Row = [
            ("Title 1 Length".to_string(), json!("")),
            ("Title Length".to_string(), json!("54")),
        ]
        .into_iter()
        .collect();
        let normalized = normalize_row(&row);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized.get("title_length"), Some(&json!("54")));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in "[A-Za-z0-9 _./-]{0,30}") {
            let once = normalize_column(&raw);
            prop_assert_eq!(normalize_column(&once), once);
        }

        #[test]
        fn prop_normalized_has_no_stray_separators(raw in "\\PC{0,30}") {
            let out = normalize_column(&raw);
            prop_assert!(!out.chars().any(char::is_whitespace));
            prop_assert!(!out.starts_with('_') && !out.ends_with('_'));
        }
    }
}
