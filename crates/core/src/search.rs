//! Free-text search and categorical filter primitives.
//!
//! Matching here is deliberately simple: a case-insensitive substring test
//! against a handful of designated fields. The query view in `rrr-sync`
//! combines these into its conjunctive match.

/// Sentinel filter value meaning "do not filter on this dimension".
pub const FILTER_ALL: &str = "all";

/// Price-type filter value matching entities flagged free.
pub const PRICE_FREE: &str = "free";

/// Price-type filter value matching entities not flagged free.
pub const PRICE_PAID: &str = "paid";

/// Normalise raw search input into a lowercase needle.
///
/// Leading and trailing whitespace is dropped. Returns `None` when nothing
/// is left, which callers treat as "no search constraint".
///
/// # Examples
///
/// ```
/// use rrr_core::search::normalize_search;
/// assert_eq!(normalize_search("  ChA "), Some("cha".to_string()));
/// assert_eq!(normalize_search("   "), None);
/// ```
pub fn normalize_search(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Case-insensitive substring test against an already-normalised needle.
pub fn contains_needle(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// `true` if `needle` occurs in at least one of `fields`.
pub fn any_field_contains<'a>(fields: impl IntoIterator<Item = &'a str>, needle: &str) -> bool {
    fields.into_iter().any(|f| contains_needle(f, needle))
}

/// `true` if a raw filter value is the "all" sentinel (or left blank).
pub fn is_filter_all(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(FILTER_ALL)
}
