//! Query filter and pager
//!
//! Substring containment only: no tokenization, stemming or ranking. Output
//! keeps pool order, so earlier groups and earlier listing positions win.

use crate::aggregate::PoolEntry;

/// Page size used when the caller gives none, or an unusable one
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page a caller may request
pub const MAX_LIMIT: usize = 50;

/// Normalize a raw `limit` query value
///
/// Absent, blank, non-numeric, zero and negative values give
/// [`DEFAULT_LIMIT`]. Values above [`MAX_LIMIT`] are clamped to it,
/// including positive integers too large to parse.
pub fn normalize_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim) else {
        return DEFAULT_LIMIT;
    };

    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => (n as u64).min(MAX_LIMIT as u64) as usize,
        Ok(_) => DEFAULT_LIMIT,
        Err(_) if is_positive_integer(raw) => MAX_LIMIT,
        Err(_) => DEFAULT_LIMIT,
    }
}

fn is_positive_integer(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && digits.bytes().any(|b| b != b'0')
}

/// Lowercased, trimmed query; `None` when every record should pass
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    raw.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty())
}

/// Whether `entry` matches an already-normalized query
pub fn matches(entry: &PoolEntry, query: &str) -> bool {
    entry.record.haystack().contains(query)
}

/// Filter `pool` by `query` and keep the first `limit` matches
pub fn filter_and_page<'a>(
    pool: &'a [PoolEntry],
    query: Option<&str>,
    limit: usize,
) -> Vec<&'a PoolEntry> {
    let query = normalize_query(query);

    pool.iter()
        .filter(|entry| query.as_deref().map_or(true, |q| matches(entry, q)))
        .take(limit)
        .collect()
}
