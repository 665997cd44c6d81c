//! Species catalog resolution.

use std::collections::BTreeMap;

/// Locate the first catalog row whose label textually corresponds to `query`.
///
/// Matching is case-insensitive, whitespace-trimmed on the query side, and
/// uses bidirectional substring containment: a row matches when its label
/// contains the query or the query contains the label. Catalog labels and
/// free-text entries differ in granularity ("human" vs "Human (Homo
/// sapiens)"), so exact equality would be too strict.
///
/// The first match in ascending row order wins; there is no scoring or
/// longest-match tie-break, so a short label can shadow a later, more
/// specific one. That is the form's established behavior and callers depend
/// on it; do not "improve" it here.
pub fn resolve_catalog_row(labels: &BTreeMap<u32, String>, query: &str) -> Option<u32> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    for (row, label) in labels {
        let hay = label.to_lowercase();
        if hay.is_empty() {
            continue;
        }
        if hay.contains(&needle) || needle.contains(&hay) {
            return Some(*row);
        }
    }
    None
}
