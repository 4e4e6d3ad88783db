//! Deterministic change fingerprints over identity and status fields.

use std::fmt;

use crate::{Dataset, Record};

/// Separates the projected fields of one record.
const FIELD_SEPARATOR: char = '\u{1f}';
/// Separates records in the concatenated fingerprint.
const RECORD_SEPARATOR: char = '\u{1e}';

/// Which columns a fingerprint projects each record onto.
///
/// Only identity and mutable status columns take part, so churn in
/// descriptive columns (notes, formatting, counters) does not count as a
/// change worth re-rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FingerprintFields {
    /// Column holding the stable record identity.
    pub identity: String,
    /// Column holding the business status a user acts on.
    pub status: String,
    /// Column holding the last-modified marker.
    pub modified: String,
}

impl FingerprintFields {
    /// Create a field projection.
    pub fn new(
        identity: impl Into<String>,
        status: impl Into<String>,
        modified: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            status: status.into(),
            modified: modified.into(),
        }
    }

    /// The three projected column names.
    pub fn columns(&self) -> [&str; 3] {
        [&self.identity, &self.status, &self.modified]
    }

    fn project(&self, record: &Record) -> String {
        let mut key = String::with_capacity(32);
        key.push_str(record.get(&self.identity));
        key.push(FIELD_SEPARATOR);
        key.push_str(record.get(&self.status));
        key.push(FIELD_SEPARATOR);
        key.push_str(record.get(&self.modified));
        key
    }
}

impl Default for FingerprintFields {
    fn default() -> Self {
        Self::new("id", "status", "updated_at")
    }
}

/// A compact summary of a dataset used to detect meaningful change.
///
/// Two datasets whose records agree on identity, status and last-modified
/// fields produce equal fingerprints regardless of record order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of `dataset` under `fields`.
    pub fn of(dataset: &Dataset, fields: &FingerprintFields) -> Self {
        let mut keys: Vec<String> = dataset.iter().map(|r| fields.project(r)).collect();
        keys.sort_unstable();

        let mut joined = String::with_capacity(keys.iter().map(|k| k.len() + 1).sum());
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                joined.push(RECORD_SEPARATOR);
            }
            joined.push_str(key);
        }
        Self(joined)
    }

    /// The raw fingerprint string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the fingerprint of an empty dataset.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickets() -> Dataset {
        Dataset::builder()
            .header(["id", "status", "updated_at", "notes"])
            .row(["T-1", "open", "2024-05-01", "first"])
            .row(["T-2", "escalated", "2024-05-02", "second"])
            .row(["T-3", "closed", "2024-05-03", "third"])
            .build()
    }

    #[test]
    fn order_insensitive() {
        let dataset = tickets();
        let mut reversed = dataset.clone();
        reversed.records.reverse();

        let fields = FingerprintFields::default();
        assert_eq!(
            Fingerprint::of(&dataset, &fields),
            Fingerprint::of(&reversed, &fields)
        );
    }

    #[test]
    fn ignores_unprojected_columns() {
        let dataset = tickets();
        let mut edited = dataset.clone();
        edited.records[0].insert("notes", "rewritten");

        let fields = FingerprintFields::default();
        assert_eq!(
            Fingerprint::of(&dataset, &fields),
            Fingerprint::of(&edited, &fields)
        );
    }

    #[test]
    fn status_change_changes_fingerprint() {
        let dataset = tickets();
        let mut edited = dataset.clone();
        edited.records[0].insert("status", "pending");

        let fields = FingerprintFields::default();
        assert_ne!(
            Fingerprint::of(&dataset, &fields),
            Fingerprint::of(&edited, &fields)
        );
    }

    #[test]
    fn separators_prevent_field_bleed() {
        let fields = FingerprintFields::default();
        let a = Dataset::builder()
            .header(["id", "status", "updated_at"])
            .row(["ab", "c", ""])
            .build();
        let b = Dataset::builder()
            .header(["id", "status", "updated_at"])
            .row(["a", "bc", ""])
            .build();
        assert_ne!(Fingerprint::of(&a, &fields), Fingerprint::of(&b, &fields));
    }

    #[test]
    fn empty_dataset_has_empty_fingerprint() {
        let fingerprint = Fingerprint::of(&Dataset::empty(), &FingerprintFields::default());
        assert!(fingerprint.is_empty());
    }

    #[test]
    fn custom_fields_are_used() {
        let fields = FingerprintFields::new("ticket", "state", "modified");
        let dataset = Dataset::builder()
            .header(["ticket", "state", "modified"])
            .row(["9", "open", "x"])
            .build();
        assert_eq!(
            Fingerprint::of(&dataset, &fields).as_str(),
            "9\u{1f}open\u{1f}x"
        );
    }
}
