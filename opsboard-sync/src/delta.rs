//! Change detection between successive datasets.

use opsboard_types::{Dataset, Fingerprint, FingerprintFields};

/// Remembers the last seen [`Fingerprint`] and reports real changes.
///
/// A fresh detector reports the first dataset it sees as changed, which is
/// how the very first successful fetch seeds the UI.
#[derive(Debug, Clone, Default)]
pub struct DeltaDetector {
    fields: FingerprintFields,
    last: Option<Fingerprint>,
}

impl DeltaDetector {
    /// Create a detector projecting records onto `fields`.
    pub fn new(fields: FingerprintFields) -> Self {
        Self { fields, last: None }
    }

    /// Returns true and remembers the new fingerprint iff it differs from
    /// the stored one. Returns false without touching state otherwise.
    pub fn has_changed(&mut self, dataset: &Dataset) -> bool {
        let fingerprint = Fingerprint::of(dataset, &self.fields);
        if self.last.as_ref() == Some(&fingerprint) {
            return false;
        }
        self.last = Some(fingerprint);
        true
    }

    /// The most recently stored fingerprint.
    pub fn last_fingerprint(&self) -> Option<&Fingerprint> {
        self.last.as_ref()
    }

    /// Forget the stored fingerprint so the next dataset fires again.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(status: &str) -> Dataset {
        Dataset::builder()
            .header(["id", "status", "updated_at", "notes"])
            .row(["1", status, "2024-05-01", "a"])
            .row(["2", "open", "2024-05-02", "b"])
            .build()
    }

    #[test]
    fn same_dataset_twice_is_true_then_false() {
        let mut detector = DeltaDetector::default();
        let d = dataset("open");
        assert!(detector.has_changed(&d));
        assert!(!detector.has_changed(&d));
    }

    #[test]
    fn reordered_records_are_not_a_change() {
        let mut detector = DeltaDetector::default();
        let d = dataset("open");
        let mut reordered = d.clone();
        reordered.records.reverse();

        assert!(detector.has_changed(&d));
        assert!(!detector.has_changed(&reordered));
    }

    #[test]
    fn cosmetic_churn_is_not_a_change() {
        let mut detector = DeltaDetector::default();
        let d = dataset("open");
        let mut edited = d.clone();
        edited.records[1].insert("notes", "reworded");

        assert!(detector.has_changed(&d));
        assert!(!detector.has_changed(&edited));
    }

    #[test]
    fn status_change_fires_and_updates_state() {
        let mut detector = DeltaDetector::default();
        assert!(detector.has_changed(&dataset("open")));
        assert!(detector.has_changed(&dataset("escalated")));
        assert!(!detector.has_changed(&dataset("escalated")));
    }

    #[test]
    fn unchanged_call_does_not_mutate() {
        let mut detector = DeltaDetector::default();
        detector.has_changed(&dataset("open"));
        let before = detector.last_fingerprint().cloned();
        detector.has_changed(&dataset("open"));
        assert_eq!(detector.last_fingerprint().cloned(), before);
    }

    #[test]
    fn reset_fires_again() {
        let mut detector = DeltaDetector::default();
        let d = dataset("open");
        detector.has_changed(&d);
        detector.reset();
        assert!(detector.has_changed(&d));
    }
}
