//! Priority ordering and bucketing of records for display.
//!
//! The dashboard keys partial re-renders by record identity, so the ordering
//! here is stable: records with equal priority and equal recency keep their
//! source order.

use std::cmp::Ordering;

use crate::{Dataset, Record};

/// Display priority of a record. Variants are declared most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Priority {
    /// Explicitly escalated.
    Escalated,
    /// Pending or otherwise waiting on someone to act.
    NeedsAction,
    /// Everything else.
    Normal,
}

impl Priority {
    /// Returns the display label for this priority.
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Escalated => "Escalated",
            Priority::NeedsAction => "Needs action",
            Priority::Normal => "Other",
        }
    }
}

/// Rules mapping record fields to a [`Priority`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PriorityRules {
    /// Column holding the business status.
    pub status_field: String,
    /// Column used for the secondary recency sort (ISO-8601 text sorts correctly).
    pub recency_field: String,
    /// Optional checkbox-style column; a truthy value marks the record escalated.
    pub escalation_field: Option<String>,
    /// Status values (case-insensitive) that mean escalated.
    pub escalated: Vec<String>,
    /// Status values (case-insensitive) that mean pending / needs action.
    pub needs_action: Vec<String>,
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self {
            status_field: "status".to_string(),
            recency_field: "updated_at".to_string(),
            escalation_field: None,
            escalated: vec!["escalated".to_string()],
            needs_action: vec![
                "pending".to_string(),
                "needs_action".to_string(),
                "needs action".to_string(),
            ],
        }
    }
}

impl PriorityRules {
    /// Classify one record.
    pub fn classify(&self, record: &Record) -> Priority {
        let flagged = self
            .escalation_field
            .as_deref()
            .map(|field| is_truthy(record.get(field)))
            .unwrap_or(false);
        let status = record.get(&self.status_field).trim();

        if flagged || contains_ignore_case(&self.escalated, status) {
            Priority::Escalated
        } else if contains_ignore_case(&self.needs_action, status) {
            Priority::NeedsAction
        } else {
            Priority::Normal
        }
    }

    /// Order records by priority, then by recency descending.
    ///
    /// Uses a stable sort, so ties keep their input order.
    pub fn sort<'a, I>(&self, records: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut keyed: Vec<(Priority, &'a str, &'a Record)> = records
            .into_iter()
            .map(|r| (self.classify(r), r.get(&self.recency_field), r))
            .collect();
        keyed.sort_by(|a, b| compare_keys((a.0, a.1), (b.0, b.1)));
        keyed.into_iter().map(|(_, _, r)| r).collect()
    }

    /// Split a dataset into priority buckets, each in display order.
    pub fn group<'a>(&self, dataset: &'a Dataset) -> PriorityGroups<'a> {
        let mut groups = PriorityGroups::default();
        for record in self.sort(dataset.iter()) {
            match self.classify(record) {
                Priority::Escalated => groups.escalated.push(record),
                Priority::NeedsAction => groups.needs_action.push(record),
                Priority::Normal => groups.other.push(record),
            }
        }
        groups
    }
}

/// Records bucketed by priority.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PriorityGroups<'a> {
    pub escalated: Vec<&'a Record>,
    pub needs_action: Vec<&'a Record>,
    pub other: Vec<&'a Record>,
}

impl PriorityGroups<'_> {
    /// Total records across all buckets.
    pub fn len(&self) -> usize {
        self.escalated.len() + self.needs_action.len() + self.other.len()
    }

    /// Returns true if every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compare_keys(a: (Priority, &str), b: (Priority, &str)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1))
}

fn contains_ignore_case(values: &[String], needle: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(needle))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}
