//! Priority-ordered board model.
//!
//! A [`Board`] is what the dashboard actually shows: the records of the
//! current dataset, classified with [`PriorityRules`] and laid out most
//! urgent first. It is rebuilt whenever the engine delivers a changed
//! dataset, and also backs the `--export` JSON.

use opsboard_types::{Dataset, Priority, PriorityRules, Record, SyncStatus};
use serde::Serialize;

/// Columns shown when the dataset header is too wide for the table.
const MAX_TABLE_COLUMNS: usize = 6;

/// One displayed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardRow {
    pub priority: Priority,
    pub record: Record,
}

/// Per-bucket record counts for the header bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub escalated: usize,
    pub needs_action: usize,
    pub other: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.escalated + self.needs_action + self.other
    }
}

/// The records of one dataset in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    /// Column names in source order.
    pub header: Vec<String>,
    /// Rows, most urgent first.
    pub rows: Vec<BoardRow>,
}

impl Board {
    /// Classify and order `dataset` with `rules`.
    pub fn build(dataset: &Dataset, rules: &PriorityRules) -> Self {
        let rows = rules
            .sort(dataset.iter())
            .into_iter()
            .map(|record| BoardRow {
                priority: rules.classify(record),
                record: record.clone(),
            })
            .collect();

        Self {
            header: dataset.header.clone(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count rows per priority bucket.
    pub fn counts(&self) -> BucketCounts {
        let mut counts = BucketCounts::default();
        for row in &self.rows {
            match row.priority {
                Priority::Escalated => counts.escalated += 1,
                Priority::NeedsAction => counts.needs_action += 1,
                Priority::Normal => counts.other += 1,
            }
        }
        counts
    }

    /// Columns the table renders: the first few header columns.
    pub fn table_columns(&self) -> &[String] {
        let n = self.header.len().min(MAX_TABLE_COLUMNS);
        &self.header[..n]
    }

    /// Rows whose values contain `filter` (case-insensitive), keeping order.
    pub fn filtered<'a>(&'a self, filter: &str) -> Vec<&'a BoardRow> {
        if filter.is_empty() {
            return self.rows.iter().collect();
        }
        let needle = filter.to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                row.record
                    .iter()
                    .any(|(_, value)| value.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Build the export document.
    pub fn export<'a>(&'a self, source: &'a str, status: SyncStatus) -> BoardExport<'a> {
        BoardExport {
            source,
            status,
            counts: self.counts(),
            header: &self.header,
            rows: &self.rows,
        }
    }
}

/// Serialized form of a board written by `--export`.
#[derive(Debug, Serialize)]
pub struct BoardExport<'a> {
    pub source: &'a str,
    pub status: SyncStatus,
    pub counts: BucketCounts,
    pub header: &'a [String],
    pub rows: &'a [BoardRow],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::builder()
            .header(["id", "status", "updated_at"])
            .row(["T-1", "open", "2024-05-01T08:00:00Z"])
            .row(["T-2", "escalated", "2024-05-01T07:00:00Z"])
            .row(["T-3", "pending", "2024-05-01T09:00:00Z"])
            .row(["T-4", "pending", "2024-05-01T10:00:00Z"])
            .build()
    }

    fn ids(board: &Board) -> Vec<&str> {
        board.rows.iter().map(|r| r.record.get("id")).collect()
    }

    #[test]
    fn rows_are_priority_then_recency_ordered() {
        let board = Board::build(&dataset(), &PriorityRules::default());
        assert_eq!(ids(&board), vec!["T-2", "T-4", "T-3", "T-1"]);
        assert_eq!(board.rows[0].priority, Priority::Escalated);
    }

    #[test]
    fn counts_per_bucket() {
        let board = Board::build(&dataset(), &PriorityRules::default());
        let counts = board.counts();
        assert_eq!(counts.escalated, 1);
        assert_eq!(counts.needs_action, 2);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.total(), board.len());
    }

    #[test]
    fn filter_matches_any_value() {
        let board = Board::build(&dataset(), &PriorityRules::default());
        let rows = board.filtered("PEND");
        assert_eq!(rows.len(), 2);
        assert_eq!(board.filtered("").len(), 4);
        assert!(board.filtered("nothing-matches").is_empty());
    }

    #[test]
    fn export_serializes_rows_in_order() {
        let board = Board::build(&dataset(), &PriorityRules::default());
        let json = serde_json::to_value(board.export("file: board.json", SyncStatus::Synced)).unwrap();
        assert_eq!(json["status"], "synced");
        assert_eq!(json["counts"]["needs_action"], 2);
        assert_eq!(json["rows"][0]["priority"], "escalated");
        assert_eq!(json["rows"][0]["record"]["id"], "T-2");
    }

    #[test]
    fn empty_dataset_is_an_empty_board() {
        let board = Board::build(&Dataset::empty(), &PriorityRules::default());
        assert!(board.is_empty());
        assert!(board.table_columns().is_empty());
    }
}
