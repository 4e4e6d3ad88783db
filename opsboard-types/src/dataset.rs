//! Tabular datasets decoded from header + row payloads.

use std::collections::BTreeMap;

/// A single decoded row, keyed by header field name.
///
/// Missing fields read as the empty string, matching how short rows are
/// padded during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a field value, or `""` if the field is absent.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    /// Returns true if the record carries this field (even if empty).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field value, returning the previous one.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(field.into(), value.into())
    }

    /// Iterate over `(field, value)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An ordered sequence of records sharing one header.
///
/// Decoded from a header row followed by positional data rows (see
/// [`Dataset::from_values`]). The header is kept so consumers can render
/// columns in source order and detect schema drift between fetches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dataset {
    /// Field names in source column order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub header: Vec<String>,

    /// Decoded records in source row order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub records: Vec<Record>,
}

impl Dataset {
    /// An empty dataset with no header.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a builder for datasets.
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::new()
    }

    /// Decode a `values` matrix: row 0 is the header, the rest are data rows.
    ///
    /// Rows shorter than the header are padded with empty strings; cells
    /// beyond the header width are dropped. An empty matrix decodes to an
    /// empty dataset.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut rows = values.into_iter();
        let Some(header) = rows.next() else {
            return Self::empty();
        };

        let records = rows
            .map(|row| {
                let mut cells = row.into_iter();
                let mut record = Record::new();
                for name in &header {
                    record.insert(name.clone(), cells.next().unwrap_or_default());
                }
                record
            })
            .collect();

        Self { header, records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The decoded records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The header row.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Iterate over records.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Returns true if the header contains `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|h| h == column)
    }

    /// Columns from `required` that the header lacks.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect()
    }
}

/// Wire payload of a tabular read endpoint: `{ "values": [[...], ...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ValueRange {
    /// The A1 range the values cover, when the source reports it.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub range: Option<String>,

    /// Header row followed by data rows. Absent when the range is empty.
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    /// Decode into a [`Dataset`].
    pub fn into_dataset(self) -> Dataset {
        Dataset::from_values(self.values)
    }
}

/// Builder for constructing `Dataset` instances, mostly in tests and demos.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    values: Vec<Vec<String>>,
}

impl DatasetBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header row. Replaces any previous header.
    pub fn header<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let header = names.into_iter().map(Into::into).collect();
        if self.values.is_empty() {
            self.values.push(header);
        } else {
            self.values[0] = header;
        }
        self
    }

    /// Append a positional data row.
    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.values.is_empty() {
            self.values.push(Vec::new());
        }
        self.values.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Build the dataset.
    pub fn build(self) -> Dataset {
        Dataset::from_values(self.values)
    }
}
