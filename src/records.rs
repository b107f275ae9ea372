//! Ordered key/value records entered by the user.
//!
//! [`RecordModel`] is the editing API for front ends that keep a form open
//! (add, edit, remove and clear rows); one-shot callers such as the CLI build
//! a `Vec<Record>` directly.

use serde::{Deserialize, Serialize};

/// One key/value row. Keys are free text and need not be unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// True when both the trimmed key and the trimmed value are empty.
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty() && self.value.trim().is_empty()
    }
}

/// Which half of a record an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Key,
    Value,
}

/// The editable record list.
///
/// Always holds at least one row. Every mutation bumps [`revision`], which
/// callers use to know that the projected text, the card token and any
/// pending generation are out of date.
///
/// [`revision`]: RecordModel::revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordModel {
    records: Vec<Record>,
    revision: u64,
}

impl Default for RecordModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordModel {
    pub fn new() -> Self {
        Self {
            records: vec![Record::default()],
            revision: 0,
        }
    }

    /// Builds a model from existing rows; an empty list yields one empty row.
    pub fn from_records(records: Vec<Record>) -> Self {
        if records.is_empty() {
            return Self::new();
        }
        Self { records, revision: 0 }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(Record::is_blank)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn add_record(&mut self) {
        self.records.push(Record::default());
        self.touch();
    }

    /// Replaces one field of one row. Out-of-range indexes are ignored.
    ///
    /// No per-field limit applies here; the input ceiling is enforced on the
    /// flattened text by the projector.
    pub fn update_record(&mut self, index: usize, field: Field, value: impl Into<String>) {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };
        let slot = match field {
            Field::Key => &mut record.key,
            Field::Value => &mut record.value,
        };
        let value = value.into();
        if *slot != value {
            *slot = value;
            self.touch();
        }
    }

    /// Removes a row unless it is the last one. Out-of-range indexes are
    /// ignored.
    pub fn remove_record(&mut self, index: usize) {
        if self.records.len() <= 1 || index >= self.records.len() {
            return;
        }
        self.records.remove(index);
        self.touch();
    }

    /// Resets to a single empty row.
    pub fn clear(&mut self) {
        self.records = vec![Record::default()];
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_empty_row() {
        let model = RecordModel::new();
        assert_eq!(model.records(), &[Record::default()]);
        assert!(model.is_empty());
    }

    #[test]
    fn add_and_update_preserve_order() {
        let mut model = RecordModel::new();
        model.update_record(0, Field::Key, "Ism");
        model.update_record(0, Field::Value, "Ali");
        model.add_record();
        model.update_record(1, Field::Key, "Telefon");
        model.update_record(1, Field::Value, "+998901234567");
        assert_eq!(
            model.records(),
            &[Record::new("Ism", "Ali"), Record::new("Telefon", "+998901234567")]
        );
        assert_eq!(model.revision(), 5);
    }

    #[test]
    fn never_removes_last_row() {
        let mut model = RecordModel::new();
        model.update_record(0, Field::Value, "x");
        model.remove_record(0);
        assert_eq!(model.len(), 1);
        assert_eq!(model.records()[0].value, "x");
    }

    #[test]
    fn remove_by_index() {
        let mut model = RecordModel::from_records(vec![
            Record::new("a", "1"),
            Record::new("b", "2"),
            Record::new("c", "3"),
        ]);
        model.remove_record(1);
        assert_eq!(model.records(), &[Record::new("a", "1"), Record::new("c", "3")]);
    }

    #[test]
    fn out_of_range_is_a_no_op() {
        let mut model = RecordModel::new();
        model.update_record(7, Field::Key, "k");
        model.remove_record(7);
        assert_eq!(model.revision(), 0);
    }

    #[test]
    fn identical_update_does_not_invalidate() {
        let mut model = RecordModel::from_records(vec![Record::new("a", "1")]);
        model.update_record(0, Field::Value, "1");
        assert_eq!(model.revision(), 0);
    }
}
