use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A scalar as returned by the transparency API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    String(String),
    Null,
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::String(b.to_string()),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => FieldValue::Number(f),
                None => FieldValue::String(n.to_string()),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            // 巢狀結構保留為緊湊 JSON 文字
            nested => FieldValue::String(nested.to_string()),
        }
    }
}

/// One API item. Fields keep the order in which the response listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing an earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Builds a record from a JSON object; any other JSON shape is rejected.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => {
                let mut record = Record::new();
                for (key, value) in map {
                    record.insert(key, FieldValue::from(value));
                }
                Some(record)
            }
            _ => None,
        }
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// One cell of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The record did not carry this field at all.
    Missing,
    /// The record carried the field with an explicit null.
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    /// A value was present but could not be read as the column's expected type.
    Unparseable,
}

impl Cell {
    /// Null-like in the dataframe sense: absent, null, or coerced away.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Missing | Cell::Null | Cell::Unparseable)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Text form used by the delimited file sink; null-like cells render empty.
    pub fn to_field_string(&self) -> String {
        match self {
            Cell::Missing | Cell::Null | Cell::Unparseable => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => format_date(d),
        }
    }
}

impl From<FieldValue> for Cell {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Cell::Null,
            FieldValue::Number(n) => Cell::Number(n),
            FieldValue::String(s) => Cell::Text(s),
        }
    }
}

pub(crate) fn format_date(d: &NaiveDateTime) -> String {
    if d.time().num_seconds_from_midnight() == 0 && d.time().nanosecond() == 0 {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Rectangular view over a sequence of records.
///
/// Every row holds exactly one cell per column. A table with no rows and no
/// columns is the explicit empty state produced from an empty extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from parts; rows must match the column count.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Option<Self> {
        if rows.iter().any(|row| row.len() != columns.len()) {
            return None;
        }
        Some(Self { columns, rows })
    }

    /// Union-of-fields tabulation.
    ///
    /// Columns appear in order of first occurrence across all records; a
    /// record lacking a column gets [`Cell::Missing`] there.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in &records {
            for (name, _) in record.fields() {
                if !index.contains_key(name) {
                    index.insert(name.to_string(), columns.len());
                    columns.push(name.to_string());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = vec![Cell::Missing; columns.len()];
                for (name, value) in record.fields {
                    if let Some(&position) = index.get(&name) {
                        row[position] = Cell::from(value);
                    }
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when there is nothing to persist: no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let position = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[position])
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell>> {
        let position = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[position]))
    }

    /// Rewrites the cells at `position` in place through `f`.
    pub(crate) fn update_column<F>(&mut self, position: usize, mut f: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        for row in &mut self.rows {
            row[position] = f(&row[position]);
        }
    }
}

/// Null statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnNulls {
    pub column: String,
    pub null_count: usize,
    pub null_percentage: f64,
}

/// Post-hoc quality statistics for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    /// Only columns with at least one null, in column order.
    pub null_columns: Vec<ColumnNulls>,
    pub duplicate_rows: usize,
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows, {} columns, {} duplicate rows",
            self.row_count, self.column_count, self.duplicate_rows
        )?;
        if self.null_columns.is_empty() {
            write!(f, ", no null values")
        } else {
            write!(f, ", {} columns with nulls", self.null_columns.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from(json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from(json!(1.5)), FieldValue::Number(1.5));
        assert_eq!(FieldValue::from(json!("x")), FieldValue::String("x".into()));
        assert_eq!(FieldValue::from(json!(true)), FieldValue::String("true".into()));
        assert_eq!(
            FieldValue::from(json!({"k": [1, 2]})),
            FieldValue::String(r#"{"k":[1,2]}"#.into())
        );
    }

    #[test]
    fn test_record_from_json_rejects_non_objects() {
        assert!(Record::from_json(json!([1, 2])).is_none());
        assert!(Record::from_json(json!("text")).is_none());
    }

    #[test]
    fn test_record_keeps_response_field_order() {
        let r = record(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let names: Vec<&str> = r.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_tabulate_union_of_fields() {
        let table = Table::from_records(vec![
            record(json!({"a": 1, "b": 2})),
            record(json!({"a": 3})),
        ]);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.cell(1, "a"), Some(&Cell::Number(3.0)));
        assert_eq!(table.cell(1, "b"), Some(&Cell::Missing));
    }

    #[test]
    fn test_tabulate_first_occurrence_order_across_records() {
        let table = Table::from_records(vec![
            record(json!({"b": 1})),
            record(json!({"c": 2, "a": 3})),
            record(json!({"a": 4, "b": 5})),
        ]);

        assert_eq!(table.columns(), &["b", "c", "a"]);
        assert_eq!(table.rows()[0], vec![Cell::Number(1.0), Cell::Missing, Cell::Missing]);
    }

    #[test]
    fn test_tabulate_distinguishes_null_from_missing() {
        let table = Table::from_records(vec![
            record(json!({"a": null, "b": "x"})),
            record(json!({"b": "y"})),
        ]);

        assert_eq!(table.cell(0, "a"), Some(&Cell::Null));
        assert_eq!(table.cell(1, "a"), Some(&Cell::Missing));
    }

    #[test]
    fn test_tabulate_empty_input() {
        let table = Table::from_records(Vec::new());
        assert_eq!(table, Table::empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_parts_rejects_ragged_rows() {
        assert!(Table::from_parts(vec!["a".into()], vec![vec![]]).is_none());
        assert!(Table::from_parts(vec!["a".into()], vec![vec![Cell::Null]]).is_some());
    }

    #[test]
    fn test_update_column_rewrites_only_that_column() {
        let mut table = Table::from_parts(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Text("1".into()), Cell::Text("x".into())],
                vec![Cell::Null, Cell::Text("y".into())],
            ],
        )
        .unwrap();

        table.update_column(0, |cell| match cell {
            Cell::Text(raw) => Cell::Number(raw.parse().unwrap()),
            other => other.clone(),
        });

        let a: Vec<&Cell> = table.column("a").unwrap().collect();
        let b: Vec<&Cell> = table.column("b").unwrap().collect();
        assert_eq!(a, vec![&Cell::Number(1.0), &Cell::Null]);
        assert_eq!(b, vec![&Cell::Text("x".into()), &Cell::Text("y".into())]);
    }

    #[test]
    fn test_cell_field_string() {
        let midnight = chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let afternoon = midnight + chrono::Duration::hours(14);

        assert_eq!(Cell::Number(150.75).to_field_string(), "150.75");
        assert_eq!(Cell::Number(1000.0).to_field_string(), "1000");
        assert_eq!(Cell::Date(midnight).to_field_string(), "2024-03-15");
        assert_eq!(Cell::Date(afternoon).to_field_string(), "2024-03-15 14:00:00");
        assert_eq!(Cell::Unparseable.to_field_string(), "");
    }
}
