use crate::domain::model::{Cell, ColumnNulls, QualityReport, Table};
use std::collections::HashSet;

/// Null and duplicate statistics for a table. Pure; printing is left to callers.
pub fn validate(table: &Table) -> QualityReport {
    let row_count = table.row_count();

    let null_columns = table
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(position, column)| {
            let null_count = table
                .rows()
                .iter()
                .filter(|row| row[position].is_null())
                .count();
            (null_count > 0).then(|| ColumnNulls {
                column: column.clone(),
                null_count,
                null_percentage: null_count as f64 / row_count as f64 * 100.0,
            })
        })
        .collect();

    QualityReport {
        row_count,
        column_count: table.column_count(),
        null_columns,
        duplicate_rows: count_duplicate_rows(table),
    }
}

/// Rows identical to an earlier row across every column; the first copy is not counted.
fn count_duplicate_rows(table: &Table) -> usize {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(table.row_count());
    table
        .rows()
        .iter()
        .filter(|row| !seen.insert(row.iter().map(CellKey::from).collect()))
        .count()
}

/// Hashable view of a cell. All null-like cells compare equal.
#[derive(PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Null,
    Text(&'a str),
    Number(u64),
    Date(chrono::NaiveDateTime),
}

impl<'a> From<&'a Cell> for CellKey<'a> {
    fn from(cell: &'a Cell) -> Self {
        match cell {
            Cell::Missing | Cell::Null | Cell::Unparseable => CellKey::Null,
            Cell::Text(s) => CellKey::Text(s),
            // -0.0 and 0.0 are the same value
            Cell::Number(n) => CellKey::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
            Cell::Date(d) => CellKey::Date(*d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use serde_json::json;

    fn table(values: Vec<serde_json::Value>) -> Table {
        Table::from_records(
            values
                .into_iter()
                .map(|v| Record::from_json(v).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_report_counts_rows_and_columns() {
        let report = validate(&table(vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": 2, "b": "y"}),
        ]));

        assert_eq!(report.row_count, 2);
        assert_eq!(report.column_count, 2);
        assert!(report.null_columns.is_empty());
        assert_eq!(report.duplicate_rows, 0);
    }

    #[test]
    fn test_report_null_counts_only_columns_with_nulls() {
        let report = validate(&table(vec![
            json!({"a": 1, "b": null, "c": "x"}),
            json!({"a": 2, "c": "y"}),
            json!({"a": 3, "b": "z", "c": "w"}),
            json!({"a": 4, "b": "z"}),
        ]));

        assert_eq!(report.null_columns.len(), 2);
        assert_eq!(report.null_columns[0].column, "b");
        assert_eq!(report.null_columns[0].null_count, 2);
        assert!((report.null_columns[0].null_percentage - 50.0).abs() < 1e-9);
        assert_eq!(report.null_columns[1].column, "c");
        assert_eq!(report.null_columns[1].null_count, 1);
        assert!((report.null_columns[1].null_percentage - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_counts_as_null() {
        let t = Table::from_parts(
            vec!["valor_pago".to_string()],
            vec![vec![Cell::Unparseable], vec![Cell::Number(1.0)]],
        )
        .unwrap();

        let report = validate(&t);
        assert_eq!(report.null_columns[0].null_count, 1);
    }

    #[test]
    fn test_duplicate_rows() {
        let report = validate(&table(vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": 1, "b": "x"}),
            json!({"a": 1, "b": "y"}),
            json!({"a": 1, "b": "x"}),
            json!({"a": 1}),
            json!({"a": 1, "b": null}),
        ]));

        // two extra copies of (1, x) and the missing/null pair
        assert_eq!(report.duplicate_rows, 3);
    }

    #[test]
    fn test_empty_table_report() {
        let report = validate(&Table::empty());
        assert_eq!(report.row_count, 0);
        assert_eq!(report.column_count, 0);
        assert!(report.null_columns.is_empty());
        assert_eq!(report.duplicate_rows, 0);
        assert_eq!(report.to_string(), "0 rows, 0 columns, 0 duplicate rows, no null values");
    }
}
