use crate::config::FieldClassification;
use crate::domain::model::{Cell, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Coerces the classified date and money columns into typed cells.
pub struct Cleaner<'a> {
    fields: &'a FieldClassification,
}

impl<'a> Cleaner<'a> {
    pub fn new(fields: &'a FieldClassification) -> Self {
        Self { fields }
    }

    /// Returns a cleaned copy; `table` is left untouched.
    ///
    /// Cells that fail to parse become [`Cell::Unparseable`]; no single bad
    /// value aborts the run.
    pub fn clean(&self, table: &Table) -> Table {
        if table.is_empty() {
            return table.clone();
        }

        let mut cleaned = table.clone();
        for (position, column) in table.columns().iter().enumerate() {
            let coerce: fn(&Cell) -> Cell = if self.fields.is_date_field(column) {
                coerce_date
            } else if self.fields.is_numeric_field(column) {
                coerce_number
            } else {
                continue;
            };

            let mut failures = 0usize;
            cleaned.update_column(position, |cell| {
                let coerced = coerce(cell);
                if coerced == Cell::Unparseable && *cell != Cell::Unparseable {
                    failures += 1;
                }
                coerced
            });

            if failures > 0 {
                tracing::debug!("⚠️  {} unparseable values in column {}", failures, column);
            }
        }
        cleaned
    }
}

fn coerce_date(cell: &Cell) -> Cell {
    match cell {
        Cell::Missing | Cell::Null | Cell::Date(_) | Cell::Unparseable => cell.clone(),
        Cell::Text(raw) => parse_date(raw).map_or(Cell::Unparseable, Cell::Date),
        Cell::Number(_) => Cell::Unparseable,
    }
}

fn coerce_number(cell: &Cell) -> Cell {
    match cell {
        Cell::Missing | Cell::Null | Cell::Unparseable => cell.clone(),
        Cell::Number(n) if n.is_finite() => cell.clone(),
        Cell::Text(raw) => parse_number(raw).map_or(Cell::Unparseable, Cell::Number),
        Cell::Number(_) | Cell::Date(_) => Cell::Unparseable,
    }
}

/// Parses the date shapes the API and its exports are known to use.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_local());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}

/// Standard float literals only; NaN and infinities are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
