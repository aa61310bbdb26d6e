use crate::config::FieldClassification;
use crate::domain::model::{Cell, Table};
use crate::domain::ports::TableSink;
use crate::utils::error::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Writes each table into a SQLite database, dropping any previous version.
pub struct SqliteSink {
    conn: Connection,
    fields: FieldClassification,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P, fields: FieldClassification) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn, fields })
    }

    pub fn in_memory(fields: FieldClassification) -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            fields,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn column_type(&self, table: &Table, position: usize, name: &str) -> &'static str {
        if self.fields.is_numeric_field(name) {
            return "REAL";
        }
        if self.fields.is_date_field(name) {
            return "TIMESTAMP";
        }
        let mut values = table
            .rows()
            .iter()
            .map(|row| &row[position])
            .filter(|c| !c.is_null())
            .peekable();
        if values.peek().is_some() && values.all(|c| matches!(c, Cell::Number(_))) {
            "REAL"
        } else {
            "TEXT"
        }
    }
}

impl TableSink for SqliteSink {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    /// Replaces `name` inside one transaction, so a failed write leaves the old table.
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        let table_ident = quote_ident(name);
        let column_defs: Vec<String> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(position, column)| {
                format!(
                    "{} {}",
                    quote_ident(column),
                    self.column_type(table, position, column)
                )
            })
            .collect();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table_ident};\nCREATE TABLE {table_ident} ({});",
            column_defs.join(", ")
        ))?;

        {
            let placeholders = vec!["?"; table.column_count()].join(", ");
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {table_ident} VALUES ({placeholders})"))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter().map(to_sql)))?;
            }
        }

        tx.commit()?;
        tracing::debug!("Wrote {} rows to SQLite table {}", table.row_count(), name);
        Ok(())
    }
}

fn to_sql(cell: &Cell) -> SqlValue {
    match cell {
        Cell::Missing | Cell::Null | Cell::Unparseable => SqlValue::Null,
        Cell::Text(s) => SqlValue::Text(s.clone()),
        Cell::Number(n) => SqlValue::Real(*n),
        Cell::Date(d) => SqlValue::Text(d.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
