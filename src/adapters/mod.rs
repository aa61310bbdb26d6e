// Adapters layer: concrete persistence sinks behind the `TableSink` port.

pub mod csv_file;
pub mod sqlite;

pub use csv_file::{read_csv_table, CsvSink};
pub use sqlite::SqliteSink;

use crate::domain::model::Table;
use crate::domain::ports::TableSink;
use crate::utils::error::PersistError;

/// Which table went to which sink during one persist pass.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<(&'static str, String)>,
    pub skipped: Vec<String>,
    pub failures: Vec<PersistError>,
}

impl PersistReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Best-effort write of every non-empty table to every sink.
///
/// A failure is recorded and the remaining sink/table pairs are still
/// attempted. Empty tables are skipped for all sinks.
pub fn persist(tables: &[(String, Table)], sinks: &mut [Box<dyn TableSink>]) -> PersistReport {
    let mut report = PersistReport::default();

    for (name, table) in tables {
        if table.is_empty() {
            tracing::warn!("⚠️  Table {} is empty, nothing to persist", name);
            report.skipped.push(name.clone());
            continue;
        }

        for sink in sinks.iter_mut() {
            match sink.write_table(name, table) {
                Ok(()) => {
                    tracing::info!(
                        "💾 {} rows of {} saved to {}",
                        table.row_count(),
                        name,
                        sink.kind()
                    );
                    report.written.push((sink.kind(), name.clone()));
                }
                Err(source) => {
                    let err = PersistError {
                        sink: sink.kind(),
                        table: name.clone(),
                        source,
                    };
                    tracing::error!("❌ {}", err);
                    report.failures.push(err);
                }
            }
        }
    }

    report
}
