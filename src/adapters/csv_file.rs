use crate::domain::model::{Cell, Table};
use crate::domain::ports::TableSink;
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes each table as a UTF-8, comma-delimited file with a header row.
///
/// Each write goes to a temporary sibling first and is renamed over the
/// target, so a failed write never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
    file_names: HashMap<String, String>,
}

impl CsvSink {
    /// Creates the output directory if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            file_names: HashMap::new(),
        })
    }

    /// Overrides the file name used for one table.
    pub fn with_file_name(mut self, table: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.file_names.insert(table.into(), file_name.into());
        self
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        let file_name = self
            .file_names
            .get(table)
            .cloned()
            .unwrap_or_else(|| format!("{}.csv", table));
        self.output_dir.join(file_name)
    }
}

impl TableSink for CsvSink {
    fn kind(&self) -> &'static str {
        "csv"
    }

    fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        let path = self.path_for(name);
        let tmp_path = path.with_extension("csv.tmp");

        let written = write_csv(&tmp_path, table);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        fs::rename(&tmp_path, &path)?;

        tracing::debug!("Wrote {} rows to {}", table.row_count(), path.display());
        Ok(())
    }
}

fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Cell::to_field_string))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a file written by [`CsvSink`] back into a table.
///
/// Types are not preserved: non-empty fields come back as [`Cell::Text`] and
/// empty fields as [`Cell::Missing`].
pub fn read_csv_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Missing
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Table::from_parts(columns, rows).ok_or_else(|| EtlError::ProcessingError {
        message: "CSV rows do not match the header width".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldClassification;
    use crate::core::cleaner::Cleaner;
    use crate::domain::model::Record;
    use serde_json::json;
    use tempfile::TempDir;

    fn cleaned(values: Vec<serde_json::Value>) -> Table {
        let table = Table::from_records(
            values
                .into_iter()
                .map(|v| Record::from_json(v).unwrap())
                .collect(),
        );
        Cleaner::new(&FieldClassification::default()).clean(&table)
    }

    #[test]
    fn test_write_table_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let table = cleaned(vec![
            json!({"orgao": "SECRETARIA DA SAÚDE", "valor_pago": "150.75", "data_assinatura": "15/03/2024"}),
            json!({"orgao": "SEDUC, CE", "valor_pago": "x"}),
        ]);

        sink.write_table("contratos", &table).unwrap();

        let content = fs::read_to_string(dir.path().join("contratos.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "orgao,valor_pago,data_assinatura");
        assert_eq!(lines[1], "SECRETARIA DA SAÚDE,150.75,2024-03-15");
        assert_eq!(lines[2], "\"SEDUC, CE\",,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_file_name_override() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path())
            .unwrap()
            .with_file_name("convenios", "convenios_ceara_transparente.csv");

        assert_eq!(
            sink.path_for("convenios"),
            dir.path().join("convenios_ceara_transparente.csv")
        );
        assert_eq!(sink.path_for("contratos"), dir.path().join("contratos.csv"));
    }

    #[test]
    fn test_round_trip_keeps_shape_but_not_types() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let table = cleaned(vec![
            json!({"id": 1, "valor_aditivo": 10.5}),
            json!({"id": 2, "orgao": "SEFAZ"}),
            json!({"id": 3}),
        ]);

        sink.write_table("convenios", &table).unwrap();
        let back = read_csv_table(sink.path_for("convenios")).unwrap();

        assert_eq!(back.row_count(), table.row_count());
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.cell(0, "valor_aditivo"), Some(&Cell::Text("10.5".into())));
        assert_eq!(back.cell(1, "valor_aditivo"), Some(&Cell::Missing));
    }

    #[test]
    fn test_write_twice_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let table = cleaned(vec![json!({"id": 1}), json!({"id": 2})]);

        sink.write_table("convenios", &table).unwrap();
        let first = fs::read(sink.path_for("convenios")).unwrap();
        sink.write_table("convenios", &table).unwrap();
        let second = fs::read(sink.path_for("convenios")).unwrap();

        assert_eq!(first, second);
        assert!(!dir.path().join("convenios.csv.tmp").exists());
    }

    #[test]
    fn test_creates_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("exports").join("2024");
        let mut sink = CsvSink::new(&nested).unwrap();

        sink.write_table("contratos", &cleaned(vec![json!({"id": 1})]))
            .unwrap();

        assert!(nested.join("contratos.csv").exists());
    }
}
