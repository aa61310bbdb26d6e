use crate::domain::model::{Cell, Table};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const ORGAO_COLUMN: &str = "orgao";
const MODALITY_COLUMN: &str = "descricao_modalidade";
const SIGNING_DATE_COLUMN: &str = "data_assinatura";
const TOP_ORGAOS: usize = 10;

/// Descriptive statistics over the money column picked for a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueStats {
    pub column: String,
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

/// What the exploratory charts would have shown, as plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub value_stats: Option<ValueStats>,
    /// Signing dates bucketed as `YYYY-MM`.
    pub monthly_counts: BTreeMap<String, usize>,
    /// Most frequent agencies, highest first.
    pub top_orgaos: Vec<(String, usize)>,
    pub modalities: Vec<(String, usize)>,
}

impl DatasetSummary {
    pub fn from_table(table: &Table) -> Self {
        let mut top_orgaos = value_counts(table, ORGAO_COLUMN);
        top_orgaos.truncate(TOP_ORGAOS);

        Self {
            rows: table.row_count(),
            columns: table.columns().to_vec(),
            value_stats: value_column(table).and_then(|column| value_stats(table, column)),
            monthly_counts: monthly_counts(table, SIGNING_DATE_COLUMN),
            top_orgaos,
            modalities: value_counts(table, MODALITY_COLUMN),
        }
    }
}

/// First column whose name mentions `valor`, in column order.
pub fn value_column(table: &Table) -> Option<&str> {
    table
        .columns()
        .iter()
        .find(|c| c.to_lowercase().contains("valor"))
        .map(String::as_str)
}

pub fn value_stats(table: &Table, column: &str) -> Option<ValueStats> {
    let values: Vec<f64> = table.column(column)?.filter_map(Cell::as_number).collect();
    if values.is_empty() {
        return None;
    }

    let total: f64 = values.iter().sum();
    Some(ValueStats {
        column: column.to_string(),
        count: values.len(),
        total,
        mean: total / values.len() as f64,
        max: values.iter().copied().fold(f64::MIN, f64::max),
        min: values.iter().copied().fold(f64::MAX, f64::min),
    })
}

fn monthly_counts(table: &Table, column: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    if let Some(cells) = table.column(column) {
        for date in cells.filter_map(Cell::as_date) {
            *counts.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Text value frequencies, descending by count then ascending by value.
fn value_counts(table: &Table, column: &str) -> Vec<(String, usize)> {
    let Some(cells) = table.column(column) else {
        return Vec::new();
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for cell in cells {
        if let Cell::Text(value) = cell {
            *counts.entry(value.clone()).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Record count and value total for one dataset, side by side with the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub dataset: String,
    pub records: usize,
    pub value_total: Option<f64>,
}

pub fn compare<'a, I>(summaries: I) -> Vec<ComparisonRow>
where
    I: IntoIterator<Item = (&'a str, &'a DatasetSummary)>,
{
    summaries
        .into_iter()
        .map(|(dataset, summary)| ComparisonRow {
            dataset: dataset.to_string(),
            records: summary.rows,
            value_total: summary.value_stats.as_ref().map(|s| s.total),
        })
        .collect()
}
