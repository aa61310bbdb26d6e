use crate::adapters::{persist, PersistReport};
use crate::config::{DateRange, ExtractionConfig};
use crate::core::cleaner::Cleaner;
use crate::core::paginator::{Extraction, Paginator, StopReason};
use crate::core::quality;
use crate::core::summary::{self, ComparisonRow, DatasetSummary};
use crate::domain::model::{QualityReport, Table};
use crate::domain::ports::{Fetcher, TableSink};

/// What happened to one dataset during a run.
#[derive(Debug)]
pub struct DatasetOutcome {
    pub name: String,
    pub records: usize,
    pub pages_requested: usize,
    pub stop_reason: StopReason,
    pub quality: QualityReport,
    pub summary: DatasetSummary,
}

/// Aggregate result of one run; a run always completes and reports here.
#[derive(Debug)]
pub struct RunOutcome {
    pub datasets: Vec<DatasetOutcome>,
    pub comparison: Vec<ComparisonRow>,
    pub persist: PersistReport,
}

impl RunOutcome {
    pub fn dataset(&self, name: &str) -> Option<&DatasetOutcome> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// True when every page loop ended normally and every write landed.
    pub fn is_clean(&self) -> bool {
        self.persist.is_success()
            && self
                .datasets
                .iter()
                .all(|d| !matches!(d.stop_reason, StopReason::Failed(_)))
    }
}

/// Runs fetch → tabulate → clean → persist/report for every configured dataset.
pub struct EtlEngine<F: Fetcher> {
    config: ExtractionConfig,
    paginator: Paginator<F>,
    sinks: Vec<Box<dyn TableSink>>,
}

impl<F: Fetcher> EtlEngine<F> {
    pub fn new(config: ExtractionConfig, fetcher: F, sinks: Vec<Box<dyn TableSink>>) -> Self {
        let paginator = Paginator::from_config(fetcher, &config.pagination);
        Self {
            config,
            paginator,
            sinks,
        }
    }

    pub async fn run(&mut self) -> RunOutcome {
        tracing::info!(
            "🚀 Starting extraction for {} datasets ({} to {})",
            self.config.datasets.len(),
            self.config.date_range.start,
            self.config.date_range.end
        );

        let filter = self.config.date_range.query_params();
        let cleaner = Cleaner::new(&self.config.fields);

        let mut tables = Vec::with_capacity(self.config.datasets.len());
        let mut datasets = Vec::with_capacity(self.config.datasets.len());

        for dataset in &self.config.datasets {
            tracing::info!("🚀 Extracting dataset {}", dataset.name);

            let Extraction {
                records,
                pages_requested,
                stop_reason,
            } = self
                .paginator
                .extract_all(&dataset.endpoint, &filter, self.config.pagination.max_pages)
                .await;
            let record_count = records.len();
            tracing::info!(
                "🎯 {}: {} records from {} pages ({})",
                dataset.name,
                record_count,
                pages_requested,
                stop_reason
            );

            let table = Table::from_records(records);
            tracing::debug!(
                "📊 {} table: {} x {}, columns {:?}",
                dataset.name,
                table.row_count(),
                table.column_count(),
                table.columns()
            );
            let cleaned = cleaner.clean(&table);

            let quality = quality::validate(&cleaned);
            let summary = DatasetSummary::from_table(&cleaned);
            log_quality(&dataset.name, &quality);
            log_summary(&dataset.name, &self.config.date_range, &summary);

            tables.push((dataset.name.clone(), cleaned));
            datasets.push(DatasetOutcome {
                name: dataset.name.clone(),
                records: record_count,
                pages_requested,
                stop_reason,
                quality,
                summary,
            });
        }

        let comparison =
            summary::compare(datasets.iter().map(|d| (d.name.as_str(), &d.summary)));
        for row in &comparison {
            tracing::info!(
                "📊 {}: {} records, value total {}",
                row.dataset,
                row.records,
                row.value_total
                    .map_or_else(|| "n/a".to_string(), |t| format!("{:.2}", t))
            );
        }

        let persist_report = persist(&tables, &mut self.sinks);

        RunOutcome {
            datasets,
            comparison,
            persist: persist_report,
        }
    }
}

fn log_quality(name: &str, report: &QualityReport) {
    tracing::info!("📋 Validation {}: {}", name, report);
    for column in &report.null_columns {
        tracing::info!(
            "   • {}: {} ({:.1}%) null",
            column.column,
            column.null_count,
            column.null_percentage
        );
    }
    if report.duplicate_rows > 0 {
        tracing::warn!("⚠️  {} duplicate rows in {}", report.duplicate_rows, name);
    }
}

fn log_summary(name: &str, period: &DateRange, summary: &DatasetSummary) {
    tracing::info!("💰 {}", summary_headline(name, period, summary));
    if !summary.monthly_counts.is_empty() {
        tracing::debug!("📅 {} signings per month: {:?}", name, summary.monthly_counts);
    }
    if !summary.top_orgaos.is_empty() {
        tracing::debug!("🏛️  {} top agencies: {:?}", name, summary.top_orgaos);
    }
    if !summary.modalities.is_empty() {
        tracing::debug!("📑 {} modalities: {:?}", name, summary.modalities);
    }
}

/// One-line summary of a dataset, echoing the signing period it covers.
fn summary_headline(name: &str, period: &DateRange, summary: &DatasetSummary) -> String {
    let period = format!("{} to {}", period.start, period.end);
    match &summary.value_stats {
        Some(stats) => format!(
            "{} ({}) {}: total {:.2}, mean {:.2}, max {:.2}, min {:.2}",
            name, period, stats.column, stats.total, stats.mean, stats.max, stats.min
        ),
        None => format!("{} ({}): no value column", name, period),
    }
}
