use crate::config::extraction::{DateRange, ExtractionConfig};
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "transparencia-etl")]
#[command(about = "Extracts Ceará Transparente contracts and agreements into SQLite and CSV")]
pub struct CliArgs {
    /// Path to a TOML configuration file; built-in defaults are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Signing date window start (DD/MM/YYYY)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Signing date window end (DD/MM/YYYY)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Page cap per dataset
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Expected records per page; a shorter page ends pagination
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Directory for the CSV exports
    #[arg(long)]
    pub output_dir: Option<String>,

    /// SQLite database file
    #[arg(long)]
    pub database: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliArgs {
    /// Loads the file (or defaults) and lets flags override it.
    pub fn load_config(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractionConfig::from_file(path)?,
            None => ExtractionConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ExtractionConfig) {
        if self.start_date.is_some() || self.end_date.is_some() {
            config.date_range = DateRange::new(
                self.start_date
                    .clone()
                    .unwrap_or_else(|| config.date_range.start.clone()),
                self.end_date
                    .clone()
                    .unwrap_or_else(|| config.date_range.end.clone()),
            );
        }
        if let Some(max_pages) = self.max_pages {
            config.pagination.max_pages = max_pages;
        }
        if let Some(page_size) = self.page_size {
            config.pagination.page_size = page_size;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output.output_dir = output_dir.clone();
        }
        if let Some(database) = &self.database {
            config.output.database_path = database.clone();
        }
    }
}
