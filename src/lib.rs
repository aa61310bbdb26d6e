pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{persist, CsvSink, PersistReport, SqliteSink};
pub use config::ExtractionConfig;
pub use crate::core::{
    cleaner::Cleaner,
    etl::{DatasetOutcome, EtlEngine, RunOutcome},
    fetcher::HttpFetcher,
    paginator::{Extraction, Paginator, StopReason},
};
pub use utils::error::{EtlError, FetchError, PersistError, Result};
