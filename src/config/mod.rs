#[cfg(feature = "cli")]
pub mod cli;
pub mod extraction;

#[cfg(feature = "cli")]
pub use cli::CliArgs;
pub use extraction::{
    DatasetConfig, DateRange, ExtractionConfig, FieldClassification, OutputConfig,
    PaginationConfig,
};
