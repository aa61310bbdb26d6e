pub mod cleaner;
pub mod etl;
pub mod fetcher;
pub mod paginator;
pub mod quality;
pub mod summary;

pub use crate::domain::model::{Cell, FieldValue, QualityReport, Record, Table};
pub use crate::domain::ports::{Fetcher, TableSink};
pub use crate::utils::error::Result;
