use crate::domain::model::Table;
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;

/// Issues one GET request and hands back the decoded JSON body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> std::result::Result<serde_json::Value, FetchError>;
}

/// A destination that fully replaces a named table on every write.
pub trait TableSink {
    /// Short label used in logs and errors.
    fn kind(&self) -> &'static str;

    fn write_table(&mut self, name: &str, table: &Table) -> Result<()>;
}
