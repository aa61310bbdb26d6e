use crate::config::PaginationConfig;
use crate::domain::model::Record;
use crate::domain::ports::Fetcher;
use crate::utils::error::FetchError;
use std::fmt;
use std::time::Duration;

/// Why a pagination loop ended.
#[derive(Debug, Clone)]
pub enum StopReason {
    /// `max_pages` was reached without an early stop.
    PageCap,
    /// A page came back shorter than the expected page size.
    ShortPage,
    /// `data` was absent or empty.
    NoData,
    /// The request failed or the body had an unusable shape.
    Failed(FetchError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PageCap => write!(f, "page cap reached"),
            StopReason::ShortPage => write!(f, "last page reached"),
            StopReason::NoData => write!(f, "no more data"),
            StopReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Records accumulated for one dataset plus how the loop got there.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub pages_requested: usize,
    pub stop_reason: StopReason,
}

pub struct Paginator<F: Fetcher> {
    fetcher: F,
    page_size: usize,
    request_delay: Duration,
}

enum Page {
    /// Object items kept from `data`, plus the server's own item count.
    Records { records: Vec<Record>, served: usize },
    Empty,
}

impl<F: Fetcher> Paginator<F> {
    pub fn new(fetcher: F, page_size: usize, request_delay: Duration) -> Self {
        Self {
            fetcher,
            page_size,
            request_delay,
        }
    }

    pub fn from_config(fetcher: F, config: &PaginationConfig) -> Self {
        Self::new(fetcher, config.page_size, config.request_delay())
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Walks pages `1..=max_pages` and returns everything gathered.
    ///
    /// Never fails: a failed page ends the loop with the records seen so far.
    /// A page shorter than `page_size` is assumed to be the last one; the
    /// server never reports its page size, so a mismatch truncates silently.
    pub async fn extract_all(
        &self,
        base_url: &str,
        filter_params: &[(String, String)],
        max_pages: usize,
    ) -> Extraction {
        let mut records = Vec::new();
        let mut pages_requested = 0;

        for page in 1..=max_pages {
            tracing::info!("📄 Extracting page {} from {}", page, base_url);

            let mut query = filter_params.to_vec();
            query.push(("page".to_string(), page.to_string()));

            pages_requested += 1;
            let (page_records, served) = match self.fetch_page(base_url, &query).await {
                Ok(Page::Records { records, served }) => (records, served),
                Ok(Page::Empty) => {
                    tracing::info!("🚫 No data on page {}, stopping", page);
                    return Extraction {
                        records,
                        pages_requested,
                        stop_reason: StopReason::NoData,
                    };
                }
                Err(e) => {
                    tracing::warn!("❌ Page {} failed: {}", page, e);
                    return Extraction {
                        records,
                        pages_requested,
                        stop_reason: StopReason::Failed(e),
                    };
                }
            };

            let appended = page_records.len();
            records.extend(page_records);
            tracing::info!("   ✅ {} records extracted", appended);

            if served < self.page_size {
                tracing::info!("🏁 Last page reached");
                return Extraction {
                    records,
                    pages_requested,
                    stop_reason: StopReason::ShortPage,
                };
            }

            if page < max_pages && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        if max_pages > 0 {
            tracing::warn!(
                "Page cap of {} reached for {}, results may be truncated",
                max_pages,
                base_url
            );
        }

        Extraction {
            records,
            pages_requested,
            stop_reason: StopReason::PageCap,
        }
    }

    async fn fetch_page(
        &self,
        base_url: &str,
        query: &[(String, String)],
    ) -> Result<Page, FetchError> {
        let body = self.fetcher.fetch(base_url, query).await?;

        // A body without a `data` field, object or not, is the end of the data.
        let data = match body {
            serde_json::Value::Object(mut map) => match map.remove("data") {
                None | Some(serde_json::Value::Null) => return Ok(Page::Empty),
                Some(data) => data,
            },
            other => {
                tracing::debug!("Body is {}, treating as end of data", json_kind(&other));
                return Ok(Page::Empty);
            }
        };

        let items = match data {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(FetchError::malformed(format!(
                    "`data` is {}, not an array",
                    json_kind(&other)
                )))
            }
        };

        if items.is_empty() {
            return Ok(Page::Empty);
        }

        let served = items.len();
        let records: Vec<Record> = items.into_iter().filter_map(Record::from_json).collect();
        if records.len() < served {
            tracing::warn!(
                "Skipped {} non-object items in `data`",
                served - records.len()
            );
        }

        Ok(Page::Records { records, served })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
