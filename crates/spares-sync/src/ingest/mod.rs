//! Paginated catalog ingestion
//!
//! [`fetch_all`] walks the upstream catalog page by page until a short or
//! empty page signals the end. Any failure aborts the whole fetch; there is
//! no retry and no partial result.

pub mod client;
pub mod extract;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::IngestionError;
use crate::normalize::RawRecord;

pub use client::HttpCatalogClient;
pub use extract::{extract_records, Envelope, Extracted, EXTRACTION_CHAIN};

/// Something that can serve one page of the upstream catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch page `page` of size `size` and return the decoded payload
    async fn fetch_page(&self, page: u32, size: u32) -> Result<Value, IngestionError>;
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEnd {
    /// A page held fewer records than requested
    ShortPage,
    /// A page after the first held no records
    EmptyPage,
    /// The very first page held no records; the integration is likely misconfigured
    EmptyFirstPage,
}

/// Result of walking the whole catalog
#[derive(Debug)]
pub struct CatalogFetch {
    /// Records in page-fetch order
    pub records: Vec<RawRecord>,
    /// Number of page requests issued
    pub requests: u32,
    pub end: PageEnd,
}

/// Fetch every page of the catalog.
pub async fn fetch_all<S>(source: &S, page_size: u32) -> Result<CatalogFetch, IngestionError>
where
    S: CatalogSource + ?Sized,
{
    let size = page_size.max(1);
    let mut records = Vec::new();
    let mut page = 0u32;
    let mut requests = 0u32;

    let end = loop {
        let payload = source.fetch_page(page, size).await?;
        requests += 1;

        let extracted = extract_records(payload, page)?;
        let count = extracted.records.len();

        if count == 0 {
            if page == 0 {
                warn!(
                    page,
                    "No spares on the first page; check that the integration workflow is \
                     active and the webhook path and upstream URL are correct"
                );
                break PageEnd::EmptyFirstPage;
            }
            debug!(page, "No more spares");
            break PageEnd::EmptyPage;
        }

        debug!(page, count, envelope = ?extracted.envelope, "Fetched page");
        records.extend(extracted.records);

        if count < size as usize {
            break PageEnd::ShortPage;
        }
        page += 1;
    };

    info!(total = records.len(), requests, end = ?end, "Fetched upstream catalog");

    Ok(CatalogFetch {
        records,
        requests,
        end,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves fixed page sizes and counts requests
    struct FixedPages {
        sizes: Vec<usize>,
        calls: AtomicU32,
    }

    impl FixedPages {
        fn new(sizes: &[usize]) -> Self {
            Self {
                sizes: sizes.to_vec(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for FixedPages {
        async fn fetch_page(&self, page: u32, _size: u32) -> Result<Value, IngestionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let count = self.sizes.get(page as usize).copied().unwrap_or(0);
            let items: Vec<Value> = (0..count)
                .map(|i| json!({"spareCode": format!("P{}-{}", page, i)}))
                .collect();
            Ok(json!({ "data": items }))
        }
    }

    struct Failing;

    #[async_trait]
    impl CatalogSource for Failing {
        async fn fetch_page(&self, page: u32, _size: u32) -> Result<Value, IngestionError> {
            Err(IngestionError::Status {
                page,
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_short_page_terminates() {
        let source = FixedPages::new(&[10, 10, 7]);
        let fetch = fetch_all(&source, 10).await.unwrap();

        assert_eq!(fetch.records.len(), 27);
        assert_eq!(fetch.requests, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetch.end, PageEnd::ShortPage);
        assert_eq!(
            fetch.records[10].get("spareCode"),
            Some(&json!("P1-0"))
        );
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let source = FixedPages::new(&[0]);
        let fetch = fetch_all(&source, 10).await.unwrap();

        assert!(fetch.records.is_empty());
        assert_eq!(fetch.requests, 1);
        assert_eq!(fetch.end, PageEnd::EmptyFirstPage);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_trailing_empty_page() {
        let source = FixedPages::new(&[10, 10]);
        let fetch = fetch_all(&source, 10).await.unwrap();

        assert_eq!(fetch.records.len(), 20);
        assert_eq!(fetch.requests, 3);
        assert_eq!(fetch.end, PageEnd::EmptyPage);
    }

    #[tokio::test]
    async fn test_error_aborts_fetch() {
        let err = fetch_all(&Failing, 10).await.unwrap_err();
        assert!(matches!(err, IngestionError::Status { status: 500, .. }));
    }
}
