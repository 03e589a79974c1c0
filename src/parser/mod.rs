pub mod detail;
pub mod price;
pub mod specs;
pub mod stock;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::discovery::CategoryHint;
use crate::model::ProductRecord;
use crate::transport::{FetchedPage, HttpTransport};
use detail::{parse_detail, DetailPage};
use stock::SoldOutSignal;

/// Why an id did not become a catalog record. Only `Fetch` is a failure; the rest are
/// expected outcomes of crawling a storefront full of delisted and non-PC pages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("redirected to {0}")]
    Redirected(String),
    #[error("page does not mention the requested id")]
    IdentityMismatch,
    #[error("title missing or too short")]
    MissingTitle,
    #[error("excluded keyword {0:?}")]
    Excluded(String),
    #[error("not a PC listing")]
    NotPc,
    #[error("sold out ({0})")]
    SoldOut(SoldOutSignal),
    #[error("missing {0} spec")]
    MissingSpec(&'static str),
    #[error("implausible price {0}")]
    Price(u64),
}

impl Rejection {
    pub fn is_transport(&self) -> bool {
        matches!(self, Rejection::Fetch(_))
    }
}

/// Fetch one item page (with bounded retry) and run it through the parser.
pub async fn fetch_detail(
    http: &dyn HttpTransport,
    cfg: &CrawlConfig,
    id: &str,
    hint: Option<&CategoryHint>,
) -> Result<ProductRecord, Rejection> {
    let url = cfg.item_url(id);
    let page = fetch_with_retry(http, cfg, &url)
        .await
        .map_err(|e| Rejection::Fetch(format!("{:#}", e)))?;
    parse_detail(
        &DetailPage {
            requested_id: id,
            final_url: &page.url,
            html: &page.body,
        },
        hint,
        cfg,
    )
}

async fn fetch_with_retry(
    http: &dyn HttpTransport,
    cfg: &CrawlConfig,
    url: &str,
) -> anyhow::Result<FetchedPage> {
    let mut attempt = 0u32;
    loop {
        match http.get(url, &[], &[]).await {
            Ok(page) => {
                debug!("{} -> {} ({})", url, page.url, page.status);
                return Ok(page);
            }
            Err(e) if attempt < cfg.detail_retries => {
                let backoff = Duration::from_millis(cfg.retry_backoff_ms * 2u64.pow(attempt));
                warn!(
                    "Fetch failed for {} (attempt {}/{}): {:#}, backing off {:.1}s",
                    url,
                    attempt + 1,
                    cfg.detail_retries,
                    e,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::tests::{quick_config, FakeHttp};

    #[tokio::test]
    async fn dead_page_is_a_fetch_rejection_after_retries() {
        let cfg = quick_config();
        let http = FakeHttp::default();
        let out = fetch_detail(&http, &cfg, "1700000000", None).await;
        assert!(matches!(out, Err(ref r) if r.is_transport()));
        assert_eq!(http.requested().len(), cfg.detail_retries as usize + 1);
    }

    #[tokio::test]
    async fn redirect_is_structural() {
        let cfg = quick_config();
        let http = FakeHttp::default().redirect(
            &cfg.item_url("1700000000"),
            &cfg.item_url("1700000099"),
            "<html>1700000000</html>",
        );
        let out = fetch_detail(&http, &cfg, "1700000000", None).await;
        assert_eq!(out, Err(Rejection::Redirected("1700000099".into())));
        assert_eq!(http.requested().len(), 1);
    }
}
