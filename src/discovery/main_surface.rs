use tracing::{info, warn};

use super::ids::extract_ids;
use super::{DiscoveredIds, Sources};

/// Scan the landing pages for any product id they expose.
pub async fn discover(src: &Sources<'_>) -> DiscoveredIds {
    let mut found = DiscoveredIds::default();

    for url in &src.cfg.landing_pages {
        match src.http.get(url, &[], &[]).await {
            Ok(page) => {
                let ids = extract_ids(&page.body);
                let before = found.len();
                for id in ids {
                    found.insert(id, None);
                }
                info!("[main] {} -> {} new ids", url, found.len() - before);
            }
            Err(e) => {
                warn!("[main] {} failed: {:#}", url, e);
                found.note(format!("landing page {}: {:#}", url, e));
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::tests::{quick_config, FakeHttp};

    #[tokio::test]
    async fn scans_every_landing_page() {
        let mut cfg = quick_config();
        cfg.landing_pages = vec!["https://a.test/".into(), "https://a.test/down".into(), "https://a.test/b".into()];
        let http = FakeHttp::default()
            .page("https://a.test/", r#"<a href="/shop/item.php?it_id=1000000001">x</a>"#)
            .page("https://a.test/b", r#"<img src="/data/item/1000000002/t.jpg"><a href="item.php?it_id=1000000001">"#);
        let src = Sources { cfg: &cfg, http: &http, browser: None };

        let found = discover(&src).await;
        assert_eq!(found.len(), 2);
        assert_eq!(found.diagnostics.len(), 1);
        assert!(found.contains("1000000002"));
    }
}
