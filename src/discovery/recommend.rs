use tracing::{info, warn};

use super::ids::extract_ids_lenient;
use super::{pause, CategoryHint, DiscoveredIds, Sources};

/// POST an in-stock filter per brand/stream and tag results with the stream's hint.
pub async fn discover(src: &Sources<'_>) -> DiscoveredIds {
    let mut found = DiscoveredIds::default();

    for desc in &src.cfg.recommend_streams {
        let hint = CategoryHint::from(desc);
        match src.http.post_form(&src.cfg.recommend_endpoint, &desc.form).await {
            Ok(page) => {
                let before = found.len();
                for id in extract_ids_lenient(&page.body) {
                    found.insert(id, Some(hint.clone()));
                }
                info!("[recommend] {} -> {} new ids", desc.name, found.len() - before);
            }
            Err(e) => {
                warn!("[recommend] {} failed: {:#}", desc.name, e);
                found.note(format!("recommend stream {}: {:#}", desc.name, e));
            }
        }
        pause(src.cfg.request_delay_ms).await;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::tests::{quick_config, FakeHttp};

    #[tokio::test]
    async fn ids_carry_stream_hint() {
        let cfg = quick_config();
        let http = FakeHttp::default()
            .post("amd", r#"{"items":[{"it_id":"3000000001"}]}"#)
            .post("intel", r#"<li><a href="/shop/item.php?it_id=3000000002">i5</a></li>"#);
        let src = Sources { cfg: &cfg, http: &http, browser: None };

        let found = discover(&src).await;
        assert_eq!(found.len(), 2);
        assert_eq!(found.diagnostics.len(), cfg.recommend_streams.len() - 2);

        let entries = found.into_entries();
        let (id, hint) = &entries[0];
        assert_eq!(id, "3000000002");
        let hint = hint.as_ref().unwrap();
        assert_eq!(hint.name, "인텔 게이밍");
        assert!(hint.default_games.contains("배틀그라운드"));
    }
}
