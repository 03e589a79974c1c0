use tracing::{info, warn};

use super::ids::extract_ids;
use super::{pause, DiscoveredIds, Sources};

/// Sweep the known installment promotion listings.
pub async fn discover(src: &Sources<'_>) -> DiscoveredIds {
    let mut found = DiscoveredIds::default();

    for code in &src.cfg.installment_codes {
        let url = src.cfg.installment_code_url(code);
        match src.http.get(&url, &[], &[]).await {
            Ok(page) => {
                let before = found.len();
                for id in extract_ids(&page.body) {
                    found.insert(id, None);
                }
                info!("[codes] {} -> {} new ids", code, found.len() - before);
            }
            Err(e) => {
                warn!("[codes] {} failed: {:#}", code, e);
                found.note(format!("installment code {}: {:#}", code, e));
            }
        }
        pause(src.cfg.request_delay_ms).await;
    }
    found
}
