use std::collections::{HashSet, VecDeque};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::ids::{category_links, ids_from_dom, ids_from_network_log, page_url};
use super::{pause, CategoryHint, DiscoveredIds};
use crate::config::CrawlConfig;
use crate::transport::Browser;

/// Category links are followed this many hops away from the configured targets.
const MAX_HOPS: usize = 2;
/// Consecutive pages without a new id that end a category.
const MAX_IDLE_PAGES: usize = 2;
/// Upper bound on categories picked up by following links.
const MAX_DYNAMIC_CATEGORIES: usize = 40;

struct CategoryJob {
    url: String,
    hint: Option<CategoryHint>,
    depth: usize,
}

/// Page through every category listing in the browser, collecting ids from both the
/// resource log and the rendered DOM.
pub async fn discover(cfg: &CrawlConfig, browser: &dyn Browser) -> DiscoveredIds {
    let mut found = DiscoveredIds::default();
    let mut queued: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<CategoryJob> = VecDeque::new();
    let mut dynamic = 0usize;

    for target in &cfg.categories {
        if queued.insert(target.url.clone()) {
            queue.push_back(CategoryJob {
                url: target.url.clone(),
                hint: Some(CategoryHint::from(target)),
                depth: 0,
            });
        }
    }

    while let Some(job) = queue.pop_front() {
        let label = job
            .hint
            .as_ref()
            .map(|h| h.name.clone())
            .unwrap_or_else(|| job.url.clone());

        let links = sweep_category(cfg, browser, &job, &label, &mut found).await;

        if job.depth < MAX_HOPS {
            for link in links {
                if dynamic >= MAX_DYNAMIC_CATEGORIES {
                    break;
                }
                if queued.insert(link.clone()) {
                    dynamic += 1;
                    debug!("[pages] queued linked category {} (hop {})", link, job.depth + 1);
                    queue.push_back(CategoryJob {
                        url: link,
                        hint: None,
                        depth: job.depth + 1,
                    });
                }
            }
        }
        pause(cfg.request_delay_ms).await;
    }

    info!("[pages] {} ids across {} categories", found.len(), queued.len());
    found
}

/// Load successive pages of one category until the id cap or two idle pages.
/// Returns the category links seen on the first page.
async fn sweep_category(
    cfg: &CrawlConfig,
    browser: &dyn Browser,
    job: &CategoryJob,
    label: &str,
    found: &mut DiscoveredIds,
) -> Vec<String> {
    let mut in_category: HashSet<String> = HashSet::new();
    let mut idle = 0usize;
    let mut links = Vec::new();

    for page in 1..=cfg.max_pages_per_category {
        if in_category.len() >= cfg.max_ids_per_category {
            break;
        }
        let url = page_url(&job.url, page);
        let (ids, dom) = match load_listing(browser, &url).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("[pages] {} page {} failed: {:#}", label, page, e);
                found.note(format!("category {} page {}: {:#}", label, page, e));
                break;
            }
        };
        if page == 1 && job.depth < MAX_HOPS {
            links = category_links(&dom, cfg);
        }

        let before = in_category.len();
        for id in ids {
            if in_category.len() >= cfg.max_ids_per_category {
                break;
            }
            if in_category.insert(id.clone()) {
                found.insert(id, job.hint.clone());
            }
        }

        if in_category.len() == before {
            idle += 1;
            if idle >= MAX_IDLE_PAGES {
                break;
            }
        } else {
            idle = 0;
        }
        pause(cfg.request_delay_ms).await;
    }

    info!("[pages] {} -> {} ids", label, in_category.len());
    links
}

async fn load_listing(browser: &dyn Browser, url: &str) -> Result<(Vec<String>, String)> {
    browser.navigate(url).await?;
    let log = browser.network_log().await.unwrap_or_else(|e| {
        debug!("resource log unavailable for {}: {:#}", url, e);
        Vec::new()
    });
    let dom = browser.page_source().await?;

    let mut ids = ids_from_network_log(&log);
    for id in ids_from_dom(&dom) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok((ids, dom))
}
