use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::config::CrawlConfig;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"item\.php\?(?:[^\s<>]*?&(?:amp;)?)?it_id=(\d{6,})").unwrap()
});
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/data/item/(\d{6,})/").unwrap());
static CLICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"onclick\s*=\s*(?:"[^"]*?\b(\d{6,})\b|'[^']*?\b(\d{6,})\b)"#).unwrap()
});
static JSON_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""it_id"\s*:\s*"?(\d{6,})"#).unwrap());
static CATEGORY_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='list.php?ca_id=']").unwrap());

/// Ids from product links, item image paths and inline click handlers, in page order.
pub fn extract_ids(html: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = Vec::new();
    for caps in LINK_RE.captures_iter(html) {
        hits.push((caps.get(0).map_or(0, |m| m.start()), caps[1].to_string()));
    }
    for caps in IMAGE_RE.captures_iter(html) {
        hits.push((caps.get(0).map_or(0, |m| m.start()), caps[1].to_string()));
    }
    for caps in CLICK_RE.captures_iter(html) {
        if let Some(id) = caps.get(1).or_else(|| caps.get(2)) {
            hits.push((id.start(), id.as_str().to_string()));
        }
    }
    hits.sort_by_key(|(pos, _)| *pos);
    dedup(hits.into_iter().map(|(_, id)| id))
}

/// Ids from JSON payloads (`"it_id": "..."`) plus anything `extract_ids` finds.
pub fn extract_ids_lenient(body: &str) -> Vec<String> {
    let unescaped = body.replace("\\/", "/");
    let json_ids = JSON_ID_RE
        .captures_iter(&unescaped)
        .map(|c| c[1].to_string())
        .collect::<Vec<_>>();
    dedup(json_ids.into_iter().chain(extract_ids(&unescaped)))
}

/// Ids from product links in a rendered listing.
pub fn ids_from_dom(html: &str) -> Vec<String> {
    dedup(LINK_RE.captures_iter(html).map(|c| c[1].to_string()))
}

/// Ids from item thumbnail requests in a browser resource log.
pub fn ids_from_network_log(urls: &[String]) -> Vec<String> {
    dedup(
        urls.iter()
            .filter_map(|u| IMAGE_RE.captures(u).map(|c| c[1].to_string())),
    )
}

/// The `it_id` query value of a detail URL.
pub fn id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "it_id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Category listing links on a page, absolutized, without any `page` parameter.
pub fn category_links(html: &str, cfg: &CrawlConfig) -> Vec<String> {
    let doc = Html::parse_document(html);
    let links = doc
        .select(&CATEGORY_LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.replace("&amp;", "&"))
        .filter_map(|href| strip_page_param(&cfg.absolutize(&href)));
    dedup(links)
}

/// `base` with its `page` query parameter set to `page`.
pub fn page_url(base: &str, page: usize) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != "page")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter())
                .append_pair("page", &page.to_string());
            url.to_string()
        }
        Err(_) => format!("{}&page={}", base, page),
    }
}

fn strip_page_param(link: &str) -> Option<String> {
    let mut url = Url::parse(link).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut().clear().extend_pairs(kept.iter());
    Some(url.to_string())
}

fn dedup(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_shapes_in_page_order() {
        let html = r#"
            <a href="/shop/item.php?it_id=1700000001">A</a>
            <img src="/data/item/1700000002/thumb-abc_300x300.jpg">
            <div onclick="item_view('1700000003')">C</div>
            <a href="./item.php?ca_id=h0&amp;it_id=1700000004">D</a>
            <a href="/shop/item.php?it_id=1700000001">A again</a>
        "#;
        assert_eq!(
            extract_ids(html),
            vec!["1700000001", "1700000002", "1700000003", "1700000004"]
        );
    }

    #[test]
    fn short_numbers_ignored() {
        assert!(extract_ids(r#"<div onclick="go(12)">x</div><a href="item.php?it_id=42">"#).is_empty());
    }

    #[test]
    fn lenient_reads_json() {
        let body = r#"{"list":[{"it_id":"1711111111","img":"\/data\/item\/1722222222\/a.jpg"}]}"#;
        assert_eq!(extract_ids_lenient(body), vec!["1711111111", "1722222222"]);
    }

    #[test]
    fn network_log_only_item_images() {
        let log = vec![
            "https://www.youngjaecomputer.com/data/item/1733333333/thumb-x.jpg".to_string(),
            "https://www.youngjaecomputer.com/js/app.js".to_string(),
            "https://www.youngjaecomputer.com/data/item/1733333333/thumb-y.jpg".to_string(),
        ];
        assert_eq!(ids_from_network_log(&log), vec!["1733333333"]);
    }

    #[test]
    fn id_from_detail_url() {
        assert_eq!(
            id_from_url("https://x.com/shop/item.php?ca_id=h0&it_id=1744444444").as_deref(),
            Some("1744444444")
        );
        assert_eq!(id_from_url("https://x.com/shop/"), None);
        assert_eq!(id_from_url("not a url"), None);
    }

    #[test]
    fn page_url_replaces_page() {
        let url = page_url("https://x.com/shop/list.php?ca_id=h0&page=3", 4);
        assert_eq!(url, "https://x.com/shop/list.php?ca_id=h0&page=4");
    }

    #[test]
    fn category_links_normalized() {
        let cfg = CrawlConfig::default();
        let html = r#"<a href="/shop/list.php?ca_id=h010&amp;page=2">a</a>
                      <a href="./list.php?ca_id=h010">b</a>
                      <a href="/shop/item.php?it_id=1755555555">c</a>"#;
        assert_eq!(
            category_links(html, &cfg),
            vec!["https://www.youngjaecomputer.com/shop/list.php?ca_id=h010"]
        );
    }
}
