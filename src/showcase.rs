//! Community build-photo posts from the store's forum: search API first, the board
//! listing in a browser when the API comes back thin.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{CrawlConfig, ShowcaseConfig};
use crate::discovery::pause;
use crate::model::ShowcasePost;
use crate::normalize::{collapse_ws, contains_ci};
use crate::store::kst_today;
use crate::transport::{Browser, HttpTransport};

static ARTICLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("li.article-board-item, .board-list li, .article-item, tr.article-view").unwrap()
});
static ARTICLE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/articles/']").unwrap());
static TITLE_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".article-board-item-price-info a, .article-title, a.tit").unwrap()
});
static ANY_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static DATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".article-date, .date, time, .createdate").unwrap());
static BODY_IMG_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".se-image-resource, .se_mediaImage, .ContentRenderer img").unwrap()
});

static FULL_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})").unwrap());
static SHORT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[.\-](\d{1,2})").unwrap());

// First hit per pattern, in this order, up to MAX_TAGS.
static TAG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)RTX\s*\d{4}(?:\s+Ti)?(?:\s+Super)?",
        r"(?i)RX\s*\d{4}(?:\s*XTX|\s*XT)?",
        r"(?i)i[3579]-\d{4,5}[A-Z]*",
        r"(?i)(?:라이젠|Ryzen)\s*[3579]\s+\d{4}(?:X3D|X)?",
        r"커스텀\s*수냉",
        r"하이엔드|가성비|퍼포먼스",
        r"배틀그라운드|배그|로스트아크|로아|롤|발로란트|오버워치",
        r"화이트|블랙",
        r"(?i)게이밍|영상편집|AI|딥러닝|워크스테이션",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const MAX_TAGS: usize = 4;
const API_PAGE_SIZE: &str = "20";
const MIN_TITLE_CHARS: usize = 3;
/// Post pages opened to fill in missing thumbnails.
const MAX_THUMBNAIL_LOOKUPS: usize = 10;
const FORUM_ORIGIN: &str = "https://cafe.naver.com";

/// Search API client id/secret, read from `NAVER_CLIENT_ID` / `NAVER_CLIENT_SECRET`.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ApiCredentials {
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("NAVER_CLIENT_ID").ok().filter(|v| !v.is_empty())?;
        let client_secret = std::env::var("NAVER_CLIENT_SECRET").ok().filter(|v| !v.is_empty())?;
        Some(ApiCredentials {
            client_id,
            client_secret,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    cafename: String,
    #[serde(default, rename = "pubDate")]
    pub_date: String,
}

/// Collect, dedup by URL, renumber and cap the showcase posts.
pub async fn collect(
    http: &dyn HttpTransport,
    browser: Option<&dyn Browser>,
    creds: Option<&ApiCredentials>,
    cfg: &CrawlConfig,
) -> Vec<ShowcasePost> {
    let sc = &cfg.showcase;
    let today = kst_today();
    let mut posts: Vec<ShowcasePost> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    match creds {
        Some(creds) => {
            for query in &sc.queries {
                match search(http, sc, creds, query).await {
                    Ok(items) => {
                        info!("[showcase] '{}' -> {} results", query, items.len());
                        push_new(&mut posts, &mut seen, posts_from_api(items, sc, today));
                    }
                    Err(e) => warn!("[showcase] search '{}' failed: {:#}", query, e),
                }
                pause(cfg.request_delay_ms).await;
            }
            info!("[showcase] {} posts via search API", posts.len());
        }
        None => warn!("[showcase] NAVER_CLIENT_ID / NAVER_CLIENT_SECRET not set, skipping search API"),
    }

    if posts.len() < sc.min_api_posts {
        match browser {
            Some(browser) => match board_posts(browser, sc, today).await {
                Ok(found) => {
                    info!("[showcase] {} posts from board listing", found.len());
                    push_new(&mut posts, &mut seen, found);
                    fill_thumbnails(browser, &mut posts, cfg).await;
                }
                Err(e) => warn!("[showcase] board listing failed: {:#}", e),
            },
            None => warn!("[showcase] only {} posts and no browser for the board fallback", posts.len()),
        }
    }

    posts.truncate(sc.max_posts);
    for (i, post) in posts.iter_mut().enumerate() {
        post.id = (i + 1).to_string();
    }
    posts
}

fn push_new(posts: &mut Vec<ShowcasePost>, seen: &mut HashSet<String>, found: Vec<ShowcasePost>) {
    for post in found {
        if seen.insert(post.url.clone()) {
            posts.push(post);
        }
    }
}

async fn search(
    http: &dyn HttpTransport,
    sc: &ShowcaseConfig,
    creds: &ApiCredentials,
    query: &str,
) -> Result<Vec<SearchItem>> {
    let params = [
        ("query".to_string(), query.to_string()),
        ("display".to_string(), API_PAGE_SIZE.to_string()),
        ("start".to_string(), "1".to_string()),
        ("sort".to_string(), "date".to_string()),
    ];
    let headers = [
        ("X-Naver-Client-Id".to_string(), creds.client_id.clone()),
        ("X-Naver-Client-Secret".to_string(), creds.client_secret.clone()),
    ];
    let page = http.get(&sc.search_endpoint, &params, &headers).await?;
    let parsed: SearchResponse =
        serde_json::from_str(&page.body).context("Unexpected search API response")?;
    Ok(parsed.items)
}

fn posts_from_api(items: Vec<SearchItem>, sc: &ShowcaseConfig, today: NaiveDate) -> Vec<ShowcasePost> {
    items
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .filter(|item| {
            item.cafename.is_empty()
                || sc.cafe_name_markers.iter().any(|m| contains_ci(&item.cafename, m))
        })
        .filter_map(|item| {
            let title = strip_markup(&item.title);
            if title.is_empty() {
                return None;
            }
            Some(ShowcasePost {
                id: String::new(),
                tags: tags_from_title(&title),
                title,
                url: item.link,
                thumbnail: String::new(),
                date: pub_date(&item.pub_date, today),
            })
        })
        .collect()
}

/// Title text with `<b>` highlight tags removed and entities decoded.
fn strip_markup(raw: &str) -> String {
    let frag = Html::parse_fragment(raw);
    collapse_ws(&frag.root_element().text().collect::<String>())
}

/// RFC 2822 publication date as `YYYY-MM-DD`, today when unparseable.
fn pub_date(raw: &str, today: NaiveDate) -> String {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.date_naive())
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

/// `2026.02.19`, `2026-2-9` or `02.19` (current year) as `YYYY-MM-DD`; anything else,
/// such as a bare time for today's posts, is today.
pub fn normalize_date(raw: &str, today: NaiveDate) -> String {
    let ymd = |y: i32, m: &str, d: &str| -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m.parse().ok()?, d.parse().ok()?)
    };
    let parsed = if let Some(c) = FULL_DATE_RE.captures(raw) {
        c[1].parse().ok().and_then(|y| ymd(y, &c[2], &c[3]))
    } else if let Some(c) = SHORT_DATE_RE.captures(raw) {
        ymd(today.year(), &c[1], &c[2])
    } else {
        None
    };
    parsed.unwrap_or(today).format("%Y-%m-%d").to_string()
}

pub fn tags_from_title(title: &str) -> Vec<String> {
    TAG_PATTERNS
        .iter()
        .filter_map(|re| re.find(title).map(|m| m.as_str().trim().to_string()))
        .take(MAX_TAGS)
        .collect()
}

fn board_url(sc: &ShowcaseConfig) -> String {
    format!("{}/f-e/cafes/{}/menus/1?viewType=L&page=1", FORUM_ORIGIN, sc.club_id)
}

async fn board_posts(browser: &dyn Browser, sc: &ShowcaseConfig, today: NaiveDate) -> Result<Vec<ShowcasePost>> {
    let url = board_url(sc);
    browser.navigate(&url).await?;
    let html = rendered_content(browser).await?;
    Ok(parse_board(&html, sc, today))
}

/// The forum renders inside the `cafe_main` frame when it has one.
async fn rendered_content(browser: &dyn Browser) -> Result<String> {
    match browser.frame_source("#cafe_main").await {
        Ok(Some(html)) => Ok(html),
        Ok(None) => browser.page_source().await,
        Err(e) => {
            debug!("cafe_main frame unavailable: {:#}", e);
            browser.page_source().await
        }
    }
}

pub fn parse_board(html: &str, sc: &ShowcaseConfig, today: NaiveDate) -> Vec<ShowcasePost> {
    let doc = Html::parse_document(html);
    let mut articles: Vec<ElementRef> = doc.select(&ARTICLE_SEL).collect();
    if articles.is_empty() {
        articles = doc.select(&ARTICLE_LINK_SEL).collect();
    }
    articles
        .into_iter()
        .take(sc.max_posts)
        .filter_map(|article| board_post(article, sc, today))
        .collect()
}

fn board_post(article: ElementRef, sc: &ShowcaseConfig, today: NaiveDate) -> Option<ShowcasePost> {
    let link = if article.value().name() == "a" {
        article
    } else {
        article
            .select(&TITLE_LINK_SEL)
            .next()
            .or_else(|| article.select(&ANY_LINK_SEL).next())?
    };
    let title = collapse_ws(&link.text().collect::<Vec<_>>().join(" "));
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }
    let href = link.value().attr("href").unwrap_or("").trim();
    let url = if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", FORUM_ORIGIN, href)
    } else {
        format!("{}/{}", sc.cafe_url.trim_end_matches('/'), href)
    };
    let thumbnail = article
        .select(&IMG_SEL)
        .next()
        .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
        .unwrap_or("")
        .to_string();
    let date_text = article
        .select(&DATE_SEL)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    Some(ShowcasePost {
        id: String::new(),
        tags: tags_from_title(&title),
        title,
        url,
        thumbnail,
        date: normalize_date(&date_text, today),
    })
}

/// Open posts without a thumbnail and take the first body image.
async fn fill_thumbnails(browser: &dyn Browser, posts: &mut [ShowcasePost], cfg: &CrawlConfig) {
    let mut looked_up = 0usize;
    for post in posts.iter_mut().filter(|p| p.thumbnail.is_empty()) {
        if looked_up >= MAX_THUMBNAIL_LOOKUPS {
            break;
        }
        looked_up += 1;
        if let Err(e) = browser.navigate(&post.url).await {
            debug!("thumbnail lookup for {} failed: {:#}", post.url, e);
            continue;
        }
        match rendered_content(browser).await {
            Ok(html) => {
                if let Some(src) = first_body_image(&html) {
                    post.thumbnail = src;
                }
            }
            Err(e) => debug!("thumbnail lookup for {} failed: {:#}", post.url, e),
        }
        pause(cfg.item_delay_ms).await;
    }
}

fn first_body_image(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let img = doc.select(&BODY_IMG_SEL).next()?;
    let src = img
        .value()
        .attr("src")
        .or_else(|| img.value().attr("data-lazy-src"))?
        .trim();
    (!src.is_empty() && !src.starts_with("data:")).then(|| src.to_string())
}
