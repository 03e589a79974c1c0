use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classify::Tier;

const BASE_URL: &str = "https://www.youngjaecomputer.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// GPU models that place a build in `tier`. Rules are scanned in list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRule {
    pub tier: Tier,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameKeywords {
    pub game: String,
    pub keywords: Vec<String>,
}

/// Usage label added when any keyword appears in the product name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRule {
    pub usage: String,
    pub keywords: Vec<String>,
}

/// A listing page swept by the paginated strategy, with its classification seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTarget {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub games: Vec<String>,
    #[serde(default)]
    pub usage: Vec<String>,
}

/// Form body posted to the recommendation endpoint for one brand/stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendDescriptor {
    pub name: String,
    pub form: BTreeMap<String, String>,
    #[serde(default)]
    pub games: Vec<String>,
    #[serde(default)]
    pub usage: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    pub club_id: String,
    pub cafe_url: String,
    pub search_endpoint: String,
    pub queries: Vec<String>,
    pub cafe_name_markers: Vec<String>,
    pub max_posts: usize,
    /// Below this many API results the browser board listing is tried.
    pub min_api_posts: usize,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        ShowcaseConfig {
            club_id: "31248285".into(),
            cafe_url: "https://cafe.naver.com/no1yjmod".into(),
            search_endpoint: "https://openapi.naver.com/v1/search/cafearticle.json".into(),
            queries: strings(&["영재컴퓨터 출고", "YJMOD 출고사진", "영재컴퓨터 조립 완성"]),
            cafe_name_markers: strings(&["영재", "YJMOD"]),
            max_posts: 20,
            min_api_posts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub base_url: String,
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub products_file: String,
    pub showcase_file: String,

    pub http_timeout_secs: u64,
    /// Chrome is launched before the HTTP strategies run and sits unused until the sweep,
    /// so its idle cutoff has to outlast a whole run.
    pub browser_idle_timeout_secs: u64,
    /// Pause between listing pages, categories and sweep requests.
    pub request_delay_ms: u64,
    /// Pause between detail page fetches.
    pub item_delay_ms: u64,
    pub detail_retries: u32,
    /// First retry delay; doubles on each further attempt.
    pub retry_backoff_ms: u64,
    pub max_ids_per_category: usize,
    pub max_pages_per_category: usize,

    /// Absolute price floor for every record.
    pub min_price: u64,
    /// Floor for non-installment records.
    pub min_pc_price: u64,
    /// A labelled sale price below this is ignored in favour of the page-wide scan.
    pub sale_price_min: u64,

    pub tiers: Vec<TierRule>,
    pub games: Vec<GameKeywords>,
    pub default_games: Vec<String>,
    pub usage_rules: Vec<UsageRule>,
    pub white_case_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub sold_out_keywords: Vec<String>,
    pub purchase_keywords: Vec<String>,
    pub pc_signal_keywords: Vec<String>,

    pub landing_pages: Vec<String>,
    pub installment_codes: Vec<String>,
    pub recommend_endpoint: String,
    pub recommend_streams: Vec<RecommendDescriptor>,
    pub categories: Vec<CategoryTarget>,

    pub showcase: ShowcaseConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let shop = format!("{}/shop", BASE_URL);
        CrawlConfig {
            base_url: BASE_URL.into(),
            user_agent: USER_AGENT.into(),
            data_dir: PathBuf::from("data"),
            products_file: "pc_data.json".into(),
            showcase_file: "cafe_posts.json".into(),

            http_timeout_secs: 15,
            browser_idle_timeout_secs: 3 * 3600,
            request_delay_ms: 1500,
            item_delay_ms: 800,
            detail_retries: 2,
            retry_backoff_ms: 2000,
            max_ids_per_category: 60,
            max_pages_per_category: 30,

            min_price: 100_000,
            min_pc_price: 500_000,
            sale_price_min: 100_000,

            // High-end first: "RTX 4070 Ti" must not stop at the "RTX 4070" performance entry.
            tiers: vec![
                TierRule {
                    tier: Tier::HighEnd,
                    models: strings(&[
                        "RTX 4070 Ti", "RTX 4070 Ti Super", "RTX 4080", "RTX 4080 Super",
                        "RTX 4090", "RTX 5070 Ti", "RTX 5080", "RTX 5090",
                        "RX 7900 XT", "RX 7900 XTX",
                    ]),
                },
                TierRule {
                    tier: Tier::Performance,
                    models: strings(&[
                        "RTX 4070", "RTX 4070 Super", "RTX 5060 Ti", "RTX 5070",
                        "RX 7800 XT", "RX 9070", "RX 9070 XT",
                    ]),
                },
                TierRule {
                    tier: Tier::Budget,
                    models: strings(&[
                        "RTX 4060", "RTX 4060 Ti", "RTX 5060", "RX 7600", "RX 7700 XT",
                        "GTX 1660", "GTX 1650", "RX 6600", "RX 6700 XT",
                    ]),
                },
            ],
            games: vec![
                game("리그오브레전드", &["롤", "리그오브레전드", "LOL"]),
                game("배틀그라운드", &["배그", "배틀그라운드", "PUBG"]),
                game("로스트아크", &["로아", "로스트아크"]),
                game(
                    "스팀 AAA급 게임",
                    &["AAA", "고사양", "스팀", "사이버펑크", "와일즈", "몬스터헌터"],
                ),
                game("발로란트", &["발로란트", "발로"]),
                game("오버워치2", &["오버워치", "오버워치2"]),
            ],
            default_games: strings(&["리그오브레전드", "배틀그라운드", "로스트아크", "발로란트"]),
            usage_rules: vec![
                UsageRule {
                    usage: "영상편집".into(),
                    keywords: strings(&["영상편집", "4K편집", "프리미어", "다빈치", "편집용"]),
                },
                UsageRule {
                    usage: "AI/딥러닝".into(),
                    keywords: strings(&["AI", "딥러닝", "머신러닝", "워크스테이션"]),
                },
                UsageRule {
                    usage: "사무/디자인".into(),
                    keywords: strings(&["사무", "디자인", "포토샵", "일러스트", "캐드"]),
                },
            ],
            white_case_keywords: strings(&["화이트", "WHITE", "White", "WH"]),
            exclude_keywords: strings(&["중고", "리퍼", "렌탈", "전시"]),
            sold_out_keywords: strings(&["품절", "일시품절", "재고없음", "재고 없음", "sold out", "out of stock"]),
            purchase_keywords: strings(&["구매하기", "바로구매", "장바구니", "주문하기"]),
            pc_signal_keywords: strings(&["조립PC", "조립 PC", "게이밍PC", "게이밍 PC", "본체", "데스크탑", "완본체"]),

            landing_pages: vec![
                BASE_URL.to_string(),
                format!("{}/", shop),
                format!("{}/list.php?ca_id=h0", shop),
            ],
            installment_codes: strings(&["h010", "h020", "h030", "h040", "h050"]),
            recommend_endpoint: format!("{}/ajax.recommend_list.php", shop),
            recommend_streams: vec![
                recommend("인텔 게이밍", "intel", &["배틀그라운드", "로스트아크"], &["게이밍"]),
                recommend("AMD 게이밍", "amd", &["리그오브레전드", "발로란트"], &["게이밍"]),
                recommend("방송용", "stream", &[], &["방송/스트리밍", "게이밍"]),
                recommend("화이트 감성", "white", &[], &[]),
            ],
            categories: vec![
                category(&shop, "FPS게임용", 100, 1, &["배틀그라운드", "발로란트", "리그오브레전드"], &["게이밍"]),
                category(&shop, "RPG게임용", 101, 1, &["로스트아크", "리그오브레전드"], &["게이밍"]),
                category(&shop, "최신AAA게임", 102, 1, &["스팀 AAA급 게임"], &["게이밍"]),
                category(&shop, "영상편집", 200, 2, &[], &["영상편집"]),
                category(&shop, "사무디자인", 201, 2, &[], &["사무/디자인"]),
                category(&shop, "3D모델링", 202, 2, &[], &["3D/모델링"]),
                category(&shop, "AI딥러닝", 300, 3, &[], &["AI/딥러닝"]),
                category(&shop, "리그오브레전드", 400, 4, &["리그오브레전드"], &["게이밍"]),
                category(&shop, "배틀그라운드", 401, 4, &["배틀그라운드"], &["게이밍"]),
                category(&shop, "로스트아크", 402, 4, &["로스트아크"], &["게이밍"]),
            ],

            showcase: ShowcaseConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Built-in defaults, optionally overridden field-by-field from a JSON file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(CrawlConfig::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn shop_url(&self) -> String {
        format!("{}/shop", self.base_url.trim_end_matches('/'))
    }

    pub fn item_url(&self, id: &str) -> String {
        format!("{}/item.php?it_id={}", self.shop_url(), id)
    }

    pub fn installment_code_url(&self, code: &str) -> String {
        format!("{}/list.php?ca_id={}", self.shop_url(), code)
    }

    /// Turn a site-relative href or src into an absolute URL.
    pub fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{}", rest)
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), href)
        } else {
            format!("{}/{}", self.shop_url(), href.trim_start_matches("./"))
        }
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }

    pub fn showcase_path(&self) -> PathBuf {
        self.data_dir.join(&self.showcase_file)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn game(name: &str, keywords: &[&str]) -> GameKeywords {
    GameKeywords {
        game: name.into(),
        keywords: strings(keywords),
    }
}

fn category(shop: &str, name: &str, vi: u32, index: u32, games: &[&str], usage: &[&str]) -> CategoryTarget {
    CategoryTarget {
        name: name.into(),
        url: format!("{}/list.php?ca_id=h0&ca_id_vi={}&ca_id_index={}", shop, vi, index),
        games: strings(games),
        usage: strings(usage),
    }
}

fn recommend(name: &str, stream: &str, games: &[&str], usage: &[&str]) -> RecommendDescriptor {
    let mut form = BTreeMap::new();
    form.insert("stream".to_string(), stream.to_string());
    form.insert("stock".to_string(), "1".to_string());
    RecommendDescriptor {
        name: name.into(),
        form,
        games: strings(games),
        usage: strings(usage),
    }
}
