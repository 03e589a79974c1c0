use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::price::{extract_price, PriceInfo};
use super::specs::{extract_specs, RawSpecTable, SpecSlot};
use super::stock::sold_out_signal;
use super::Rejection;
use crate::classify::{
    assign_badge, classify_price_range, classify_tier, classify_usage, extract_game_tags,
    BadgeFacts, Tier,
};
use crate::config::CrawlConfig;
use crate::discovery::ids::id_from_url;
use crate::discovery::CategoryHint;
use crate::model::{Categories, ProductRecord, Specs};
use crate::normalize::{
    collapse_ws, contains_ci, detect_case_color, format_price_display, gpu_key, short_name,
    truncate_chars, with_thousands, ComponentKind,
};

static TITLE_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["#sit_title", "h2.goods_name", "h1.goods_name", ".it_name", "#goods_name"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static THUMB_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "div.it_img_wrap img",
        ".goods_img img",
        "#goods_thumb img",
        ".main_image img",
        "img.it_thumb",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});
static OG_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_IMAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static OG_DESC_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());

const MAX_NAME_CHARS: usize = 80;
const MIN_NAME_CHARS: usize = 3;

/// Slots whose presence marks a page as a PC build even without a signal word.
const PC_TABLE_SLOTS: [SpecSlot; 4] = [SpecSlot::Cpu, SpecSlot::Gpu, SpecSlot::Ram, SpecSlot::Ssd];

/// A fetched detail page: the id that was asked for, where the request landed, and the body.
pub struct DetailPage<'a> {
    pub requested_id: &'a str,
    pub final_url: &'a str,
    pub html: &'a str,
}

/// Validate one detail page and build its record. Checks run in a fixed order and the
/// first failing one decides the rejection.
pub fn parse_detail(
    page: &DetailPage,
    hint: Option<&CategoryHint>,
    cfg: &CrawlConfig,
) -> Result<ProductRecord, Rejection> {
    match id_from_url(page.final_url) {
        Some(landed) if landed == page.requested_id => {}
        Some(landed) => return Err(Rejection::Redirected(landed)),
        None => return Err(Rejection::Redirected(page.final_url.to_string())),
    }
    if !page.html.contains(page.requested_id) {
        return Err(Rejection::IdentityMismatch);
    }

    let doc = Html::parse_document(page.html);
    let text = visible_text(&doc);

    let name = extract_title(&doc);
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(Rejection::MissingTitle);
    }
    if let Some(kw) = cfg.exclude_keywords.iter().find(|kw| name.contains(kw.as_str())) {
        return Err(Rejection::Excluded(kw.clone()));
    }

    let raw = extract_specs(&doc);
    let has_signal = cfg
        .pc_signal_keywords
        .iter()
        .any(|kw| contains_ci(&name, kw) || contains_ci(&text, kw));
    let has_table = PC_TABLE_SLOTS.iter().any(|slot| raw.contains_key(slot));
    if !has_signal && !has_table {
        return Err(Rejection::NotPc);
    }

    if let Some(signal) = sold_out_signal(&doc, &text, cfg) {
        return Err(Rejection::SoldOut(signal));
    }

    let cpu = slot(&raw, SpecSlot::Cpu);
    let gpu = slot(&raw, SpecSlot::Gpu);
    if cpu.is_empty() {
        return Err(Rejection::MissingSpec("cpu"));
    }
    if gpu.is_empty() {
        return Err(Rejection::MissingSpec("gpu"));
    }

    let price = extract_price(&name, &text, cfg.sale_price_min);
    if price.price < cfg.min_price || (!price.is_installment() && price.price < cfg.min_pc_price) {
        return Err(Rejection::Price(price.price));
    }

    let detail_text = detail_text(&doc, &raw);
    let tier = classify_tier(&gpu, &cfg.tiers);
    let games = extract_game_tags(&name, &detail_text, hint, &text, &cfg.games, &cfg.default_games);
    let usage = classify_usage(&name, hint, tier, &cfg.usage_rules);
    let case = slot(&raw, SpecSlot::Case);
    let case_color = detect_case_color(&format!("{} {}", case, name), &cfg.white_case_keywords);
    let (badge, badge_color) = assign_badge(&BadgeFacts {
        tier,
        price: price.price,
        usage: &usage,
        case_color,
        installment_months: price.installment_months,
    });

    let cpu_short = short_name(&cpu, ComponentKind::Cpu);
    let gpu_short = short_name(&gpu, ComponentKind::Gpu);
    let specs = Specs {
        gpu_key: gpu_key(&gpu_short),
        cpu_short,
        gpu_short,
        ram: slot(&raw, SpecSlot::Ram),
        ssd: slot(&raw, SpecSlot::Ssd),
        mainboard: slot(&raw, SpecSlot::Mainboard),
        power: slot(&raw, SpecSlot::Power),
        cooler: slot(&raw, SpecSlot::Cooler),
        case,
        cpu,
        gpu,
    };

    Ok(ProductRecord {
        id: page.requested_id.to_string(),
        subtitle: subtitle(tier, &games),
        url: cfg.item_url(page.requested_id),
        thumbnail: extract_thumbnail(&doc, cfg),
        price: price.price,
        price_monthly: price.price_monthly,
        installment_months: price.installment_months,
        price_display: price_display(&price),
        in_stock: true,
        specs,
        categories: Categories {
            games,
            tier,
            price_range: classify_price_range(price.price),
            usage,
        },
        case_color,
        badge,
        badge_color,
        name,
    })
}

fn slot(raw: &RawSpecTable, slot: SpecSlot) -> String {
    raw.get(&slot).cloned().unwrap_or_default()
}

/// Text nodes outside script and style blocks, whitespace collapsed.
fn visible_text(doc: &Html) -> String {
    let parts: Vec<&str> = doc
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            let parent = parent.value().as_element()?;
            if matches!(parent.name(), "script" | "style" | "noscript") {
                return None;
            }
            Some(&**text)
        })
        .collect();
    collapse_ws(&parts.join(" "))
}

fn extract_title(doc: &Html) -> String {
    let from_markup = TITLE_SEL.iter().find_map(|sel| {
        let el = doc.select(sel).next()?;
        let text = collapse_ws(&el.text().collect::<Vec<_>>().join(" "));
        (!text.is_empty()).then_some(text)
    });
    let title = from_markup
        .or_else(|| meta_content(doc, &OG_TITLE_SEL))
        .unwrap_or_default();
    truncate_chars(&title, MAX_NAME_CHARS)
}

fn extract_thumbnail(doc: &Html, cfg: &CrawlConfig) -> String {
    let from_gallery = THUMB_SEL.iter().find_map(|sel| {
        doc.select(sel).find_map(|img| {
            let attrs = img.value();
            let src = [attrs.attr("src"), attrs.attr("data-src")]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|s| !s.is_empty() && !s.starts_with("data:"))?;
            Some(cfg.absolutize(src))
        })
    });
    from_gallery
        .or_else(|| meta_content(doc, &OG_IMAGE_SEL).map(|src| cfg.absolutize(&src)))
        .unwrap_or_default()
}

fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    let content = doc.select(sel).next()?.value().attr("content")?.trim();
    (!content.is_empty()).then(|| content.to_string())
}

/// Short description plus every spec value; the keyword scan for game tags runs over this.
fn detail_text(doc: &Html, raw: &RawSpecTable) -> String {
    let mut parts: Vec<String> = meta_content(doc, &OG_DESC_SEL).into_iter().collect();
    parts.extend(raw.values().cloned());
    parts.join(" ")
}

fn subtitle(tier: Tier, games: &BTreeSet<String>) -> String {
    let lead: Vec<&str> = games.iter().take(2).map(String::as_str).collect();
    let games = if lead.is_empty() {
        "범용".to_string()
    } else {
        lead.join(", ")
    };
    format!("{} · {}", tier.label(), games)
}

fn price_display(price: &PriceInfo) -> String {
    if price.is_installment() && price.price_monthly > 0 {
        format!(
            "월 {}원 · {}개월",
            with_thousands(price.price_monthly),
            price.installment_months
        )
    } else {
        format_price_display(price.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{BadgeColor, PriceRange, USAGE_AI, USAGE_GAMING};
    use crate::normalize::CaseColor;

    const GAMING_ID: &str = "1734567890";
    const INSTALLMENT_ID: &str = "1799000024";

    fn fixture(name: &str) -> String {
        let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
        std::fs::read_to_string(&path).unwrap()
    }

    fn parse(id: &str, html: &str) -> Result<ProductRecord, Rejection> {
        let cfg = CrawlConfig::default();
        let url = cfg.item_url(id);
        let page = DetailPage {
            requested_id: id,
            final_url: &url,
            html,
        };
        parse_detail(&page, None, &cfg)
    }

    #[test]
    fn accepts_gaming_build() {
        let rec = parse(GAMING_ID, &fixture("detail_gaming.html")).unwrap();
        assert_eq!(rec.name, "영재컴퓨터 로스트아크 고사양 게이밍PC 라이젠 7500F RTX 4070 Ti");
        assert_eq!(rec.price, 3_190_000);
        assert_eq!(rec.price_display, "319만 원");
        assert_eq!(rec.installment_months, 0);
        assert_eq!(rec.specs.cpu_short, "AMD 라이젠5-5세대 7500F");
        assert_eq!(rec.specs.gpu_short, "RTX 4070 Ti");
        assert_eq!(rec.specs.gpu_key, "RTX 4070 Ti");
        assert_eq!(rec.specs.cooler, "딥쿨 AK400 DIGITAL 블랙");
        assert_eq!(
            rec.thumbnail,
            "https://www.youngjaecomputer.com/data/item/1734567890/thumb.jpg"
        );
        assert_eq!(rec.categories.tier, Tier::HighEnd);
        assert_eq!(rec.categories.price_range, PriceRange::Over300);
        assert!(rec.categories.usage.contains(USAGE_GAMING));
        assert_eq!(rec.case_color, CaseColor::Black);
        assert_eq!(rec.badge, "하이엔드");
        assert_eq!(rec.badge_color, BadgeColor::Gold);
        assert_eq!(rec.subtitle, "하이엔드(4K) · 로스트아크, 발로란트");
    }

    #[test]
    fn aio_cooler_in_name_keeps_tier_badge() {
        let html = fixture("detail_gaming.html").replace("RTX 4070 Ti</h2>", "RTX 4070 Ti AIO 수냉</h2>");
        let rec = parse(GAMING_ID, &html).unwrap();
        assert!(rec.name.ends_with("AIO 수냉"));
        assert!(!rec.categories.usage.contains("AI/딥러닝"));
        assert_eq!(rec.badge, "하이엔드");
    }

    #[test]
    fn frame_rate_callout_adds_game() {
        let rec = parse(GAMING_ID, &fixture("detail_gaming.html")).unwrap();
        let games: Vec<&str> = rec.categories.games.iter().map(String::as_str).collect();
        assert_eq!(games, vec!["로스트아크", "발로란트", "스팀 AAA급 게임"]);
    }

    #[test]
    fn installment_badge_beats_ai() {
        let rec = parse(INSTALLMENT_ID, &fixture("detail_installment.html")).unwrap();
        assert_eq!(rec.installment_months, 24);
        assert_eq!(rec.price, 1_200_000);
        assert_eq!(rec.price_monthly, 50_000);
        assert_eq!(rec.price_display, "월 50,000원 · 24개월");
        assert!(rec.categories.usage.contains(USAGE_AI));
        assert_eq!(rec.badge, "24개월 무이자");
        assert_eq!(rec.badge_color, BadgeColor::Red);
        assert_eq!(rec.case_color, CaseColor::White);
        assert_eq!(rec.categories.tier, Tier::Budget);
    }

    #[test]
    fn redirect_to_other_item() {
        let cfg = CrawlConfig::default();
        let html = fixture("detail_gaming.html");
        let landed = cfg.item_url("1700000001");
        let page = DetailPage {
            requested_id: GAMING_ID,
            final_url: &landed,
            html: &html,
        };
        assert_eq!(
            parse_detail(&page, None, &cfg),
            Err(Rejection::Redirected("1700000001".into()))
        );
    }

    #[test]
    fn redirect_to_listing() {
        let cfg = CrawlConfig::default();
        let html = fixture("detail_gaming.html");
        let page = DetailPage {
            requested_id: GAMING_ID,
            final_url: "https://www.youngjaecomputer.com/shop/list.php?ca_id=h0",
            html: &html,
        };
        assert!(matches!(parse_detail(&page, None, &cfg), Err(Rejection::Redirected(_))));
    }

    #[test]
    fn substituted_content() {
        let html = fixture("detail_gaming.html");
        assert_eq!(parse("1700000002", &html), Err(Rejection::IdentityMismatch));
    }

    #[test]
    fn excluded_keyword() {
        let html = fixture("detail_gaming.html").replace("영재컴퓨터 로스트아크", "[리퍼] 로스트아크");
        assert_eq!(parse(GAMING_ID, &html), Err(Rejection::Excluded("리퍼".into())));
    }

    #[test]
    fn missing_title_ignores_site_title() {
        let html = format!(
            r#"<html><head><title>영재컴퓨터 쇼핑몰</title></head>
               <body><input value="{}"></body></html>"#,
            GAMING_ID
        );
        assert_eq!(parse(GAMING_ID, &html), Err(Rejection::MissingTitle));
    }

    #[test]
    fn monitor_is_not_pc() {
        let html = format!(
            r#"<html><body><h2 id="sit_title">27인치 QHD 모니터 165Hz</h2>
               <input type="hidden" name="it_id" value="{}">
               <p>판매가 329,000원</p><button>바로구매</button></body></html>"#,
            GAMING_ID
        );
        assert_eq!(parse(GAMING_ID, &html), Err(Rejection::NotPc));
    }

    #[test]
    fn sold_out_class() {
        let html = fixture("detail_gaming.html")
            .replace("<body>", r#"<body><div class="sit_soldout"></div>"#);
        assert!(matches!(parse(GAMING_ID, &html), Err(Rejection::SoldOut(_))));
    }

    #[test]
    fn missing_gpu() {
        let html = fixture("detail_gaming.html").replace("<dt>그래픽카드</dt>", "<dt>비고</dt>");
        assert_eq!(parse(GAMING_ID, &html), Err(Rejection::MissingSpec("gpu")));
    }

    #[test]
    fn implausible_price() {
        let html = fixture("detail_gaming.html").replace("3,190,000원", "390,000원");
        assert_eq!(parse(GAMING_ID, &html), Err(Rejection::Price(390_000)));
    }

    #[test]
    fn accepted_records_have_core_specs() {
        for (id, file) in [(GAMING_ID, "detail_gaming.html"), (INSTALLMENT_ID, "detail_installment.html")] {
            let rec = parse(id, &fixture(file)).unwrap();
            assert!(!rec.specs.cpu.is_empty());
            assert!(!rec.specs.gpu.is_empty());
            assert!(rec.price >= CrawlConfig::default().min_price);
            assert!(rec.in_stock);
        }
    }
}
