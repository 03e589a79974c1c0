use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::config::CrawlConfig;

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4").unwrap());
static SOLD_OUT_CLASS_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[class*='soldout'], [class*='sold_out'], [class*='sold-out']").unwrap()
});
static PENDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"재고\s*확인\s*중[^0-9]{0,40}[0-9]{1,3}(?:,[0-9]{3})+\s*원").unwrap()
});

/// Characters searched on each side of a sold-out keyword for a purchase button label.
const PURCHASE_WINDOW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoldOutSignal {
    Heading,
    CssClass,
    StockCheckPending,
    Keyword,
}

impl std::fmt::Display for SoldOutSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SoldOutSignal::Heading => "sold-out heading",
            SoldOutSignal::CssClass => "sold-out class",
            SoldOutSignal::StockCheckPending => "stock check pending",
            SoldOutSignal::Keyword => "sold-out keyword without purchase action",
        };
        f.write_str(s)
    }
}

/// First sold-out signal on the page, checked strongest first.
pub fn sold_out_signal(doc: &Html, text: &str, cfg: &CrawlConfig) -> Option<SoldOutSignal> {
    let heading_hit = doc.select(&HEADING_SEL).any(|h| {
        let t = h.text().collect::<String>().to_lowercase();
        t.contains("품절") || t.contains("sold out")
    });
    if heading_hit {
        return Some(SoldOutSignal::Heading);
    }
    if doc.select(&SOLD_OUT_CLASS_SEL).next().is_some() {
        return Some(SoldOutSignal::CssClass);
    }
    if PENDING_RE.is_match(text) {
        return Some(SoldOutSignal::StockCheckPending);
    }
    if keyword_without_purchase(text, cfg) {
        return Some(SoldOutSignal::Keyword);
    }
    None
}

fn keyword_without_purchase(text: &str, cfg: &CrawlConfig) -> bool {
    let lower = text.to_lowercase();
    for kw in &cfg.sold_out_keywords {
        let kw = kw.to_lowercase();
        for (pos, _) in lower.match_indices(&kw) {
            let window = surrounding(&lower, pos, pos + kw.len(), PURCHASE_WINDOW_CHARS);
            let can_buy = cfg
                .purchase_keywords
                .iter()
                .any(|p| window.contains(&p.to_lowercase()));
            if !can_buy {
                return true;
            }
        }
    }
    false
}

fn surrounding(text: &str, start: usize, end: usize, chars: usize) -> String {
    let before: Vec<char> = text[..start].chars().rev().take(chars).collect();
    let after: String = text[end..].chars().take(chars).collect();
    let before: String = before.into_iter().rev().collect();
    format!("{}{}{}", before, &text[start..end], after)
}
