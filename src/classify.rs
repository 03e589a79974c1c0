use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{GameKeywords, TierRule, UsageRule};
use crate::discovery::CategoryHint;
use crate::normalize::{contains_ci, contains_keyword, CaseColor};

/// Digits followed by an FPS / frame marker: "240 FPS", "144fps", "165프레임".
static FPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d{2,3}\s*(?:fps|프레임)").unwrap());
static GAMING_SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)RTX\s*\d|GTX\s*\d|RX\s*\d{4}|지포스|라데온|게임|게이밍|gaming").unwrap()
});

/// Characters scanned on each side of a frame-rate callout.
const FPS_WINDOW_CHARS: usize = 30;

pub const USAGE_GAMING: &str = "게이밍";
pub const USAGE_AI: &str = "AI/딥러닝";

/// Ordered budget < performance < high-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "가성비(FHD)")]
    Budget,
    #[serde(rename = "퍼포먼스(QHD)")]
    Performance,
    #[serde(rename = "하이엔드(4K)")]
    HighEnd,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Budget => "가성비(FHD)",
            Tier::Performance => "퍼포먼스(QHD)",
            Tier::HighEnd => "하이엔드(4K)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "100만 원 이하")]
    Under100,
    #[serde(rename = "100~200만 원")]
    From100To200,
    #[serde(rename = "200~300만 원")]
    From200To300,
    #[serde(rename = "300만 원 이상")]
    Over300,
}

/// Half-open brackets `[lo, hi)`; the last one has no upper bound.
const PRICE_BRACKETS: &[(u64, Option<u64>, PriceRange)] = &[
    (0, Some(1_000_000), PriceRange::Under100),
    (1_000_000, Some(2_000_000), PriceRange::From100To200),
    (2_000_000, Some(3_000_000), PriceRange::From200To300),
    (3_000_000, None, PriceRange::Over300),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Red,
    Purple,
    Cyan,
    Gold,
    Green,
    Blue,
    White,
}

/// Inputs to the badge decision list.
pub struct BadgeFacts<'a> {
    pub tier: Tier,
    pub price: u64,
    pub usage: &'a BTreeSet<String>,
    pub case_color: CaseColor,
    pub installment_months: u32,
}

type BadgeRule = (fn(&BadgeFacts) -> bool, &'static str, BadgeColor);

// First match wins; labels never combine.
const BADGE_RULES: &[BadgeRule] = &[
    (|f| f.installment_months == 24, "24개월 무이자", BadgeColor::Red),
    (|f| f.installment_months == 36, "36개월 무이자", BadgeColor::Purple),
    (|f| f.usage.contains(USAGE_AI), "AI 전문가용", BadgeColor::Cyan),
    (|f| f.tier == Tier::HighEnd && f.price >= 3_000_000, "하이엔드", BadgeColor::Gold),
    (|f| f.tier == Tier::Budget && f.price <= 1_000_000, "가성비", BadgeColor::Green),
    (|f| f.tier == Tier::Performance, "QHD 추천", BadgeColor::Blue),
    (|f| f.case_color == CaseColor::White, "화이트 감성", BadgeColor::White),
];

/// First tier in table order with a model substring in `gpu`; budget when nothing matches.
pub fn classify_tier(gpu: &str, tiers: &[TierRule]) -> Tier {
    let squashed = squash(gpu);
    if squashed.is_empty() {
        return Tier::Budget;
    }
    tiers
        .iter()
        .find(|rule| rule.models.iter().any(|m| squashed.contains(&squash(m))))
        .map(|rule| rule.tier)
        .unwrap_or(Tier::Budget)
}

pub fn classify_price_range(price: u64) -> PriceRange {
    PRICE_BRACKETS
        .iter()
        .find(|(lo, hi, _)| price >= *lo && hi.map_or(true, |hi| price < hi))
        .map(|(_, _, range)| *range)
        .unwrap_or(PriceRange::Over300)
}

/// Game tags: category seed, keyword hits in name/detail, frame-rate callouts in the page,
/// then the major-title fallback for untagged gaming hardware.
pub fn extract_game_tags(
    name: &str,
    detail_text: &str,
    hint: Option<&CategoryHint>,
    page_text: &str,
    games: &[GameKeywords],
    default_games: &[String],
) -> BTreeSet<String> {
    let mut tags: BTreeSet<String> = hint
        .map(|h| h.default_games.clone())
        .unwrap_or_default();

    let combined = format!("{} {}", name, detail_text);
    for entry in games {
        if entry.keywords.iter().any(|kw| contains_ci(&combined, kw)) {
            tags.insert(entry.game.clone());
        }
    }

    for window in fps_windows(page_text) {
        for entry in games {
            if entry.keywords.iter().any(|kw| contains_ci(&window, kw)) {
                tags.insert(entry.game.clone());
            }
        }
    }

    if tags.is_empty() && GAMING_SIGNAL_RE.is_match(&combined) {
        tags.extend(default_games.iter().cloned());
    }
    tags
}

/// Text surrounding each frame-rate callout.
fn fps_windows(text: &str) -> Vec<String> {
    FPS_RE
        .find_iter(text)
        .map(|m| {
            let before: String = text[..m.start()]
                .chars()
                .rev()
                .take(FPS_WINDOW_CHARS)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let after: String = text[m.end()..].chars().take(FPS_WINDOW_CHARS).collect();
            format!("{}{}{}", before, m.as_str(), after)
        })
        .collect()
}

pub fn classify_usage(
    name: &str,
    hint: Option<&CategoryHint>,
    tier: Tier,
    rules: &[UsageRule],
) -> BTreeSet<String> {
    let mut usage: BTreeSet<String> = hint
        .map(|h| h.default_usage.clone())
        .unwrap_or_default();

    for rule in rules {
        if rule.keywords.iter().any(|kw| contains_keyword(name, kw)) {
            usage.insert(rule.usage.clone());
        }
    }

    if usage.is_empty() || tier >= Tier::Performance {
        usage.insert(USAGE_GAMING.to_string());
    }
    usage
}

/// Badge label and colour; an empty label means no badge.
pub fn assign_badge(facts: &BadgeFacts) -> (String, BadgeColor) {
    BADGE_RULES
        .iter()
        .find(|(pred, _, _)| pred(facts))
        .map(|(_, label, color)| (label.to_string(), *color))
        .unwrap_or((String::new(), BadgeColor::Blue))
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;

    fn hint(games: &[&str], usage: &[&str]) -> CategoryHint {
        CategoryHint {
            name: "test".into(),
            default_games: games.iter().map(|s| s.to_string()).collect(),
            default_usage: usage.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn tier_prefers_high_end_over_prefix() {
        let cfg = CrawlConfig::default();
        assert_eq!(classify_tier("MSI 지포스 RTX 4070 Ti 벤투스 3X", &cfg.tiers), Tier::HighEnd);
        assert_eq!(classify_tier("PALIT RTX 4070 SUPER Dual", &cfg.tiers), Tier::Performance);
        assert_eq!(classify_tier("RTX 5060 Ti 16GB", &cfg.tiers), Tier::Performance);
        assert_eq!(classify_tier("rtx4060 8gb", &cfg.tiers), Tier::Budget);
    }

    #[test]
    fn usage_ignores_aio_cooler() {
        let cfg = CrawlConfig::default();
        let usage = classify_usage(
            "게이밍PC RTX 4070 Ti AIO 수냉",
            None,
            Tier::HighEnd,
            &cfg.usage_rules,
        );
        assert!(!usage.contains(USAGE_AI));
        assert!(usage.contains(USAGE_GAMING));

        let usage = classify_usage("AI 워크스테이션 RTX 4060", None, Tier::Budget, &cfg.usage_rules);
        assert!(usage.contains(USAGE_AI));
    }

    #[test]
    fn tier_defaults_to_budget() {
        let cfg = CrawlConfig::default();
        assert_eq!(classify_tier("", &cfg.tiers), Tier::Budget);
        assert_eq!(classify_tier("내장그래픽", &cfg.tiers), Tier::Budget);
    }

    #[test]
    fn price_brackets_partition() {
        assert_eq!(classify_price_range(0), PriceRange::Under100);
        assert_eq!(classify_price_range(999_999), PriceRange::Under100);
        assert_eq!(classify_price_range(1_000_000), PriceRange::From100To200);
        assert_eq!(classify_price_range(2_999_999), PriceRange::From200To300);
        assert_eq!(classify_price_range(3_000_000), PriceRange::Over300);
        assert_eq!(classify_price_range(u64::MAX), PriceRange::Over300);

        for price in (0..5_000_000u64).step_by(9_999) {
            let hits = PRICE_BRACKETS
                .iter()
                .filter(|(lo, hi, _)| price >= *lo && hi.map_or(true, |hi| price < hi))
                .count();
            assert_eq!(hits, 1, "price {} hit {} brackets", price, hits);
        }
    }

    #[test]
    fn games_from_fps_callout() {
        let cfg = CrawlConfig::default();
        let tags = extract_game_tags(
            "로스트아크 고사양 PC",
            "",
            None,
            "벤치마크 결과 발로란트 240 FPS 달성",
            &cfg.games,
            &cfg.default_games,
        );
        assert!(tags.contains("발로란트"), "{:?}", tags);
        assert!(tags.contains("로스트아크"));
    }

    #[test]
    fn fps_window_is_bounded() {
        let cfg = CrawlConfig::default();
        let far = format!("발로란트{} 240 FPS", " ".repeat(80));
        let tags = extract_game_tags("사무용 PC", "", None, &far, &cfg.games, &cfg.default_games);
        assert!(!tags.contains("발로란트"));
    }

    #[test]
    fn games_keep_hint_seed() {
        let cfg = CrawlConfig::default();
        let h = hint(&["배틀그라운드"], &["게이밍"]);
        let tags = extract_game_tags("오버워치 전용 PC", "", Some(&h), "", &cfg.games, &cfg.default_games);
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["배틀그라운드".to_string(), "오버워치2".to_string()]
        );
    }

    #[test]
    fn games_fallback_for_gaming_hardware() {
        let cfg = CrawlConfig::default();
        let tags = extract_game_tags("프리미엄 PC", "RTX 4070", None, "", &cfg.games, &cfg.default_games);
        assert_eq!(tags.len(), cfg.default_games.len());

        let none = extract_game_tags("사무용 PC", "내장그래픽", None, "", &cfg.games, &cfg.default_games);
        assert!(none.is_empty());
    }

    #[test]
    fn usage_rules() {
        let cfg = CrawlConfig::default();
        let u = classify_usage("영상편집 워크스테이션", None, Tier::Budget, &cfg.usage_rules);
        assert!(u.contains("영상편집"));
        assert!(u.contains(USAGE_AI));
        assert!(!u.contains(USAGE_GAMING));

        let empty = classify_usage("기본 PC", None, Tier::Budget, &cfg.usage_rules);
        assert_eq!(empty.into_iter().collect::<Vec<_>>(), vec![USAGE_GAMING.to_string()]);

        let h = hint(&[], &["사무/디자인"]);
        let perf = classify_usage("기본 PC", Some(&h), Tier::Performance, &cfg.usage_rules);
        assert!(perf.contains("사무/디자인") && perf.contains(USAGE_GAMING));
    }

    #[test]
    fn badge_installment_beats_ai() {
        let usage: BTreeSet<String> = [USAGE_AI.to_string()].into_iter().collect();
        let facts = BadgeFacts {
            tier: Tier::HighEnd,
            price: 4_000_000,
            usage: &usage,
            case_color: CaseColor::White,
            installment_months: 24,
        };
        assert_eq!(assign_badge(&facts), ("24개월 무이자".to_string(), BadgeColor::Red));
    }

    #[test]
    fn badge_order() {
        let none = BTreeSet::new();
        let base = |tier, price, case_color| BadgeFacts {
            tier,
            price,
            usage: &none,
            case_color,
            installment_months: 0,
        };
        assert_eq!(assign_badge(&base(Tier::HighEnd, 3_500_000, CaseColor::White)).0, "하이엔드");
        assert_eq!(assign_badge(&base(Tier::Budget, 900_000, CaseColor::White)).0, "가성비");
        assert_eq!(assign_badge(&base(Tier::Performance, 1_900_000, CaseColor::Black)).0, "QHD 추천");
        assert_eq!(assign_badge(&base(Tier::Budget, 1_500_000, CaseColor::White)).0, "화이트 감성");
        assert_eq!(assign_badge(&base(Tier::HighEnd, 2_500_000, CaseColor::Black)).0, "");
    }
}
