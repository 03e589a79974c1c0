use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EOK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)억(?:(\d+)만)?").unwrap());
static MAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)만").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// Order matters: the bare model-number rules at the end would shadow the branded ones.
static CPU_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"AMD\s*라이젠\s*[3579](?:\s*-\s*\d+세대)?\s+\d{4,5}[A-Z0-9]*",
        r"인텔\s*코어\s*(?:울트라\s*[579]|i[3579])(?:\s*-\s*\d+세대)?[\s-]*\d{3,5}[A-Z]*",
        r"(?i)Ryzen\s+[3579]\s+\d{4,5}[A-Z0-9]*",
        r"(?i)Core\s+Ultra\s+[579]\s+\d{3}[A-Z]*",
        r"i[3579]-\d{4,5}[A-Z]*",
        r"R[3579]\s+\d{4}[A-Z0-9]*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static GPU_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)RTX\s*\d{4}(?:\s*Ti)?(?:\s*Super)?",
        r"(?i)RX\s*\d{4}(?:\s*(?:XTX|XT|GRE))?",
        r"(?i)GTX\s*\d{3,4}(?:\s*Ti)?(?:\s*Super)?",
        r"(?i)Arc\s*[AB]\d{3}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static GPU_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(RTX|GTX|RX)\s*(\d{3,4})\s*(TI)?\s*(SUPER)?\s*(XTX|XT|GRE)?").unwrap()
});

const SHORT_NAME_FALLBACK_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseColor {
    #[serde(rename = "화이트")]
    White,
    #[serde(rename = "블랙")]
    Black,
}

/// Parse a Korean price string into won.
///
/// "2,159,000원" -> 2159000, "215만원" -> 2150000, "1억 2000만원" -> 120000000.
/// The 만/억 forms win over bare digits so "215만" never reads as 215.
pub fn parse_price(text: &str) -> u64 {
    let compact: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if let Some(caps) = EOK_RE.captures(&compact) {
        let eok: u64 = caps[1].parse().unwrap_or(0);
        let man: u64 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        return eok * 100_000_000 + man * 10_000;
    }
    if let Some(caps) = MAN_RE.captures(&compact) {
        let man: f64 = caps[1].parse().unwrap_or(0.0);
        return (man * 10_000.0).round() as u64;
    }
    DIGITS_RE
        .find(&compact)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// "215만 원", "1억 원", "1억 20만 원"; the sub-만 remainder is dropped.
pub fn format_price_display(won: u64) -> String {
    if won == 0 {
        return "가격 문의".to_string();
    }
    let man = won / 10_000;
    if man >= 10_000 {
        let eok = man / 10_000;
        let rest = man % 10_000;
        if rest == 0 {
            return format!("{}억 원", eok);
        }
        return format!("{}억 {}만 원", eok, rest);
    }
    format!("{}만 원", man)
}

/// Floor to the nearest 10,000 won.
pub fn floor_man(won: u64) -> u64 {
    won / 10_000 * 10_000
}

/// "89000" -> "89,000"
pub fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Core model name from a long part description, e.g. "RTX 4070 Ti" out of a vendor SKU line.
pub fn short_name(full: &str, kind: ComponentKind) -> String {
    let full = full.trim();
    if full.is_empty() {
        return String::new();
    }
    let rules = match kind {
        ComponentKind::Cpu => &*CPU_RULES,
        ComponentKind::Gpu => &*GPU_RULES,
    };
    for rule in rules {
        if let Some(m) = rule.find(full) {
            return collapse_ws(m.as_str());
        }
    }
    truncate_chars(full, SHORT_NAME_FALLBACK_CHARS)
}

/// Canonical GPU key for cross-referencing FPS tables: "rtx4070  ti super" -> "RTX 4070 Ti Super".
pub fn gpu_key(short_gpu: &str) -> String {
    let cleaned = collapse_ws(short_gpu);
    let Some(caps) = GPU_KEY_RE.captures(&cleaned) else {
        return cleaned;
    };
    let mut key = format!("{} {}", caps[1].to_uppercase(), &caps[2]);
    if caps.get(3).is_some() {
        key.push_str(" Ti");
    }
    if caps.get(4).is_some() {
        key.push_str(" Super");
    }
    if let Some(suffix) = caps.get(5) {
        key.push(' ');
        key.push_str(&suffix.as_str().to_uppercase());
    }
    key
}

/// One-sided detector: white on a keyword hit, black otherwise.
pub fn detect_case_color(text: &str, white_keywords: &[String]) -> CaseColor {
    if white_keywords.iter().any(|kw| text.contains(kw.as_str())) {
        CaseColor::White
    } else {
        CaseColor::Black
    }
}

pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s.trim(), " ").to_string()
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim().to_string()
}

/// Case-insensitive substring test.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Like [`contains_ci`], but a Latin keyword must not run into neighbouring Latin letters
/// or digits, so "AI" does not match "AIO" or "AIR". Hangul next to it is fine.
pub fn contains_keyword(haystack: &str, needle: &str) -> bool {
    if !needle.is_ascii() {
        return contains_ci(haystack, needle);
    }
    let hay = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let joined = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    hay.match_indices(&needle).any(|(i, _)| {
        !joined(hay[..i].chars().next_back()) && !joined(hay[i + needle.len()..].chars().next())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_comma_won() {
        assert_eq!(parse_price("2,159,000원"), 2_159_000);
    }

    #[test]
    fn price_man_unit() {
        assert_eq!(parse_price("215만원"), 2_150_000);
        assert_eq!(parse_price("1.5만"), 15_000);
    }

    #[test]
    fn price_eok_unit() {
        assert_eq!(parse_price("1억 2,000만원"), 120_000_000);
        assert_eq!(parse_price("2억"), 200_000_000);
    }

    #[test]
    fn price_garbage_is_zero() {
        assert_eq!(parse_price("가격문의"), 0);
        assert_eq!(parse_price(""), 0);
    }

    #[test]
    fn display_tiers() {
        assert_eq!(format_price_display(2_159_000), "215만 원");
        assert_eq!(format_price_display(100_000_000), "1억 원");
        assert_eq!(format_price_display(120_500_000), "1억 2050만 원");
        assert_eq!(format_price_display(0), "가격 문의");
    }

    #[test]
    fn display_stable_under_reformatting() {
        let variants = ["2,159,000원", "2159000원", " 2 159 000 원 ", "2,159,000"];
        let shown: Vec<String> = variants
            .iter()
            .map(|v| format_price_display(parse_price(v)))
            .collect();
        assert!(shown.iter().all(|s| s == "215만 원"), "{:?}", shown);
    }

    #[test]
    fn floor_and_thousands() {
        assert_eq!(floor_man(2_159_900), 2_150_000);
        assert_eq!(with_thousands(89_000), "89,000");
        assert_eq!(with_thousands(1_234_567), "1,234,567");
        assert_eq!(with_thousands(999), "999");
    }

    #[test]
    fn cpu_short_names() {
        assert_eq!(
            short_name("AMD 라이젠7-6세대 9800X3D (그래니트 릿지) (정품)", ComponentKind::Cpu),
            "AMD 라이젠7-6세대 9800X3D"
        );
        assert_eq!(
            short_name("인텔 코어i5-14세대 14400F (랩터레이크 리프레시)", ComponentKind::Cpu),
            "인텔 코어i5-14세대 14400F"
        );
        assert_eq!(short_name("AMD Ryzen 5 7500F 멀티팩", ComponentKind::Cpu), "Ryzen 5 7500F");
        assert_eq!(short_name("Intel i7-14700K BOX", ComponentKind::Cpu), "i7-14700K");
    }

    #[test]
    fn gpu_short_names() {
        assert_eq!(
            short_name("MSI 지포스 RTX 4070 Ti SUPER 게이밍 X 슬림 D6X 16GB", ComponentKind::Gpu),
            "RTX 4070 Ti SUPER"
        );
        assert_eq!(short_name("SAPPHIRE 라데온 RX 7800 XT PULSE", ComponentKind::Gpu), "RX 7800 XT");
        assert_eq!(short_name("이엠텍 GTX 1660 SUPER", ComponentKind::Gpu), "GTX 1660 SUPER");
    }

    #[test]
    fn short_name_fallback_truncates() {
        let s = short_name("내장그래픽 사용 모델입니다 고급형 추가 옵션 선택 가능", ComponentKind::Gpu);
        assert_eq!(s.chars().count(), 20);
        assert_eq!(short_name("   ", ComponentKind::Cpu), "");
    }

    #[test]
    fn gpu_key_is_stable() {
        assert_eq!(gpu_key("RTX 4070 Ti SUPER"), "RTX 4070 Ti Super");
        assert_eq!(gpu_key("rtx4070  ti   super"), "RTX 4070 Ti Super");
        assert_eq!(gpu_key("RX 7900 xtx"), "RX 7900 XTX");
        assert_eq!(gpu_key("RTX 5060"), "RTX 5060");
        assert_eq!(gpu_key("Arc  B580"), "Arc B580");
    }

    #[test]
    fn latin_keyword_needs_boundaries() {
        assert!(contains_keyword("영재 화이트 AI 워크스테이션", "AI"));
        assert!(contains_keyword("AI조립PC 딥러닝", "ai"));
        assert!(!contains_keyword("RTX 4070 Ti AIO 수냉", "AI"));
        assert!(!contains_keyword("쿨러마스터 AIR 케이스", "AI"));
        assert!(contains_keyword("수냉 쿨러 딥러닝용", "딥러닝"));
    }

    #[test]
    fn case_color_is_one_sided() {
        let kws = vec!["화이트".to_string(), "WHITE".to_string()];
        assert_eq!(detect_case_color("NZXT H6 Flow 화이트", &kws), CaseColor::White);
        assert_eq!(detect_case_color("리안리 O11 블랙", &kws), CaseColor::Black);
        assert_eq!(detect_case_color("", &kws), CaseColor::Black);
    }
}
