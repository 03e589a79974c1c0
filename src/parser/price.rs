use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{floor_man, parse_price};

static SALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"판매\s*가(?:격)?[^0-9]{0,40}([0-9]{1,3}(?:,[0-9]{3})+|[0-9]{6,})\s*원").unwrap()
});
static WON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,3}(?:,[0-9]{3})+|[0-9]{6,})\s*원").unwrap());
static MONTHS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(24|36)\s*개월").unwrap());
static MONTHLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"월\s*(?:납부|납입)\s*(?:금액|금|액)?[^0-9]{0,20}([0-9][0-9,]*)\s*원").unwrap()
});

const MIN_PRICE_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceInfo {
    /// Total price, floored to 10,000 won.
    pub price: u64,
    pub price_monthly: u64,
    /// 0, 24 or 36.
    pub installment_months: u32,
}

impl PriceInfo {
    pub fn is_installment(&self) -> bool {
        self.installment_months > 0
    }
}

/// Price and installment terms from a detail page's title and visible text.
pub fn extract_price(title: &str, text: &str, sale_min: u64) -> PriceInfo {
    let total = sale_price(text, sale_min).unwrap_or_else(|| largest_price(text));
    let price = floor_man(total);

    let monthly_label = MONTHLY_RE
        .captures(text)
        .map(|c| parse_price(&c[1]))
        .filter(|m| *m > 0);

    // Page text mentions card promos ("최대 24개월 무이자") on ordinary listings, so a month
    // count outside the title only counts alongside an explicit monthly amount.
    let months = months_in(title).or_else(|| monthly_label.and_then(|_| months_in(text)));

    let Some(months) = months else {
        return PriceInfo {
            price,
            price_monthly: 0,
            installment_months: 0,
        };
    };
    let monthly = monthly_label.unwrap_or_else(|| total / months as u64);
    PriceInfo {
        price,
        price_monthly: monthly / 100 * 100,
        installment_months: months,
    }
}

fn sale_price(text: &str, sale_min: u64) -> Option<u64> {
    SALE_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|raw| digit_count(raw) >= MIN_PRICE_DIGITS)
        .map(|raw| parse_price(&raw))
        .find(|p| *p >= sale_min)
}

fn largest_price(text: &str) -> u64 {
    WON_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|raw| digit_count(raw) >= MIN_PRICE_DIGITS)
        .map(|raw| parse_price(&raw))
        .max()
        .unwrap_or(0)
}

fn months_in(text: &str) -> Option<u32> {
    MONTHS_RE.captures(text).and_then(|c| c[1].parse().ok())
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_label_wins_over_larger_numbers() {
        let text = "정가 3,200,000원 판매가 : 2,159,000원 적립금 21,590원";
        let info = extract_price("게이밍 PC", text, 100_000);
        assert_eq!(info.price, 2_150_000);
        assert_eq!(info.installment_months, 0);
        assert_eq!(info.price_monthly, 0);
    }

    #[test]
    fn small_sale_label_falls_back_to_largest() {
        let text = "판매가 50,000원 (옵션 추가금) 총 상품금액 1,489,000원 배송비 3,000원";
        assert_eq!(extract_price("PC", text, 100_000).price, 1_480_000);
    }

    #[test]
    fn no_price_is_zero() {
        assert_eq!(extract_price("PC", "가격 문의 바랍니다 3,000원", 100_000).price, 0);
    }

    #[test]
    fn installment_from_title_derives_monthly() {
        let info = extract_price("[24개월 무이자] RTX 4060 PC", "판매가 1,920,000원", 100_000);
        assert_eq!(info.installment_months, 24);
        assert_eq!(info.price_monthly, 80_000);
        assert!(info.is_installment());
    }

    #[test]
    fn installment_monthly_label() {
        let text = "판매가 2,870,000원 36개월 분납 월 납부금액 79,800원";
        let info = extract_price("화이트 PC", text, 100_000);
        assert_eq!(info.installment_months, 36);
        assert_eq!(info.price_monthly, 79_800);
    }

    #[test]
    fn card_promo_is_not_installment() {
        let text = "판매가 1,500,000원 삼성카드 최대 24개월 무이자 할부";
        assert_eq!(extract_price("PC", text, 100_000).installment_months, 0);
    }
}
