use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::classify::{BadgeColor, PriceRange, Tier};
use crate::normalize::CaseColor;

/// One assembled PC as written to `pc_data.json`. Built once from an accepted detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub url: String,
    pub thumbnail: String,
    pub price: u64,
    pub price_monthly: u64,
    pub installment_months: u32,
    pub price_display: String,
    pub in_stock: bool,
    pub specs: Specs,
    pub categories: Categories,
    pub case_color: CaseColor,
    pub badge: String,
    pub badge_color: BadgeColor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specs {
    pub cpu: String,
    pub cpu_short: String,
    pub gpu: String,
    pub gpu_short: String,
    pub gpu_key: String,
    pub ram: String,
    pub ssd: String,
    pub mainboard: String,
    pub power: String,
    pub case: String,
    pub cooler: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    pub games: BTreeSet<String>,
    pub tier: Tier,
    pub price_range: PriceRange,
    pub usage: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub last_updated: String,
    #[serde(rename = "_note", default)]
    pub note: String,
    pub products: Vec<ProductRecord>,
}

/// A community build photo post, written to `cafe_posts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcasePost {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub date: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseFile {
    pub last_updated: String,
    #[serde(rename = "_note", default)]
    pub note: String,
    pub posts: Vec<ShowcasePost>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal accepted record for persistence and assembler tests.
    pub fn sample_record(id: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("게이밍PC {}", id),
            subtitle: "가성비(FHD) · 범용".into(),
            url: format!("https://www.youngjaecomputer.com/shop/item.php?it_id={}", id),
            thumbnail: String::new(),
            price: 1_290_000,
            price_monthly: 0,
            installment_months: 0,
            price_display: "129만 원".into(),
            in_stock: true,
            specs: Specs {
                cpu: "인텔 코어i5-14세대 14400F".into(),
                gpu: "RTX 4060".into(),
                ..Specs::default()
            },
            categories: Categories {
                games: BTreeSet::new(),
                tier: Tier::Budget,
                price_range: PriceRange::From100To200,
                usage: BTreeSet::new(),
            },
            case_color: CaseColor::Black,
            badge: String::new(),
            badge_color: BadgeColor::Blue,
        }
    }

    #[test]
    fn nested_json_shape() {
        let value = serde_json::to_value(sample_record("1700000001")).unwrap();
        assert_eq!(value["specs"]["gpu"], "RTX 4060");
        assert_eq!(value["categories"]["tier"], "가성비(FHD)");
        assert_eq!(value["categories"]["price_range"], "100~200만 원");
        assert_eq!(value["case_color"], "블랙");
        assert_eq!(value["badge_color"], "blue");
    }
}
