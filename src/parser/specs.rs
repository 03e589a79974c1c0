use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::normalize::collapse_ws;

static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dt, div, span, strong, p, li, label").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());
static DEFAULT_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-기본사양-|-기본-|\(기본사양\)").unwrap());

/// Labels longer than this are prose, not spec keys.
const MAX_LABEL_CHARS: usize = 12;
/// Adjacent-block values shorter than this are usually menu entries.
const MIN_BLOCK_VALUE_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecSlot {
    Cpu,
    Gpu,
    Ram,
    Ssd,
    Mainboard,
    Power,
    Case,
    Cooler,
}

pub type RawSpecTable = BTreeMap<SpecSlot, String>;

// "CPU쿨러" must resolve to the cooler, so 쿨러 is checked before CPU.
const LABELS: &[(&str, SpecSlot)] = &[
    ("쿨러", SpecSlot::Cooler),
    ("CPU", SpecSlot::Cpu),
    ("메인보드", SpecSlot::Mainboard),
    ("메모리", SpecSlot::Ram),
    ("RAM", SpecSlot::Ram),
    ("그래픽카드", SpecSlot::Gpu),
    ("VGA", SpecSlot::Gpu),
    ("SSD", SpecSlot::Ssd),
    ("파워", SpecSlot::Power),
    ("케이스", SpecSlot::Case),
];

type Extractor = fn(&Html) -> RawSpecTable;

/// Tried in order; the first value found for a slot is kept.
const EXTRACTORS: &[Extractor] = &[block_pairs, table_rows];

pub fn extract_specs(doc: &Html) -> RawSpecTable {
    let mut merged = RawSpecTable::new();
    for extract in EXTRACTORS {
        for (slot, value) in extract(doc) {
            merged.entry(slot).or_insert(value);
        }
    }
    merged
}

pub fn slot_for_label(label: &str) -> Option<SpecSlot> {
    let label = label.trim().trim_end_matches(':').trim();
    if label.is_empty() || label.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    let upper = label.to_uppercase();
    LABELS
        .iter()
        .find(|(key, _)| upper.contains(*key))
        .map(|(_, slot)| *slot)
}

/// Label element followed by a value element, e.g. `<dt>CPU</dt><dd>...</dd>`.
fn block_pairs(doc: &Html) -> RawSpecTable {
    let mut table = RawSpecTable::new();
    for el in doc.select(&BLOCK_SEL) {
        let Some(slot) = slot_for_label(&element_text(&el)) else {
            continue;
        };
        if table.contains_key(&slot) {
            continue;
        }
        let Some(next) = el.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        let value = clean_value(&element_text(&next));
        if value.chars().count() >= MIN_BLOCK_VALUE_CHARS || value.starts_with('[') {
            table.insert(slot, value);
        }
    }
    table
}

/// `<tr><th>label</th><td>value</td></tr>` rows.
fn table_rows(doc: &Html) -> RawSpecTable {
    let mut table = RawSpecTable::new();
    for row in doc.select(&ROW_SEL) {
        let cells: Vec<ElementRef> = row.select(&CELL_SEL).collect();
        if cells.len() < 2 {
            continue;
        }
        let Some(slot) = slot_for_label(&element_text(&cells[0])) else {
            continue;
        };
        let value = clean_value(&dedupe_doubled(&element_text(&cells[1])));
        if !value.is_empty() {
            table.entry(slot).or_insert(value);
        }
    }
    table
}

fn element_text(el: &ElementRef) -> String {
    collapse_ws(&el.text().collect::<Vec<_>>().join(" "))
}

fn clean_value(raw: &str) -> String {
    let stripped = DEFAULT_MARK_RE.replace_all(raw, "");
    let first = stripped.split("  ").next().unwrap_or("");
    collapse_ws(first)
}

/// "ABC ABC" / "ABCABC" -> "ABC"; the site sometimes renders each cell twice.
pub fn dedupe_doubled(text: &str) -> String {
    let text = text.trim();
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    if n >= 2 && n % 2 == 0 {
        let (a, b) = chars.split_at(n / 2);
        if a == b {
            return a.iter().collect::<String>().trim().to_string();
        }
    }
    if n >= 3 && n % 2 == 1 {
        let mid = n / 2;
        if chars[mid].is_whitespace() && chars[..mid] == chars[mid + 1..] {
            return chars[..mid].iter().collect::<String>().trim().to_string();
        }
    }
    text.to_string()
}
