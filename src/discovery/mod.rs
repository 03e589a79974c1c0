//! Item-ID discovery. Each strategy is an independent producer returning the ids it
//! found plus non-fatal diagnostics; nothing here ever fails the run.

pub mod fixed_codes;
pub mod ids;
pub mod main_surface;
pub mod pagination;
pub mod recommend;

use std::collections::{BTreeSet, HashSet};

use crate::config::{CategoryTarget, CrawlConfig, RecommendDescriptor};
use crate::transport::{Browser, HttpTransport};

/// Classification seed attached to an id by the surface it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryHint {
    pub name: String,
    pub default_games: BTreeSet<String>,
    pub default_usage: BTreeSet<String>,
}

impl From<&CategoryTarget> for CategoryHint {
    fn from(target: &CategoryTarget) -> Self {
        CategoryHint {
            name: target.name.clone(),
            default_games: target.games.iter().cloned().collect(),
            default_usage: target.usage.iter().cloned().collect(),
        }
    }
}

impl From<&RecommendDescriptor> for CategoryHint {
    fn from(desc: &RecommendDescriptor) -> Self {
        CategoryHint {
            name: desc.name.clone(),
            default_games: desc.games.iter().cloned().collect(),
            default_usage: desc.usage.iter().cloned().collect(),
        }
    }
}

/// Insertion-ordered, first-writer-wins id set.
#[derive(Debug, Default)]
pub struct DiscoveredIds {
    entries: Vec<(String, Option<CategoryHint>)>,
    seen: HashSet<String>,
    pub diagnostics: Vec<String>,
}

impl DiscoveredIds {
    /// Returns false when the id was already present; the earlier hint is kept.
    pub fn insert(&mut self, id: String, hint: Option<CategoryHint>) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.entries.push((id, hint));
        true
    }

    pub fn note(&mut self, diagnostic: String) {
        self.diagnostics.push(diagnostic);
    }

    /// Fold another strategy's output in behind this one.
    pub fn merge(&mut self, other: DiscoveredIds) {
        for (id, hint) in other.entries {
            self.insert(id, hint);
        }
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, Option<CategoryHint>)> {
        self.entries
    }
}

/// Discovery strategies, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    MainSurface,
    FixedCodes,
    Recommend,
    Pagination,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::MainSurface,
        Strategy::FixedCodes,
        Strategy::Recommend,
        Strategy::Pagination,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::MainSurface => "main-surface",
            Strategy::FixedCodes => "installment-codes",
            Strategy::Recommend => "recommend",
            Strategy::Pagination => "category-pagination",
        }
    }
}

/// Transport handles shared by every strategy for the run.
pub struct Sources<'a> {
    pub cfg: &'a CrawlConfig,
    pub http: &'a dyn HttpTransport,
    pub browser: Option<&'a dyn Browser>,
}

pub async fn run(strategy: Strategy, src: &Sources<'_>) -> DiscoveredIds {
    match strategy {
        Strategy::MainSurface => main_surface::discover(src).await,
        Strategy::FixedCodes => fixed_codes::discover(src).await,
        Strategy::Recommend => recommend::discover(src).await,
        Strategy::Pagination => match src.browser {
            Some(browser) => pagination::discover(src.cfg, browser).await,
            None => {
                let mut skipped = DiscoveredIds::default();
                skipped.note("no browser session, pagination sweep skipped".into());
                skipped
            }
        },
    }
}

pub(crate) async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

// ── Tests ──
