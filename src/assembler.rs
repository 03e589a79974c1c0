use std::collections::HashSet;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::discovery::{self, pause, DiscoveredIds, Sources, Strategy};
use crate::model::ProductRecord;
use crate::parser::fetch_detail;

/// Counters reported at the end of a products run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub discovered: usize,
    pub attempted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Runs the discovery strategies in order and parses each newly seen id once.
pub struct Assembler<'a> {
    src: Sources<'a>,
    limit: Option<usize>,
    attempted: HashSet<String>,
    records: Vec<ProductRecord>,
    summary: RunSummary,
}

impl<'a> Assembler<'a> {
    pub fn new(src: Sources<'a>, limit: Option<usize>) -> Self {
        Assembler {
            src,
            limit,
            attempted: HashSet::new(),
            records: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Every strategy's ids go through the parser before the next strategy starts, so
    /// an id is always attributed to the cheapest surface that exposed it.
    pub async fn run(&mut self) {
        for strategy in Strategy::ORDER {
            if self.limit_reached() {
                info!("Detail limit reached, skipping remaining discovery");
                break;
            }
            let found = discovery::run(strategy, &self.src).await;
            for diag in &found.diagnostics {
                warn!("[{}] {}", strategy.name(), diag);
            }
            info!("[{}] discovered {} ids", strategy.name(), found.len());
            self.summary.discovered += found.len();
            self.consume(strategy, found).await;
        }
    }

    async fn consume(&mut self, strategy: Strategy, found: DiscoveredIds) {
        let fresh: Vec<_> = found
            .into_entries()
            .into_iter()
            .filter(|(id, _)| !self.attempted.contains(id))
            .collect();
        if fresh.is_empty() {
            return;
        }

        let pb = ProgressBar::new(fresh.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(strategy.name());

        for (id, hint) in fresh {
            if self.limit_reached() {
                break;
            }
            self.attempted.insert(id.clone());
            self.summary.attempted += 1;

            match fetch_detail(self.src.http, self.src.cfg, &id, hint.as_ref()).await {
                Ok(record) => {
                    debug!("accepted {} {} ({})", id, record.name, record.price_display);
                    self.records.push(record);
                    self.summary.accepted += 1;
                }
                Err(rejection) if rejection.is_transport() => {
                    warn!("[{}] {} abandoned: {}", strategy.name(), id, rejection);
                    self.summary.failed += 1;
                }
                Err(rejection) => {
                    debug!("[{}] {} skipped: {}", strategy.name(), id, rejection);
                    self.summary.rejected += 1;
                }
            }
            pb.inc(1);
            pause(self.src.cfg.item_delay_ms).await;
        }
        pb.finish_and_clear();
        info!(
            "[{}] {} records so far ({} attempted)",
            strategy.name(),
            self.records.len(),
            self.summary.attempted
        );
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.summary.attempted >= limit)
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Accepted records in first-acceptance order.
    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}
