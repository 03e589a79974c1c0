mod assembler;
mod classify;
mod config;
mod discovery;
mod metrics;
mod model;
mod normalize;
mod parser;
mod showcase;
mod store;
mod transport;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::warn;

use assembler::Assembler;
use config::CrawlConfig;
use discovery::{CategoryHint, Sources};
use parser::detail::{parse_detail, DetailPage};
use store::WriteOutcome;
use transport::chrome::ChromeBrowser;
use transport::http::ReqwestTransport;
use transport::Browser;

#[derive(Parser)]
#[command(name = "pc_catalog", about = "PC catalog and build-showcase crawler")]
struct Cli {
    /// JSON file overriding any subset of the built-in crawl settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory for pc_data.json and cafe_posts.json
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover item ids, parse every detail page and write the catalog
    Products {
        /// Skip the browser-driven category pagination sweep
        #[arg(long)]
        no_browser: bool,
        /// Max detail pages to parse (default: all discovered)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Collect forum build-photo posts and write the showcase file
    Showcase {
        /// Search API only, no board-listing fallback
        #[arg(long)]
        no_browser: bool,
    },
    /// Print catalog quality counts as JSON
    Metrics,
    /// Run the detail parser on a saved page
    Parse {
        /// Saved detail page HTML
        file: PathBuf,
        /// Item id the page was fetched for
        #[arg(long)]
        id: String,
        /// Category or recommend stream name whose hint to apply
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut cfg = CrawlConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.out_dir {
        cfg.data_dir = dir;
    }

    let result = match cli.command {
        Commands::Products { no_browser, limit } => {
            let http = ReqwestTransport::new(&cfg)?;
            let chrome = if no_browser { None } else { launch_browser(&cfg) };
            let src = Sources {
                cfg: &cfg,
                http: &http,
                browser: chrome.as_ref().map(|c| c as &dyn Browser),
            };

            let mut asm = Assembler::new(src, limit);
            tokio::select! {
                _ = asm.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted; writing the records accepted so far");
                }
            }
            let s = asm.summary();
            let records = asm.into_records();
            println!(
                "Discovered {} ids, parsed {} ({} accepted, {} rejected, {} failed).",
                s.discovered, s.attempted, s.accepted, s.rejected, s.failed
            );

            let path = cfg.products_path();
            match store::write_catalog(&path, records)? {
                WriteOutcome::Written(n) => println!("Saved {} products to {}", n, path.display()),
                WriteOutcome::KeptPrevious => match store::read_catalog(&path)? {
                    Some(prev) => println!(
                        "Nothing collected; kept previous catalog ({} products, {})",
                        prev.products.len(),
                        prev.last_updated
                    ),
                    None => println!("Nothing collected and no previous catalog."),
                },
            }
            Ok(())
        }
        Commands::Showcase { no_browser } => {
            let http = ReqwestTransport::new(&cfg)?;
            let chrome = if no_browser { None } else { launch_browser(&cfg) };
            let creds = showcase::ApiCredentials::from_env();
            let posts = showcase::collect(
                &http,
                chrome.as_ref().map(|c| c as &dyn Browser),
                creds.as_ref(),
                &cfg,
            )
            .await;

            let path = cfg.showcase_path();
            match store::write_showcase(&path, posts)? {
                WriteOutcome::Written(n) => println!("Saved {} posts to {}", n, path.display()),
                WriteOutcome::KeptPrevious => println!("No posts collected; showcase file left as is."),
            }
            Ok(())
        }
        Commands::Metrics => {
            let report = metrics::check_catalog(&cfg.products_path(), &cfg.sold_out_keywords)?;
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
        Commands::Parse { file, id, category } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let hint = match category {
                Some(name) => Some(find_hint(&cfg, &name)?),
                None => None,
            };
            let url = cfg.item_url(&id);
            let page = DetailPage {
                requested_id: &id,
                final_url: &url,
                html: &html,
            };
            match parse_detail(&page, hint.as_ref(), &cfg) {
                Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                Err(rejection) => println!("Rejected: {}", rejection),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// The browser is optional: without it only the pagination sweep and the forum board
/// fallback are lost.
fn launch_browser(cfg: &CrawlConfig) -> Option<ChromeBrowser> {
    match ChromeBrowser::launch(cfg) {
        Ok(chrome) => Some(chrome),
        Err(e) => {
            warn!("Chrome unavailable, continuing without a browser: {:#}", e);
            None
        }
    }
}

fn find_hint(cfg: &CrawlConfig, name: &str) -> anyhow::Result<CategoryHint> {
    if let Some(target) = cfg.categories.iter().find(|c| c.name == name) {
        return Ok(CategoryHint::from(target));
    }
    if let Some(desc) = cfg.recommend_streams.iter().find(|d| d.name == name) {
        return Ok(CategoryHint::from(desc));
    }
    bail!("Unknown category {:?}", name)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
