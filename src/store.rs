use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{Catalog, ProductRecord, ShowcaseFile, ShowcasePost};

static KST: LazyLock<FixedOffset> = LazyLock::new(|| FixedOffset::east_opt(9 * 3600).unwrap());

const CATALOG_NOTE: &str = "이 파일은 pc_catalog products 명령으로 자동 생성됩니다.";
const SHOWCASE_NOTE: &str = "이 파일은 pc_catalog showcase 명령으로 자동 갱신됩니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(usize),
    /// Nothing was collected; whatever file was there is untouched.
    KeptPrevious,
}

/// Current time as ISO-8601 with the fixed +09:00 offset.
pub fn kst_now() -> String {
    Utc::now()
        .with_timezone(&*KST)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn kst_today() -> NaiveDate {
    Utc::now().with_timezone(&*KST).date_naive()
}

/// Serialize to a sibling temp file, then rename over the target.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

/// Persist the run's records, unless there are none.
pub fn write_catalog(path: &Path, products: Vec<ProductRecord>) -> Result<WriteOutcome> {
    if products.is_empty() {
        return Ok(keep_previous(path, "catalog"));
    }
    let count = products.len();
    let catalog = Catalog {
        last_updated: kst_now(),
        note: CATALOG_NOTE.into(),
        products,
    };
    write_json_atomic(path, &catalog)?;
    info!("Wrote {} products to {}", count, path.display());
    Ok(WriteOutcome::Written(count))
}

pub fn read_catalog(path: &Path) -> Result<Option<Catalog>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let catalog = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid catalog {}", path.display()))?;
    Ok(Some(catalog))
}

pub fn write_showcase(path: &Path, posts: Vec<ShowcasePost>) -> Result<WriteOutcome> {
    if posts.is_empty() {
        return Ok(keep_previous(path, "showcase"));
    }
    let count = posts.len();
    let file = ShowcaseFile {
        last_updated: kst_now(),
        note: SHOWCASE_NOTE.into(),
        posts,
    };
    write_json_atomic(path, &file)?;
    info!("Wrote {} showcase posts to {}", count, path.display());
    Ok(WriteOutcome::Written(count))
}

fn keep_previous(path: &Path, what: &str) -> WriteOutcome {
    if path.exists() {
        warn!("Zero {} entries collected; keeping previous {}", what, path.display());
    } else {
        warn!("Zero {} entries collected and no previous {} to keep", what, path.display());
    }
    WriteOutcome::KeptPrevious
}
