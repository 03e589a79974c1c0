use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Quality counts over a persisted catalog. Read-only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub count: usize,
    /// Records whose name carries a sold-out keyword.
    pub sold: usize,
    /// Records with an empty cpu or gpu spec.
    pub missing: usize,
}

/// Counts for the catalog at `path`; a missing file reports all zeros. Fields absent
/// from a record count as empty.
pub fn check_catalog(path: &Path, sold_out_keywords: &[String]) -> Result<QualityReport> {
    if !path.exists() {
        return Ok(QualityReport::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: Value =
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let products = data
        .get("products")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let keywords: Vec<String> = sold_out_keywords.iter().map(|k| k.to_lowercase()).collect();
    let sold = products
        .iter()
        .filter(|p| {
            let name = text_at(p, &["name"]).to_lowercase();
            keywords.iter().any(|k| name.contains(k.as_str()))
        })
        .count();
    let missing = products
        .iter()
        .filter(|p| {
            text_at(p, &["specs", "cpu"]).trim().is_empty()
                || text_at(p, &["specs", "gpu"]).trim().is_empty()
        })
        .count();

    Ok(QualityReport {
        count: products.len(),
        sold,
        missing,
    })
}

fn text_at<'v>(value: &'v Value, path: &[&str]) -> &'v str {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
        .unwrap_or("")
}
