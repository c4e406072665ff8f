//! Reads a previously written output file back for the `stats` command.

use crate::models::FORFEIT_SENTINEL;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutputSummary {
    pub header_rows: usize,
    pub matches: usize,
    pub forfeits: usize,
    /// Match rows per season label, e.g. "2005-06" → 380.
    pub per_season: BTreeMap<String, usize>,
    pub malformed: usize,
}

pub fn summarize(path: &Path) -> Result<OutputSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut summary = OutputSummary::default();

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                summary.malformed += 1;
                continue;
            }
        };

        match (record.get(0), record.get(2)) {
            (Some("season"), _) => summary.header_rows += 1,
            (Some(season), Some(first_field)) => {
                summary.matches += 1;
                *summary.per_season.entry(season.to_string()).or_default() += 1;
                if first_field == FORFEIT_SENTINEL {
                    summary.forfeits += 1;
                }
            }
            _ => summary.malformed += 1,
        }
    }

    debug!("{:?}: {} match rows", path, summary.matches);
    Ok(summary)
}
