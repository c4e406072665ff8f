use crate::models::{match_columns, MatchRow, Season};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

// ── CSV sink ──────────────────────────────────────────────────────────────────

/// Output rows: `[season, round] + MatchRow::record()`, one per match.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl CsvSink<File> {
    /// Open `path` for appending. The header row is written only when the
    /// file is new or empty, so repeated runs never stack headers.
    pub fn open_append(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {:?} for appending", path))?;

        let is_empty = file
            .metadata()
            .with_context(|| format!("Failed to stat {:?}", path))?
            .len()
            == 0;

        let mut sink = Self::new(file);
        if is_empty {
            info!("Writing header to new output file {:?}", path);
            sink.write_header()?;
        } else {
            debug!("Appending to existing output file {:?}", path);
        }
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            rows_written: 0,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.writer
            .write_record(match_columns())
            .context("Failed to write header row")
    }

    pub fn write_match(&mut self, season: &Season, round: u32, row: &MatchRow) -> Result<()> {
        let record = [season.label(), round.to_string()]
            .into_iter()
            .chain(row.record());

        self.writer.write_record(record).with_context(|| {
            let (home, away) = row.teams();
            format!("Failed to write {} round {} {} vs {}", season, round, home, away)
        })?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush output")
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush output: {}", e.error()))
    }
}
