//! # Capture Module
//!
//! Raw input report capture to JSONL files with rotation.
//!
//! This module handles:
//! - Recording raw input reports with their decoded form, one JSON object per line
//! - Rotating files after a fixed number of records
//! - Retaining only the newest files
//! - Loading captures back and replaying them through a report codec
//!
//! Replay is how an offset table is checked against real hardware: capture
//! with one layout, then replay the same bytes through a candidate layout.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::{DecodeError, Result};
use crate::report::protocol::InputReport;
use crate::report::ReportCodec;

const FILE_PREFIX: &str = "capture_";
const FILE_EXTENSION: &str = "jsonl";

/// One captured input report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub timestamp: DateTime<Utc>,
    /// Report format tag of the codec that produced `report`
    pub format: String,
    pub raw: Vec<u8>,
    pub report: InputReport,
}

impl CaptureRecord {
    /// Record captured now
    pub fn new(format: &str, raw: &[u8], report: InputReport) -> Self {
        Self {
            timestamp: Utc::now(),
            format: format.to_string(),
            raw: raw.to_vec(),
            report,
        }
    }
}

/// Rotating JSONL capture writer
pub struct CaptureWriter {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    sequence: u32,
}

impl std::fmt::Debug for CaptureWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureWriter")
            .field("dir", &self.dir)
            .field("current_path", &self.current_path)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl CaptureWriter {
    /// Create a writer, creating the capture directory if needed
    ///
    /// No file is opened until the first record arrives.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created
    pub fn new(config: &CaptureConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Capturing input reports to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            current: None,
            current_path: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    /// Append one record, rotating first when the current file is full
    pub fn write(&mut self, record: &CaptureRecord) -> Result<()> {
        if self.current.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(file) = self.current.as_mut() {
            serde_json::to_writer(&mut *file, record)?;
            file.write_all(b"\n")?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.current.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.sequence,
            FILE_EXTENSION
        );
        self.sequence = self.sequence.wrapping_add(1);
        let path = self.dir.join(name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened capture file {}", path.display());
        self.current = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest capture files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let files = capture_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        for path in files.iter().take(excess) {
            match fs::remove_file(path) {
                Ok(()) => debug!("Removed old capture file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

impl Drop for CaptureWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush capture file: {}", e);
        }
    }
}

/// Capture files in `dir`, oldest first
fn capture_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let named = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX));
            named && path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
        })
        .collect();
    // Names embed a sortable timestamp and sequence number
    files.sort();
    Ok(files)
}

/// Load records from a capture file, or from every capture file in a directory
///
/// # Errors
///
/// Returns an I/O error for unreadable files and a JSON error for a
/// malformed line
pub fn read_captures<P: AsRef<Path>>(path: P) -> Result<Vec<CaptureRecord>> {
    let path = path.as_ref();
    let files = if path.is_dir() {
        capture_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut records = Vec::new();
    for file in files {
        let reader = BufReader::new(File::open(&file)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
    }
    Ok(records)
}

/// Outcome of replaying captures through a codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub total: usize,
    /// Decoded to exactly the recorded report
    pub decoded: usize,
    /// Buffer length differs from the layout's report size
    pub wrong_size: usize,
    /// Captured under a different report format
    pub format_mismatch: usize,
    /// Decoded, but to a different report than the one recorded
    pub changed: usize,
    /// Rejected for a field value the codec does not accept
    pub invalid: usize,
}

impl ReplaySummary {
    /// Every record of the right format decoded to its recorded report
    pub fn is_clean(&self) -> bool {
        self.decoded + self.format_mismatch == self.total
    }
}

/// Re-decode every captured buffer with `codec` and compare
///
/// Delta time is not compared when the layout has no delta field, since
/// the session derives it from consecutive timestamps.
pub fn replay(records: &[CaptureRecord], codec: &ReportCodec) -> ReplaySummary {
    let derived_delta = codec.input_layout().delta_time.is_none();
    let mut summary = ReplaySummary {
        total: records.len(),
        ..ReplaySummary::default()
    };

    for record in records {
        if record.format != codec.format_id() {
            summary.format_mismatch += 1;
            continue;
        }

        match codec.decode(&record.raw) {
            Ok(mut report) => {
                if derived_delta {
                    report.delta_time = record.report.delta_time;
                }
                if report == record.report {
                    summary.decoded += 1;
                } else {
                    summary.changed += 1;
                }
            }
            Err(DecodeError::WrongSize { .. }) => summary.wrong_size += 1,
            Err(_) => summary.invalid += 1,
        }
    }

    info!(
        "Replayed {} records: {} decoded, {} changed, {} wrong size, {} format mismatch, {} invalid",
        summary.total,
        summary.decoded,
        summary.changed,
        summary.wrong_size,
        summary.format_mismatch,
        summary.invalid
    );
    summary
}
