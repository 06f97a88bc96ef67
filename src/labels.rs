//! # Label Store Module
//!
//! Append-only `labels.csv` living in the working data directory, next to
//! the downloaded pictures. Each line records a correction picked by a user
//! for a picture the classifier got wrong.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub const LABELS_FILE_NAME: &str = "labels.csv";

/// Feedback log plus the picture directory it lives in
#[derive(Debug, Clone)]
pub struct LabelStore {
    data_dir: PathBuf,
}

impl LabelStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn labels_path(&self) -> PathBuf {
        self.data_dir.join(LABELS_FILE_NAME)
    }

    /// Append one record followed by a newline.
    ///
    /// The file is opened and closed on every call.
    pub fn append(&self, record: &str) -> Result<()> {
        let path = self.labels_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open label file {}", path.display()))?;

        file.write_all(format!("{record}\n").as_bytes())
            .with_context(|| format!("Failed to append to label file {}", path.display()))?;

        debug!(path = %path.display(), record = %record, "Label record appended");
        Ok(())
    }

    /// Number of pictures stored in the data directory.
    ///
    /// Counts visible files and leaves one out for the label file itself.
    pub fn processed_count(&self) -> Result<usize> {
        let entries = fs::read_dir(&self.data_dir).with_context(|| {
            format!("Failed to read data directory {}", self.data_dir.display())
        })?;

        let mut visible = 0usize;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && !entry.file_name().to_string_lossy().starts_with('.')
            {
                visible += 1;
            }
        }

        Ok(visible.saturating_sub(1))
    }
}
