//! CSV export downloads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Feedback,
    Suggestions,
}

impl ExportKind {
    pub(crate) fn path(self) -> &'static str {
        match self {
            ExportKind::Feedback => "/admin/feedback/export",
            ExportKind::Suggestions => "/admin/suggestions/export",
        }
    }

    fn stem(self) -> &'static str {
        match self {
            ExportKind::Feedback => "feedback",
            ExportKind::Suggestions => "suggestions",
        }
    }
}

/// A downloaded export: the suggested file name and the body exactly as the
/// backend sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Names the file `<kind>-<YYYY-MM-DD>.csv`.
    pub fn dated(kind: ExportKind, date: NaiveDate, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{}-{}.csv", kind.stem(), date.format("%Y-%m-%d")),
            bytes,
        }
    }

    pub fn today(kind: ExportKind, bytes: Vec<u8>) -> Self {
        Self::dated(kind, Utc::now().date_naive(), bytes)
    }

    /// Writes the bytes verbatim to `dir/<file_name>` and returns the path.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        info!(path = %path.display(), bytes = self.bytes.len(), "saved export");
        Ok(path)
    }
}
