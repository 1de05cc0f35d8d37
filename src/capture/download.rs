/// Delivery of exported images.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::ExportErrorKind;
use crate::rendering::ImageBlob;
use crate::{Error, Result};

/// `texto-manuscrito-YYYY-MM-DD.png`
pub fn export_filename(date: NaiveDate) -> String {
    format!("texto-manuscrito-{}.png", date.format("%Y-%m-%d"))
}

/// A short-lived link between a filename and the encoded bytes. It borrows
/// the blob, so it cannot outlive the export that created it.
#[derive(Debug, Clone, Copy)]
pub struct DownloadAnchor<'a> {
    pub filename: &'a str,
    pub blob: &'a ImageBlob,
}

pub trait DownloadSink: Send + Sync {
    fn deliver(&self, anchor: &DownloadAnchor<'_>) -> Result<()>;
}

/// Writes downloads into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, anchor: &DownloadAnchor<'_>) -> Result<()> {
        let path = self.dir.join(anchor.filename);
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(&path, &anchor.blob.png_data))
            .map_err(|e| {
                Error::export(
                    ExportErrorKind::Download,
                    format!("could not write {}: {}", path.display(), e),
                )
            })?;
        log::info!("saved {}", path.display());
        Ok(())
    }
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, anchor: &DownloadAnchor<'_>) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|e| Error::export(ExportErrorKind::Download, e.to_string()))?;
        files.push((anchor.filename.to_string(), anchor.blob.png_data.clone()));
        Ok(())
    }
}
