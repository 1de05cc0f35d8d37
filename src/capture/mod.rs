//! Capture/export pipeline.
//!
//! An export deep-copies the rendered page into an offscreen container of
//! fixed width, waits for it to lay out, measures it, injects ruling for the
//! measured height, rasterizes it and hands the encoded PNG to a download
//! sink. Each stage is awaited in turn and tracked by an [`ExportJob`]:
//!
//! ```text
//! Idle -> Cloning -> Measuring -> Rasterizing -> Encoding -> Downloaded
//!                 \______________\_____________\__________\-> Failed
//! ```
//!
//! The offscreen container is owned by a [`ContainerGuard`], so it is
//! detached on every exit path.

pub mod download;
pub mod host;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbaImage;

use crate::error::ExportErrorKind;
use crate::notebook::PageNode;
use crate::rendering::layout::{PageLayout, PageMetrics};
use crate::rendering::raster::encode_png;
use crate::rendering::ruling::{compute_ruling, RuleGeometry, RulingStyle, DEFAULT_PITCH_PX, MIN_PAGE_HEIGHT_PX};
use crate::{Error, Result};

pub use download::{export_filename, DirectorySink, DownloadAnchor, DownloadSink, MemorySink};
pub use host::OffscreenHost;

/// Export settings. Defaults follow the notebook page the UI shows.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Fixed export width, independent of any viewport
    pub width: u32,
    pub min_height: u32,
    pub pitch: u32,
    pub background: (u8, u8, u8, u8),
    pub ruling_style: RulingStyle,
    pub metrics: PageMetrics,
    /// Wait after attaching the clone, before measuring
    pub layout_settle_ms: u64,
    /// Wait after injecting ruling, before rasterizing
    pub ruling_settle_ms: u64,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub png_quality: f32,
    pub default_scale: u32,
    pub max_scale: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 794,
            min_height: MIN_PAGE_HEIGHT_PX,
            pitch: DEFAULT_PITCH_PX,
            background: (0xff, 0xff, 0xff, 0xff),
            ruling_style: RulingStyle::MarginLine,
            metrics: PageMetrics::default(),
            layout_settle_ms: 200,
            ruling_settle_ms: 100,
            poll_attempts: 10,
            poll_interval_ms: 100,
            png_quality: 0.95,
            default_scale: 2,
            max_scale: 4,
        }
    }
}

/// Offscreen copy of the page, styled so it cannot affect the visible one.
#[derive(Debug, Clone)]
pub struct ExportContainer {
    pub page: PageNode,
    pub width: u32,
    pub min_height: u32,
    pub background: (u8, u8, u8, u8),
}

/// Laid-out, ruled container content handed to the rasterizer.
#[derive(Debug, Clone)]
pub struct CaptureSnapshot {
    pub layout: PageLayout,
    pub ruling: RuleGeometry,
    pub style: RulingStyle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub scale: u32,
    pub background: (u8, u8, u8, u8),
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

/// Where offscreen containers live while being captured.
pub trait PageHost: Send + Sync {
    fn attach(&self, container: ExportContainer) -> Result<ContainerId>;
    /// Rendered height of the container, `None` when unavailable
    fn measure(&self, id: ContainerId) -> Option<f64>;
    fn inject_ruling(&self, id: ContainerId, ruling: RuleGeometry) -> Result<()>;
    fn snapshot(&self, id: ContainerId) -> Result<CaptureSnapshot>;
    fn detach(&self, id: ContainerId);
    /// Number of containers currently attached
    fn attached(&self) -> usize;
}

/// Turns a captured container into pixels.
pub trait Rasterizer: Send + Sync {
    /// Whether the rasterizer has finished loading
    fn is_ready(&self) -> bool {
        true
    }
    fn rasterize(&self, snapshot: &CaptureSnapshot, opts: &RasterOptions) -> Result<RgbaImage>;
}

/// Detaches its container when dropped.
pub struct ContainerGuard<'a> {
    host: &'a dyn PageHost,
    id: ContainerId,
}

impl<'a> ContainerGuard<'a> {
    pub fn attach(host: &'a dyn PageHost, container: ExportContainer) -> Result<Self> {
        let id = host.attach(container)?;
        Ok(Self { host, id })
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        self.host.detach(self.id);
        log::debug!("detached export container {:?}", self.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    Cloning,
    Measuring,
    Rasterizing,
    Encoding,
    Downloaded,
    Failed,
}

impl ExportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStage::Downloaded | ExportStage::Failed)
    }

    /// Failure kind reported for problems entering this stage
    pub fn error_kind(&self) -> ExportErrorKind {
        match self {
            ExportStage::Idle | ExportStage::Cloning | ExportStage::Failed => ExportErrorKind::Clone,
            ExportStage::Measuring => ExportErrorKind::Measure,
            ExportStage::Rasterizing => ExportErrorKind::Rasterize,
            ExportStage::Encoding => ExportErrorKind::Encode,
            ExportStage::Downloaded => ExportErrorKind::Download,
        }
    }

    fn can_advance_to(&self, next: ExportStage) -> bool {
        use ExportStage::*;
        match (self, next) {
            (Idle, Cloning)
            | (Cloning, Measuring)
            | (Measuring, Rasterizing)
            | (Rasterizing, Encoding)
            | (Encoding, Downloaded) => true,
            (s, Failed) => !s.is_terminal(),
            _ => false,
        }
    }
}

/// One export attempt and the stages it went through.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub id: u64,
    pub stage: ExportStage,
    pub history: Vec<ExportStage>,
    pub error: Option<String>,
}

impl ExportJob {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            stage: ExportStage::Idle,
            history: vec![ExportStage::Idle],
            error: None,
        }
    }

    pub fn advance(&mut self, next: ExportStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(Error::export(
                next.error_kind(),
                format!("illegal export transition {:?} -> {:?}", self.stage, next),
            ));
        }
        log::debug!("export job {}: {:?} -> {:?}", self.id, self.stage, next);
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    fn fail(&mut self, err: &Error) {
        if self.stage.can_advance_to(ExportStage::Failed) {
            self.stage = ExportStage::Failed;
            self.history.push(ExportStage::Failed);
        }
        self.error = Some(err.to_string());
    }
}

/// What a successful export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    pub sha256: String,
}

/// Exclusive hold on a [`CapturePipeline`], released on drop.
///
/// Obtained from [`CapturePipeline::try_begin`] before any UI state is
/// touched, so a caller that loses the race has nothing to undo.
pub struct ExportLease<'a> {
    pipeline: &'a CapturePipeline,
}

impl ExportLease<'_> {
    /// Run one export while holding the pipeline.
    pub async fn export(&self, page: &PageNode, raw_text: &str, scale: u32) -> Result<ExportOutcome> {
        self.pipeline.validate(raw_text, scale)?;
        self.pipeline.run_job(page, scale).await
    }
}

impl Drop for ExportLease<'_> {
    fn drop(&mut self) {
        self.pipeline.busy.store(false, Ordering::SeqCst);
    }
}

pub struct CapturePipeline {
    host: Arc<dyn PageHost>,
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn DownloadSink>,
    config: ExportConfig,
    busy: AtomicBool,
    next_job: AtomicU64,
    last_job: Mutex<Option<ExportJob>>,
}

impl CapturePipeline {
    pub fn new(
        host: Arc<dyn PageHost>,
        rasterizer: Arc<dyn Rasterizer>,
        sink: Arc<dyn DownloadSink>,
        config: ExportConfig,
    ) -> Self {
        Self {
            host,
            rasterizer,
            sink,
            config,
            busy: AtomicBool::new(false),
            next_job: AtomicU64::new(1),
            last_job: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The most recent job, finished or not
    pub fn last_job(&self) -> Option<ExportJob> {
        self.last_job.lock().ok().and_then(|j| j.clone())
    }

    pub fn host(&self) -> &Arc<dyn PageHost> {
        &self.host
    }

    /// Reserve the pipeline, or fail with [`Error::ExportInProgress`].
    pub fn try_begin(&self) -> Result<ExportLease<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(ExportLease { pipeline: self })
    }

    fn validate(&self, raw_text: &str, scale: u32) -> Result<()> {
        if raw_text.trim().is_empty() {
            return Err(Error::Validation("there is no text to export".into()));
        }
        if scale == 0 || scale > self.config.max_scale {
            return Err(Error::Validation(format!(
                "scale must be between 1 and {}, got {}",
                self.config.max_scale, scale
            )));
        }
        Ok(())
    }

    /// Export `page` as a PNG at `scale`.
    ///
    /// Rejects empty `raw_text` before anything is cloned, and rejects a
    /// second call while one is running.
    pub async fn export_document(&self, page: &PageNode, raw_text: &str, scale: u32) -> Result<ExportOutcome> {
        self.validate(raw_text, scale)?;
        let lease = self.try_begin()?;
        lease.export(page, raw_text, scale).await
    }

    async fn run_job(&self, page: &PageNode, scale: u32) -> Result<ExportOutcome> {
        let mut job = ExportJob::new(self.next_job.fetch_add(1, Ordering::SeqCst));
        let result = self.run(&mut job, page, scale).await;
        match &result {
            Ok(outcome) => log::info!(
                "exported {} ({}x{}, {} bytes, sha256 {})",
                outcome.filename,
                outcome.width,
                outcome.height,
                outcome.bytes,
                outcome.sha256
            ),
            Err(e) => {
                log::error!("export job {} failed: {}", job.id, e);
                job.fail(e);
            }
        }
        if let Ok(mut last) = self.last_job.lock() {
            *last = Some(job);
        }
        result
    }

    async fn wait_for_rasterizer(&self) -> Result<()> {
        let mut attempts = 0;
        while !self.rasterizer.is_ready() {
            if attempts >= self.config.poll_attempts {
                return Err(Error::DependencyUnavailable { attempts });
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            attempts += 1;
        }
        Ok(())
    }

    async fn run(&self, job: &mut ExportJob, page: &PageNode, scale: u32) -> Result<ExportOutcome> {
        job.advance(ExportStage::Cloning)?;
        self.wait_for_rasterizer().await?;

        let container = ExportContainer {
            page: page.clone(),
            width: self.config.width,
            min_height: self.config.min_height,
            background: self.config.background,
        };
        let guard = ContainerGuard::attach(self.host.as_ref(), container)?;

        job.advance(ExportStage::Measuring)?;
        tokio::time::sleep(Duration::from_millis(self.config.layout_settle_ms)).await;
        let measured = self.host.measure(guard.id());
        if measured.is_none() {
            log::warn!("container height unavailable, using {}px", self.config.min_height);
        }
        let ruling = compute_ruling(measured, self.config.pitch);
        log::debug!(
            "ruling {} lines for measured height {:?}",
            ruling.line_count(),
            measured
        );
        self.host.inject_ruling(guard.id(), ruling)?;
        tokio::time::sleep(Duration::from_millis(self.config.ruling_settle_ms)).await;

        job.advance(ExportStage::Rasterizing)?;
        let snapshot = self.host.snapshot(guard.id())?;
        let opts = RasterOptions {
            scale,
            background: self.config.background,
            width: self.config.width,
            height: snapshot.height,
        };
        let rasterizer = self.rasterizer.clone();
        let img = tokio::task::spawn_blocking(move || rasterizer.rasterize(&snapshot, &opts))
            .await
            .map_err(|e| Error::export(ExportErrorKind::Rasterize, e.to_string()))??;
        drop(guard);

        job.advance(ExportStage::Encoding)?;
        let quality = self.config.png_quality;
        let blob = tokio::task::spawn_blocking(move || encode_png(&img, quality))
            .await
            .map_err(|e| Error::export(ExportErrorKind::Encode, e.to_string()))??;

        let filename = export_filename(chrono::Utc::now().date_naive());
        self.sink.deliver(&DownloadAnchor {
            filename: &filename,
            blob: &blob,
        })?;
        job.advance(ExportStage::Downloaded)?;

        Ok(ExportOutcome {
            filename,
            width: blob.width,
            height: blob.height,
            bytes: blob.len(),
            sha256: blob.sha256(),
        })
    }
}
