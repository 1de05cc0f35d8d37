//! Manuscript
//!
//! Renders free-form text as a simulated handwritten notebook page and
//! exports that page as a PNG whose ruling matches the rendered content.
//!
//! # Pipeline
//!
//! - [`transform`]: sends text to the handwriting service and returns markup
//! - [`notebook`]: owns the page document (markup or placeholder)
//! - [`rendering::ruling`]: rule geometry computed from the measured page height
//! - [`capture`]: clone → measure → rasterize → encode → download
//! - [`controller`]: debounced auto-transform, status banners, export and print
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use manuscript::{capture::MemorySink, view::MemoryView, NotebookConfig};
//!
//! # async fn run() -> manuscript::Result<()> {
//! let view = MemoryView::new();
//! let sink = Arc::new(MemorySink::new());
//! let controller = manuscript::new_controller(NotebookConfig::default(), view.view(), sink)?;
//!
//! controller.input("Hello world").await.ok();
//! controller.transform().await?;
//! let outcome = controller.export().await?;
//! println!("saved {}", outcome.filename);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod controller;
pub mod error;
pub mod notebook;
pub mod print;
pub mod rendering;
pub mod transform;
pub mod view;

pub use capture::{CapturePipeline, ExportConfig, ExportOutcome};
pub use controller::{ControllerConfig, UiController};
pub use error::{Error, Result};
pub use notebook::{Document, NotebookRenderer};
pub use rendering::ruling::{compute_ruling, RuleGeometry, RulingStyle};
pub use transform::{TransformConfig, TransformService};

/// Configuration for the whole notebook pipeline
///
/// # Examples
///
/// ```
/// let cfg = manuscript::NotebookConfig::default();
/// assert_eq!(cfg.export.width, 794);
/// assert_eq!(cfg.controller.debounce_ms, 1000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NotebookConfig {
    pub transform: TransformConfig,
    pub export: ExportConfig,
    pub controller: ControllerConfig,
}

impl NotebookConfig {
    pub fn validate(&self) -> Result<()> {
        self.transform.base_url()?;
        let e = &self.export;
        if e.width == 0 {
            return Err(Error::Config("export width must be positive".into()));
        }
        if e.pitch == 0 {
            return Err(Error::Config("ruling pitch must be positive".into()));
        }
        if e.metrics.line_height != e.pitch {
            return Err(Error::Config(format!(
                "line height ({}) must match ruling pitch ({})",
                e.metrics.line_height, e.pitch
            )));
        }
        if e.max_scale == 0 || e.default_scale == 0 || e.default_scale > e.max_scale {
            return Err(Error::Config(format!(
                "default scale {} must be within 1..={}",
                e.default_scale, e.max_scale
            )));
        }
        if !(0.0..=1.0).contains(&e.png_quality) {
            return Err(Error::Config(format!(
                "png quality {} must be within 0..=1",
                e.png_quality
            )));
        }
        Ok(())
    }
}

/// Build a controller wired to the HTTP transform service, the offscreen
/// host and the built-in rasterizer.
#[cfg(feature = "http")]
pub fn new_controller(
    config: NotebookConfig,
    view: view::View,
    sink: std::sync::Arc<dyn capture::DownloadSink>,
) -> Result<std::sync::Arc<UiController>> {
    use std::sync::Arc;

    config.validate()?;
    let client = transform::HttpTransformClient::new(&config.transform)?;
    let pipeline = CapturePipeline::new(
        Arc::new(capture::OffscreenHost::new(config.export.metrics)),
        Arc::new(rendering::raster::PixmapRasterizer::new()),
        sink,
        config.export.clone(),
    );
    Ok(UiController::new(
        view,
        Arc::new(client),
        pipeline,
        config.transform,
        config.controller,
    ))
}
