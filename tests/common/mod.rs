#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use manuscript::capture::{CapturePipeline, DownloadSink, MemorySink, OffscreenHost, PageHost, Rasterizer};
use manuscript::rendering::raster::PixmapRasterizer;
use manuscript::transform::{Markup, NonEmptyText};
use manuscript::view::{Controls, MemoryView, View};
use manuscript::{ControllerConfig, Error, ExportConfig, Result, TransformConfig, TransformService, UiController};

type Responder = Box<dyn Fn(&str) -> Result<Markup> + Send + Sync>;
type Delay = Box<dyn Fn(&str) -> u64 + Send + Sync>;

/// Transform service double that records every call.
pub struct FakeService {
    calls: Mutex<Vec<String>>,
    respond: Responder,
    delay_ms: Delay,
}

impl FakeService {
    pub fn echo() -> Arc<Self> {
        Self::with(|t| Ok(Markup(format!("<p>{}</p>", t))), |_| 0)
    }

    pub fn failing() -> Arc<Self> {
        Self::with(|_| Err(Error::Network("connection refused".into())), |_| 0)
    }

    pub fn with(
        respond: impl Fn(&str) -> Result<Markup> + Send + Sync + 'static,
        delay_ms: impl Fn(&str) -> u64 + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay_ms: Box::new(delay_ms),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransformService for FakeService {
    async fn submit(&self, text: &NonEmptyText) -> Result<Markup> {
        self.calls.lock().unwrap().push(text.as_str().to_string());
        let delay = (self.delay_ms)(text.as_str());
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        (self.respond)(text.as_str())
    }
}

pub fn fast_export_config() -> ExportConfig {
    ExportConfig {
        layout_settle_ms: 5,
        ruling_settle_ms: 5,
        poll_interval_ms: 5,
        ..Default::default()
    }
}

pub fn fast_controller_config() -> ControllerConfig {
    ControllerConfig {
        debounce_ms: 40,
        success_dismiss_ms: 60,
        print_settle_ms: 5,
    }
}

pub struct Harness {
    pub view: Arc<MemoryView>,
    pub sink: Arc<MemorySink>,
    pub host: Arc<OffscreenHost>,
    pub service: Arc<FakeService>,
    pub controller: Arc<UiController>,
}

pub fn harness(service: Arc<FakeService>) -> Harness {
    harness_with(service, Arc::new(PixmapRasterizer::new()), fast_export_config())
}

pub fn harness_with(
    service: Arc<FakeService>,
    rasterizer: Arc<dyn Rasterizer>,
    export: ExportConfig,
) -> Harness {
    harness_with_controls(service, rasterizer, export, |view| view as Arc<dyn Controls>)
}

/// Like [`harness_with`], with the controls wrapped by `controls`.
pub fn harness_with_controls(
    service: Arc<FakeService>,
    rasterizer: Arc<dyn Rasterizer>,
    export: ExportConfig,
    controls: impl FnOnce(Arc<MemoryView>) -> Arc<dyn Controls>,
) -> Harness {
    let view = MemoryView::new();
    let sink = Arc::new(MemorySink::new());
    let host = Arc::new(OffscreenHost::new(export.metrics));
    let pipeline = CapturePipeline::new(
        host.clone() as Arc<dyn PageHost>,
        rasterizer,
        sink.clone() as Arc<dyn DownloadSink>,
        export,
    );
    let ui = View {
        controls: controls(view.clone()),
        ..view.view()
    };
    let controller = UiController::new(
        ui,
        service.clone(),
        pipeline,
        TransformConfig::default(),
        fast_controller_config(),
    );
    Harness {
        view,
        sink,
        host,
        service,
        controller,
    }
}
