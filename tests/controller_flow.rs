//! End-to-end controller scenarios against an in-memory view

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_export_config, harness, harness_with, harness_with_controls, FakeService};
use image::RgbaImage;
use manuscript::capture::{CaptureSnapshot, PageHost, RasterOptions, Rasterizer};
use manuscript::controller::{messages, Key, KeyChord, TransformOutcome};
use manuscript::notebook::PLACEHOLDER_TEXT;
use manuscript::transform::Markup;
use manuscript::view::{Controls, MemoryView, PageContent, PrintWindow, StatusLevel};
use manuscript::Error;

#[tokio::test]
async fn hello_world_is_displayed_and_export_shown() {
    let h = harness(FakeService::echo());
    h.controller.input("Hello world");

    let outcome = h.controller.transform().await.expect("transform");
    assert_eq!(outcome, TransformOutcome::Displayed);

    let doc = h.controller.document();
    assert_eq!(doc.rendered_markup.as_deref(), Some("<p>Hello world</p>"));
    assert!(!doc.is_placeholder);

    let state = h.view.state();
    assert_eq!(state.content, PageContent::Markup("<p>Hello world</p>".into()));
    assert!(state.export_visible);
    assert!(!state.loading);
    assert!(!state.transform_busy);
    let status = state.status.expect("banner");
    assert_eq!(status.level, StatusLevel::Success);
    assert_eq!(status.message, messages::TRANSFORM_OK);
}

#[tokio::test]
async fn empty_input_warns_without_calling_service() {
    let h = harness(FakeService::echo());
    for text in ["", "   \n\t"] {
        h.controller.input(text);
        let err = h.controller.transform().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let status = h.view.state().status.expect("warning");
        assert_eq!(status.level, StatusLevel::Warning);
        assert!(status.message.starts_with("Por favor, digite algum texto"));
    }
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn network_failure_restores_placeholder() {
    let h = harness(FakeService::failing());
    h.controller.input("texto");
    let err = h.controller.transform().await.unwrap_err();
    assert!(err.is_transform_failure());

    let doc = h.controller.document();
    assert!(doc.is_placeholder);
    assert!(doc.rendered_markup.is_none());

    let state = h.view.state();
    assert_eq!(state.content, PageContent::Placeholder(PLACEHOLDER_TEXT.into()));
    assert!(!state.loading);
    assert!(!state.export_visible);
    assert_eq!(state.status.unwrap().level, StatusLevel::Danger);
}

#[tokio::test]
async fn blank_markup_counts_as_failure() {
    let h = harness(FakeService::with(|_| Ok(Markup("   ".into())), |_| 0));
    h.controller.input("texto");
    assert!(matches!(h.controller.transform().await, Err(Error::Protocol(_))));
    assert!(h.controller.document().is_placeholder);
}

#[tokio::test]
async fn success_banner_dismisses_but_danger_persists() {
    let h = harness(FakeService::echo());
    h.controller.input("oi");
    h.controller.transform().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(h.view.state().status.is_none());

    let h = harness(FakeService::failing());
    h.controller.input("oi");
    let _ = h.controller.transform().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.view.state().status.unwrap().level, StatusLevel::Danger);
}

#[tokio::test]
async fn debounce_fires_once_for_last_keystroke() {
    let h = harness(FakeService::echo());
    let first = h.controller.input("O");
    let second = h.controller.input("Ol");
    let last = h.controller.input("Olá ");
    let _ = tokio::join!(first, second, last);

    assert_eq!(h.service.calls(), vec!["Olá".to_string()]);
    assert_eq!(h.controller.document().rendered_markup.as_deref(), Some("<p>Olá</p>"));
}

#[tokio::test]
async fn debounce_skips_unchanged_text() {
    let h = harness(FakeService::echo());
    h.controller.input("mesmo texto").await.unwrap();
    h.controller.input("  mesmo texto  ").await.unwrap();
    assert_eq!(h.service.calls().len(), 1);

    h.controller.input("outro texto").await.unwrap();
    assert_eq!(h.service.calls().len(), 2);
}

#[tokio::test]
async fn ctrl_enter_transforms_immediately() {
    let h = harness(FakeService::echo());
    h.controller.input("atalho");
    let plain = KeyChord { key: Key::Enter, ctrl: false, shift: false };
    assert_eq!(h.controller.key(plain).await.unwrap(), None);
    let chord = KeyChord { key: Key::Enter, ctrl: true, shift: false };
    assert_eq!(h.controller.key(chord).await.unwrap(), Some(TransformOutcome::Displayed));
    assert_eq!(h.service.calls(), vec!["atalho".to_string()]);
}

#[tokio::test]
async fn stale_response_is_discarded() {
    let h = harness(FakeService::with(
        |t| Ok(Markup(format!("<p>{}</p>", t))),
        |t| if t == "lento" { 200 } else { 10 },
    ));

    h.controller.input("lento");
    let slow = {
        let c = Arc::clone(&h.controller);
        tokio::spawn(async move { c.transform().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.controller.input("rapido");
    let fast = h.controller.transform().await.unwrap();
    let slow = slow.await.unwrap().unwrap();

    assert_eq!(fast, TransformOutcome::Displayed);
    assert_eq!(slow, TransformOutcome::Superseded);
    assert_eq!(h.controller.document().rendered_markup.as_deref(), Some("<p>rapido</p>"));
    assert!(!h.view.state().loading);
}

#[tokio::test]
async fn clear_twice_matches_clear_once() {
    let h = harness(FakeService::echo());
    h.controller.input("algo");
    h.controller.transform().await.unwrap();

    h.controller.clear();
    let once = (h.controller.document(), h.view.state().content, h.view.state().export_visible);
    h.controller.clear();
    let twice = (h.controller.document(), h.view.state().content, h.view.state().export_visible);
    assert_eq!(once, twice);
    assert!(once.0.is_placeholder);
    assert!(once.0.raw_text.is_empty());
    assert!(!once.2);
    assert_eq!(h.view.state().input_resets, 2);

    // the dedup marker was reset, so the same text transforms again
    h.controller.input("algo").await.unwrap();
    assert_eq!(h.service.calls().len(), 2);
}

#[tokio::test]
async fn clear_cancels_pending_auto_transform() {
    let h = harness(FakeService::echo());
    let pending = h.controller.input("vai sumir");
    h.controller.clear();
    pending.await.unwrap();
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn export_on_empty_document_creates_no_clone() {
    let h = harness(FakeService::echo());
    let err = h.controller.export().await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(h.controller.pipeline().last_job().is_none());
    assert_eq!(h.host.attached(), 0);
    assert!(h.sink.files().is_empty());
    let status = h.view.state().status.unwrap();
    assert_eq!((status.level, status.message.as_str()), (StatusLevel::Warning, messages::NOTHING_TO_EXPORT));
}

#[tokio::test]
async fn export_writes_png_and_releases_everything() {
    let h = harness(FakeService::echo());
    h.view.set_quality(Some(1));
    h.controller.input("Hello world");
    h.controller.transform().await.unwrap();

    let outcome = h.controller.export().await.expect("export");
    assert!(outcome.filename.starts_with("texto-manuscrito-"));
    assert!(outcome.filename.ends_with(".png"));
    assert_eq!((outcome.width, outcome.height), (794, 600));

    let files = h.sink.files();
    assert_eq!(files.len(), 1);
    assert_eq!(&files[0].1[0..8], b"\x89PNG\r\n\x1a\n");

    assert_eq!(h.host.attached(), 0);
    let state = h.view.state();
    assert!(!state.export_busy);
    assert_eq!(state.status.unwrap().message, messages::EXPORT_OK);
}

struct NeverReady;

impl Rasterizer for NeverReady {
    fn is_ready(&self) -> bool {
        false
    }

    fn rasterize(&self, _: &CaptureSnapshot, _: &RasterOptions) -> manuscript::Result<RgbaImage> {
        unreachable!("never ready")
    }
}

struct Exploding;

impl Rasterizer for Exploding {
    fn rasterize(&self, _: &CaptureSnapshot, _: &RasterOptions) -> manuscript::Result<RgbaImage> {
        Err(Error::Export {
            kind: manuscript::error::ExportErrorKind::Rasterize,
            message: "canvas lost".into(),
        })
    }
}

#[tokio::test]
async fn missing_rasterizer_fails_after_bounded_polling() {
    let h = harness_with(FakeService::echo(), Arc::new(NeverReady), fast_export_config());
    h.controller.input("texto");
    h.controller.transform().await.unwrap();

    let err = h.controller.export().await.unwrap_err();
    assert!(matches!(err, Error::DependencyUnavailable { attempts: 10 }));
    assert!(h.sink.files().is_empty());
    assert_eq!(h.host.attached(), 0);

    let state = h.view.state();
    assert!(!state.export_busy);
    let status = state.status.unwrap();
    assert_eq!((status.level, status.message.as_str()), (StatusLevel::Danger, messages::RASTERIZER_MISSING));
}

#[tokio::test]
async fn rasterizer_failure_still_detaches_container() {
    let h = harness_with(FakeService::echo(), Arc::new(Exploding), fast_export_config());
    h.controller.input("texto");
    h.controller.transform().await.unwrap();

    let err = h.controller.export().await.unwrap_err();
    assert!(matches!(err, Error::Export { .. }));
    assert_eq!(h.controller.pipeline().host().attached(), 0);
    assert!(!h.view.state().export_busy);
    assert!(!h.controller.pipeline().is_busy());
    assert_eq!(h.view.state().status.unwrap().message, messages::EXPORT_FAILED);

    let job = h.controller.pipeline().last_job().unwrap();
    assert_eq!(job.stage, manuscript::capture::ExportStage::Failed);
}

#[tokio::test]
async fn print_opens_encoded_url_then_prints() {
    let h = harness(FakeService::echo());
    h.controller.input("Olá mundo");
    let url = h.controller.print().await.unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:5000/print?text=Ol%C3%A1+mundo");
    assert_eq!(h.view.print_count(), 1);
}

#[tokio::test]
async fn blocked_print_window_is_reported() {
    let h = harness(FakeService::echo());
    h.view.set_block_popups(true);
    h.controller.input("texto");
    assert!(matches!(h.controller.print().await, Err(Error::PopupBlocked)));
    assert_eq!(h.view.print_count(), 0);
    assert_eq!(h.view.state().status.unwrap().message, messages::PRINT_BLOCKED);
}

/// Controls whose quality selector is slow to answer.
struct SlowQuality {
    inner: Arc<MemoryView>,
    delay: Duration,
}

impl Controls for SlowQuality {
    fn set_transform_busy(&self, busy: bool) {
        self.inner.set_transform_busy(busy)
    }
    fn set_export_visible(&self, visible: bool) {
        self.inner.set_export_visible(visible)
    }
    fn set_export_busy(&self, busy: bool) {
        self.inner.set_export_busy(busy)
    }
    fn reset_input(&self) {
        self.inner.reset_input()
    }
    fn image_quality(&self) -> Option<u32> {
        std::thread::sleep(self.delay);
        self.inner.image_quality()
    }
    fn open_window(&self, url: &url::Url) -> Option<Arc<dyn PrintWindow>> {
        self.inner.open_window(url)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_export_keeps_control_disabled() {
    let export = manuscript::ExportConfig {
        layout_settle_ms: 400,
        ..fast_export_config()
    };
    let h = harness_with_controls(
        FakeService::echo(),
        Arc::new(manuscript::rendering::raster::PixmapRasterizer::new()),
        export,
        |inner| {
            Arc::new(SlowQuality {
                inner,
                delay: Duration::from_millis(100),
            }) as Arc<dyn Controls>
        },
    );
    h.controller.input("texto");
    h.controller.transform().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let a = {
        let c = Arc::clone(&h.controller);
        tokio::spawn(async move { c.export().await })
    };
    let b = {
        let c = Arc::clone(&h.controller);
        tokio::spawn(async move { c.export().await })
    };

    // one export is inside its layout settle delay; the other gave up
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(h.controller.pipeline().is_busy());
    let state = h.view.state();
    assert!(state.export_busy);
    assert_ne!(state.status.map(|s| s.level), Some(StatusLevel::Danger));

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(Error::ExportInProgress))));

    let state = h.view.state();
    assert!(!state.export_busy);
    assert_eq!(state.status.unwrap().message, messages::EXPORT_OK);
    assert!(!state
        .status_history
        .iter()
        .any(|s| s.message == messages::EXPORT_FAILED));
    assert_eq!(h.sink.files().len(), 1);
}
