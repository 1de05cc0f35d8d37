//! Wires user intents (type, transform, clear, export, print) to the
//! transform service, the notebook renderer and the capture pipeline.
//!
//! The controller only talks to widgets through the injected [`View`] and
//! only changes the document through [`NotebookRenderer`]. Transform
//! requests carry a sequence number; a response is dropped when a newer
//! request (or a clear) happened while it was in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::capture::{CapturePipeline, ExportOutcome};
use crate::notebook::{Document, NotebookRenderer};
use crate::print::print_url;
use crate::transform::{NonEmptyText, TransformConfig, TransformService};
use crate::view::{Controls, Status, StatusLevel, StatusTarget, View};
use crate::{Error, Result};

pub mod messages {
    pub const EMPTY_INPUT: &str = "Por favor, digite algum texto para transformar.";
    pub const TRANSFORM_OK: &str = "Texto transformado com sucesso!";
    pub const TRANSFORM_FAILED: &str = "Erro ao transformar o texto. Tente novamente.";
    pub const NOTHING_TO_EXPORT: &str = "Não há texto para exportar.";
    pub const EXPORT_OK: &str = "Imagem exportada com sucesso!";
    pub const EXPORT_FAILED: &str = "Erro ao exportar imagem. Tente novamente.";
    pub const RASTERIZER_MISSING: &str = "A biblioteca de captura não carregou. Tente novamente.";
    pub const NOTHING_TO_PRINT: &str = "Não há texto para imprimir.";
    pub const PRINT_BLOCKED: &str = "Não foi possível abrir a janela de impressão.";
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Quiet period after the last keystroke before auto-transforming
    pub debounce_ms: u64,
    /// Success banners disappear after this long
    pub success_dismiss_ms: u64,
    /// Wait between opening the print view and printing it
    pub print_settle_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            success_dismiss_ms: 3000,
            print_settle_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

/// A key press in the text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyChord {
    /// Ctrl+Enter and Shift+Enter submit immediately.
    pub fn submits(&self) -> bool {
        self.key == Key::Enter && (self.ctrl || self.shift)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    Displayed,
    /// A newer request superseded this one; nothing was changed
    Superseded,
}

/// Re-enables the export control when dropped.
struct ExportControlGuard<'a>(&'a dyn Controls);

impl Drop for ExportControlGuard<'_> {
    fn drop(&mut self) {
        self.0.set_export_busy(false);
    }
}

/// Status banner with self-dismissing success messages.
#[derive(Clone)]
struct Banner {
    target: Arc<dyn StatusTarget>,
    generation: Arc<AtomicU64>,
    dismiss_after: Duration,
}

impl Banner {
    fn show(&self, level: StatusLevel, message: &str) {
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.target.show(&Status::new(level, message));
        if level == StatusLevel::Success {
            let this = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(this.dismiss_after).await;
                if this.generation.load(Ordering::SeqCst) == gen {
                    this.target.clear();
                }
            });
        }
    }

    fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.target.clear();
    }
}

pub struct UiController {
    view: View,
    renderer: Mutex<NotebookRenderer>,
    transform: Arc<dyn TransformService>,
    pipeline: CapturePipeline,
    transform_config: TransformConfig,
    config: ControllerConfig,
    banner: Banner,
    latest_request: AtomicU64,
    debounce: AtomicU64,
}

impl UiController {
    pub fn new(
        view: View,
        transform: Arc<dyn TransformService>,
        pipeline: CapturePipeline,
        transform_config: TransformConfig,
        config: ControllerConfig,
    ) -> Arc<Self> {
        let renderer = NotebookRenderer::new(view.render.clone(), pipeline.config().ruling_style);
        let banner = Banner {
            target: view.status.clone(),
            generation: Arc::new(AtomicU64::new(0)),
            dismiss_after: Duration::from_millis(config.success_dismiss_ms),
        };
        view.controls.set_export_visible(false);
        Arc::new(Self {
            view,
            renderer: Mutex::new(renderer),
            transform,
            pipeline,
            transform_config,
            config,
            banner,
            latest_request: AtomicU64::new(0),
            debounce: AtomicU64::new(0),
        })
    }

    fn renderer(&self) -> MutexGuard<'_, NotebookRenderer> {
        self.renderer.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn document(&self) -> Document {
        self.renderer().document().clone()
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    /// Record new input text and schedule a debounced auto-transform.
    ///
    /// Only the last call within the debounce window fires, and only when
    /// the trimmed text differs from the last successfully transformed text.
    pub fn input(self: &Arc<Self>, text: &str) -> tokio::task::JoinHandle<()> {
        self.renderer().record_input(text);
        let gen = self.debounce.fetch_add(1, Ordering::SeqCst) + 1;
        let this = Arc::clone(self);
        let delay = Duration::from_millis(self.config.debounce_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if this.debounce.load(Ordering::SeqCst) != gen {
                return;
            }
            let should_run = {
                let r = this.renderer();
                let trimmed = r.document().raw_text.trim().to_string();
                !trimmed.is_empty() && r.last_transformed() != Some(trimmed.as_str())
            };
            if should_run {
                // failures are already surfaced on the banner
                let _ = this.transform().await;
            }
        })
    }

    /// Handle a key press in the input. Returns `Ok(None)` when the chord
    /// does not submit.
    pub async fn key(&self, chord: KeyChord) -> Result<Option<TransformOutcome>> {
        if !chord.submits() {
            return Ok(None);
        }
        self.transform().await.map(Some)
    }

    fn set_loading(&self, loading: bool) {
        self.view.controls.set_transform_busy(loading);
        self.view.render.set_loading(loading);
    }

    /// Send the current text to the transform service and display the result.
    pub async fn transform(&self) -> Result<TransformOutcome> {
        let raw = self.renderer().document().raw_text.clone();
        let text = match NonEmptyText::new(&raw) {
            Ok(t) => t,
            Err(e) => {
                self.banner.show(StatusLevel::Warning, messages::EMPTY_INPUT);
                return Err(e);
            }
        };

        let seq = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_loading(true);
        self.banner.clear();
        log::debug!("transform request {} ({} chars)", seq, text.as_str().len());

        let result = self.transform.submit(&text).await;

        if self.latest_request.load(Ordering::SeqCst) != seq {
            log::debug!("discarding superseded transform response {}", seq);
            return Ok(TransformOutcome::Superseded);
        }
        self.set_loading(false);

        let result = result.and_then(|markup| {
            let mut r = self.renderer();
            if r.show_markup(markup.as_str()) {
                r.mark_transformed(text.as_str());
                Ok(())
            } else {
                Err(Error::Protocol("service returned blank markup".into()))
            }
        });

        match result {
            Ok(()) => {
                self.view.controls.set_export_visible(true);
                self.banner.show(StatusLevel::Success, messages::TRANSFORM_OK);
                log::info!("transform request {} displayed", seq);
                Ok(TransformOutcome::Displayed)
            }
            Err(e) => {
                log::warn!("transform request {} failed: {}", seq, e);
                self.renderer().show_placeholder();
                self.banner.show(StatusLevel::Danger, messages::TRANSFORM_FAILED);
                Err(e)
            }
        }
    }

    /// Reset input, page and status. Pending auto-transforms and in-flight
    /// responses are dropped.
    pub fn clear(&self) {
        self.debounce.fetch_add(1, Ordering::SeqCst);
        self.latest_request.fetch_add(1, Ordering::SeqCst);
        self.renderer().clear();
        self.view.controls.reset_input();
        self.view.controls.set_export_visible(false);
        self.set_loading(false);
        self.banner.clear();
    }

    /// Export the page at the quality picked in the controls.
    pub async fn export(&self) -> Result<ExportOutcome> {
        let (page, raw) = {
            let r = self.renderer();
            (r.page(), r.document().raw_text.clone())
        };
        if raw.trim().is_empty() {
            self.banner.show(StatusLevel::Warning, messages::NOTHING_TO_EXPORT);
            return Err(Error::Validation("there is no text to export".into()));
        }
        // a lost race leaves the control and banner to the running export
        let lease = self.pipeline.try_begin()?;

        let result = {
            self.view.controls.set_export_busy(true);
            let _release = ExportControlGuard(self.view.controls.as_ref());
            let scale = self
                .view
                .controls
                .image_quality()
                .unwrap_or(self.pipeline.config().default_scale);
            lease.export(&page, &raw, scale).await
        };
        drop(lease);

        match &result {
            Ok(_) => self.banner.show(StatusLevel::Success, messages::EXPORT_OK),
            Err(Error::DependencyUnavailable { .. }) => {
                self.banner.show(StatusLevel::Danger, messages::RASTERIZER_MISSING)
            }
            Err(Error::Validation(msg)) => self.banner.show(StatusLevel::Warning, msg),
            Err(_) => self.banner.show(StatusLevel::Danger, messages::EXPORT_FAILED),
        }
        result
    }

    /// Open the print view for the current text and trigger printing once it
    /// has settled.
    pub async fn print(&self) -> Result<url::Url> {
        let raw = self.renderer().document().raw_text.clone();
        let text = match NonEmptyText::new(&raw) {
            Ok(t) => t,
            Err(e) => {
                self.banner.show(StatusLevel::Warning, messages::NOTHING_TO_PRINT);
                return Err(e);
            }
        };
        let url = print_url(&self.transform_config, text.as_str())?;
        let Some(window) = self.view.controls.open_window(&url) else {
            self.banner.show(StatusLevel::Danger, messages::PRINT_BLOCKED);
            return Err(Error::PopupBlocked);
        };
        tokio::time::sleep(Duration::from_millis(self.config.print_settle_ms)).await;
        window.print();
        Ok(url)
    }
}
