//! View capabilities injected into the controller.
//!
//! The controller never looks widgets up by identifier; it receives a
//! [`View`] bundling the render target, the status banner area and the
//! user controls. [`memory::MemoryView`] is an in-memory implementation used
//! by the CLI and by tests.

pub mod memory;

use std::sync::Arc;

pub use memory::MemoryView;

/// What the visible notebook frame is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    Markup(String),
    Placeholder(String),
}

/// The visible notebook page.
pub trait RenderTarget: Send + Sync {
    fn set_content(&self, content: &PageContent);
    fn scroll_to_top(&self);
    fn set_loading(&self, loading: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Status {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Banner area for status messages.
pub trait StatusTarget: Send + Sync {
    fn show(&self, status: &Status);
    fn clear(&self);
}

/// A window opened for printing.
pub trait PrintWindow: Send + Sync {
    /// Open the native print dialog
    fn print(&self);
}

/// Buttons and inputs the controller drives.
pub trait Controls: Send + Sync {
    /// Disable the transform button and show its busy label
    fn set_transform_busy(&self, busy: bool);
    fn set_export_visible(&self, visible: bool);
    /// Disable the export confirm button while a capture runs
    fn set_export_busy(&self, busy: bool);
    /// Empty the text input
    fn reset_input(&self);
    /// Scale factor picked in the quality selector, if any
    fn image_quality(&self) -> Option<u32>;
    /// Open `url` in a new browsing context; `None` when blocked
    fn open_window(&self, url: &url::Url) -> Option<Arc<dyn PrintWindow>>;
}

/// Capability set handed to the controller at construction.
#[derive(Clone)]
pub struct View {
    pub render: Arc<dyn RenderTarget>,
    pub status: Arc<dyn StatusTarget>,
    pub controls: Arc<dyn Controls>,
}
