//! The notebook page state and the only code allowed to mutate it.

use std::sync::Arc;

use crate::rendering::ruling::RulingStyle;
use crate::view::{PageContent, RenderTarget};

/// Instruction shown whenever there is nothing (valid) to display.
pub const PLACEHOLDER_TEXT: &str =
    "Digite seu texto ao lado e clique em \"Transformar em Manuscrito\" para ver o resultado aqui.";

/// Current user text and what the page shows for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub raw_text: String,
    pub rendered_markup: Option<String>,
    pub is_placeholder: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            raw_text: String::new(),
            rendered_markup: None,
            is_placeholder: true,
        }
    }
}

/// Snapshot of the rendered page, the thing the capture pipeline clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    pub markup: String,
    pub is_placeholder: bool,
    pub style: RulingStyle,
}

pub fn placeholder_markup() -> String {
    format!("<span class=\"placeholder-text\">{}</span>", PLACEHOLDER_TEXT)
}

pub struct NotebookRenderer {
    document: Document,
    last_transformed: Option<String>,
    target: Arc<dyn RenderTarget>,
    style: RulingStyle,
}

impl NotebookRenderer {
    pub fn new(target: Arc<dyn RenderTarget>, style: RulingStyle) -> Self {
        let mut renderer = Self {
            document: Document::default(),
            last_transformed: None,
            target,
            style,
        };
        renderer.show_placeholder();
        renderer
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Trimmed text of the last successful transform, if any.
    pub fn last_transformed(&self) -> Option<&str> {
        self.last_transformed.as_deref()
    }

    pub fn record_input(&mut self, text: &str) {
        self.document.raw_text = text.to_string();
    }

    pub fn mark_transformed(&mut self, text: &str) {
        self.last_transformed = Some(text.trim().to_string());
    }

    /// Display service markup. Blank markup falls back to the placeholder so
    /// an upstream failure never leaves an ambiguous empty page.
    ///
    /// Returns whether the markup was displayed.
    pub fn show_markup(&mut self, markup: &str) -> bool {
        if markup.trim().is_empty() {
            log::warn!("refusing blank markup, showing placeholder");
            self.show_placeholder();
            return false;
        }
        self.document.rendered_markup = Some(markup.to_string());
        self.document.is_placeholder = false;
        self.target
            .set_content(&PageContent::Markup(markup.to_string()));
        self.target.scroll_to_top();
        log::debug!("displayed {} bytes of markup", markup.len());
        true
    }

    pub fn show_placeholder(&mut self) {
        self.document.rendered_markup = None;
        self.document.is_placeholder = true;
        self.target
            .set_content(&PageContent::Placeholder(PLACEHOLDER_TEXT.to_string()));
    }

    pub fn clear(&mut self) {
        self.document.raw_text.clear();
        self.last_transformed = None;
        self.show_placeholder();
    }

    pub fn page(&self) -> PageNode {
        PageNode {
            markup: self
                .document
                .rendered_markup
                .clone()
                .unwrap_or_else(placeholder_markup),
            is_placeholder: self.document.is_placeholder,
            style: self.style,
        }
    }
}
