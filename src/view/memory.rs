/// In-memory view that records what would be on screen

use std::sync::{Arc, Mutex};

use super::{Controls, PageContent, PrintWindow, RenderTarget, Status, StatusTarget, View};

#[derive(Debug, Clone)]
pub struct ViewState {
    pub content: PageContent,
    pub scroll_top: u32,
    pub loading: bool,
    pub status: Option<Status>,
    /// Every banner ever shown, oldest first
    pub status_history: Vec<Status>,
    pub transform_busy: bool,
    pub export_visible: bool,
    pub export_busy: bool,
    pub input_resets: usize,
    pub quality: Option<u32>,
    pub block_popups: bool,
    pub opened_urls: Vec<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            content: PageContent::Placeholder(String::new()),
            scroll_top: 0,
            loading: false,
            status: None,
            status_history: Vec::new(),
            transform_busy: false,
            export_visible: false,
            export_busy: false,
            input_resets: 0,
            quality: None,
            block_popups: false,
            opened_urls: Vec::new(),
        }
    }
}

pub struct MemoryView {
    state: Mutex<ViewState>,
    prints: Arc<Mutex<usize>>,
}

impl MemoryView {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryView {
            state: Mutex::new(ViewState::default()),
            prints: Arc::new(Mutex::new(0)),
        })
    }

    /// Bundle this view as the controller's capability set.
    pub fn view(self: &Arc<Self>) -> View {
        View {
            render: self.clone(),
            status: self.clone(),
            controls: self.clone(),
        }
    }

    pub fn state(&self) -> ViewState {
        self.state.lock().unwrap().clone()
    }

    pub fn set_quality(&self, quality: Option<u32>) {
        self.state.lock().unwrap().quality = quality;
    }

    pub fn set_block_popups(&self, block: bool) {
        self.state.lock().unwrap().block_popups = block;
    }

    /// Pretend the user scrolled the preview.
    pub fn scroll_to(&self, offset: u32) {
        self.state.lock().unwrap().scroll_top = offset;
    }

    pub fn print_count(&self) -> usize {
        *self.prints.lock().unwrap()
    }
}

impl RenderTarget for MemoryView {
    fn set_content(&self, content: &PageContent) {
        self.state.lock().unwrap().content = content.clone();
    }

    fn scroll_to_top(&self) {
        self.state.lock().unwrap().scroll_top = 0;
    }

    fn set_loading(&self, loading: bool) {
        self.state.lock().unwrap().loading = loading;
    }
}

impl StatusTarget for MemoryView {
    fn show(&self, status: &Status) {
        let mut s = self.state.lock().unwrap();
        s.status = Some(status.clone());
        s.status_history.push(status.clone());
    }

    fn clear(&self) {
        self.state.lock().unwrap().status = None;
    }
}

struct CountingWindow {
    prints: Arc<Mutex<usize>>,
}

impl PrintWindow for CountingWindow {
    fn print(&self) {
        *self.prints.lock().unwrap() += 1;
    }
}

impl Controls for MemoryView {
    fn set_transform_busy(&self, busy: bool) {
        self.state.lock().unwrap().transform_busy = busy;
    }

    fn set_export_visible(&self, visible: bool) {
        self.state.lock().unwrap().export_visible = visible;
    }

    fn set_export_busy(&self, busy: bool) {
        self.state.lock().unwrap().export_busy = busy;
    }

    fn reset_input(&self) {
        self.state.lock().unwrap().input_resets += 1;
    }

    fn image_quality(&self) -> Option<u32> {
        self.state.lock().unwrap().quality
    }

    fn open_window(&self, url: &url::Url) -> Option<Arc<dyn PrintWindow>> {
        let mut s = self.state.lock().unwrap();
        if s.block_popups {
            return None;
        }
        s.opened_urls.push(url.to_string());
        Some(Arc::new(CountingWindow {
            prints: self.prints.clone(),
        }))
    }
}
