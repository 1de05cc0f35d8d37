/// Offscreen page host backed by the headless layout engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{CaptureSnapshot, ContainerId, ExportContainer, PageHost};
use crate::error::ExportErrorKind;
use crate::rendering::layout::{layout_markup, PageLayout, PageMetrics};
use crate::rendering::ruling::RuleGeometry;
use crate::{Error, Result};

struct Attached {
    container: ExportContainer,
    layout: PageLayout,
    ruling: Option<RuleGeometry>,
}

impl Attached {
    fn height(&self) -> u32 {
        self.layout.content_height.max(self.container.min_height)
    }
}

/// Lays containers out with [`layout_markup`] at the container's width.
pub struct OffscreenHost {
    metrics: PageMetrics,
    next_id: AtomicU64,
    attached: Mutex<HashMap<ContainerId, Attached>>,
}

impl OffscreenHost {
    pub fn new(metrics: PageMetrics) -> Self {
        Self {
            metrics,
            next_id: AtomicU64::new(1),
            attached: Mutex::new(HashMap::new()),
        }
    }

    fn with<T>(&self, id: ContainerId, f: impl FnOnce(&mut Attached) -> T) -> Result<T> {
        let mut map = self
            .attached
            .lock()
            .map_err(|e| Error::export(ExportErrorKind::Clone, e.to_string()))?;
        let entry = map.get_mut(&id).ok_or_else(|| {
            Error::export(ExportErrorKind::Clone, format!("container {:?} is not attached", id))
        })?;
        Ok(f(entry))
    }
}

impl Default for OffscreenHost {
    fn default() -> Self {
        Self::new(PageMetrics::default())
    }
}

impl PageHost for OffscreenHost {
    fn attach(&self, container: ExportContainer) -> Result<ContainerId> {
        if container.width == 0 {
            return Err(Error::export(ExportErrorKind::Clone, "container width is zero"));
        }
        let metrics = PageMetrics {
            width: container.width,
            ..self.metrics
        };
        let layout = layout_markup(&container.page.markup, metrics);
        let id = ContainerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut map = self
            .attached
            .lock()
            .map_err(|e| Error::export(ExportErrorKind::Clone, e.to_string()))?;
        map.insert(
            id,
            Attached {
                container,
                layout,
                ruling: None,
            },
        );
        log::debug!("attached export container {:?}", id);
        Ok(id)
    }

    fn measure(&self, id: ContainerId) -> Option<f64> {
        self.with(id, |a| a.height() as f64).ok()
    }

    fn inject_ruling(&self, id: ContainerId, ruling: RuleGeometry) -> Result<()> {
        self.with(id, |a| a.ruling = Some(ruling))
    }

    fn snapshot(&self, id: ContainerId) -> Result<CaptureSnapshot> {
        self.with(id, |a| {
            let ruling = a.ruling.clone().ok_or_else(|| {
                Error::export(ExportErrorKind::Measure, "ruling was not injected")
            })?;
            // the page is at least as tall as the height the rules were computed for
            let height = a.height().max(ruling.height);
            Ok(CaptureSnapshot {
                layout: a.layout.clone(),
                ruling,
                style: a.container.page.style,
                width: a.container.width,
                height,
            })
        })?
    }

    fn detach(&self, id: ContainerId) {
        if let Ok(mut map) = self.attached.lock() {
            map.remove(&id);
        }
    }

    fn attached(&self) -> usize {
        self.attached.lock().map(|m| m.len()).unwrap_or(0)
    }
}
