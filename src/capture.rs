//! Collaborator interfaces at the edge of the library
//!
//! Screen capture, the region-selection overlay and result presentation are
//! supplied by the host application. [`ImageFileCapture`] backs the capture
//! interface with an image on disk so the scanner and monitor can run
//! without a desktop.

use crate::error::CaptureError;
use crate::models::{DetectionResult, Frame, Region};
use std::path::Path;
use std::sync::mpsc::Sender;

/// Opaque handle of a top-level window
pub type WindowId = u64;

/// Source of screen pixels
pub trait ScreenCapture: Send + Sync {
    /// Capture a rectangle in screen coordinates
    fn capture_region(&self, region: Region) -> Result<Frame, CaptureError>;

    /// Capture the client area of one window
    fn capture_window(&self, id: WindowId) -> Result<Frame, CaptureError>;

    /// Windows whose title contains `title`, case-insensitively, in z-order
    fn enumerate_windows(&self, title: &str) -> Result<Vec<WindowId>, CaptureError>;

    /// Bounds of every monitor
    fn list_monitors(&self) -> Result<Vec<Region>, CaptureError>;
}

/// Interactive rectangle picker
pub trait SelectionOverlay {
    /// Let the user drag a rectangle; `None` when cancelled
    fn select_region(&self) -> Option<Region>;
}

/// Receiver of decoded results; must return quickly
pub trait ResultSink: Send + Sync {
    /// Present one result
    fn emit(&self, result: &DetectionResult);
}

impl<F> ResultSink for F
where
    F: Fn(&DetectionResult) + Send + Sync,
{
    fn emit(&self, result: &DetectionResult) {
        self(result)
    }
}

/// Forwards results to a channel so presentation runs on another thread
pub struct ChannelSink {
    tx: Sender<DetectionResult>,
}

impl ChannelSink {
    /// Sink that sends clones of each result to `tx`
    pub fn new(tx: Sender<DetectionResult>) -> Self {
        Self { tx }
    }
}

impl ResultSink for ChannelSink {
    fn emit(&self, result: &DetectionResult) {
        if self.tx.send(result.clone()).is_err() {
            log::debug!("result receiver dropped; discarding {}", result.attempt_id());
        }
    }
}

/// Forwards every result to an inner sink and, when enabled, to a notifier
pub struct NotifyingSink {
    inner: Box<dyn ResultSink>,
    notifier: Option<Box<dyn ResultSink>>,
}

impl NotifyingSink {
    /// Sink with no notifier attached
    pub fn new(inner: impl ResultSink + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            notifier: None,
        }
    }

    /// Attach `notifier` when `enabled`; a disabled notifier is dropped
    pub fn with_notifier(mut self, enabled: bool, notifier: impl ResultSink + 'static) -> Self {
        if enabled {
            self.notifier = Some(Box::new(notifier));
        } else {
            log::debug!("notifications disabled");
        }
        self
    }
}

impl ResultSink for NotifyingSink {
    fn emit(&self, result: &DetectionResult) {
        self.inner.emit(result);
        if let Some(notifier) = &self.notifier {
            notifier.emit(result);
        }
    }
}

/// Case-insensitive substring match used for window titles
pub fn title_matches(title: &str, matcher: &str) -> bool {
    title.to_lowercase().contains(&matcher.to_lowercase())
}

/// Smallest region holding every monitor
pub fn virtual_screen(monitors: &[Region]) -> Option<Region> {
    monitors.iter().copied().reduce(|acc, m| acc.union(&m))
}

/// A single image file presented as one monitor and one window
pub struct ImageFileCapture {
    frame: Frame,
    title: String,
}

impl ImageFileCapture {
    /// Window id of the single window
    pub const WINDOW: WindowId = 1;

    /// Load an image; the window title is the file name
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let image = image::open(path).map_err(|source| CaptureError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let frame = Frame::try_from(image.to_rgb8())?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::debug!("loaded {}x{} capture source {}", frame.width(), frame.height(), title);
        Ok(Self::from_frame(title, frame))
    }

    /// Wrap an in-memory frame under a window title
    pub fn from_frame(title: impl Into<String>, frame: Frame) -> Self {
        Self {
            frame,
            title: title.into(),
        }
    }

    /// Title reported for the window
    pub fn title(&self) -> &str {
        &self.title
    }

    fn bounds(&self) -> Option<Region> {
        Region::new(0, 0, self.frame.width() as u32, self.frame.height() as u32)
    }
}

impl ScreenCapture for ImageFileCapture {
    fn capture_region(&self, region: Region) -> Result<Frame, CaptureError> {
        let clipped = self
            .bounds()
            .and_then(|bounds| region.clamp_to(&bounds))
            .ok_or(CaptureError::OutsideBounds)?;
        Ok(self.frame.crop(
            clipped.x as usize,
            clipped.y as usize,
            clipped.width as usize,
            clipped.height as usize,
        )?)
    }

    fn capture_window(&self, id: WindowId) -> Result<Frame, CaptureError> {
        if id == Self::WINDOW {
            Ok(self.frame.clone())
        } else {
            Err(CaptureError::WindowNotFound(id))
        }
    }

    fn enumerate_windows(&self, title: &str) -> Result<Vec<WindowId>, CaptureError> {
        if title_matches(&self.title, title) {
            Ok(vec![Self::WINDOW])
        } else {
            Ok(Vec::new())
        }
    }

    fn list_monitors(&self) -> Result<Vec<Region>, CaptureError> {
        Ok(self.bounds().into_iter().collect())
    }
}
