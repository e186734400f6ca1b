//! Interactive scan entry points driven by the tray menu and hotkey

use crate::capture::{ScreenCapture, SelectionOverlay, virtual_screen};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::models::{DetectionResult, Region};
use crate::pipeline::Detect;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of one interactive scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// A code was decoded
    Found(DetectionResult),
    /// Every attempt came back empty
    NotFound,
    /// The user dismissed the selection overlay
    Cancelled,
    /// A manual capture was already in progress
    Busy,
}

impl ScanOutcome {
    /// The decoded result, if any
    pub fn result(&self) -> Option<&DetectionResult> {
        match self {
            ScanOutcome::Found(result) => Some(result),
            _ => None,
        }
    }
}

impl From<Option<DetectionResult>> for ScanOutcome {
    fn from(hit: Option<DetectionResult>) -> Self {
        hit.map_or(ScanOutcome::NotFound, ScanOutcome::Found)
    }
}

/// Full-screen, region and manual scans over a capture source
pub struct Scanner {
    capture: Arc<dyn ScreenCapture>,
    detector: Arc<dyn Detect>,
    config: ScanConfig,
    selecting: AtomicBool,
}

impl Scanner {
    /// Scanner over a capture source and detector
    pub fn new(
        capture: Arc<dyn ScreenCapture>,
        detector: Arc<dyn Detect>,
        config: ScanConfig,
    ) -> Self {
        Self {
            capture,
            detector,
            config,
            selecting: AtomicBool::new(false),
        }
    }

    /// Capture the whole virtual screen and search it
    pub fn scan_screen(&self) -> Result<ScanOutcome, ScanError> {
        let Some(screen) = self.screen_bounds()? else {
            warn!("no monitors reported; nothing to scan");
            return Ok(ScanOutcome::NotFound);
        };
        let frame = self.capture.capture_region(screen)?;
        debug!("scanning full screen {}x{}", frame.width(), frame.height());
        Ok(self.detector.detect(&frame)?.into())
    }

    /// Search a user-chosen region, padded, then once more widened
    pub fn scan_region(&self, region: Region) -> Result<ScanOutcome, ScanError> {
        let bounds = self.screen_bounds()?;
        let clip = |r: Region| match &bounds {
            Some(b) => r.clamp_to(b),
            None => Some(r),
        };

        let padded = region.padded(self.config.region_padding);
        let first = clip(padded);
        if let Some(area) = first {
            if let Some(hit) = self.detect_in(area)? {
                return Ok(ScanOutcome::Found(hit));
            }
        }

        let widened = clip(padded.padded(self.config.widen_by));
        match widened {
            Some(area) if Some(area) != first => {
                debug!("retrying region widened to {}x{}", area.width, area.height);
                Ok(self.detect_in(area)?.into())
            }
            _ => Ok(ScanOutcome::NotFound),
        }
    }

    /// Scan the full screen, falling back to a user-selected region
    pub fn manual_capture(&self, overlay: &dyn SelectionOverlay) -> Result<ScanOutcome, ScanError> {
        if self.selecting.swap(true, Ordering::AcqRel) {
            debug!("manual capture already in progress");
            return Ok(ScanOutcome::Busy);
        }
        let _guard = SelectingGuard(&self.selecting);

        let outcome = self.scan_screen()?;
        if outcome.result().is_some() {
            return Ok(outcome);
        }
        info!("nothing found on screen; asking for a region");
        match overlay.select_region() {
            Some(region) => self.scan_region(region),
            None => Ok(ScanOutcome::Cancelled),
        }
    }

    fn screen_bounds(&self) -> Result<Option<Region>, ScanError> {
        Ok(virtual_screen(&self.capture.list_monitors()?))
    }

    fn detect_in(&self, area: Region) -> Result<Option<DetectionResult>, ScanError> {
        let frame = self.capture.capture_region(area)?;
        Ok(self.detector.detect(&frame)?)
    }
}

struct SelectingGuard<'a>(&'a AtomicBool);

impl Drop for SelectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
