//! Applies a named layout to the eligible windows.
//!
//! Assignment is positional: zone `i` receives eligible window `i`.  When
//! there are more windows than zones, the surplus windows stay where they
//! are; when there are more zones than windows, the surplus zones stay
//! empty.  Per-window platform failures are logged and skipped, so one
//! dying window cannot abort the rest of a layout application.

use crate::filter::{eligible_windows, FilterRules};
use crate::traits::WindowPlatform;
use crate::zone::LayoutTable;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Outcome counts of one layout application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutReport {
    /// Zones in the applied layout.
    pub zones_total: usize,
    /// Windows that passed the eligibility filter.
    pub windows_eligible: usize,
    /// Windows actually moved into a zone.
    pub windows_arranged: usize,
}

/// Errors from a layout application.
///
/// Platform call failures are deliberately absent here: they are handled
/// per window inside [`LayoutEngine::apply`] and only reduce the arranged
/// count.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The requested layout name is not configured.
    #[error("unknown layout: {0:?}")]
    UnknownLayout(String),
}

/// Maps layout zones onto eligible windows.
///
/// The engine is generic over any [`WindowPlatform`] implementation,
/// making it independent of Hyprland or any other concrete backend.  The
/// layout table and filter rules are fixed at construction; every `apply`
/// takes a fresh window snapshot.
pub struct LayoutEngine<P> {
    platform: Arc<P>,
    layouts: LayoutTable,
    rules: FilterRules,
    /// Pause between un-minimizing a window and resizing it, giving the
    /// platform time to finish its restore animation.  Zero disables it.
    settle: Duration,
}

impl<P: WindowPlatform> LayoutEngine<P> {
    pub fn new(platform: Arc<P>, layouts: LayoutTable, rules: FilterRules, settle: Duration) -> Self {
        Self {
            platform,
            layouts,
            rules,
            settle,
        }
    }

    /// The configured layout names, sorted.
    pub fn layout_names(&self) -> Vec<String> {
        self.layouts.names().map(str::to_string).collect()
    }

    /// Apply the named layout to the current eligible windows.
    ///
    /// Fails only when the name is unknown.  An empty eligibility snapshot
    /// (including the total-enumeration-failure case) is a no-op that
    /// reports zero arranged windows.
    pub fn apply(&self, name: &str) -> Result<LayoutReport, LayoutError> {
        let zones = self
            .layouts
            .get(name)
            .ok_or_else(|| LayoutError::UnknownLayout(name.to_string()))?;

        let windows = eligible_windows(&*self.platform, &self.rules);
        let mut report = LayoutReport {
            zones_total: zones.len(),
            windows_eligible: windows.len(),
            windows_arranged: 0,
        };

        if windows.is_empty() {
            info!("layout {:?}: no eligible windows, nothing to do", name);
            return Ok(report);
        }
        if zones.is_empty() {
            warn!("layout {:?} has no zones, nothing to do", name);
            return Ok(report);
        }

        for (zone, window) in zones.iter().zip(windows.iter()) {
            debug!(
                "layout {:?}: window {:?} ({}) into zone {}",
                name, window.title, window.handle, zone
            );

            // The window may have been minimized since the snapshot; a
            // restore failure is still worth a resize attempt.
            if let Err(e) = self.platform.restore_window(&window.handle) {
                warn!("restore of {} failed: {}", window.handle, e);
            }
            if !self.settle.is_zero() {
                std::thread::sleep(self.settle);
            }

            match self.platform.set_bounds_and_raise(&window.handle, *zone) {
                Ok(()) => report.windows_arranged += 1,
                Err(e) => warn!("move/resize of {} failed: {}", window.handle, e),
            }
        }

        info!(
            "layout {:?}: arranged {} of {} eligible windows into {} zones",
            name, report.windows_arranged, report.windows_eligible, report.zones_total
        );
        Ok(report)
    }
}

//  Tests
