//! Window eligibility filtering.
//!
//! Decides which of the platform's top-level windows are candidates for
//! layout placement.  The filter is a pure function of one enumeration
//! snapshot: no side effects, no caching, and a failure while examining a
//! single window only excludes that window.
//!
//! Ordering: the enumeration order is platform-defined and only loosely
//! related to visual stacking.  The one correction applied is moving the
//! current foreground window (when it is eligible) to the front, so the
//! most recently used window lands in the first zone.  No further Z-order
//! reconstruction is attempted.

use crate::traits::{WindowDesc, WindowPlatform, WindowRecord};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Window classes that belong to the desktop shell rather than to
/// applications, and are never eligible.
const DEFAULT_CLASS_BLACKLIST: &[&str] = &["progman", "workerw", "shell_traywnd", "dwm"];

/// Titles of system surfaces that enumerate as ordinary windows on some
/// platforms.
const DEFAULT_TITLE_BLACKLIST: &[&str] = &["program manager", "windows input experience"];

/// Eligibility rules for layout placement.
///
/// All string comparisons are case-insensitive.  Every field has a
/// compiled-in default, so a config file can override just one knob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Minimum bounding-rect width in pixels.
    pub min_width: i32,
    /// Minimum bounding-rect height in pixels.
    pub min_height: i32,
    /// Window classes that are never eligible.
    pub class_blacklist: Vec<String>,
    /// Window titles that are never eligible.
    pub title_blacklist: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            min_width: 50,
            min_height: 50,
            class_blacklist: DEFAULT_CLASS_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            title_blacklist: DEFAULT_TITLE_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FilterRules {
    /// Whether a single enumeration row passes every eligibility check.
    pub fn admits(&self, window: &WindowDesc) -> bool {
        if !window.visible || window.minimized || window.tool_window {
            return false;
        }
        if window.title.is_empty() {
            return false;
        }
        if self
            .class_blacklist
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&window.class_name))
        {
            return false;
        }
        if self
            .title_blacklist
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&window.title))
        {
            return false;
        }
        match window.rect {
            // A failed geometry query excludes the window, it is not fatal.
            None => false,
            Some(rect) => rect.width >= self.min_width && rect.height >= self.min_height,
        }
    }
}

/// Take one eligibility snapshot: enumerate, filter, and order.
///
/// The foreground window, if present among the eligible ones, is moved to
/// index 0; otherwise enumeration order is preserved.  A total enumeration
/// failure yields an empty list (callers treat that as "nothing to do",
/// not as an error).
pub fn eligible_windows<P: WindowPlatform>(platform: &P, rules: &FilterRules) -> Vec<WindowRecord> {
    let descs = match platform.enumerate_windows() {
        Ok(descs) => descs,
        Err(e) => {
            warn!("window enumeration failed: {}", e);
            return Vec::new();
        }
    };

    let mut eligible: Vec<WindowRecord> = descs
        .into_iter()
        .filter(|w| rules.admits(w))
        .map(|w| WindowRecord {
            handle: w.handle,
            title: w.title,
        })
        .collect();

    match platform.foreground_window() {
        Ok(Some(fg)) => {
            if let Some(pos) = eligible.iter().position(|w| w.handle == fg) {
                let front = eligible.remove(pos);
                eligible.insert(0, front);
            }
        }
        Ok(None) => {}
        Err(e) => debug!("foreground query failed, keeping enumeration order: {}", e),
    }

    eligible
}

//  Tests
