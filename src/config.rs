//! Application configuration.
//!
//! The configuration is loaded from a JSON file
//! (`$XDG_CONFIG_HOME/hyprzone/config.json`).  Every section is optional;
//! a minimal `{}` file is valid, and when no file exists at all a default
//! configuration is derived from the virtual desktop size.
//!
//! # Example
//!
//! ```json
//! {
//!   "layouts": {
//!     "side-by-side": [
//!       {"x": 0, "y": 0, "width": 960, "height": 1080},
//!       {"x": 960, "y": 0, "width": 960, "height": 1080}
//!     ]
//!   },
//!   "hotkeys": {
//!     "ctrl+alt+l": {"layout": "side-by-side"},
//!     "ctrl+alt+q": {"cursor": [960, 540]}
//!   },
//!   "filter": {"min_width": 50, "min_height": 50},
//!   "timing": {"restore_settle_ms": 50}
//! }
//! ```

use crate::action::{Action, ComboParseError, KeyCombo, Point};
use crate::filter::FilterRules;
use crate::zone::{LayoutTable, LayoutTableError, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
///
/// Every field is optional; missing sections fall back to their
/// compiled-in defaults, and unknown top-level keys are ignored so the
/// file can grow without breaking older binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named layouts: layout name to ordered zone list.
    #[serde(default)]
    pub layouts: BTreeMap<String, Vec<Rect>>,

    /// Hotkey bindings: combination string to action.
    #[serde(default)]
    pub hotkeys: BTreeMap<String, Action>,

    /// Window eligibility rules.
    #[serde(default)]
    pub filter: FilterRules,

    /// Settle delays and shutdown deadline.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Delay and deadline tuning.
///
/// All values are in **milliseconds**.  Set a delay to `0` to disable it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause between un-minimizing a window and resizing it, so the
    /// platform can finish its restore animation.
    pub restore_settle_ms: u64,
    /// Pause between moving the cursor and querying the window under it.
    pub cursor_settle_ms: u64,
    /// How long a stop request waits for the hotkey listener thread to
    /// exit before abandoning it.
    pub stop_deadline_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            restore_settle_ms: 50,
            cursor_settle_ms: 50,
            stop_deadline_ms: 2000,
        }
    }
}

impl TimingConfig {
    pub fn restore_settle(&self) -> Duration {
        Duration::from_millis(self.restore_settle_ms)
    }

    pub fn cursor_settle(&self) -> Duration {
        Duration::from_millis(self.cursor_settle_ms)
    }

    pub fn stop_deadline(&self) -> Duration {
        Duration::from_millis(self.stop_deadline_ms)
    }
}

/// Error from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Layout(#[from] LayoutTableError),

    #[error("invalid hotkey {combo:?}: {source}")]
    Combo {
        combo: String,
        source: ComboParseError,
    },
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Build the default configuration for a desktop of the given bounds.
    ///
    /// Produces three classic layouts (two halves, three columns, a
    /// top-left quarter), layout hotkeys on ctrl+alt+l / ctrl+alt+k, and
    /// cursor hotkeys on ctrl+alt+1 / ctrl+alt+2 / ctrl+alt+q targeting
    /// the near corners and the center of the desktop.
    pub fn default_for(desktop: Rect) -> Self {
        let Rect {
            x,
            y,
            width,
            height,
        } = desktop;
        let half_w = width / 2;
        let third_w = width / 3;

        let mut layouts = BTreeMap::new();
        layouts.insert(
            "side-by-side".to_string(),
            vec![
                Rect::new(x, y, half_w, height),
                Rect::new(x + half_w, y, width - half_w, height),
            ],
        );
        layouts.insert(
            "three-columns".to_string(),
            vec![
                Rect::new(x, y, third_w, height),
                Rect::new(x + third_w, y, third_w, height),
                Rect::new(x + 2 * third_w, y, width - 2 * third_w, height),
            ],
        );
        layouts.insert(
            "top-left-quarter".to_string(),
            vec![Rect::new(x, y, half_w, height / 2)],
        );

        let mut hotkeys = BTreeMap::new();
        hotkeys.insert(
            "ctrl+alt+l".to_string(),
            Action::ApplyLayout("side-by-side".to_string()),
        );
        hotkeys.insert(
            "ctrl+alt+k".to_string(),
            Action::ApplyLayout("three-columns".to_string()),
        );
        hotkeys.insert(
            "ctrl+alt+1".to_string(),
            Action::MoveCursorTo(Point {
                x: x + 100,
                y: y + 100,
            }),
        );
        hotkeys.insert(
            "ctrl+alt+2".to_string(),
            Action::MoveCursorTo(Point {
                x: x + width - 100,
                y: y + 100,
            }),
        );
        hotkeys.insert(
            "ctrl+alt+q".to_string(),
            Action::MoveCursorTo(Point {
                x: x + width / 2,
                y: y + height / 2,
            }),
        );

        Self {
            layouts,
            hotkeys,
            filter: FilterRules::default(),
            timing: TimingConfig::default(),
        }
    }

    /// Build the validated layout table from the `layouts` section.
    pub fn layout_table(&self) -> Result<LayoutTable, ConfigError> {
        Ok(LayoutTable::new(
            self.layouts.iter().map(|(k, v)| (k.clone(), v.clone())),
        )?)
    }

    /// Parse the `hotkeys` section into dispatcher bindings.
    ///
    /// Combination strings are parsed here; duplicate combinations (two
    /// spellings of the same combo) are the dispatcher's concern.
    pub fn bindings(&self) -> Result<Vec<(KeyCombo, Action)>, ConfigError> {
        self.hotkeys
            .iter()
            .map(|(combo, action)| {
                KeyCombo::parse(combo)
                    .map(|c| (c, action.clone()))
                    .map_err(|source| ConfigError::Combo {
                        combo: combo.clone(),
                        source,
                    })
            })
            .collect()
    }
}

//  Tests
