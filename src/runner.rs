//! Executes bound actions against the platform.
//!
//! The [`ActionRunner`] is handed to the dispatcher and invoked on the
//! listener thread whenever a hotkey fires.  It never propagates errors:
//! an unknown layout or a failing platform call is logged and the listener
//! keeps running.

use crate::action::Action;
use crate::cursor;
use crate::engine::LayoutEngine;
use crate::traits::{ActionExecutor, WindowPlatform};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Bridges [`Action`] values to the layout engine and the cursor hop.
pub struct ActionRunner<P> {
    engine: LayoutEngine<P>,
    platform: Arc<P>,
    cursor_settle: Duration,
}

impl<P: WindowPlatform> ActionRunner<P> {
    pub fn new(engine: LayoutEngine<P>, platform: Arc<P>, cursor_settle: Duration) -> Self {
        Self {
            engine,
            platform,
            cursor_settle,
        }
    }

    /// Shared access to the underlying layout engine (for one-shot use
    /// outside the dispatcher).
    pub fn engine(&self) -> &LayoutEngine<P> {
        &self.engine
    }
}

impl<P> ActionExecutor for ActionRunner<P>
where
    P: WindowPlatform + Send + Sync,
{
    fn execute(&self, action: &Action) {
        match action {
            Action::ApplyLayout(name) => {
                if let Err(e) = self.engine.apply(name) {
                    warn!("{}", e);
                }
            }
            Action::MoveCursorTo(point) => {
                if cursor::activate_at(&*self.platform, *point, self.cursor_settle) {
                    info!("activated window at {}", point);
                } else {
                    info!("no eligible window at {}", point);
                }
            }
        }
    }
}
