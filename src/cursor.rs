//! Cursor hop with activation.
//!
//! Moves the pointer to a fixed point, finds the top-level window beneath
//! it, and asks the platform to bring that window to the foreground.  The
//! cursor may land on a child control, so the hit window is first resolved
//! to its top-level ancestor.
//!
//! Success is best-effort: the platform may accept the foreground request
//! and still refuse the focus change (another process holding input focus,
//! missing privileges).  The return value reports whether an activation
//! was attempted, not whether focus actually changed.

use crate::action::Point;
use crate::traits::WindowPlatform;
use log::{debug, warn};
use std::time::Duration;

/// Move the cursor to `point` and activate the window beneath it.
///
/// Returns `false` when no titled top-level window occupies the point or
/// when a platform call fails along the way; in both cases no activation
/// is issued.  `settle` is a short pause after the cursor move so the
/// platform registers the new position before it is queried.
pub fn activate_at<P: WindowPlatform>(platform: &P, point: Point, settle: Duration) -> bool {
    if let Err(e) = platform.move_cursor_to(point) {
        warn!("cursor move to {} failed: {}", point, e);
        return false;
    }
    if !settle.is_zero() {
        std::thread::sleep(settle);
    }

    let hit = match platform.window_at_point(point) {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            debug!("no window at {}", point);
            return false;
        }
        Err(e) => {
            warn!("window query at {} failed: {}", point, e);
            return false;
        }
    };

    // The hit may be a child control; activation targets its top-level
    // owner.  A failed ancestor query falls back to the hit itself.
    let target = match platform.top_level_ancestor(&hit) {
        Ok(Some(top)) => top,
        Ok(None) => {
            debug!("window {} vanished before activation", hit);
            return false;
        }
        Err(e) => {
            debug!("ancestor query for {} failed, using hit window: {}", hit, e);
            hit
        }
    };

    let title = match platform.window_title(&target) {
        Ok(title) => title,
        Err(e) => {
            warn!("title query for {} failed: {}", target, e);
            return false;
        }
    };
    if title.is_empty() {
        debug!("window {} at {} has no title, not activating", target, point);
        return false;
    }

    if let Err(e) = platform.restore_window(&target) {
        warn!("restore of {} failed: {}", target, e);
    }
    match platform.request_foreground(&target) {
        Ok(true) => {
            debug!("activated {:?} ({}) at {}", title, target, point);
            true
        }
        Ok(false) => {
            // The platform took the call but refused the focus change.
            debug!("activation of {:?} refused by the platform", title);
            true
        }
        Err(e) => {
            warn!("activation of {} failed: {}", target, e);
            false
        }
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{WindowDesc, WindowHandle};
    use crate::zone::Rect;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Platform double with a point-to-window map and a child-to-parent
    /// map, recording activation calls.
    #[derive(Default)]
    struct HitTestPlatform {
        at_point: HashMap<(i32, i32), WindowHandle>,
        parents: HashMap<WindowHandle, WindowHandle>,
        titles: HashMap<WindowHandle, String>,
        deny_foreground: bool,
        activations: RefCell<Vec<WindowHandle>>,
        restores: RefCell<Vec<WindowHandle>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("hit-test error")]
    struct HitTestError;

    impl WindowPlatform for HitTestPlatform {
        type Error = HitTestError;

        fn enumerate_windows(&self) -> Result<Vec<WindowDesc>, HitTestError> {
            Ok(Vec::new())
        }

        fn foreground_window(&self) -> Result<Option<WindowHandle>, HitTestError> {
            Ok(None)
        }

        fn restore_window(&self, w: &WindowHandle) -> Result<(), HitTestError> {
            self.restores.borrow_mut().push(w.clone());
            Ok(())
        }

        fn set_bounds_and_raise(&self, _: &WindowHandle, _: Rect) -> Result<(), HitTestError> {
            Ok(())
        }

        fn request_foreground(&self, w: &WindowHandle) -> Result<bool, HitTestError> {
            self.activations.borrow_mut().push(w.clone());
            Ok(!self.deny_foreground)
        }

        fn window_at_point(&self, point: Point) -> Result<Option<WindowHandle>, HitTestError> {
            Ok(self.at_point.get(&(point.x, point.y)).cloned())
        }

        fn top_level_ancestor(
            &self,
            w: &WindowHandle,
        ) -> Result<Option<WindowHandle>, HitTestError> {
            Ok(Some(self.parents.get(w).cloned().unwrap_or_else(|| w.clone())))
        }

        fn window_title(&self, w: &WindowHandle) -> Result<String, HitTestError> {
            Ok(self.titles.get(w).cloned().unwrap_or_default())
        }

        fn move_cursor_to(&self, _: Point) -> Result<(), HitTestError> {
            Ok(())
        }

        fn virtual_desktop_bounds(&self) -> Result<Rect, HitTestError> {
            Ok(Rect::new(0, 0, 1920, 1080))
        }
    }

    fn handle(s: &str) -> WindowHandle {
        WindowHandle(s.to_string())
    }

    #[test]
    fn empty_space_returns_false_without_activation() {
        let p = HitTestPlatform::default();
        assert!(!activate_at(&p, Point { x: 2500, y: 50 }, Duration::ZERO));
        assert!(p.activations.borrow().is_empty());
    }

    #[test]
    fn titled_window_is_restored_and_activated() {
        let mut p = HitTestPlatform::default();
        p.at_point.insert((100, 100), handle("0x1"));
        p.titles.insert(handle("0x1"), "editor".to_string());
        assert!(activate_at(&p, Point { x: 100, y: 100 }, Duration::ZERO));
        assert_eq!(*p.restores.borrow(), vec![handle("0x1")]);
        assert_eq!(*p.activations.borrow(), vec![handle("0x1")]);
    }

    #[test]
    fn child_hit_resolves_to_top_level_ancestor() {
        let mut p = HitTestPlatform::default();
        p.at_point.insert((100, 100), handle("0xchild"));
        p.parents.insert(handle("0xchild"), handle("0xtop"));
        p.titles.insert(handle("0xtop"), "browser".to_string());
        assert!(activate_at(&p, Point { x: 100, y: 100 }, Duration::ZERO));
        assert_eq!(*p.activations.borrow(), vec![handle("0xtop")]);
    }

    #[test]
    fn untitled_window_is_not_activated() {
        let mut p = HitTestPlatform::default();
        p.at_point.insert((100, 100), handle("0x1"));
        assert!(!activate_at(&p, Point { x: 100, y: 100 }, Duration::ZERO));
        assert!(p.activations.borrow().is_empty());
    }

    #[test]
    fn refused_focus_change_still_counts_as_attempted() {
        let mut p = HitTestPlatform::default();
        p.at_point.insert((100, 100), handle("0x1"));
        p.titles.insert(handle("0x1"), "editor".to_string());
        p.deny_foreground = true;
        assert!(activate_at(&p, Point { x: 100, y: 100 }, Duration::ZERO));
        assert_eq!(p.activations.borrow().len(), 1);
    }
}
