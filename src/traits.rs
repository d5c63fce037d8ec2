//! Core traits that decouple hyprzone from any specific windowing platform
//! or hotkey facility.
//!
//! Every concrete backend (Hyprland IPC, the global-hotkey listener, a test
//! harness, …) implements one of these traits.  The filter, the layout
//! engine, and the [`HotkeyDispatcher`](crate::dispatcher::HotkeyDispatcher)
//! only depend on these abstractions.

use crate::action::{Action, KeyCombo, Point};
use crate::zone::Rect;
use std::fmt;
use std::sync::atomic::AtomicBool;

/// Opaque identifier for a top-level window, owned by the platform.
///
/// A handle is only meaningful within the session that produced it and may
/// become invalid at any moment (the window can close between enumeration
/// and mutation).  Callers must treat every operation on a handle as
/// fallible and must not cache handles across trigger invocations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub String);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a window enumeration, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDesc {
    pub handle: WindowHandle,
    pub title: String,
    /// Platform window class (application identifier).
    pub class_name: String,
    pub visible: bool,
    pub minimized: bool,
    /// Utility/palette windows excluded from normal window management.
    pub tool_window: bool,
    /// Bounding rectangle; `None` when the geometry query failed for this
    /// window (which makes it ineligible, not an error).
    pub rect: Option<Rect>,
}

/// A filtered, ordered snapshot entry: one window that is a candidate for
/// layout placement.  Snapshots are taken once per action invocation and
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub handle: WindowHandle,
    pub title: String,
}

/// Abstraction over the windowing platform.
///
/// An implementation might talk to Hyprland over its IPC socket, or it
/// might be a record-keeping mock used in tests.  Every call is fallible;
/// a failure is an error outcome for that call only and must never bring
/// the process down.
pub trait WindowPlatform {
    /// The error type produced by this platform.
    type Error: std::error::Error + Send + 'static;

    /// Enumerate all top-level windows, in platform-defined order.
    ///
    /// The order is only loosely related to on-screen stacking; callers
    /// must not assume a true Z-order.
    fn enumerate_windows(&self) -> Result<Vec<WindowDesc>, Self::Error>;

    /// The window currently holding input focus, if any.
    fn foreground_window(&self) -> Result<Option<WindowHandle>, Self::Error>;

    /// Bring a window out of its minimized/hidden state.
    fn restore_window(&self, window: &WindowHandle) -> Result<(), Self::Error>;

    /// Move and resize a window to `rect` and raise it to the top of the
    /// Z-order, without necessarily giving it input focus.
    fn set_bounds_and_raise(&self, window: &WindowHandle, rect: Rect) -> Result<(), Self::Error>;

    /// Ask the platform to give a window input focus.
    ///
    /// Returns `Ok(false)` when the platform accepted the call but refused
    /// the focus change (e.g. another process holds focus).  That refusal
    /// is a platform limitation, not an error.
    fn request_foreground(&self, window: &WindowHandle) -> Result<bool, Self::Error>;

    /// The top-level window at a virtual-desktop point, if any.
    fn window_at_point(&self, point: Point) -> Result<Option<WindowHandle>, Self::Error>;

    /// Resolve a (possibly child) window to its top-level ancestor.
    ///
    /// Returns `Ok(None)` when the handle no longer resolves to any window.
    fn top_level_ancestor(
        &self,
        window: &WindowHandle,
    ) -> Result<Option<WindowHandle>, Self::Error>;

    /// Current title of a window.
    fn window_title(&self, window: &WindowHandle) -> Result<String, Self::Error>;

    /// Move the pointer to a virtual-desktop point.
    fn move_cursor_to(&self, point: Point) -> Result<(), Self::Error>;

    /// Bounding rectangle spanning all connected displays.
    fn virtual_desktop_bounds(&self) -> Result<Rect, Self::Error>;
}

//  Hotkey backend

/// A source of global hotkey triggers.
///
/// Implementations register a fixed set of key combinations with the
/// platform's global-hotkey facility, then deliver each press as an index
/// into that registration slice.
///
/// # Contract
///
/// * [`register`](HotkeyBackend::register) is called exactly once, before
///   [`run`](HotkeyBackend::run), with a duplicate-free combination list.
///   Registration may fail (a combination already grabbed elsewhere, no
///   hotkey facility available); that failure aborts the listener start,
///   it does not crash anything.
/// * [`run`](HotkeyBackend::run) **blocks** until `stop` becomes true or an
///   unrecoverable error occurs, invoking `on_trigger(index)` on the
///   calling thread for every delivered press.  Actions therefore execute
///   on the listener's own thread, never on the thread that started it.
/// * Implementations must be [`Send`] so they can run on a dedicated
///   thread.
pub trait HotkeyBackend: Send + 'static {
    /// The error type produced by this backend.
    type Error: std::error::Error + Send + 'static;

    /// Register every combination with the platform.
    fn register(&mut self, combos: &[KeyCombo]) -> Result<(), Self::Error>;

    /// Block, delivering presses to `on_trigger` until `stop` is set.
    fn run(
        &mut self,
        stop: &AtomicBool,
        on_trigger: &mut dyn FnMut(usize),
    ) -> Result<(), Self::Error>;
}

//  Action execution

/// Executes a bound [`Action`].
///
/// The dispatcher resolves a trigger to its action and hands it to the
/// executor on the listener thread.  Execution never returns an error:
/// every failure mode (unknown layout, platform call failure) is reported
/// through logging and swallowed, so one bad trigger cannot take the
/// listener down.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, action: &Action);
}

//  Status notifications

/// How important a status notification is, for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A status-change notification emitted by the dispatcher on every
/// listener state transition.
///
/// The dispatcher holds an `Option<mpsc::Sender<StatusNote>>`.  Any
/// listener (a control panel, a debug logger, the daemon's main loop) can
/// receive these independently; they are for display only and carry no
/// control-flow meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNote {
    pub severity: Severity,
    pub message: String,
}

impl StatusNote {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

//  Tests
