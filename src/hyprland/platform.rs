//! [`WindowPlatform`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! avoiding any shell command invocation or third-party crate for socket
//! discovery.
//!
//! # Concept mapping
//!
//! Hyprland has no native minimize or tool-window flag, so this backend
//! maps the adapter vocabulary onto the closest compositor concepts:
//!
//! * *visible* = client is mapped and not hidden,
//! * *minimized* = client parked on a special workspace (negative
//!   workspace id), the common minimize idiom on Hyprland,
//! * *tool window* = pinned client (overlay/palette style surfaces),
//! * *window at point* = the client under the point with the lowest
//!   `focusHistoryID`, an approximation of the top of the Z-order,
//! * *top-level ancestor* = the window itself (every Hyprland client is
//!   top-level).

use crate::action::Point;
use crate::traits::{WindowDesc, WindowHandle, WindowPlatform};
use crate::zone::Rect;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Hyprland-backed window platform.
///
/// All communication happens over Hyprland's IPC socket
/// (`$XDG_RUNTIME_DIR/hypr/<instance>/.socket.sock`).  No child processes
/// are spawned, and no connection is held open between calls.
pub struct HyprlandPlatform;

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandError(String);

impl Default for HyprlandPlatform {
    fn default() -> Self {
        Self
    }
}

impl HyprlandPlatform {
    /// Create a new handle.
    ///
    /// No connection is opened eagerly; each method call opens a
    /// short-lived IPC request.
    pub fn new() -> Self {
        Self
    }

    /// Fetch and decode the full client list.
    fn clients(&self) -> Result<Vec<ClientJson>, HyprlandError> {
        let json = ipc_json("clients")?;
        serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse clients: {}", e)))
    }

    /// Find one client by window address.
    fn client(&self, window: &WindowHandle) -> Result<Option<ClientJson>, HyprlandError> {
        Ok(self.clients()?.into_iter().find(|c| c.address == window.0))
    }

    /// The id of the workspace currently shown on the focused monitor.
    fn active_workspace_id(&self) -> Result<i64, HyprlandError> {
        let json = ipc_json("activeworkspace")?;
        let ws: WorkspaceJson = serde_json::from_str(&json)
            .map_err(|e| HyprlandError(format!("parse activeworkspace: {}", e)))?;
        Ok(ws.id)
    }
}

//  Direct Hyprland IPC helpers

/// Resolve the Hyprland command socket path.
///
/// Hyprland ≥ 0.40 stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
fn socket_path() -> Result<PathBuf, HyprlandError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket.sock",
        runtime_dir, his
    )))
}

/// Send a raw command to the Hyprland command socket and return the
/// response as a string.
fn ipc_request(command: &str) -> Result<String, HyprlandError> {
    let path = socket_path()?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and return the raw JSON string.
fn ipc_json(data_command: &str) -> Result<String, HyprlandError> {
    ipc_request(&format!("j/{}", data_command))
}

/// Send a dispatch command and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandError> {
    let response = ipc_request(&format!("/dispatch {}", args))?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandError(format!("dispatch error: {}", response)))
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of one entry of the JSON array returned by `j/clients`.
#[derive(Debug, Deserialize)]
struct ClientJson {
    address: String,
    #[serde(default)]
    mapped: bool,
    #[serde(default)]
    hidden: bool,
    at: [i32; 2],
    size: [i32; 2],
    workspace: WorkspaceRefJson,
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    pinned: bool,
    #[serde(default, rename = "focusHistoryID")]
    focus_history_id: i64,
}

/// The `workspace` sub-object of a client entry.
#[derive(Debug, Deserialize)]
struct WorkspaceRefJson {
    id: i64,
}

/// Subset of the JSON object returned by `j/activeworkspace`.
#[derive(Debug, Deserialize)]
struct WorkspaceJson {
    id: i64,
}

/// Subset of the JSON object returned by `j/activewindow`.
#[derive(Debug, Deserialize)]
struct ActiveWindowJson {
    address: String,
}

/// Subset of one entry of the JSON array returned by `j/monitors`.
#[derive(Debug, Deserialize)]
struct MonitorJson {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Translate one client entry into the adapter vocabulary.
fn client_to_desc(client: ClientJson) -> WindowDesc {
    let rect = Rect::new(client.at[0], client.at[1], client.size[0], client.size[1]);
    WindowDesc {
        handle: WindowHandle(client.address),
        title: client.title,
        class_name: client.class,
        visible: client.mapped && !client.hidden,
        minimized: client.workspace.id < 0,
        tool_window: client.pinned,
        rect: Some(rect),
    }
}

/// Bounding rectangle spanning every monitor.
fn union_bounds(monitors: &[MonitorJson]) -> Option<Rect> {
    let first = monitors.first()?;
    let mut left = first.x;
    let mut top = first.y;
    let mut right = first.x + first.width;
    let mut bottom = first.y + first.height;
    for m in &monitors[1..] {
        left = left.min(m.x);
        top = top.min(m.y);
        right = right.max(m.x + m.width);
        bottom = bottom.max(m.y + m.height);
    }
    Some(Rect::new(left, top, right - left, bottom - top))
}

//  WindowPlatform implementation

impl WindowPlatform for HyprlandPlatform {
    type Error = HyprlandError;

    fn enumerate_windows(&self) -> Result<Vec<WindowDesc>, Self::Error> {
        Ok(self.clients()?.into_iter().map(client_to_desc).collect())
    }

    fn foreground_window(&self) -> Result<Option<WindowHandle>, Self::Error> {
        let json = ipc_json("activewindow")?;
        // Hyprland returns an empty object `{}` when no window is focused.
        if json.trim() == "{}" {
            return Ok(None);
        }
        let w: ActiveWindowJson = serde_json::from_str(&json)
            .map_err(|e| HyprlandError(format!("parse activewindow: {}", e)))?;
        Ok(Some(WindowHandle(w.address)))
    }

    fn restore_window(&self, window: &WindowHandle) -> Result<(), Self::Error> {
        let Some(client) = self.client(window)? else {
            return Err(HyprlandError(format!("no such window: {}", window)));
        };
        // Only windows parked on a special workspace need restoring; for
        // everything else this is a no-op.
        if client.workspace.id < 0 {
            let target = self.active_workspace_id()?;
            ipc_dispatch(&format!(
                "movetoworkspacesilent {},address:{}",
                target, window
            ))?;
        }
        Ok(())
    }

    fn set_bounds_and_raise(&self, window: &WindowHandle, rect: Rect) -> Result<(), Self::Error> {
        // Tiled clients ignore pixel geometry; float the window first.
        ipc_dispatch(&format!("setfloating address:{}", window))?;
        ipc_dispatch(&format!(
            "movewindowpixel exact {} {},address:{}",
            rect.x, rect.y, window
        ))?;
        ipc_dispatch(&format!(
            "resizewindowpixel exact {} {},address:{}",
            rect.width, rect.height, window
        ))?;
        ipc_dispatch(&format!("alterzorder top,address:{}", window))
    }

    fn request_foreground(&self, window: &WindowHandle) -> Result<bool, Self::Error> {
        let response = ipc_request(&format!("/dispatch focuswindow address:{}", window))?;
        // A non-"ok" response means the compositor refused the focus
        // change; the request itself still went through.
        Ok(response.trim() == "ok")
    }

    fn window_at_point(&self, point: Point) -> Result<Option<WindowHandle>, Self::Error> {
        let hit = self
            .clients()?
            .into_iter()
            .filter(|c| c.mapped && !c.hidden && c.workspace.id >= 0)
            .filter(|c| Rect::new(c.at[0], c.at[1], c.size[0], c.size[1]).contains(point))
            .min_by_key(|c| c.focus_history_id);
        Ok(hit.map(|c| WindowHandle(c.address)))
    }

    fn top_level_ancestor(
        &self,
        window: &WindowHandle,
    ) -> Result<Option<WindowHandle>, Self::Error> {
        // Hyprland clients are all top-level; the ancestor of a live
        // window is the window itself.
        Ok(self.client(window)?.map(|c| WindowHandle(c.address)))
    }

    fn window_title(&self, window: &WindowHandle) -> Result<String, Self::Error> {
        match self.client(window)? {
            Some(client) => Ok(client.title),
            None => Err(HyprlandError(format!("no such window: {}", window))),
        }
    }

    fn move_cursor_to(&self, point: Point) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("movecursor {} {}", point.x, point.y))
    }

    fn virtual_desktop_bounds(&self) -> Result<Rect, Self::Error> {
        let json = ipc_json("monitors")?;
        let monitors: Vec<MonitorJson> = serde_json::from_str(&json)
            .map_err(|e| HyprlandError(format!("parse monitors: {}", e)))?;
        union_bounds(&monitors).ok_or_else(|| HyprlandError("no monitors reported".into()))
    }
}

//  Tests
