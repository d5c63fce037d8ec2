//! Entry point for the **hyprzone** daemon.
//!
//! The default invocation loads the configuration, starts the hotkey
//! listener, and then sits on the status channel until the listener ends.
//! Two one-shot verbs skip the listener entirely:
//!
//! * `hyprzone apply <layout>` applies a layout once and exits,
//! * `hyprzone windows` prints the current eligible-window snapshot.

use hyprzone::config::Config;
use hyprzone::dispatcher::{HotkeyDispatcher, ListenerState};
use hyprzone::engine::LayoutEngine;
use hyprzone::filter::eligible_windows;
use hyprzone::hotkeys::global::GlobalHotkeySource;
use hyprzone::hyprland::platform::HyprlandPlatform;
use hyprzone::runner::ActionRunner;
use hyprzone::traits::WindowPlatform;
use hyprzone::zone::Rect;
use log::{error, info, warn};
use std::sync::{mpsc, Arc};

/// Fallback desktop bounds when the platform cannot be queried at
/// startup (only used to derive the default configuration).
const FALLBACK_DESKTOP: Rect = Rect {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprzone`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("hyprzone")
}

/// Try to load the config from `$XDG_CONFIG_HOME/hyprzone/config.json`,
/// falling back to defaults derived from the desktop bounds.
fn load_config(desktop: Rect) -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default_for(desktop)
        }
    }
}

/// One non-fatal platform probe at startup.  Core behavior is identical
/// whether or not it succeeds; a failure just tells the user early that
/// hotkeys will have nothing to act on.
fn probe_platform(platform: &HyprlandPlatform) -> Rect {
    match platform.virtual_desktop_bounds() {
        Ok(bounds) => {
            info!("virtual desktop: {}", bounds);
            bounds
        }
        Err(e) => {
            warn!("platform probe failed ({}); window actions may do nothing", e);
            FALLBACK_DESKTOP
        }
    }
}

fn usage() -> ! {
    eprintln!("usage: hyprzone [apply <layout> | windows]");
    std::process::exit(2);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let platform = Arc::new(HyprlandPlatform::new());
    let desktop = probe_platform(&platform);
    let config = load_config(desktop);

    let layouts = match config.layout_table() {
        Ok(layouts) => layouts,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let engine = LayoutEngine::new(
        platform.clone(),
        layouts,
        config.filter.clone(),
        config.timing.restore_settle(),
    );

    match args.first().map(String::as_str) {
        None => run_daemon(engine, platform, &config),
        Some("apply") => match args.get(1) {
            Some(name) => run_apply(&engine, name),
            None => usage(),
        },
        Some("windows") => run_windows(&platform, &config),
        Some(_) => usage(),
    }
}

/// Normal daemon mode: register bindings, start the listener, and watch
/// status notes until it ends.
fn run_daemon(engine: LayoutEngine<HyprlandPlatform>, platform: Arc<HyprlandPlatform>, config: &Config) {
    let bindings = match config.bindings() {
        Ok(bindings) => bindings,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if bindings.is_empty() {
        error!("no hotkeys configured, nothing to do");
        std::process::exit(1);
    }

    let runner = Arc::new(ActionRunner::new(
        engine,
        platform,
        config.timing.cursor_settle(),
    ));
    let mut dispatcher = HotkeyDispatcher::new(
        GlobalHotkeySource::new(),
        runner,
        config.timing.stop_deadline(),
    );

    let (status_tx, status_rx) = mpsc::channel();
    dispatcher.set_status_sink(status_tx);

    if let Err(e) = dispatcher.register_bindings(bindings) {
        error!("{}", e);
        std::process::exit(1);
    }
    if let Err(e) = dispatcher.start() {
        error!("{}", e);
        std::process::exit(1);
    }

    // Status notes are already logged by the dispatcher; the receive loop
    // only exists to keep the process alive and to notice the listener
    // ending on its own.
    for _note in status_rx {
        if dispatcher.state() == ListenerState::Stopped {
            break;
        }
    }
    info!("hotkey listener ended, exiting");
}

/// `hyprzone apply <layout>`: apply one layout and exit.
fn run_apply(engine: &LayoutEngine<HyprlandPlatform>, name: &str) {
    match engine.apply(name) {
        Ok(report) => {
            println!(
                "arranged {} of {} eligible windows into {} zones",
                report.windows_arranged, report.windows_eligible, report.zones_total
            );
        }
        Err(e) => {
            error!("{}", e);
            let names = engine.layout_names();
            if !names.is_empty() {
                eprintln!("configured layouts: {}", names.join(", "));
            }
            std::process::exit(1);
        }
    }
}

/// `hyprzone windows`: print the current eligibility snapshot.
fn run_windows(platform: &HyprlandPlatform, config: &Config) {
    let records = eligible_windows(platform, &config.filter);
    if records.is_empty() {
        println!("no eligible windows");
        return;
    }
    for record in records {
        println!("{}  {}", record.handle, record.title);
    }
}
