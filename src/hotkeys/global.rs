//! [`HotkeyBackend`] implementation on top of the `global-hotkey` crate.
//!
//! Registers every configured combination with the OS global-hotkey
//! facility and polls the crate's static event channel, translating each
//! key-down event back into the index of the combination that produced
//! it.  Registration fails when a combination is already grabbed by
//! another process or when no hotkey facility is reachable; that failure
//! is surfaced to the dispatcher, which reports it and keeps the process
//! alive.

use crate::action::KeyCombo;
use crate::traits::HotkeyBackend;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Errors from the global-hotkey backend.
#[derive(Debug, thiserror::Error)]
pub enum GlobalHotkeyError {
    /// The hotkey facility could not be initialized at all.
    #[error("hotkey facility unavailable: {0}")]
    Init(String),

    /// A combination names a key this backend cannot express.
    #[error("unsupported key in combination {0:?}")]
    UnsupportedKey(String),

    /// The platform refused one combination (typically already grabbed).
    #[error("could not register {combo:?}: {reason}")]
    Register { combo: String, reason: String },
}

/// Hotkey source backed by the OS global-hotkey facility.
pub struct GlobalHotkeySource {
    manager: Option<GlobalHotKeyManager>,
    /// Registered hotkeys, parallel to the combination slice given to
    /// [`register`](HotkeyBackend::register).
    hotkeys: Vec<HotKey>,
    /// How often the run loop wakes up to check the stop flag.
    poll: Duration,
}

impl Default for GlobalHotkeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalHotkeySource {
    pub fn new() -> Self {
        Self {
            manager: None,
            hotkeys: Vec::new(),
            poll: Duration::from_millis(100),
        }
    }
}

impl HotkeyBackend for GlobalHotkeySource {
    type Error = GlobalHotkeyError;

    fn register(&mut self, combos: &[KeyCombo]) -> Result<(), Self::Error> {
        let manager = GlobalHotKeyManager::new().map_err(|e| GlobalHotkeyError::Init(e.to_string()))?;

        let mut hotkeys = Vec::with_capacity(combos.len());
        for combo in combos {
            let hotkey = hotkey_for(combo)
                .ok_or_else(|| GlobalHotkeyError::UnsupportedKey(combo.to_string()))?;
            manager
                .register(hotkey)
                .map_err(|e| GlobalHotkeyError::Register {
                    combo: combo.to_string(),
                    reason: e.to_string(),
                })?;
            debug!("registered global hotkey {}", combo);
            hotkeys.push(hotkey);
        }

        self.manager = Some(manager);
        self.hotkeys = hotkeys;
        Ok(())
    }

    fn run(
        &mut self,
        stop: &AtomicBool,
        on_trigger: &mut dyn FnMut(usize),
    ) -> Result<(), Self::Error> {
        let receiver = GlobalHotKeyEvent::receiver();
        while !stop.load(Ordering::SeqCst) {
            let event = match receiver.recv_timeout(self.poll) {
                Ok(event) => event,
                Err(_) => continue,
            };
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match self.hotkeys.iter().position(|hk| hk.id() == event.id) {
                Some(index) => on_trigger(index),
                None => debug!("hotkey event for unknown id {}", event.id),
            }
        }

        // Unregister explicitly so the keys are free immediately, not
        // only when the manager happens to be dropped.
        if let Some(manager) = self.manager.take() {
            for hotkey in self.hotkeys.drain(..) {
                if let Err(e) = manager.unregister(hotkey) {
                    warn!("unregister of hotkey {} failed: {}", hotkey.id(), e);
                }
            }
        }
        Ok(())
    }
}

/// Translate a parsed combination into a `global-hotkey` registration.
///
/// Returns `None` when the key token has no corresponding [`Code`].
fn hotkey_for(combo: &KeyCombo) -> Option<HotKey> {
    let mut mods = Modifiers::empty();
    if combo.ctrl {
        mods |= Modifiers::CONTROL;
    }
    if combo.alt {
        mods |= Modifiers::ALT;
    }
    if combo.shift {
        mods |= Modifiers::SHIFT;
    }
    if combo.superkey {
        mods |= Modifiers::META;
    }
    let mods = if mods.is_empty() { None } else { Some(mods) };
    Some(HotKey::new(mods, code_for(&combo.key)?))
}

/// Map a normalized key token to a key code.
fn code_for(token: &str) -> Option<Code> {
    // Single letters and digits first, then named keys.
    if token.len() == 1 {
        let c = token.chars().next()?;
        let code = match c {
            'a' => Code::KeyA,
            'b' => Code::KeyB,
            'c' => Code::KeyC,
            'd' => Code::KeyD,
            'e' => Code::KeyE,
            'f' => Code::KeyF,
            'g' => Code::KeyG,
            'h' => Code::KeyH,
            'i' => Code::KeyI,
            'j' => Code::KeyJ,
            'k' => Code::KeyK,
            'l' => Code::KeyL,
            'm' => Code::KeyM,
            'n' => Code::KeyN,
            'o' => Code::KeyO,
            'p' => Code::KeyP,
            'q' => Code::KeyQ,
            'r' => Code::KeyR,
            's' => Code::KeyS,
            't' => Code::KeyT,
            'u' => Code::KeyU,
            'v' => Code::KeyV,
            'w' => Code::KeyW,
            'x' => Code::KeyX,
            'y' => Code::KeyY,
            'z' => Code::KeyZ,
            '0' => Code::Digit0,
            '1' => Code::Digit1,
            '2' => Code::Digit2,
            '3' => Code::Digit3,
            '4' => Code::Digit4,
            '5' => Code::Digit5,
            '6' => Code::Digit6,
            '7' => Code::Digit7,
            '8' => Code::Digit8,
            '9' => Code::Digit9,
            '-' => Code::Minus,
            '=' => Code::Equal,
            ',' => Code::Comma,
            '.' => Code::Period,
            ';' => Code::Semicolon,
            '/' => Code::Slash,
            '\\' => Code::Backslash,
            '`' => Code::Backquote,
            _ => return None,
        };
        return Some(code);
    }
    let code = match token {
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "escape" | "esc" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        _ => return None,
    };
    Some(code)
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_digits_and_function_keys_map() {
        assert_eq!(code_for("a"), Some(Code::KeyA));
        assert_eq!(code_for("z"), Some(Code::KeyZ));
        assert_eq!(code_for("0"), Some(Code::Digit0));
        assert_eq!(code_for("9"), Some(Code::Digit9));
        assert_eq!(code_for("f1"), Some(Code::F1));
        assert_eq!(code_for("f12"), Some(Code::F12));
    }

    #[test]
    fn named_keys_map() {
        assert_eq!(code_for("space"), Some(Code::Space));
        assert_eq!(code_for("esc"), Some(Code::Escape));
        assert_eq!(code_for("escape"), Some(Code::Escape));
        assert_eq!(code_for("pageup"), Some(Code::PageUp));
        assert_eq!(code_for("left"), Some(Code::ArrowLeft));
    }

    #[test]
    fn unknown_tokens_do_not_map() {
        assert_eq!(code_for("f13"), None);
        assert_eq!(code_for("meh"), None);
        assert_eq!(code_for("ä"), None);
    }

    #[test]
    fn hotkey_carries_all_modifiers() {
        let combo = KeyCombo::parse("ctrl+alt+shift+super+k").unwrap();
        let a = hotkey_for(&combo).unwrap();
        let b = HotKey::new(
            Some(Modifiers::CONTROL | Modifiers::ALT | Modifiers::SHIFT | Modifiers::META),
            Code::KeyK,
        );
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn bare_key_has_no_modifiers() {
        let combo = KeyCombo::parse("f5").unwrap();
        let a = hotkey_for(&combo).unwrap();
        let b = HotKey::new(None, Code::F5);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn unsupported_key_yields_none() {
        let combo = KeyCombo::parse("ctrl+alt+f13").unwrap();
        assert!(hotkey_for(&combo).is_none());
    }
}
