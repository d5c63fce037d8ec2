//! Actions and hotkey vocabulary shared across the crate.
//!
//! A [`KeyCombo`] names a global keyboard shortcut ("ctrl+alt+1"); an
//! [`Action`] is what happens when one fires.  The binding table is an
//! immutable list of `(KeyCombo, Action)` pairs built once at startup;
//! triggers are dispatched by index lookup into that table rather than by
//! a closure per entry.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A point on the virtual desktop, in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Wire format for a point: accepts `[x, y]` or `{"x": .., "y": ..}`.
impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Point;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "array [x, y] or object {{x, y}}")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Point, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let x = seq
                    .next_element()?
                    .ok_or_else(|| DeError::invalid_length(0, &self))?;
                let y = seq
                    .next_element()?
                    .ok_or_else(|| DeError::invalid_length(1, &self))?;
                if seq.next_element::<i32>()?.is_some() {
                    return Err(DeError::custom("point has more than two coordinates"));
                }
                Ok(Point { x, y })
            }
            fn visit_map<A>(self, mut map: A) -> Result<Point, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut x = None;
                let mut y = None;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "x" => x = Some(map.next_value()?),
                        "y" => y = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(Point {
                    x: x.ok_or_else(|| DeError::missing_field("x"))?,
                    y: y.ok_or_else(|| DeError::missing_field("y"))?,
                })
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// What a hotkey does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move the cursor to the point and activate the window beneath it.
    MoveCursorTo(Point),
    /// Apply the named layout to the currently eligible windows.
    ApplyLayout(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::MoveCursorTo(p) => write!(f, "cursor {}", p),
            Action::ApplyLayout(name) => write!(f, "layout {:?}", name),
        }
    }
}

/// Wire format for an action: a single-key object, either
/// `{"layout": "<name>"}` or `{"cursor": [x, y]}`.
impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Action;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "object {{\"layout\": name}} or {{\"cursor\": [x, y]}}")
            }
            fn visit_map<A>(self, mut map: A) -> Result<Action, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let key: String = map
                    .next_key()?
                    .ok_or_else(|| DeError::custom("action object is empty"))?;
                let action = match key.as_str() {
                    "layout" => Action::ApplyLayout(map.next_value()?),
                    "cursor" => Action::MoveCursorTo(map.next_value()?),
                    other => {
                        return Err(DeError::custom(format!(
                            "unknown action kind: {:?} (expected \"layout\" or \"cursor\")",
                            other
                        )))
                    }
                };
                if map.next_key::<String>()?.is_some() {
                    return Err(DeError::custom("action object has more than one key"));
                }
                Ok(action)
            }
        }
        deserializer.deserialize_map(V)
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Action::ApplyLayout(name) => map.serialize_entry("layout", name)?,
            Action::MoveCursorTo(p) => map.serialize_entry("cursor", &[p.x, p.y])?,
        }
        map.end()
    }
}

//  Key combinations

/// Error from parsing a key-combination string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ComboParseError {
    #[error("empty key combination")]
    Empty,
    #[error("key combination {0:?} names only modifiers")]
    NoKey(String),
    #[error("key combination {0:?} names more than one non-modifier key")]
    MultipleKeys(String),
    #[error("key combination {0:?} contains an empty token")]
    EmptyToken(String),
}

/// A parsed global keyboard shortcut.
///
/// Parsing is case-insensitive and modifier-order-insensitive, so
/// `"Ctrl+Alt+L"` and `"alt+ctrl+l"` compare equal.  The key token is kept
/// as a normalized lowercase string; whether the token names a key the
/// hotkey backend can actually register is the backend's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub superkey: bool,
    /// Normalized (lowercase) key token, e.g. `"l"`, `"1"`, `"f5"`.
    pub key: String,
}

impl KeyCombo {
    /// Parse a combination string such as `"ctrl+alt+1"`.
    ///
    /// Accepted modifier spellings: `ctrl`/`control`, `alt`, `shift`,
    /// `super`/`win`/`meta`/`cmd`.  Exactly one non-modifier token must
    /// remain, and it becomes the key.
    pub fn parse(s: &str) -> Result<Self, ComboParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ComboParseError::Empty);
        }

        let mut combo = KeyCombo {
            ctrl: false,
            alt: false,
            shift: false,
            superkey: false,
            key: String::new(),
        };

        for token in trimmed.split('+') {
            let token = token.trim().to_ascii_lowercase();
            match token.as_str() {
                "" => return Err(ComboParseError::EmptyToken(s.to_string())),
                "ctrl" | "control" => combo.ctrl = true,
                "alt" => combo.alt = true,
                "shift" => combo.shift = true,
                "super" | "win" | "meta" | "cmd" => combo.superkey = true,
                _ => {
                    if !combo.key.is_empty() {
                        return Err(ComboParseError::MultipleKeys(s.to_string()));
                    }
                    combo.key = token;
                }
            }
        }

        if combo.key.is_empty() {
            return Err(ComboParseError::NoKey(s.to_string()));
        }
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        if self.superkey {
            write!(f, "super+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl<'de> Deserialize<'de> for KeyCombo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        KeyCombo::parse(&s).map_err(DeError::custom)
    }
}

impl Serialize for KeyCombo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

//  Tests
