//! Key id → position lookup for the animated device.
//!
//! Scripts see keys either by id (`esc`, `f1`, `a`) or by integer position.
//! The host supplies the table; [`KeyMap::default_layout`] provides a
//! full-size ANSI grid for use without a device description.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Horizontal and vertical distance between neighbouring keys
pub const KEY_PITCH: i32 = 12;

/// Position of one key, in layout units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct KeyPos {
    pub x: i32,
    pub y: i32,
}

impl KeyPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for KeyPos {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<KeyPos> for [i32; 2] {
    fn from(pos: KeyPos) -> Self {
        [pos.x, pos.y]
    }
}

/// Key positions by key id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    keys: BTreeMap<String, KeyPos>,
}

/// ANSI full-size layout, one row per line; `""` leaves a one-key gap
const ANSI_LAYOUT: &[&[&str]] = &[
    &[
        "esc", "", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12",
        "prtscn", "scroll", "pause",
    ],
    &[
        "grave", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "minus", "equal", "bspace",
        "ins", "home", "pgup", "numlock", "numslash", "numstar", "numminus",
    ],
    &[
        "tab", "q", "w", "e", "r", "t", "y", "u", "i", "o", "p", "lbrace", "rbrace", "bslash",
        "del", "end", "pgdn", "num7", "num8", "num9", "numplus",
    ],
    &[
        "caps", "a", "s", "d", "f", "g", "h", "j", "k", "l", "colon", "quote", "enter", "", "",
        "", "", "num4", "num5", "num6",
    ],
    &[
        "lshift", "z", "x", "c", "v", "b", "n", "m", "comma", "dot", "slash", "rshift", "", "",
        "", "up", "", "num1", "num2", "num3", "numenter",
    ],
    &[
        "lctrl", "lwin", "lalt", "space", "ralt", "rwin", "rmenu", "rctrl", "", "", "", "", "",
        "", "left", "down", "right", "num0", "", "numdot",
    ],
];

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in full-size keyboard grid.
    pub fn default_layout() -> Self {
        let mut map = Self::new();
        for (row, keys) in ANSI_LAYOUT.iter().enumerate() {
            for (col, key) in keys.iter().enumerate() {
                if key.is_empty() {
                    continue;
                }
                map.insert(*key, col as i32 * KEY_PITCH, row as i32 * KEY_PITCH);
            }
        }
        map
    }

    pub fn insert(&mut self, key: impl Into<String>, x: i32, y: i32) {
        self.keys.insert(key.into(), KeyPos::new(x, y));
    }

    /// Position of a key, or `None` if the device has no such key.
    pub fn get(&self, key: &str) -> Option<KeyPos> {
        self.keys.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// All key ids, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, KeyPos)> for KeyMap {
    fn from_iter<T: IntoIterator<Item = (K, KeyPos)>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().map(|(k, p)| (k.into(), p)).collect(),
        }
    }
}

/// Parse a comma-separated key list such as `"w,a,s,d"`.
///
/// Returns the unknown ids as the error so the caller can report them.
pub fn parse_key_list(keymap: &KeyMap, list: &str) -> Result<Vec<String>, Vec<String>> {
    let keys: Vec<String> = list
        .split(',')
        .map(|k| k.trim().to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let unknown: Vec<String> = keys.iter().filter(|k| !keymap.contains(k)).cloned().collect();
    if unknown.is_empty() {
        Ok(keys)
    } else {
        Err(unknown)
    }
}
