// Rekeyrs Virtual Key Type
// Windows virtual-key codes and their script-facing names

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A Windows virtual-key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VirtualKey(pub u16);

/// Name/code pairs for every key a profile can refer to.
///
/// See https://learn.microsoft.com/en-us/windows/win32/inputdev/virtual-key-codes
const VKEY_TABLE: &[(&str, u16)] = &[
    ("backspace", 0x08),
    ("tab", 0x09),
    ("clear", 0x0C),
    ("enter", 0x0D),
    ("shift", 0x10),
    ("ctrl", 0x11),
    ("alt", 0x12),
    ("pause", 0x13),
    ("caps_lock", 0x14),
    ("esc", 0x1B),
    ("space", 0x20),
    ("page_up", 0x21),
    ("page_down", 0x22),
    ("end", 0x23),
    ("home", 0x24),
    ("left", 0x25),
    ("up", 0x26),
    ("right", 0x27),
    ("down", 0x28),
    ("select", 0x29),
    ("print", 0x2A),
    ("execute", 0x2B),
    ("print_screen", 0x2C),
    ("insert", 0x2D),
    ("delete", 0x2E),
    ("help", 0x2F),
    ("0", 0x30),
    ("1", 0x31),
    ("2", 0x32),
    ("3", 0x33),
    ("4", 0x34),
    ("5", 0x35),
    ("6", 0x36),
    ("7", 0x37),
    ("8", 0x38),
    ("9", 0x39),
    ("a", 0x41),
    ("b", 0x42),
    ("c", 0x43),
    ("d", 0x44),
    ("e", 0x45),
    ("f", 0x46),
    ("g", 0x47),
    ("h", 0x48),
    ("i", 0x49),
    ("j", 0x4A),
    ("k", 0x4B),
    ("l", 0x4C),
    ("m", 0x4D),
    ("n", 0x4E),
    ("o", 0x4F),
    ("p", 0x50),
    ("q", 0x51),
    ("r", 0x52),
    ("s", 0x53),
    ("t", 0x54),
    ("u", 0x55),
    ("v", 0x56),
    ("w", 0x57),
    ("x", 0x58),
    ("y", 0x59),
    ("z", 0x5A),
    ("windows", 0x5B),
    ("rwindows", 0x5C),
    ("sleep", 0x5F),
    ("numpad0", 0x60),
    ("numpad1", 0x61),
    ("numpad2", 0x62),
    ("numpad3", 0x63),
    ("numpad4", 0x64),
    ("numpad5", 0x65),
    ("numpad6", 0x66),
    ("numpad7", 0x67),
    ("numpad8", 0x68),
    ("numpad9", 0x69),
    ("multiply", 0x6A),
    ("add", 0x6B),
    ("separator", 0x6C),
    ("subtract", 0x6D),
    ("decimal", 0x6E),
    ("divide", 0x6F),
    ("f1", 0x70),
    ("f2", 0x71),
    ("f3", 0x72),
    ("f4", 0x73),
    ("f5", 0x74),
    ("f6", 0x75),
    ("f7", 0x76),
    ("f8", 0x77),
    ("f9", 0x78),
    ("f10", 0x79),
    ("f11", 0x7A),
    ("f12", 0x7B),
    ("f13", 0x7C),
    ("f14", 0x7D),
    ("f15", 0x7E),
    ("f16", 0x7F),
    ("f17", 0x80),
    ("f18", 0x81),
    ("f19", 0x82),
    ("f20", 0x83),
    ("f21", 0x84),
    ("f22", 0x85),
    ("f23", 0x86),
    ("f24", 0x87),
    ("num_lock", 0x90),
    ("scroll_lock", 0x91),
    ("lshift", 0xA0),
    ("rshift", 0xA1),
    ("lcontrol", 0xA2),
    ("rcontrol", 0xA3),
    ("lalt", 0xA4),
    ("ralt", 0xA5),
    ("browser_back", 0xA6),
    ("browser_forward", 0xA7),
    ("browser_refresh", 0xA8),
    ("browser_stop", 0xA9),
    ("browser_search", 0xAA),
    ("browser_favorites", 0xAB),
    ("browser_home", 0xAC),
    ("volume_mute", 0xAD),
    ("volume_down", 0xAE),
    ("volume_up", 0xAF),
    ("media_next_track", 0xB0),
    ("media_prev_track", 0xB1),
    ("media_stop", 0xB2),
    ("media_play_pause", 0xB3),
    ("launch_mail", 0xB4),
    ("launch_media_select", 0xB5),
    ("launch_app_1", 0xB6),
    ("launch_app_2", 0xB7),
    ("play", 0xFA),
    ("zoom", 0xFB),
];

struct VkeyLookup {
    by_name: HashMap<&'static str, u16>,
    by_code: HashMap<u16, &'static str>,
}

fn lookup() -> &'static VkeyLookup {
    static LOOKUP: OnceLock<VkeyLookup> = OnceLock::new();
    LOOKUP.get_or_init(|| {
        let mut by_name = HashMap::with_capacity(VKEY_TABLE.len());
        let mut by_code = HashMap::with_capacity(VKEY_TABLE.len());
        for &(name, code) in VKEY_TABLE {
            by_name.insert(name, code);
            by_code.insert(code, name);
        }
        VkeyLookup { by_name, by_code }
    })
}

/// Table name for a virtual-key code
pub fn vkey_name(code: u16) -> Option<&'static str> {
    lookup().by_code.get(&code).copied()
}

/// Resolve a key name (case-insensitive) or a `0x..` hex literal
pub fn vkey_from_name(name: &str) -> Option<VirtualKey> {
    let trimmed = name.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u16::from_str_radix(hex, 16).ok().map(VirtualKey);
    }
    lookup()
        .by_name
        .get(trimmed.to_ascii_lowercase().as_str())
        .copied()
        .map(VirtualKey)
}

/// Character produced by a digit, numpad digit or letter key
pub fn char_from_vkey(key: VirtualKey) -> Option<char> {
    let code = key.code();
    match code {
        0x30..=0x39 => char::from_u32('0' as u32 + (code - 0x30) as u32),
        0x60..=0x69 => char::from_u32('0' as u32 + (code - 0x60) as u32),
        0x41..=0x5A => char::from_u32('a' as u32 + (code - 0x41) as u32),
        _ => None,
    }
}

impl VirtualKey {
    pub const ALT: VirtualKey = VirtualKey(0x12);
    pub const NUMPAD0: VirtualKey = VirtualKey(0x60);
    pub const NUM_LOCK: VirtualKey = VirtualKey(0x90);

    /// Numpad digit key for `digit` (0-9)
    pub fn numpad(digit: u8) -> Option<VirtualKey> {
        (digit <= 9).then(|| VirtualKey(Self::NUMPAD0.0 + digit as u16))
    }

    pub fn code(self) -> u16 {
        self.0
    }

    /// Table name of this key, if it has one
    pub fn name(self) -> Option<&'static str> {
        vkey_name(self.0)
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

impl FromStr for VirtualKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        vkey_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}
