//! Platform-neutral key names and their native keycodes.
//!
//! Every named key maps to a Linux evdev keycode (`KEY_*` from
//! `linux/input-event-codes.h`, used by libei) and, where one exists, a
//! macOS virtual keycode (`kVK_*`, used by `CGEventCreateKeyboardEvent`).

use std::fmt;
use std::str::FromStr;

macro_rules! key_table {
    ($( $variant:ident => $name:literal, evdev $evdev:literal, mac $mac:expr; )*) => {
        /// A keyboard key understood by every backend.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $( $variant, )*
            /// A native keycode handed to the backend untouched
            /// (evdev on Linux, `CGKeyCode` on macOS).
            Raw(u32),
        }

        impl Key {
            /// All named keys, in table order.
            pub const NAMED: &'static [Self] = &[$( Self::$variant, )*];

            /// Canonical lower-case name, or `None` for raw codes.
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($name), )*
                    Self::Raw(_) => None,
                }
            }

            /// Linux evdev keycode.
            #[must_use]
            pub const fn to_evdev(self) -> Option<u32> {
                match self {
                    $( Self::$variant => Some($evdev), )*
                    Self::Raw(code) => Some(code),
                }
            }

            /// macOS virtual keycode, or `None` for keys Apple keyboards lack.
            #[must_use]
            #[allow(clippy::cast_possible_truncation)]
            pub const fn to_mac_keycode(self) -> Option<u16> {
                match self {
                    $( Self::$variant => $mac, )*
                    Self::Raw(code) if code <= u16::MAX as u32 => Some(code as u16),
                    Self::Raw(_) => None,
                }
            }
        }
    };
}

key_table! {
    A => "a", evdev 30, mac Some(0x00);
    B => "b", evdev 48, mac Some(0x0B);
    C => "c", evdev 46, mac Some(0x08);
    D => "d", evdev 32, mac Some(0x02);
    E => "e", evdev 18, mac Some(0x0E);
    F => "f", evdev 33, mac Some(0x03);
    G => "g", evdev 34, mac Some(0x05);
    H => "h", evdev 35, mac Some(0x04);
    I => "i", evdev 23, mac Some(0x22);
    J => "j", evdev 36, mac Some(0x26);
    K => "k", evdev 37, mac Some(0x28);
    L => "l", evdev 38, mac Some(0x25);
    M => "m", evdev 50, mac Some(0x2E);
    N => "n", evdev 49, mac Some(0x2D);
    O => "o", evdev 24, mac Some(0x1F);
    P => "p", evdev 25, mac Some(0x23);
    Q => "q", evdev 16, mac Some(0x0C);
    R => "r", evdev 19, mac Some(0x0F);
    S => "s", evdev 31, mac Some(0x01);
    T => "t", evdev 20, mac Some(0x11);
    U => "u", evdev 22, mac Some(0x20);
    V => "v", evdev 47, mac Some(0x09);
    W => "w", evdev 17, mac Some(0x0D);
    X => "x", evdev 45, mac Some(0x07);
    Y => "y", evdev 21, mac Some(0x10);
    Z => "z", evdev 44, mac Some(0x06);
    Num0 => "0", evdev 11, mac Some(0x1D);
    Num1 => "1", evdev 2, mac Some(0x12);
    Num2 => "2", evdev 3, mac Some(0x13);
    Num3 => "3", evdev 4, mac Some(0x14);
    Num4 => "4", evdev 5, mac Some(0x15);
    Num5 => "5", evdev 6, mac Some(0x17);
    Num6 => "6", evdev 7, mac Some(0x16);
    Num7 => "7", evdev 8, mac Some(0x1A);
    Num8 => "8", evdev 9, mac Some(0x1C);
    Num9 => "9", evdev 10, mac Some(0x19);
    Minus => "minus", evdev 12, mac Some(0x1B);
    Equal => "equal", evdev 13, mac Some(0x18);
    LeftBracket => "leftbracket", evdev 26, mac Some(0x21);
    RightBracket => "rightbracket", evdev 27, mac Some(0x1E);
    Backslash => "backslash", evdev 43, mac Some(0x2A);
    Semicolon => "semicolon", evdev 39, mac Some(0x29);
    Apostrophe => "apostrophe", evdev 40, mac Some(0x27);
    Grave => "grave", evdev 41, mac Some(0x32);
    Comma => "comma", evdev 51, mac Some(0x2B);
    Period => "period", evdev 52, mac Some(0x2F);
    Slash => "slash", evdev 53, mac Some(0x2C);
    Escape => "escape", evdev 1, mac Some(0x35);
    Backspace => "backspace", evdev 14, mac Some(0x33);
    Tab => "tab", evdev 15, mac Some(0x30);
    Enter => "enter", evdev 28, mac Some(0x24);
    Space => "space", evdev 57, mac Some(0x31);
    CapsLock => "capslock", evdev 58, mac Some(0x39);
    LeftShift => "shift", evdev 42, mac Some(0x38);
    RightShift => "rightshift", evdev 54, mac Some(0x3C);
    LeftControl => "control", evdev 29, mac Some(0x3B);
    RightControl => "rightcontrol", evdev 97, mac Some(0x3E);
    LeftAlt => "alt", evdev 56, mac Some(0x3A);
    RightAlt => "rightalt", evdev 100, mac Some(0x3D);
    LeftMeta => "meta", evdev 125, mac Some(0x37);
    RightMeta => "rightmeta", evdev 126, mac Some(0x36);
    F1 => "f1", evdev 59, mac Some(0x7A);
    F2 => "f2", evdev 60, mac Some(0x78);
    F3 => "f3", evdev 61, mac Some(0x63);
    F4 => "f4", evdev 62, mac Some(0x76);
    F5 => "f5", evdev 63, mac Some(0x60);
    F6 => "f6", evdev 64, mac Some(0x61);
    F7 => "f7", evdev 65, mac Some(0x62);
    F8 => "f8", evdev 66, mac Some(0x64);
    F9 => "f9", evdev 67, mac Some(0x65);
    F10 => "f10", evdev 68, mac Some(0x6D);
    F11 => "f11", evdev 87, mac Some(0x67);
    F12 => "f12", evdev 88, mac Some(0x6F);
    Home => "home", evdev 102, mac Some(0x73);
    End => "end", evdev 107, mac Some(0x77);
    PageUp => "pageup", evdev 104, mac Some(0x74);
    PageDown => "pagedown", evdev 109, mac Some(0x79);
    Insert => "insert", evdev 110, mac Some(0x72);
    Delete => "delete", evdev 111, mac Some(0x75);
    Up => "up", evdev 103, mac Some(0x7E);
    Down => "down", evdev 108, mac Some(0x7D);
    Left => "left", evdev 105, mac Some(0x7B);
    Right => "right", evdev 106, mac Some(0x7C);
    NumLock => "numlock", evdev 69, mac None;
    ScrollLock => "scrolllock", evdev 70, mac None;
    PrintScreen => "printscreen", evdev 99, mac None;
    Pause => "pause", evdev 119, mac None;
    Menu => "menu", evdev 127, mac None;
    Keypad0 => "kp0", evdev 82, mac Some(0x52);
    Keypad1 => "kp1", evdev 79, mac Some(0x53);
    Keypad2 => "kp2", evdev 80, mac Some(0x54);
    Keypad3 => "kp3", evdev 81, mac Some(0x55);
    Keypad4 => "kp4", evdev 75, mac Some(0x56);
    Keypad5 => "kp5", evdev 76, mac Some(0x57);
    Keypad6 => "kp6", evdev 77, mac Some(0x58);
    Keypad7 => "kp7", evdev 71, mac Some(0x59);
    Keypad8 => "kp8", evdev 72, mac Some(0x5B);
    Keypad9 => "kp9", evdev 73, mac Some(0x5C);
    KeypadPlus => "kpplus", evdev 78, mac Some(0x45);
    KeypadMinus => "kpminus", evdev 74, mac Some(0x4E);
    KeypadMultiply => "kpmultiply", evdev 55, mac Some(0x43);
    KeypadDivide => "kpdivide", evdev 98, mac Some(0x4B);
    KeypadDecimal => "kpdecimal", evdev 83, mac Some(0x41);
    KeypadEnter => "kpenter", evdev 96, mac Some(0x4C);
}

/// Alternative spellings accepted by [`Key::from_str`].
const ALIASES: &[(&str, Key)] = &[
    ("return", Key::Enter),
    ("esc", Key::Escape),
    ("ctrl", Key::LeftControl),
    ("option", Key::LeftAlt),
    ("cmd", Key::LeftMeta),
    ("command", Key::LeftMeta),
    ("super", Key::LeftMeta),
    ("win", Key::LeftMeta),
    ("del", Key::Delete),
    ("pgup", Key::PageUp),
    ("pgdn", Key::PageDown),
    ("arrowup", Key::Up),
    ("arrowdown", Key::Down),
    ("arrowleft", Key::Left),
    ("arrowright", Key::Right),
];

/// Prefix for raw keycodes in textual form (`raw:30`).
const RAW_PREFIX: &str = "raw:";

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();

        if let Some(code) = lower.strip_prefix(RAW_PREFIX) {
            return code.parse().map(Self::Raw).map_err(|_| UnknownKey(s.to_string()));
        }

        if let Some((_, key)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
            return Ok(*key);
        }

        Self::NAMED
            .iter()
            .copied()
            .find(|key| key.name() == Some(lower.as_str()))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => match self {
                Self::Raw(code) => write!(f, "{RAW_PREFIX}{code}"),
                _ => Ok(()),
            },
        }
    }
}

/// A key name that is neither in the table nor an alias.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKey(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_codes() {
        assert_eq!(Key::A.to_evdev(), Some(30));
        assert_eq!(Key::A.to_mac_keycode(), Some(0x00));
        assert_eq!(Key::Z.to_evdev(), Some(44));
        assert_eq!(Key::Z.to_mac_keycode(), Some(0x06));
    }

    #[test]
    fn test_navigation_codes() {
        assert_eq!(Key::Up.to_evdev(), Some(103));
        assert_eq!(Key::Up.to_mac_keycode(), Some(0x7E));
        assert_eq!(Key::Delete.to_evdev(), Some(111));
        assert_eq!(Key::Delete.to_mac_keycode(), Some(0x75));
    }

    #[test]
    fn test_keys_without_mac_equivalent() {
        assert_eq!(Key::NumLock.to_mac_keycode(), None);
        assert_eq!(Key::PrintScreen.to_mac_keycode(), None);
        assert_eq!(Key::PrintScreen.to_evdev(), Some(99));
    }

    #[test]
    fn test_raw_passthrough() {
        assert_eq!(Key::Raw(240).to_evdev(), Some(240));
        assert_eq!(Key::Raw(0x24).to_mac_keycode(), Some(0x24));
        assert_eq!(Key::Raw(70_000).to_mac_keycode(), None);
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("a".parse::<Key>(), Ok(Key::A));
        assert_eq!("Enter".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("RETURN".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("cmd".parse::<Key>(), Ok(Key::LeftMeta));
        assert_eq!("7".parse::<Key>(), Ok(Key::Num7));
        assert_eq!("raw:30".parse::<Key>(), Ok(Key::Raw(30)));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(
            "hyper".parse::<Key>(),
            Err(UnknownKey("hyper".to_string()))
        );
        assert!("raw:-1".parse::<Key>().is_err());
    }

    #[test]
    fn test_names_are_unique_and_round_trip() {
        for key in Key::NAMED {
            let name = key.name().unwrap();
            assert_eq!(name.parse::<Key>(), Ok(*key), "{name}");
        }
    }

    #[test]
    fn test_evdev_codes_are_unique() {
        let mut codes: Vec<u32> = Key::NAMED.iter().filter_map(|k| k.to_evdev()).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::PageUp.to_string(), "pageup");
        assert_eq!(Key::Raw(12).to_string(), "raw:12");
    }
}
