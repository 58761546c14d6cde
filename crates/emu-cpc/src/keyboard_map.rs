//! Host key → CPC key mapping.
//!
//! Host keys are named by the character they produce (`"a"`, `";"`) or by
//! a lowercase key name (`"enter"`, `"shift"`). The layout decides which
//! matrix position a letter lands on, so a French CPC sees `a` at the
//! position its firmware reads as A.

use crate::config::KeyboardType;
use crate::keyboard::CpcKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Qwerty,
    Azerty,
    Qwertz,
}

impl From<KeyboardType> for Layout {
    fn from(keyboard: KeyboardType) -> Self {
        match keyboard {
            KeyboardType::French => Self::Azerty,
            KeyboardType::German => Self::Qwertz,
            KeyboardType::English | KeyboardType::Spanish | KeyboardType::Danish => Self::Qwerty,
        }
    }
}

/// Map a host key name to a CPC key. Returns `None` for unmapped keys.
#[must_use]
pub fn map_key(name: &str, layout: Layout) -> Option<CpcKey> {
    let name = name.to_ascii_lowercase();
    let key = match (layout, name.as_str()) {
        (Layout::Azerty, "a") => CpcKey::Q,
        (Layout::Azerty, "q") => CpcKey::A,
        (Layout::Azerty, "z") => CpcKey::W,
        (Layout::Azerty, "w") => CpcKey::Z,
        (Layout::Azerty, "m") => CpcKey::Semicolon,
        (Layout::Azerty, ",") => CpcKey::M,
        (Layout::Qwertz, "y") => CpcKey::Z,
        (Layout::Qwertz, "z") => CpcKey::Y,
        (_, other) => return common(other),
    };
    Some(key)
}

fn common(name: &str) -> Option<CpcKey> {
    let key = match name {
        "a" => CpcKey::A,
        "b" => CpcKey::B,
        "c" => CpcKey::C,
        "d" => CpcKey::D,
        "e" => CpcKey::E,
        "f" => CpcKey::F,
        "g" => CpcKey::G,
        "h" => CpcKey::H,
        "i" => CpcKey::I,
        "j" => CpcKey::J,
        "k" => CpcKey::K,
        "l" => CpcKey::L,
        "m" => CpcKey::M,
        "n" => CpcKey::N,
        "o" => CpcKey::O,
        "p" => CpcKey::P,
        "q" => CpcKey::Q,
        "r" => CpcKey::R,
        "s" => CpcKey::S,
        "t" => CpcKey::T,
        "u" => CpcKey::U,
        "v" => CpcKey::V,
        "w" => CpcKey::W,
        "x" => CpcKey::X,
        "y" => CpcKey::Y,
        "z" => CpcKey::Z,

        "0" => CpcKey::N0,
        "1" => CpcKey::N1,
        "2" => CpcKey::N2,
        "3" => CpcKey::N3,
        "4" => CpcKey::N4,
        "5" => CpcKey::N5,
        "6" => CpcKey::N6,
        "7" => CpcKey::N7,
        "8" => CpcKey::N8,
        "9" => CpcKey::N9,

        "[" => CpcKey::LeftBracket,
        "]" => CpcKey::RightBracket,
        "\\" => CpcKey::Backslash,
        "^" => CpcKey::Caret,
        "-" => CpcKey::Minus,
        "@" => CpcKey::At,
        ";" => CpcKey::Semicolon,
        ":" => CpcKey::Colon,
        "/" => CpcKey::Slash,
        "." => CpcKey::Period,
        "," => CpcKey::Comma,
        " " | "space" => CpcKey::Space,

        "enter" | "return" => CpcKey::Return,
        "kp_enter" => CpcKey::Enter,
        "kp_period" | "kp_decimal" => CpcKey::FDot,
        "escape" | "esc" => CpcKey::Escape,
        "tab" => CpcKey::Tab,
        "capslock" => CpcKey::CapsLock,
        "shift" | "shift_l" | "shift_r" => CpcKey::Shift,
        "control" | "control_l" | "control_r" => CpcKey::Control,
        "alt" | "alt_l" | "copy" => CpcKey::Copy,
        "backspace" | "delete" => CpcKey::Del,
        "home" | "clr" => CpcKey::Clr,
        "up" => CpcKey::Up,
        "down" => CpcKey::Down,
        "left" => CpcKey::Left,
        "right" => CpcKey::Right,

        "f0" | "kp_0" => CpcKey::F0,
        "f1" | "kp_1" => CpcKey::F1,
        "f2" | "kp_2" => CpcKey::F2,
        "f3" | "kp_3" => CpcKey::F3,
        "f4" | "kp_4" => CpcKey::F4,
        "f5" | "kp_5" => CpcKey::F5,
        "f6" | "kp_6" => CpcKey::F6,
        "f7" | "kp_7" => CpcKey::F7,
        "f8" | "kp_8" => CpcKey::F8,
        "f9" | "kp_9" => CpcKey::F9,

        "joy_up" => CpcKey::JoyUp,
        "joy_down" => CpcKey::JoyDown,
        "joy_left" => CpcKey::JoyLeft,
        "joy_right" => CpcKey::JoyRight,
        "fire1" => CpcKey::Fire1,
        "fire2" => CpcKey::Fire2,
        "fire3" => CpcKey::Fire3,

        _ => return None,
    };
    Some(key)
}
