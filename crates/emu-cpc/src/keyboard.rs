//! CPC keyboard matrix.
//!
//! Ten lines of eight keys, scanned through the PPI: port C bits 3:0
//! select a line and the PSG I/O port A returns it. A pressed key reads
//! as 0. Joystick 0 shares line 9 with DEL.
//!
//! | Line | Bit 0 | 1     | 2      | 3  | 4   | 5     | 6        | 7       |
//! |------|-------|-------|--------|----|-----|-------|----------|---------|
//! | 0    | Up    | Right | Down   | F9 | F6  | F3    | Enter    | F.      |
//! | 1    | Left  | Copy  | F7     | F8 | F5  | F1    | F2       | F0      |
//! | 2    | Clr   | [     | Return | ]  | F4  | Shift | \        | Control |
//! | 3    | ^     | -     | @      | P  | ;   | :     | /        | .       |
//! | 4    | 0     | 9     | O      | I  | L   | K     | M        | ,       |
//! | 5    | 8     | 7     | U      | Y  | H   | J     | N        | Space   |
//! | 6    | 6     | 5     | R      | T  | G   | F     | B        | V       |
//! | 7    | 4     | 3     | E      | W  | S   | D     | C        | X       |
//! | 8    | 1     | 2     | Esc    | Q  | Tab | A     | CapsLock | Z       |
//! | 9    | Up    | Down  | Left   | Right | Fire 2 | Fire 1 | Fire 3 | Del |

use gi_ay_3_8910::PsgPorts;

pub const LINES: usize = 10;

/// A key on the CPC keyboard or joystick 0.
///
/// Variants are declared in matrix order, eight per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CpcKey {
    // Line 0
    Up,
    Right,
    Down,
    F9,
    F6,
    F3,
    Enter,
    FDot,
    // Line 1
    Left,
    Copy,
    F7,
    F8,
    F5,
    F1,
    F2,
    F0,
    // Line 2
    Clr,
    LeftBracket,
    Return,
    RightBracket,
    F4,
    Shift,
    Backslash,
    Control,
    // Line 3
    Caret,
    Minus,
    At,
    P,
    Semicolon,
    Colon,
    Slash,
    Period,
    // Line 4
    N0,
    N9,
    O,
    I,
    L,
    K,
    M,
    Comma,
    // Line 5
    N8,
    N7,
    U,
    Y,
    H,
    J,
    N,
    Space,
    // Line 6
    N6,
    N5,
    R,
    T,
    G,
    F,
    B,
    V,
    // Line 7
    N4,
    N3,
    E,
    W,
    S,
    D,
    C,
    X,
    // Line 8
    N1,
    N2,
    Escape,
    Q,
    Tab,
    A,
    CapsLock,
    Z,
    // Line 9
    JoyUp,
    JoyDown,
    JoyLeft,
    JoyRight,
    Fire2,
    Fire1,
    Fire3,
    Del,
}

impl CpcKey {
    /// Matrix position as (line, bit).
    #[must_use]
    pub const fn matrix(self) -> (usize, u8) {
        let index = self as u8;
        ((index / 8) as usize, index % 8)
    }
}

/// Pressed keys, one byte per line (1 = pressed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    lines: [u8; LINES],
    /// Line selected by PPI port C bits 3:0. Values above 9 select nothing.
    pub line: u8,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: CpcKey, pressed: bool) {
        let (line, bit) = key.matrix();
        if pressed {
            self.lines[line] |= 1 << bit;
        } else {
            self.lines[line] &= !(1 << bit);
        }
    }

    pub fn release_all(&mut self) {
        self.lines = [0; LINES];
    }

    #[must_use]
    pub fn is_pressed(&self, key: CpcKey) -> bool {
        let (line, bit) = key.matrix();
        self.lines[line] & (1 << bit) != 0
    }

    /// Active-low state of one line. Lines past 9 float high.
    #[must_use]
    pub fn read(&self, line: u8) -> u8 {
        self.lines.get(usize::from(line)).map_or(0xFF, |&keys| !keys)
    }

    #[must_use]
    pub fn selected(&self) -> u8 {
        self.read(self.line)
    }
}

impl PsgPorts for Keyboard {
    fn read_port_a(&mut self) -> u8 {
        self.selected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_positions() {
        assert_eq!(CpcKey::Up.matrix(), (0, 0));
        assert_eq!(CpcKey::FDot.matrix(), (0, 7));
        assert_eq!(CpcKey::Return.matrix(), (2, 2));
        assert_eq!(CpcKey::Shift.matrix(), (2, 5));
        assert_eq!(CpcKey::Space.matrix(), (5, 7));
        assert_eq!(CpcKey::A.matrix(), (8, 5));
        assert_eq!(CpcKey::Fire1.matrix(), (9, 5));
        assert_eq!(CpcKey::Del.matrix(), (9, 7));
    }

    #[test]
    fn lines_are_active_low() {
        let mut kb = Keyboard::new();
        assert_eq!(kb.read(8), 0xFF);
        kb.set_key(CpcKey::A, true);
        kb.set_key(CpcKey::Z, true);
        assert_eq!(kb.read(8), !0xA0);
        kb.set_key(CpcKey::A, false);
        assert_eq!(kb.read(8), 0x7F);
        assert!(kb.is_pressed(CpcKey::Z));
    }

    #[test]
    fn unused_lines_float_high() {
        let mut kb = Keyboard::new();
        kb.set_key(CpcKey::Del, true);
        kb.line = 12;
        assert_eq!(kb.selected(), 0xFF);
        kb.line = 9;
        assert_eq!(kb.read_port_a(), 0x7F);
    }
}
