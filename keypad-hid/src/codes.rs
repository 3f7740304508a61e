//! HID usage codes: keyboard page, consumer page, mouse buttons
//!
//! Keyboard codes are usage IDs from the Keyboard/Keypad page (0x07);
//! consumer codes are usage IDs from the Consumer page (0x0C).

/// Keyboard page usage IDs
pub mod key {
    pub const A: u8 = 0x04;
    pub const B: u8 = 0x05;
    pub const C: u8 = 0x06;
    pub const V: u8 = 0x19;
    pub const X: u8 = 0x1B;
    pub const Z: u8 = 0x1D;
    pub const N1: u8 = 0x1E;
    pub const N0: u8 = 0x27;
    pub const ENTER: u8 = 0x28;
    pub const ESCAPE: u8 = 0x29;
    pub const BACKSPACE: u8 = 0x2A;
    pub const TAB: u8 = 0x2B;
    pub const SPACE: u8 = 0x2C;
    pub const F1: u8 = 0x3A;
    pub const F12: u8 = 0x45;
    pub const DELETE: u8 = 0x4C;
    pub const RIGHT_ARROW: u8 = 0x4F;
    pub const LEFT_ARROW: u8 = 0x50;
    pub const DOWN_ARROW: u8 = 0x51;
    pub const UP_ARROW: u8 = 0x52;

    pub const LEFT_CONTROL: u8 = 0xE0;
    pub const LEFT_SHIFT: u8 = 0xE1;
    pub const LEFT_ALT: u8 = 0xE2;
    pub const LEFT_GUI: u8 = 0xE3;
    pub const RIGHT_CONTROL: u8 = 0xE4;
    pub const RIGHT_SHIFT: u8 = 0xE5;
    pub const RIGHT_ALT: u8 = 0xE6;
    pub const RIGHT_GUI: u8 = 0xE7;

    /// Modifiers live in the report's bitmask byte, not the key slots.
    pub fn is_modifier(code: u8) -> bool {
        (LEFT_CONTROL..=RIGHT_GUI).contains(&code)
    }

    /// Bit for a modifier code in the report's first byte.
    pub fn modifier_bit(code: u8) -> u8 {
        1 << (code - LEFT_CONTROL)
    }
}

/// Consumer page usage IDs
pub mod consumer {
    pub const BRIGHTNESS_UP: u16 = 0x006F;
    pub const BRIGHTNESS_DOWN: u16 = 0x0070;
    pub const RECORD: u16 = 0x00B2;
    pub const FAST_FORWARD: u16 = 0x00B3;
    pub const REWIND: u16 = 0x00B4;
    pub const SCAN_NEXT_TRACK: u16 = 0x00B5;
    pub const SCAN_PREVIOUS_TRACK: u16 = 0x00B6;
    pub const STOP: u16 = 0x00B7;
    pub const EJECT: u16 = 0x00B8;
    pub const PLAY_PAUSE: u16 = 0x00CD;
    pub const MUTE: u16 = 0x00E2;
    pub const VOLUME_INCREMENT: u16 = 0x00E9;
    pub const VOLUME_DECREMENT: u16 = 0x00EA;
}

/// Mouse button bits (first byte of the mouse report)
pub mod mouse {
    pub const LEFT: u8 = 0x01;
    pub const RIGHT: u8 = 0x02;
    pub const MIDDLE: u8 = 0x04;
    pub const BACK: u8 = 0x08;
    pub const FORWARD: u8 = 0x10;
}

/// Get the name of a keyboard usage code
pub fn key_name(code: u8) -> &'static str {
    #[rustfmt::skip]
    let name = match code {
        0x00 => "None",
        0x04 => "A", 0x05 => "B", 0x06 => "C", 0x07 => "D",
        0x08 => "E", 0x09 => "F", 0x0A => "G", 0x0B => "H",
        0x0C => "I", 0x0D => "J", 0x0E => "K", 0x0F => "L",
        0x10 => "M", 0x11 => "N", 0x12 => "O", 0x13 => "P",
        0x14 => "Q", 0x15 => "R", 0x16 => "S", 0x17 => "T",
        0x18 => "U", 0x19 => "V", 0x1A => "W", 0x1B => "X",
        0x1C => "Y", 0x1D => "Z",
        0x1E => "1", 0x1F => "2", 0x20 => "3", 0x21 => "4",
        0x22 => "5", 0x23 => "6", 0x24 => "7", 0x25 => "8",
        0x26 => "9", 0x27 => "0",
        0x28 => "Enter", 0x29 => "Escape", 0x2A => "Backspace",
        0x2B => "Tab", 0x2C => "Space", 0x2D => "-", 0x2E => "=",
        0x2F => "[", 0x30 => "]", 0x31 => "\\", 0x33 => ";",
        0x34 => "'", 0x35 => "`", 0x36 => ",", 0x37 => ".",
        0x38 => "/", 0x39 => "CapsLock",
        0x3A => "F1", 0x3B => "F2", 0x3C => "F3", 0x3D => "F4",
        0x3E => "F5", 0x3F => "F6", 0x40 => "F7", 0x41 => "F8",
        0x42 => "F9", 0x43 => "F10", 0x44 => "F11", 0x45 => "F12",
        0x46 => "PrintScreen", 0x47 => "ScrollLock", 0x48 => "Pause",
        0x49 => "Insert", 0x4A => "Home", 0x4B => "PageUp",
        0x4C => "Delete", 0x4D => "End", 0x4E => "PageDown",
        0x4F => "Right", 0x50 => "Left", 0x51 => "Down", 0x52 => "Up",
        0x65 => "App",
        0xE0 => "LCtrl", 0xE1 => "LShift", 0xE2 => "LAlt", 0xE3 => "LGUI",
        0xE4 => "RCtrl", 0xE5 => "RShift", 0xE6 => "RAlt", 0xE7 => "RGUI",
        _ => "?",
    };
    name
}

/// Look up a keyboard usage code by name (case-insensitive).
///
/// Accepts the names produced by [`key_name`] plus common aliases
/// (`Esc`, `Return`, `Ctrl`, `Shift`, `Win`, ...).
pub fn key_code_from_name(name: &str) -> Option<u8> {
    let lower = name.trim().to_ascii_lowercase();
    let alias = match lower.as_str() {
        "esc" => Some(key::ESCAPE),
        "return" => Some(key::ENTER),
        "bksp" => Some(key::BACKSPACE),
        "del" => Some(key::DELETE),
        "ctrl" | "control" | "lcontrol" => Some(key::LEFT_CONTROL),
        "shift" => Some(key::LEFT_SHIFT),
        "alt" | "option" => Some(key::LEFT_ALT),
        "gui" | "win" | "super" | "cmd" | "lwin" => Some(key::LEFT_GUI),
        "rcontrol" => Some(key::RIGHT_CONTROL),
        "altgr" => Some(key::RIGHT_ALT),
        "rwin" => Some(key::RIGHT_GUI),
        "menu" => Some(0x65),
        _ => None,
    };
    if alias.is_some() {
        return alias;
    }
    (0x04..=0xE7u8).find(|&code| {
        let known = key_name(code);
        known != "?" && known.eq_ignore_ascii_case(&lower)
    })
}

/// Display name for a consumer usage code, if it is one we know.
pub fn consumer_name(code: u16) -> Option<&'static str> {
    Some(match code {
        consumer::BRIGHTNESS_UP => "BrightnessUp",
        consumer::BRIGHTNESS_DOWN => "BrightnessDown",
        consumer::RECORD => "Record",
        consumer::FAST_FORWARD => "FastForward",
        consumer::REWIND => "Rewind",
        consumer::SCAN_NEXT_TRACK => "NextTrack",
        consumer::SCAN_PREVIOUS_TRACK => "PreviousTrack",
        consumer::STOP => "Stop",
        consumer::EJECT => "Eject",
        consumer::PLAY_PAUSE => "PlayPause",
        consumer::MUTE => "Mute",
        consumer::VOLUME_INCREMENT => "VolumeUp",
        consumer::VOLUME_DECREMENT => "VolumeDown",
        _ => return None,
    })
}

/// Look up a consumer usage code by name (case-insensitive).
pub fn consumer_code_from_name(name: &str) -> Option<u16> {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "play" | "pause" | "play/pause" => return Some(consumer::PLAY_PAUSE),
        "next" | "scannexttrack" => return Some(consumer::SCAN_NEXT_TRACK),
        "prev" | "previous" | "scanprevioustrack" => return Some(consumer::SCAN_PREVIOUS_TRACK),
        "volumeincrement" | "volup" => return Some(consumer::VOLUME_INCREMENT),
        "volumedecrement" | "voldown" => return Some(consumer::VOLUME_DECREMENT),
        _ => {}
    }
    [
        consumer::BRIGHTNESS_UP,
        consumer::BRIGHTNESS_DOWN,
        consumer::RECORD,
        consumer::FAST_FORWARD,
        consumer::REWIND,
        consumer::SCAN_NEXT_TRACK,
        consumer::SCAN_PREVIOUS_TRACK,
        consumer::STOP,
        consumer::EJECT,
        consumer::PLAY_PAUSE,
        consumer::MUTE,
        consumer::VOLUME_INCREMENT,
        consumer::VOLUME_DECREMENT,
    ]
    .into_iter()
    .find(|&code| consumer_name(code).is_some_and(|n| n.eq_ignore_ascii_case(&lower)))
}

/// Display name for a mouse button bit.
pub fn mouse_button_name(buttons: u8) -> Option<&'static str> {
    Some(match buttons {
        mouse::LEFT => "Left",
        mouse::RIGHT => "Right",
        mouse::MIDDLE => "Middle",
        mouse::BACK => "Back",
        mouse::FORWARD => "Forward",
        _ => return None,
    })
}

/// Look up a mouse button bit by name (case-insensitive).
pub fn mouse_button_from_name(name: &str) -> Option<u8> {
    match name.trim().to_ascii_lowercase().as_str() {
        "left" => Some(mouse::LEFT),
        "right" => Some(mouse::RIGHT),
        "middle" => Some(mouse::MIDDLE),
        "back" => Some(mouse::BACK),
        "forward" => Some(mouse::FORWARD),
        _ => None,
    }
}

/// Convert a character to a keyboard usage code on the US layout.
/// Returns (keycode, needs_shift) or None if unsupported.
pub fn char_to_hid(ch: char) -> Option<(u8, bool)> {
    match ch {
        // Letters (a-z lowercase, A-Z needs shift)
        'a'..='z' => Some((0x04 + (ch as u8 - b'a'), false)),
        'A'..='Z' => Some((0x04 + (ch as u8 - b'A'), true)),
        // Numbers
        '1'..='9' => Some((0x1E + (ch as u8 - b'1'), false)),
        '0' => Some((0x27, false)),
        // Control characters
        '\n' => Some((0x28, false)),   // Enter
        '\x1b' => Some((0x29, false)), // Escape
        '\x08' => Some((0x2A, false)), // Backspace
        '\t' => Some((0x2B, false)),   // Tab
        // Special characters (unshifted)
        ' ' => Some((0x2C, false)),
        '-' => Some((0x2D, false)),
        '=' => Some((0x2E, false)),
        '[' => Some((0x2F, false)),
        ']' => Some((0x30, false)),
        '\\' => Some((0x31, false)),
        ';' => Some((0x33, false)),
        '\'' => Some((0x34, false)),
        '`' => Some((0x35, false)),
        ',' => Some((0x36, false)),
        '.' => Some((0x37, false)),
        '/' => Some((0x38, false)),
        // Shifted characters
        '!' => Some((0x1E, true)),
        '@' => Some((0x1F, true)),
        '#' => Some((0x20, true)),
        '$' => Some((0x21, true)),
        '%' => Some((0x22, true)),
        '^' => Some((0x23, true)),
        '&' => Some((0x24, true)),
        '*' => Some((0x25, true)),
        '(' => Some((0x26, true)),
        ')' => Some((0x27, true)),
        '_' => Some((0x2D, true)),
        '+' => Some((0x2E, true)),
        '{' => Some((0x2F, true)),
        '}' => Some((0x30, true)),
        '|' => Some((0x31, true)),
        ':' => Some((0x33, true)),
        '"' => Some((0x34, true)),
        '~' => Some((0x35, true)),
        '<' => Some((0x36, true)),
        '>' => Some((0x37, true)),
        '?' => Some((0x38, true)),
        _ => None,
    }
}
