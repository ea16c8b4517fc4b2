//! Raw input event numbering understood by the device's `sendevent` tool
//!
//! The numeric values mirror the Linux input subsystem (`EV_*`, `SYN_*`,
//! `KEY_*`, `BTN_*`, `ABS_*`) and must match the device exactly.

use phf::phf_map;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, TouchError};

/// Event type numbering keyed by symbolic name
pub static EVENT_TYPES: phf::Map<&'static str, u16> = phf_map! {
    "EV_SYN" => 0x0,
    "EV_KEY" => 0x1,
    "EV_ABS" => 0x3,
};

/// Event sub-code numbering keyed by symbolic name
pub static EVENT_CODES: phf::Map<&'static str, u16> = phf_map! {
    "SYN_REPORT" => 0x0,
    "SYN_MT_REPORT" => 0x2,
    "KEY_UP" => 0x67,
    "KEY_LEFT" => 0x69,
    "KEY_DOWN" => 0x6c,
    "KEY_RIGHT" => 0x6a,
    "KEY_ESC" => 0x01,
    "BTN_TOUCH" => 0x14a,
    "ABS_MT_PRESSURE" => 0x3a,
    "ABS_MT_POSITION_X" => 0x35,
    "ABS_MT_POSITION_Y" => 0x36,
};

/// Event types emitted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Syn,
    Key,
    Abs,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Syn, EventType::Key, EventType::Abs];

    pub fn symbol(self) -> &'static str {
        match self {
            EventType::Syn => "EV_SYN",
            EventType::Key => "EV_KEY",
            EventType::Abs => "EV_ABS",
        }
    }
}

/// Event sub-codes emitted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCode {
    SynReport,
    SynMtReport,
    KeyUp,
    KeyLeft,
    KeyDown,
    KeyRight,
    KeyEsc,
    BtnTouch,
    AbsMtPressure,
    AbsMtPositionX,
    AbsMtPositionY,
}

impl EventCode {
    pub const ALL: [EventCode; 11] = [
        EventCode::SynReport,
        EventCode::SynMtReport,
        EventCode::KeyUp,
        EventCode::KeyLeft,
        EventCode::KeyDown,
        EventCode::KeyRight,
        EventCode::KeyEsc,
        EventCode::BtnTouch,
        EventCode::AbsMtPressure,
        EventCode::AbsMtPositionX,
        EventCode::AbsMtPositionY,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            EventCode::SynReport => "SYN_REPORT",
            EventCode::SynMtReport => "SYN_MT_REPORT",
            EventCode::KeyUp => "KEY_UP",
            EventCode::KeyLeft => "KEY_LEFT",
            EventCode::KeyDown => "KEY_DOWN",
            EventCode::KeyRight => "KEY_RIGHT",
            EventCode::KeyEsc => "KEY_ESC",
            EventCode::BtnTouch => "BTN_TOUCH",
            EventCode::AbsMtPressure => "ABS_MT_PRESSURE",
            EventCode::AbsMtPositionX => "ABS_MT_POSITION_X",
            EventCode::AbsMtPositionY => "ABS_MT_POSITION_Y",
        }
    }

    /// The event type this sub-code is sent with
    pub fn event_type(self) -> EventType {
        match self {
            EventCode::SynReport | EventCode::SynMtReport => EventType::Syn,
            EventCode::AbsMtPressure | EventCode::AbsMtPositionX | EventCode::AbsMtPositionY => {
                EventType::Abs
            }
            _ => EventType::Key,
        }
    }
}

/// Keyboard-style actions, the closed vocabulary of non-touch identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardKey {
    Up,
    Left,
    Down,
    Right,
    Esc,
}

impl KeyboardKey {
    pub const ALL: [KeyboardKey; 5] = [
        KeyboardKey::Up,
        KeyboardKey::Left,
        KeyboardKey::Down,
        KeyboardKey::Right,
        KeyboardKey::Esc,
    ];

    /// Parse a canonical (upper-case) identifier
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "UP" => Some(KeyboardKey::Up),
            "LEFT" => Some(KeyboardKey::Left),
            "DOWN" => Some(KeyboardKey::Down),
            "RIGHT" => Some(KeyboardKey::Right),
            "ESC" => Some(KeyboardKey::Esc),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyboardKey::Up => "UP",
            KeyboardKey::Left => "LEFT",
            KeyboardKey::Down => "DOWN",
            KeyboardKey::Right => "RIGHT",
            KeyboardKey::Esc => "ESC",
        }
    }

    pub fn code(self) -> EventCode {
        match self {
            KeyboardKey::Up => EventCode::KeyUp,
            KeyboardKey::Left => EventCode::KeyLeft,
            KeyboardKey::Down => EventCode::KeyDown,
            KeyboardKey::Right => EventCode::KeyRight,
            KeyboardKey::Esc => EventCode::KeyEsc,
        }
    }
}

impl fmt::Display for KeyboardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single numeric event ready to be written to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    /// Render as a `sendevent` command line for the given input device node
    pub fn to_command(&self, device_path: &str) -> String {
        format!(
            "sendevent {} {} {} {}",
            device_path, self.event_type, self.code, self.value
        )
    }
}

/// Symbolic-to-numeric protocol mapping injected into the controller
#[derive(Debug, Clone)]
pub struct ProtocolTable {
    event_types: HashMap<String, u16>,
    event_codes: HashMap<String, u16>,
}

impl ProtocolTable {
    pub fn new(event_types: HashMap<String, u16>, event_codes: HashMap<String, u16>) -> Self {
        Self {
            event_types,
            event_codes,
        }
    }

    pub fn event_types(&self) -> &HashMap<String, u16> {
        &self.event_types
    }

    pub fn event_codes(&self) -> &HashMap<String, u16> {
        &self.event_codes
    }

    /// Resolve every symbol the controller emits, failing on the first gap
    pub fn resolve(&self) -> Result<CodeBook> {
        let mut types = [0u16; EventType::ALL.len()];
        for ty in EventType::ALL {
            types[ty as usize] = *self.event_types.get(ty.symbol()).ok_or_else(|| {
                TouchError::InvalidConfig(format!("missing event type {}", ty.symbol()))
            })?;
        }

        let mut codes = [0u16; EventCode::ALL.len()];
        for code in EventCode::ALL {
            codes[code as usize] = *self.event_codes.get(code.symbol()).ok_or_else(|| {
                TouchError::InvalidConfig(format!("missing event code {}", code.symbol()))
            })?;
        }

        Ok(CodeBook { types, codes })
    }
}

impl Default for ProtocolTable {
    fn default() -> Self {
        Self {
            event_types: EVENT_TYPES
                .entries()
                .map(|(name, code)| (name.to_string(), *code))
                .collect(),
            event_codes: EVENT_CODES
                .entries()
                .map(|(name, code)| (name.to_string(), *code))
                .collect(),
        }
    }
}

/// Fully resolved numeric codes, produced once at controller construction
#[derive(Debug, Clone, Copy)]
pub struct CodeBook {
    types: [u16; 3],
    codes: [u16; 11],
}

impl CodeBook {
    pub fn event(&self, code: EventCode, value: i32) -> RawEvent {
        RawEvent {
            event_type: self.types[code.event_type() as usize],
            code: self.codes[code as usize],
            value,
        }
    }
}
