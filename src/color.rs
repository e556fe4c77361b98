//! Display colors for the goal overlay.
//!
//! Colors are packed ARGB values. The canonical persisted form is the
//! `#AARRGGBB` hex string; packed integers written by older builds are
//! still accepted on read.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A packed 32-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const GREEN: Color = Color(0xFF00_FF00);
    pub const TRANSPARENT: Color = Color(0x0000_0000);

    /// Build a color from a packed ARGB value.
    pub const fn from_argb(argb: u32) -> Self {
        Color(argb)
    }

    /// Build an opaque color from its channels.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color(0xFF00_0000 | (red as u32) << 16 | (green as u32) << 8 | blue as u32)
    }

    /// Interpret a packed integer as stored by older builds.
    ///
    /// Those builds wrote the platform's signed 32-bit color int, so negative
    /// values are reinterpreted bit-for-bit. Anything outside 32 bits is rejected.
    pub fn from_packed(value: i64) -> Option<Self> {
        if (i32::MIN as i64..=u32::MAX as i64).contains(&value) {
            Some(Color(value as u32))
        } else {
            None
        }
    }

    pub const fn argb(self) -> u32 {
        self.0
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Parse `#RRGGBB`, `#AARRGGBB`, or a named color (case-insensitive).
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ColorParseError::Empty);
        }

        if let Some(hex) = input.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ColorParseError::InvalidHex(input.to_string()));
            }
            let value = u32::from_str_radix(hex, 16)
                .map_err(|_| ColorParseError::InvalidHex(input.to_string()))?;
            return match hex.len() {
                6 => Ok(Color(0xFF00_0000 | value)),
                8 => Ok(Color(value)),
                _ => Err(ColorParseError::InvalidHex(input.to_string())),
            };
        }

        named(&input.to_ascii_lowercase())
            .ok_or_else(|| ColorParseError::UnknownName(input.to_string()))
    }

    /// Canonical `#AARRGGBB` form.
    pub fn to_hex(self) -> String {
        format!("#{:08X}", self.0)
    }
}

fn named(name: &str) -> Option<Color> {
    let argb = match name {
        "black" => 0xFF00_0000,
        "darkgray" | "darkgrey" => 0xFF44_4444,
        "gray" | "grey" => 0xFF88_8888,
        "lightgray" | "lightgrey" => 0xFFCC_CCCC,
        "white" => 0xFFFF_FFFF,
        "red" => 0xFFFF_0000,
        "green" | "lime" => 0xFF00_FF00,
        "blue" => 0xFF00_00FF,
        "yellow" => 0xFFFF_FF00,
        "cyan" | "aqua" => 0xFF00_FFFF,
        "magenta" | "fuchsia" => 0xFFFF_00FF,
        "maroon" => 0xFF80_0000,
        "navy" => 0xFF00_0080,
        "olive" => 0xFF80_8000,
        "purple" => 0xFF80_0080,
        "silver" => 0xFFC0_C0C0,
        "teal" => 0xFF00_8080,
        _ => return None,
    };
    Some(Color(argb))
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Color::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Errors produced while parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    Empty,
    InvalidHex(String),
    UnknownName(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::Empty => write!(f, "Color value is empty"),
            ColorParseError::InvalidHex(s) => write!(f, "Invalid hex color: {s}"),
            ColorParseError::UnknownName(s) => write!(f, "Unknown color name: {s}"),
        }
    }
}

impl std::error::Error for ColorParseError {}
