//! # Theme Module
//!
//! The dark/light flag and the fixed colour tables derived from it. Colours
//! are plain RGB triples so this crate stays free of GUI types.

use serde::{Deserialize, Serialize};

/// An opaque sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ThemeMode::Dark => DARK_PALETTE,
            ThemeMode::Light => LIGHT_PALETTE,
        }
    }
}

/// Colours applied to every display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub window_background: Rgb,
    pub display_background: Rgb,
    pub display_text: Rgb,
    pub button_frame: Rgb,
}

pub const DARK_PALETTE: Palette = Palette {
    window_background: Rgb::from_hex(0x202020),
    display_background: Rgb::from_hex(0x000000),
    display_text: Rgb::from_hex(0xFFFFFF),
    button_frame: Rgb::from_hex(0x202020),
};

pub const LIGHT_PALETTE: Palette = Palette {
    window_background: Rgb::from_hex(0xFFFFFF),
    display_background: Rgb::from_hex(0xFFFFFF),
    display_text: Rgb::from_hex(0x000000),
    button_frame: Rgb::from_hex(0xFFFFFF),
};

// Keypad colours do not follow the theme.
pub const KEY_TEXT: Rgb = Rgb::from_hex(0xFFFFFF);
pub const KEY_HOVER: Rgb = Rgb::from_hex(0x888888);
pub const KEY_DEFAULT: Rgb = Rgb::from_hex(0x333333);
const KEY_CLEAR: Rgb = Rgb::from_hex(0xFF6666);
const KEY_MEMORY: Rgb = Rgb::from_hex(0x66CCFF);
const KEY_EQUALS: Rgb = Rgb::from_hex(0x66FF66);

/// Resting colour of the keypad button labelled `label`.
pub fn key_color(label: &str) -> Rgb {
    match label {
        "C" | "CE" => KEY_CLEAR,
        "M+" | "M-" | "MR" | "MC" => KEY_MEMORY,
        "=" => KEY_EQUALS,
        _ => KEY_DEFAULT,
    }
}
