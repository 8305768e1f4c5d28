//! # UI Module
//!
//! This module contains the layout components for the calculator window.

pub mod keypad;
pub mod main_display;
pub mod notice;

use calc_core::Rgb;
use iced::Color;

/// Converts a core colour into an Iced colour.
pub fn to_color(rgb: Rgb) -> Color {
    Color::from_rgb8(rgb.r, rgb.g, rgb.b)
}
