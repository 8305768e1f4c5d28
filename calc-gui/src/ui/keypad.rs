//! # Keypad Module
//!
//! The fixed 6×5 button grid. Button colours come from the role of each key
//! and do not follow the theme; hovering any key lightens it.

use calc_core::theme::{self, KEY_DEFAULT, KEY_HOVER, KEY_TEXT};
use calc_core::{KEYPAD, Rgb};
use iced::widget::{Column, Row, button, container, text};
use iced::{Background, Element, Length};

use super::to_color;
use crate::Message;

/// Spacing between keys in pixels.
const KEY_SPACING: u16 = 4;

/// Creates the keypad filling the available space.
pub fn create_keypad(frame: Rgb) -> Element<'static, Message> {
    let rows = KEYPAD.into_iter().map(|labels| {
        Row::with_children(labels.into_iter().map(make_key))
            .spacing(KEY_SPACING)
            .height(Length::Fill)
            .into()
    });

    container(Column::with_children(rows).spacing(KEY_SPACING))
        .width(Length::Fill)
        .height(Length::Fill)
        .style(move |_theme| container::Style {
            background: Some(Background::Color(to_color(frame))),
            ..container::Style::default()
        })
        .into()
}

fn make_key(label: &'static str) -> Element<'static, Message> {
    let rest = theme::key_color(label);

    button(
        container(text(label).size(18))
            .center_x(Length::Fill)
            .center_y(Length::Fill),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .style(move |_theme, status| key_style(rest, status))
    .on_press(Message::KeyPressed(label))
    .into()
}

/// Creates one of the tool buttons below or above the keypad.
pub fn tool_button(label: &str, message: Option<Message>) -> Element<'static, Message> {
    let button = button(text(label.to_string()).size(16))
        .padding([8, 16])
        .style(|_theme, status| key_style(KEY_DEFAULT, status));

    match message {
        Some(message) => button.on_press(message).into(),
        None => button.into(),
    }
}

/// Style for a key resting at `rest`.
pub fn key_style(rest: Rgb, status: button::Status) -> button::Style {
    let background = match status {
        button::Status::Hovered | button::Status::Pressed => KEY_HOVER,
        button::Status::Active | button::Status::Disabled => rest,
    };

    button::Style {
        background: Some(Background::Color(to_color(background))),
        text_color: to_color(KEY_TEXT),
        ..button::Style::default()
    }
}
