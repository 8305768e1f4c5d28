//! # Notice Module
//!
//! Modal error dialog drawn over the calculator. The backdrop swallows
//! mouse input; keyboard input is held back in `update` until the dialog is
//! dismissed.

use iced::widget::{Space, button, column, container, horizontal_space, opaque, row, text};
use iced::{Background, Border, Color, Element, Length, Theme};

use crate::{Message, Notice};

pub fn create_notice_overlay(notice: &Notice) -> Element<'static, Message> {
    let dialog = container(
        column![
            text(notice.title.clone()).size(20),
            Space::with_height(5),
            text(notice.message.clone()).size(16),
            Space::with_height(10),
            row![
                horizontal_space(),
                button(text("OK").size(16))
                    .padding([6, 20])
                    .on_press(Message::DismissNotice),
            ],
        ]
        .spacing(5),
    )
    .padding(20)
    .width(Length::Fixed(420.0))
    .style(|theme: &Theme| {
        let palette = theme.palette();
        container::Style {
            background: Some(Background::Color(palette.background)),
            text_color: Some(palette.text),
            border: Border {
                color: palette.danger,
                width: 2.0,
                radius: 6.0.into(),
            },
            ..container::Style::default()
        }
    });

    let backdrop = container(dialog)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .style(|_theme| container::Style {
            background: Some(Background::Color(Color {
                a: 0.6,
                ..Color::BLACK
            })),
            ..container::Style::default()
        });

    opaque(backdrop)
}
