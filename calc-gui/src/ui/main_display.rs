//! # Main Display Module
//!
//! This module contains the main layout of the calculator window: the
//! history and result lines, the keypad or graph panel, and the tool
//! buttons.

use calc_core::{Palette, PlotData};
use iced::alignment::Horizontal;
use iced::widget::{Space, button, column, container, horizontal_space, row, stack, text};
use iced::{Alignment, Background, Element, Length};

use super::{keypad, notice, to_color};
use crate::widgets::graph_plot::GraphPlot;
use crate::{AppDisplayData, Message, VoiceStatus};

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    let palette = data.palette;

    let toolbar = row![
        horizontal_space(),
        keypad::tool_button("Toggle Theme", Some(Message::ToggleTheme)),
        horizontal_space(),
    ];

    let body = match &data.plot {
        Some(plot) => create_plot_panel(plot, palette),
        None => keypad::create_keypad(palette.button_frame),
    };

    let footer = row![
        create_voice_button(data.voice_status),
        horizontal_space(),
        keypad::tool_button("Plot Graph", Some(Message::PlotGraph)),
    ]
    .align_y(Alignment::Center);

    let content = container(
        column![
            toolbar,
            create_display_panel(data),
            body,
            footer,
        ]
        .spacing(10)
        .padding(10),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .style(move |_theme| container::Style {
        background: Some(Background::Color(to_color(palette.window_background))),
        ..container::Style::default()
    });

    match &data.notice {
        Some(n) => stack![content, notice::create_notice_overlay(n)].into(),
        None => content.into(),
    }
}

/// History line above the result line, both right-aligned.
fn create_display_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let palette = data.palette;
    let foreground = to_color(palette.display_text);

    let history = container(text(data.history_text.clone()).size(12).color(foreground))
        .width(Length::Fill)
        .align_x(Horizontal::Right);
    let result = container(text(data.result_text.clone()).size(24).color(foreground))
        .width(Length::Fill)
        .align_x(Horizontal::Right);

    container(column![history, result].spacing(4))
        .width(Length::Fill)
        .padding([8, 12])
        .style(move |_theme| container::Style {
            background: Some(Background::Color(to_color(palette.display_background))),
            ..container::Style::default()
        })
        .into()
}

/// Graph panel shown in place of the keypad until closed.
fn create_plot_panel(plot: &PlotData, palette: Palette) -> Element<'static, Message> {
    let foreground = to_color(palette.display_text);

    let header = row![
        text(format!("y = {}", plot.label)).size(18).color(foreground),
        horizontal_space(),
        button(text("Close").size(14))
            .padding([4, 12])
            .on_press(Message::ClosePlot),
    ]
    .align_y(Alignment::Center);

    container(
        column![
            header,
            Space::with_height(10),
            GraphPlot::new(plot.clone(), palette).view(),
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .style(move |_theme| container::Style {
        background: Some(Background::Color(to_color(palette.display_background))),
        ..container::Style::default()
    })
    .into()
}

fn create_voice_button(status: VoiceStatus) -> Element<'static, Message> {
    match status {
        VoiceStatus::Idle => keypad::tool_button("Voice Input", Some(Message::VoiceInput)),
        VoiceStatus::Starting | VoiceStatus::Listening => keypad::tool_button("Listening...", None),
        VoiceStatus::Transcribing => keypad::tool_button("Transcribing...", None),
    }
}
