//! # Advanced Calculator - Desktop GUI
//!
//! This module contains the main GUI application for the calculator.
//! It renders the calculator state from `calc-core`, maps button presses and
//! typed keys to controller operations, shows graphs, and runs voice input.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application owning the calculator state
//! - **Voice Thread**: Spawned per capture for microphone and speech service
//! - **Communication**: Crossbeam channel carrying voice events back to the GUI
//! - **Updates**: Timer ticks poll the channel only while a capture runs

mod ui;
mod widgets;

use std::time::Duration;

use calc_core::config::{self, CalcConfig};
use calc_core::speech::HttpTranscriber;
use calc_core::{Calculator, Palette, PlotData, ThemeMode, VoiceEvent, VoiceWorker};
use crossbeam_channel::{Receiver, Sender};
use iced::keyboard::{self, Key, Modifiers, key};
use iced::{Element, Size, Subscription, Task, Theme, window};
use tracing_subscriber::EnvFilter;
use ui::main_display::create_main_view;

/// Interval between polls of the voice channel while a capture runs.
const VOICE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Log filter used when `RUST_LOG` is unset. All crate targets live under
/// `calc::`.
const DEFAULT_LOG_FILTER: &str = "warn,calc=debug";

/// Characters accepted from the keyboard as buffer input.
const TYPEABLE_SYMBOLS: &str = ".+-*/^() ";

/// Main entry point for the calculator.
pub fn main() -> iced::Result {
    init_logging();
    tracing::info!(target: "calc::gui", "Starting Advanced Calculator...");
    let result = iced::application("Advanced Calculator", CalculatorApp::update, CalculatorApp::view)
        .subscription(CalculatorApp::subscription)
        .theme(CalculatorApp::theme)
        .window_size(Size::new(800.0, 1000.0))
        .resizable(true)
        .exit_on_close_request(false)
        .run();
    tracing::info!(target: "calc::gui", "Application finished with result: {:?}", result);
    result
}

/// Installs the log subscriber. `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    // Keypad and keyboard input
    KeyPressed(&'static str), // A keypad button, by label
    Typed(String),            // Text typed on the keyboard
    Backspace,
    Clear,
    Evaluate,

    // Tools
    VoiceInput,
    PlotGraph,
    ClosePlot,
    ToggleTheme,
    DismissNotice,

    // Voice channel poll
    Tick,

    WindowCloseRequested(window::Id),
}

/// Progress of the voice capture, shown on the voice button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    Idle,
    Starting,
    Listening,
    Transcribing,
}

/// A user-visible error dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub result_text: String,
    pub history_text: String,
    pub palette: Palette,
    pub voice_status: VoiceStatus,
    pub plot: Option<PlotData>,
    pub notice: Option<Notice>,
}

#[derive(Debug)]
struct CalculatorApp {
    calculator: Calculator,
    config: CalcConfig,

    // Voice capture
    voice_worker: Option<VoiceWorker>,
    voice_sender: Sender<VoiceEvent>,
    voice_receiver: Receiver<VoiceEvent>,
    voice_status: VoiceStatus,

    plot: Option<PlotData>,
    notice: Option<Notice>,
}

impl Default for CalculatorApp {
    fn default() -> Self {
        let config = config::load_or_default(config::CONFIG_FILE);
        tracing::debug!(target: "calc::gui", "Loaded settings: {:?}", config);
        let (voice_sender, voice_receiver) = crossbeam_channel::unbounded();

        Self {
            calculator: Calculator::with_theme(config.start_theme),
            config,
            voice_worker: None,
            voice_sender,
            voice_receiver,
            voice_status: VoiceStatus::Idle,
            plot: None,
            notice: None,
        }
    }
}

impl CalculatorApp {
    fn update(&mut self, message: Message) -> Task<Message> {
        tracing::trace!(target: "calc::gui", "Received message: {:?}", message);

        if self.notice.is_some() {
            match message {
                // Enter and Escape acknowledge the dialog
                Message::Evaluate | Message::Clear => {
                    self.notice = None;
                    return Task::none();
                }
                Message::KeyPressed(_) | Message::Typed(_) | Message::Backspace => {
                    return Task::none();
                }
                _ => {}
            }
        }

        match message {
            Message::KeyPressed(label) => self.calculator.press(label),
            Message::Typed(text) => self.calculator.append(&text),
            Message::Backspace => self.calculator.backspace(),
            Message::Clear => self.calculator.clear(),
            Message::Evaluate => {
                let _ = self.calculator.evaluate();
            }
            Message::VoiceInput => self.start_voice_capture(),
            Message::PlotGraph => self.request_plot(),
            Message::ClosePlot => self.plot = None,
            Message::ToggleTheme => {
                self.calculator.toggle_theme();
                tracing::debug!(target: "calc::gui", "Theme is now {:?}", self.calculator.theme());
            }
            Message::DismissNotice => self.notice = None,
            Message::Tick => self.poll_voice_events(),
            Message::WindowCloseRequested(id) => {
                tracing::info!(target: "calc::gui", "Window {:?} close requested - shutting down", id);
                if let Some(mut worker) = self.voice_worker.take() {
                    worker.cancel();
                }
                return iced::exit();
            }
        }

        Task::none()
    }

    /// Starts a capture unless one is already running.
    fn start_voice_capture(&mut self) {
        if self.voice_worker.is_some() {
            tracing::debug!(target: "calc::gui", "Voice capture already running");
            return;
        }

        let endpoint = self.config.speech_endpoint.clone();
        let timeout = self.config.request_timeout();
        let worker = VoiceWorker::spawn(
            move || HttpTranscriber::new(endpoint, timeout),
            self.config.capture_settings(),
            self.voice_sender.clone(),
        );
        self.voice_worker = Some(worker);
        self.voice_status = VoiceStatus::Starting;
    }

    /// Drains the voice channel and applies what arrived.
    fn poll_voice_events(&mut self) {
        let events: Vec<VoiceEvent> = self.voice_receiver.try_iter().collect();
        for event in events {
            self.process_voice_event(event);
        }
    }

    fn process_voice_event(&mut self, event: VoiceEvent) {
        if event.is_final() {
            self.voice_worker = None;
            self.voice_status = VoiceStatus::Idle;
        }

        match event {
            VoiceEvent::Listening => self.voice_status = VoiceStatus::Listening,
            VoiceEvent::Transcribing => self.voice_status = VoiceStatus::Transcribing,
            VoiceEvent::Transcribed(text) => {
                tracing::info!(target: "calc::gui", "Voice input: {:?}", text);
                self.calculator.apply_transcription(&text);
            }
            VoiceEvent::Failed(error) => {
                tracing::warn!(target: "calc::gui", "Voice input failed: {:?}", error);
                self.notice = Some(Notice::new("Voice Input Error", error.to_string()));
            }
            VoiceEvent::Cancelled => {}
        }
    }

    fn request_plot(&mut self) {
        match self.calculator.request_plot() {
            Ok(data) => self.plot = Some(data),
            Err(e) => {
                tracing::debug!(target: "calc::gui", "Plot of '{}' failed: {}", self.calculator.buffer(), e);
                let message = format!("Cannot plot '{}': {}", self.calculator.buffer(), e);
                self.notice = Some(Notice::new("Plot Error", message));
            }
        }
    }

    fn display_data(&self) -> AppDisplayData {
        AppDisplayData {
            result_text: self.calculator.result_text().to_string(),
            history_text: self.calculator.history_text(),
            palette: self.calculator.palette(),
            voice_status: self.voice_status,
            plot: self.plot.clone(),
            notice: self.notice.clone(),
        }
    }

    /// Delegates all rendering to the main_display module.
    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data())
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            keyboard::on_key_press(handle_key),
            window::close_requests().map(Message::WindowCloseRequested),
        ];
        if self.voice_worker.is_some() {
            subscriptions.push(iced::time::every(VOICE_POLL_INTERVAL).map(|_| Message::Tick));
        }
        Subscription::batch(subscriptions)
    }

    fn theme(&self) -> Theme {
        match self.calculator.theme() {
            ThemeMode::Dark => Theme::Dark,
            ThemeMode::Light => Theme::Light,
        }
    }
}

/// Maps keyboard input to messages. Shortcuts with modifiers are ignored.
fn handle_key(key: Key, modifiers: Modifiers) -> Option<Message> {
    if modifiers.control() || modifiers.alt() || modifiers.logo() {
        return None;
    }

    match key.as_ref() {
        Key::Named(key::Named::Enter) => Some(Message::Evaluate),
        Key::Named(key::Named::Backspace) => Some(Message::Backspace),
        Key::Named(key::Named::Escape) => Some(Message::Clear),
        Key::Character("=") => Some(Message::Evaluate),
        Key::Character(c) if is_typeable(c) => Some(Message::Typed(c.to_string())),
        _ => None,
    }
}

fn is_typeable(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || TYPEABLE_SYMBOLS.contains(c))
}
