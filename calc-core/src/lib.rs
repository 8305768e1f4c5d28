// calc-core/src/lib.rs

//! The core logic for the advanced calculator.
//! This crate owns the calculator state, the expression evaluator, graph
//! sampling and voice capture. It is completely headless
//! and contains no GUI code.

pub mod audio;
pub mod calculator;
pub mod config;
pub mod expression;
pub mod history;
pub mod plot;
pub mod speech;
pub mod theme;
pub mod voice;

pub use calculator::{Calculator, ERROR_INDICATOR, KEYPAD};
pub use config::CalcConfig;
pub use expression::ExprError;
pub use plot::PlotData;
pub use theme::{Palette, Rgb, ThemeMode};
pub use voice::{VoiceError, VoiceEvent, VoiceWorker};
