//! # Calculator Module
//!
//! The input/display controller as a plain value: the input buffer, the
//! memory slot, the history log and the theme flag. Every operation is a
//! state transition; the GUI re-renders from the accessors afterwards.

use crate::expression::{self, ExprError};
use crate::history::History;
use crate::plot::{self, PlotData};
use crate::theme::{Palette, ThemeMode};

/// Text shown on the result line after a failed evaluation.
pub const ERROR_INDICATOR: &str = "Error";

/// Keypad labels, row by row.
pub const KEYPAD: [[&str; 6]; 5] = [
    ["C", "CE", "M+", "M-", "MR", "MC"],
    ["7", "8", "9", "/", "sinh", "cosh"],
    ["4", "5", "6", "*", "tanh", "log"],
    ["1", "2", "3", "-", "ln", "^"],
    ["0", ".", "=", "+", "(", ")"],
];

#[derive(Debug, Clone, Default)]
pub struct Calculator {
    buffer: String,
    memory: Option<String>,
    history: History,
    theme: ThemeMode,
    /// Set by a failed evaluation, cleared by the next buffer change.
    error_shown: bool,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(theme: ThemeMode) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn memory(&self) -> Option<&str> {
        self.memory.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn palette(&self) -> Palette {
        self.theme.palette()
    }

    pub fn is_error_shown(&self) -> bool {
        self.error_shown
    }

    /// Text of the result line: the buffer, or the error indicator.
    pub fn result_text(&self) -> &str {
        if self.error_shown {
            ERROR_INDICATOR
        } else {
            &self.buffer
        }
    }

    /// Text of the history line.
    pub fn history_text(&self) -> String {
        self.history.render()
    }

    /// Dispatches a keypad label to the matching operation.
    pub fn press(&mut self, label: &str) {
        match label {
            "C" => self.clear(),
            "CE" => self.backspace(),
            "M+" => self.memory_store(),
            "M-" | "MC" => self.memory_clear(),
            "MR" => self.memory_recall(),
            "=" => {
                let _ = self.evaluate();
            }
            name if expression::is_function(name) => self.append(&format!("{name}(")),
            other => self.append(other),
        }
    }

    pub fn append(&mut self, token: &str) {
        self.buffer.push_str(token);
        self.error_shown = false;
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
        self.error_shown = false;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.error_shown = false;
    }

    /// Evaluates the buffer. On success the buffer becomes the formatted
    /// result and a history record is written; on failure only the result
    /// line changes.
    pub fn evaluate(&mut self) -> Result<f64, ExprError> {
        match expression::evaluate(&self.buffer) {
            Ok(value) => {
                let result = expression::format_number(value);
                tracing::debug!(target: "calc::controller", "{} = {}", self.buffer, result);
                let expression = std::mem::replace(&mut self.buffer, result.clone());
                self.history.push(expression, result);
                self.error_shown = false;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(target: "calc::controller", "Evaluation of '{}' failed: {}", self.buffer, e);
                self.error_shown = true;
                Err(e)
            }
        }
    }

    pub fn memory_store(&mut self) {
        self.memory = Some(self.buffer.clone());
    }

    pub fn memory_clear(&mut self) {
        self.memory = None;
    }

    pub fn memory_recall(&mut self) {
        if let Some(stored) = &self.memory {
            self.buffer.push_str(stored);
            self.error_shown = false;
        }
    }

    /// Samples the buffer as a function of `x`. State is not modified.
    pub fn request_plot(&self) -> Result<PlotData, ExprError> {
        plot::sample(&self.buffer)
    }

    /// Replaces the buffer wholesale with transcribed speech.
    pub fn apply_transcription(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.error_shown = false;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }
}
