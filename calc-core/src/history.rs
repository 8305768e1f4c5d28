//! # History Module
//!
//! Append-only log of evaluated expressions. Storage is unbounded for the
//! session; only the trailing [`VISIBLE_RECORDS`] are ever rendered.

use std::fmt;

/// Number of records shown in the history line.
pub const VISIBLE_RECORDS: usize = 5;

/// One successful evaluation, rendered as `expression=result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub expression: String,
    pub result: String,
}

impl fmt::Display for HistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.expression, self.result)
    }
}

#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<HistoryRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expression: impl Into<String>, result: impl Into<String>) {
        self.records.push(HistoryRecord {
            expression: expression.into(),
            result: result.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// The last `min(count, len)` records, oldest first.
    pub fn recent(&self, count: usize) -> &[HistoryRecord] {
        let start = self.records.len().saturating_sub(count);
        &self.records[start..]
    }

    /// The text of the history line: visible records joined by newlines.
    pub fn render(&self) -> String {
        self.recent(VISIBLE_RECORDS)
            .iter()
            .map(HistoryRecord::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_empty_history_as_blank() {
        assert_eq!(History::new().render(), "");
    }

    #[test]
    fn renders_only_trailing_records() {
        let mut history = History::new();
        for i in 1..=7 {
            history.push(format!("{i}+{i}"), (i * 2).to_string());
        }

        assert_eq!(history.len(), 7);
        assert_eq!(history.recent(5).len(), 5);
        assert_eq!(history.recent(10).len(), 7);
        assert_eq!(history.render(), "3+3=6\n4+4=8\n5+5=10\n6+6=12\n7+7=14");
    }

    #[test]
    fn renders_short_history_in_order() {
        let mut history = History::new();
        history.push("1+1", "2");
        history.push("2*3", "6");
        assert_eq!(history.render(), "1+1=2\n2*3=6");
    }
}
