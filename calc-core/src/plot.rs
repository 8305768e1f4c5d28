//! # Plot Sampling Module
//!
//! Treats the buffer text as a function of `x` and samples it over a fixed
//! domain for the graph renderer.
//!
//! The text is parsed once. Errors in the text itself (bad syntax, unknown
//! names) fail the whole request. Failures that depend on the sample value,
//! such as `1/x` at zero or `ln(x)` for negative `x`, leave a gap (`NaN`)
//! at that point, the same way an array evaluation would.

use crate::expression::{self, ExprError, Scope};

/// Number of evenly spaced sample points.
pub const SAMPLE_COUNT: usize = 400;
/// Inclusive sampling domain.
pub const DOMAIN: (f64, f64) = (-10.0, 10.0);
/// Name the sample value is bound to.
pub const PLOT_VARIABLE: &str = "x";

/// Sampled curve handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    /// Legend label: the literal expression text.
    pub label: String,
    pub xs: Vec<f64>,
    /// `NaN` marks a point that could not be evaluated.
    pub ys: Vec<f64>,
}

impl PlotData {
    /// Smallest and largest finite y value, if any point is finite.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.ys
            .iter()
            .copied()
            .filter(|y| y.is_finite())
            .fold(None, |range, y| match range {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            })
    }

    /// Consecutive runs of finite points; a gap splits the curve.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (&x, &y) in self.xs.iter().zip(&self.ys) {
            if y.is_finite() {
                current.push((x, y));
            } else if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// `count` evenly spaced values from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Samples `text` over [`DOMAIN`] at [`SAMPLE_COUNT`] points.
pub fn sample(text: &str) -> Result<PlotData, ExprError> {
    let expr = expression::parse(text)?;
    let xs = linspace(DOMAIN.0, DOMAIN.1, SAMPLE_COUNT);
    let mut scope = Scope::new();
    let mut ys = Vec::with_capacity(xs.len());

    for &x in &xs {
        scope.set(PLOT_VARIABLE, x);
        match expr.eval(&scope) {
            Ok(y) => ys.push(y),
            Err(e) if e.is_numeric() => ys.push(f64::NAN),
            Err(e) => return Err(e),
        }
    }

    let gaps = ys.iter().filter(|y| y.is_nan()).count();
    tracing::debug!(target: "calc::plot", "Sampled '{}' with {} gaps", text, gaps);

    Ok(PlotData {
        label: text.to_string(),
        xs,
        ys,
    })
}
