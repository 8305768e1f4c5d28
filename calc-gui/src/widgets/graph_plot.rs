//! # Graph Plot Widget
//!
//! Line chart of a sampled expression: titled, with labelled axes, a grid
//! with tick values, and a legend keyed to the expression text. Gaps in the
//! samples break the line.

use calc_core::Palette;
use calc_core::plot::{DOMAIN, PlotData};
use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{self, Geometry, Path, Stroke, Text};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, mouse};

use crate::ui::to_color;

/// Space reserved around the plot area for title, ticks and labels.
const MARGIN_LEFT: f32 = 70.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 40.0;
const MARGIN_BOTTOM: f32 = 50.0;

/// Number of grid cells along each axis.
const GRID_DIVISIONS: usize = 10;

/// Curve colour, the usual first series blue.
const CURVE_COLOR: Color = Color {
    r: 0.12,
    g: 0.47,
    b: 0.71,
    a: 1.0,
};

pub struct GraphPlot {
    data: PlotData,
    background: Color,
    foreground: Color,
}

impl GraphPlot {
    pub fn new(data: PlotData, palette: Palette) -> Self {
        Self {
            data,
            background: to_color(palette.display_background),
            foreground: to_color(palette.display_text),
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }

    fn label(&self, content: String, position: Point, size: f32, h: Horizontal, v: Vertical) -> Text {
        Text {
            content,
            position,
            color: self.foreground,
            size: size.into(),
            horizontal_alignment: h,
            vertical_alignment: v,
            ..Text::default()
        }
    }
}

impl<Message> canvas::Program<Message> for GraphPlot {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        frame.fill(&Path::rectangle(Point::ORIGIN, bounds.size()), self.background);

        let area = Rectangle {
            x: MARGIN_LEFT,
            y: MARGIN_TOP,
            width: bounds.width - MARGIN_LEFT - MARGIN_RIGHT,
            height: bounds.height - MARGIN_TOP - MARGIN_BOTTOM,
        };
        if !area.width.is_finite() || !area.height.is_finite() || area.width <= 0.0 || area.height <= 0.0 {
            return vec![frame.into_geometry()];
        }

        let (x_min, x_max) = DOMAIN;
        let (y_min, y_max) = padded_range(self.data.y_range());
        let to_screen = |x: f64, y: f64| {
            Point::new(
                area.x + fraction(x, x_min, x_max) as f32 * area.width,
                area.y + area.height - fraction(y, y_min, y_max) as f32 * area.height,
            )
        };

        // Grid and tick labels
        let grid = Stroke::default()
            .with_width(1.0)
            .with_color(Color { a: 0.2, ..self.foreground });
        for i in 0..=GRID_DIVISIONS {
            let t = i as f64 / GRID_DIVISIONS as f64;

            let x = x_min + t * (x_max - x_min);
            let top = to_screen(x, y_max);
            let bottom = to_screen(x, y_min);
            frame.stroke(&Path::line(top, bottom), grid.clone());
            frame.fill_text(self.label(
                format_tick(x),
                Point::new(bottom.x, bottom.y + 6.0),
                12.0,
                Horizontal::Center,
                Vertical::Top,
            ));

            let y = lerp(y_min, y_max, t);
            let left = to_screen(x_min, y);
            let right = to_screen(x_max, y);
            frame.stroke(&Path::line(left, right), grid.clone());
            frame.fill_text(self.label(
                format_tick(y),
                Point::new(left.x - 6.0, left.y),
                12.0,
                Horizontal::Right,
                Vertical::Center,
            ));
        }

        // Plot border
        frame.stroke(
            &Path::rectangle(Point::new(area.x, area.y), Size::new(area.width, area.height)),
            Stroke::default().with_width(1.0).with_color(self.foreground),
        );

        // Curve
        let curve = Stroke::default().with_width(2.0).with_color(CURVE_COLOR);
        for segment in self.data.segments() {
            let path = Path::new(|builder| {
                let mut points = segment.iter().map(|&(x, y)| to_screen(x, y));
                if let Some(first) = points.next() {
                    builder.move_to(first);
                    for point in points {
                        builder.line_to(point);
                    }
                }
            });
            frame.stroke(&path, curve.clone());
        }

        // Title and axis labels
        frame.fill_text(self.label(
            "Graph Plot".to_string(),
            Point::new(area.x + area.width / 2.0, MARGIN_TOP / 2.0),
            18.0,
            Horizontal::Center,
            Vertical::Center,
        ));
        frame.fill_text(self.label(
            "x".to_string(),
            Point::new(area.x + area.width / 2.0, bounds.height - 12.0),
            14.0,
            Horizontal::Center,
            Vertical::Center,
        ));
        frame.fill_text(self.label(
            "y".to_string(),
            Point::new(14.0, area.y + area.height / 2.0),
            14.0,
            Horizontal::Center,
            Vertical::Center,
        ));

        // Legend
        let legend_width = 48.0 + 7.0 * self.data.label.chars().count() as f32;
        let legend_origin = Point::new(area.x + area.width - legend_width - 10.0, area.y + 10.0);
        frame.fill(
            &Path::rectangle(legend_origin, Size::new(legend_width, 26.0)),
            self.background,
        );
        frame.stroke(
            &Path::rectangle(legend_origin, Size::new(legend_width, 26.0)),
            Stroke::default().with_width(1.0).with_color(Color { a: 0.5, ..self.foreground }),
        );
        let sample_y = legend_origin.y + 13.0;
        frame.stroke(
            &Path::line(
                Point::new(legend_origin.x + 8.0, sample_y),
                Point::new(legend_origin.x + 32.0, sample_y),
            ),
            curve,
        );
        frame.fill_text(self.label(
            self.data.label.clone(),
            Point::new(legend_origin.x + 40.0, sample_y),
            13.0,
            Horizontal::Left,
            Vertical::Center,
        ));

        vec![frame.into_geometry()]
    }
}

/// Y axis limits with a little headroom. A flat or empty curve still gets
/// a usable range.
fn padded_range(range: Option<(f64, f64)>) -> (f64, f64) {
    match range {
        None => (-1.0, 1.0),
        Some((lo, hi)) if !lo.is_finite() || !hi.is_finite() => (-1.0, 1.0),
        Some((lo, hi)) if hi - lo < 1e-9 => (lo - 1.0, hi + 1.0),
        Some((lo, hi)) => {
            // Halved first so spans near f64::MAX stay finite.
            let half_pad = (hi / 2.0 - lo / 2.0) * 0.05;
            let padded = (lo - half_pad * 2.0, hi + half_pad * 2.0);
            if padded.0.is_finite() && padded.1.is_finite() {
                padded
            } else {
                (lo, hi)
            }
        }
    }
}

/// Position of `value` within `[lo, hi]`, computed on halves so that ranges
/// wider than `f64::MAX` do not overflow.
fn fraction(value: f64, lo: f64, hi: f64) -> f64 {
    (value / 2.0 - lo / 2.0) / (hi / 2.0 - lo / 2.0)
}

fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
    lo * (1.0 - t) + hi * t
}

fn format_tick(value: f64) -> String {
    if value.abs() < 0.005 {
        return "0".to_string();
    }
    if value.abs() >= 1e5 {
        return format!("{:.1e}", value);
    }
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_ranges() {
        assert_eq!(padded_range(None), (-1.0, 1.0));
        assert_eq!(padded_range(Some((5.0, 5.0))), (4.0, 6.0));
        let (lo, hi) = padded_range(Some((0.0, 100.0)));
        assert_eq!((lo, hi), (-5.0, 105.0));

        let (lo, hi) = padded_range(Some((-1.1e308, 1.1e308)));
        assert!(lo.is_finite() && hi.is_finite());
        assert!(lo <= -1.1e308 && hi >= 1.1e308);

        let (lo, hi) = padded_range(Some((-1e300, 1e300)));
        assert!(lo < -1e300 && hi > 1e300);
        assert!(lo.is_finite() && hi.is_finite());
    }

    #[test]
    fn maps_wide_ranges_without_overflow() {
        let (lo, hi) = padded_range(Some((-1.1e308, 1.1e308)));
        assert_eq!(fraction(lo, lo, hi), 0.0);
        assert_eq!(fraction(hi, lo, hi), 1.0);
        assert!((fraction(0.0, lo, hi) - 0.5).abs() < 1e-12);
        assert_eq!(lerp(lo, hi, 0.0), lo);
        assert_eq!(lerp(lo, hi, 1.0), hi);
        assert!(lerp(lo, hi, 0.25).is_finite());
        assert!(!format_tick(lerp(lo, hi, 0.75)).contains("NaN"));
        assert_eq!(fraction(5.0, 0.0, 10.0), 0.5);
    }

    #[test]
    fn formats_ticks() {
        assert_eq!(format_tick(-10.0), "-10");
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(0.001), "0");
        assert_eq!(format_tick(-0.0), "0");
        assert_eq!(format_tick(123456.0), "1.2e5");
    }
}
