//! Candlestick chart rendering into fixed-size text grids.
//!
//! The renderer builds line segments for every candle, hands them to a
//! [`Rasterizer`], then normalizes whatever comes back: colour markup is
//! stripped, leading blank rows are dropped, numeric axis rows are filtered
//! in mini mode, and the grid is forced to exactly `height` rows of `width`
//! characters with a time-label row at the bottom.

use super::candle::{format_time_label, price_bounds, Candle};
use crate::ports::rasterizer_port::{PlotRequest, Rasterizer, Segment, Tone};

/// Half the width of a candle body, in candle-index units.
pub const BODY_HALF_WIDTH: f64 = 0.3;

const AXIS_ROW_RATIO: f64 = 0.7;
const AXIS_ROW_MIN_LEN: usize = 3;
const EMPTY_NOTICE: &str = "No candle data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartMode {
    /// Compact chart on the trading screen, numeric axis rows suppressed.
    Mini,
    /// Full terminal chart with a visible numeric scale.
    Fullscreen,
}

/// Decides whether a row is a numeric axis row.
pub type AxisRowPredicate = fn(&str) -> bool;

/// A row counts as a numeric axis row when more than 70% of its non-space
/// characters are digits, `.`, `,` or `-` and its trimmed length exceeds 3.
pub fn is_numeric_axis_row(row: &str) -> bool {
    let trimmed = row.trim();
    if trimmed.chars().count() <= AXIS_ROW_MIN_LEN {
        return false;
    }
    let mut total = 0usize;
    let mut numeric = 0usize;
    for ch in trimmed.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if ch.is_ascii_digit() || matches!(ch, '.' | ',' | '-') {
            numeric += 1;
        }
    }
    total > 0 && numeric as f64 / total as f64 > AXIS_ROW_RATIO
}

/// Remove ANSI escape sequences (`ESC [ ... final`) from a line.
pub fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\x1b' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
    }
    out
}

/// Truncate or right-pad to exactly `width` characters.
pub fn fit_width(line: &str, width: usize) -> String {
    let mut out: String = line.chars().take(width).collect();
    let len = out.chars().count();
    if len < width {
        out.extend(std::iter::repeat_n(' ', width - len));
    }
    out
}

/// Line segments for one candle at x = `index`: two wicks and a body outline.
pub fn candle_segments(index: usize, candle: &Candle) -> [Segment; 6] {
    let x = index as f64;
    let tone = if candle.is_bearish() {
        Tone::Bear
    } else {
        Tone::Bull
    };
    let (o, c) = (candle.open, candle.close);
    let left = x - BODY_HALF_WIDTH;
    let right = x + BODY_HALF_WIDTH;
    [
        Segment::new((x, c), (x, candle.high), tone),
        Segment::new((x, candle.low), (x, o), tone),
        Segment::new((left, o), (right, o), tone),
        Segment::new((left, c), (right, c), tone),
        Segment::new((left, o), (left, c), tone),
        Segment::new((right, o), (right, c), tone),
    ]
}

/// Space-joined `HH:MM` labels of the newest `count` candles, cut to `width`.
pub fn time_label_row(candles: &[Candle], count: usize, width: usize) -> String {
    if candles.is_empty() {
        return String::new();
    }
    let start = candles.len().saturating_sub(count);
    let labels: Vec<String> = candles[start..]
        .iter()
        .map(|c| format_time_label(c.timestamp))
        .collect();
    labels.join(" ").chars().take(width).collect()
}

pub struct ChartRenderer {
    rasterizer: Box<dyn Rasterizer + Send>,
    axis_row: AxisRowPredicate,
}

impl ChartRenderer {
    pub fn new(rasterizer: Box<dyn Rasterizer + Send>) -> Self {
        ChartRenderer {
            rasterizer,
            axis_row: is_numeric_axis_row,
        }
    }

    /// Swap the axis-row detector, e.g. when the rasterizer changes.
    pub fn with_axis_row_predicate(mut self, predicate: AxisRowPredicate) -> Self {
        self.axis_row = predicate;
        self
    }

    /// The plot request for a non-empty window.
    pub fn plot_request(
        candles: &[Candle],
        height: usize,
        width: usize,
        mode: ChartMode,
    ) -> PlotRequest {
        let y_range = price_bounds(candles).unwrap_or((0.0, 1.0));
        let segments = candles
            .iter()
            .enumerate()
            .flat_map(|(i, c)| candle_segments(i, c))
            .collect();
        PlotRequest {
            width,
            height: height.saturating_sub(1),
            x_range: (-0.5, candles.len() as f64 - 0.5),
            y_range,
            segments,
            x_ticks: mode == ChartMode::Fullscreen,
        }
    }

    /// Render `candles` into exactly `height` rows of `width` characters, or
    /// a single diagnostic row when rasterization fails.
    pub fn render(
        &self,
        candles: &[Candle],
        height: usize,
        width: usize,
        mode: ChartMode,
    ) -> Vec<String> {
        if height == 0 {
            return Vec::new();
        }
        let body_rows = height - 1;

        let body = if candles.is_empty() {
            let mut rows = vec![String::new(); body_rows];
            if let Some(first) = rows.first_mut() {
                *first = EMPTY_NOTICE.to_string();
            }
            rows
        } else {
            let request = Self::plot_request(candles, height, width, mode);
            match self.rasterizer.rasterize(&request) {
                Ok(raw) => self.normalize_body(raw, body_rows, mode),
                Err(e) => {
                    tracing::warn!(error = %e, "chart rasterization failed");
                    return vec![fit_width(&format!("Plot error: {e}"), width)];
                }
            }
        };

        let mut rows = body;
        rows.push(time_label_row(candles, body_rows, width));
        rows.iter().map(|row| fit_width(row, width)).collect()
    }

    fn normalize_body(&self, raw: Vec<String>, body_rows: usize, mode: ChartMode) -> Vec<String> {
        let mut rows: Vec<String> = raw
            .iter()
            .map(|line| strip_markup(line))
            .skip_while(|line| line.trim().is_empty())
            .filter(|line| mode == ChartMode::Fullscreen || !(self.axis_row)(line))
            .collect();
        rows.truncate(body_rows);
        rows.resize(body_rows, String::new());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SpotsimError;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    /// Returns canned lines and remembers the last request.
    struct Canned {
        lines: Vec<String>,
        seen: Arc<Mutex<Option<PlotRequest>>>,
    }

    impl Rasterizer for Canned {
        fn rasterize(&self, request: &PlotRequest) -> Result<Vec<String>, SpotsimError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(self.lines.clone())
        }
    }

    struct Broken;

    impl Rasterizer for Broken {
        fn rasterize(&self, _request: &PlotRequest) -> Result<Vec<String>, SpotsimError> {
            Err(SpotsimError::Render {
                reason: "boom".into(),
            })
        }
    }

    fn canned(lines: &[&str]) -> (ChartRenderer, Arc<Mutex<Option<PlotRequest>>>) {
        let seen = Arc::new(Mutex::new(None));
        let raster = Canned {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            seen: Arc::clone(&seen),
        };
        (ChartRenderer::new(Box::new(raster)), seen)
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle {
                    timestamp: 1_700_000_000_000 + i as i64 * 900_000,
                    open: base,
                    high: base + 2.0,
                    low: base - 3.0,
                    close: if i % 2 == 0 { base + 1.0 } else { base - 1.0 },
                    volume: 10.0,
                }
            })
            .collect()
    }

    #[test]
    fn axis_row_detection() {
        assert!(is_numeric_axis_row("  0    5    10   15 "));
        assert!(is_numeric_axis_row("-1,234.5"));
        assert!(is_numeric_axis_row("12.5"));
        assert!(!is_numeric_axis_row("1.5"));
        assert!(!is_numeric_axis_row("   "));
        assert!(!is_numeric_axis_row("│ ─── │ 12"));
        assert!(!is_numeric_axis_row("Plot error: 1234"));
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(strip_markup("\x1b[32m│\x1b[0m ab\x1b[1;31m─\x1b[0m"), "│ ab─");
        assert_eq!(strip_markup("plain"), "plain");
    }

    #[test]
    fn fit_width_pads_and_truncates_by_chars() {
        assert_eq!(fit_width("ab", 4), "ab  ");
        assert_eq!(fit_width("│││││", 3), "│││");
        assert_eq!(fit_width("", 0), "");
    }

    #[test]
    fn segments_follow_candle_shape() {
        let bear = Candle {
            timestamp: 0,
            open: 10.0,
            high: 12.0,
            low: 7.0,
            close: 8.0,
            volume: 0.0,
        };
        let segs = candle_segments(3, &bear);
        assert!(segs.iter().all(|s| s.tone == Tone::Bear));
        assert_eq!(segs[0].from, (3.0, 8.0));
        assert_eq!(segs[0].to, (3.0, 12.0));
        assert_eq!(segs[1].from, (3.0, 7.0));
        assert_eq!(segs[1].to, (3.0, 10.0));
        assert_eq!(segs[2].from.0, 3.0 - BODY_HALF_WIDTH);
        assert_eq!(segs[2].to.0, 3.0 + BODY_HALF_WIDTH);
    }

    #[test]
    fn empty_window_gives_placeholder_grid() {
        let (renderer, seen) = canned(&["never"]);
        let rows = renderer.render(&[], 6, 20, ChartMode::Mini);
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.chars().count() == 20));
        assert!(rows[0].starts_with(EMPTY_NOTICE));
        assert_eq!(rows[5].trim(), "");
        assert!(seen.lock().unwrap().is_none());
    }

    #[test]
    fn request_uses_tight_vertical_scale() {
        let (renderer, seen) = canned(&["x"]);
        let window = candles(5);
        renderer.render(&window, 10, 40, ChartMode::Mini);
        let request = seen.lock().unwrap().clone().unwrap();
        let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(request.y_range, (low, high));
        assert_eq!(request.segments.len(), 30);
        assert_eq!(request.height, 9);
        assert!(!request.x_ticks);
    }

    #[test]
    fn fullscreen_asks_for_ticks() {
        let (renderer, seen) = canned(&["x"]);
        renderer.render(&candles(3), 10, 40, ChartMode::Fullscreen);
        assert!(seen.lock().unwrap().as_ref().unwrap().x_ticks);
    }

    #[test]
    fn mini_drops_axis_rows_fullscreen_keeps_them() {
        let lines = ["", "  ", "\x1b[32m │ \x1b[0m", "0   1   2   3", " ─┼─ "];
        let (renderer, _) = canned(&lines);
        let mini = renderer.render(&candles(4), 5, 16, ChartMode::Mini);
        assert_eq!(mini[0].trim_end(), " │");
        assert_eq!(mini[1].trim_end(), " ─┼─");
        assert_eq!(mini[2].trim(), "");

        let (renderer, _) = canned(&lines);
        let full = renderer.render(&candles(4), 5, 16, ChartMode::Fullscreen);
        assert_eq!(full[1].trim_end(), "0   1   2   3");
    }

    #[test]
    fn long_output_keeps_the_top_rows() {
        let lines: Vec<String> = (0..20).map(|i| format!("row{i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (renderer, _) = canned(&refs);
        let rows = renderer.render(&candles(4), 4, 10, ChartMode::Mini);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].trim_end(), "row0");
        assert_eq!(rows[2].trim_end(), "row2");
    }

    #[test]
    fn time_row_labels_newest_candles() {
        let window = candles(8);
        let (renderer, _) = canned(&["x"]);
        let rows = renderer.render(&window, 4, 200, ChartMode::Mini);
        let expected: Vec<String> = window[5..].iter().map(Candle::time_label).collect();
        assert_eq!(rows[3].trim_end(), expected.join(" "));
    }

    #[test]
    fn rasterizer_failure_becomes_diagnostic_row() {
        let renderer = ChartRenderer::new(Box::new(Broken));
        let rows = renderer.render(&candles(3), 8, 30, ChartMode::Mini);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("Plot error: render error: boom"));
        assert_eq!(rows[0].chars().count(), 30);
    }

    #[test]
    fn zero_height_yields_nothing() {
        let (renderer, _) = canned(&["x"]);
        assert!(renderer.render(&candles(2), 0, 10, ChartMode::Mini).is_empty());
    }

    #[test]
    fn custom_predicate_is_used() {
        let (renderer, _) = canned(&["keep", "drop me", "keep too"]);
        let renderer = renderer.with_axis_row_predicate(|row| row.starts_with("drop"));
        let rows = renderer.render(&candles(2), 4, 10, ChartMode::Mini);
        assert_eq!(rows[0].trim_end(), "keep");
        assert_eq!(rows[1].trim_end(), "keep too");
    }

    proptest! {
        #[test]
        fn output_is_always_height_by_width(
            n in 0usize..40,
            height in 1usize..60,
            width in 0usize..120,
            raw_rows in 0usize..80,
            fullscreen in any::<bool>(),
        ) {
            let lines: Vec<String> = (0..raw_rows)
                .map(|i| format!("\x1b[31m{}\x1b[0m", "│".repeat(i % 150)))
                .collect();
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let (renderer, _) = canned(&refs);
            let mode = if fullscreen { ChartMode::Fullscreen } else { ChartMode::Mini };
            let rows = renderer.render(&candles(n), height, width, mode);
            prop_assert_eq!(rows.len(), height);
            for row in &rows {
                prop_assert_eq!(row.chars().count(), width);
            }
        }
    }
}
