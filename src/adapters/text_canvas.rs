//! Character-grid line rasterizer.
//!
//! Maps segment endpoints from data space onto a `width` x `height` grid,
//! draws axis-aligned segments with box-drawing characters and anything else
//! with dots, and colours each cell with ANSI escape codes by tone.

use crate::domain::error::SpotsimError;
use crate::ports::rasterizer_port::{PlotRequest, Rasterizer, Segment, Tone};

const BULL: &str = "\x1b[32m";
const BEAR: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const VERTICAL: char = '│';
const HORIZONTAL: char = '─';
const CROSS: char = '┼';
const DOT: char = '•';

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    tone: Option<Tone>,
}

const BLANK: Cell = Cell { ch: ' ', tone: None };

#[derive(Debug, Default, Clone, Copy)]
pub struct TextCanvas;

impl TextCanvas {
    pub fn new() -> Self {
        TextCanvas
    }
}

/// Linear map of `value` in `[lo, hi]` onto `0..=cells-1`; a degenerate range
/// maps to the middle cell.
fn scale(value: f64, (lo, hi): (f64, f64), cells: usize) -> usize {
    let last = cells.saturating_sub(1) as f64;
    let range = hi - lo;
    let pos = if range > 0.0 {
        (value - lo) / range * last
    } else {
        last / 2.0
    };
    pos.round().clamp(0.0, last) as usize
}

fn check_range(name: &str, (lo, hi): (f64, f64)) -> Result<(), SpotsimError> {
    if !lo.is_finite() || !hi.is_finite() || hi < lo {
        return Err(SpotsimError::Render {
            reason: format!("invalid {name} range ({lo}, {hi})"),
        });
    }
    Ok(())
}

struct Grid {
    cells: Vec<Vec<Cell>>,
    width: usize,
    rows: usize,
}

impl Grid {
    fn new(width: usize, rows: usize) -> Self {
        Grid {
            cells: vec![vec![BLANK; width]; rows],
            width,
            rows,
        }
    }

    fn put(&mut self, row: usize, col: usize, ch: char, tone: Tone) {
        let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) else {
            return;
        };
        let merged = match (cell.ch, ch) {
            (VERTICAL, HORIZONTAL) | (HORIZONTAL, VERTICAL) | (CROSS, _) => CROSS,
            (VERTICAL | HORIZONTAL, DOT) => cell.ch,
            _ => ch,
        };
        *cell = Cell {
            ch: merged,
            tone: Some(tone),
        };
    }

    fn draw(&mut self, segment: &Segment, request: &PlotRequest) {
        // Row 0 is the top of the chart, so y is flipped.
        let col = |x: f64| scale(x, request.x_range, self.width);
        let row = |y: f64| self.rows - 1 - scale(y, request.y_range, self.rows);
        let (c0, r0) = (col(segment.from.0), row(segment.from.1));
        let (c1, r1) = (col(segment.to.0), row(segment.to.1));

        if c0 == c1 {
            for r in r0.min(r1)..=r0.max(r1) {
                self.put(r, c0, VERTICAL, segment.tone);
            }
        } else if r0 == r1 {
            for c in c0.min(c1)..=c0.max(c1) {
                self.put(r0, c, HORIZONTAL, segment.tone);
            }
        } else {
            self.line(c0, r0, c1, r1, segment.tone);
        }
    }

    /// Bresenham between two grid points.
    fn line(&mut self, c0: usize, r0: usize, c1: usize, r1: usize, tone: Tone) {
        let (mut x, mut y) = (c0 as i64, r0 as i64);
        let (x1, y1) = (c1 as i64, r1 as i64);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(y as usize, x as usize, DOT, tone);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn into_lines(self) -> Vec<String> {
        self.cells.into_iter().map(|row| paint(&row)).collect()
    }
}

/// Render one row, switching colour only where the tone changes.
fn paint(row: &[Cell]) -> String {
    let mut out = String::new();
    let mut current: Option<Tone> = None;
    for cell in row {
        let tone = if cell.ch == ' ' { None } else { cell.tone };
        if tone != current {
            out.push_str(match tone {
                Some(Tone::Bull) => BULL,
                Some(Tone::Bear) => BEAR,
                None => RESET,
            });
            current = tone;
        }
        out.push(cell.ch);
    }
    if current.is_some() {
        out.push_str(RESET);
    }
    out
}

/// Integer x positions labelled left to right, skipping labels that would
/// touch the previous one.
fn tick_row(x_range: (f64, f64), width: usize) -> String {
    let mut row = vec![' '; width];
    let mut next_free = 0usize;
    let first = x_range.0.ceil() as i64;
    let last = x_range.1.floor() as i64;
    for tick in first..=last {
        let label = tick.to_string();
        let center = scale(tick as f64, x_range, width);
        let start = center.saturating_sub(label.len() / 2);
        if start < next_free || start + label.len() > width {
            continue;
        }
        for (i, ch) in label.chars().enumerate() {
            row[start + i] = ch;
        }
        next_free = start + label.len() + 1;
    }
    row.into_iter().collect()
}

impl Rasterizer for TextCanvas {
    fn rasterize(&self, request: &PlotRequest) -> Result<Vec<String>, SpotsimError> {
        check_range("x", request.x_range)?;
        check_range("y", request.y_range)?;

        let plot_rows = if request.x_ticks {
            request.height.saturating_sub(1)
        } else {
            request.height
        };
        if request.width == 0 || plot_rows == 0 {
            return Ok(Vec::new());
        }

        let mut grid = Grid::new(request.width, plot_rows);
        for segment in &request.segments {
            let finite = [segment.from.0, segment.from.1, segment.to.0, segment.to.1]
                .iter()
                .all(|v| v.is_finite());
            if !finite {
                return Err(SpotsimError::Render {
                    reason: "segment has non-finite coordinates".into(),
                });
            }
            grid.draw(segment, request);
        }

        let mut lines = grid.into_lines();
        if request.x_ticks {
            lines.push(tick_row(request.x_range, request.width));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::strip_markup;

    fn request(segments: Vec<Segment>, height: usize, width: usize, x_ticks: bool) -> PlotRequest {
        PlotRequest {
            width,
            height,
            x_range: (-0.5, 2.5),
            y_range: (0.0, 10.0),
            segments,
            x_ticks,
        }
    }

    fn plain(lines: &[String]) -> Vec<String> {
        lines.iter().map(|l| strip_markup(l)).collect()
    }

    #[test]
    fn vertical_segment_spans_rows() {
        let seg = Segment::new((1.0, 0.0), (1.0, 10.0), Tone::Bull);
        let lines = plain(&TextCanvas.rasterize(&request(vec![seg], 5, 9, false)).unwrap());
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.chars().nth(4) == Some(VERTICAL)));
    }

    #[test]
    fn extremes_map_to_first_and_last_rows() {
        let top = Segment::new((0.0, 10.0), (2.0, 10.0), Tone::Bull);
        let bottom = Segment::new((0.0, 0.0), (2.0, 0.0), Tone::Bear);
        let lines = plain(
            &TextCanvas
                .rasterize(&request(vec![top, bottom], 6, 12, false))
                .unwrap(),
        );
        assert!(lines[0].contains(HORIZONTAL));
        assert!(lines[5].contains(HORIZONTAL));
        assert!(lines[1..5].iter().all(|l| l.trim().is_empty()));
    }

    #[test]
    fn crossing_segments_merge() {
        let v = Segment::new((1.0, 0.0), (1.0, 10.0), Tone::Bull);
        let h = Segment::new((0.0, 5.0), (2.0, 5.0), Tone::Bull);
        let lines = plain(&TextCanvas.rasterize(&request(vec![v, h], 3, 9, false)).unwrap());
        assert_eq!(lines[1].chars().nth(4), Some(CROSS));
    }

    #[test]
    fn tones_are_coloured() {
        let bull = Segment::new((0.0, 0.0), (0.0, 10.0), Tone::Bull);
        let bear = Segment::new((2.0, 0.0), (2.0, 10.0), Tone::Bear);
        let lines = TextCanvas.rasterize(&request(vec![bull, bear], 2, 12, false)).unwrap();
        assert!(lines[0].contains(BULL));
        assert!(lines[0].contains(BEAR));
        assert!(lines[0].contains(RESET));
        assert_eq!(strip_markup(&lines[0]).chars().count(), 12);
    }

    #[test]
    fn tick_row_is_appended() {
        let seg = Segment::new((0.0, 0.0), (0.0, 10.0), Tone::Bull);
        let lines = TextCanvas.rasterize(&request(vec![seg], 4, 30, true)).unwrap();
        assert_eq!(lines.len(), 4);
        let ticks = &lines[3];
        assert_eq!(ticks.chars().count(), 30);
        let labels: Vec<&str> = ticks.split_whitespace().collect();
        assert_eq!(labels, vec!["0", "1", "2"]);
    }

    #[test]
    fn diagonal_segment_uses_dots() {
        let seg = Segment::new((0.0, 0.0), (2.0, 10.0), Tone::Bear);
        let lines = plain(&TextCanvas.rasterize(&request(vec![seg], 5, 9, false)).unwrap());
        assert!(lines.iter().all(|l| l.contains(DOT)));
    }

    #[test]
    fn degenerate_vertical_range_is_centred() {
        let mut req = request(vec![Segment::new((0.0, 5.0), (2.0, 5.0), Tone::Bull)], 5, 9, false);
        req.y_range = (5.0, 5.0);
        let lines = plain(&TextCanvas.rasterize(&req).unwrap());
        assert!(lines[2].contains(HORIZONTAL));
    }

    #[test]
    fn non_finite_range_is_an_error() {
        let mut req = request(Vec::new(), 5, 9, false);
        req.y_range = (0.0, f64::NAN);
        assert!(TextCanvas.rasterize(&req).is_err());
    }

    #[test]
    fn empty_grid_gives_no_lines() {
        assert!(TextCanvas.rasterize(&request(Vec::new(), 0, 9, false)).unwrap().is_empty());
        assert!(TextCanvas.rasterize(&request(Vec::new(), 1, 9, true)).unwrap().is_empty());
    }
}
