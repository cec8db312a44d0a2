//! Text rasterization port trait.

use crate::domain::error::SpotsimError;

/// Colour tag attached to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Bull,
    Bear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub tone: Tone,
}

impl Segment {
    pub fn new(from: (f64, f64), to: (f64, f64), tone: Tone) -> Self {
        Segment { from, to, tone }
    }
}

/// Everything the rasterizer needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub width: usize,
    pub height: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub segments: Vec<Segment>,
    /// Reserve the bottom row for numeric x tick labels.
    pub x_ticks: bool,
}

/// Turns line segments into text lines, possibly with embedded colour markup.
pub trait Rasterizer {
    fn rasterize(&self, request: &PlotRequest) -> Result<Vec<String>, SpotsimError>;
}
