//! Page geometry and the finished page description.
//!
//! The layout engine produces a [`LayoutPlan`]; the pipeline wraps it with
//! heading metadata and the chart handle into a [`PageDescription`], which
//! is the output boundary — an external rendering collaborator turns it into
//! the final document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page points. Origin is the top-left corner
/// of the page; y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge (largest y).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Whether two rectangles overlap with positive area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// One placed line of narrative text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePlacement {
    /// The line content (never split mid-word).
    pub content: String,

    /// Vertical offset of the line's top edge, in page points.
    pub y: f32,
}

/// The layout engine's output: placed lines plus the chart's reserved region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    /// Text lines, top-down.
    pub lines: Vec<LinePlacement>,

    /// The region reserved for the chart; text never enters it.
    pub chart_region: Rect,

    /// Final line height after any automatic shrink.
    pub line_height: f32,

    /// Left edge of the text column.
    pub text_x: f32,

    /// Character budget per line used for wrapping.
    pub chars_per_line: usize,
}

impl LayoutPlan {
    /// Bounding rectangle of one placed line, for overlap checks.
    pub fn line_rect(&self, line: &LinePlacement, glyph_width: f32) -> Rect {
        Rect::new(
            self.text_x,
            line.y,
            line.content.chars().count() as f32 * glyph_width,
            self.line_height,
        )
    }
}

/// Opaque handle to the chart an external charting collaborator produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartHandle {
    /// Identifier the rendering collaborator resolves to chart bytes.
    pub id: String,

    /// Human-readable chart title.
    pub title: String,
}

/// The finished page description handed to the rendering/export collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDescription {
    /// Report heading (e.g. the worst segment's name).
    pub heading: String,

    /// Sub-heading line (metric and period context).
    pub subheading: String,

    /// Placed narrative text and reserved chart region.
    pub layout: LayoutPlan,

    /// The chart to embed.
    pub chart: ChartHandle,

    /// Which model produced the narrative, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// When the page was produced.
    pub generated_at: DateTime<Utc>,
}
