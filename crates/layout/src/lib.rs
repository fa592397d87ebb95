//! Adaptive page layout.
//!
//! Places the narrative in the band between the heading block and the chart
//! region, wrapping greedily at word boundaries. When the text does not fit
//! at the configured line height, the height shrinks stepwise until it does;
//! below the legibility floor the layout fails rather than letting text
//! invade the chart.

use tracing::debug;
use trendspotter_core::error::LayoutError;
use trendspotter_core::page::{LayoutPlan, LinePlacement, Rect};

/// Shrink factor applied per step when the text does not fit.
const SHRINK_STEP: f32 = 0.8;

/// Page geometry and type metrics for one layout run.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,

    /// Vertical space reserved for the heading block at the top of the page.
    pub heading_height: f32,

    /// Average glyph width, used to derive the per-line character budget.
    pub glyph_width: f32,

    /// Starting line height.
    pub line_height: f32,

    /// Line height below which text is no longer legible.
    pub min_line_height: f32,

    /// Height of the chart band anchored at the bottom of the page.
    pub chart_height: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        // US letter.
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 36.0,
            heading_height: 90.0,
            glyph_width: 6.0,
            line_height: 14.0,
            min_line_height: 6.0,
            chart_height: 220.0,
        }
    }
}

/// Lay out the narrative text beside the reserved chart region.
///
/// The chart band is fixed; the text adapts to it, never the other way
/// around. Words are never split across lines. A single word longer than the
/// character budget is placed on its own line and may run past the right
/// margin.
pub fn lay_out(text: &str, opts: &LayoutOptions) -> Result<LayoutPlan, LayoutError> {
    let column_width = opts.page_width - 2.0 * opts.margin;
    let chars_per_line = (column_width / opts.glyph_width).floor().max(1.0) as usize;

    let chart_region = Rect::new(
        opts.margin,
        opts.page_height - opts.margin - opts.chart_height,
        column_width,
        opts.chart_height,
    );

    let lines = wrap(text, chars_per_line);

    // Vertical space between the heading block and the top of the chart.
    let available = chart_region.y - opts.heading_height;

    if lines.is_empty() {
        return Ok(LayoutPlan {
            lines: Vec::new(),
            chart_region,
            line_height: opts.line_height,
            text_x: opts.margin,
            chars_per_line,
        });
    }

    if available <= 0.0 {
        return Err(LayoutError::NoTextRegion);
    }

    let required_at = |line_height: f32| lines.len() as f32 * line_height;

    let mut line_height = opts.line_height;
    while required_at(line_height) > available {
        let next = line_height * SHRINK_STEP;
        if next < opts.min_line_height {
            return Err(LayoutError::Overflow {
                required: required_at(opts.min_line_height),
                available,
            });
        }
        line_height = next;
    }

    if line_height < opts.line_height {
        debug!(
            from = opts.line_height,
            to = line_height,
            lines = lines.len(),
            "Shrunk line height to fit the text band"
        );
    }

    let placed = lines
        .into_iter()
        .enumerate()
        .map(|(i, content)| LinePlacement {
            content,
            y: opts.heading_height + i as f32 * line_height,
        })
        .collect();

    Ok(LayoutPlan {
        lines: placed,
        chart_region,
        line_height,
        text_x: opts.margin,
        chars_per_line,
    })
}

/// Greedy word wrap. Input newlines start new paragraphs; blank input lines
/// are preserved as empty output lines.
fn wrap(text: &str, chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.trim_end().split('\n') {
        let paragraph = paragraph.trim_end();
        if paragraph.trim().is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            continue;
        }

        let mut current = String::new();
        let mut current_chars = 0usize;

        for word in paragraph.split_whitespace() {
            let word_chars = word.chars().count();

            if current_chars == 0 {
                current.push_str(word);
                current_chars = word_chars;
            } else if current_chars + 1 + word_chars <= chars_per_line {
                current.push(' ');
                current.push_str(word);
                current_chars += 1 + word_chars;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_chars = word_chars;
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    // Trailing blank lines carry no content.
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines
}
