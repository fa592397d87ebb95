//! Prompt construction.
//!
//! Every number the generator is allowed to cite appears verbatim in the
//! DIAGNOSTIC DATA block; the instructions forbid anything outside it. The
//! validator enforces the same contract on the way back.

use trendspotter_core::payload::{ContextPayload, INCONCLUSIVE_SENTINEL};

/// Build the strict-context prompt for one payload.
///
/// The payload is the complete world the generator may draw on. Numbers are
/// rendered with fixed precision so the validator can match them back
/// exactly.
pub fn build_prompt(payload: &ContextPayload, materiality_threshold: f64) -> String {
    // Rate metrics read as percentages; currency metrics carry their units.
    let (loss, threshold) = if payload.is_rate_metric() {
        (
            format!("{:.1}%", payload.loss_magnitude * 100.0),
            format!("{:.1}%", materiality_threshold * 100.0),
        )
    } else {
        (
            format!("{:.2} {}", payload.loss_magnitude, payload.units),
            format!("{:.2} {}", materiality_threshold, payload.units),
        )
    };

    format!(
        "ACT AS a senior retail business analyst writing for an executive audience.\n\
         \n\
         ### DIAGNOSTIC DATA (STRICT TRUTH)\n\
         - Worst-performing segment: {segment}\n\
         - Loss magnitude: {loss} (metric: {metric})\n\
         - Average discount in this segment: {discount:.1}%\n\
         - Rows in segment: {segment_rows} of {row_count} total\n\
         \n\
         ### TASK\n\
         Write a short diagnostic narrative in exactly two labelled sections,\n\
         in this order:\n\
         Cause: one or two sentences explaining the most plausible driver of\n\
         the loss, grounded only in the data above.\n\
         Action: one or two sentences recommending a concrete corrective\n\
         step.\n\
         \n\
         ### RULES\n\
         1. Use ONLY the numbers in the DIAGNOSTIC DATA block. Do not\n\
            estimate, extrapolate, or invent any other figure.\n\
         2. Plain prose only. No markdown, no headings, no bullet lists.\n\
         3. If the data is insufficient to support a confident diagnosis, or\n\
            the loss is below {threshold}, reply with exactly:\n\
            {sentinel}",
        segment = payload.segment,
        metric = payload.metric,
        discount = payload.measure_mean * 100.0,
        segment_rows = payload.segment_rows,
        row_count = payload.row_count,
        sentinel = INCONCLUSIVE_SENTINEL,
    )
}
