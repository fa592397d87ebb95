//! Guardrail validation of generated narratives.
//!
//! Every numeric token in the response must correspond, within tolerance, to
//! a value actually present in the context payload. The structural contract
//! (a `Cause:` section followed by an `Action:` section) is enforced at the
//! same time. The exact refusal sentinel always passes.

use serde::Serialize;
use thiserror::Error;
use trendspotter_core::payload::{ContextPayload, NarrativeResult, INCONCLUSIVE_SENTINEL};

/// Why a response was rejected.
#[derive(Debug, Error, Serialize)]
pub enum ValidationFailure {
    #[error("Response is empty")]
    Empty,

    #[error("Response cites a number not present in the context: {token}")]
    UngroundedNumber { token: f64 },

    #[error("Response is missing the Cause/Action structure")]
    MissingStructure,
}

/// A numeric token found in a response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberToken {
    pub value: f64,
    pub percent: bool,
}

/// Validate a cleaned response against the payload it was generated from.
pub fn validate(
    response: &str,
    payload: &ContextPayload,
    tolerance: f64,
) -> Result<NarrativeResult, ValidationFailure> {
    let trimmed = response.trim();

    if trimmed.is_empty() {
        return Err(ValidationFailure::Empty);
    }

    // The sentinel must stand alone. A sentence that merely contains it is
    // held to the full contract.
    if trimmed == INCONCLUSIVE_SENTINEL {
        return Ok(NarrativeResult::Inconclusive);
    }

    let cause = trimmed.find("Cause:");
    let action = trimmed.find("Action:");
    match (cause, action) {
        (Some(c), Some(a)) if c < a => {}
        _ => return Err(ValidationFailure::MissingStructure),
    }

    let allowed = payload.numeric_values();
    for token in scan_numbers(trimmed) {
        if !is_grounded(&token, &allowed, tolerance) {
            return Err(ValidationFailure::UngroundedNumber { token: token.value });
        }
    }

    Ok(NarrativeResult::Narrative {
        text: trimmed.to_string(),
    })
}

fn is_grounded(token: &NumberToken, allowed: &[f64], tolerance: f64) -> bool {
    let candidates = if token.percent {
        // A percentage may match either the percent-scaled value or the
        // underlying ratio.
        vec![token.value, token.value / 100.0]
    } else {
        vec![token.value]
    };

    candidates
        .iter()
        .any(|&v| allowed.iter().any(|&b| within_tolerance(v, b, tolerance)))
}

/// Relative tolerance with an absolute floor of 0.5 for values at or above
/// one, so that rounding to a whole number never counts as invention.
fn within_tolerance(value: f64, baseline: f64, tolerance: f64) -> bool {
    let slack = if baseline.abs() >= 1.0 {
        (tolerance * baseline.abs()).max(0.5)
    } else {
        tolerance * baseline.abs()
    };
    (value - baseline).abs() <= slack
}

/// Scan a response for numeric tokens without allocating per token.
///
/// Recognizes an optional leading sign or `$`, thousands commas, one decimal
/// point (including leading-dot decimals like ".5"), and a `%` suffix. Digits
/// embedded in identifiers (preceded or followed by alphanumerics, or
/// hyphenated into a word) are not tokens.
pub fn scan_numbers(text: &str) -> Vec<NumberToken> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        // Reject digits glued to a word or hyphenated into one, as in
        // identifiers like "q3-2" or "v2". A dot before the digit only
        // suppresses the token in identifier context ("v2.5"); a free-standing
        // ".5" is a fractional token.
        let start = i;
        let mut leading_dot = false;
        let boundary_ok = match prev_relevant(bytes, start) {
            None => true,
            Some(p) => {
                let c = bytes[p];
                if c.is_ascii_alphanumeric() {
                    false
                } else if c == b'.' {
                    leading_dot = true;
                    match prev_relevant(bytes, p) {
                        Some(q) => !bytes[q].is_ascii_alphanumeric(),
                        None => true,
                    }
                } else if c == b'-' {
                    match prev_relevant(bytes, p) {
                        Some(q) => !bytes[q].is_ascii_alphanumeric(),
                        None => true,
                    }
                } else {
                    true
                }
            }
        };

        if !boundary_ok {
            // Skip past the whole digit run.
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            continue;
        }

        let negative = matches!(prev_relevant(bytes, start), Some(p) if bytes[p] == b'-');

        let mut int_part: f64 = 0.0;
        let mut frac_part: f64 = 0.0;
        let mut frac_scale: f64 = 1.0;
        let mut seen_dot = leading_dot;

        while i < bytes.len() {
            let c = bytes[i];
            if c.is_ascii_digit() {
                let d = (c - b'0') as f64;
                if seen_dot {
                    frac_scale *= 10.0;
                    frac_part += d / frac_scale;
                } else {
                    int_part = int_part * 10.0 + d;
                }
                i += 1;
            } else if c == b',' && !seen_dot && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit()
            {
                // Thousands separator.
                i += 1;
            } else if c == b'.' && !seen_dot && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit()
            {
                seen_dot = true;
                i += 1;
            } else {
                break;
            }
        }

        // A trailing alphanumeric glues the digits into an identifier.
        if i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            continue;
        }

        let percent = i < bytes.len() && bytes[i] == b'%';
        if percent {
            i += 1;
        }

        let mut value = int_part + frac_part;
        if negative {
            value = -value;
        }
        tokens.push(NumberToken { value, percent });
    }

    tokens
}

/// Index of the byte immediately before `pos`, if any. A `$` prefix is
/// transparent to boundary checks.
fn prev_relevant(bytes: &[u8], pos: usize) -> Option<usize> {
    let mut p = pos;
    while p > 0 {
        p -= 1;
        if bytes[p] == b'$' {
            continue;
        }
        return Some(p);
    }
    None
}
