//! Time formatting and parsing for the boundary editors
//!
//! The editors display positions as `HH:MM:SS:mmm`. Formatting truncates
//! sub-millisecond remainders rather than rounding; parsing is strict about
//! the field count and returns a sentinel for anything malformed.

/// Sentinel returned by [`parse_time`] for malformed input.
pub const PARSE_FAILED: f64 = -1.0;

/// Format a position in seconds as `HH:MM:SS:mmm`.
///
/// Negative input clamps to zero. Sub-millisecond remainders are truncated,
/// so `0.9999` formats as `00:00:00:999`, not `00:00:01:000`.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds < 0.0 { 0.0 } else { seconds };

    // Small epsilon keeps exact milliseconds from truncating one down
    // (0.001 * 1000.0 can land just below 1.0 in binary).
    let mut total_ms = (seconds * 1000.0 + 0.0001) as i64;

    let hours = total_ms / 3_600_000;
    total_ms %= 3_600_000;

    let minutes = total_ms / 60_000;
    total_ms %= 60_000;

    let secs = total_ms / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}:{:03}", hours, minutes, secs, millis)
}

/// Parse `HH:MM:SS:mmm` text into seconds.
///
/// A leading `-` is stripped and the magnitude parsed. Anything that is not
/// exactly four colon-separated non-negative integers yields [`PARSE_FAILED`].
pub fn parse_time(text: &str) -> f64 {
    let clean = text.strip_prefix('-').unwrap_or(text);

    let parts: Vec<&str> = clean.split(':').collect();
    if parts.len() != 4 {
        return PARSE_FAILED;
    }

    let mut fields = [0i64; 4];
    for (i, part) in parts.iter().enumerate() {
        match part.trim().parse::<i64>() {
            Ok(value) if value >= 0 => fields[i] = value,
            _ => return PARSE_FAILED,
        }
    }

    fields[0] as f64 * 3600.0
        + fields[1] as f64 * 60.0
        + fields[2] as f64
        + fields[3] as f64 / 1000.0
}

/// Outcome of validating editor text against the loaded file length.
///
/// `OutOfRange` (parseable but beyond the file) and `Invalid` (unparseable)
/// get different presentations: warning versus error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    OutOfRange,
    Invalid,
}

/// Classify editor text against `[0, total_length]`.
pub fn validate_time(text: &str, total_length: f64) -> ValidationResult {
    let position = parse_time(text);

    if position >= 0.0 && position <= total_length {
        ValidationResult::Valid
    } else if position == PARSE_FAILED {
        ValidationResult::Invalid
    } else {
        ValidationResult::OutOfRange
    }
}

/// Keyboard modifiers in effect while wheel-scrubbing a time editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

const STEP_HOURS: f64 = 3600.0;
const STEP_MINUTES: f64 = 60.0;
const STEP_SECONDS: f64 = 1.0;
const STEP_MILLIS: f64 = 0.01;
const STEP_MILLIS_FINE: f64 = 0.001;

/// Scrub step in seconds for a wheel event at `char_index` of `HH:MM:SS:mmm`.
///
/// The field under the cursor picks the base step; shift/ctrl refine it, alt
/// multiplies everything by ten. Over the milliseconds field, ctrl+shift
/// steps by a single sample when the rate is known.
pub fn calculate_step_size(char_index: i32, mods: StepModifiers, sample_rate: f64) -> f64 {
    let mut step = STEP_MILLIS;
    let mut is_millis = false;

    // Field layout: HH(0-1) : MM(3-4) : SS(6-7) : mmm(9-11)
    if (0..=1).contains(&char_index) {
        step = STEP_HOURS;
    } else if (3..=4).contains(&char_index) {
        step = STEP_MINUTES;
    } else if (6..=7).contains(&char_index) {
        step = STEP_SECONDS;
    } else if char_index >= 9 {
        is_millis = true;
    }

    if is_millis {
        if mods.ctrl && mods.shift {
            step = if sample_rate > 0.0 { 1.0 / sample_rate } else { 0.0001 };
        } else if mods.shift {
            step = STEP_MILLIS_FINE;
        }
    } else {
        let mut multiplier = 1.0;
        if mods.shift && mods.ctrl {
            multiplier = 0.01;
        } else if mods.shift {
            multiplier = 0.1;
        }
        step *= multiplier;
    }

    if mods.alt {
        step *= 10.0;
    }

    step
}
