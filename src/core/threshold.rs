//! Threshold text representation
//!
//! Silence thresholds are edited as whole percentages ("5" means 0.05
//! normalized amplitude). Valid input is 1-99 inclusive; anything else is
//! rejected and the editor reverts to the last valid value.

/// Why a threshold edit was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdError {
    /// Parsed as an integer but outside 1-99.
    OutOfRange(i64),
    /// Not an integer at all.
    Invalid,
}

/// Parse percentage text into a normalized threshold, or `None` if rejected.
pub fn parse_threshold_percent(text: &str) -> Option<f32> {
    match text.trim().parse::<i64>() {
        Ok(value) if (1..=99).contains(&value) => Some(value as f32 / 100.0),
        _ => None,
    }
}

/// Display a normalized threshold as its integer percentage.
pub fn threshold_percent_text(value: f32) -> String {
    ((value * 100.0).round() as i32).to_string()
}

/// Backing state for one threshold editor.
///
/// Holds the last valid value so rejected input can restore it; the editor
/// layer only needs `apply_text` and `text`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEntry {
    current: f32,
}

impl ThresholdEntry {
    pub fn new(initial: f32) -> Self {
        Self { current: initial }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    /// The text the editor should display for the current value.
    pub fn text(&self) -> String {
        threshold_percent_text(self.current)
    }

    /// Apply editor text. On success the new normalized value is stored and
    /// returned; on rejection the stored value is untouched and the error
    /// says whether this was out-of-range (warning) or unparseable (error).
    pub fn apply_text(&mut self, text: &str) -> Result<f32, ThresholdError> {
        match text.trim().parse::<i64>() {
            Ok(value) if (1..=99).contains(&value) => {
                self.current = value as f32 / 100.0;
                Ok(self.current)
            }
            Ok(value) => Err(ThresholdError::OutOfRange(value)),
            Err(_) => Err(ThresholdError::Invalid),
        }
    }
}
