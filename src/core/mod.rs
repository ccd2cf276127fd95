//! Core session state and value types
//!
//! This module contains:
//! - The live cut/loop preferences and per-file metadata cache
//! - Thread-safe session state with change broadcast
//! - Time text formatting/parsing for the boundary editors
//! - Threshold percentage text handling

mod prefs;
mod session;
pub mod threshold;
pub mod time;

pub use prefs::{calculate_file_hash, AutoCutPrefs, CutPreferences, FileMetadata};
pub use session::{SessionListener, SessionState};
pub use threshold::{parse_threshold_percent, ThresholdEntry, ThresholdError};
pub use time::{format_time, parse_time, validate_time, ValidationResult};
