//! Shared playback/cut state records
//!
//! `CutPreferences` is the live state owned by `SessionState`; `FileMetadata`
//! is the per-file cache entry remembering cut points across file switches.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Auto-cut sub-state: which boundaries are auto-managed and at what
/// normalized amplitude threshold the scanner looks for them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AutoCutPrefs {
    pub in_active: bool,
    pub out_active: bool,
    pub threshold_in: f32,
    pub threshold_out: f32,
}

/// The live cut/loop state.
///
/// Invariant: `cut_in <= cut_out` at all times; `SessionState` mutators clamp
/// the other side whenever a write would violate it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CutPreferences {
    /// Whether cut/loop enforcement is in effect during playback.
    pub active: bool,
    pub cut_in: f64,
    pub cut_out: f64,
    pub autoplay: bool,
    pub auto_cut: AutoCutPrefs,
}

/// Cached per-file cut points, keyed by absolute path in `SessionState`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileMetadata {
    pub cut_in: f64,
    pub cut_out: f64,
    /// Set once a silence scan has run for this file, even if it failed,
    /// so a broken file is not rescanned on every reselect.
    pub is_analyzed: bool,
    /// Content fingerprint, see [`calculate_file_hash`].
    pub hash: String,
}

/// Cheap content fingerprint from path, size, and mtime.
///
/// Not cryptographic; only needs to notice a file being replaced in place.
pub fn calculate_file_hash(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    if let Ok(meta) = std::fs::metadata(path) {
        meta.len().hash(&mut hasher);
        if let Ok(modified) = meta.modified() {
            modified.hash(&mut hasher);
        }
    }
    format!("{:016x}", hasher.finish())
}
