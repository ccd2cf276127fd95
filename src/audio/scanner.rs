//! Chunked silence scan
//!
//! Finds the first and last sample whose amplitude exceeds a threshold,
//! reading fixed-size chunks through a [`SampleSource`] so memory stays
//! constant no matter how long the file is.

use std::sync::atomic::{AtomicBool, Ordering};

use super::source::SampleSource;

/// Returned when no sample exceeds the threshold, or the scan could not run.
pub const NOT_FOUND: i64 = -1;

/// Chunking parameters for a scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Frames read per chunk.
    pub chunk_samples: usize,
    /// Channel counts above this are rejected as malformed.
    pub max_channels: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_samples: 65536,
            max_channels: 128,
        }
    }
}

fn cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Scans forward for the first sample with `|sample| > threshold`.
///
/// Returns the frame index, or [`NOT_FOUND`] if every sample is at or below
/// the threshold, the source is empty or malformed, a read fails, or the
/// scan is cancelled.
pub fn find_silence_in(
    source: &mut dyn SampleSource,
    threshold: f32,
    config: ScanConfig,
    cancel: Option<&AtomicBool>,
) -> i64 {
    let channels = source.channels();
    let len = source.len_samples();
    if channels == 0 || channels > config.max_channels || len <= 0 {
        return NOT_FOUND;
    }

    let mut chunk = vec![0.0f32; config.chunk_samples * channels];
    let mut pos: i64 = 0;
    while pos < len {
        if cancelled(cancel) {
            return NOT_FOUND;
        }
        let frames = config.chunk_samples.min((len - pos) as usize);
        if source.read(&mut chunk, pos, frames).is_err() {
            return NOT_FOUND;
        }
        for frame in 0..frames {
            for ch in 0..channels {
                if chunk[frame * channels + ch].abs() > threshold {
                    return pos + frame as i64;
                }
            }
        }
        pos += frames as i64;
    }
    NOT_FOUND
}

/// Scans backward for the last sample with `|sample| > threshold`.
///
/// Same contract as [`find_silence_in`], walking chunks from the end of the
/// source toward the start.
pub fn find_silence_out(
    source: &mut dyn SampleSource,
    threshold: f32,
    config: ScanConfig,
    cancel: Option<&AtomicBool>,
) -> i64 {
    let channels = source.channels();
    let len = source.len_samples();
    if channels == 0 || channels > config.max_channels || len <= 0 {
        return NOT_FOUND;
    }

    let mut chunk = vec![0.0f32; config.chunk_samples * channels];
    let mut end = len;
    while end > 0 {
        if cancelled(cancel) {
            return NOT_FOUND;
        }
        let frames = config.chunk_samples.min(end as usize);
        let pos = end - frames as i64;
        if source.read(&mut chunk, pos, frames).is_err() {
            return NOT_FOUND;
        }
        for frame in (0..frames).rev() {
            for ch in 0..channels {
                if chunk[frame * channels + ch].abs() > threshold {
                    return pos + frame as i64;
                }
            }
        }
        end = pos;
    }
    NOT_FOUND
}
