//! Random-access sample source abstraction
//!
//! The silence scanner and the analysis worker read audio through this trait
//! so they never care which container or codec is behind it, and so tests
//! can substitute synthetic sources of arbitrary reported length.

use std::path::Path;

/// Random access to decoded audio as interleaved f32 frames.
///
/// Implementations own their decode state; a source is used from one thread
/// at a time and is never shared with the playback reader.
pub trait SampleSource: Send {
    fn sample_rate(&self) -> f64;

    fn channels(&self) -> usize;

    /// Total length in frames.
    fn len_samples(&self) -> i64;

    /// Fill `dest` with `frames * channels` interleaved samples starting at
    /// frame index `start`. Regions past the end of the file are zeroed.
    fn read(&mut self, dest: &mut [f32], start: i64, frames: usize) -> Result<(), String>;
}

/// Opens an independent [`SampleSource`] for a path.
///
/// The worker opens its own source per scan rather than sharing the
/// UI-owned playback reader across threads.
pub trait SourceFactory: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, String>;
}
