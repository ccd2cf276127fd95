//! Cutpoint — cut-boundary engine for an audio trimming editor
//!
//! Everything a trimming UI needs short of the UI itself: thread-safe
//! session state with change broadcast, silence detection over arbitrarily
//! long files in constant memory, a background analysis worker, boundary
//! enforcement during playback, and the auto-cut re-trigger logic that ties
//! them together.

pub mod analysis;
pub mod audio;
pub mod core;
pub mod logging;
pub mod playback;
pub mod settings;

mod test_fixtures;

pub use crate::analysis::{
    AnalysisEvents, AutoCutCoordinator, SilenceAnalysisWorker, WorkerClient, WorkerConfig,
};
pub use crate::audio::{SampleSource, ScanConfig, SourceFactory, SymphoniaFactory};
pub use crate::core::{CutPreferences, FileMetadata, SessionListener, SessionState};
pub use crate::playback::{BoundaryAction, PlaybackBoundaryEnforcer, Transport};
pub use crate::settings::AppSettings;
