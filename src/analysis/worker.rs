//! Background silence analysis
//!
//! `SilenceAnalysisWorker` runs one scan at a time on a spawned thread and
//! marshals the result back through a channel. The owner drains the channel
//! on its own thread via [`AnalysisEvents::pump`]; results arriving after the
//! worker is gone are dropped, so a stale scan can never touch state.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::audio::{find_silence_in, find_silence_out, ScanConfig, SourceFactory, NOT_FOUND};
use crate::core::SessionState;

/// Host-side hooks the worker drives: the transport owning playback and the
/// surface that shows status text. Everything here must be callable from the
/// thread that pumps [`AnalysisEvents`].
pub trait WorkerClient: Send + Sync {
    fn loaded_file(&self) -> Option<PathBuf>;
    fn is_playing(&self) -> bool;
    fn stop_playback(&self);
    fn start_playback(&self);
    fn set_playhead(&self, seconds: f64);
    fn is_cut_mode_active(&self) -> bool;
    fn set_cut_start(&self, seconds: f64);
    fn set_cut_end(&self, seconds: f64);
    fn log_status(&self, message: &str, is_error: bool);
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Seconds of audio kept after the last non-silent sample.
    pub tail_padding_secs: f64,
    pub scan: ScanConfig,
    /// How long `Drop` waits for an in-flight scan before detaching it.
    pub join_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tail_padding_secs: 0.05,
            scan: ScanConfig::default(),
            join_timeout: Duration::from_secs(4),
        }
    }
}

struct ScanData {
    result: i64,
    sample_rate: f64,
    len_samples: i64,
}

/// One finished scan, sent from the background thread.
struct ScanOutcome {
    path: PathBuf,
    detect_in: bool,
    was_playing: bool,
    scan: Result<ScanData, String>,
}

struct WorkerShared {
    session: Arc<SessionState>,
    client: Arc<dyn WorkerClient>,
    config: WorkerConfig,
    busy: AtomicBool,
    cancel: AtomicBool,
}

impl WorkerShared {
    /// Applies a finished scan on the pumping thread. `busy` is cleared last
    /// so observers never see an idle worker with unapplied results.
    fn apply(&self, outcome: ScanOutcome) {
        match outcome.scan {
            Err(message) => {
                self.client.log_status(&message, true);
            }
            Ok(scan) => {
                let mut meta = self.session.get_metadata_for_file(&outcome.path);
                if scan.len_samples <= 0 {
                    self.client
                        .log_status("Error: audio file has zero length.", true);
                    meta.is_analyzed = true;
                    self.session.set_metadata_for_file(&outcome.path, meta);
                } else if scan.result == NOT_FOUND {
                    self.client
                        .log_status("No silence boundaries detected.", false);
                    meta.is_analyzed = true;
                    self.session.set_metadata_for_file(&outcome.path, meta);
                } else if outcome.detect_in {
                    meta.cut_in = scan.result as f64 / scan.sample_rate;
                    meta.is_analyzed = true;
                    let cut_in = meta.cut_in;
                    self.session.set_metadata_for_file(&outcome.path, meta);
                    self.client.set_cut_start(cut_in);
                    if self.client.is_cut_mode_active() {
                        self.client.set_playhead(cut_in);
                    }
                    self.client.log_status("Silence analysis complete.", false);
                } else {
                    let padding = scan.sample_rate * self.config.tail_padding_secs;
                    let padded =
                        (scan.result as f64 + padding).min(scan.len_samples as f64);
                    meta.cut_out = padded / scan.sample_rate;
                    meta.is_analyzed = true;
                    let cut_out = meta.cut_out;
                    self.session.set_metadata_for_file(&outcome.path, meta);
                    self.client.set_cut_end(cut_out);
                    self.client.log_status("Silence analysis complete.", false);
                }
            }
        }
        if outcome.was_playing {
            self.client.start_playback();
        }
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Owns one background scan thread at a time. Dropping the worker cancels
/// any in-flight scan and waits briefly for the thread to wind down.
pub struct SilenceAnalysisWorker {
    shared: Arc<WorkerShared>,
    factory: Arc<dyn SourceFactory>,
    tx: Sender<ScanOutcome>,
    join: Mutex<Option<JoinHandle<()>>>,
    detecting_in: AtomicBool,
}

/// Receiving half of the worker's result channel. Pump this from the thread
/// that owns session mutation.
pub struct AnalysisEvents {
    rx: Receiver<ScanOutcome>,
    shared: Weak<WorkerShared>,
}

impl AnalysisEvents {
    /// Drains finished scans and applies them. Returns how many were applied.
    pub fn pump(&self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            match self.shared.upgrade() {
                Some(shared) => {
                    shared.apply(outcome);
                    applied += 1;
                }
                // Worker is gone; the result is stale.
                None => debug!("Dropping scan result for {:?}", outcome.path),
            }
        }
        applied
    }
}

impl SilenceAnalysisWorker {
    pub fn new(
        session: Arc<SessionState>,
        client: Arc<dyn WorkerClient>,
        factory: Arc<dyn SourceFactory>,
        config: WorkerConfig,
    ) -> (Self, AnalysisEvents) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(WorkerShared {
            session,
            client,
            config,
            busy: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
        });
        let events = AnalysisEvents {
            rx,
            shared: Arc::downgrade(&shared),
        };
        (
            Self {
                shared,
                factory,
                tx,
                join: Mutex::new(None),
                detecting_in: AtomicBool::new(false),
            },
            events,
        )
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::SeqCst)
    }

    /// True while the current (or most recent) scan looks for the cut-in.
    pub fn is_detecting_in(&self) -> bool {
        self.detecting_in.load(Ordering::SeqCst)
    }

    /// Kicks off a scan for the loaded file. A no-op while a scan is already
    /// running; callers re-trigger once the worker goes idle.
    pub fn start_analysis(&self, detect_in: bool) {
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Silence analysis already running, ignoring request");
            return;
        }

        let Some(path) = self.shared.client.loaded_file() else {
            self.shared.client.log_status("No audio loaded.", true);
            self.shared.busy.store(false, Ordering::SeqCst);
            return;
        };

        self.detecting_in.store(detect_in, Ordering::SeqCst);
        self.shared.cancel.store(false, Ordering::SeqCst);

        let was_playing = self.shared.client.is_playing();
        if was_playing {
            self.shared.client.stop_playback();
        }

        let prefs = self.shared.session.get_cut_prefs();
        let threshold = if detect_in {
            prefs.auto_cut.threshold_in
        } else {
            prefs.auto_cut.threshold_out
        };
        let scan_config = self.shared.config.scan;
        let factory = Arc::clone(&self.factory);
        let shared = Arc::clone(&self.shared);
        let tx = self.tx.clone();

        let handle = std::thread::spawn(move || {
            debug!(
                "Scanning {:?} for {} boundary, threshold {}",
                path,
                if detect_in { "in" } else { "out" },
                threshold
            );
            let scan = factory.open(&path).map(|mut source| {
                let result = if detect_in {
                    find_silence_in(
                        source.as_mut(),
                        threshold,
                        scan_config,
                        Some(&shared.cancel),
                    )
                } else {
                    find_silence_out(
                        source.as_mut(),
                        threshold,
                        scan_config,
                        Some(&shared.cancel),
                    )
                };
                ScanData {
                    result,
                    sample_rate: source.sample_rate(),
                    len_samples: source.len_samples(),
                }
            });
            // Receiver gone means the owner is shutting down.
            let _ = tx.send(ScanOutcome {
                path,
                detect_in,
                was_playing,
                scan,
            });
        });
        *self.join.lock().unwrap() = Some(handle);
    }
}

impl Drop for SilenceAnalysisWorker {
    fn drop(&mut self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
        let Some(handle) = self.join.lock().unwrap().take() else {
            return;
        };
        let deadline = Instant::now() + self.shared.config.join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("Silence analysis thread did not stop in time, detaching");
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = handle.join();
    }
}
