#![cfg(test)]
//! Shared test fixtures
//!
//! `SparseSource` fakes an audio file of arbitrary length without holding
//! samples in memory; `RecordingClient` records every call the analysis
//! worker makes into it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::analysis::WorkerClient;
use crate::audio::{SampleSource, SourceFactory};

/// Sample source that is silent everywhere except a handful of samples.
/// Length is only reported, so multi-billion-frame sources cost nothing.
pub struct SparseSource {
    len: i64,
    channels: usize,
    rate: f64,
    hits: HashMap<(i64, usize), f32>,
    fail_from: Option<i64>,
}

impl SparseSource {
    pub fn new(len: i64, channels: usize, rate: f64, hits: Vec<(i64, f32)>) -> Self {
        let hits = hits.into_iter().map(|(frame, amp)| ((frame, 0), amp)).collect();
        Self {
            len,
            channels,
            rate,
            hits,
            fail_from: None,
        }
    }

    /// Places a sample in a specific channel.
    pub fn set_sample(&mut self, frame: i64, channel: usize, amplitude: f32) {
        self.hits.insert((frame, channel), amplitude);
    }

    /// Makes every read starting at or past `frame` fail.
    pub fn fail_reads_at(&mut self, frame: i64) {
        self.fail_from = Some(frame);
    }
}

impl SampleSource for SparseSource {
    fn sample_rate(&self) -> f64 {
        self.rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn len_samples(&self) -> i64 {
        self.len
    }

    fn read(&mut self, dest: &mut [f32], start: i64, frames: usize) -> Result<(), String> {
        if self.fail_from.is_some_and(|f| start >= f) {
            return Err("Simulated read failure".to_string());
        }
        dest[..frames * self.channels].fill(0.0);
        for (&(frame, channel), &amplitude) in &self.hits {
            if frame >= start && frame < start + frames as i64 {
                dest[(frame - start) as usize * self.channels + channel] = amplitude;
            }
        }
        Ok(())
    }
}

/// Factory handing out fresh [`SparseSource`] instances, or a fixed error.
pub struct SparseFactory {
    len: i64,
    channels: usize,
    rate: f64,
    hits: Vec<(i64, f32)>,
    fail: Option<String>,
    open_delay: Duration,
}

impl SparseFactory {
    pub fn with_hits(len: i64, channels: usize, rate: f64, hits: Vec<(i64, f32)>) -> Self {
        Self {
            len,
            channels,
            rate,
            hits,
            fail: None,
            open_delay: Duration::ZERO,
        }
    }

    pub fn silent(len: i64) -> Self {
        Self::with_hits(len, 1, 44100.0, vec![])
    }

    pub fn failing(message: &str) -> Self {
        let mut factory = Self::silent(0);
        factory.fail = Some(message.to_string());
        factory
    }

    /// Stalls `open` to keep the worker observably busy.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }
}

impl SourceFactory for SparseFactory {
    fn open(&self, _path: &std::path::Path) -> Result<Box<dyn SampleSource>, String> {
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        if let Some(message) = &self.fail {
            return Err(message.clone());
        }
        Ok(Box::new(SparseSource::new(
            self.len,
            self.channels,
            self.rate,
            self.hits.clone(),
        )))
    }
}

/// Worker client that records everything the worker tells it.
pub struct RecordingClient {
    loaded: Mutex<Option<PathBuf>>,
    playing: AtomicBool,
    cut_mode: AtomicBool,
    statuses: Mutex<Vec<(String, bool)>>,
    cut_starts: Mutex<Vec<f64>>,
    cut_ends: Mutex<Vec<f64>>,
    playheads: Mutex<Vec<f64>>,
    stop_count: AtomicUsize,
    start_count: AtomicUsize,
}

impl RecordingClient {
    pub fn new(loaded: Option<PathBuf>) -> Self {
        Self {
            loaded: Mutex::new(loaded),
            playing: AtomicBool::new(false),
            cut_mode: AtomicBool::new(false),
            statuses: Mutex::new(Vec::new()),
            cut_starts: Mutex::new(Vec::new()),
            cut_ends: Mutex::new(Vec::new()),
            playheads: Mutex::new(Vec::new()),
            stop_count: AtomicUsize::new(0),
            start_count: AtomicUsize::new(0),
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn set_cut_mode(&self, active: bool) {
        self.cut_mode.store(active, Ordering::SeqCst);
    }

    pub fn statuses(&self) -> Vec<(String, bool)> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn cut_starts(&self) -> Vec<f64> {
        self.cut_starts.lock().unwrap().clone()
    }

    pub fn cut_ends(&self) -> Vec<f64> {
        self.cut_ends.lock().unwrap().clone()
    }

    pub fn playheads(&self) -> Vec<f64> {
        self.playheads.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.statuses.lock().unwrap().clear();
        self.cut_starts.lock().unwrap().clear();
        self.cut_ends.lock().unwrap().clear();
        self.playheads.lock().unwrap().clear();
        self.stop_count.store(0, Ordering::SeqCst);
        self.start_count.store(0, Ordering::SeqCst);
    }
}

impl WorkerClient for RecordingClient {
    fn loaded_file(&self) -> Option<PathBuf> {
        self.loaded.lock().unwrap().clone()
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn stop_playback(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.stop_count.fetch_add(1, Ordering::SeqCst);
    }

    fn start_playback(&self) {
        self.playing.store(true, Ordering::SeqCst);
        self.start_count.fetch_add(1, Ordering::SeqCst);
    }

    fn set_playhead(&self, seconds: f64) {
        self.playheads.lock().unwrap().push(seconds);
    }

    fn is_cut_mode_active(&self) -> bool {
        self.cut_mode.load(Ordering::SeqCst)
    }

    fn set_cut_start(&self, seconds: f64) {
        self.cut_starts.lock().unwrap().push(seconds);
    }

    fn set_cut_end(&self, seconds: f64) {
        self.cut_ends.lock().unwrap().push(seconds);
    }

    fn log_status(&self, message: &str, is_error: bool) {
        self.statuses.lock().unwrap().push((message.to_string(), is_error));
    }
}
