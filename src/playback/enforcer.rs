//! Cut boundary enforcement during playback
//!
//! Pure policy functions plus a thin wrapper that reads the live preferences
//! and drives a transport. Called from a playback timer, so everything here
//! is cheap and lock-light.

use std::sync::Arc;

use crate::core::SessionState;

/// What the transport should do after a boundary check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryAction {
    None,
    SeekTo(f64),
    Stop,
}

/// Minimal transport surface the enforcer drives.
pub trait Transport {
    fn position(&self) -> f64;
    fn seek(&self, seconds: f64);
    fn stop(&self);
}

/// Boundary policy for one playback tick. Boundaries are normalized with
/// min/max so a transiently inverted pair still behaves; a degenerate region
/// (`out <= in` after normalizing) disables enforcement entirely.
pub fn enforce(position: f64, cut_in: f64, cut_out: f64, repeat: bool) -> BoundaryAction {
    let lo = cut_in.min(cut_out);
    let hi = cut_in.max(cut_out);
    if hi <= lo || position < hi {
        return BoundaryAction::None;
    }
    if repeat {
        BoundaryAction::SeekTo(lo)
    } else {
        BoundaryAction::Stop
    }
}

/// Clamps a position into the effective cut region.
pub fn constrain_position(position: f64, cut_in: f64, cut_out: f64) -> f64 {
    let lo = cut_in.min(cut_out);
    let hi = cut_in.max(cut_out);
    position.clamp(lo, hi)
}

/// How many frames of an output block fall before the cut-out, for trimming
/// the tail of the final rendered block.
pub fn samples_to_keep(
    block_start: i64,
    block_len: usize,
    cut_out_secs: f64,
    sample_rate: f64,
) -> usize {
    let cut_out_sample = (cut_out_secs * sample_rate).floor() as i64;
    (cut_out_sample - block_start).clamp(0, block_len as i64) as usize
}

/// Applies the boundary policy to a live transport using the session's
/// current preferences. Does nothing while cut mode is off.
pub struct PlaybackBoundaryEnforcer {
    session: Arc<SessionState>,
}

impl PlaybackBoundaryEnforcer {
    pub fn new(session: Arc<SessionState>) -> Self {
        Self { session }
    }

    /// One playback-timer tick.
    pub fn tick(&self, transport: &dyn Transport, repeat: bool) {
        let prefs = self.session.get_cut_prefs();
        if !prefs.active {
            return;
        }
        match enforce(transport.position(), prefs.cut_in, prefs.cut_out, repeat) {
            BoundaryAction::None => {}
            BoundaryAction::SeekTo(seconds) => transport.seek(seconds),
            BoundaryAction::Stop => transport.stop(),
        }
    }

    /// One-shot jump to the effective cut-in, used after a boundary edit.
    pub fn jump_to_cut_in(&self, transport: &dyn Transport) {
        let prefs = self.session.get_cut_prefs();
        transport.seek(prefs.cut_in.min(prefs.cut_out));
    }

    /// Pulls an out-of-region position back inside, used when cut mode is
    /// (re)activated or a boundary moves under a paused playhead.
    pub fn constrain(&self, transport: &dyn Transport) {
        let prefs = self.session.get_cut_prefs();
        if !prefs.active {
            return;
        }
        let position = transport.position();
        let clamped = constrain_position(position, prefs.cut_in, prefs.cut_out);
        if clamped != position {
            transport.seek(clamped);
        }
    }
}
