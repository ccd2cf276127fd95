//! Thread-safe session state with change broadcast
//!
//! One `SessionState` owns the live `CutPreferences` and the per-file
//! metadata cache for the lifetime of the session. Every read and write goes
//! through a single mutex; listeners are notified after the mutation with the
//! lock released, so a listener calling back into a getter sees the new value
//! and cannot deadlock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use super::prefs::{CutPreferences, FileMetadata};

/// Observer of session changes. All methods default to no-ops so listeners
/// override only what they care about.
///
/// Callbacks run on whichever thread performed the mutation and must not
/// block.
pub trait SessionListener: Send + Sync {
    fn cut_preference_changed(&self, _prefs: &CutPreferences) {}
    fn cut_in_changed(&self, _seconds: f64) {}
    fn cut_out_changed(&self, _seconds: f64) {}
    fn file_changed(&self, _path: &Path) {}
}

enum Broadcast {
    Prefs(CutPreferences),
    CutIn(f64),
    CutOut(f64),
    File(PathBuf),
}

struct SessionInner {
    prefs: CutPreferences,
    current_file: Option<PathBuf>,
    /// Known length of the current file, used to clamp cut boundaries.
    total_duration: f64,
    metadata: BTreeMap<PathBuf, FileMetadata>,
}

/// Shared playback/cut state plus the per-file metadata cache.
///
/// All mutators are total: out-of-range input is clamped, never rejected, and
/// the `cut_in <= cut_out` invariant holds after every call. Setters that
/// would not change anything fire no notification.
pub struct SessionState {
    inner: Mutex<SessionInner>,
    listeners: Mutex<Vec<Weak<dyn SessionListener>>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                prefs: CutPreferences::default(),
                current_file: None,
                total_duration: 0.0,
                metadata: BTreeMap::new(),
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: &Arc<dyn SessionListener>) {
        self.listeners
            .lock()
            .unwrap()
            .push(Arc::downgrade(listener));
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SessionListener>) {
        let target = Arc::downgrade(listener);
        self.listeners
            .lock()
            .unwrap()
            .retain(|weak| !weak.ptr_eq(&target));
    }

    /// Snapshot copy of the live preferences.
    pub fn get_cut_prefs(&self) -> CutPreferences {
        self.inner.lock().unwrap().prefs
    }

    pub fn total_duration(&self) -> f64 {
        self.inner.lock().unwrap().total_duration
    }

    pub fn current_file_path(&self) -> Option<PathBuf> {
        self.inner.lock().unwrap().current_file.clone()
    }

    /// Update the known file length used for clamping. Does not broadcast.
    pub fn set_total_duration(&self, seconds: f64) {
        self.inner.lock().unwrap().total_duration = seconds.max(0.0);
    }

    pub fn set_cut_active(&self, active: bool) {
        self.set_bool_pref(active, |prefs| &mut prefs.active);
    }

    pub fn set_autoplay_active(&self, active: bool) {
        self.set_bool_pref(active, |prefs| &mut prefs.autoplay);
    }

    pub fn set_auto_cut_in_active(&self, active: bool) {
        self.set_bool_pref(active, |prefs| &mut prefs.auto_cut.in_active);
    }

    pub fn set_auto_cut_out_active(&self, active: bool) {
        self.set_bool_pref(active, |prefs| &mut prefs.auto_cut.out_active);
    }

    pub fn set_threshold_in(&self, threshold: f32) {
        self.set_float_pref(threshold, |prefs| &mut prefs.auto_cut.threshold_in);
    }

    pub fn set_threshold_out(&self, threshold: f32) {
        self.set_float_pref(threshold, |prefs| &mut prefs.auto_cut.threshold_out);
    }

    fn set_bool_pref(&self, value: bool, field: impl Fn(&mut CutPreferences) -> &mut bool) {
        let events = {
            let mut inner = self.inner.lock().unwrap();
            if *field(&mut inner.prefs) == value {
                return;
            }
            *field(&mut inner.prefs) = value;
            vec![Broadcast::Prefs(inner.prefs)]
        };
        self.emit(events);
    }

    fn set_float_pref(&self, value: f32, field: impl Fn(&mut CutPreferences) -> &mut f32) {
        let events = {
            let mut inner = self.inner.lock().unwrap();
            if *field(&mut inner.prefs) == value {
                return;
            }
            *field(&mut inner.prefs) = value;
            vec![Broadcast::Prefs(inner.prefs)]
        };
        self.emit(events);
    }

    /// Set the cut-in point, clamped to `[0, total_duration]`. If the new
    /// value lands past the cut-out point, the cut-out point is pushed up to
    /// match, keeping `cut_in <= cut_out`. No-op when nothing changes.
    pub fn set_cut_in(&self, seconds: f64) {
        let events = {
            let mut inner = self.inner.lock().unwrap();
            let clamped = seconds.clamp(0.0, inner.total_duration);
            if inner.prefs.cut_in == clamped {
                return;
            }

            inner.prefs.cut_in = clamped;
            let out_pushed = inner.prefs.cut_out < clamped;
            if out_pushed {
                inner.prefs.cut_out = clamped;
            }

            if let Some(path) = inner.current_file.clone() {
                let entry = inner.metadata.entry(path).or_default();
                entry.cut_in = clamped;
                if out_pushed {
                    entry.cut_out = clamped;
                }
            }

            let mut events = vec![Broadcast::Prefs(inner.prefs), Broadcast::CutIn(clamped)];
            if out_pushed {
                events.push(Broadcast::CutOut(clamped));
            }
            events
        };
        self.emit(events);
    }

    /// Set the cut-out point, clamped to `[0, total_duration]`. If the new
    /// value lands before the cut-in point, the cut-in point is pulled down
    /// to match. No-op when nothing changes.
    pub fn set_cut_out(&self, seconds: f64) {
        let events = {
            let mut inner = self.inner.lock().unwrap();
            let clamped = seconds.clamp(0.0, inner.total_duration);
            if inner.prefs.cut_out == clamped {
                return;
            }

            inner.prefs.cut_out = clamped;
            let in_pulled = inner.prefs.cut_in > clamped;
            if in_pulled {
                inner.prefs.cut_in = clamped;
            }

            if let Some(path) = inner.current_file.clone() {
                let entry = inner.metadata.entry(path).or_default();
                entry.cut_out = clamped;
                if in_pulled {
                    entry.cut_in = clamped;
                }
            }

            let mut events = vec![Broadcast::Prefs(inner.prefs), Broadcast::CutOut(clamped)];
            if in_pulled {
                events.push(Broadcast::CutIn(clamped));
            }
            events
        };
        self.emit(events);
    }

    /// Cached metadata for a file, or a default entry if none exists.
    pub fn get_metadata_for_file(&self, path: &Path) -> FileMetadata {
        self.inner
            .lock()
            .unwrap()
            .metadata
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_metadata_for_file(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().metadata.contains_key(path)
    }

    /// Metadata for the current file, or a default entry if none is set.
    pub fn current_metadata(&self) -> FileMetadata {
        let inner = self.inner.lock().unwrap();
        match &inner.current_file {
            Some(path) => inner.metadata.get(path).cloned().unwrap_or_default(),
            None => FileMetadata::default(),
        }
    }

    /// Store metadata for a file. If it is the current file, the live cut
    /// points are re-derived from it (clamped and ordered) and broadcast.
    pub fn set_metadata_for_file(&self, path: &Path, metadata: FileMetadata) {
        let events = {
            let mut inner = self.inner.lock().unwrap();
            inner.metadata.insert(path.to_path_buf(), metadata.clone());

            if inner.current_file.as_deref() == Some(path) {
                Self::pull_metadata_into_prefs(&mut inner, &metadata);
                vec![Broadcast::Prefs(inner.prefs)]
            } else {
                Vec::new()
            }
        };
        self.emit(events);
    }

    /// Switch the active file. No-op if unchanged. Cached metadata for the
    /// new file, when present, is pulled into the live preferences (clamped
    /// and ordered) and a preference change is broadcast before the file
    /// change itself.
    pub fn set_current_file_path(&self, path: &Path) {
        let events = {
            let mut inner = self.inner.lock().unwrap();
            if inner.current_file.as_deref() == Some(path) {
                return;
            }

            inner.current_file = Some(path.to_path_buf());

            let mut events = Vec::new();
            if let Some(metadata) = inner.metadata.get(path).cloned() {
                Self::pull_metadata_into_prefs(&mut inner, &metadata);
                events.push(Broadcast::Prefs(inner.prefs));
            }
            events.push(Broadcast::File(path.to_path_buf()));
            events
        };
        self.emit(events);
    }

    /// Re-derive the live cut points from a cached entry: clamp both to the
    /// known duration, and if they arrive out of order, swap them together
    /// with the per-side auto flags so "auto" follows the detected value.
    fn pull_metadata_into_prefs(inner: &mut SessionInner, metadata: &FileMetadata) {
        let mut cut_in = metadata.cut_in.clamp(0.0, inner.total_duration);
        let mut cut_out = metadata.cut_out.clamp(0.0, inner.total_duration);

        if cut_in > cut_out {
            std::mem::swap(&mut cut_in, &mut cut_out);
            let auto = &mut inner.prefs.auto_cut;
            std::mem::swap(&mut auto.in_active, &mut auto.out_active);
            std::mem::swap(&mut auto.threshold_in, &mut auto.threshold_out);
        }

        inner.prefs.cut_in = cut_in;
        inner.prefs.cut_out = cut_out;
    }

    fn emit(&self, events: Vec<Broadcast>) {
        if events.is_empty() {
            return;
        }

        // Upgrade under the listener lock, call with it released so a
        // listener can re-enter the session.
        let live: Vec<Arc<dyn SessionListener>> = {
            let mut listeners = self.listeners.lock().unwrap();
            listeners.retain(|weak| weak.strong_count() > 0);
            listeners.iter().filter_map(|weak| weak.upgrade()).collect()
        };

        for event in &events {
            for listener in &live {
                match event {
                    Broadcast::Prefs(prefs) => listener.cut_preference_changed(prefs),
                    Broadcast::CutIn(v) => listener.cut_in_changed(*v),
                    Broadcast::CutOut(v) => listener.cut_out_changed(*v),
                    Broadcast::File(path) => listener.file_changed(path),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        prefs_count: AtomicUsize,
        in_count: AtomicUsize,
        out_count: AtomicUsize,
        file_count: AtomicUsize,
        last_prefs: Mutex<Option<CutPreferences>>,
        last_file: Mutex<Option<PathBuf>>,
    }

    impl SessionListener for CountingListener {
        fn cut_preference_changed(&self, prefs: &CutPreferences) {
            self.prefs_count.fetch_add(1, Ordering::SeqCst);
            *self.last_prefs.lock().unwrap() = Some(*prefs);
        }
        fn cut_in_changed(&self, _seconds: f64) {
            self.in_count.fetch_add(1, Ordering::SeqCst);
        }
        fn cut_out_changed(&self, _seconds: f64) {
            self.out_count.fetch_add(1, Ordering::SeqCst);
        }
        fn file_changed(&self, path: &Path) {
            self.file_count.fetch_add(1, Ordering::SeqCst);
            *self.last_file.lock().unwrap() = Some(path.to_path_buf());
        }
    }

    fn session_with_listener() -> (Arc<SessionState>, Arc<CountingListener>) {
        let session = Arc::new(SessionState::new());
        let listener = Arc::new(CountingListener::default());
        let as_dyn: Arc<dyn SessionListener> = listener.clone();
        session.add_listener(&as_dyn);
        (session, listener)
    }

    #[test]
    fn test_invariant_holds_after_any_sequence() {
        let (session, _) = session_with_listener();
        session.set_total_duration(100.0);

        for (set_in, value) in [
            (true, 10.0),
            (false, 5.0),
            (true, 80.0),
            (false, 200.0),
            (true, -3.0),
            (false, 0.0),
            (true, 50.0),
        ] {
            if set_in {
                session.set_cut_in(value);
            } else {
                session.set_cut_out(value);
            }
            let prefs = session.get_cut_prefs();
            assert!(
                prefs.cut_in <= prefs.cut_out,
                "invariant broken: {} > {}",
                prefs.cut_in,
                prefs.cut_out
            );
        }
    }

    #[test]
    fn test_bool_setters_are_idempotent() {
        let (session, listener) = session_with_listener();

        session.set_cut_active(true);
        session.set_cut_active(true);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), 1);

        session.set_auto_cut_in_active(true);
        session.set_auto_cut_in_active(true);
        session.set_auto_cut_out_active(false); // already false
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_threshold_setters_are_idempotent() {
        let (session, listener) = session_with_listener();

        session.set_threshold_in(0.05);
        session.set_threshold_in(0.05);
        session.set_threshold_out(0.02);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), 2);

        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.auto_cut.threshold_in, 0.05);
        assert_eq!(prefs.auto_cut.threshold_out, 0.02);
    }

    #[test]
    fn test_cut_in_clamps_against_other_side() {
        let (session, _) = session_with_listener();
        session.set_total_duration(100.0);
        session.set_cut_out(40.0);

        // A cut-in pushed past cut-out ends with cut_in == cut_out, never >
        session.set_cut_in(60.0);
        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.cut_in, 60.0);
        assert_eq!(prefs.cut_out, 60.0);
    }

    #[test]
    fn test_cut_out_clamps_against_other_side() {
        let (session, _) = session_with_listener();
        session.set_total_duration(100.0);
        session.set_cut_in(50.0);
        session.set_cut_out(80.0);

        session.set_cut_out(30.0);
        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.cut_out, 30.0);
        assert_eq!(prefs.cut_in, 30.0);
    }

    #[test]
    fn test_cut_in_beyond_duration_scenario() {
        // 60 s file: setCutIn(70) clamps to the duration, and since cut-out
        // starts at 0 it is pushed up to 60 as well.
        let (session, _) = session_with_listener();
        session.set_total_duration(60.0);

        session.set_cut_in(70.0);
        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.cut_in, 60.0);
        assert_eq!(prefs.cut_out, 60.0);
    }

    #[test]
    fn test_cut_setters_noop_when_unchanged() {
        let (session, listener) = session_with_listener();
        session.set_total_duration(60.0);

        session.set_cut_in(10.0);
        let after_first = listener.prefs_count.load(Ordering::SeqCst);
        session.set_cut_in(10.0);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), after_first);

        // Clamping makes 70 equal to the current 60 after a first set
        session.set_cut_out(60.0);
        let after_out = listener.prefs_count.load(Ordering::SeqCst);
        session.set_cut_out(70.0);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), after_out);
    }

    #[test]
    fn test_cut_setters_fire_boundary_events() {
        let (session, listener) = session_with_listener();
        session.set_total_duration(60.0);

        session.set_cut_out(30.0);
        assert_eq!(listener.out_count.load(Ordering::SeqCst), 1);
        assert_eq!(listener.in_count.load(Ordering::SeqCst), 0);

        // Pushing cut-in past cut-out fires both boundary events
        session.set_cut_in(40.0);
        assert_eq!(listener.in_count.load(Ordering::SeqCst), 1);
        assert_eq!(listener.out_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_sees_new_value_during_broadcast() {
        struct Reentrant {
            session: Mutex<Option<Arc<SessionState>>>,
            seen: Mutex<Option<f64>>,
        }
        impl SessionListener for Reentrant {
            fn cut_in_changed(&self, _seconds: f64) {
                if let Some(session) = self.session.lock().unwrap().as_ref() {
                    *self.seen.lock().unwrap() = Some(session.get_cut_prefs().cut_in);
                }
            }
        }

        let session = Arc::new(SessionState::new());
        session.set_total_duration(60.0);
        let listener = Arc::new(Reentrant {
            session: Mutex::new(Some(session.clone())),
            seen: Mutex::new(None),
        });
        let as_dyn: Arc<dyn SessionListener> = listener.clone();
        session.add_listener(&as_dyn);

        session.set_cut_in(12.0);
        assert_eq!(*listener.seen.lock().unwrap(), Some(12.0));
    }

    #[test]
    fn test_cut_edit_persists_into_current_file_metadata() {
        let (session, _) = session_with_listener();
        session.set_total_duration(60.0);
        let path = Path::new("/music/take1.wav");
        session.set_current_file_path(path);

        session.set_cut_in(5.0);
        session.set_cut_out(50.0);

        let meta = session.get_metadata_for_file(path);
        assert_eq!(meta.cut_in, 5.0);
        assert_eq!(meta.cut_out, 50.0);
    }

    #[test]
    fn test_no_metadata_written_without_current_file() {
        let (session, _) = session_with_listener();
        session.set_total_duration(60.0);
        session.set_cut_in(5.0);

        assert!(!session.has_metadata_for_file(Path::new("/music/take1.wav")));
    }

    #[test]
    fn test_file_switch_pulls_cached_metadata() {
        let (session, listener) = session_with_listener();
        session.set_total_duration(60.0);

        let first = Path::new("/music/a.wav");
        let second = Path::new("/music/b.wav");
        session.set_current_file_path(first);
        session.set_cut_in(5.0);
        session.set_cut_out(50.0);

        session.set_current_file_path(second);
        assert_eq!(session.get_cut_prefs().cut_in, 5.0); // b has no cache yet

        session.set_cut_in(10.0);
        session.set_cut_out(20.0);

        let files_before = listener.file_count.load(Ordering::SeqCst);
        session.set_current_file_path(first);
        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.cut_in, 5.0);
        assert_eq!(prefs.cut_out, 50.0);
        assert_eq!(listener.file_count.load(Ordering::SeqCst), files_before + 1);
    }

    #[test]
    fn test_file_switch_noop_when_unchanged() {
        let (session, listener) = session_with_listener();
        let path = Path::new("/music/a.wav");
        session.set_current_file_path(path);
        let count = listener.file_count.load(Ordering::SeqCst);
        session.set_current_file_path(path);
        assert_eq!(listener.file_count.load(Ordering::SeqCst), count);
    }

    #[test]
    fn test_set_metadata_for_current_file_rederives_prefs() {
        let (session, listener) = session_with_listener();
        session.set_total_duration(60.0);
        let path = Path::new("/music/a.wav");
        session.set_current_file_path(path);

        let before = listener.prefs_count.load(Ordering::SeqCst);
        session.set_metadata_for_file(
            path,
            FileMetadata {
                cut_in: 3.0,
                cut_out: 42.0,
                is_analyzed: true,
                hash: String::new(),
            },
        );

        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.cut_in, 3.0);
        assert_eq!(prefs.cut_out, 42.0);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), before + 1);
        assert!(session.get_metadata_for_file(path).is_analyzed);
    }

    #[test]
    fn test_set_metadata_for_other_file_does_not_broadcast() {
        let (session, listener) = session_with_listener();
        session.set_current_file_path(Path::new("/music/a.wav"));

        let before = listener.prefs_count.load(Ordering::SeqCst);
        session.set_metadata_for_file(Path::new("/music/b.wav"), FileMetadata::default());
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), before);
    }

    #[test]
    fn test_out_of_order_metadata_is_swapped_with_auto_flags() {
        let (session, _) = session_with_listener();
        session.set_total_duration(60.0);
        session.set_auto_cut_in_active(true);
        session.set_threshold_in(0.05);
        session.set_threshold_out(0.02);
        let path = Path::new("/music/a.wav");
        session.set_current_file_path(path);

        session.set_metadata_for_file(
            path,
            FileMetadata {
                cut_in: 50.0,
                cut_out: 10.0,
                is_analyzed: true,
                hash: String::new(),
            },
        );

        let prefs = session.get_cut_prefs();
        assert_eq!(prefs.cut_in, 10.0);
        assert_eq!(prefs.cut_out, 50.0);
        // Auto state followed the swapped values
        assert!(!prefs.auto_cut.in_active);
        assert!(prefs.auto_cut.out_active);
        assert_eq!(prefs.auto_cut.threshold_out, 0.05);
    }

    #[test]
    fn test_remove_listener_stops_notifications() {
        let session = Arc::new(SessionState::new());
        session.set_total_duration(60.0);
        let listener = Arc::new(CountingListener::default());
        let as_dyn: Arc<dyn SessionListener> = listener.clone();
        session.add_listener(&as_dyn);

        session.set_cut_active(true);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), 1);

        session.remove_listener(&as_dyn);
        session.set_cut_active(false);
        assert_eq!(listener.prefs_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let session = Arc::new(SessionState::new());
        {
            let listener = Arc::new(CountingListener::default());
            let as_dyn: Arc<dyn SessionListener> = listener;
            session.add_listener(&as_dyn);
        }
        // Must not panic or call through a dead listener
        session.set_cut_active(true);
        assert!(session.get_cut_prefs().active);
    }
}
