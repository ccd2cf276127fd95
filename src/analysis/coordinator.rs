//! Auto-cut re-trigger logic
//!
//! Listens to session changes and decides when a silence scan has to run:
//! threshold edits or flag flips while that side is auto-managed, and file
//! switches onto a file that has never been analyzed. Manual boundary edits
//! route through here too so a drag across the opposite boundary can break
//! the auto-management feedback loop.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::core::{AutoCutPrefs, CutPreferences, SessionListener, SessionState};

use super::worker::SilenceAnalysisWorker;

pub struct AutoCutCoordinator {
    session: Arc<SessionState>,
    worker: Arc<SilenceAnalysisWorker>,
    last_seen: Mutex<AutoCutPrefs>,
}

impl AutoCutCoordinator {
    /// Builds the coordinator and registers it as a session listener. The
    /// registration is weak; dropping the returned `Arc` detaches it.
    pub fn attach(
        session: Arc<SessionState>,
        worker: Arc<SilenceAnalysisWorker>,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            last_seen: Mutex::new(session.get_cut_prefs().auto_cut),
            session,
            worker,
        });
        let listener: Arc<dyn SessionListener> = Arc::clone(&coordinator) as _;
        coordinator.session.add_listener(&listener);
        coordinator
    }

    /// Manual cut-in edit. When the new value crosses the cut-out while the
    /// out side is auto-managed, that flag is dropped so the scan result
    /// cannot fight the user's edit; when the in side itself is auto, the
    /// out boundary is pushed to the file end and re-scanned if it was auto.
    pub fn apply_manual_cut_in(&self, seconds: f64) {
        let prefs = self.session.get_cut_prefs();
        let crossed = seconds >= prefs.cut_out;
        if crossed && prefs.auto_cut.out_active {
            self.session.set_auto_cut_out_active(false);
        }
        self.session.set_cut_in(seconds);
        if crossed && prefs.auto_cut.in_active {
            self.session.set_cut_out(self.session.total_duration());
            if prefs.auto_cut.out_active {
                self.worker.start_analysis(false);
            }
        }
    }

    /// Manual cut-out edit, mirror of [`apply_manual_cut_in`].
    pub fn apply_manual_cut_out(&self, seconds: f64) {
        let prefs = self.session.get_cut_prefs();
        let crossed = seconds <= prefs.cut_in;
        if crossed && prefs.auto_cut.in_active {
            self.session.set_auto_cut_in_active(false);
        }
        self.session.set_cut_out(seconds);
        if crossed && prefs.auto_cut.out_active {
            self.session.set_cut_in(0.0);
            if prefs.auto_cut.in_active {
                self.worker.start_analysis(true);
            }
        }
    }
}

impl SessionListener for AutoCutCoordinator {
    fn cut_preference_changed(&self, prefs: &CutPreferences) {
        let auto = prefs.auto_cut;
        let mut last = self.last_seen.lock().unwrap();
        let in_trigger = (auto.threshold_in != last.threshold_in
            || auto.in_active != last.in_active)
            && auto.in_active;
        let out_trigger = (auto.threshold_out != last.threshold_out
            || auto.out_active != last.out_active)
            && auto.out_active;
        *last = auto;
        drop(last);

        if in_trigger {
            debug!("Auto-cut settings changed, rescanning for cut-in");
            self.worker.start_analysis(true);
        } else if out_trigger {
            debug!("Auto-cut settings changed, rescanning for cut-out");
            self.worker.start_analysis(false);
        }
    }

    fn file_changed(&self, path: &std::path::Path) {
        if self.session.get_metadata_for_file(path).is_analyzed {
            return;
        }
        let auto = self.session.get_cut_prefs().auto_cut;
        if auto.in_active {
            debug!("New file {:?} has no analysis, scanning for cut-in", path);
            self.worker.start_analysis(true);
        } else if auto.out_active {
            debug!("New file {:?} has no analysis, scanning for cut-out", path);
            self.worker.start_analysis(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::worker::{AnalysisEvents, WorkerConfig};
    use crate::test_fixtures::{RecordingClient, SparseFactory};
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn setup(
        client: Arc<RecordingClient>,
    ) -> (
        Arc<SessionState>,
        Arc<SilenceAnalysisWorker>,
        AnalysisEvents,
        Arc<AutoCutCoordinator>,
    ) {
        let session = Arc::new(SessionState::new());
        let factory = SparseFactory::with_hits(441_000, 1, 44100.0, vec![(44100, 0.5), (220_500, 0.5)]);
        let (worker, events) = SilenceAnalysisWorker::new(
            Arc::clone(&session),
            client,
            Arc::new(factory),
            WorkerConfig::default(),
        );
        let worker = Arc::new(worker);
        let coordinator = AutoCutCoordinator::attach(Arc::clone(&session), Arc::clone(&worker));
        (session, worker, events, coordinator)
    }

    fn pump_until_idle(worker: &SilenceAnalysisWorker, events: &AnalysisEvents) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while worker.is_busy() {
            events.pump();
            assert!(Instant::now() < deadline, "scan never finished");
            std::thread::sleep(Duration::from_millis(2));
        }
        events.pump();
    }

    fn client_with_file() -> Arc<RecordingClient> {
        Arc::new(RecordingClient::new(Some(PathBuf::from("/music/take.wav"))))
    }

    #[test]
    fn test_threshold_change_triggers_scan_when_active() {
        let client = client_with_file();
        let (session, worker, events, _coordinator) = setup(Arc::clone(&client));
        session.set_auto_cut_in_active(true);
        pump_until_idle(&worker, &events);
        client.clear();

        session.set_threshold_in(0.02);
        assert!(worker.is_detecting_in());
        pump_until_idle(&worker, &events);
        assert_eq!(client.cut_starts().len(), 1);
    }

    #[test]
    fn test_threshold_change_ignored_when_inactive() {
        let client = client_with_file();
        let (session, worker, events, _coordinator) = setup(Arc::clone(&client));

        session.set_threshold_in(0.02);
        session.set_threshold_out(0.07);
        assert!(!worker.is_busy());
        events.pump();
        assert!(client.cut_starts().is_empty());
        assert!(client.cut_ends().is_empty());
    }

    #[test]
    fn test_enabling_out_flag_triggers_out_scan() {
        let client = client_with_file();
        let (session, worker, events, _coordinator) = setup(Arc::clone(&client));

        session.set_auto_cut_out_active(true);
        assert!(!worker.is_detecting_in());
        pump_until_idle(&worker, &events);
        assert_eq!(client.cut_ends().len(), 1);
    }

    #[test]
    fn test_repeating_same_flag_does_not_rescan() {
        let client = client_with_file();
        let (session, worker, events, _coordinator) = setup(Arc::clone(&client));
        session.set_auto_cut_out_active(true);
        pump_until_idle(&worker, &events);
        client.clear();

        // Idempotent setter: no broadcast, no new scan.
        session.set_auto_cut_out_active(true);
        assert!(!worker.is_busy());
        events.pump();
        assert!(client.cut_ends().is_empty());
    }

    #[test]
    fn test_file_switch_scans_unanalyzed_file() {
        let client = client_with_file();
        let (session, worker, events, _coordinator) = setup(Arc::clone(&client));
        session.set_auto_cut_in_active(true);
        pump_until_idle(&worker, &events);
        client.clear();

        session.set_current_file_path(&PathBuf::from("/music/other.wav"));
        pump_until_idle(&worker, &events);
        assert_eq!(client.cut_starts().len(), 1);
    }

    #[test]
    fn test_file_switch_skips_analyzed_file() {
        let client = client_with_file();
        let (session, worker, events, _coordinator) = setup(Arc::clone(&client));
        session.set_auto_cut_in_active(true);
        pump_until_idle(&worker, &events);
        client.clear();

        let other = PathBuf::from("/music/other.wav");
        let mut meta = session.get_metadata_for_file(&other);
        meta.is_analyzed = true;
        session.set_metadata_for_file(&other, meta);
        session.set_current_file_path(&other);
        assert!(!worker.is_busy());
        events.pump();
        assert!(client.cut_starts().is_empty());
    }

    #[test]
    fn test_manual_crossing_disables_opposite_auto_flag() {
        let client = client_with_file();
        let (session, worker, events, coordinator) = setup(Arc::clone(&client));
        session.set_total_duration(10.0);
        session.set_cut_out(8.0);
        session.set_auto_cut_out_active(true);
        pump_until_idle(&worker, &events);

        // Manual in edit past the auto-managed out boundary.
        coordinator.apply_manual_cut_in(9.0);
        let prefs = session.get_cut_prefs();
        assert!(!prefs.auto_cut.out_active);
        assert!((prefs.cut_in - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_crossing_without_auto_keeps_flags() {
        let client = client_with_file();
        let (session, _worker, _events, coordinator) = setup(Arc::clone(&client));
        session.set_total_duration(10.0);
        session.set_cut_out(8.0);

        coordinator.apply_manual_cut_in(9.0);
        let prefs = session.get_cut_prefs();
        assert!(!prefs.auto_cut.out_active);
        assert!((prefs.cut_in - 9.0).abs() < 1e-9);
        assert!((prefs.cut_out - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_in_crossing_pushes_out_to_end_and_rescans() {
        let client = client_with_file();
        let (session, worker, events, coordinator) = setup(Arc::clone(&client));
        session.set_total_duration(10.0);
        session.set_cut_out(5.0);
        session.set_auto_cut_in_active(true);
        session.set_auto_cut_out_active(true);
        pump_until_idle(&worker, &events);
        client.clear();

        coordinator.apply_manual_cut_in(6.0);
        pump_until_idle(&worker, &events);
        // Out was pushed to the file end, then re-scanned once.
        assert_eq!(client.cut_ends().len(), 1);
        let prefs = session.get_cut_prefs();
        assert!(!prefs.auto_cut.out_active);
    }

    #[test]
    fn test_manual_cut_out_crossing_mirrors_in() {
        let client = client_with_file();
        let (session, worker, events, coordinator) = setup(Arc::clone(&client));
        session.set_total_duration(10.0);
        session.set_cut_in(4.0);
        session.set_auto_cut_in_active(true);
        pump_until_idle(&worker, &events);

        coordinator.apply_manual_cut_out(2.0);
        let prefs = session.get_cut_prefs();
        assert!(!prefs.auto_cut.in_active);
        assert!((prefs.cut_out - 2.0).abs() < 1e-9);
    }
}
