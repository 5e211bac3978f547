//! Draft auto-save: reconciles the in-memory draft against the last
//! persisted snapshot and issues at most one in-flight save per draft.
//!
//! Flow: edit → quiescence window → change detection → save → snapshot swap.
//!
//! The reconciler itself ([`DraftReconciler`]) is a synchronous state
//! machine; the spawned driver task owns it and supplies the event loop:
//! edits arrive on a watch channel (resetting the quiescence deadline and
//! writing through to the injected draft cache), the save capability is
//! awaited between `begin_save` and `complete_save`, and status is published
//! on a second watch channel. Edits that land while a save is in flight
//! accumulate in the channel and are picked up by the next debounce cycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::draft::cache::DraftCache;
use crate::draft::diff;
use crate::draft::model::{ResumeDraft, SavePayload};

/// Opaque save failure reported by the persistence collaborator. All causes
/// (transport, validation, permission) are treated identically: surfaced to
/// the user with a retry control, never fatal to the editing session.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct SaveError(pub String);

/// The save operation: persists a payload, creating a new resume when
/// `resume_id` is absent, and returns the persisted identifier.
#[async_trait]
pub trait SaveDraft: Send + Sync + 'static {
    async fn save(&self, payload: SavePayload, resume_id: Option<Uuid>)
        -> Result<Uuid, SaveError>;
}

/// The consumer's addressable location (e.g. a shareable URL). Updated only
/// when it does not already encode the persisted identifier.
pub trait LocationSink: Send + Sync + 'static {
    fn resume_id(&self) -> Option<Uuid>;
    fn set_resume_id(&self, id: Uuid);
}

// ────────────────────────────────────────────────────────────────────────────
// Reconciler state machine
// ────────────────────────────────────────────────────────────────────────────

/// Per-draft lifecycle states. No terminal state: the machine lives as long
/// as the editing session.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    Idle,
    /// Edits pending, quiescence window open.
    Quiescing,
    Saving,
    /// A save failed and the failure has not been acknowledged. No further
    /// saves are attempted until the user retries.
    Failed { message: String },
}

/// Why `begin_save` declined to issue a save.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InFlight,
    FailedUnacknowledged,
    NoChanges,
}

/// A save the reconciler has decided to issue. The driver awaits the save
/// capability with `payload`/`resume_id`, then feeds the result back through
/// `complete_save` together with `seq` and `snapshot_candidate`.
#[derive(Debug, PartialEq)]
pub struct PendingSave {
    pub payload: SavePayload,
    pub resume_id: Option<Uuid>,
    pub seq: u64,
    /// Full clone of the debounced draft (original photo representation
    /// included) that becomes the snapshot if this save succeeds.
    pub snapshot_candidate: ResumeDraft,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved {
        resume_id: Uuid,
        newly_assigned: bool,
    },
    Failed {
        message: String,
    },
    /// A newer completion was already applied; this one was discarded.
    Stale,
}

/// The reconciler: ensures the persisted draft converges to the in-memory
/// draft with minimal redundant writes. All transitions happen on the driver
/// task between awaited points, so no locking is needed.
pub struct DraftReconciler {
    snapshot: ResumeDraft,
    resume_id: Option<Uuid>,
    state: SaveState,
    next_seq: u64,
    last_applied_seq: Option<u64>,
}

impl DraftReconciler {
    /// Initial state: `Idle`, snapshot = the draft at session start.
    pub fn new(initial: ResumeDraft) -> Self {
        let resume_id = initial.id;
        Self {
            snapshot: initial,
            resume_id,
            state: SaveState::Idle,
            next_seq: 0,
            last_applied_seq: None,
        }
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn is_saving(&self) -> bool {
        self.state == SaveState::Saving
    }

    pub fn resume_id(&self) -> Option<Uuid> {
        self.resume_id
    }

    pub fn snapshot(&self) -> &ResumeDraft {
        &self.snapshot
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.state {
            SaveState::Failed { message } => Some(message),
            _ => None,
        }
    }

    /// Derived from the live (non-debounced) draft on every query: used to
    /// warn before navigating away with unpersisted edits.
    pub fn has_unsaved_changes(&self, live: &ResumeDraft) -> bool {
        diff::has_changes(live, &self.snapshot)
    }

    /// Any edit opens (or keeps open) the quiescence window. Edits during
    /// `Saving` or `Failed` accumulate without a transition; they are
    /// evaluated on the next debounce cycle.
    pub fn note_edit(&mut self) {
        if self.state == SaveState::Idle {
            self.state = SaveState::Quiescing;
        }
    }

    /// User-initiated retry: clears an unacknowledged failure so the next
    /// quiescence re-runs detection.
    pub fn acknowledge_failure(&mut self) {
        if matches!(self.state, SaveState::Failed { .. }) {
            self.state = SaveState::Quiescing;
        }
    }

    /// Runs change detection against the debounced draft when the quiescence
    /// window elapses. Skips when a save is in flight, when an earlier
    /// failure is unacknowledged, or when there is no net change (the last
    /// transitions `Quiescing → Idle`).
    pub fn begin_save(&mut self, debounced: &ResumeDraft) -> Result<PendingSave, SkipReason> {
        match self.state {
            SaveState::Saving => return Err(SkipReason::InFlight),
            SaveState::Failed { .. } => return Err(SkipReason::FailedUnacknowledged),
            SaveState::Idle | SaveState::Quiescing => {}
        }

        if !diff::has_changes(debounced, &self.snapshot) {
            self.state = SaveState::Idle;
            return Err(SkipReason::NoChanges);
        }

        let payload = SavePayload::from_draft(debounced, &self.snapshot);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.state = SaveState::Saving;

        Ok(PendingSave {
            payload,
            resume_id: self.resume_id,
            seq,
            snapshot_candidate: debounced.clone(),
        })
    }

    /// Applies a save result. The in-flight state is cleared on every path
    /// through this function. Completions older than the last applied
    /// sequence are discarded rather than adopting a stale identifier or
    /// snapshot.
    pub fn complete_save(
        &mut self,
        seq: u64,
        snapshot_candidate: ResumeDraft,
        result: Result<Uuid, SaveError>,
    ) -> SaveOutcome {
        match result {
            Ok(id) => {
                if self.last_applied_seq.is_some_and(|applied| seq < applied) {
                    self.state = SaveState::Idle;
                    return SaveOutcome::Stale;
                }
                self.last_applied_seq = Some(seq);
                let newly_assigned = self.resume_id != Some(id);
                self.resume_id = Some(id);
                self.snapshot = snapshot_candidate;
                self.state = SaveState::Idle;
                SaveOutcome::Saved {
                    resume_id: id,
                    newly_assigned,
                }
            }
            Err(err) => {
                // Snapshot stays untouched so the next quiescence re-attempts.
                let message = err.0;
                self.state = SaveState::Failed {
                    message: message.clone(),
                };
                SaveOutcome::Failed { message }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Driver task and handle
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot of the auto-saver visible to callers. Published after every
/// transition; silence between publishes means nothing happened.
#[derive(Debug, Clone)]
pub struct AutoSaveStatus {
    pub is_saving: bool,
    /// Set while a failure is unacknowledged; cleared by retry.
    pub error: Option<String>,
    pub resume_id: Option<Uuid>,
    /// The last persisted state — callers diff the live draft against this
    /// to derive `has_unsaved_changes`.
    pub snapshot: ResumeDraft,
}

#[derive(Debug, Clone)]
pub struct AutoSaveOptions {
    /// Idle period after the last edit before a save is attempted.
    pub quiescence: Duration,
    /// Key for the write-through draft cache; `None` disables caching.
    pub cache_key: Option<String>,
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_millis(2000),
            cache_key: None,
        }
    }
}

/// Handle to a spawned auto-save driver. Dropping the handle (or calling
/// [`AutoSaveHandle::shutdown`]) ends the driver task.
pub struct AutoSaveHandle {
    draft_tx: watch::Sender<ResumeDraft>,
    status_rx: watch::Receiver<AutoSaveStatus>,
    retry: Arc<Notify>,
    task: JoinHandle<()>,
}

impl AutoSaveHandle {
    /// Pushes the full current draft — the form layer calls this on every
    /// edit. Resets the quiescence window.
    pub fn update(&self, draft: ResumeDraft) {
        // Send fails only when the driver has already stopped.
        let _ = self.draft_tx.send(draft);
    }

    pub fn current_draft(&self) -> ResumeDraft {
        self.draft_tx.borrow().clone()
    }

    pub fn status(&self) -> AutoSaveStatus {
        self.status_rx.borrow().clone()
    }

    /// Live draft vs snapshot under the same change-detection algorithm the
    /// save path uses.
    pub fn has_unsaved_changes(&self) -> bool {
        let snapshot = self.status_rx.borrow().snapshot.clone();
        diff::has_changes(&self.draft_tx.borrow(), &snapshot)
    }

    /// The user-facing retry affordance: clears the failure and re-runs
    /// detection immediately.
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Spawns the auto-save driver for one editing session.
///
/// `initial` seeds both the live draft and the snapshot, per the mount
/// contract. Callers recovering cached unsaved edits should pass the
/// persisted state here and push the recovered draft through
/// [`AutoSaveHandle::update`] so it counts as an edit.
pub fn spawn(
    initial: ResumeDraft,
    saver: Arc<dyn SaveDraft>,
    cache: Option<Arc<dyn DraftCache>>,
    location: Arc<dyn LocationSink>,
    options: AutoSaveOptions,
) -> AutoSaveHandle {
    let reconciler = DraftReconciler::new(initial.clone());
    let (draft_tx, draft_rx) = watch::channel(initial);
    let (status_tx, status_rx) = watch::channel(AutoSaveStatus {
        is_saving: false,
        error: None,
        resume_id: reconciler.resume_id(),
        snapshot: reconciler.snapshot().clone(),
    });
    let retry = Arc::new(Notify::new());

    let task = tokio::spawn(run_driver(
        reconciler, draft_rx, status_tx, Arc::clone(&retry), saver, cache, location, options,
    ));

    AutoSaveHandle {
        draft_tx,
        status_rx,
        retry,
        task,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_driver(
    mut reconciler: DraftReconciler,
    mut draft_rx: watch::Receiver<ResumeDraft>,
    status_tx: watch::Sender<AutoSaveStatus>,
    retry: Arc<Notify>,
    saver: Arc<dyn SaveDraft>,
    cache: Option<Arc<dyn DraftCache>>,
    location: Arc<dyn LocationSink>,
    options: AutoSaveOptions,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            changed = draft_rx.changed() => {
                if changed.is_err() {
                    // Draft sender dropped: the session is closed.
                    break;
                }
                let draft = draft_rx.borrow_and_update().clone();
                reconciler.note_edit();
                write_through_cache(cache.as_deref(), options.cache_key.as_deref(), &draft).await;
                deadline = Some(Instant::now() + options.quiescence);
                publish(&status_tx, &reconciler);
            }
            _ = retry.notified() => {
                reconciler.acknowledge_failure();
                deadline = Some(Instant::now());
                publish(&status_tx, &reconciler);
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let debounced = draft_rx.borrow_and_update().clone();
                match reconciler.begin_save(&debounced) {
                    Ok(pending) => {
                        let PendingSave { payload, resume_id, seq, snapshot_candidate } = pending;
                        publish(&status_tx, &reconciler);

                        // Edits arriving during this await queue up in the
                        // watch channel; the next loop iteration picks them
                        // up and opens a fresh quiescence window.
                        let result = saver.save(payload, resume_id).await;

                        let outcome = reconciler.complete_save(seq, snapshot_candidate, result);
                        match &outcome {
                            SaveOutcome::Saved { resume_id, .. } => {
                                debug!("draft saved as resume {resume_id}");
                                if location.resume_id() != Some(*resume_id) {
                                    location.set_resume_id(*resume_id);
                                }
                                clear_cache(cache.as_deref(), options.cache_key.as_deref()).await;
                            }
                            SaveOutcome::Failed { message } => {
                                warn!("draft auto-save failed: {message}");
                            }
                            SaveOutcome::Stale => {
                                debug!("discarded stale save completion");
                            }
                        }
                        publish(&status_tx, &reconciler);
                    }
                    Err(SkipReason::NoChanges) => publish(&status_tx, &reconciler),
                    Err(SkipReason::InFlight) | Err(SkipReason::FailedUnacknowledged) => {}
                }
            }
        }
    }
}

fn publish(status_tx: &watch::Sender<AutoSaveStatus>, reconciler: &DraftReconciler) {
    // Receivers may already be gone during shutdown.
    let _ = status_tx.send(AutoSaveStatus {
        is_saving: reconciler.is_saving(),
        error: reconciler.failure_message().map(str::to_string),
        resume_id: reconciler.resume_id(),
        snapshot: reconciler.snapshot().clone(),
    });
}

async fn write_through_cache(
    cache: Option<&dyn DraftCache>,
    key: Option<&str>,
    draft: &ResumeDraft,
) {
    if let (Some(cache), Some(key)) = (cache, key) {
        if let Err(err) = cache.store(key, draft).await {
            warn!("draft cache write failed: {err}");
        }
    }
}

async fn clear_cache(cache: Option<&dyn DraftCache>, key: Option<&str>) {
    if let (Some(cache), Some(key)) = (cache, key) {
        if let Err(err) = cache.remove(key).await {
            warn!("draft cache clear failed: {err}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::model::{Photo, PhotoPatch};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn draft_with_name(name: &str) -> ResumeDraft {
        ResumeDraft {
            first_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn local_photo(name: &str) -> Photo {
        Photo::Local {
            file_name: name.to_string(),
            size_bytes: 64,
            modified_ms: 1_700_000_000_000,
            content_type: "image/png".to_string(),
            data: Bytes::from_static(b"png"),
        }
    }

    // ── Synchronous state machine ───────────────────────────────────────────

    #[test]
    fn test_initial_state_is_idle_with_snapshot_from_draft() {
        let initial = draft_with_name("Ada");
        let reconciler = DraftReconciler::new(initial.clone());
        assert_eq!(*reconciler.state(), SaveState::Idle);
        assert_eq!(*reconciler.snapshot(), initial);
        assert!(!reconciler.has_unsaved_changes(&initial));
    }

    #[test]
    fn test_quiescing_returns_to_idle_when_nothing_changed() {
        let initial = draft_with_name("Ada");
        let mut reconciler = DraftReconciler::new(initial.clone());
        reconciler.note_edit();
        assert_eq!(*reconciler.state(), SaveState::Quiescing);

        assert_eq!(reconciler.begin_save(&initial), Err(SkipReason::NoChanges));
        assert_eq!(*reconciler.state(), SaveState::Idle);
    }

    #[test]
    fn test_detected_change_enters_saving_and_blocks_second_save() {
        let mut reconciler = DraftReconciler::new(ResumeDraft::default());
        reconciler.note_edit();

        let edited = draft_with_name("Ada");
        let pending = reconciler.begin_save(&edited).unwrap();
        assert_eq!(*reconciler.state(), SaveState::Saving);
        assert!(pending.resume_id.is_none());

        // A second attempt while in flight is refused.
        assert_eq!(reconciler.begin_save(&edited), Err(SkipReason::InFlight));
    }

    #[test]
    fn test_successful_save_adopts_id_and_replaces_snapshot() {
        let mut reconciler = DraftReconciler::new(ResumeDraft::default());
        let edited = draft_with_name("Ada");
        let pending = reconciler.begin_save(&edited).unwrap();

        let id = Uuid::new_v4();
        let outcome = reconciler.complete_save(
            pending.seq,
            pending.snapshot_candidate,
            Ok(id),
        );
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                resume_id: id,
                newly_assigned: true
            }
        );
        assert_eq!(*reconciler.state(), SaveState::Idle);
        assert_eq!(reconciler.resume_id(), Some(id));

        // Immediately re-running detection against the new snapshot: unchanged.
        assert!(!reconciler.has_unsaved_changes(&edited));
        reconciler.note_edit();
        assert_eq!(reconciler.begin_save(&edited), Err(SkipReason::NoChanges));
    }

    #[test]
    fn test_second_save_reuses_adopted_id() {
        let mut reconciler = DraftReconciler::new(ResumeDraft::default());
        let id = Uuid::new_v4();
        let first = reconciler.begin_save(&draft_with_name("Ada")).unwrap();
        reconciler.complete_save(first.seq, first.snapshot_candidate, Ok(id));

        let second = reconciler.begin_save(&draft_with_name("Grace")).unwrap();
        assert_eq!(second.resume_id, Some(id));

        let outcome =
            reconciler.complete_save(second.seq, second.snapshot_candidate, Ok(id));
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                resume_id: id,
                newly_assigned: false
            }
        );
    }

    #[test]
    fn test_failure_keeps_snapshot_and_blocks_until_acknowledged() {
        let initial = ResumeDraft::default();
        let mut reconciler = DraftReconciler::new(initial.clone());
        let edited = draft_with_name("Ada");

        let pending = reconciler.begin_save(&edited).unwrap();
        let outcome = reconciler.complete_save(
            pending.seq,
            pending.snapshot_candidate,
            Err(SaveError("database unavailable".to_string())),
        );
        assert_eq!(
            outcome,
            SaveOutcome::Failed {
                message: "database unavailable".to_string()
            }
        );
        assert_eq!(reconciler.failure_message(), Some("database unavailable"));

        // Snapshot untouched: the edits are still unsaved.
        assert_eq!(*reconciler.snapshot(), initial);
        assert!(reconciler.has_unsaved_changes(&edited));

        // No automatic re-attempt while the failure is unacknowledged.
        assert_eq!(
            reconciler.begin_save(&edited),
            Err(SkipReason::FailedUnacknowledged)
        );

        // Retry clears the failure; detection re-issues the same payload.
        reconciler.acknowledge_failure();
        let retried = reconciler.begin_save(&edited).unwrap();
        assert_eq!(retried.payload, SavePayload::from_draft(&edited, &initial));
    }

    #[test]
    fn test_unchanged_photo_is_dropped_from_second_payload() {
        let mut reconciler = DraftReconciler::new(ResumeDraft::default());

        // First save introduces the photo.
        let mut edited = draft_with_name("Ada");
        edited.photo = Some(local_photo("me.png"));
        let first = reconciler.begin_save(&edited).unwrap();
        assert!(matches!(
            first.payload.photo,
            Some(PhotoPatch::Upload { .. })
        ));
        reconciler.complete_save(first.seq, first.snapshot_candidate, Ok(Uuid::new_v4()));

        // Second save touches an unrelated field; the photo patch is omitted.
        let mut edited_again = edited.clone();
        edited_again.city = Some("London".to_string());
        let second = reconciler.begin_save(&edited_again).unwrap();
        assert!(second.payload.photo.is_none());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut reconciler = DraftReconciler::new(ResumeDraft::default());

        let first = reconciler.begin_save(&draft_with_name("Ada")).unwrap();
        // A newer completion is applied before the first one lands.
        let newer_seq = first.seq + 1;
        let newer_id = Uuid::new_v4();
        reconciler.complete_save(newer_seq, draft_with_name("Grace"), Ok(newer_id));

        let stale_id = Uuid::new_v4();
        let outcome = reconciler.complete_save(first.seq, first.snapshot_candidate, Ok(stale_id));
        assert_eq!(outcome, SaveOutcome::Stale);
        assert_eq!(reconciler.resume_id(), Some(newer_id));
        assert_eq!(*reconciler.snapshot(), draft_with_name("Grace"));
    }

    // ── Driver task ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSaver {
        calls: AtomicUsize,
        payloads: Mutex<Vec<SavePayload>>,
        fail_times: AtomicUsize,
        id: Mutex<Option<Uuid>>,
    }

    impl RecordingSaver {
        fn failing(times: usize) -> Self {
            Self {
                fail_times: AtomicUsize::new(times),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn payloads(&self) -> Vec<SavePayload> {
            self.payloads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SaveDraft for RecordingSaver {
        async fn save(
            &self,
            payload: SavePayload,
            resume_id: Option<Uuid>,
        ) -> Result<Uuid, SaveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payloads.lock().unwrap().push(payload);
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(SaveError("simulated save failure".to_string()));
            }
            let mut id = self.id.lock().unwrap();
            let assigned = resume_id.or(*id).unwrap_or_else(Uuid::new_v4);
            *id = Some(assigned);
            Ok(assigned)
        }
    }

    /// Saver that blocks until released, for exercising the in-flight window.
    struct GatedSaver {
        calls: AtomicUsize,
        release: Notify,
    }

    impl GatedSaver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl SaveDraft for GatedSaver {
        async fn save(
            &self,
            _payload: SavePayload,
            resume_id: Option<Uuid>,
        ) -> Result<Uuid, SaveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(resume_id.unwrap_or_else(Uuid::new_v4))
        }
    }

    #[derive(Default)]
    struct TestLocation {
        resume_id: Mutex<Option<Uuid>>,
        updates: AtomicUsize,
    }

    impl LocationSink for TestLocation {
        fn resume_id(&self) -> Option<Uuid> {
            *self.resume_id.lock().unwrap()
        }

        fn set_resume_id(&self, id: Uuid) {
            *self.resume_id.lock().unwrap() = Some(id);
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    const QUIESCENCE: Duration = Duration::from_millis(2000);

    fn options() -> AutoSaveOptions {
        AutoSaveOptions {
            quiescence: QUIESCENCE,
            cache_key: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_fires_exactly_one_save_after_quiescence() {
        let saver = Arc::new(RecordingSaver::default());
        let location = Arc::new(TestLocation::default());
        let handle = spawn(
            ResumeDraft::default(),
            saver.clone(),
            None,
            location.clone(),
            options(),
        );

        // Simulate typing "Ada" one keystroke at a time; each edit resets the
        // quiescence window.
        for typed in ["A", "Ad", "Ada"] {
            handle.update(draft_with_name(typed));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        tokio::time::sleep(QUIESCENCE + Duration::from_millis(100)).await;

        assert_eq!(saver.calls(), 1);
        let payloads = saver.payloads();
        assert_eq!(payloads[0].first_name.as_deref(), Some("Ada"));

        let status = handle.status();
        assert!(!status.is_saving);
        assert!(status.error.is_none());
        assert_eq!(status.snapshot.first_name.as_deref(), Some("Ada"));
        assert!(!handle.has_unsaved_changes());

        // First save assigned an identifier and pushed it to the location.
        assert!(status.resume_id.is_some());
        assert_eq!(location.resume_id(), status.resume_id);
        assert_eq!(location.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_in_flight_save_waits_for_next_cycle() {
        let saver = Arc::new(GatedSaver::new());
        let location = Arc::new(TestLocation::default());
        let handle = spawn(
            ResumeDraft::default(),
            saver.clone(),
            None,
            location,
            options(),
        );

        handle.update(draft_with_name("Ada"));
        tokio::time::sleep(QUIESCENCE + Duration::from_millis(100)).await;
        assert_eq!(saver.calls.load(Ordering::SeqCst), 1);
        assert!(handle.status().is_saving);

        // Edit while the save is in flight: no second save starts.
        handle.update(draft_with_name("Ada Lovelace"));
        tokio::time::sleep(QUIESCENCE * 3).await;
        assert_eq!(saver.calls.load(Ordering::SeqCst), 1);

        // Release the in-flight save; the accumulated edit is picked up by
        // the next debounce cycle.
        saver.release.notify_one();
        tokio::time::sleep(QUIESCENCE + Duration::from_millis(100)).await;
        assert_eq!(saver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_surfaces_error_and_retry_reissues_same_payload() {
        let saver = Arc::new(RecordingSaver::failing(1));
        let location = Arc::new(TestLocation::default());
        let handle = spawn(
            ResumeDraft::default(),
            saver.clone(),
            None,
            location,
            options(),
        );

        handle.update(draft_with_name("Ada"));
        tokio::time::sleep(QUIESCENCE + Duration::from_millis(100)).await;

        assert_eq!(saver.calls(), 1);
        let status = handle.status();
        assert_eq!(status.error.as_deref(), Some("simulated save failure"));
        assert!(handle.has_unsaved_changes());

        // A further edit alone does not re-attempt while unacknowledged.
        handle.update(draft_with_name("Ada"));
        tokio::time::sleep(QUIESCENCE * 2).await;
        assert_eq!(saver.calls(), 1);

        // Retry clears the failure and re-issues the same payload.
        handle.retry();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(saver.calls(), 2);
        let payloads = saver.payloads();
        assert_eq!(payloads[0], payloads[1]);
        let status = handle.status();
        assert!(status.error.is_none());
        assert!(!handle.has_unsaved_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_through_cache_and_clear_on_successful_save() {
        use crate::draft::cache::{DraftCache, InMemoryDraftCache};

        let saver = Arc::new(RecordingSaver::default());
        let location = Arc::new(TestLocation::default());
        let cache = Arc::new(InMemoryDraftCache::default());
        let handle = spawn(
            ResumeDraft::default(),
            saver.clone(),
            Some(cache.clone()),
            location,
            AutoSaveOptions {
                quiescence: QUIESCENCE,
                cache_key: Some("draft:u:new".to_string()),
            },
        );

        handle.update(draft_with_name("Ada"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            cache.load("draft:u:new").await.unwrap(),
            Some(draft_with_name("Ada"))
        );

        // After the save succeeds the cached unsaved draft is cleared.
        tokio::time::sleep(QUIESCENCE).await;
        assert_eq!(saver.calls(), 1);
        assert!(cache.load("draft:u:new").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopening_quiescence_without_changes_stays_idle() {
        let saver = Arc::new(RecordingSaver::default());
        let location = Arc::new(TestLocation::default());
        let initial = draft_with_name("Ada");
        let handle = spawn(initial.clone(), saver.clone(), None, location, options());

        // "Edit" that restores the initial state: window opens, elapses, and
        // no save fires.
        handle.update(initial);
        tokio::time::sleep(QUIESCENCE + Duration::from_millis(100)).await;
        assert_eq!(saver.calls(), 0);
        assert!(!handle.status().is_saving);
    }
}
