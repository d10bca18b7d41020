//! SyncEngine - the coordinator for one puzzle session.
//!
//! The engine owns the [`PuzzleSession`] and is the only writer of its answer
//! stack and timer. Every accepted change is written to the local store at
//! once; the remote store only hears about first loads, verified-correct
//! edits and completion.
//!
//! # Architecture
//!
//! ```text
//! input → SyncEngine ─┬→ PuzzleSession (sudoku-sync-core, pure)
//!                     ├→ LocalStore     (synchronous, always)
//!                     └→ RemoteStore    (async, best effort)
//! ```
//!
//! Remote calls run without holding the session lock, so their responses
//! can land out of order. Each save bumps a generation counter; a poll
//! response issued under an older generation is dropped, and nothing lands
//! once the engine has been shut down.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::gate::{ActionGate, AllowAll, GatedAction};
use crate::remote::{RemoteError, RemoteStore};
use crate::social::FriendSessions;
use crate::storage::{KeyValueBackend, LocalStore, StateKind};
use futures_util::future::join;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sudoku_core::{
    reconcile, EditError, EditOutcome, PauseReason, PollConditions, PollPolicy, PuzzleSession,
    Reconciliation, RemoteCopy, SavePolicy, SaveTracker, SaveTrigger, Timer, TimerPhase, Validation,
};
use sudoku_types::{
    Cell, CellId, CompletionRecord, GameState, Grid, RemoteSnapshot, SaveRequest, SessionId,
    SessionParties, Timestamp, TimerRecord, UserId,
};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Engine errors. Storage and network failures never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The session refused the operation.
    #[error(transparent)]
    Edit(#[from] EditError),

    /// The authorization gate said no.
    #[error("{0} not allowed")]
    Denied(GatedAction),

    /// The engine was shut down.
    #[error("engine shut down")]
    ShutDown,
}

/// Generation a poll was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    generation: u64,
}

/// Read-only view of the engine, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    /// The current answer.
    pub current: Grid,
    /// Entries in the answer stack.
    pub stack_len: usize,
    /// The selected cell.
    pub selected: Option<CellId>,
    /// Completion, once solved.
    pub completed: Option<CompletionRecord>,
    /// Active seconds so far.
    pub elapsed_seconds: u64,
    /// Timer phase.
    pub timer_phase: TimerPhase,
    /// Undo is unavailable.
    pub undo_disabled: bool,
    /// Redo is unavailable.
    pub redo_disabled: bool,
    /// The validation overlay, when shown.
    pub validation: Option<Validation>,
    /// The remote store has not confirmed the local copy.
    pub unconfirmed: bool,
    /// `load()` has finished.
    pub loaded: bool,
    /// Other participants' copies of this puzzle.
    pub parties: Option<SessionParties>,
}

struct EngineState {
    session: PuzzleSession,
    tracker: SaveTracker,
    loaded: bool,
    unconfirmed: bool,
    visible: bool,
    last_save: Option<Timestamp>,
    parties: Option<SessionParties>,
}

struct PendingSave {
    request: SaveRequest,
    generation: u64,
}

struct EngineInner<R, B> {
    session_id: SessionId,
    state: Mutex<EngineState>,
    local: LocalStore<B>,
    remote: R,
    gate: Arc<dyn ActionGate>,
    clock: Arc<dyn Clock>,
    friends: Option<FriendSessions>,
    user_id: Option<UserId>,
    config: EngineConfig,
    save_policy: SavePolicy,
    poll_policy: PollPolicy,
    generation: AtomicU64,
    active: AtomicBool,
}

/// Builder for [`SyncEngine`].
pub struct SyncEngineBuilder<R, B> {
    session: PuzzleSession,
    local: LocalStore<B>,
    remote: R,
    config: EngineConfig,
    gate: Arc<dyn ActionGate>,
    clock: Arc<dyn Clock>,
    friends: Option<FriendSessions>,
    user_id: Option<UserId>,
}

impl<R: RemoteStore + 'static, B: KeyValueBackend + 'static> SyncEngineBuilder<R, B> {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Authorize undo, reveal and grid checks through `gate`.
    pub fn gate(mut self, gate: Arc<dyn ActionGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Read time from `clock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Patch `friends` with every participant snapshot the remote returns.
    pub fn friend_sessions(mut self, friends: FriendSessions) -> Self {
        self.friends = Some(friends);
        self
    }

    /// The current user; their own entry in party snapshots is ignored.
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Build the engine.
    pub fn build(self) -> SyncEngine<R, B> {
        let save_policy = self.config.storage.save_policy();
        let poll_policy = self.config.polling.poll_policy();
        SyncEngine {
            inner: Arc::new(EngineInner {
                session_id: self.session.session_id().clone(),
                state: Mutex::new(EngineState {
                    session: self.session,
                    tracker: SaveTracker::new(),
                    loaded: false,
                    unconfirmed: false,
                    visible: true,
                    last_save: None,
                    parties: None,
                }),
                local: self.local,
                remote: self.remote,
                gate: self.gate,
                clock: self.clock,
                friends: self.friends,
                user_id: self.user_id,
                config: self.config,
                save_policy,
                poll_policy,
                generation: AtomicU64::new(0),
                active: AtomicBool::new(true),
            }),
        }
    }
}

/// Synchronization engine for one session. Clones share the same session.
pub struct SyncEngine<R, B> {
    inner: Arc<EngineInner<R, B>>,
}

impl<R, B> Clone for SyncEngine<R, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteStore + 'static, B: KeyValueBackend + 'static> SyncEngine<R, B> {
    /// Start building an engine for `session`.
    pub fn builder(session: PuzzleSession, local: LocalStore<B>, remote: R) -> SyncEngineBuilder<R, B> {
        SyncEngineBuilder {
            session,
            local,
            remote,
            config: EngineConfig::default(),
            gate: Arc::new(AllowAll),
            clock: Arc::new(SystemClock),
            friends: None,
            user_id: None,
        }
    }

    /// Session key.
    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    /// Whether the engine has not been shut down.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Read both stores concurrently, reconcile, and restore the session.
    ///
    /// Edits wait until this returns.
    pub async fn load(&self) -> Reconciliation {
        let inner = &*self.inner;
        let id = &inner.session_id;
        let mut state = inner.state.lock().await;

        let ((local_puzzle, local_timer), remote) = join(
            async {
                (
                    inner.local.get::<GameState>(id, StateKind::Puzzle),
                    inner.local.get::<TimerRecord>(id, StateKind::Timer),
                )
            },
            inner.remote.get(id),
        )
        .await;

        let now = inner.clock.now();
        let local_timer = local_timer.map(|snapshot| snapshot.state);
        if let Some(puzzle) = &local_puzzle {
            state.session.restore(&puzzle.state, local_timer, now, 0);
        }

        let remote_copy = match &remote {
            Err(e) => {
                warn!(session = %id, error = %e, "remote fetch failed, continuing locally");
                RemoteCopy::Unreachable
            }
            Ok(None) => RemoteCopy::Absent,
            Ok(Some(snapshot)) => RemoteCopy::Present(snapshot.updated_at),
        };
        let decision = reconcile(local_puzzle.as_ref().map(|p| p.last_updated), remote_copy);
        info!(session = %id, ?decision, "reconciled session");

        let remote = remote.ok().flatten();
        if let Some(parties) = remote.as_ref().and_then(|snapshot| snapshot.parties.clone()) {
            self.apply_parties(&mut state, parties);
        }

        let mut pending = None;
        match (decision, remote) {
            (Reconciliation::AdoptRemote, Some(snapshot)) => {
                // A finished remote copy keeps its stopped timer; an
                // unfinished one resumes from the remote timer.
                let timer = if snapshot.state.is_completed() {
                    local_timer.or(snapshot.state.timer)
                } else {
                    snapshot.state.timer
                };
                state.session.restore(&snapshot.state, timer, now, 0);
                self.write_local(&mut state, now);
                state.unconfirmed = false;
            }
            (Reconciliation::RepushLocal, _) => {
                pending = Some(self.remote_request(&mut state, now));
                state.unconfirmed = true;
            }
            (Reconciliation::Unconfirmed, _) => state.unconfirmed = true,
            _ => state.unconfirmed = false,
        }

        if local_puzzle.is_none() && decision != Reconciliation::AdoptRemote {
            let countdown = inner.config.timer.countdown_ticks;
            state.session.timer_mut().start_session(None, now, countdown);
            // Opening the puzzle counts as activity.
            state.session.select(None, now);
        }

        state.loaded = true;
        let first_load = state.session.answers().len() == 1 && state.session.selected().is_none();
        if pending.is_none() && first_load {
            pending = self.persist(&mut state, SaveTrigger::FirstLoad, now);
        }
        drop(state);

        self.push_remote(pending).await;
        decision
    }

    /// Change the selection. Ignored once complete.
    pub async fn select(&self, cell: Option<CellId>) -> Result<bool, EngineError> {
        let mut state = self.lock_active().await?;
        Ok(state.session.select(cell, self.inner.clock.now()))
    }

    /// Place `value` in the selected cell.
    pub async fn set_answer(&self, value: Cell) -> Result<EditOutcome, EngineError> {
        self.edit(|session, now| session.set_answer(value, now)).await
    }

    /// Flip a note in the selected cell.
    pub async fn toggle_note(&self, digit: u8) -> Result<EditOutcome, EngineError> {
        self.edit(|session, now| session.toggle_note(digit, now)).await
    }

    /// Number-pad input.
    pub async fn select_number(&self, number: u8, notes_mode: bool) -> Result<EditOutcome, EngineError> {
        self.edit(|session, now| session.select_number(number, notes_mode, now))
            .await
    }

    /// Undo the last answer, if the gate allows.
    pub async fn undo(&self) -> Result<EditOutcome, EngineError> {
        {
            let state = self.lock_active().await?;
            if state.session.completed().is_some() {
                return Err(EditError::Completed.into());
            }
            if state.session.is_undo_disabled() {
                return Err(EditError::NothingToUndo.into());
            }
        }
        self.gated(GatedAction::Undo, |session, _| session.undo())
            .await
    }

    /// Restore the last undone answer.
    pub async fn redo(&self) -> Result<EditOutcome, EngineError> {
        self.edit(|session, _| session.redo()).await
    }

    /// Fill in the solution, if the gate allows.
    pub async fn reveal(&self) -> Result<EditOutcome, EngineError> {
        {
            let state = self.lock_active().await?;
            if state.session.completed().is_some() {
                return Err(EditError::Completed.into());
            }
        }
        self.gated(GatedAction::Reveal, |session, now| session.reveal(now))
            .await
    }

    /// Back to the initial grid with a fresh countdown.
    pub async fn reset(&self) -> Result<EditOutcome, EngineError> {
        let countdown = self.inner.config.timer.countdown_ticks;
        self.edit(move |session, now| session.reset(now, countdown))
            .await
    }

    /// Toggle the full-grid validation overlay. Showing it is gated.
    pub async fn validate_grid(&self) -> Result<bool, EngineError> {
        let showing = self.lock_active().await?.session.validation().is_some();
        if !showing && !self.inner.gate.authorize(GatedAction::CheckGrid).await {
            return Err(EngineError::Denied(GatedAction::CheckGrid));
        }

        let shown = {
            let mut state = self.lock_active().await?;
            state.session.validate_grid();
            state.session.validation().is_some()
        };
        if shown {
            self.inner.gate.committed(GatedAction::CheckGrid).await;
        }
        Ok(shown)
    }

    /// Toggle validation of the selected cell.
    pub async fn validate_cell(&self) -> Result<bool, EngineError> {
        let mut state = self.lock_active().await?;
        state.session.validate_cell();
        Ok(state.session.validation().is_some())
    }

    /// Pause or resume at the player's request.
    pub async fn set_paused(&self, paused: bool) -> Result<(), EngineError> {
        let now = self.inner.clock.now();
        let mut state = self.lock_active().await?;
        if paused {
            state.session.timer_mut().pause(PauseReason::Manual, now);
        } else {
            state.session.timer_mut().resume(PauseReason::Manual, now);
            // Resuming counts as activity.
            let selected = state.session.selected();
            state.session.select(selected, now);
        }
        self.write_timer(&state, now);
        Ok(())
    }

    /// Record app visibility; hiding pauses the timer.
    pub async fn set_visible(&self, visible: bool) -> Result<(), EngineError> {
        self.inner.state.lock().await.visible = visible;
        self.with_timer(|timer, now| {
            if visible {
                timer.resume(PauseReason::Hidden, now);
            } else {
                timer.pause(PauseReason::Hidden, now);
            }
        })
        .await
    }

    /// One timer tick. The timer record is written locally.
    pub async fn tick(&self) -> Result<(), EngineError> {
        self.with_timer(|timer, now| timer.tick(now)).await
    }

    /// Auto-pause if the selection has not changed within the inactivity
    /// window. Returns whether it paused.
    pub async fn check_inactivity(&self) -> Result<bool, EngineError> {
        let window = self.inner.config.timer.inactivity();
        let now = self.inner.clock.now();
        let mut state = self.lock_active().await?;
        let paused = state.session.check_inactivity(now, window);
        if paused {
            debug!(session = %self.inner.session_id, "paused for inactivity");
            self.write_timer(&state, now);
        }
        Ok(paused)
    }

    /// Ticket for a poll issued now.
    pub fn poll_ticket(&self) -> PollTicket {
        PollTicket {
            generation: self.inner.generation.load(Ordering::SeqCst),
        }
    }

    /// Whether a social poll is due.
    pub async fn should_poll(&self) -> bool {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock().await;
        let conditions = self.poll_conditions(&state, now);
        self.inner.poll_policy.should_poll(&conditions)
    }

    /// Poll for other participants' snapshots if one is due. Returns
    /// whether a response was applied.
    pub async fn poll_once(&self) -> bool {
        if !self.should_poll().await {
            return false;
        }
        self.refresh_session_parties().await
    }

    /// Fetch other participants' snapshots now, regardless of poll timing.
    pub async fn refresh_session_parties(&self) -> bool {
        let ticket = self.poll_ticket();
        let result = self.inner.remote.get(&self.inner.session_id).await;
        self.complete_poll(ticket, result).await
    }

    /// Apply a poll response, unless a save was issued after `ticket` or
    /// the engine was shut down or paused meanwhile.
    pub async fn complete_poll(
        &self,
        ticket: PollTicket,
        result: Result<Option<RemoteSnapshot>, RemoteError>,
    ) -> bool {
        // Saves bump the generation and shutdown clears `active` under the
        // session lock, so both are compared while holding it.
        let mut state = self.inner.state.lock().await;
        if !self.is_active() {
            debug!(session = %self.inner.session_id, "engine shut down, dropping poll response");
            return false;
        }
        if ticket != self.poll_ticket() {
            debug!(session = %self.inner.session_id, "newer save issued, dropping stale poll response");
            return false;
        }
        if state.session.timer().is_paused_by(PauseReason::Manual) {
            return false;
        }
        match result {
            Ok(Some(snapshot)) => match snapshot.parties {
                Some(parties) => {
                    self.apply_parties(&mut state, parties);
                    true
                }
                None => false,
            },
            Ok(None) => false,
            Err(e) => {
                warn!(session = %self.inner.session_id, error = %e, "poll failed");
                false
            }
        }
    }

    /// Current state for rendering.
    pub async fn snapshot(&self) -> EngineSnapshot {
        let state = self.inner.state.lock().await;
        let session = &state.session;
        EngineSnapshot {
            current: session.current().clone(),
            stack_len: session.answers().len(),
            selected: session.selected(),
            completed: session.completed(),
            elapsed_seconds: session.timer().elapsed_seconds(),
            timer_phase: session.timer().phase(),
            undo_disabled: session.is_undo_disabled(),
            redo_disabled: session.is_redo_disabled(),
            validation: session.validation().copied(),
            unconfirmed: state.unconfirmed,
            loaded: state.loaded,
            parties: state.parties.clone(),
        }
    }

    /// Full session state, timer included.
    pub async fn game_state(&self) -> GameState {
        self.inner.state.lock().await.session.to_game_state()
    }

    /// Spawn the timer tick, social poll and inactivity tasks.
    ///
    /// The tasks stop when the returned handle is dropped or the engine is
    /// shut down.
    pub fn spawn_tasks(&self) -> SessionTasks {
        let timer = &self.inner.config.timer;
        let tick_every = timer.tick_interval();
        let inactivity_every = timer.inactivity_check();
        let poll_every = self.inner.poll_policy.interval;

        let tick = self.spawn_every(tick_every, |engine| async move {
            let _ = engine.tick().await;
        });
        let poll = self.spawn_every(poll_every, |engine| async move {
            if engine.poll_once().await {
                debug!(session = %engine.session_id(), "applied participant snapshots");
            }
        });
        let inactivity = self.spawn_every(inactivity_every, |engine| async move {
            let _ = engine.check_inactivity().await;
        });

        SessionTasks {
            handles: vec![tick, poll, inactivity],
        }
    }

    /// Tear down: write the timer, then drop every later response.
    pub async fn shutdown(&self) {
        {
            let state = self.inner.state.lock().await;
            self.write_timer(&state, self.inner.clock.now());
            self.inner.active.store(false, Ordering::SeqCst);
        }
        info!(session = %self.inner.session_id, "engine shut down");
    }

    fn spawn_every<F, Fut>(&self, every: Duration, mut step: F) -> JoinHandle<()>
    where
        F: FnMut(Self) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut timer = interval(every);
            // The first tick completes immediately.
            timer.tick().await;
            loop {
                timer.tick().await;
                if !engine.is_active() {
                    break;
                }
                step(engine.clone()).await;
            }
        })
    }

    async fn lock_active(&self) -> Result<MutexGuard<'_, EngineState>, EngineError> {
        let state = self.inner.state.lock().await;
        if !self.is_active() {
            return Err(EngineError::ShutDown);
        }
        Ok(state)
    }

    /// Apply an ungated session change and save it.
    async fn edit<F>(&self, change: F) -> Result<EditOutcome, EngineError>
    where
        F: FnOnce(&mut PuzzleSession, Timestamp) -> Result<EditOutcome, EditError> + Send,
    {
        let (outcome, pending) = {
            let mut state = self.lock_active().await?;
            let now = self.inner.clock.now();
            let outcome = change(&mut state.session, now)?;
            let pending = self.persist(&mut state, outcome.trigger, now);
            (outcome, pending)
        };
        self.push_remote(pending).await;
        Ok(outcome)
    }

    /// Ask the gate, then [`edit`](Self::edit). A denied action changes nothing.
    async fn gated<F>(&self, action: GatedAction, change: F) -> Result<EditOutcome, EngineError>
    where
        F: FnOnce(&mut PuzzleSession, Timestamp) -> Result<EditOutcome, EditError> + Send,
    {
        if !self.inner.gate.authorize(action).await {
            debug!(session = %self.inner.session_id, %action, "action denied");
            return Err(EngineError::Denied(action));
        }
        let outcome = self.edit(change).await?;
        self.inner.gate.committed(action).await;
        Ok(outcome)
    }

    async fn with_timer<F>(&self, change: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Timer, Timestamp),
    {
        let now = self.inner.clock.now();
        let mut state = self.lock_active().await?;
        change(state.session.timer_mut(), now);
        self.write_timer(&state, now);
        Ok(())
    }

    /// Write the current answer locally and, when the trigger calls for
    /// it, prepare a remote save. Identical answers are skipped.
    fn persist(&self, state: &mut EngineState, trigger: SaveTrigger, now: Timestamp) -> Option<PendingSave> {
        if state.tracker.is_duplicate(state.session.current()) {
            debug!(session = %self.inner.session_id, "answer unchanged, skipping save");
            return None;
        }

        let plan = self
            .inner
            .save_policy
            .plan(&state.session.to_game_state(), trigger);
        self.store_local(state, &plan.local, now);

        match plan.remote {
            Some(remote) => Some(self.pending(state, remote, now)),
            None => {
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    /// Write the session and its timer to the local store.
    fn write_local(&self, state: &mut EngineState, now: Timestamp) {
        let local = self
            .inner
            .save_policy
            .local_copy(&state.session.to_game_state());
        self.store_local(state, &local, now);
    }

    fn store_local(&self, state: &mut EngineState, local: &GameState, now: Timestamp) {
        let id = &self.inner.session_id;
        if self.inner.local.save(id, StateKind::Puzzle, local, now).is_none() {
            warn!(session = %id, "local save dropped");
        }
        self.write_timer(state, now);
        state.tracker.record(state.session.current());
    }

    fn write_timer(&self, state: &EngineState, now: Timestamp) {
        let record = state.session.timer().record();
        self.inner
            .local
            .save(&self.inner.session_id, StateKind::Timer, &record, now);
    }

    /// A remote save of the whole session, answers trimmed.
    fn remote_request(&self, state: &mut EngineState, now: Timestamp) -> PendingSave {
        let remote = self
            .inner
            .save_policy
            .remote_copy(&state.session.to_game_state());
        self.pending(state, remote, now)
    }

    fn pending(&self, state: &mut EngineState, remote: GameState, now: Timestamp) -> PendingSave {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.last_save = Some(now);
        PendingSave {
            request: SaveRequest {
                state: remote,
                expires_at: now.plus(self.inner.config.storage.remote_expiry()),
            },
            generation,
        }
    }

    async fn push_remote(&self, pending: Option<PendingSave>) {
        let Some(pending) = pending else {
            return;
        };
        let id = &self.inner.session_id;

        match self.inner.remote.save(id, &pending.request).await {
            Ok(snapshot) => {
                let mut state = self.inner.state.lock().await;
                if !self.is_active() {
                    return;
                }
                state.unconfirmed = false;
                let latest = self.inner.generation.load(Ordering::SeqCst) == pending.generation;
                if let (true, Some(parties)) = (latest, snapshot.parties) {
                    self.apply_parties(&mut state, parties);
                }
                debug!(session = %id, "remote save confirmed");
            }
            Err(e) => {
                warn!(session = %id, error = %e, "remote save failed, keeping local copy");
            }
        }
    }

    fn apply_parties(&self, state: &mut EngineState, parties: SessionParties) {
        if let Some(friends) = &self.inner.friends {
            friends.patch_parties(&self.inner.session_id, &parties);
        }
        state.parties = Some(parties);
    }

    fn poll_conditions(&self, state: &EngineState, now: Timestamp) -> PollConditions {
        let timer = state.session.timer();
        let me = self.inner.user_id.as_ref();
        let any_participant_incomplete = state.parties.as_ref().is_some_and(|parties| {
            parties
                .values()
                .flat_map(|party| party.member_sessions.iter())
                .any(|(user_id, member)| Some(user_id) != me && !member.state.is_completed())
        });

        PollConditions {
            active: self.is_active() && state.loaded,
            visible: state.visible,
            paused: timer.is_paused_by(PauseReason::Manual) || timer.is_paused_by(PauseReason::Inactivity),
            completed: state.session.completed().is_some(),
            any_participant_incomplete,
            since_last_save: now.saturating_since(state.last_save.unwrap_or(Timestamp::ZERO)),
        }
    }
}

/// Background tasks of one session. Dropping the handle aborts them.
#[derive(Debug)]
pub struct SessionTasks {
    handles: Vec<JoinHandle<()>>,
}

impl SessionTasks {
    /// Abort every task.
    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }

    /// Whether every task has ended.
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }
}

impl Drop for SessionTasks {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StorageConfig;
    use crate::gate::DailyQuotaGate;
    use crate::remote::MockRemoteStore;
    use crate::storage::MemoryBackend;
    use std::collections::BTreeMap;
    use sudoku_types::{MemberSession, Metadata, PartyId, SessionParty};

    // Open cells at (0, 2) and (8, 8); solutions 4 and 9.
    const SOLUTION: &str =
        "534678912672195348198342567859761423426853791713924856961537284287419635345286179";

    fn at(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn open_cell() -> CellId {
        CellId::new(0, 2).unwrap()
    }

    fn last_cell() -> CellId {
        CellId::new(8, 8).unwrap()
    }

    fn session_id() -> SessionId {
        SessionId::new("sudoku-engine-test")
    }

    fn solution() -> Grid {
        Grid::from_text(SOLUTION).unwrap()
    }

    fn initial() -> Grid {
        solution()
            .with_cell(open_cell(), Cell::Empty)
            .with_cell(last_cell(), Cell::Empty)
    }

    fn puzzle() -> PuzzleSession {
        PuzzleSession::new(session_id(), initial(), solution(), Metadata::default())
    }

    /// A stored game with `digit` placed in the first open cell.
    fn stored_game(digit: u8, timer: Option<TimerRecord>) -> GameState {
        let mut state = GameState::new(initial(), solution(), Metadata::default());
        state
            .answer_stack
            .push(initial().with_cell(open_cell(), Cell::Digit(digit)));
        state.timer = timer;
        state
    }

    fn parties_with(user: &str, completed: bool) -> SessionParties {
        let mut state = GameState::new(initial(), solution(), Metadata::default());
        if completed {
            state.answer_stack.push(solution());
            state.completed = Some(CompletionRecord { at: at(50), seconds: 50 });
        }
        let member = MemberSession {
            session_id: Some(session_id()),
            state,
            updated_at: at(50),
        };
        SessionParties::from([(
            PartyId::new("party"),
            SessionParty {
                member_sessions: BTreeMap::from([(UserId::new(user), member)]),
            },
        )])
    }

    struct Harness {
        engine: SyncEngine<MockRemoteStore, MemoryBackend>,
        remote: MockRemoteStore,
        local: LocalStore<MemoryBackend>,
        clock: ManualClock,
    }

    fn harness_with(backend: MemoryBackend, gate: Arc<dyn ActionGate>) -> Harness {
        let clock = ManualClock::new(at(1_000));
        let remote = MockRemoteStore::new();
        remote.set_server_time(at(1_000));
        let config = EngineConfig::default();
        let local = LocalStore::new(backend.clone(), &config.storage);
        let engine = SyncEngine::builder(
            puzzle(),
            LocalStore::new(backend, &config.storage),
            remote.clone(),
        )
        .config(config)
        .clock(Arc::new(clock.clone()))
        .gate(gate)
        .user(UserId::new("me"))
        .build();
        Harness {
            engine,
            remote,
            local,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryBackend::new(), Arc::new(AllowAll))
    }

    fn stored_stack_len(h: &Harness) -> usize {
        h.local
            .get::<GameState>(&session_id(), StateKind::Puzzle)
            .map_or(0, |snapshot| snapshot.state.answer_stack.len())
    }

    // ===========================================
    // Load and Reconciliation Tests
    // ===========================================

    #[tokio::test]
    async fn fresh_session_counts_down_and_saves_everywhere() {
        let h = harness();
        assert_eq!(h.engine.load().await, Reconciliation::Fresh);

        let snapshot = h.engine.snapshot().await;
        assert!(snapshot.loaded);
        assert!(!snapshot.unconfirmed);
        assert_eq!(snapshot.timer_phase, TimerPhase::CountingDown { remaining: 4 });
        assert_eq!(stored_stack_len(&h), 1);
        assert_eq!(h.remote.saves().len(), 1);
        assert!(h.local.get::<TimerRecord>(&session_id(), StateKind::Timer).is_some());
    }

    #[tokio::test]
    async fn newer_local_copy_is_pushed_to_remote() {
        let h = harness();
        h.local
            .save(&session_id(), StateKind::Puzzle, &stored_game(3, None), at(100));
        h.remote.put(RemoteSnapshot {
            session_id: session_id(),
            state: stored_game(7, None),
            updated_at: at(90),
            parties: None,
        });

        assert_eq!(h.engine.load().await, Reconciliation::RepushLocal);

        let saves = h.remote.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1.state.current().get(open_cell()), &Cell::Digit(3));
        assert_eq!(saves[0].1.expires_at, at(1_000 + 32 * 24 * 60 * 60));
        assert!(!h.engine.snapshot().await.unconfirmed);
    }

    #[tokio::test]
    async fn newer_remote_copy_is_adopted_with_its_timer() {
        let h = harness();
        h.local
            .save(&session_id(), StateKind::Puzzle, &stored_game(3, None), at(100));
        let timer = TimerRecord {
            seconds: 42,
            ..TimerRecord::default()
        };
        h.remote.put(RemoteSnapshot {
            session_id: session_id(),
            state: stored_game(7, Some(timer)),
            updated_at: at(110),
            parties: None,
        });

        assert_eq!(h.engine.load().await, Reconciliation::AdoptRemote);

        let snapshot = h.engine.snapshot().await;
        assert_eq!(snapshot.current.get(open_cell()), &Cell::Digit(7));
        assert_eq!(snapshot.elapsed_seconds, 42);
        assert_eq!(snapshot.timer_phase, TimerPhase::Running);
        let local = h.local.get::<GameState>(&session_id(), StateKind::Puzzle).unwrap();
        assert_eq!(local.state.current().get(open_cell()), &Cell::Digit(7));
        assert!(h.remote.saves().is_empty());
    }

    #[tokio::test]
    async fn equal_copies_are_left_alone() {
        let h = harness();
        h.local
            .save(&session_id(), StateKind::Puzzle, &stored_game(3, None), at(100));
        h.remote.put(RemoteSnapshot {
            session_id: session_id(),
            state: stored_game(3, None),
            updated_at: at(100),
            parties: None,
        });

        assert_eq!(h.engine.load().await, Reconciliation::InSync);
        assert!(h.remote.saves().is_empty());
        assert_eq!(h.engine.snapshot().await.timer_phase, TimerPhase::Running);
    }

    #[tokio::test]
    async fn unreachable_remote_stays_unconfirmed_until_a_save_lands() {
        let h = harness();
        h.remote.set_offline(true);

        assert_eq!(h.engine.load().await, Reconciliation::Unconfirmed);
        assert!(h.engine.snapshot().await.unconfirmed);
        assert_eq!(stored_stack_len(&h), 1);
        assert!(h.remote.saves().is_empty());

        h.remote.set_offline(false);
        h.engine.select(Some(open_cell())).await.unwrap();
        h.engine.set_answer(Cell::Digit(4)).await.unwrap();
        assert!(!h.engine.snapshot().await.unconfirmed);
        assert_eq!(h.remote.saves().len(), 1);
    }

    // ===========================================
    // Save Routing Tests
    // ===========================================

    #[tokio::test]
    async fn wrong_edits_stay_local() {
        let h = harness();
        h.engine.load().await;
        h.engine.select(Some(open_cell())).await.unwrap();

        let outcome = h.engine.set_answer(Cell::Digit(3)).await.unwrap();
        assert_eq!(outcome.trigger, SaveTrigger::Edit { correct: false });
        assert_eq!(stored_stack_len(&h), 2);
        assert_eq!(h.remote.saves().len(), 1);
    }

    #[tokio::test]
    async fn correct_edits_reach_remote_once() {
        let h = harness();
        h.engine.load().await;
        h.engine.select(Some(open_cell())).await.unwrap();

        h.engine.set_answer(Cell::Digit(4)).await.unwrap();
        assert_eq!(h.remote.saves().len(), 2);
        let saved = &h.remote.saves()[1].1.state;
        assert_eq!(saved.answer_stack.len(), 2);
        assert!(saved.timer.is_some());

        // Same grid again.
        h.engine.set_answer(Cell::Digit(4)).await.unwrap();
        assert_eq!(h.remote.saves().len(), 2);
        assert_eq!(stored_stack_len(&h), 2);
    }

    #[tokio::test]
    async fn completion_stops_the_timer_and_saves_remotely() {
        let h = harness();
        h.engine.load().await;
        h.engine.select(Some(open_cell())).await.unwrap();
        h.engine.set_answer(Cell::Digit(4)).await.unwrap();
        h.engine.select(Some(last_cell())).await.unwrap();

        let outcome = h.engine.set_answer(Cell::Digit(9)).await.unwrap();
        assert!(outcome.completed_now);

        let snapshot = h.engine.snapshot().await;
        assert!(snapshot.completed.is_some());
        assert_eq!(snapshot.timer_phase, TimerPhase::Stopped);
        assert_eq!(snapshot.selected, None);
        assert!(h.remote.stored(&session_id()).unwrap().state.is_completed());
        assert_eq!(stored_stack_len(&h), 2);
        assert_eq!(
            h.engine.set_answer(Cell::Digit(1)).await,
            Err(EngineError::Edit(EditError::Completed))
        );
    }

    #[tokio::test]
    async fn full_local_store_does_not_block_play() {
        let h = harness_with(MemoryBackend::with_quota(16), Arc::new(AllowAll));
        h.engine.load().await;
        h.engine.select(Some(open_cell())).await.unwrap();

        assert!(h.engine.set_answer(Cell::Digit(4)).await.is_ok());
        assert_eq!(stored_stack_len(&h), 0);
        assert_eq!(h.remote.saves().len(), 2);
    }

    #[tokio::test]
    async fn failed_remote_save_keeps_local_copy() {
        let h = harness();
        h.engine.load().await;
        h.engine.select(Some(open_cell())).await.unwrap();
        h.remote.fail_next_save("server error");

        assert!(h.engine.set_answer(Cell::Digit(4)).await.is_ok());
        assert_eq!(stored_stack_len(&h), 2);
        assert_eq!(h.remote.saves().len(), 1);
    }

    // ===========================================
    // Gated Action Tests
    // ===========================================

    fn quota_gate(clock: &ManualClock) -> Arc<DailyQuotaGate<MemoryBackend>> {
        let store = LocalStore::new(MemoryBackend::new(), &StorageConfig::default());
        Arc::new(DailyQuotaGate::new(store, Arc::new(clock.clone())))
    }

    #[tokio::test]
    async fn denied_reveal_changes_nothing() {
        let clock = ManualClock::new(at(1_000));
        let h = harness_with(MemoryBackend::new(), quota_gate(&clock));
        h.engine.load().await;

        assert_eq!(
            h.engine.reveal().await,
            Err(EngineError::Denied(GatedAction::Reveal))
        );
        let snapshot = h.engine.snapshot().await;
        assert_eq!(snapshot.stack_len, 1);
        assert!(snapshot.completed.is_none());
    }

    #[tokio::test]
    async fn undo_uses_one_free_action() {
        let clock = ManualClock::new(at(1_000));
        let gate = quota_gate(&clock);
        let h = harness_with(MemoryBackend::new(), gate.clone());
        h.engine.load().await;

        assert_eq!(
            h.engine.undo().await,
            Err(EngineError::Edit(EditError::NothingToUndo))
        );
        assert_eq!(gate.remaining(GatedAction::Undo), Some(5));

        h.engine.select(Some(open_cell())).await.unwrap();
        h.engine.set_answer(Cell::Digit(3)).await.unwrap();
        h.engine.undo().await.unwrap();
        assert_eq!(gate.remaining(GatedAction::Undo), Some(4));
        assert_eq!(stored_stack_len(&h), 1);
        assert!(!h.engine.snapshot().await.redo_disabled);
    }

    #[tokio::test]
    async fn grid_check_is_gated_only_when_shown() {
        let clock = ManualClock::new(at(1_000));
        let gate = quota_gate(&clock);
        let h = harness_with(MemoryBackend::new(), gate.clone());
        h.engine.load().await;

        assert!(h.engine.validate_grid().await.unwrap());
        assert!(!h.engine.validate_grid().await.unwrap());
        assert_eq!(gate.remaining(GatedAction::CheckGrid), Some(4));
    }

    // ===========================================
    // Polling Tests
    // ===========================================

    #[tokio::test]
    async fn polls_only_when_someone_is_still_playing() {
        let h = harness();
        h.remote.set_parties(parties_with("bob", false));
        h.engine.load().await;
        assert!(h.engine.snapshot().await.parties.is_some());

        // Just saved.
        assert!(!h.engine.should_poll().await);

        h.clock.advance(Duration::from_secs(31));
        assert!(h.engine.should_poll().await);

        h.engine.set_paused(true).await.unwrap();
        assert!(!h.engine.should_poll().await);
        h.engine.set_paused(false).await.unwrap();
        assert!(h.engine.should_poll().await);

        h.engine.set_visible(false).await.unwrap();
        assert!(!h.engine.should_poll().await);
        h.engine.set_visible(true).await.unwrap();

        h.clock.advance(Duration::from_secs(1_800));
        assert!(!h.engine.should_poll().await);
    }

    #[tokio::test]
    async fn own_and_finished_entries_do_not_trigger_polls() {
        let h = harness();
        h.remote.set_parties(parties_with("me", false));
        h.engine.load().await;
        h.clock.advance(Duration::from_secs(60));
        assert!(!h.engine.should_poll().await);

        h.remote.set_parties(parties_with("bob", true));
        assert!(h.engine.refresh_session_parties().await);
        assert!(!h.engine.should_poll().await);
    }

    #[tokio::test]
    async fn stale_poll_responses_are_dropped() {
        let h = harness();
        h.engine.load().await;
        let response = RemoteSnapshot {
            session_id: session_id(),
            state: stored_game(4, None),
            updated_at: at(1_000),
            parties: Some(parties_with("bob", false)),
        };

        let ticket = h.engine.poll_ticket();
        h.engine.select(Some(open_cell())).await.unwrap();
        h.engine.set_answer(Cell::Digit(3)).await.unwrap();
        assert!(!h.engine.complete_poll(ticket, Ok(Some(response.clone()))).await);
        assert!(h.engine.snapshot().await.parties.is_none());

        let ticket = h.engine.poll_ticket();
        assert!(h.engine.complete_poll(ticket, Ok(Some(response))).await);
        assert!(h.engine.snapshot().await.parties.is_some());
        // Polls never touch the answers.
        assert_eq!(h.engine.snapshot().await.current.get(open_cell()), &Cell::Digit(3));
    }

    #[tokio::test]
    async fn poll_waiting_for_the_session_sees_saves_made_meanwhile() {
        let h = harness();
        h.engine.load().await;
        let response = RemoteSnapshot {
            session_id: session_id(),
            state: stored_game(4, None),
            updated_at: at(1_000),
            parties: Some(parties_with("bob", false)),
        };

        let ticket = h.engine.poll_ticket();
        let guard = h.engine.inner.state.lock().await;
        let engine = h.engine.clone();
        let poll = tokio::spawn(async move { engine.complete_poll(ticket, Ok(Some(response))).await });
        // Let the poll reach the lock before the save lands.
        tokio::task::yield_now().await;
        h.engine.inner.generation.fetch_add(1, Ordering::SeqCst);
        drop(guard);

        assert!(!poll.await.unwrap());
        assert!(h.engine.snapshot().await.parties.is_none());
    }

    // ===========================================
    // Timer and Lifecycle Tests
    // ===========================================

    #[tokio::test]
    async fn inactivity_pauses_until_the_next_selection() {
        let h = harness();
        h.engine.load().await;
        h.clock.advance(Duration::from_secs(299));
        assert!(!h.engine.check_inactivity().await.unwrap());

        h.clock.advance(Duration::from_secs(1));
        assert!(h.engine.check_inactivity().await.unwrap());
        assert_eq!(h.engine.snapshot().await.timer_phase, TimerPhase::Paused);

        h.engine.select(Some(open_cell())).await.unwrap();
        assert_eq!(h.engine.snapshot().await.timer_phase, TimerPhase::Running);
    }

    #[tokio::test]
    async fn shutdown_drops_late_work() {
        let h = harness();
        h.engine.load().await;
        h.engine.shutdown().await;

        assert!(!h.engine.is_active());
        assert_eq!(
            h.engine.set_answer(Cell::Digit(4)).await,
            Err(EngineError::ShutDown)
        );
        let ticket = h.engine.poll_ticket();
        let response = RemoteSnapshot {
            session_id: session_id(),
            state: stored_game(4, None),
            updated_at: at(1_000),
            parties: Some(parties_with("bob", false)),
        };
        assert!(!h.engine.complete_poll(ticket, Ok(Some(response))).await);
        assert!(h.engine.snapshot().await.parties.is_none());
    }

    #[tokio::test]
    async fn save_confirmation_waiting_for_the_session_is_dropped_after_shutdown() {
        let h = harness();
        h.engine.load().await;
        h.remote.set_parties(parties_with("bob", false));
        let pending = {
            let mut state = h.engine.inner.state.lock().await;
            state.unconfirmed = true;
            Some(h.engine.remote_request(&mut state, at(1_000)))
        };

        let guard = h.engine.inner.state.lock().await;
        let engine = h.engine.clone();
        let push = tokio::spawn(async move { engine.push_remote(pending).await });
        tokio::task::yield_now().await;
        h.engine.inner.active.store(false, Ordering::SeqCst);
        drop(guard);
        push.await.unwrap();

        let snapshot = h.engine.snapshot().await;
        assert!(snapshot.unconfirmed);
        assert!(snapshot.parties.is_none());
        assert_eq!(h.remote.saves().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_waits_for_the_session() {
        let h = harness();
        h.engine.load().await;

        let guard = h.engine.inner.state.lock().await;
        let engine = h.engine.clone();
        let shutdown = tokio::spawn(async move { engine.shutdown().await });
        tokio::task::yield_now().await;
        // Holders of the session still see a live engine.
        assert!(h.engine.is_active());
        drop(guard);
        shutdown.await.unwrap();

        assert!(!h.engine.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn background_tasks_run_the_countdown() {
        let h = harness();
        h.engine.load().await;
        let tasks = h.engine.spawn_tasks();

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(h.engine.snapshot().await.timer_phase, TimerPhase::Running);

        drop(tasks);
    }
}
