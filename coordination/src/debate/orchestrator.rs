//! Debate orchestrator — drives sessions through their lifecycle.
//!
//! Ties together the session store, the round-robin scheduler, the responder
//! and the notification queue. The orchestrator keeps no session state between
//! calls: every operation starts from a fresh store snapshot, and every turn is
//! committed with a compare-and-set on the persisted turn count.
//!
//! ```text
//!  load_snapshot ─▶ next_participant ─▶ responder (timeout) ─▶ commit_turn ─▶ notify
//!        ▲                                                         │
//!        └──────────────────── TurnConflict: reload ◀──────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::events::{DebateEvent, StatusChanged, TurnCreated};
use crate::registry::SharedAgentDirectory;
use crate::state::{NewTurn, SessionSnapshot, SharedSessionStore, StoreError, TurnCommit};

use super::error::{DebateError, DebateResult};
use super::notifier::{NotificationDispatcher, SharedNotifier};
use super::prompts::{history_entries, synthesis_prompt, transcript, TurnPrompt};
use super::responder::{GenerateRequest, ResponderError, SharedResponder};
use super::scheduler;
use super::state::{DebateSession, DebateStatus, Participant, Turn};

/// Role tag sent with the synthesis request.
pub const SUMMARIZER_ROLE: &str = "summarizer";

/// Configuration for the debate orchestrator.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// Fewest participants a debate may have.
    pub min_participants: usize,
    /// Most participants a debate may have.
    pub max_participants: usize,
    /// Recent turns handed to the responder as context.
    pub history_window: usize,
    /// Pause between turns in `run_to_completion`.
    pub turn_pacing: Duration,
    /// Upper bound on a single responder call.
    pub responder_timeout: Duration,
    /// Upper bound on a single notification delivery.
    pub notify_timeout: Duration,
    /// Commit attempts per turn before a conflict is surfaced.
    pub max_commit_attempts: u32,
    /// Queued notifications before new ones are dropped.
    pub notify_queue_capacity: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            min_participants: 2,
            max_participants: 5,
            history_window: 10,
            turn_pacing: Duration::from_millis(500),
            responder_timeout: Duration::from_secs(120),
            notify_timeout: Duration::from_secs(5),
            max_commit_attempts: 3,
            notify_queue_capacity: 256,
        }
    }
}

impl DebateConfig {
    /// Validate the configuration; return the reason if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_participants < 2 {
            return Err(format!(
                "min_participants must be at least 2, got {}",
                self.min_participants
            ));
        }
        if self.max_participants < self.min_participants {
            return Err(format!(
                "max_participants ({}) is below min_participants ({})",
                self.max_participants, self.min_participants
            ));
        }
        if self.history_window == 0 {
            return Err("history_window must be positive".to_string());
        }
        if self.max_commit_attempts == 0 {
            return Err("max_commit_attempts must be positive".to_string());
        }
        if self.responder_timeout.is_zero() || self.notify_timeout.is_zero() {
            return Err("timeouts must be positive".to_string());
        }
        if self.notify_queue_capacity == 0 {
            return Err("notify_queue_capacity must be positive".to_string());
        }
        Ok(())
    }
}

/// One agent to bind to a new debate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSpec {
    pub agent_id: String,
    pub role: Option<String>,
}

impl ParticipantSpec {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Parameters for [`DebateOrchestrator::create`].
#[derive(Debug, Clone)]
pub struct CreateDebate {
    pub title: String,
    pub task: String,
    /// Round-robin order is the order given here.
    pub participants: Vec<ParticipantSpec>,
    pub max_turns_per_agent: u32,
    pub created_by: String,
    pub channel_id: String,
}

/// Session with its participants, as returned by `get_session`.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session: DebateSession,
    pub participants: Vec<Participant>,
}

/// Shared reference to DebateOrchestrator
pub type SharedDebateOrchestrator = Arc<DebateOrchestrator>;

/// The debate orchestrator — the state-machine driver for debate sessions.
///
/// Usage:
/// 1. `create()` a session in `pending`
/// 2. `start()` it, or let `run_to_completion()` start it
/// 3. `advance_one_turn()` repeatedly, or `run_to_completion()` once
/// 4. `summarize()` once the session is `completed`
pub struct DebateOrchestrator {
    store: SharedSessionStore,
    responder: SharedResponder,
    directory: SharedAgentDirectory,
    notifications: NotificationDispatcher,
    config: DebateConfig,
}

impl DebateOrchestrator {
    /// Create an orchestrator. Must be called inside a Tokio runtime since it
    /// spawns the notification worker.
    pub fn new(
        store: SharedSessionStore,
        responder: SharedResponder,
        notifier: SharedNotifier,
        directory: SharedAgentDirectory,
        config: DebateConfig,
    ) -> Self {
        let notifications = NotificationDispatcher::new(
            notifier,
            config.notify_queue_capacity,
            config.notify_timeout,
        );
        Self {
            store,
            responder,
            directory,
            notifications,
            config,
        }
    }

    /// Create a shared reference to this orchestrator
    pub fn shared(self) -> SharedDebateOrchestrator {
        Arc::new(self)
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Create a pending session with participants in the supplied order.
    pub async fn create(&self, params: CreateDebate) -> DebateResult<DebateSession> {
        let count = params.participants.len();
        if count < self.config.min_participants || count > self.config.max_participants {
            return Err(DebateError::InvalidArgument(format!(
                "a debate needs {} to {} participants, got {}",
                self.config.min_participants, self.config.max_participants, count
            )));
        }
        if params.max_turns_per_agent == 0 {
            return Err(DebateError::InvalidArgument(
                "max_turns_per_agent must be at least 1".to_string(),
            ));
        }
        if params.title.trim().is_empty() || params.task.trim().is_empty() {
            return Err(DebateError::InvalidArgument(
                "title and task must not be empty".to_string(),
            ));
        }

        let mut profiles = Vec::with_capacity(count);
        for spec in &params.participants {
            match self.directory.lookup(&spec.agent_id).await {
                Some(profile) if profile.active => profiles.push(profile),
                Some(_) => {
                    return Err(DebateError::NotFound(format!(
                        "agent {} is inactive",
                        spec.agent_id
                    )))
                }
                None => {
                    return Err(DebateError::NotFound(format!(
                        "agent {} does not exist",
                        spec.agent_id
                    )))
                }
            }
        }

        let session = DebateSession::new(
            &params.title,
            &params.task,
            params.max_turns_per_agent,
            count as u32,
            &params.created_by,
            &params.channel_id,
        );
        let participants: Vec<Participant> = params
            .participants
            .into_iter()
            .zip(profiles)
            .enumerate()
            .map(|(position, (spec, profile))| Participant {
                id: uuid::Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                agent_id: spec.agent_id,
                agent_name: profile.name,
                role: spec.role,
                position: position as u32,
            })
            .collect();

        self.store.create_session(&session, &participants).await?;

        info!(
            session_id = %session.id,
            channel_id = %session.channel_id,
            participants = count,
            total_turns = session.total_turns(),
            "Debate created"
        );
        Ok(session)
    }

    /// Move a pending session into progress.
    pub async fn start(&self, session_id: &str) -> DebateResult<DebateSession> {
        let session = self
            .store
            .transition(session_id, DebateStatus::InProgress, "started")
            .await?;

        info!(session_id, "Debate started");
        self.notifications
            .submit(DebateEvent::StatusChanged(StatusChanged::new(&session)));
        Ok(session)
    }

    /// Produce exactly one turn. Returns the turn and whether it completed
    /// the session.
    pub async fn advance_one_turn(&self, session_id: &str) -> DebateResult<(Turn, bool)> {
        let mut snapshot = self
            .store
            .load_snapshot(session_id, self.config.history_window)
            .await?;
        let commit = self.produce_turn(&mut snapshot).await?;
        let complete = commit.completed_session();
        Ok((commit.turn, complete))
    }

    /// Start the session if needed and produce turns until it completes.
    ///
    /// Returns only the turns produced by this call. If the responder fails
    /// the loop stops with the turns so far persisted; calling again resumes
    /// from the persisted count.
    pub async fn run_to_completion(&self, session_id: &str) -> DebateResult<Vec<Turn>> {
        let mut snapshot = self
            .store
            .load_snapshot(session_id, self.config.history_window)
            .await?;

        if snapshot.session.status == DebateStatus::Pending {
            match self.start(session_id).await {
                Ok(session) => snapshot.session = session,
                // Started (or cancelled) by someone else in the meantime.
                Err(DebateError::InvalidState(_)) => {
                    snapshot = self
                        .store
                        .load_snapshot(session_id, self.config.history_window)
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }
        ensure_in_progress(&snapshot.session)?;

        let mut produced = Vec::new();
        while !snapshot.session.turns_exhausted() {
            if !produced.is_empty() && !self.config.turn_pacing.is_zero() {
                tokio::time::sleep(self.config.turn_pacing).await;
            }

            let seen = snapshot.session.current_turn_count;
            match self.produce_turn(&mut snapshot).await {
                Ok(commit) => produced.push(commit.turn),
                Err(DebateError::InvalidState(reason)) => {
                    let current = self
                        .store
                        .load_snapshot(session_id, self.config.history_window)
                        .await?;
                    match current.session.status {
                        DebateStatus::Completed => {
                            debug!(
                                session_id,
                                produced = produced.len(),
                                "Debate completed by a concurrent caller"
                            );
                            break;
                        }
                        // Lost every retry to callers that kept committing.
                        DebateStatus::InProgress if current.session.current_turn_count > seen => {
                            debug!(
                                session_id,
                                turn_count = current.session.current_turn_count,
                                "Run outpaced by concurrent callers, continuing"
                            );
                            snapshot = current;
                        }
                        _ => return Err(DebateError::InvalidState(reason)),
                    }
                }
                Err(e) => {
                    warn!(
                        session_id,
                        produced = produced.len(),
                        error = %e,
                        "Run stopped before completion"
                    );
                    return Err(e);
                }
            }
        }

        info!(session_id, produced = produced.len(), "Run finished");
        Ok(produced)
    }

    /// Cancel a session that has not reached a terminal status.
    pub async fn cancel(&self, session_id: &str) -> DebateResult<DebateSession> {
        let session = self
            .store
            .transition(session_id, DebateStatus::Cancelled, "cancelled")
            .await?;

        info!(
            session_id,
            turns = session.current_turn_count,
            "Debate cancelled"
        );
        self.notifications
            .submit(DebateEvent::StatusChanged(StatusChanged::new(&session)));
        Ok(session)
    }

    /// Synthesize the full transcript of a completed session and store it.
    ///
    /// Calling again replaces the previous summary.
    pub async fn summarize(&self, session_id: &str) -> DebateResult<String> {
        let snapshot = self.store.load_snapshot(session_id, 0).await?;
        if snapshot.session.status != DebateStatus::Completed {
            return Err(DebateError::InvalidState(format!(
                "session {} is {}, only completed debates can be summarized",
                session_id, snapshot.session.status
            )));
        }

        let turns = self.store.list_turns(session_id).await?;
        let summarizer = snapshot.participants.first().ok_or_else(|| {
            DebateError::InvalidState(format!("session {} has no participants", session_id))
        })?;
        let prompt = synthesis_prompt(
            &snapshot.session.title,
            &snapshot.session.task,
            &transcript(&turns, &snapshot.participants),
        );

        let summary = self
            .generate(GenerateRequest {
                agent_id: summarizer.agent_id.clone(),
                role: Some(SUMMARIZER_ROLE.to_string()),
                prompt,
                history: Vec::new(),
            })
            .await?;
        self.store.save_summary(session_id, &summary).await?;

        info!(session_id, chars = summary.len(), "Debate summarized");
        Ok(summary)
    }

    /// Session and participants.
    pub async fn get_session(&self, session_id: &str) -> DebateResult<SessionView> {
        let snapshot = self.store.load_snapshot(session_id, 0).await?;
        Ok(SessionView {
            session: snapshot.session,
            participants: snapshot.participants,
        })
    }

    /// Every turn of a session in turn-number order.
    pub async fn turns(&self, session_id: &str) -> DebateResult<Vec<Turn>> {
        Ok(self.store.list_turns(session_id).await?)
    }

    /// Wait until every notification submitted so far has been attempted.
    pub async fn flush_notifications(&self) {
        self.notifications.flush().await;
    }

    /// Generate and commit the next turn for `snapshot`, reloading and
    /// retrying when another caller committed first. On success the snapshot
    /// is advanced to include the new turn.
    async fn produce_turn(&self, snapshot: &mut SessionSnapshot) -> DebateResult<TurnCommit> {
        let session_id = snapshot.session.id.clone();
        let mut attempt = 1;

        loop {
            ensure_in_progress(&snapshot.session)?;
            if snapshot.session.turns_exhausted() {
                return Err(DebateError::InvalidState(format!(
                    "session {} has used all {} turns",
                    session_id,
                    snapshot.session.total_turns()
                )));
            }

            let participant = scheduler::next_participant(
                &snapshot.participants,
                snapshot.session.current_turn_count,
            )?
            .clone();
            let turn_number = snapshot.session.current_turn_count + 1;

            let prompt = TurnPrompt {
                task: &snapshot.session.task,
                participant: &participant,
                turn_number,
                total_turns: snapshot.session.total_turns(),
                participant_count: snapshot.session.participant_count,
            }
            .render();
            let content = self
                .generate(GenerateRequest {
                    agent_id: participant.agent_id.clone(),
                    role: participant.role.clone(),
                    prompt,
                    history: history_entries(&snapshot.recent_turns, &snapshot.participants),
                })
                .await?;

            let new_turn = NewTurn {
                participant_id: participant.id.clone(),
                turn_number,
                content,
            };
            match self.store.commit_turn(&session_id, new_turn).await {
                Ok(commit) => {
                    debug!(
                        session_id = %session_id,
                        turn_number,
                        agent_id = %participant.agent_id,
                        complete = commit.completed_session(),
                        "Turn committed"
                    );
                    self.advance_snapshot(snapshot, &commit);
                    self.publish_turn(&commit, &participant);
                    return Ok(commit);
                }
                Err(err @ (StoreError::TurnConflict { .. } | StoreError::WrongParticipant { .. }))
                    if attempt < self.config.max_commit_attempts =>
                {
                    warn!(
                        session_id = %session_id,
                        turn_number,
                        attempt,
                        error = %err,
                        "Turn lost a commit race, reloading"
                    );
                    attempt += 1;
                    *snapshot = self
                        .store
                        .load_snapshot(&session_id, self.config.history_window)
                        .await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn advance_snapshot(&self, snapshot: &mut SessionSnapshot, commit: &TurnCommit) {
        snapshot.session = commit.session.clone();
        snapshot.recent_turns.push(commit.turn.clone());
        let excess = snapshot
            .recent_turns
            .len()
            .saturating_sub(self.config.history_window);
        snapshot.recent_turns.drain(..excess);
    }

    fn publish_turn(&self, commit: &TurnCommit, participant: &Participant) {
        self.notifications.submit(DebateEvent::TurnCreated(TurnCreated::new(
            &commit.session,
            &commit.turn,
            &participant.agent_id,
        )));
        if commit.completed_session() {
            info!(
                session_id = %commit.session.id,
                turns = commit.session.current_turn_count,
                "Debate completed"
            );
            self.notifications
                .submit(DebateEvent::StatusChanged(StatusChanged::new(&commit.session)));
        }
    }

    /// Call the responder under the configured timeout. Every failure,
    /// including an empty reply, becomes `DependencyFailure`.
    async fn generate(&self, request: GenerateRequest) -> DebateResult<String> {
        let agent_id = request.agent_id.clone();
        let started = Instant::now();

        let limit = self.config.responder_timeout;
        let result = match tokio::time::timeout(limit, self.responder.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ResponderError::Timeout(limit.as_millis() as u64)),
        };

        match result {
            Ok(text) if !text.trim().is_empty() => {
                debug!(
                    agent_id = %agent_id,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Responder replied"
                );
                Ok(text.trim().to_string())
            }
            Ok(_) => {
                let err = ResponderError::MalformedResponse("empty reply".to_string());
                warn!(agent_id = %agent_id, error = %err, "Responder failed");
                Err(DebateError::DependencyFailure(err.to_string()))
            }
            Err(err) => {
                warn!(agent_id = %agent_id, error = %err, "Responder failed");
                Err(DebateError::DependencyFailure(err.to_string()))
            }
        }
    }
}

fn ensure_in_progress(session: &DebateSession) -> DebateResult<()> {
    if session.status != DebateStatus::InProgress {
        return Err(DebateError::InvalidState(format!(
            "session {} is {}, expected {}",
            session.id,
            session.status,
            DebateStatus::InProgress
        )));
    }
    Ok(())
}
