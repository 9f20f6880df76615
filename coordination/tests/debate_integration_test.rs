//! Debate integration test — drives full sessions through the orchestrator
//! with a scripted responder (no gateway calls).
//!
//! Covers: orchestrator ↔ scheduler ↔ in-memory store ↔ event bus running
//! together, including failure recovery and terminal-state rejection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use debate_coordination::debate::{DebateConfig, ParticipantSpec};
use debate_coordination::events::EventBusExt;
use debate_coordination::{
    AgentProfile, AgentRegistry, CreateDebate, DebateError, DebateEvent, DebateOrchestrator,
    DebateStatus, EventBus, EventBusNotifier, EventFilter, GenerateRequest,
    InMemorySessionStore, Responder, ResponderError, SessionStore, SharedEventBus, Turn,
};

/// Helper: deterministic responder that can be told to fail upcoming calls.
#[derive(Default)]
struct ScriptedResponder {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
}

impl ScriptedResponder {
    fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn generate(&self, request: GenerateRequest) -> Result<String, ResponderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ResponderError::RequestFailed("gateway unavailable".to_string()));
        }
        Ok(format!("{} argues (call {})", request.agent_id, call))
    }
}

struct Harness {
    orchestrator: DebateOrchestrator,
    store: Arc<InMemorySessionStore>,
    responder: Arc<ScriptedResponder>,
    bus: SharedEventBus,
}

/// Helper: orchestrator over an in-memory store with three registered agents.
fn harness() -> Harness {
    let registry = AgentRegistry::new();
    registry.register(AgentProfile::new("agent1", "Ada")).unwrap();
    registry.register(AgentProfile::new("agent2", "Brian")).unwrap();
    registry.register(AgentProfile::new("agent3", "Cleo")).unwrap();

    let store = InMemorySessionStore::new().shared();
    let responder = Arc::new(ScriptedResponder::default());
    let bus = EventBus::new().shared();
    let orchestrator = DebateOrchestrator::new(
        store.clone(),
        responder.clone(),
        Arc::new(EventBusNotifier::new(bus.clone())),
        registry.shared(),
        DebateConfig {
            turn_pacing: Duration::ZERO,
            ..Default::default()
        },
    );

    Harness {
        orchestrator,
        store,
        responder,
        bus,
    }
}

/// Helper: advocate/critic debate (Scenario A/B setup).
fn two_agent_debate(max_turns: u32) -> CreateDebate {
    CreateDebate {
        title: "Monorepo or polyrepo".to_string(),
        task: "Should the platform team move to a monorepo?".to_string(),
        participants: vec![
            ParticipantSpec::new("agent1").with_role("advocate"),
            ParticipantSpec::new("agent2").with_role("critic"),
        ],
        max_turns_per_agent: max_turns,
        created_by: "user-42".to_string(),
        channel_id: "architecture".to_string(),
    }
}

fn three_agent_debate(max_turns: u32) -> CreateDebate {
    CreateDebate {
        participants: vec![
            ParticipantSpec::new("agent1"),
            ParticipantSpec::new("agent2"),
            ParticipantSpec::new("agent3").with_role("moderator"),
        ],
        ..two_agent_debate(max_turns)
    }
}

/// Helper: agent id that produced each turn, via the stored participants.
async fn speakers(h: &Harness, session_id: &str, turns: &[Turn]) -> Vec<String> {
    let view = h.orchestrator.get_session(session_id).await.unwrap();
    turns
        .iter()
        .map(|t| {
            view.participants
                .iter()
                .find(|p| p.id == t.participant_id)
                .map(|p| p.agent_id.clone())
                .unwrap()
        })
        .collect()
}

fn assert_invalid_state<T: std::fmt::Debug>(result: Result<T, DebateError>) {
    match result {
        Err(DebateError::InvalidState(_)) => {}
        other => panic!("expected InvalidState, got {:?}", other),
    }
}

// ── Scenario A: step-by-step ────────────────────────────────────────

#[tokio::test]
async fn test_scenario_a_step_by_step() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(2)).await.unwrap();
    assert_eq!(session.total_turns(), 4);

    let started = h.orchestrator.start(&session.id).await.unwrap();
    assert_eq!(started.status, DebateStatus::InProgress);

    let mut turns = Vec::new();
    let mut flags = Vec::new();
    for _ in 0..4 {
        let (turn, complete) = h.orchestrator.advance_one_turn(&session.id).await.unwrap();
        turns.push(turn);
        flags.push(complete);
    }

    assert_eq!(flags, vec![false, false, false, true]);
    assert_eq!(
        speakers(&h, &session.id, &turns).await,
        vec!["agent1", "agent2", "agent1", "agent2"]
    );

    let view = h.orchestrator.get_session(&session.id).await.unwrap();
    assert_eq!(view.session.status, DebateStatus::Completed);
    assert_eq!(view.session.current_turn_count, 4);
    assert!(view.session.completed_at.is_some());
}

// ── Scenario B: one batch call ──────────────────────────────────────

#[tokio::test]
async fn test_scenario_b_run_to_completion_from_pending() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(2)).await.unwrap();

    let turns = h.orchestrator.run_to_completion(&session.id).await.unwrap();

    assert_eq!(turns.len(), 4);
    let numbers: Vec<u32> = turns.iter().map(|t| t.turn_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(
        speakers(&h, &session.id, &turns).await,
        vec!["agent1", "agent2", "agent1", "agent2"]
    );

    let view = h.orchestrator.get_session(&session.id).await.unwrap();
    assert_eq!(view.session.status, DebateStatus::Completed);
}

// ── Scenario C: cancel before start ─────────────────────────────────

#[tokio::test]
async fn test_scenario_c_cancel_pending() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(2)).await.unwrap();

    let cancelled = h.orchestrator.cancel(&session.id).await.unwrap();
    assert_eq!(cancelled.status, DebateStatus::Cancelled);

    assert_invalid_state(h.orchestrator.start(&session.id).await);
}

// ── Scenario D: summarize ───────────────────────────────────────────

#[tokio::test]
async fn test_scenario_d_summarize_only_when_completed() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(1)).await.unwrap();
    h.orchestrator.start(&session.id).await.unwrap();
    h.orchestrator.advance_one_turn(&session.id).await.unwrap();

    assert_invalid_state(h.orchestrator.summarize(&session.id).await);

    h.orchestrator.advance_one_turn(&session.id).await.unwrap();
    let summary = h.orchestrator.summarize(&session.id).await.unwrap();
    assert!(!summary.is_empty());

    let stored = h.store.load_snapshot(&session.id, 0).await.unwrap();
    assert_eq!(stored.session.summary.as_deref(), Some(summary.as_str()));
}

// ── P2: same order either way ───────────────────────────────────────

#[tokio::test]
async fn test_round_robin_matches_between_step_and_batch() {
    let h = harness();

    let stepped = h.orchestrator.create(three_agent_debate(2)).await.unwrap();
    h.orchestrator.start(&stepped.id).await.unwrap();
    let mut stepped_turns = Vec::new();
    loop {
        let (turn, complete) = h.orchestrator.advance_one_turn(&stepped.id).await.unwrap();
        stepped_turns.push(turn);
        if complete {
            break;
        }
    }

    let batched = h.orchestrator.create(three_agent_debate(2)).await.unwrap();
    let batched_turns = h.orchestrator.run_to_completion(&batched.id).await.unwrap();

    let expected = vec!["agent1", "agent2", "agent3", "agent1", "agent2", "agent3"];
    assert_eq!(speakers(&h, &stepped.id, &stepped_turns).await, expected);
    assert_eq!(speakers(&h, &batched.id, &batched_turns).await, expected);
}

// ── P3: completion arithmetic ───────────────────────────────────────

#[tokio::test]
async fn test_completes_exactly_at_total_turns() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(3)).await.unwrap();
    h.orchestrator.start(&session.id).await.unwrap();

    for expected_count in 1..=6u32 {
        let (turn, complete) = h.orchestrator.advance_one_turn(&session.id).await.unwrap();
        assert_eq!(turn.turn_number, expected_count);
        assert_eq!(complete, expected_count == 6);

        let view = h.orchestrator.get_session(&session.id).await.unwrap();
        let expected_status = if expected_count == 6 {
            DebateStatus::Completed
        } else {
            DebateStatus::InProgress
        };
        assert_eq!(view.session.status, expected_status);
    }

    assert_invalid_state(h.orchestrator.advance_one_turn(&session.id).await);
    assert_eq!(h.orchestrator.turns(&session.id).await.unwrap().len(), 6);
}

// ── P4: failure recovery ────────────────────────────────────────────

#[tokio::test]
async fn test_responder_failure_leaves_no_turn() {
    let h = harness();
    let session = h.orchestrator.create(three_agent_debate(1)).await.unwrap();
    h.orchestrator.start(&session.id).await.unwrap();
    h.orchestrator.advance_one_turn(&session.id).await.unwrap();

    h.responder.fail_next(1);
    let err = h.orchestrator.advance_one_turn(&session.id).await.unwrap_err();
    assert!(matches!(err, DebateError::DependencyFailure(_)));

    let view = h.orchestrator.get_session(&session.id).await.unwrap();
    assert_eq!(view.session.current_turn_count, 1);
    assert_eq!(view.session.status, DebateStatus::InProgress);
    assert_eq!(h.orchestrator.turns(&session.id).await.unwrap().len(), 1);

    let (retried, _) = h.orchestrator.advance_one_turn(&session.id).await.unwrap();
    assert_eq!(retried.turn_number, 2);
    assert_eq!(speakers(&h, &session.id, &[retried]).await, vec!["agent2"]);
}

#[tokio::test]
async fn test_run_to_completion_resumes_after_failure() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(2)).await.unwrap();
    h.orchestrator.start(&session.id).await.unwrap();
    h.orchestrator.advance_one_turn(&session.id).await.unwrap();

    h.responder.fail_next(1);
    assert!(h.orchestrator.run_to_completion(&session.id).await.is_err());

    let rest = h.orchestrator.run_to_completion(&session.id).await.unwrap();
    let numbers: Vec<u32> = rest.iter().map(|t| t.turn_number).collect();
    assert_eq!(numbers, vec![2, 3, 4]);

    let all = h.orchestrator.turns(&session.id).await.unwrap();
    let numbers: Vec<u32> = all.iter().map(|t| t.turn_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

// ── P5: terminal immutability ───────────────────────────────────────

#[tokio::test]
async fn test_completed_session_rejects_lifecycle_calls() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(1)).await.unwrap();
    h.orchestrator.run_to_completion(&session.id).await.unwrap();

    assert_invalid_state(h.orchestrator.start(&session.id).await);
    assert_invalid_state(h.orchestrator.advance_one_turn(&session.id).await);
    assert_invalid_state(h.orchestrator.run_to_completion(&session.id).await);
    assert_invalid_state(h.orchestrator.cancel(&session.id).await);
    assert!(h.orchestrator.summarize(&session.id).await.is_ok());
}

#[tokio::test]
async fn test_cancelled_session_rejects_lifecycle_calls() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(2)).await.unwrap();
    h.orchestrator.start(&session.id).await.unwrap();
    h.orchestrator.advance_one_turn(&session.id).await.unwrap();
    h.orchestrator.cancel(&session.id).await.unwrap();

    assert_invalid_state(h.orchestrator.start(&session.id).await);
    assert_invalid_state(h.orchestrator.advance_one_turn(&session.id).await);
    assert_invalid_state(h.orchestrator.run_to_completion(&session.id).await);
    assert_invalid_state(h.orchestrator.cancel(&session.id).await);
    assert_invalid_state(h.orchestrator.summarize(&session.id).await);

    // Turns produced before cancellation stay untouched.
    assert_eq!(h.orchestrator.turns(&session.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let h = harness();
    for result in [
        h.orchestrator.start("nope").await.map(|_| ()),
        h.orchestrator.cancel("nope").await.map(|_| ()),
        h.orchestrator.advance_one_turn("nope").await.map(|_| ()),
        h.orchestrator.run_to_completion("nope").await.map(|_| ()),
        h.orchestrator.summarize("nope").await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(DebateError::NotFound(_))));
    }
}

// ── Events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_channel_subscribers_see_progress() {
    let h = harness();
    let mut channel = h.bus.subscribe_filtered(EventFilter::new().channel("architecture"));

    let session = h.orchestrator.create(two_agent_debate(1)).await.unwrap();
    h.orchestrator.run_to_completion(&session.id).await.unwrap();
    h.orchestrator.flush_notifications().await;

    let mut received = Vec::new();
    for _ in 0..4 {
        received.push(channel.recv().await.unwrap());
    }

    let types: Vec<&str> = received.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec!["status_changed", "turn_created", "turn_created", "status_changed"]
    );
    match &received[2] {
        DebateEvent::TurnCreated(e) => {
            assert_eq!(e.turn_number, 2);
            assert_eq!(e.agent_id, "agent2");
            assert!(e.is_complete);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &received[3] {
        DebateEvent::StatusChanged(e) => assert_eq!(e.status, DebateStatus::Completed),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_transition_history_recorded() {
    let h = harness();
    let session = h.orchestrator.create(two_agent_debate(1)).await.unwrap();
    h.orchestrator.run_to_completion(&session.id).await.unwrap();

    let view = h.orchestrator.get_session(&session.id).await.unwrap();
    let path: Vec<(DebateStatus, DebateStatus)> = view
        .session
        .transitions
        .iter()
        .map(|t| (t.from, t.to))
        .collect();
    assert_eq!(
        path,
        vec![
            (DebateStatus::Pending, DebateStatus::InProgress),
            (DebateStatus::InProgress, DebateStatus::Completed),
        ]
    );
    assert!(view.session.status_line().starts_with("[completed] turn 2/2"));
}
