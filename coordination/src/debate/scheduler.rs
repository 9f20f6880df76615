//! Round-robin turn scheduler.
//!
//! Pure arithmetic over the participant list and the persisted turn count.
//! Nothing here is stored: whose turn it is gets re-derived on every call, so
//! single-step and batch execution always pick the same participant.

use super::error::{DebateError, DebateResult};
use super::state::Participant;

/// Participant that produces the turn after `current_turn_count`.
///
/// `participants` must be ordered by position.
pub fn next_participant(
    participants: &[Participant],
    current_turn_count: u32,
) -> DebateResult<&Participant> {
    if participants.is_empty() {
        return Err(DebateError::InvalidState("session has no participants".to_string()));
    }
    let idx = current_turn_count as usize % participants.len();
    Ok(&participants[idx])
}

/// Position of the participant that produced 1-based `turn_number`.
pub fn position_for_turn(turn_number: u32, participant_count: u32) -> Option<u32> {
    if turn_number == 0 || participant_count == 0 {
        return None;
    }
    Some((turn_number - 1) % participant_count)
}

/// Whether `current_turn_count` has reached the turn budget.
pub fn is_complete(
    current_turn_count: u32,
    max_turns_per_agent: u32,
    participant_count: u32,
) -> bool {
    current_turn_count >= total_turns(max_turns_per_agent, participant_count)
}

/// Total turns for a session.
pub fn total_turns(max_turns_per_agent: u32, participant_count: u32) -> u32 {
    max_turns_per_agent.saturating_mul(participant_count)
}
