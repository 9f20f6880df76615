//! Prompt templates for debate turns and the closing synthesis.

use super::responder::HistoryEntry;
use super::state::{Participant, Turn};

/// Inputs for a single turn prompt.
#[derive(Debug, Clone)]
pub struct TurnPrompt<'a> {
    pub task: &'a str,
    pub participant: &'a Participant,
    /// 1-based number of the turn being produced.
    pub turn_number: u32,
    pub total_turns: u32,
    pub participant_count: u32,
}

impl TurnPrompt<'_> {
    /// Render the role-scoped instruction handed to the responder.
    pub fn render(&self) -> String {
        let role_line = match self.participant.role.as_deref() {
            Some(role) => format!("You are taking part in a structured debate as the {role}."),
            None => "You are taking part in a structured debate.".to_string(),
        };
        let round = (self.turn_number - 1) / self.participant_count.max(1) + 1;
        let rounds = self.total_turns / self.participant_count.max(1);

        let stage = if self.turn_number == 1 {
            "Open the debate: state your position on the topic and your strongest argument."
        } else if self.turn_number == self.total_turns {
            "This is the final turn of the debate: respond to the latest points and give your closing statement."
        } else {
            "Respond directly to the previous speakers, then advance your own position."
        };

        format!(
            "{role_line}\n\n## Topic\n\n{task}\n\n## Position\n\nTurn {turn} of {total} (round {round} of {rounds}).\n\n{stage}\nKeep it concise and stay in character.",
            task = self.task,
            turn = self.turn_number,
            total = self.total_turns,
        )
    }
}

/// Convert stored turns into responder history, oldest first.
pub fn history_entries(turns: &[Turn], participants: &[Participant]) -> Vec<HistoryEntry> {
    turns
        .iter()
        .map(|turn| HistoryEntry {
            speaker: speaker_label(turn, participants),
            text: turn.content.clone(),
        })
        .collect()
}

/// Full transcript in turn-number order, one block per turn.
pub fn transcript(turns: &[Turn], participants: &[Participant]) -> String {
    let mut ordered: Vec<&Turn> = turns.iter().collect();
    ordered.sort_by_key(|t| t.turn_number);
    ordered
        .iter()
        .map(|t| {
            format!(
                "[{}] {}: {}",
                t.turn_number,
                speaker_label(t, participants),
                t.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Instruction for the closing synthesis.
pub fn synthesis_prompt(title: &str, task: &str, transcript: &str) -> String {
    format!(
        "Summarize the following debate titled \"{title}\".\n\n## Topic\n\n{task}\n\n## Transcript\n\n{transcript}\n\n## Instructions\n\nIdentify each side's main arguments, where they agreed, where they still disagree, and give a balanced conclusion."
    )
}

fn speaker_label(turn: &Turn, participants: &[Participant]) -> String {
    participants
        .iter()
        .find(|p| p.id == turn.participant_id)
        .map(Participant::label)
        .unwrap_or_else(|| "unknown".to_string())
}
