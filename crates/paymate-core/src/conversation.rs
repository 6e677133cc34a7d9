//! Append-only conversation transcript for a session
//!
//! The transcript is the single source of truth the reasoning engine sees:
//! user turns, reasoning notes, action calls, and their observations, in
//! the exact order they happened. Turns are immutable once appended and
//! never reordered or deleted. Rendering for the reasoning engine is a pure
//! function of the transcript, so replaying it twice without intervening
//! appends yields an identical view.

use serde_json::Value;

use crate::core_types::{ActionResult, FunctionCallRequest, Message, Role, Turn};

#[derive(Debug, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Appending is the only mutation this type offers.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop the whole transcript. Used when a session is reset, never
    /// during a request.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of action calls made for the current request, i.e. since the
    /// most recent user turn. The loop controller checks this against the
    /// call budget.
    pub fn count_action_calls(&self) -> u32 {
        let start = self
            .turns
            .iter()
            .rposition(|t| matches!(t, Turn::UserMessage(_)))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.turns[start..]
            .iter()
            .filter(|t| matches!(t, Turn::ActionCall { .. }))
            .count() as u32
    }

    /// Index for the next action call of the current request, starting at 1.
    pub fn next_call_index(&self) -> u32 {
        self.count_action_calls() + 1
    }

    /// Render the transcript in the message shape the reasoning engine
    /// consumes. A reasoning note immediately followed by its action call
    /// collapses into one assistant message carrying both the note and the
    /// call, matching the wire format function-calling engines expect.
    pub fn render_for_reasoning(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len());
        let mut i = 0;
        while i < self.turns.len() {
            match &self.turns[i] {
                Turn::UserMessage(text) => messages.push(Message::user(text.clone())),
                Turn::ReasoningNote(note) => {
                    if let Some(Turn::ActionCall {
                        name,
                        arguments,
                        call_index,
                    }) = self.turns.get(i + 1)
                    {
                        messages.push(assistant_call(
                            note.clone(),
                            name,
                            arguments,
                            *call_index,
                        ));
                        i += 2;
                        continue;
                    }
                    messages.push(Message::assistant(note.clone()));
                }
                Turn::ActionCall {
                    name,
                    arguments,
                    call_index,
                } => messages.push(assistant_call(String::new(), name, arguments, *call_index)),
                Turn::Observation {
                    result, call_index, ..
                } => messages.push(tool_result(result, *call_index)),
                Turn::FinalAnswer(text) => messages.push(Message::assistant(text.clone())),
            }
            i += 1;
        }
        messages
    }
}

fn call_id(call_index: u32) -> String {
    format!("call_{}", call_index)
}

fn assistant_call(content: String, name: &str, arguments: &Value, call_index: u32) -> Message {
    Message {
        role: Role::Assistant,
        content,
        tool_call_id: None,
        function_call: Some(FunctionCallRequest {
            id: Some(call_id(call_index)),
            name: name.to_string(),
            arguments: arguments.clone(),
        }),
    }
}

fn tool_result(result: &ActionResult, call_index: u32) -> Message {
    Message {
        role: Role::Tool,
        content: serde_json::to_string(result).unwrap_or_default(),
        tool_call_id: Some(call_id(call_index)),
        function_call: None,
    }
}
