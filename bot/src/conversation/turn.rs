//! # Turn Context
//!
//! File: bot/src/conversation/turn.rs
//! Author: Christi Mahu
//!
//! The per-turn view handed to the conversation handler: the inbound
//! activity, the conversation's state, and the outbound activities queued so
//! far. The transport adapter delivers the queue once the handler returns.
//!
use super::activity::Activity;
use super::state::ConversationState;

#[derive(Debug)]
pub struct TurnContext {
    activity: Activity,
    pub state: ConversationState,
    responses: Vec<Activity>,
}

impl TurnContext {
    pub fn new(activity: Activity, state: ConversationState) -> Self {
        Self {
            activity,
            state,
            responses: Vec::new(),
        }
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Queues a text message back to the sender of the inbound activity.
    pub fn send_text(&mut self, text: impl Into<String>) {
        let reply = self.activity.reply_text(text);
        self.responses.push(reply);
    }

    #[cfg(test)]
    pub fn responses(&self) -> &[Activity] {
        &self.responses
    }

    /// Splits the context into the state to persist and the activities to deliver.
    pub fn finish(self) -> (Activity, ConversationState, Vec<Activity>) {
        (self.activity, self.state, self.responses)
    }
}
