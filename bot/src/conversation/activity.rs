//! # Activities
//!
//! File: bot/src/conversation/activity.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Wire types for the Bot Framework activity protocol, limited to the fields
//! this bot reads or writes. Unknown fields in inbound JSON are ignored.
//!
//! `BotEvent` is the tagged view the conversation handler dispatches on; it is
//! derived from an inbound `Activity` with `Activity::event`.
//!
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MESSAGE_TYPE: &str = "message";
pub const CONVERSATION_UPDATE_TYPE: &str = "conversationUpdate";
pub const EXPECT_REPLIES: &str = "expectReplies";

/// A user, bot or channel participant.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The conversation an activity belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

/// A single inbound or outbound conversational event.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// What an inbound activity means to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent<'a> {
    /// A user message. `text` is empty when the activity carried none.
    Message { text: &'a str },
    /// Participants joined. `bot_id` is the activity's recipient, i.e. the bot itself.
    MembersAdded {
        members: &'a [ChannelAccount],
        bot_id: Option<&'a str>,
    },
    /// Anything else (typing, reactions, end of conversation, ...).
    Other { activity_type: &'a str },
}

impl Activity {
    /// Classifies this activity for the conversation handler.
    pub fn event(&self) -> BotEvent<'_> {
        match self.activity_type.as_str() {
            MESSAGE_TYPE => BotEvent::Message {
                text: self.text.as_deref().unwrap_or_default(),
            },
            CONVERSATION_UPDATE_TYPE if !self.members_added.is_empty() => BotEvent::MembersAdded {
                members: &self.members_added,
                bot_id: self.recipient.as_ref().map(|r| r.id.as_str()),
            },
            other => BotEvent::Other {
                activity_type: other,
            },
        }
    }

    /// Builds a text message addressed back to this activity's sender, in the
    /// same conversation and channel.
    pub fn reply_text(&self, text: impl Into<String>) -> Activity {
        Activity {
            activity_type: MESSAGE_TYPE.to_string(),
            id: None,
            timestamp: Some(Utc::now()),
            service_url: self.service_url.clone(),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            conversation: self.conversation.clone(),
            recipient: self.from.clone(),
            text: Some(text.into()),
            members_added: Vec::new(),
            reply_to_id: self.id.clone(),
            delivery_mode: None,
            locale: self.locale.clone(),
        }
    }

    /// Storage key for this activity's conversation state:
    /// `{channelId}/conversations/{conversationId}`.
    pub fn conversation_key(&self) -> Option<String> {
        let channel = self.channel_id.as_deref()?;
        let conversation = self.conversation.as_ref()?;
        Some(format!("{}/conversations/{}", channel, conversation.id))
    }

    /// True when the sender wants replies in the HTTP response body instead of
    /// through the connector.
    pub fn expects_replies(&self) -> bool {
        self.delivery_mode.as_deref() == Some(EXPECT_REPLIES)
    }
}
