//! # Conversation Handler
//!
//! File: bot/src/conversation/handler.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `DocumentQaBot` reacts to one turn at a time:
//! - a message is answered from the document through the completion client
//! - newly added members (other than the bot) get a welcome message
//! - every other activity type is ignored
//!
//! The handler never fails. A completion error is logged and the user gets
//! the fixed apology text instead.
//!
use super::activity::BotEvent;
use super::turn::TurnContext;
use crate::qa::completion::CompletionClient;
use crate::qa::document::Document;
use crate::qa::prompt::build_prompt;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const WELCOME_MESSAGE: &str =
    "Welcome! I'm a document Q&A bot powered by GPT-4. Ask me questions about our company.";

pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, I encountered an error while processing your question. Please try again later.";

/// Answers questions about a single document.
pub struct DocumentQaBot {
    document: Document,
    completion: Arc<dyn CompletionClient>,
}

impl DocumentQaBot {
    pub fn new(document: Document, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            document,
            completion,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// # Handle Turn (`handle`)
    ///
    /// Dispatches on the turn's `BotEvent` and queues the replies on `turn`.
    /// At most one reply is queued for a message.
    pub async fn handle(&self, turn: &mut TurnContext) {
        match turn.activity().event() {
            BotEvent::Message { text } => {
                let question = text.to_string();
                self.on_message(turn, &question).await;
            }
            BotEvent::MembersAdded { members, bot_id } => {
                let welcomes = members
                    .iter()
                    .filter(|member| Some(member.id.as_str()) != bot_id)
                    .count();
                for _ in 0..welcomes {
                    turn.send_text(WELCOME_MESSAGE);
                }
            }
            BotEvent::Other { activity_type } => {
                debug!("Ignoring '{}' activity", activity_type);
            }
        }
    }

    async fn on_message(&self, turn: &mut TurnContext, question: &str) {
        if question.trim().is_empty() {
            debug!("Message without text, nothing to answer");
            return;
        }

        info!("Received message: {}", question);
        let answer = self.answer(question).await;
        info!("Sending answer: {}", answer);
        turn.send_text(answer);
    }

    /// Asks the model; any failure becomes `APOLOGY_MESSAGE`.
    pub async fn answer(&self, question: &str) -> String {
        let prompt = build_prompt(question, &self.document);
        match self.completion.complete(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error calling completion provider: {}", e);
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::activity::{
        Activity, ChannelAccount, ConversationAccount, CONVERSATION_UPDATE_TYPE, MESSAGE_TYPE,
    };
    use crate::conversation::state::ConversationState;
    use crate::core::config::CompletionSettings;
    use crate::qa::completion::{CompletionError, OpenAiClient};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    /// Replays a canned outcome and remembers every prompt it saw.
    struct ScriptedCompletion {
        outcome: fn() -> Result<String, CompletionError>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        fn new(outcome: fn() -> Result<String, CompletionError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.outcome)()
        }
    }

    fn acme() -> Document {
        Document::from_value("document.json", json!({ "name": "Acme Corp", "founded": 1999 }))
    }

    fn account(id: &str) -> ChannelAccount {
        ChannelAccount {
            id: id.into(),
            name: None,
        }
    }

    fn message(text: Option<&str>) -> TurnContext {
        let activity = Activity {
            activity_type: MESSAGE_TYPE.into(),
            id: Some("act-1".into()),
            channel_id: Some("emulator".into()),
            conversation: Some(ConversationAccount {
                id: "conv-1".into(),
                ..ConversationAccount::default()
            }),
            from: Some(account("user-1")),
            recipient: Some(account("bot-1")),
            text: text.map(str::to_string),
            ..Activity::default()
        };
        TurnContext::new(activity, ConversationState::default())
    }

    fn members_added(ids: &[&str]) -> TurnContext {
        let activity = Activity {
            activity_type: CONVERSATION_UPDATE_TYPE.into(),
            recipient: Some(account("bot-1")),
            members_added: ids.iter().map(|id| account(id)).collect(),
            ..Activity::default()
        };
        TurnContext::new(activity, ConversationState::default())
    }

    fn reply_texts(turn: &TurnContext) -> Vec<String> {
        turn.responses()
            .iter()
            .filter_map(|a| a.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_message_is_answered_with_completion_text() {
        let completion = ScriptedCompletion::new(|| Ok("Acme Corp was founded in 1999.".into()));
        let bot = DocumentQaBot::new(acme(), completion.clone());
        let mut turn = message(Some("When was Acme founded?"));

        bot.handle(&mut turn).await;

        assert_eq!(reply_texts(&turn), ["Acme Corp was founded in 1999."]);
        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("When was Acme founded?"));
        assert!(prompts[0].contains(bot.document().rendered()));
    }

    #[tokio::test]
    async fn test_every_completion_error_becomes_apology() {
        let failures: [fn() -> Result<String, CompletionError>; 3] = [
            || Err(CompletionError::EmptyResponse),
            || Err(CompletionError::MalformedResponse("eof".into())),
            || {
                Err(CompletionError::Provider {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    message: "rate limited".into(),
                })
            },
        ];

        for failure in failures {
            let bot = DocumentQaBot::new(acme(), ScriptedCompletion::new(failure));
            let mut turn = message(Some("Anything?"));

            bot.handle(&mut turn).await;

            assert_eq!(reply_texts(&turn), [APOLOGY_MESSAGE]);
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_becomes_apology() {
        // Bind then drop to get a port with nothing listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenAiClient::new(CompletionSettings {
            api_key: Some("sk-test".into()),
            base_url: format!("http://{}/v1", addr),
            ..CompletionSettings::default()
        })
        .unwrap();
        assert!(matches!(
            client.complete("hi").await,
            Err(CompletionError::Http(_))
        ));

        let bot = DocumentQaBot::new(acme(), Arc::new(client));
        let mut turn = message(Some("Anything?"));

        bot.handle(&mut turn).await;

        assert_eq!(reply_texts(&turn), [APOLOGY_MESSAGE]);
    }

    #[tokio::test]
    async fn test_answers_use_document_after_file_removal() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("document.json");
        fs::write(&path, r#"{"ceo":"Wile E. Coyote","founded":1999}"#)?;

        let completion = ScriptedCompletion::new(|| Ok("Wile E. Coyote".into()));
        let bot = DocumentQaBot::new(Document::load(&path)?, completion.clone());
        fs::remove_file(&path)?;

        for question in ["Who is the CEO?", "When was it founded?"] {
            let mut turn = message(Some(question));
            bot.handle(&mut turn).await;
            assert_eq!(reply_texts(&turn), ["Wile E. Coyote"]);
        }

        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        for prompt in prompts.iter() {
            assert!(prompt.contains("\"ceo\": \"Wile E. Coyote\""));
            assert!(prompt.contains("\"founded\": 1999"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_message_gets_no_reply() {
        let completion = ScriptedCompletion::new(|| Ok("unused".into()));
        let bot = DocumentQaBot::new(acme(), completion.clone());

        for text in [None, Some(""), Some("   ")] {
            let mut turn = message(text);
            bot.handle(&mut turn).await;
            assert!(turn.responses().is_empty());
        }
        assert!(completion.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bot_joining_is_not_welcomed() {
        let bot = DocumentQaBot::new(acme(), ScriptedCompletion::new(|| Ok(String::new())));
        let mut turn = members_added(&["bot-1"]);

        bot.handle(&mut turn).await;

        assert!(turn.responses().is_empty());
    }

    #[tokio::test]
    async fn test_new_member_is_welcomed_once() {
        let bot = DocumentQaBot::new(acme(), ScriptedCompletion::new(|| Ok(String::new())));
        let mut turn = members_added(&["bot-1", "user-9"]);

        bot.handle(&mut turn).await;

        assert_eq!(reply_texts(&turn), [WELCOME_MESSAGE]);
    }

    #[tokio::test]
    async fn test_other_activities_are_ignored() {
        let completion = ScriptedCompletion::new(|| Ok("unused".into()));
        let bot = DocumentQaBot::new(acme(), completion.clone());
        let mut turn = TurnContext::new(
            Activity {
                activity_type: "typing".into(),
                ..Activity::default()
            },
            ConversationState::default(),
        );

        bot.handle(&mut turn).await;

        assert!(turn.responses().is_empty());
        assert!(completion.prompts.lock().unwrap().is_empty());
    }
}
