//! # Application Context
//!
//! File: bot/src/core/context.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `AppContext` owns everything a turn needs: the conversation handler (with
//! the loaded document and completion client), the transport adapter, and the
//! conversation state store. It is built once at startup, shared with request
//! handlers behind an `Arc`, and dropped when the server shuts down.
//!
//! ## Examples
//!
//! ```rust
//! let config = config::load_and_merge_config(args)?;
//! let app = Arc::new(AppContext::from_config(&config)?);
//! server::run_server(&config, app).await?;
//! ```
//!
use crate::conversation::handler::DocumentQaBot;
use crate::conversation::state::ConversationStateStore;
use crate::core::config::BotConfig;
use crate::core::error::Result;
use crate::qa::completion::{CompletionClient, OpenAiClient};
use crate::qa::document::Document;
use crate::transport::{self, TransportAdapter};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    pub bot: DocumentQaBot,
    pub adapter: Box<dyn TransportAdapter>,
    pub conversations: ConversationStateStore,
}

impl AppContext {
    pub fn new(bot: DocumentQaBot, adapter: Box<dyn TransportAdapter>) -> Self {
        Self {
            bot,
            adapter,
            conversations: ConversationStateStore::new(),
        }
    }

    /// # Build From Configuration (`from_config`)
    ///
    /// Loads the document, creates the completion client and the configured
    /// transport adapter.
    ///
    /// ## Errors
    ///
    /// Fails if the document is missing or not JSON, or if the completion
    /// client or adapter cannot be created. Any of these is fatal at startup.
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let document = Document::load(&config.document)?;
        let completion: Arc<dyn CompletionClient> = Arc::new(
            OpenAiClient::new(config.completion.clone())
                .context("Failed to create completion client")?,
        );
        let adapter = transport::build_adapter(config.adapter, &config.credentials)
            .context("Failed to create transport adapter")?;

        let bot = DocumentQaBot::new(document, completion);
        info!(
            "Application context ready: document {} ({} bytes), model {}, {} adapter",
            bot.document().source().display(),
            bot.document().rendered().len(),
            config.completion.model,
            adapter.kind()
        );
        Ok(Self::new(bot, adapter))
    }
}
