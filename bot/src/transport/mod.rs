//! # docqa-bot Transport Adapters
//!
//! File: bot/src/transport/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! A transport adapter turns one inbound HTTP request into one handled turn:
//! it authenticates the request, parses the activity, runs the conversation
//! handler, saves conversation state, and delivers the replies.
//!
//! ## Architecture
//!
//! - `TransportAdapter`: authentication and delivery, the parts that differ
//!   per credential flow
//! - `cloud::CloudAdapter`: credential-factory flow (app id, password, app type, tenant)
//! - `legacy::LegacyAdapter`: direct app id / password flow
//! - `connector`: token acquisition and the connector REST call both share
//! - `process_activity`: the turn pipeline, identical for every adapter
//!
//! The adapter is chosen by `BotConfig::adapter`; both implementations accept
//! the same traffic and produce the same replies.
//!
use crate::conversation::activity::Activity;
use crate::conversation::turn::TurnContext;
use crate::core::config::{AdapterKind, AppCredentials};
use crate::core::context::AppContext;
use crate::core::error::{BotError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info};

/// Credential-factory adapter.
pub mod cloud;
/// Bot Connector client and token source.
pub mod connector;
/// App id / password adapter.
pub mod legacy;

/// The per-flow half of activity processing.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Checks the inbound `Authorization` header.
    fn authenticate(&self, authorization: Option<&str>) -> std::result::Result<(), BotError>;

    /// Delivers replies to the channel through its connector service.
    async fn send_activities(&self, activities: &[Activity]) -> std::result::Result<(), BotError>;
}

/// What the HTTP layer should answer once a turn has been processed.
#[derive(Debug, PartialEq)]
pub enum TurnOutcome {
    /// Replies (if any) went out through the connector.
    Delivered,
    /// The sender asked for replies in the response body.
    ExpectedReplies(Vec<Activity>),
}

/// # Build Adapter (`build_adapter`)
///
/// Creates the adapter selected by configuration.
///
/// ## Errors
///
/// Returns `BotError::Config` when the credentials cannot be used by the
/// chosen flow (for example a managed identity app type).
pub fn build_adapter(
    kind: AdapterKind,
    credentials: &AppCredentials,
) -> std::result::Result<Box<dyn TransportAdapter>, BotError> {
    let http = Client::builder().build()?;
    let adapter: Box<dyn TransportAdapter> = match kind {
        AdapterKind::Cloud => Box::new(cloud::CloudAdapter::new(http, credentials)?),
        AdapterKind::Legacy => Box::new(legacy::LegacyAdapter::new(http, credentials)),
    };
    info!("Using {} transport adapter", adapter.kind());
    Ok(adapter)
}

/// Shared inbound check: with an app id configured the request must carry a
/// bearer token. Token signature validation is left to the hosting channel.
pub(crate) fn require_bearer(
    credentials_configured: bool,
    authorization: Option<&str>,
) -> std::result::Result<(), BotError> {
    if !credentials_configured {
        return Ok(());
    }
    let header = authorization
        .ok_or_else(|| BotError::Unauthorized("missing Authorization header".into()))?;
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(())
        }
        _ => Err(BotError::Unauthorized(
            "Authorization header is not a bearer token".into(),
        )),
    }
}

/// # Process Activity (`process_activity`)
///
/// Runs one turn end to end:
/// 1. Authenticate the request with the configured adapter.
/// 2. Parse the body as an `Activity`.
/// 3. Load the conversation's state and record the turn.
/// 4. Let the conversation handler queue its replies.
/// 5. Save the conversation state.
/// 6. Deliver the replies, through the connector or in the response body.
///
/// ## Errors
///
/// Returns (wrapped in `anyhow::Error`) `BotError::Unauthorized`,
/// `BotError::InvalidActivity`, or a delivery / token error.
pub async fn process_activity(
    app: &AppContext,
    authorization: Option<&str>,
    body: &[u8],
) -> Result<TurnOutcome> {
    app.adapter.authenticate(authorization)?;

    let activity: Activity = serde_json::from_slice(body)
        .map_err(|e| BotError::InvalidActivity(e.to_string()))?;
    debug!(
        "Inbound '{}' activity {:?} on channel {:?}",
        activity.activity_type, activity.id, activity.channel_id
    );

    let key = activity.conversation_key();
    let mut state = match &key {
        Some(key) => app.conversations.load(key).await,
        None => Default::default(),
    };
    state.record_turn(Utc::now());
    debug!(
        "Conversation {} turn {} (first seen {:?})",
        key.as_deref().unwrap_or("<none>"),
        state.turn_count,
        state.first_turn_at
    );

    let mut turn = TurnContext::new(activity, state);
    app.bot.handle(&mut turn).await;
    let (activity, state, replies) = turn.finish();

    if let Some(key) = &key {
        app.conversations.save(key, state).await;
    }

    if activity.expects_replies() {
        return Ok(TurnOutcome::ExpectedReplies(replies));
    }
    app.adapter.send_activities(&replies).await?;
    Ok(TurnOutcome::Delivered)
}
