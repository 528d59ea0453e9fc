//! # Bot Connector Client
//!
//! File: bot/src/transport/connector.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Delivers outbound activities to the channel's connector service and obtains
//! the bearer tokens that service requires.
//!
//! ## Architecture
//!
//! - `TokenSource`: OAuth2 client-credentials grant against a login authority,
//!   with the token cached until shortly before it expires
//! - `ConnectorClient`: posts activities to
//!   `{serviceUrl}/v3/conversations/{conversationId}/activities[/{replyToId}]`
//!
//! Without credentials (emulator mode) activities are posted unauthenticated.
//!
use crate::conversation::activity::Activity;
use crate::core::error::BotError;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Login host for Bot Framework token requests.
pub const LOGIN_HOST: &str = "https://login.microsoftonline.com";
/// Tenant used by multi-tenant bots.
pub const BOT_FRAMEWORK_TENANT: &str = "botframework.com";
/// Scope granting access to the Bot Connector API.
pub const CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Client-credentials token provider for one app id.
pub struct TokenSource {
    http: Client,
    token_url: String,
    app_id: String,
    app_password: String,
    cached: RwLock<Option<CachedToken>>,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("token_url", &self.token_url)
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// `authority` is the login base including the tenant, e.g.
    /// `https://login.microsoftonline.com/botframework.com`.
    pub fn new(http: Client, authority: &str, app_id: String, app_password: String) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth2/v2.0/token", authority.trim_end_matches('/')),
            app_id,
            app_password,
            cached: RwLock::new(None),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns a valid access token, requesting a new one when the cached
    /// token is missing or about to expire.
    pub async fn token(&self) -> Result<String, BotError> {
        let now = Utc::now();
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > now {
                return Ok(cached.value.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another turn may have refreshed it while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > now {
                return Ok(cached.value.clone());
            }
        }

        info!("Requesting connector token from {}", self.token_url);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.app_id.as_str()),
            ("client_secret", self.app_password.as_str()),
            ("scope", CONNECTOR_SCOPE),
        ];
        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Token(format!("status {}: {}", status, body.trim())));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BotError::Token(format!("unreadable token response: {}", e)))?;

        let lifetime = token.expires_in.unwrap_or(3600);
        let expires_at = now + Duration::seconds((lifetime - TOKEN_REFRESH_MARGIN_SECS).max(0));
        debug!("Connector token valid until {}", expires_at);

        let value = token.access_token.clone();
        *slot = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });
        Ok(value)
    }
}

/// Posts outbound activities to the connector service.
#[derive(Debug)]
pub struct ConnectorClient {
    http: Client,
    tokens: Option<TokenSource>,
}

impl ConnectorClient {
    pub fn new(http: Client, tokens: Option<TokenSource>) -> Self {
        match &tokens {
            Some(source) => info!("Connector tokens will be requested from {}", source.token_url()),
            None => info!("No app credentials; connector requests are sent unauthenticated"),
        }
        Self { http, tokens }
    }

    #[cfg(test)]
    pub fn tokens(&self) -> Option<&TokenSource> {
        self.tokens.as_ref()
    }

    /// Sends `activities` in order, stopping at the first failure.
    pub async fn send_all(&self, activities: &[Activity]) -> Result<(), BotError> {
        for activity in activities {
            self.send(activity).await?;
        }
        Ok(())
    }

    pub async fn send(&self, activity: &Activity) -> Result<(), BotError> {
        let url = activity_url(activity)?;

        let mut request = self.http.post(url.clone()).json(activity);
        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.token().await?);
        }

        let response = request.send().await.map_err(|e| BotError::Delivery {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Delivery {
                url: url.to_string(),
                reason: format!("status {}", status),
            });
        }
        debug!("Delivered activity to {}", url);
        Ok(())
    }
}

/// `{serviceUrl}/v3/conversations/{conversationId}/activities[/{replyToId}]`,
/// with each segment percent-encoded.
pub fn activity_url(activity: &Activity) -> Result<Url, BotError> {
    let service_url = activity
        .service_url
        .as_deref()
        .ok_or_else(|| BotError::InvalidActivity("activity has no serviceUrl".into()))?;
    let conversation = activity
        .conversation
        .as_ref()
        .ok_or_else(|| BotError::InvalidActivity("activity has no conversation".into()))?;

    let mut url = Url::parse(service_url)
        .map_err(|e| BotError::InvalidActivity(format!("bad serviceUrl '{}': {}", service_url, e)))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| BotError::InvalidActivity(format!("bad serviceUrl '{}'", service_url)))?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation.id.as_str(), "activities"]);
        if let Some(reply_to) = &activity.reply_to_id {
            segments.push(reply_to);
        }
    }
    Ok(url)
}
