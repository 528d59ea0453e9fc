//! # Legacy Adapter
//!
//! File: bot/src/transport/legacy.rs
//! Author: Christi Mahu
//!
//! Adapter for the direct app id / password flow. Tokens always come from the
//! shared Bot Framework tenant; app type and tenant id are ignored.
//!
use super::connector::{ConnectorClient, TokenSource, BOT_FRAMEWORK_TENANT, LOGIN_HOST};
use super::{require_bearer, TransportAdapter};
use crate::conversation::activity::Activity;
use crate::core::config::{AdapterKind, AppCredentials, AppType};
use crate::core::error::BotError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

pub struct LegacyAdapter {
    authenticated: bool,
    connector: ConnectorClient,
}

impl LegacyAdapter {
    pub fn new(http: Client, credentials: &AppCredentials) -> Self {
        if credentials.app_type != AppType::MultiTenant || credentials.tenant_id.is_some() {
            warn!("Legacy adapter ignores MicrosoftAppType and MicrosoftAppTenantId");
        }

        let tokens = match (&credentials.app_id, &credentials.app_password) {
            (Some(id), Some(password)) if credentials.is_configured() => Some(TokenSource::new(
                http.clone(),
                &format!("{}/{}", LOGIN_HOST, BOT_FRAMEWORK_TENANT),
                id.clone(),
                password.clone(),
            )),
            _ => None,
        };

        Self {
            authenticated: credentials.is_configured(),
            connector: ConnectorClient::new(http, tokens),
        }
    }

    #[cfg(test)]
    pub fn connector(&self) -> &ConnectorClient {
        &self.connector
    }
}

#[async_trait]
impl TransportAdapter for LegacyAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Legacy
    }

    fn authenticate(&self, authorization: Option<&str>) -> Result<(), BotError> {
        require_bearer(self.authenticated, authorization)
    }

    async fn send_activities(&self, activities: &[Activity]) -> Result<(), BotError> {
        self.connector.send_all(activities).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_is_always_bot_framework() {
        let credentials = AppCredentials {
            app_id: Some("app-id".into()),
            app_password: Some("secret".into()),
            app_type: AppType::SingleTenant,
            tenant_id: Some("contoso.onmicrosoft.com".into()),
        };
        let adapter = LegacyAdapter::new(Client::new(), &credentials);
        assert_eq!(
            adapter.connector().tokens().unwrap().token_url(),
            "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_app_id_without_password_sends_unauthenticated() {
        let credentials = AppCredentials {
            app_id: Some("app-id".into()),
            ..AppCredentials::default()
        };
        let adapter = LegacyAdapter::new(Client::new(), &credentials);
        assert!(adapter.connector().tokens().is_none());
        // Inbound traffic is still checked because an app id is set.
        assert!(adapter.authenticate(None).is_err());
    }
}
