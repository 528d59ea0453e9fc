//! # Cloud Adapter
//!
//! File: bot/src/transport/cloud.rs
//! Author: Christi Mahu
//!
//! Adapter for the credential-factory flow. The token authority depends on the
//! app type: single-tenant apps authenticate against their own tenant, multi-
//! tenant apps against the shared Bot Framework tenant. Managed identities are
//! not supported.
//!
use super::connector::{ConnectorClient, TokenSource, BOT_FRAMEWORK_TENANT, LOGIN_HOST};
use super::{require_bearer, TransportAdapter};
use crate::conversation::activity::Activity;
use crate::core::config::{AdapterKind, AppCredentials, AppType};
use crate::core::error::BotError;
use async_trait::async_trait;
use reqwest::Client;

pub struct CloudAdapter {
    authenticated: bool,
    connector: ConnectorClient,
}

impl CloudAdapter {
    pub fn new(http: Client, credentials: &AppCredentials) -> Result<Self, BotError> {
        let tenant = match credentials.app_type {
            AppType::MultiTenant => BOT_FRAMEWORK_TENANT,
            AppType::SingleTenant => credentials.tenant_id.as_deref().ok_or_else(|| {
                BotError::Config("SingleTenant app type requires MicrosoftAppTenantId".into())
            })?,
            AppType::UserAssignedMsi => {
                return Err(BotError::Config(
                    "UserAssignedMSI app type is not supported".into(),
                ))
            }
        };

        let tokens = match (&credentials.app_id, &credentials.app_password) {
            (Some(id), Some(password)) if credentials.is_configured() => Some(TokenSource::new(
                http.clone(),
                &format!("{}/{}", LOGIN_HOST, tenant),
                id.clone(),
                password.clone(),
            )),
            _ => None,
        };

        Ok(Self {
            authenticated: credentials.is_configured(),
            connector: ConnectorClient::new(http, tokens),
        })
    }

    #[cfg(test)]
    pub fn connector(&self) -> &ConnectorClient {
        &self.connector
    }
}

#[async_trait]
impl TransportAdapter for CloudAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Cloud
    }

    fn authenticate(&self, authorization: Option<&str>) -> Result<(), BotError> {
        require_bearer(self.authenticated, authorization)
    }

    async fn send_activities(&self, activities: &[Activity]) -> Result<(), BotError> {
        self.connector.send_all(activities).await
    }
}
