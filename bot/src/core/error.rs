//! # docqa-bot Error Types
//!
//! File: bot/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types used across the bot service. The
//! layout mirrors the rest of the code base:
//! - `BotError`: a `thiserror` enum naming the failures callers branch on
//!   (startup configuration, document loading, authentication, delivery)
//! - `Result<T>`: an alias for `anyhow::Result<T>` so errors can carry context
//!
//! Completion provider failures have their own enum
//! (`crate::qa::completion::CompletionError`) because the conversation handler
//! turns them into user-facing text instead of propagating them.
//!
//! ## Examples
//!
//! ```rust
//! // Map a transport failure to an HTTP status code
//! match err.downcast_ref::<BotError>() {
//!     Some(BotError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
//!     Some(BotError::InvalidActivity(_)) => StatusCode::BAD_REQUEST,
//!     _ => StatusCode::INTERNAL_SERVER_ERROR,
//! }
//! ```
//!
use std::path::PathBuf;
use thiserror::Error;

/// Custom error type for the bot service.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read document '{}': {source}", path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document '{}' is not valid JSON: {source}", path.display())]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unauthorized request: {0}")]
    Unauthorized(String),

    #[error("Invalid activity: {0}")]
    InvalidActivity(String),

    #[error("Failed to acquire connector token: {0}")]
    Token(String),

    #[error("Failed to deliver activity to {url}: {reason}")]
    Delivery { url: String, reason: String },

    #[error("HTTP client error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
