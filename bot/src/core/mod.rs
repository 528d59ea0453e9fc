//! # docqa-bot Core Infrastructure
//!
//! File: bot/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Foundational pieces shared by the rest of the service:
//! - `config`: argument, environment and file configuration
//! - `error`: error types and the `Result` alias
//! - `context`: the application context built once at startup
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{BotError, Result}; // For error handling
//! use crate::core::context::AppContext; // Shared per-request state
//! ```
//!
pub mod config;
pub mod context;
pub mod error;
