//! # docqa-bot Conversations
//!
//! File: bot/src/conversation/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The transport-neutral side of a turn:
//! - `activity`: Bot Framework activity types and the `BotEvent` view of them
//! - `turn`: the per-turn context the handler reads from and replies through
//! - `state`: in-memory conversation state, saved after every turn
//! - `handler`: `DocumentQaBot`, which decides what to say
//!

/// Activity wire types.
pub mod activity;
/// The document Q&A handler.
pub mod handler;
/// In-memory conversation state.
pub mod state;
/// Per-turn context.
pub mod turn;
