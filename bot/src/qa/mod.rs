//! # docqa-bot Question Answering
//!
//! File: bot/src/qa/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Everything between a user's question and the model's answer:
//! - `document`: loads the JSON document once at startup
//! - `prompt`: embeds the document and the question into one instruction
//! - `completion`: sends the instruction to the completion provider
//!
//! None of these know about conversations or HTTP transports; the
//! conversation handler composes them per turn.
//!

/// One-time JSON document loading.
pub mod document;
/// Prompt construction.
pub mod prompt;
/// Chat-completion client and its error type.
pub mod completion;
