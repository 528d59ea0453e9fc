//! # docqa-bot Integration Test Common Helpers
//!
//! File: bot/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration tests under `bot/tests/`. Each other
//! `.rs` file in this directory is compiled as its own test crate and runs
//! the compiled `docqa-bot` binary.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;

/// Environment variables the binary reads. Cleared so the developer's shell
/// cannot change test outcomes.
const BOT_ENV_VARS: &[&str] = &[
    "PORT",
    "port",
    "BOT_ADAPTER",
    "MicrosoftAppId",
    "MicrosoftAppPassword",
    "MicrosoftAppType",
    "MicrosoftAppTenantId",
    "OPENAI_API_KEY",
    "RUST_LOG",
];

/// # Get docqa-bot Command (`bot_cmd`)
///
/// An `assert_cmd::Command` for the compiled `docqa-bot` binary with the
/// bot's environment variables removed.
///
/// ## Panics
/// Panics if the binary cannot be found via `Command::cargo_bin`.
pub fn bot_cmd() -> Command {
    let mut cmd =
        Command::cargo_bin("docqa-bot").expect("Failed to find docqa-bot binary for testing");
    for var in BOT_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}
