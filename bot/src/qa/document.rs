//! # Document Loader
//!
//! File: bot/src/qa/document.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Loads the JSON document the bot answers questions about. The file is read
//! and parsed exactly once, at startup; its pretty-printed rendering lives in
//! the application context for the rest of the process.
//!
//! The document is treated as an opaque blob: any valid JSON value is accepted
//! and nothing about its shape is checked.
//!
use crate::core::error::BotError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An immutable, already-parsed JSON document.
#[derive(Debug, Clone)]
pub struct Document {
    source: PathBuf,
    rendered: String,
}

impl Document {
    /// # Load Document (`load`)
    ///
    /// Reads `path` and parses it as JSON.
    ///
    /// ## Errors
    ///
    /// * `BotError::DocumentRead` if the file is missing or unreadable.
    /// * `BotError::DocumentParse` if the contents are not valid JSON.
    pub fn load(path: &Path) -> Result<Self, BotError> {
        info!("Loading document from {}", path.display());

        let raw = fs::read_to_string(path).map_err(|source| BotError::DocumentRead {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| BotError::DocumentParse {
            path: path.to_path_buf(),
            source,
        })?;

        let document = Self::from_value(path, value);
        debug!(
            "Document loaded: {} bytes rendered",
            document.rendered.len()
        );
        Ok(document)
    }

    /// Wraps an in-memory value, e.g. for tests or embedded documents.
    pub fn from_value(source: impl Into<PathBuf>, value: Value) -> Self {
        // Serializing a `Value` cannot fail: its map keys are always strings.
        let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            source: source.into(),
            rendered,
        }
    }

    /// The file the document was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}
