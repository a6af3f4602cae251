// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Culler

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Culler operations
pub type Result<T> = std::result::Result<T, CullerError>;

/// Culler error types
///
/// Per-image delete/move failures are not represented here: they are
/// recorded in a [`crate::finalize::FinalizeOutcome`] and logged, and never
/// abort the finalize that produced them.
#[derive(Error, Debug)]
pub enum CullerError {
    /// The review root is missing or unreadable. Fatal at startup.
    #[error("Review root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The classification store could not be written.
    #[error("Failed to persist classification store {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image {image} is not part of user folder {user_id}")]
    NotInFolder { user_id: String, image: String },

    #[error("Unknown classification label: {0}")]
    UnknownLabel(String),

    #[error("Reply does not answer the pending prompt: {0}")]
    UnexpectedReply(String),

    #[error("A prompt is waiting for the reviewer's answer")]
    PromptPending,

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Review task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
