// src/error.rs

use thiserror::Error;

/// Core error types for rpmstage
///
/// Variants map onto the taxonomy the staging layer reports to its caller:
/// policy and engine rejections, a missing installed-package record, and a
/// database that needs recovery before any transaction can proceed.
#[derive(Error, Debug)]
pub enum Error {
    /// Policy rejection or engine-reported registration failure
    #[error("{0}")]
    Internal(String),

    /// Installed package record missing from the database
    #[error("failed to find package {0}")]
    PackageNotFound(String),

    /// The installed-package database could not be opened for iteration
    #[error("{0}")]
    UnfinishedTransaction(String),

    /// Malformed or unreadable package payload
    #[error("{0}")]
    PackageRead(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using rpmstage's Error type
pub type Result<T> = std::result::Result<T, Error>;
