//! Account error types for `rockpool-account`.

use thiserror::Error;

/// Storage collaborator failure — the key/value store could not be read or
/// written.
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StorageError(String);

impl StorageError {
    /// Wrap a backend-specific failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Coarse classification of account errors, for hosts picking a user-facing
/// message. Every kind is recoverable; the caller decides whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input (PIN shape, password length, empty name) or a missing
    /// precondition. No state was changed.
    Validation,
    /// Wrong PIN, session password, or file password. Deliberately generic:
    /// a wrong file password and a corrupted file are indistinguishable.
    Authentication,
    /// Unrecognized or foreign file contents. No state was changed.
    Format,
    /// Key/value store failure. Never silently retried.
    Storage,
}

/// Errors produced by account lifecycle and migration operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Input failed validation before any state change.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No account record exists yet.
    #[error("no account found")]
    NoAccount,

    /// PIN verification failed. No state was mutated.
    #[error("invalid PIN")]
    InvalidPin,

    /// Session password verification failed — export refused.
    #[error("invalid session password")]
    InvalidSessionPassword,

    /// Decryption produced nothing: wrong file password or corrupted file.
    #[error("wrong password or corrupted file")]
    WrongFilePassword,

    /// The decrypted bundle does not carry this application's marker.
    #[error("file does not belong to this application")]
    ForeignFile,

    /// Malformed outer envelope, bundle payload, or stored record.
    #[error("unrecognized file: {0}")]
    Format(String),

    /// A record failed to serialize — indicates a bug, surfaced rather than
    /// panicked.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Storage collaborator failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccountError {
    /// Classify this error for user-facing messaging.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::NoAccount => ErrorKind::Validation,
            Self::InvalidPin | Self::InvalidSessionPassword | Self::WrongFilePassword => {
                ErrorKind::Authentication
            }
            Self::ForeignFile | Self::Format(_) | Self::Serialization(_) => ErrorKind::Format,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}
