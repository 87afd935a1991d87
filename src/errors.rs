//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants are grouped
//! into an [`ErrorKind`] so the delivery layer can pick a response without matching
//! on every variant.

use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A user-supplied field failed validation.
    #[error("{message}")]
    Validation {
        /// User-facing explanation
        message: String,
    },

    /// A monetary input was missing, non-numeric, zero or negative.
    #[error("{field} must be greater than 0.")]
    InvalidAmount {
        /// Human name of the field, e.g. "Donation amount"
        field: String,
        /// The raw input as received
        input: String,
    },

    /// A monetary input exceeds the largest value its column can hold.
    #[error("{field} is too large (maximum {max}).")]
    AmountTooLarge {
        /// Human name of the field
        field: String,
        /// Largest accepted value
        max: Decimal,
    },

    /// The caller is known but not allowed to perform the action.
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Why the action was refused
        reason: String,
    },

    /// No usable caller identity was supplied.
    #[error("Authentication required")]
    Unauthenticated,

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name, e.g. "Campaign"
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A donation was already approved or rejected.
    #[error("Donation {id} has already been {status}")]
    AlreadyDecided {
        /// Donation id
        id: i64,
        /// Status the donation is in
        status: String,
    },

    /// The group administrator cannot be removed from their group.
    #[error("Cannot remove the group administrator.")]
    CannotRemoveAdmin,

    /// The group administrator cannot leave their group.
    #[error("Group administrators cannot leave their own group.")]
    AdminCannotLeave,

    /// A uniqueness or state invariant would be violated.
    #[error("{message}")]
    Conflict {
        /// User-facing explanation
        message: String,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Details
        message: String,
    },

    /// Password hashing or verification failed internally.
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Details
        message: String,
    },

    /// Database layer failure.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O failure (binding the listener, reading files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or malformed.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Coarse error classification used by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, recovered by re-submitting
    Validation,
    /// Missing identity
    Unauthenticated,
    /// Known caller, action not permitted
    Forbidden,
    /// Unknown record
    NotFound,
    /// State or uniqueness invariant
    Conflict,
    /// Anything the caller cannot fix
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } | Self::AmountTooLarge { .. } => {
                ErrorKind::Validation
            }
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyDecided { .. }
            | Self::CannotRemoveAdmin
            | Self::AdminCannotLeave
            | Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Config { .. }
            | Self::PasswordHash { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
