//! Error types.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::order::{OrderKind, OrderStatus, TransactionId};

/// Errors surfaced by the order-flow engine and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or TLS failure reaching the provider. No order state changes.
    #[error("failed to reach provider: {0}")]
    Transport(String),
    /// The provider responded with a non-success status.
    ///
    /// Fatal for the current call only; an existing pending order is left
    /// untouched and may be checked again.
    #[error("provider error {code} (http {status})")]
    Api {
        /// Typed provider error code.
        code: ApiErrorCode,
        /// HTTP status the provider responded with.
        status: u16,
        /// Human-readable details from the provider, when present.
        details: Option<String>,
    },
    /// The requested action name is not registered. Initiation fails before
    /// any provider contact.
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// Two actions were registered under the same name for the same kind.
    #[error("an action for {kind} is already registered under `{name}`")]
    DuplicateAction {
        /// Order kind of the colliding registration.
        kind: OrderKind,
        /// Name both actions declared.
        name: String,
    },
    /// Unknown or expired transaction id.
    #[error("order `{0}` not found")]
    OrderNotFound(TransactionId),
    /// `cancel` was requested for an order that already reached a terminal
    /// state. Cancellation cannot rewind history.
    #[error("order `{transaction_id}` is already {status}")]
    AlreadyTerminal {
        /// The addressed order.
        transaction_id: TransactionId,
        /// Its terminal status.
        status: OrderStatus,
    },
    /// An action's `initialize` hook rejected the order. No order is created.
    #[error("{detail}")]
    InitializeFailed {
        /// Human-readable rejection reason.
        detail: String,
    },
    /// An action hook failed for a reason other than a rejection. During
    /// `check` the order stays pending so finalize can be retried.
    #[error(transparent)]
    Action(#[from] anyhow::Error),
    /// Base64-encoded user data exceeds the provider's size limit.
    #[error("user {purpose} data too large ({len} bytes encoded)")]
    UserDataTooLarge {
        /// Which payload field overflowed.
        purpose: &'static str,
        /// Encoded length that was rejected.
        len: usize,
    },
    /// Requirement carried a malformed personal number.
    #[error("invalid personal number: {0}")]
    InvalidPersonalNumber(String),
    /// The order store failed.
    #[error("storage failure: {0}")]
    Storage(String),
    /// Serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Error codes the provider reports in non-success response bodies.
///
/// Codes outside the documented set deserialize to [`ApiErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiErrorCode {
    AlreadyInProgress,
    InvalidParameters,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    UnsupportedMediaType,
    InternalError,
    Maintenance,
    #[serde(other)]
    Unknown,
}

impl ApiErrorCode {
    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyInProgress => "alreadyInProgress",
            Self::InvalidParameters => "invalidParameters",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "notFound",
            Self::MethodNotAllowed => "methodNotAllowed",
            Self::RequestTimeout => "requestTimeout",
            Self::UnsupportedMediaType => "unsupportedMediaType",
            Self::InternalError => "internalError",
            Self::Maintenance => "maintenance",
            Self::Unknown => "unknownError",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
