//! Order lifecycle types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable caller-facing handle for one order.
///
/// Generated by this system at initiation, independent of the provider's own
/// order reference, and used as the primary key into the order store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a fresh transaction id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The two kinds of order the provider issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Auth,
    Sign,
}

impl OrderKind {
    /// Lowercase wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Sign => "sign",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an order.
///
/// Transitions are monotonic and one-directional: `pending` moves to exactly
/// one of the terminal states and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Complete,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Whether the status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lowercase wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hint codes the provider reports while an order is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingHint {
    OutstandingTransaction,
    NoClient,
    Started,
    UserMrtd,
    UserCallConfirm,
    UserSign,
    #[serde(other)]
    Unknown,
}

impl PendingHint {
    /// Parse a wire code, mapping unrecognized codes to [`Self::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "outstandingTransaction" => Self::OutstandingTransaction,
            "noClient" => Self::NoClient,
            "started" => Self::Started,
            "userMrtd" => Self::UserMrtd,
            "userCallConfirm" => Self::UserCallConfirm,
            "userSign" => Self::UserSign,
            _ => Self::Unknown,
        }
    }

    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutstandingTransaction => "outstandingTransaction",
            Self::NoClient => "noClient",
            Self::Started => "started",
            Self::UserMrtd => "userMrtd",
            Self::UserCallConfirm => "userCallConfirm",
            Self::UserSign => "userSign",
            Self::Unknown => "unknown",
        }
    }
}

/// Hint codes the provider reports for failed orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailedHint {
    ExpiredTransaction,
    CertificateErr,
    UserCancel,
    Cancelled,
    StartFailed,
    UserDeclinedCall,
    #[serde(other)]
    Unknown,
}

impl FailedHint {
    /// Parse a wire code, mapping unrecognized codes to [`Self::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "expiredTransaction" => Self::ExpiredTransaction,
            "certificateErr" => Self::CertificateErr,
            "userCancel" => Self::UserCancel,
            "cancelled" => Self::Cancelled,
            "startFailed" => Self::StartFailed,
            "userDeclinedCall" => Self::UserDeclinedCall,
            _ => Self::Unknown,
        }
    }

    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpiredTransaction => "expiredTransaction",
            Self::CertificateErr => "certificateErr",
            Self::UserCancel => "userCancel",
            Self::Cancelled => "cancelled",
            Self::StartFailed => "startFailed",
            Self::UserDeclinedCall => "userDeclinedCall",
            Self::Unknown => "unknown",
        }
    }
}

/// The identified end user of a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedUser {
    pub personal_number: String,
    pub name: String,
    pub given_name: String,
    pub surname: String,
}

/// The device the order was completed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedDevice {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uhi: Option<String>,
}

/// Step-up information, present when the order required an identity document
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUp {
    pub mrtd: bool,
}

/// Provider-supplied data for a completed order, in provider wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    pub user: CompletedUser,
    pub device: CompletedDevice,
    pub bank_id_issue_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_up: Option<StepUp>,
    pub signature: String,
    pub ocsp_response: String,
}

/// The unit of lifecycle state, persisted in the order store under its
/// transaction id.
///
/// Created at initiation with `status=pending`; mutated only by the engine's
/// `check` (terminal transition or QR refresh) and `cancel`; removed by TTL
/// expiry. Once a terminal status is persisted the completion fields are
/// never written again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub transaction_id: TransactionId,
    /// Provider-internal reference used for collect/cancel calls.
    pub order_ref: String,
    pub kind: OrderKind,
    /// Name of the registered action governing this order.
    pub action_name: String,
    pub status: OrderStatus,
    /// Provider-supplied reason code, set only while pending or on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_code: Option<String>,
    pub auto_start_token: String,
    pub qr_start_token: String,
    pub qr_start_secret: String,
    /// Unix timestamp fixed at initiation; input to QR derivation.
    pub started_at: u64,
    /// Most recently derived QR challenge, refreshed on every pending check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
    /// Opaque caller context returned by `initialize`, handed unchanged to
    /// `finalize`. Never inspected by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_data: Option<CompletionData>,
    /// Whatever the action's `finalize` hook returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize_data: Option<Value>,
    /// Rejection detail when `finalize` failed the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
