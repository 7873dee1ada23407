//! Provider transport contract and wire shapes.
//!
//! The engine talks to the identity provider exclusively through the
//! [`Transport`] trait; [`HttpTransport`] is the production implementation.
//! Wire shapes follow the provider's v6.0 API (camelCase JSON).

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::action::{UserAuthData, UserSignData, VisibleDataFormat};
use crate::error::Error;
use crate::order::{CompletionData, FailedHint, OrderKind, PendingHint};
use crate::requirement::Requirement;

// Encoded-size limits from the provider API documentation.
const AUTH_USER_DATA_MAX: usize = 1_500;
const SIGN_VISIBLE_MAX: usize = 40_000;
const SIGN_NON_VISIBLE_MAX: usize = 200_000;

/// Operations the engine requires against the provider API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start a new auth or sign order.
    async fn initiate(
        &self,
        kind: OrderKind,
        payload: &InitiatePayload,
    ) -> Result<OrderResponse, Error>;

    /// Report current order status.
    async fn collect(&self, order_ref: &str) -> Result<CollectResponse, Error>;

    /// Cancel an in-progress order.
    async fn cancel(&self, order_ref: &str) -> Result<(), Error>;
}

/// Initiation request body, provider wire shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePayload {
    pub end_user_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<Requirement>,
    /// Base64-encoded user-visible text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_visible_data: Option<String>,
    /// Base64-encoded non-visible text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_non_visible_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_visible_data_format: Option<VisibleDataFormat>,
}

impl InitiatePayload {
    /// Build an auth initiation payload, encoding and size-checking the user
    /// data fields.
    pub fn auth(
        end_user_ip: &str,
        requirement: Option<Requirement>,
        data: &UserAuthData,
    ) -> Result<Self, Error> {
        Ok(Self {
            end_user_ip: end_user_ip.to_owned(),
            requirement: prepare_requirement(requirement)?,
            user_visible_data: encode_user_data(
                data.visible.as_deref(),
                AUTH_USER_DATA_MAX,
                "visible",
            )?,
            user_non_visible_data: encode_user_data(
                data.non_visible.as_deref(),
                AUTH_USER_DATA_MAX,
                "non visible",
            )?,
            user_visible_data_format: data.visible_format,
        })
    }

    /// Build a sign initiation payload. The visible text is mandatory and
    /// allows a larger size than auth orders.
    pub fn sign(
        end_user_ip: &str,
        requirement: Option<Requirement>,
        data: &UserSignData,
    ) -> Result<Self, Error> {
        let visible = BASE64.encode(data.visible.as_bytes());
        if visible.len() > SIGN_VISIBLE_MAX {
            return Err(Error::UserDataTooLarge {
                purpose: "visible",
                len: visible.len(),
            });
        }
        Ok(Self {
            end_user_ip: end_user_ip.to_owned(),
            requirement: prepare_requirement(requirement)?,
            user_visible_data: Some(visible),
            user_non_visible_data: encode_user_data(
                data.non_visible.as_deref(),
                SIGN_NON_VISIBLE_MAX,
                "non visible",
            )?,
            user_visible_data_format: data.visible_format,
        })
    }
}

fn encode_user_data(
    value: Option<&str>,
    max: usize,
    purpose: &'static str,
) -> Result<Option<String>, Error> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let encoded = BASE64.encode(value.as_bytes());
    if encoded.len() > max {
        return Err(Error::UserDataTooLarge {
            purpose,
            len: encoded.len(),
        });
    }
    Ok(Some(encoded))
}

fn prepare_requirement(requirement: Option<Requirement>) -> Result<Option<Requirement>, Error> {
    match requirement {
        Some(requirement) => {
            requirement.validate()?;
            Ok((!requirement.is_empty()).then_some(requirement))
        }
        None => Ok(None),
    }
}

/// Provider response to a successful initiation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_ref: String,
    pub auto_start_token: String,
    pub qr_start_token: String,
    pub qr_start_secret: String,
}

impl OrderResponse {
    /// Constructor for transport implementations and test doubles.
    pub fn new(
        order_ref: impl Into<String>,
        auto_start_token: impl Into<String>,
        qr_start_token: impl Into<String>,
        qr_start_secret: impl Into<String>,
    ) -> Self {
        Self {
            order_ref: order_ref.into(),
            auto_start_token: auto_start_token.into(),
            qr_start_token: qr_start_token.into(),
            qr_start_secret: qr_start_secret.into(),
        }
    }
}

/// Provider-reported order state from a collect call.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectResponse {
    Pending {
        order_ref: String,
        hint_code: PendingHint,
    },
    Complete {
        order_ref: String,
        completion_data: CompletionData,
    },
    Failed {
        order_ref: String,
        hint_code: FailedHint,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CollectStatus {
    Pending,
    Complete,
    Failed,
}

/// Raw collect response body before status-specific validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectWire {
    order_ref: String,
    status: CollectStatus,
    #[serde(default)]
    hint_code: Option<String>,
    #[serde(default)]
    completion_data: Option<CompletionData>,
}

impl TryFrom<CollectWire> for CollectResponse {
    type Error = Error;

    fn try_from(wire: CollectWire) -> Result<Self, Error> {
        match wire.status {
            CollectStatus::Pending => Ok(Self::Pending {
                order_ref: wire.order_ref,
                hint_code: wire
                    .hint_code
                    .as_deref()
                    .map(PendingHint::from_code)
                    .unwrap_or(PendingHint::Unknown),
            }),
            CollectStatus::Complete => Ok(Self::Complete {
                order_ref: wire.order_ref,
                completion_data: wire.completion_data.ok_or_else(|| {
                    Error::Transport("complete collect response without completionData".to_owned())
                })?,
            }),
            CollectStatus::Failed => Ok(Self::Failed {
                order_ref: wire.order_ref,
                hint_code: wire
                    .hint_code
                    .as_deref()
                    .map(FailedHint::from_code)
                    .unwrap_or(FailedHint::Unknown),
            }),
        }
    }
}
