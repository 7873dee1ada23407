//! BankID order-flow SDK.
//!
//! Mediates between a caller and the BankID web API, which issues
//! asynchronous orders (authentication or signing) that must be polled until
//! they reach a terminal state. The crate covers the full order lifecycle:
//!
//! - [`OrderFlowEngine`] drives `auth`/`sign` initiation, `check` polling and
//!   `cancel` against the provider, dispatching caller business logic through
//!   registered [`AuthAction`]/[`SignAction`] hooks.
//! - [`OrderStore`] is the storage contract that lets a stateless request
//!   layer resume polling across independent calls; [`MemoryStore`] is the
//!   reference implementation.
//! - [`qr_challenge`] derives the rotating QR code shown during live
//!   authentication.
//! - [`OrderStream`] folds initiation plus repeated polling into one
//!   cancellable sequence of lifecycle events for push-style consumers.
//!
//! The HTTP transport ([`HttpTransport`]) and the storage backend are
//! collaborators behind traits; callers may substitute their own.

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod order;
pub mod qr;
pub mod requirement;
pub mod store;
pub mod stream;
pub mod transport;
mod util;

pub use action::{
    ActionError, ActionRegistry, ActionRegistryBuilder, AuthAction, SignAction, UserAuthData,
    UserSignData, VisibleDataFormat,
};
pub use config::Config;
pub use engine::{InitiatedOrder, OrderFlowEngine, OrderRequest};
pub use error::{ApiErrorCode, Error};
pub use order::{
    CompletionData, FailedHint, Order, OrderKind, OrderStatus, PendingHint, TransactionId,
};
pub use qr::qr_challenge;
pub use requirement::{CardReader, Requirement};
pub use store::{MemoryStore, OrderStore};
pub use stream::{OrderEvent, OrderStream};
pub use transport::{CollectResponse, HttpTransport, InitiatePayload, OrderResponse, Transport};
