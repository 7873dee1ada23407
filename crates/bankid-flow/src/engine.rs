//! The order-flow engine.
//!
//! Stateless per call: every operation loads the order from the store, talks
//! to the provider, and persists the outcome. Two independent requests can
//! therefore drive the same order; see [`crate::store::OrderStore`] for the
//! write policy under races.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::action::{ActionError, ActionRegistry, RegisteredAction};
use crate::config::Config;
use crate::error::Error;
use crate::order::{Order, OrderKind, OrderStatus, TransactionId};
use crate::qr::qr_challenge;
use crate::requirement::Requirement;
use crate::store::OrderStore;
use crate::transport::{CollectResponse, InitiatePayload, Transport};
use crate::util::unix_time;

/// Caller input to initiation.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// IP of the end user as seen by the caller's outer layer.
    pub end_user_ip: String,
    pub requirement: Option<Requirement>,
    /// Opaque caller request data handed to the action hooks verbatim.
    pub request: Value,
    /// Initial context offered to `initialize`.
    pub context: Option<Value>,
}

impl OrderRequest {
    /// Request with no requirement, request data or context.
    pub fn new(end_user_ip: impl Into<String>) -> Self {
        Self {
            end_user_ip: end_user_ip.into(),
            requirement: None,
            request: Value::Null,
            context: None,
        }
    }
}

/// Caller-facing result of a successful initiation.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatedOrder {
    pub transaction_id: TransactionId,
    /// Token for launching the provider app on the same device.
    pub auto_start_token: String,
    /// QR challenge at elapsed second zero.
    pub qr: String,
}

/// Orchestrates actions, transport, storage and QR derivation into the
/// two-phase order lifecycle: initiate, then poll until terminal.
pub struct OrderFlowEngine {
    transport: Arc<dyn Transport>,
    store: Arc<dyn OrderStore>,
    actions: ActionRegistry,
    store_ttl: Duration,
    poll_interval: Duration,
}

impl OrderFlowEngine {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn OrderStore>,
        actions: ActionRegistry,
    ) -> Self {
        Self {
            transport,
            store,
            actions,
            store_ttl: config.store_ttl,
            poll_interval: config.poll_interval,
        }
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Initiate an authentication order.
    #[instrument(skip_all, fields(action = %action_name))]
    pub async fn auth(
        &self,
        action_name: &str,
        request: OrderRequest,
    ) -> Result<InitiatedOrder, Error> {
        self.initiate(OrderKind::Auth, action_name, request).await
    }

    /// Initiate a signing order.
    #[instrument(skip_all, fields(action = %action_name))]
    pub async fn sign(
        &self,
        action_name: &str,
        request: OrderRequest,
    ) -> Result<InitiatedOrder, Error> {
        self.initiate(OrderKind::Sign, action_name, request).await
    }

    async fn initiate(
        &self,
        kind: OrderKind,
        action_name: &str,
        request: OrderRequest,
    ) -> Result<InitiatedOrder, Error> {
        let action = self
            .actions
            .get(kind, action_name)
            .ok_or_else(|| Error::UnknownAction(action_name.to_owned()))?
            .clone();

        let (payload, context) = match &action {
            RegisteredAction::Auth(action) => {
                let (user_data, context) = action
                    .initialize(&request.request, request.context.clone())
                    .await
                    .map_err(initialize_error)?;
                (
                    InitiatePayload::auth(&request.end_user_ip, request.requirement, &user_data)?,
                    context,
                )
            }
            RegisteredAction::Sign(action) => {
                let (user_data, context) = action
                    .initialize(&request.request, request.context.clone())
                    .await
                    .map_err(initialize_error)?;
                (
                    InitiatePayload::sign(&request.end_user_ip, request.requirement, &user_data)?,
                    context,
                )
            }
        };

        let response = self.transport.initiate(kind, &payload).await?;

        let transaction_id = TransactionId::new();
        let qr = qr_challenge(&response.qr_start_token, &response.qr_start_secret, 0);
        let order = Order {
            transaction_id,
            order_ref: response.order_ref,
            kind,
            action_name: action_name.to_owned(),
            status: OrderStatus::Pending,
            hint_code: None,
            auto_start_token: response.auto_start_token,
            qr_start_token: response.qr_start_token,
            qr_start_secret: response.qr_start_secret,
            started_at: unix_time(),
            qr: Some(qr.clone()),
            context,
            completion_data: None,
            finalize_data: None,
            detail: None,
        };
        self.store.save(&order, self.store_ttl).await?;
        tracing::debug!("initiated {kind} order {transaction_id}");

        Ok(InitiatedOrder {
            transaction_id,
            auto_start_token: order.auto_start_token,
            qr,
        })
    }

    /// Poll provider state for an order.
    ///
    /// Terminal orders are returned as stored, with no provider call. A
    /// pending order is collected from the provider: still-pending orders
    /// get a fresh hint and QR challenge; completion runs the action's
    /// `finalize` before the terminal state is persisted; a provider-reported
    /// failure is persisted with its hint code.
    #[instrument(skip_all, fields(transaction_id = %transaction_id))]
    pub async fn check(
        &self,
        transaction_id: &TransactionId,
        request: &Value,
    ) -> Result<Order, Error> {
        let mut order = self.load(transaction_id).await?;
        if order.status.is_terminal() {
            return Ok(order);
        }

        match self.transport.collect(&order.order_ref).await? {
            CollectResponse::Pending { hint_code, .. } => {
                let elapsed = unix_time().saturating_sub(order.started_at);
                order.hint_code = Some(hint_code.as_str().to_owned());
                order.qr = Some(qr_challenge(
                    &order.qr_start_token,
                    &order.qr_start_secret,
                    elapsed,
                ));
                self.store.save(&order, self.store_ttl).await?;
            }
            CollectResponse::Complete {
                completion_data, ..
            } => {
                let action = self
                    .actions
                    .get(order.kind, &order.action_name)
                    .ok_or_else(|| Error::UnknownAction(order.action_name.clone()))?;
                match action
                    .finalize(&completion_data, request, order.context.clone())
                    .await
                {
                    Ok(finalize_data) => {
                        order.status = OrderStatus::Complete;
                        order.completion_data = Some(completion_data);
                        order.finalize_data = finalize_data;
                        order.hint_code = None;
                        order.qr = None;
                        self.store.save(&order, self.store_ttl).await?;
                        tracing::debug!("order {transaction_id} complete");
                    }
                    Err(ActionError::Failed { detail }) => {
                        tracing::info!("finalize rejected order {transaction_id}: {detail}");
                        order.status = OrderStatus::Failed;
                        order.detail = Some(detail);
                        order.hint_code = None;
                        order.qr = None;
                        self.store.save(&order, self.store_ttl).await?;
                    }
                    Err(ActionError::Other(err)) => {
                        // Order stays pending; retried finalize is the
                        // recovery path.
                        tracing::warn!(
                            "finalize failed for order {transaction_id}, left pending: {err}"
                        );
                        return Err(Error::Action(err));
                    }
                }
            }
            CollectResponse::Failed { hint_code, .. } => {
                tracing::debug!("order {transaction_id} failed: {}", hint_code.as_str());
                order.status = OrderStatus::Failed;
                order.hint_code = Some(hint_code.as_str().to_owned());
                order.qr = None;
                self.store.save(&order, self.store_ttl).await?;
            }
        }

        Ok(order)
    }

    /// Cancel a pending order against the provider and persist `cancelled`.
    ///
    /// Fails with [`Error::AlreadyTerminal`] for orders that already reached
    /// a terminal state; no provider call is made in that case.
    #[instrument(skip_all, fields(transaction_id = %transaction_id))]
    pub async fn cancel(&self, transaction_id: &TransactionId) -> Result<(), Error> {
        let mut order = self.load(transaction_id).await?;
        if order.status.is_terminal() {
            return Err(Error::AlreadyTerminal {
                transaction_id: *transaction_id,
                status: order.status,
            });
        }

        self.transport.cancel(&order.order_ref).await?;
        order.status = OrderStatus::Cancelled;
        order.hint_code = None;
        order.qr = None;
        self.store.save(&order, self.store_ttl).await?;
        tracing::debug!("order {transaction_id} cancelled");
        Ok(())
    }

    async fn load(&self, transaction_id: &TransactionId) -> Result<Order, Error> {
        self.store
            .load(transaction_id)
            .await?
            .ok_or(Error::OrderNotFound(*transaction_id))
    }
}

fn initialize_error(err: ActionError) -> Error {
    match err {
        ActionError::Failed { detail } => Error::InitializeFailed { detail },
        ActionError::Other(err) => Error::Action(err),
    }
}
