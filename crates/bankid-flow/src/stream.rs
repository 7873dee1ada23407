//! Long-lived lifecycle event streams.
//!
//! Folds initiation plus repeated polling into one cancellable sequence of
//! events for push-style consumers (e.g. a server-sent-events endpoint). The
//! poll loop runs as an explicit task writing to a channel; a cancellation
//! token is checked at every suspension point, so a disconnecting consumer
//! stops the polling promptly without cancelling the provider order itself.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::{OrderFlowEngine, OrderRequest};
use crate::error::Error;
use crate::order::{CompletionData, FailedHint, OrderKind, OrderStatus, TransactionId};

/// One lifecycle event: a name plus a JSON payload, framed by whatever
/// transport the caller chooses.
///
/// Within one stream, events are strictly ordered: exactly one start event
/// (`auth` or `sign`), zero or more `pending` events in poll order, then
/// exactly one terminal event (`complete` or `failed`), after which the
/// stream closes.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Auth {
        transaction_id: TransactionId,
        auto_start_token: String,
    },
    Sign {
        transaction_id: TransactionId,
        auto_start_token: String,
    },
    Pending {
        #[serde(skip_serializing_if = "Option::is_none")]
        qr: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint_code: Option<String>,
    },
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        order: Option<CompletionData>,
        #[serde(skip_serializing_if = "Option::is_none")]
        finalize_data: Option<Value>,
    },
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint_code: Option<String>,
    },
}

impl OrderEvent {
    /// Event name for transport framing (e.g. an SSE `event:` line).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Sign { .. } => "sign",
            Self::Pending { .. } => "pending",
            Self::Complete { .. } => "complete",
            Self::Failed { .. } => "failed",
        }
    }

    /// JSON payload for transport framing.
    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

enum StreamMode {
    Start {
        kind: OrderKind,
        action_name: String,
        request: OrderRequest,
    },
    Resume {
        transaction_id: TransactionId,
        request: Value,
    },
}

/// Handle to one running order stream.
///
/// Implements [`Stream`]; domain failures arrive as a terminal `failed`
/// event, transport-level faults as an `Err` item after which the stream
/// closes without a terminal lifecycle event. Dropping the handle cancels
/// the polling task.
pub struct OrderStream {
    events: mpsc::Receiver<Result<OrderEvent, Error>>,
    cancel: CancellationToken,
}

impl OrderStream {
    /// Initiate an auth order and stream its lifecycle.
    pub fn auth(
        engine: Arc<OrderFlowEngine>,
        action_name: impl Into<String>,
        request: OrderRequest,
    ) -> Self {
        Self::spawn(
            engine,
            StreamMode::Start {
                kind: OrderKind::Auth,
                action_name: action_name.into(),
                request,
            },
        )
    }

    /// Initiate a sign order and stream its lifecycle.
    pub fn sign(
        engine: Arc<OrderFlowEngine>,
        action_name: impl Into<String>,
        request: OrderRequest,
    ) -> Self {
        Self::spawn(
            engine,
            StreamMode::Start {
                kind: OrderKind::Sign,
                action_name: action_name.into(),
                request,
            },
        )
    }

    /// Reconnect to an already-running order: skips initiation and begins
    /// directly at the poll loop. No start event is emitted.
    pub fn resume(
        engine: Arc<OrderFlowEngine>,
        transaction_id: TransactionId,
        request: Value,
    ) -> Self {
        Self::spawn(
            engine,
            StreamMode::Resume {
                transaction_id,
                request,
            },
        )
    }

    fn spawn(engine: Arc<OrderFlowEngine>, mode: StreamMode) -> Self {
        let (tx, events) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        tokio::spawn(run(engine, mode, tx, cancel.clone()));
        Self { events, cancel }
    }

    /// Token that stops the polling task when cancelled. Cancellation is
    /// cooperative: it is checked between suspension points and guarantees
    /// no further collect call is issued, but does not interrupt one already
    /// in flight.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop polling. Does not cancel the order against the provider;
    /// ownership of that decision stays with the caller.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next lifecycle event, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<OrderEvent, Error>> {
        self.events.recv().await
    }
}

impl Drop for OrderStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Stream for OrderStream {
    type Item = Result<OrderEvent, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

async fn run(
    engine: Arc<OrderFlowEngine>,
    mode: StreamMode,
    tx: mpsc::Sender<Result<OrderEvent, Error>>,
    cancel: CancellationToken,
) {
    let (transaction_id, request) = match mode {
        StreamMode::Start {
            kind,
            action_name,
            request,
        } => {
            let initiated = match kind {
                OrderKind::Auth => engine.auth(&action_name, request.clone()).await,
                OrderKind::Sign => engine.sign(&action_name, request.clone()).await,
            };
            let initiated = match initiated {
                Ok(initiated) => initiated,
                Err(err) => {
                    let _ = tx.send(initiation_failure(err)).await;
                    return;
                }
            };
            let event = match kind {
                OrderKind::Auth => OrderEvent::Auth {
                    transaction_id: initiated.transaction_id,
                    auto_start_token: initiated.auto_start_token,
                },
                OrderKind::Sign => OrderEvent::Sign {
                    transaction_id: initiated.transaction_id,
                    auto_start_token: initiated.auto_start_token,
                },
            };
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
            (initiated.transaction_id, request.request)
        }
        StreamMode::Resume {
            transaction_id,
            request,
        } => (transaction_id, request),
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("stream for order {transaction_id} cancelled");
                return;
            }
            _ = tokio::time::sleep(engine.poll_interval()) => {}
        }

        let order = match engine.check(&transaction_id, &request).await {
            Ok(order) => order,
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                return;
            }
        };

        let done = order.status.is_terminal();
        let event = match order.status {
            OrderStatus::Pending => OrderEvent::Pending {
                qr: order.qr,
                hint_code: order.hint_code,
            },
            OrderStatus::Complete => OrderEvent::Complete {
                order: order.completion_data,
                finalize_data: order.finalize_data,
            },
            OrderStatus::Failed => OrderEvent::Failed {
                detail: order.detail,
                hint_code: order.hint_code,
            },
            // An order cancelled through the sync path; the stream
            // vocabulary has no dedicated event for it.
            OrderStatus::Cancelled => OrderEvent::Failed {
                detail: order.detail,
                hint_code: Some(FailedHint::Cancelled.as_str().to_owned()),
            },
        };
        if tx.send(Ok(event)).await.is_err() {
            return;
        }
        if done {
            return;
        }
    }
}

/// Caller-input failures during initiation surface as a terminal `failed`
/// event; everything else ends the stream with the error itself.
fn initiation_failure(err: Error) -> Result<OrderEvent, Error> {
    match err {
        Error::UnknownAction(_)
        | Error::InitializeFailed { .. }
        | Error::UserDataTooLarge { .. }
        | Error::InvalidPersonalNumber(_) => Ok(OrderEvent::Failed {
            detail: Some(err.to_string()),
            hint_code: None,
        }),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_the_wire_vocabulary() {
        let event = OrderEvent::Pending {
            qr: None,
            hint_code: Some("started".to_owned()),
        };
        assert_eq!(event.name(), "pending");
        assert_eq!(event.payload(), serde_json::json!({"hint_code": "started"}));
    }

    #[test]
    fn start_event_payload_carries_the_handle() {
        let transaction_id = TransactionId::new();
        let event = OrderEvent::Auth {
            transaction_id,
            auto_start_token: "token".to_owned(),
        };
        assert_eq!(event.name(), "auth");
        assert_eq!(
            event.payload(),
            serde_json::json!({
                "transaction_id": transaction_id.to_string(),
                "auto_start_token": "token",
            })
        );
    }
}
