//! Scriptable fake provider for testing order flows.
//!
//! [`FakeProvider`] implements [`Transport`] entirely in memory: initiation
//! always hands out the same order, collect answers are scripted ahead of
//! time, and every call is counted. Intended for integration tests that need
//! deterministic provider behavior without network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bankid_flow::order::{
    CompletedDevice, CompletedUser, CompletionData, FailedHint, OrderKind, PendingHint,
};
use bankid_flow::transport::{CollectResponse, InitiatePayload, OrderResponse, Transport};
use bankid_flow::Error;

/// Order reference every fake initiation hands out.
pub const FAKE_ORDER_REF: &str = "131daac9-16c6-4618-beb0-365768f37288";

/// In-memory provider with scripted collect responses.
///
/// Collect answers are queued with [`push_collect`](Self::push_collect) and
/// consumed in order; an exhausted queue is a transport error, so a test that
/// under-scripts its flow fails loudly instead of spinning.
#[derive(Default)]
pub struct FakeProvider {
    collect_script: Mutex<VecDeque<Result<CollectResponse, Error>>>,
    initiate_failure: Mutex<Option<Error>>,
    cancel_failure: Mutex<Option<Error>>,
    initiate_calls: AtomicUsize,
    collect_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next collect answer.
    pub fn push_collect(&self, response: CollectResponse) {
        self.collect_script
            .lock()
            .expect("collect script lock")
            .push_back(Ok(response));
    }

    /// Queue a collect-level fault.
    pub fn push_collect_error(&self, error: Error) {
        self.collect_script
            .lock()
            .expect("collect script lock")
            .push_back(Err(error));
    }

    /// Make the next initiate call fail with `error`.
    pub fn fail_next_initiate(&self, error: Error) {
        *self.initiate_failure.lock().expect("initiate failure lock") = Some(error);
    }

    /// Make the next cancel call fail with `error`.
    pub fn fail_next_cancel(&self, error: Error) {
        *self.cancel_failure.lock().expect("cancel failure lock") = Some(error);
    }

    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn collect_calls(&self) -> usize {
        self.collect_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeProvider {
    async fn initiate(
        &self,
        kind: OrderKind,
        _payload: &InitiatePayload,
    ) -> Result<OrderResponse, Error> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.initiate_failure.lock().expect("initiate failure lock").take() {
            return Err(error);
        }
        tracing::debug!("fake {kind} order initiated");
        Ok(OrderResponse::new(
            FAKE_ORDER_REF,
            "7c40b5c9-fa74-49cf-b98c-bfe651f9a7c6",
            "67df3917-fa0d-44e5-b327-edcc928297f8",
            "d28db9a7-4cde-429e-a983-359be676944c",
        ))
    }

    async fn collect(&self, _order_ref: &str) -> Result<CollectResponse, Error> {
        self.collect_calls.fetch_add(1, Ordering::SeqCst);
        self.collect_script
            .lock()
            .expect("collect script lock")
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted collect response".to_owned())))
    }

    async fn cancel(&self, _order_ref: &str) -> Result<(), Error> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.cancel_failure.lock().expect("cancel failure lock").take() {
            return Err(error);
        }
        Ok(())
    }
}

/// A pending collect answer with the given hint.
pub fn pending(hint: PendingHint) -> CollectResponse {
    CollectResponse::Pending {
        order_ref: FAKE_ORDER_REF.to_owned(),
        hint_code: hint,
    }
}

/// A complete collect answer carrying [`create_fake_completion`] data.
pub fn complete() -> CollectResponse {
    CollectResponse::Complete {
        order_ref: FAKE_ORDER_REF.to_owned(),
        completion_data: create_fake_completion(),
    }
}

/// A failed collect answer with the given hint.
pub fn failed(hint: FailedHint) -> CollectResponse {
    CollectResponse::Failed {
        order_ref: FAKE_ORDER_REF.to_owned(),
        hint_code: hint,
    }
}

/// Completion data for a fictional identified user.
pub fn create_fake_completion() -> CompletionData {
    CompletionData {
        user: CompletedUser {
            personal_number: "190000000000".to_owned(),
            name: "John Smith".to_owned(),
            given_name: "John".to_owned(),
            surname: "Smith".to_owned(),
        },
        device: CompletedDevice {
            ip_address: "127.0.0.1".to_owned(),
            uhi: None,
        },
        bank_id_issue_date: "2023-01-01".to_owned(),
        step_up: None,
        signature: "ZmFrZS1zaWduYXR1cmU=".to_owned(),
        ocsp_response: "ZmFrZS1vY3Nw".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_script_is_consumed_in_order() {
        let provider = FakeProvider::new();
        provider.push_collect(pending(PendingHint::Started));
        provider.push_collect(complete());

        assert_eq!(
            provider.collect(FAKE_ORDER_REF).await.unwrap(),
            pending(PendingHint::Started)
        );
        assert_eq!(provider.collect(FAKE_ORDER_REF).await.unwrap(), complete());
        assert_eq!(provider.collect_calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_is_a_transport_error() {
        let provider = FakeProvider::new();
        let err = provider.collect(FAKE_ORDER_REF).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn initiate_failure_is_one_shot() {
        let provider = FakeProvider::new();
        provider.fail_next_initiate(Error::Transport("down".to_owned()));

        let payload =
            InitiatePayload::auth("127.0.0.1", None, &Default::default()).unwrap();
        assert!(provider
            .initiate(OrderKind::Auth, &payload)
            .await
            .is_err());
        assert!(provider
            .initiate(OrderKind::Auth, &payload)
            .await
            .is_ok());
        assert_eq!(provider.initiate_calls(), 2);
    }
}
