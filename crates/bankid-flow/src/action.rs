//! Caller-supplied business-logic hooks and their registry.
//!
//! An action injects caller logic at the two lifecycle hooks: `initialize`
//! runs before the provider initiate call and produces the user-facing
//! payload plus an opaque context; `finalize` runs exactly once when the
//! provider reports the order complete, before the terminal state is
//! persisted. Actions are stateless singletons shared across calls and
//! streams; anything per-order must travel in the context value.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::order::{CompletionData, OrderKind};

/// Format marker for user-visible text understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisibleDataFormat {
    #[serde(rename = "simpleMarkdownV1")]
    SimpleMarkdownV1,
}

/// User-facing fields of an auth initiation, produced by `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAuthData {
    pub visible: Option<String>,
    pub non_visible: Option<String>,
    pub visible_format: Option<VisibleDataFormat>,
}

/// User-facing fields of a sign initiation. The visible text is the text to
/// be signed and is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSignData {
    pub visible: String,
    pub non_visible: Option<String>,
    pub visible_format: Option<VisibleDataFormat>,
}

/// Failure signalled from an action hook.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The hook rejects the order with a human-readable detail. During
    /// `finalize` this persists the order as `failed` with that detail;
    /// during `initialize` it fails initiation before any provider contact.
    #[error("{detail}")]
    Failed { detail: String },
    /// Any other hook failure. A failing `finalize` leaves the order pending
    /// so the hook is re-invoked on the next check; hooks must tolerate that.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    /// Reject the order with the given detail.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed {
            detail: detail.into(),
        }
    }
}

/// Outcome of `initialize`: the provider-facing user data plus the opaque
/// context later handed to `finalize`.
pub type Initialized<T> = (T, Option<Value>);

/// Business logic bound to auth orders.
#[async_trait]
pub trait AuthAction: Send + Sync {
    /// Unique name the action is registered and addressed under.
    fn name(&self) -> &str;

    /// Runs before the provider initiate call. The returned context is
    /// stored with the order and passed unchanged to [`Self::finalize`].
    async fn initialize(
        &self,
        request: &Value,
        context: Option<Value>,
    ) -> Result<Initialized<UserAuthData>, ActionError>;

    /// Runs when the provider reports the order complete, before the
    /// terminal state is persisted.
    async fn finalize(
        &self,
        response: &CompletionData,
        request: &Value,
        context: Option<Value>,
    ) -> Result<Option<Value>, ActionError>;
}

/// Business logic bound to sign orders.
#[async_trait]
pub trait SignAction: Send + Sync {
    /// Unique name the action is registered and addressed under.
    fn name(&self) -> &str;

    /// Runs before the provider initiate call. The returned context is
    /// stored with the order and passed unchanged to [`Self::finalize`].
    async fn initialize(
        &self,
        request: &Value,
        context: Option<Value>,
    ) -> Result<Initialized<UserSignData>, ActionError>;

    /// Runs when the provider reports the order complete, before the
    /// terminal state is persisted.
    async fn finalize(
        &self,
        response: &CompletionData,
        request: &Value,
        context: Option<Value>,
    ) -> Result<Option<Value>, ActionError>;
}

/// A registered handler, specialized by order kind.
#[derive(Clone)]
pub enum RegisteredAction {
    Auth(Arc<dyn AuthAction>),
    Sign(Arc<dyn SignAction>),
}

impl RegisteredAction {
    fn kind(&self) -> OrderKind {
        match self {
            Self::Auth(_) => OrderKind::Auth,
            Self::Sign(_) => OrderKind::Sign,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Auth(action) => action.name(),
            Self::Sign(action) => action.name(),
        }
    }

    pub(crate) async fn finalize(
        &self,
        response: &CompletionData,
        request: &Value,
        context: Option<Value>,
    ) -> Result<Option<Value>, ActionError> {
        match self {
            Self::Auth(action) => action.finalize(response, request, context).await,
            Self::Sign(action) => action.finalize(response, request, context).await,
        }
    }
}

impl fmt::Debug for RegisteredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAction")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// Name-to-action lookup, validated at construction.
///
/// Built through [`ActionRegistry::builder`], which rejects duplicate
/// `(kind, name)` registrations up front so an unaddressable order can never
/// be created.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<(OrderKind, String), RegisteredAction>,
}

impl ActionRegistry {
    /// Start building a registry.
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::default()
    }

    /// Look up the handler registered for `kind` under `name`.
    pub fn get(&self, kind: OrderKind, name: &str) -> Option<&RegisteredAction> {
        self.actions.get(&(kind, name.to_owned()))
    }

    /// Registered `(kind, name)` pairs, for diagnostics.
    pub fn names(&self) -> impl Iterator<Item = (OrderKind, &str)> {
        self.actions
            .keys()
            .map(|(kind, name)| (*kind, name.as_str()))
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.actions.keys()).finish()
    }
}

/// Builder collecting actions before the duplicate-name validation pass.
#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: Vec<RegisteredAction>,
}

impl ActionRegistryBuilder {
    /// Register an auth action.
    pub fn auth(self, action: impl AuthAction + 'static) -> Self {
        self.auth_arc(Arc::new(action))
    }

    /// Register an already-shared auth action.
    pub fn auth_arc(mut self, action: Arc<dyn AuthAction>) -> Self {
        self.actions.push(RegisteredAction::Auth(action));
        self
    }

    /// Register a sign action.
    pub fn sign(self, action: impl SignAction + 'static) -> Self {
        self.sign_arc(Arc::new(action))
    }

    /// Register an already-shared sign action.
    pub fn sign_arc(mut self, action: Arc<dyn SignAction>) -> Self {
        self.actions.push(RegisteredAction::Sign(action));
        self
    }

    /// Validate and build the registry.
    ///
    /// Fails with [`Error::DuplicateAction`] if two actions of the same kind
    /// declared the same name.
    pub fn build(self) -> Result<ActionRegistry, Error> {
        let mut actions = HashMap::with_capacity(self.actions.len());
        for action in self.actions {
            let key = (action.kind(), action.name().to_owned());
            if actions.contains_key(&key) {
                return Err(Error::DuplicateAction {
                    kind: key.0,
                    name: key.1,
                });
            }
            actions.insert(key, action);
        }
        Ok(ActionRegistry { actions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Login;

    #[async_trait]
    impl AuthAction for Login {
        fn name(&self) -> &str {
            "LOGIN"
        }

        async fn initialize(
            &self,
            _request: &Value,
            context: Option<Value>,
        ) -> Result<Initialized<UserAuthData>, ActionError> {
            Ok((UserAuthData::default(), context))
        }

        async fn finalize(
            &self,
            _response: &CompletionData,
            _request: &Value,
            _context: Option<Value>,
        ) -> Result<Option<Value>, ActionError> {
            Ok(None)
        }
    }

    struct Agreement;

    #[async_trait]
    impl SignAction for Agreement {
        fn name(&self) -> &str {
            "LOGIN"
        }

        async fn initialize(
            &self,
            _request: &Value,
            context: Option<Value>,
        ) -> Result<Initialized<UserSignData>, ActionError> {
            Ok((
                UserSignData {
                    visible: "I agree".to_owned(),
                    non_visible: None,
                    visible_format: None,
                },
                context,
            ))
        }

        async fn finalize(
            &self,
            _response: &CompletionData,
            _request: &Value,
            _context: Option<Value>,
        ) -> Result<Option<Value>, ActionError> {
            Ok(None)
        }
    }

    #[test]
    fn duplicate_names_are_rejected_at_build() {
        let err = ActionRegistry::builder()
            .auth(Login)
            .auth(Login)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateAction {
                kind: OrderKind::Auth,
                ..
            }
        ));
    }

    #[test]
    fn same_name_under_different_kinds_is_allowed() {
        let registry = ActionRegistry::builder()
            .auth(Login)
            .sign(Agreement)
            .build()
            .unwrap();
        assert!(registry.get(OrderKind::Auth, "LOGIN").is_some());
        assert!(registry.get(OrderKind::Sign, "LOGIN").is_some());
    }

    #[test]
    fn unregistered_names_miss() {
        let registry = ActionRegistry::builder().auth(Login).build().unwrap();
        assert!(registry.get(OrderKind::Auth, "DOES_NOT_EXIST").is_none());
        assert!(registry.get(OrderKind::Sign, "LOGIN").is_none());
    }
}
