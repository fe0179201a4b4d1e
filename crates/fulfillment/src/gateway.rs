//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::OrderNumber;

use crate::error::FulfillmentError;

/// One authorization request sent to the gateway.
///
/// The amount is in minor units, as wire-format payment APIs expect.
/// The idempotency key makes a retried request return the original
/// authorization instead of creating a second remote charge.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub idempotency_key: String,
}

/// Trait for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorizes a payment and returns the gateway-assigned
    /// authorization id. The outcome of the authorization arrives later
    /// through a gateway callback.
    async fn authorize(&self, request: AuthorizationRequest)
    -> Result<String, FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    authorizations: HashMap<String, AuthorizationRequest>,
    by_idempotency_key: HashMap<String, String>,
    next_id: u32,
    fail_on_authorize: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail authorization calls.
    pub fn set_fail_on_authorize(&self, fail: bool) {
        self.state.write().unwrap().fail_on_authorize = fail;
    }

    /// Returns the number of authorizations created.
    pub fn authorization_count(&self) -> usize {
        self.state.read().unwrap().authorizations.len()
    }

    /// Returns true if an authorization exists with the given id.
    pub fn has_authorization(&self, authorization_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .authorizations
            .contains_key(authorization_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<String, FulfillmentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_authorize {
            return Err(FulfillmentError::Gateway(
                "authorization declined".to_string(),
            ));
        }

        // Idempotent replay returns the original authorization.
        if let Some(existing) = state.by_idempotency_key.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let authorization_id = format!("AUTH-{:04}", state.next_id);
        state
            .by_idempotency_key
            .insert(request.idempotency_key.clone(), authorization_id.clone());
        state
            .authorizations
            .insert(authorization_id.clone(), request);

        Ok(authorization_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(idempotency_key: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            amount_minor: 2500,
            currency: "usd".to_string(),
            order_id: OrderId::new(),
            order_number: OrderNumber::generate(),
            idempotency_key: idempotency_key.to_string(),
        }
    }

    #[tokio::test]
    async fn authorize_assigns_sequential_ids() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.authorize(request("key-1")).await.unwrap();
        let second = gateway.authorize(request("key-2")).await.unwrap();

        assert_eq!(first, "AUTH-0001");
        assert_eq!(second, "AUTH-0002");
        assert!(gateway.has_authorization(&first));
    }

    #[tokio::test]
    async fn replayed_idempotency_key_returns_same_authorization() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.authorize(request("key-1")).await.unwrap();
        let replay = gateway.authorize(request("key-1")).await.unwrap();

        assert_eq!(first, replay);
        assert_eq!(gateway.authorization_count(), 1);
    }

    #[tokio::test]
    async fn fail_on_authorize() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_authorize(true);

        let result = gateway.authorize(request("key-1")).await;
        assert!(matches!(result, Err(FulfillmentError::Gateway(_))));
        assert_eq!(gateway.authorization_count(), 0);
    }
}
