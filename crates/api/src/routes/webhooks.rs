//! Payment gateway webhook ingestion.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use fulfillment::{GatewayEvent, ReconciliationOutcome};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Wire shape of a gateway callback.
#[derive(Debug, Deserialize)]
pub struct GatewayEventRequest {
    pub event_type: String,
    pub authorization_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub outcome: &'static str,
}

impl GatewayEventRequest {
    /// Converts the wire event into the typed form. Event types outside
    /// the handled set become `Other`, which reconciliation acknowledges
    /// without effect.
    fn into_event(self) -> Result<GatewayEvent, ApiError> {
        let event = match self.event_type.as_str() {
            "authorization.succeeded" => GatewayEvent::AuthorizationSucceeded {
                authorization_id: self.require_authorization_id()?,
            },
            "authorization.failed" => GatewayEvent::AuthorizationFailed {
                authorization_id: self.require_authorization_id()?,
                reason: self.reason,
            },
            _ => GatewayEvent::Other {
                event_type: self.event_type,
            },
        };
        Ok(event)
    }

    fn require_authorization_id(&self) -> Result<String, ApiError> {
        self.authorization_id
            .clone()
            .ok_or_else(|| ApiError::BadRequest("authorization_id is required".to_string()))
    }
}

/// POST /webhooks/payment — ingest one gateway callback.
///
/// An unknown authorization is a 422; the gateway redelivers until the
/// ledger row exists.
#[tracing::instrument(skip(state, req), fields(event_type = %req.event_type))]
pub async fn payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GatewayEventRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let event = req.into_event()?;
    let outcome = state.reconciliation.apply(event).await?;

    let outcome = match outcome {
        ReconciliationOutcome::Applied => "applied",
        ReconciliationOutcome::AlreadySettled => "already_settled",
        ReconciliationOutcome::Ignored => "ignored",
    };
    Ok(Json(WebhookResponse { outcome }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(event_type: &str, authorization_id: Option<&str>) -> GatewayEventRequest {
        GatewayEventRequest {
            event_type: event_type.to_string(),
            authorization_id: authorization_id.map(String::from),
            reason: None,
        }
    }

    #[test]
    fn known_event_types_convert() {
        let event = request("authorization.succeeded", Some("AUTH-1"))
            .into_event()
            .unwrap();
        assert_eq!(
            event,
            GatewayEvent::AuthorizationSucceeded {
                authorization_id: "AUTH-1".to_string()
            }
        );

        let event = request("authorization.failed", Some("AUTH-2"))
            .into_event()
            .unwrap();
        assert!(matches!(event, GatewayEvent::AuthorizationFailed { .. }));
    }

    #[test]
    fn unknown_event_type_becomes_other() {
        let event = request("authorization.created", None).into_event().unwrap();
        assert_eq!(
            event,
            GatewayEvent::Other {
                event_type: "authorization.created".to_string()
            }
        );
    }

    #[test]
    fn missing_authorization_id_is_rejected() {
        let result = request("authorization.succeeded", None).into_event();
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
