//! Gateway callback events.

/// A callback delivered by the payment gateway.
///
/// Delivery is at-least-once with no ordering guarantee, so handlers
/// must tolerate replays and late arrivals. Event types outside the
/// known set land in `Other` and are acknowledged without effect, so
/// new gateway event types never bounce the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The authorization completed successfully.
    AuthorizationSucceeded { authorization_id: String },

    /// The authorization failed.
    AuthorizationFailed {
        authorization_id: String,
        reason: Option<String>,
    },

    /// An event type this service does not handle.
    Other { event_type: String },
}

impl GatewayEvent {
    /// Returns the authorization id the event refers to, if any.
    pub fn authorization_id(&self) -> Option<&str> {
        match self {
            GatewayEvent::AuthorizationSucceeded { authorization_id }
            | GatewayEvent::AuthorizationFailed {
                authorization_id, ..
            } => Some(authorization_id),
            GatewayEvent::Other { .. } => None,
        }
    }
}
