// ws-protocol: wire envelope shared by every WebSocket connection.
//
// The envelope is intentionally open-ended: `type` is a free-form tag and
// `payload` is opaque JSON. Only a handful of reserved types (ack, error,
// data_request) are understood by the core; everything else is routed to
// application handlers unmodified.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single message traveling in either direction over a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Correlation identifier. Required whenever the sender expects an ack
    /// or a response; otherwise may be omitted by clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Stamped by the server on outbound messages; absent on inbound ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Only ever populated server -> client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            pid: Some(new_pid()),
            kind: kind.into(),
            from_user_id: None,
            target_user_id: None,
            payload: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target_user_id: i64) -> Self {
        self.target_user_id = Some(target_user_id);
        self
    }

    #[must_use]
    pub fn with_from(mut self, from_user_id: i64) -> Self {
        self.from_user_id = Some(from_user_id);
        self
    }

    pub fn pid_or_assign(&mut self) -> String {
        if self.pid.is_none() {
            self.pid = Some(new_pid());
        }
        self.pid.clone().expect("just assigned")
    }

    pub fn error_notification(original_pid: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        let mut env = Self::new(reserved_types::ERROR_NOTIFICATION);
        env.error = Some(ErrorPayload {
            original_pid: original_pid.into(),
            code,
            message: message.into(),
        });
        env
    }

    pub fn server_ack(acknowledged_pid: impl Into<String>, status: impl Into<String>, error: Option<String>) -> Self {
        Self::new(reserved_types::SERVER_ACK).with_payload(
            serde_json::to_value(AckPayload {
                acknowledged_pid: acknowledged_pid.into(),
                status: status.into(),
                error,
            })
            .expect("AckPayload always serializes"),
        )
    }
}

/// A random, URL-safe correlation id. Unique within the lifetime of the
/// pending tables that use it, not globally.
pub fn new_pid() -> String {
    Uuid::new_v4().to_string()
}

/// Payload of a `client_ack` or `server_ack` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub acknowledged_pid: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of the `error` field on a server -> client envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(default)]
    pub original_pid: String,
    pub code: i32,
    pub message: String,
}

/// Payload shape for the reserved `data_request` type: routed by the
/// dispatch façade on `(resource, action)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequestPayload {
    pub resource: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Type tags understood by the core itself, rather than routed to
/// application handlers.
pub mod reserved_types {
    pub const CLIENT_ACK: &str = "client_ack";
    pub const SERVER_ACK: &str = "server_ack";
    pub const ERROR_NOTIFICATION: &str = "error_notification";
    pub const DATA_REQUEST: &str = "data_request";
}

/// Numeric error codes carried in [`ErrorPayload::code`].
pub mod error_codes {
    pub const PROTOCOL_ERROR: i32 = 1000;
    pub const HANDLER_ERROR: i32 = 1001;
    pub const UNKNOWN_ACTION: i32 = 1002;
    pub const INTERNAL_ERROR: i32 = 1099;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let env = Envelope::new("chat")
            .with_payload(serde_json::json!({"body": "hi"}))
            .with_target(42);
        let text = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back.kind, "chat");
        assert_eq!(back.target_user_id, Some(42));
    }

    #[test]
    fn wire_json_uses_type_not_kind() {
        let env = Envelope::new("ping");
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("type").is_some());
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn wire_json_uses_camel_case_field_names() {
        let env = Envelope::new("chat").with_target(7).with_from(3);
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("targetUserId").is_some());
        assert!(value.get("fromUserId").is_some());
        assert!(value.get("target_user_id").is_none());
        assert!(value.get("from_user_id").is_none());

        let ack = serde_json::to_value(AckPayload {
            acknowledged_pid: "p1".to_string(),
            status: "ok".to_string(),
            error: None,
        })
        .unwrap();
        assert!(ack.get("acknowledgedPid").is_some());

        let err = serde_json::to_value(ErrorPayload {
            original_pid: "p1".to_string(),
            code: 1,
            message: "oops".to_string(),
        })
        .unwrap();
        assert!(err.get("originalPid").is_some());
    }

    #[test]
    fn pid_or_assign_is_idempotent() {
        let mut env = Envelope {
            pid: None,
            kind: "x".into(),
            from_user_id: None,
            target_user_id: None,
            payload: None,
            error: None,
        };
        let first = env.pid_or_assign();
        let second = env.pid_or_assign();
        assert_eq!(first, second);
    }

    #[test]
    fn data_request_payload_parses_from_envelope() {
        let env = Envelope::new(reserved_types::DATA_REQUEST).with_payload(serde_json::json!({
            "resource": "presence",
            "action": "query",
            "data": {"userIds": [1, 2]},
        }));
        let payload: DataRequestPayload =
            serde_json::from_value(env.payload.unwrap()).unwrap();
        assert_eq!(payload.resource, "presence");
        assert_eq!(payload.action, "query");
    }
}
