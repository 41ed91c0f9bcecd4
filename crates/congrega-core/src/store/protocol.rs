//! Remote store protocol message types
//!
//! Messages exchanged with the document server as JSON text frames.
//! Requests carry a `requestId`; the server answers each with `ack` or
//! `error`. Collection and document changes arrive as unsolicited
//! `snapshot` / `document` notifications, and sign-in state as `auth`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StoredDocument;
use crate::models::RecordId;

/// Correlates a request with its reply
pub type RequestId = u64;

/// Protocol version
pub const PROTOCOL_V1: &str = "1";

/// Error code the server uses for a missing document
pub const CODE_NOT_FOUND: &str = "not-found";
/// Error code the server uses for bad credentials
pub const CODE_INVALID_CREDENTIALS: &str = "invalid-credentials";

/// Messages sent to the document server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Handshake, first frame on every connection
    #[serde(rename_all = "camelCase")]
    Hello {
        client_id: String,
        protocol_version: String,
    },

    /// Start receiving snapshots of a collection
    #[serde(rename_all = "camelCase")]
    Watch {
        request_id: RequestId,
        collection: String,
    },

    /// Start receiving a singleton document
    #[serde(rename_all = "camelCase")]
    WatchDocument {
        request_id: RequestId,
        collection: String,
        key: String,
    },

    #[serde(rename_all = "camelCase")]
    Add {
        request_id: RequestId,
        collection: String,
        body: Value,
    },

    #[serde(rename_all = "camelCase")]
    Update {
        request_id: RequestId,
        collection: String,
        id: RecordId,
        body: Value,
    },

    #[serde(rename_all = "camelCase")]
    Remove {
        request_id: RequestId,
        collection: String,
        id: RecordId,
    },

    /// Create or overwrite a singleton document
    #[serde(rename_all = "camelCase")]
    Set {
        request_id: RequestId,
        collection: String,
        key: String,
        body: Value,
    },

    #[serde(rename_all = "camelCase")]
    SignIn {
        request_id: RequestId,
        identifier: String,
        secret: String,
    },

    #[serde(rename_all = "camelCase")]
    SignOut { request_id: RequestId },
}

/// Messages received from the document server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Handshake reply
    #[serde(rename_all = "camelCase")]
    Welcome { server_id: String },

    /// Full contents of a watched collection
    #[serde(rename_all = "camelCase")]
    Snapshot {
        collection: String,
        documents: Vec<StoredDocument>,
    },

    /// Current body of a watched singleton document
    #[serde(rename_all = "camelCase")]
    Document {
        collection: String,
        key: String,
        #[serde(default)]
        body: Option<Value>,
    },

    /// Request succeeded; `id` is set for `add`
    #[serde(rename_all = "camelCase")]
    Ack {
        request_id: RequestId,
        #[serde(default)]
        id: Option<RecordId>,
    },

    /// Request failed, or a connection-level error when `request_id` is absent
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        request_id: Option<RequestId>,
        code: String,
        message: String,
    },

    /// Sign-in state of this connection changed
    #[serde(rename_all = "camelCase")]
    Auth { signed_in: bool },
}

impl ClientMessage {
    /// Create a handshake message
    pub fn hello(client_id: &str) -> Self {
        ClientMessage::Hello {
            client_id: client_id.to_string(),
            protocol_version: PROTOCOL_V1.to_string(),
        }
    }

    /// Request id carried by this message, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ClientMessage::Hello { .. } => None,
            ClientMessage::Watch { request_id, .. }
            | ClientMessage::WatchDocument { request_id, .. }
            | ClientMessage::Add { request_id, .. }
            | ClientMessage::Update { request_id, .. }
            | ClientMessage::Remove { request_id, .. }
            | ClientMessage::Set { request_id, .. }
            | ClientMessage::SignIn { request_id, .. }
            | ClientMessage::SignOut { request_id } => Some(*request_id),
        }
    }

    /// Encode message to a JSON text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    /// Decode message from a JSON text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_message_encoding() {
        let msg = ClientMessage::Add {
            request_id: 7,
            collection: "members".to_string(),
            body: json!({"name": "Ana"}),
        };
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "add",
                "requestId": 7,
                "collection": "members",
                "body": {"name": "Ana"}
            })
        );
        assert_eq!(msg.request_id(), Some(7));
    }

    #[test]
    fn test_watch_document_tag() {
        let msg = ClientMessage::WatchDocument {
            request_id: 1,
            collection: "settings".to_string(),
            key: "program".to_string(),
        };
        assert!(msg.encode().unwrap().contains("\"type\":\"watchDocument\""));
        assert_eq!(ClientMessage::hello("c1").request_id(), None);
    }

    #[test]
    fn test_snapshot_decoding() {
        let text = r#"{
            "type": "snapshot",
            "collection": "visitors",
            "documents": [{"id": "v1", "body": {"name": "Ana"}}]
        }"#;

        match ServerMessage::decode(text).unwrap() {
            ServerMessage::Snapshot {
                collection,
                documents,
            } => {
                assert_eq!(collection, "visitors");
                assert_eq!(documents[0].id, RecordId::from("v1"));
            }
            other => panic!("Expected Snapshot message, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_document_decoding() {
        let text = r#"{"type": "document", "collection": "settings", "key": "program"}"#;
        let msg = ServerMessage::decode(text).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Document {
                collection: "settings".to_string(),
                key: "program".to_string(),
                body: None,
            }
        );
    }

    #[test]
    fn test_connection_error_without_request() {
        let text = r#"{"type": "error", "code": "unavailable", "message": "shutting down"}"#;
        match ServerMessage::decode(text).unwrap() {
            ServerMessage::Error { request_id, .. } => assert!(request_id.is_none()),
            other => panic!("Expected Error message, got {:?}", other),
        }
    }
}
