//! The event value dispatched to handlers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::kind::{EventContext, EventKind, KindDescriptor, kinds};

/// Caller-defined event payload.
pub type EventContent = Map<String, Value>;

/// Identity of the connection an event originated from.
///
/// The event never owns the connection; this is only its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a fresh connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Something that happened, routed by its kind.
///
/// Content is read-only once the event exists; handlers that want to
/// change it construct a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    kind: EventKind,
    context: Option<EventContext>,
    content: Arc<EventContent>,
    connection: Option<ConnectionId>,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event of the described kind, timestamped now.
    #[must_use]
    pub fn new(descriptor: &KindDescriptor, content: EventContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: descriptor.kind().clone(),
            context: descriptor.context(),
            content: Arc::new(content),
            connection: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an event of the described kind with no content.
    #[must_use]
    pub fn empty(descriptor: &KindDescriptor) -> Self {
        Self::new(descriptor, EventContent::new())
    }

    /// Create a controller shutdown signal.
    #[must_use]
    pub fn shutdown() -> Self {
        Self::empty(&kinds::SHUTDOWN_EVENT)
    }

    /// Attach the originating connection.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionId) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Override the construction timestamp, e.g. when replaying.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Unique id of this event instance.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Concrete kind.
    #[must_use]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Context fixed by the kind.
    #[must_use]
    pub fn context(&self) -> Option<EventContext> {
        self.context
    }

    /// Payload.
    #[must_use]
    pub fn content(&self) -> &EventContent {
        &self.content
    }

    /// Look up a single payload value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    /// Originating connection, if connection-scoped.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// When this instance was constructed.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> EventContent {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_event_takes_kind_and_context_from_descriptor() {
        let event = Event::new(&kinds::SWITCH_UP, content(json!({"dpid": "00:01"})));
        assert_eq!(event.kind(), kinds::SWITCH_UP.kind());
        assert_eq!(event.context(), Some(EventContext::Core));
        assert_eq!(event.get("dpid"), Some(&json!("00:01")));
        assert!(event.connection().is_none());
    }

    #[test]
    fn test_content_is_copied_on_construction() {
        let mut source = content(json!({"port": 1}));
        let event = Event::new(&kinds::MESSAGE_IN_HELLO, source.clone());
        source.insert("port".to_string(), json!(2));
        assert_eq!(event.get("port"), Some(&json!(1)));
    }

    #[test]
    fn test_empty_content_is_not_shared() {
        let a = Event::shutdown();
        let b = Event::shutdown();
        assert!(a.content().is_empty());
        assert!(!std::ptr::eq(a.content(), b.content()));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_timestamps_evaluated_per_instance() {
        let first = Event::empty(&kinds::APP_LOADED);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = Event::empty(&kinds::APP_LOADED);
        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn test_with_connection_and_timestamp() {
        let conn = ConnectionId::new();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = Event::empty(&kinds::NEW_CONNECTION)
            .with_connection(conn)
            .with_timestamp(at);
        assert_eq!(event.connection(), Some(conn));
        assert_eq!(event.timestamp(), at);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(&kinds::MESSAGE_OUT_ECHO_REPLY, content(json!({"xid": 7})))
            .with_connection(ConnectionId::new());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"MessageOutEchoReply\""));
        assert!(json.contains("\"context\":\"message\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), event.id());
        assert_eq!(parsed.get("xid"), Some(&json!(7)));
    }
}
