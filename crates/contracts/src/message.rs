//! Message - the unit that flows through every channel
//!
//! A message is an immutable payload plus a header map. The payload is
//! type-erased so channels never need to know what they carry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known header names
pub mod headers {
    /// Id of the message a fan-out copy was derived from
    pub const CORRELATION_ID: &str = "correlationId";
    /// 1-based position of a copy within its fan-out set
    pub const SEQUENCE_NUMBER: &str = "sequenceNumber";
    /// Number of copies in the fan-out set
    pub const SEQUENCE_SIZE: &str = "sequenceSize";
    /// Channel on which a routed failure happened
    pub const FAILED_CHANNEL: &str = "failedChannel";
    /// Name of the handler that failed
    pub const FAILED_HANDLER: &str = "failedHandler";
    /// Id of the message the failing handler received
    pub const FAILED_MESSAGE_ID: &str = "failedMessageId";
}

/// Type-erased message payload
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Unique message identity (UUID v7, time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Header value
///
/// Serialized with its kind as the key (`{"text":"..."}`), so a text value
/// that happens to parse as an id stays text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderValue {
    Id(MessageId),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl HeaderValue {
    pub fn as_id(&self) -> Option<MessageId> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<MessageId> for HeaderValue {
    fn from(id: MessageId) -> Self {
        Self::Id(id)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<usize> for HeaderValue {
    fn from(v: usize) -> Self {
        Self::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Message header map
///
/// Keys are unique; lookup order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeaders(HashMap<String, HeaderValue>);

impl MessageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a header, returning the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Option<HeaderValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Set a header only when the key is absent
    ///
    /// Returns true if the header was added.
    pub fn insert_if_absent(
        &mut self,
        key: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> bool {
        let key = key.into();
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn correlation_id(&self) -> Option<MessageId> {
        self.get(headers::CORRELATION_ID).and_then(HeaderValue::as_id)
    }

    pub fn sequence_number(&self) -> Option<i64> {
        self.get(headers::SEQUENCE_NUMBER)
            .and_then(HeaderValue::as_integer)
    }

    pub fn sequence_size(&self) -> Option<i64> {
        self.get(headers::SEQUENCE_SIZE).and_then(HeaderValue::as_integer)
    }
}

/// A message: identity, timestamp, headers and an opaque payload
///
/// Cloning is cheap: the payload is shared, only the header map is copied.
#[derive(Clone)]
pub struct Message {
    id: MessageId,
    timestamp: DateTime<Utc>,
    headers: MessageHeaders,
    payload: Option<Payload>,
}

impl Message {
    /// Create a message carrying `payload`
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self::from_payload(Some(Arc::new(payload)))
    }

    /// Create a message without payload
    pub fn empty() -> Self {
        Self::from_payload(None)
    }

    /// Create a message from an already type-erased payload
    pub fn from_payload(payload: Option<Payload>) -> Self {
        Self {
            id: MessageId::new(),
            timestamp: Utc::now(),
            headers: MessageHeaders::new(),
            payload,
        }
    }

    /// Builder-style header setter
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Derive a new message sharing this one's payload and headers
    ///
    /// The copy gets a fresh id and timestamp.
    pub fn derive(&self) -> Self {
        Self {
            id: MessageId::new(),
            timestamp: Utc::now(),
            headers: self.headers.clone(),
            payload: self.payload.clone(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut MessageHeaders {
        &mut self.headers
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Downcast the payload to a concrete type
    pub fn payload_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// True when both messages share the same payload allocation
    pub fn shares_payload_with(&self, other: &Message) -> bool {
        match (&self.payload, &other.payload) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("headers", &self.headers)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
