//! Application payloads.
//!
//! A [`Payload`] is an immutable application-defined value carried by a
//! command request, command response, or notification. Payloads keep two
//! lazily-populated forms of the same value: the encoded bytes (as carried
//! on the wire) and the decoded JSON value. A payload created from bytes
//! decodes on first [`Payload::value`] call; a payload created from a value
//! encodes on first [`Payload::bytes`] call. Both transitions are guarded
//! and idempotent, so an application can forward an incoming payload without
//! ever paying for a decode/re-encode cycle.
//!
//! Payloads are reference counted. Cloning shares the underlying data;
//! [`Payload::close`] releases this handle's claim on it. A single handle
//! should not be shared across tasks; clone it instead.

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

static NULL: serde_json::Value = serde_json::Value::Null;

/// An immutable, reference-counted application value.
///
/// The default payload is the nil payload, which renders as zero bytes on
/// the wire and decodes as JSON `null`.
#[derive(Clone, Default)]
pub struct Payload {
    data: Option<Arc<PayloadData>>,
}

struct PayloadData {
    /// The encoded form. Populated lazily on first `bytes()` read.
    bytes: OnceCell<Bytes>,
    /// The decoded form. Populated lazily on first `value()` read.
    value: OnceCell<serde_json::Value>,
}

impl Payload {
    /// The nil payload.
    pub fn none() -> Self {
        Payload { data: None }
    }

    /// Creates a payload from an arbitrary serializable value.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(value)
            .map_err(|err| anyhow::Error::from(err).context("encoding payload"))?;
        Ok(Self::from_json(value))
    }

    /// Creates a payload from a decoded JSON value. `null` is the nil
    /// payload.
    pub fn from_json(value: serde_json::Value) -> Self {
        if value.is_null() {
            return Self::none();
        }
        Payload {
            data: Some(Arc::new(PayloadData {
                bytes: OnceCell::new(),
                value: OnceCell::with_value(value),
            })),
        }
    }

    /// Creates a payload from its encoded form. An empty buffer is the nil
    /// payload.
    pub fn from_bytes(buf: Bytes) -> Self {
        if buf.is_empty() {
            return Self::none();
        }
        Payload {
            data: Some(Arc::new(PayloadData {
                bytes: OnceCell::with_value(buf),
                value: OnceCell::new(),
            })),
        }
    }

    /// The encoded form of the payload. Nil payloads encode to zero bytes.
    ///
    /// If the payload was created from bytes, this returns that same buffer.
    pub fn bytes(&self) -> Bytes {
        match &self.data {
            None => Bytes::new(),
            Some(data) => data
                .bytes
                .get_or_init(|| {
                    let value = data.value.get().expect("payload has bytes or value");
                    serde_json::to_vec(value)
                        .expect("JSON value encoding cannot fail")
                        .into()
                })
                .clone(),
        }
    }

    /// The decoded form of the payload. Nil payloads decode to `null`.
    ///
    /// Fails if the payload was created from bytes that are not valid JSON.
    pub fn value(&self) -> Result<&serde_json::Value, Error> {
        match &self.data {
            None => Ok(&NULL),
            Some(data) => data.value.get_or_try_init(|| {
                let bytes = data.bytes.get().expect("payload has bytes or value");
                serde_json::from_slice(bytes)
                    .map_err(|err| anyhow::Error::from(err).context("decoding payload").into())
            }),
        }
    }

    /// Decodes the payload into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.value()?.clone())
            .map_err(|err| anyhow::Error::from(err).context("decoding payload").into())
    }

    /// The encoded length in bytes. Zero length means the nil payload.
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Whether this is the nil payload.
    pub fn is_none(&self) -> bool {
        self.data.is_none()
    }

    /// Releases this handle, resetting it to the nil payload. The underlying
    /// data is freed once every clone has been closed or dropped.
    pub fn close(&mut self) {
        self.data = None;
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({self})")
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Ok(value) => write!(f, "{value}"),
            Err(_) => write!(f, "<{} opaque bytes>", self.len()),
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes())
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let buf = Vec::<u8>::deserialize(deserializer)?;
        Ok(Payload::from_bytes(buf.into()))
    }
}
