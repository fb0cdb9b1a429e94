//! Opaque carrier for the backend's rehydration map.
//!
//! The map pairs placeholders with the original values they replaced, so it
//! is the most sensitive thing this client ever holds. It is kept as raw
//! JSON bytes, re-emitted byte-for-byte, never parsed, never printed by
//! `Debug`, and dropped as soon as the final stage has been called.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

#[derive(Clone)]
pub struct RehydrationToken(Box<RawValue>);

impl RehydrationToken {
    /// Size of the carried JSON, for metadata-only logging.
    pub fn len_bytes(&self) -> usize {
        self.0.get().len()
    }

    /// Wrap a raw JSON document. Used by scripted backends and tests.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.to_string()).map(Self)
    }

    #[cfg(test)]
    pub(crate) fn raw_json(&self) -> &str {
        self.0.get()
    }
}

impl std::fmt::Debug for RehydrationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RehydrationToken(<redacted, {} bytes>)", self.len_bytes())
    }
}

impl Serialize for RehydrationToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RehydrationToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Box::<RawValue>::deserialize(deserializer).map(Self)
    }
}

/// Serialize an optional token, sending `{}` when no stage has produced one.
pub(crate) fn serialize_or_empty<S: Serializer>(
    token: &Option<&RehydrationToken>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match token {
        Some(token) => token.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
