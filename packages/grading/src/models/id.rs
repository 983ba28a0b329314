use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier: {0}")]
pub struct InvalidIdentifier(pub String);

const ID_HEX_LEN: usize = 32;

/// Opaque identifier shared by assignments, files and deliverables.
///
/// Renders as 32 lowercase hex characters. Freshly generated ids are time
/// ordered, so sorting by id follows creation order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse the canonical 32-character hex form.
    pub fn parse(s: &str) -> Result<Self, InvalidIdentifier> {
        if s.len() != ID_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidIdentifier(format!(
                "expected {ID_HEX_LEN} hex characters, got {s:?}"
            )));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|e| InvalidIdentifier(e.to_string()))
    }

    /// Canonical string form.
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }

    pub(crate) fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub(crate) fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.to_hex())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse every element of a persisted id array.
pub(crate) fn parse_id_list(value: &serde_json::Value) -> Result<Vec<RecordId>, InvalidIdentifier> {
    let items = value
        .as_array()
        .ok_or_else(|| InvalidIdentifier(format!("expected an id array, got {value}")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| InvalidIdentifier(format!("expected an id string, got {item}")))
                .and_then(RecordId::parse)
        })
        .collect()
}
