use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::BlobError;

const HANDLE_LEN: usize = 16;

/// Opaque reference to a stored blob.
///
/// Every `put` mints a fresh handle, so two records holding identical bytes
/// never share a payload and deleting one leaves the other intact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobHandle([u8; HANDLE_LEN]);

impl BlobHandle {
    /// Mint a new random handle.
    pub fn generate() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Parse a hex-encoded handle string.
    pub fn from_hex(s: &str) -> Result<Self, BlobError> {
        if s.len() != HANDLE_LEN * 2 {
            return Err(BlobError::InvalidHandle(format!(
                "expected {} hex characters, got {}",
                HANDLE_LEN * 2,
                s.len()
            )));
        }

        let bytes =
            hex::decode(s).map_err(|e| BlobError::InvalidHandle(format!("invalid hex: {e}")))?;

        let arr: [u8; HANDLE_LEN] = bytes
            .try_into()
            .map_err(|_| BlobError::InvalidHandle("decoded to wrong length".into()))?;

        Ok(Self(arr))
    }

    /// Return the handle as a 32-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 2 hex characters, used as the shard directory.
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Remaining 30 hex characters, used as the name within a shard.
    pub fn shard_suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHandle({})", self.to_hex())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for BlobHandle {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for BlobHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlobHandle {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
