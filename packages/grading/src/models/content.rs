use common::storage::BlobHandle;

use super::MalformedRecord;

/// Where a record's payload lives.
///
/// A persisted record carries exactly one of a blob handle or inline bytes;
/// anything else is rejected when the row is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    Handle(BlobHandle),
    Inline(Vec<u8>),
}

impl ContentRef {
    /// Resolve the two nullable storage columns into a single reference.
    pub fn from_columns(
        blob_handle: Option<&str>,
        inline_content: Option<&[u8]>,
    ) -> Result<Self, MalformedRecord> {
        match (blob_handle, inline_content) {
            (Some(handle), None) => BlobHandle::from_hex(handle)
                .map(Self::Handle)
                .map_err(|e| MalformedRecord(e.to_string())),
            (None, Some(bytes)) => Ok(Self::Inline(bytes.to_vec())),
            (Some(_), Some(_)) => Err(MalformedRecord(
                "record carries both a blob handle and inline content".into(),
            )),
            (None, None) => Err(MalformedRecord("record carries no content".into())),
        }
    }

    /// Split back into `(blob_handle, inline_content)` columns.
    pub fn into_columns(self) -> (Option<String>, Option<Vec<u8>>) {
        match self {
            Self::Handle(handle) => (Some(handle.to_hex()), None),
            Self::Inline(bytes) => (None, Some(bytes)),
        }
    }

    pub fn handle(&self) -> Option<&BlobHandle> {
        match self {
            Self::Handle(handle) => Some(handle),
            Self::Inline(_) => None,
        }
    }
}
