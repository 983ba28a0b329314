//! Domain records handed across the repository boundary.

mod assignment;
mod content;
mod deliverable;
mod file;
mod id;
pub mod numeric;

pub use assignment::{Assignment, AssignmentUpdate};
pub use content::ContentRef;
pub use deliverable::{
    Deliverable, DeliverableUpdate, MarkStatus, NewDeliverable, UNKNOWN_STUDENT,
};
pub use file::{File, FileType, NewFile};
pub use id::{InvalidIdentifier, RecordId};

pub(crate) use id::parse_id_list;

use thiserror::Error;

/// A persisted row or document that does not decode into a domain record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record: {0}")]
pub struct MalformedRecord(pub String);

impl From<InvalidIdentifier> for MalformedRecord {
    fn from(err: InvalidIdentifier) -> Self {
        Self(err.to_string())
    }
}
