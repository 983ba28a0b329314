//! Business rules in front of the repository.
//!
//! Services validate input before any storage call and report the three
//! failure kinds of [`ServiceError`] separately.

mod assignment;
mod deliverable;
mod health;

pub use assignment::AssignmentService;
pub use deliverable::{DeliverableService, DeliverableUpload};
pub use health::HealthService;

use crate::error::ServiceError;
use crate::models::{Assignment, RecordId};
use crate::repository::Repository;

/// Parse an assignment id and make sure the assignment exists.
///
/// A malformed id is reported as not found.
async fn require_assignment(
    repository: &dyn Repository,
    assignment_id: &str,
) -> Result<Assignment, ServiceError> {
    if RecordId::parse(assignment_id).is_err() {
        return Err(ServiceError::NotFound("Assignment".into()));
    }
    repository
        .get_assignment(assignment_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Assignment".into()))
}

/// Use the supplied MIME type, or guess one from the filename when blank.
fn resolve_content_type(filename: &str, supplied: &str) -> String {
    if !supplied.trim().is_empty() {
        return supplied.to_owned();
    }
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}
