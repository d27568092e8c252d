//! Classification of enrollment store failures.
//!
//! Store adapters report low-level signals (unique conflicts, foreign key
//! violations, serialization aborts) and in-transaction diagnoses. This module
//! maps them into the closed caller-facing taxonomy: `Conflict`, `NotFound`,
//! or `Internal`. Internal failures are logged with full detail and replaced
//! by a generic message, since store diagnostics can leak schema or data.
//!
//! Serialization aborts are not classified on the spot. They come back as
//! [`Classification::Ambiguous`] and the coordinator re-reads occupancy before
//! picking between "full" and "contended".

use tracing::error;

use super::error::{ConflictReason, Error};
use super::ids::ResourceId;
use super::ports::EnrollmentStoreError;
use super::Occupancy;

/// Message returned for a duplicate enrollment.
pub const DUPLICATE_MESSAGE: &str = "duplicate enrollment";
/// Message returned when an abort could not be attributed to capacity.
pub const CONTENDED_MESSAGE: &str = "Too many people enrolled at the same time. Please try again.";
/// Message returned in place of internal failure details.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Which coordinator operation produced the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Enrollment into an event or a program.
    Enroll,
    /// Cancellation of an enrollment.
    Cancel,
    /// Attendance recording.
    CheckIn,
    /// Capacity oracle read.
    Inspect,
}

impl Operation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Enroll => "enroll",
            Self::Cancel => "cancel",
            Self::CheckIn => "check_in",
            Self::Inspect => "inspect",
        }
    }
}

/// Result of classifying one store failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The failure maps directly onto a caller-facing error.
    Rejected(Error),
    /// The transaction was aborted for a reason the store did not name.
    Ambiguous {
        /// Store detail, kept for logging only.
        detail: String,
    },
}

/// User-facing "full" message for a resource, e.g. `Program is full`.
#[must_use]
pub fn full_message(resource: &ResourceId) -> String {
    format!("{} is full", resource.label())
}

/// Map a store failure into the enrollment error taxonomy.
pub fn classify(
    error: EnrollmentStoreError,
    resource: &ResourceId,
    operation: Operation,
) -> Classification {
    use EnrollmentStoreError as E;

    let rejected = match error {
        E::SerializationFailure { message } => {
            return Classification::Ambiguous { detail: message };
        }
        E::UniqueViolation { .. } | E::AlreadyEnrolled { .. } => {
            Error::conflict(ConflictReason::Duplicate, DUPLICATE_MESSAGE)
        }
        E::CapacityReached { resource: full } => {
            Error::conflict(ConflictReason::CapacityExceeded, full_message(&full))
        }
        E::ForeignKeyViolation { constraint } => {
            Error::not_found(foreign_key_message(&constraint, resource))
        }
        E::ResourceMissing { resource: missing } => {
            Error::not_found(format!("{} not found", missing.label()))
        }
        E::CustomerMissing { .. } => Error::not_found("Customer not found"),
        E::EmptyProgram { .. } => Error::not_found("Program has no events"),
        E::NotEnrolled { .. } => Error::not_found("Enrollment not found"),
        E::AlreadyCheckedIn { .. } => match operation {
            Operation::Cancel => Error::conflict(
                ConflictReason::CheckedIn,
                "Enrollment is already checked in and cannot be cancelled",
            ),
            _ => Error::conflict(
                ConflictReason::AlreadyCheckedIn,
                "Customer is already checked in",
            ),
        },
        other @ (E::Connection { .. } | E::Query { .. }) => internal(&other, resource, operation),
    };
    Classification::Rejected(rejected)
}

/// Resolve an ambiguous abort using occupancy re-read after the abort.
///
/// A resource that is full by now is reported as full. Anything else,
/// including a failed re-read, is reported as contention.
#[must_use]
pub fn resolve_ambiguous(
    resource: &ResourceId,
    recheck: Result<Occupancy, EnrollmentStoreError>,
) -> Error {
    match recheck {
        Ok(occupancy) if occupancy.is_full() => {
            Error::conflict(ConflictReason::CapacityExceeded, full_message(resource))
        }
        _ => Error::conflict(ConflictReason::Contended, CONTENDED_MESSAGE),
    }
}

/// Log an unexpected store failure and return the redacted error.
fn internal(error: &EnrollmentStoreError, resource: &ResourceId, operation: Operation) -> Error {
    error!(
        error = %error,
        %resource,
        operation = operation.as_str(),
        "enrollment store failure"
    );
    Error::internal(INTERNAL_MESSAGE)
}

fn foreign_key_message(constraint: &str, resource: &ResourceId) -> String {
    let lower = constraint.to_lowercase();
    if lower.contains("customer") {
        "Customer not found".to_owned()
    } else if lower.contains("event") {
        "Event not found".to_owned()
    } else {
        format!("Customer or {} not found", resource.label().to_lowercase())
    }
}
