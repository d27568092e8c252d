//! Domain primitives, ports, and services for enrollment admission control.
//!
//! Purpose: Define strongly typed entities used by the persistence and
//! inbound layers, the driven ports the store adapters implement, and the
//! services that implement the driving ports.
//!
//! Public surface:
//! - Identifiers (`CustomerId`, `EventId`, `ProgramId`, `EnrollmentId`,
//!   `ResourceId`).
//! - `Enrollment`, `ProgramEnrollment`, and `EnrollmentFilter`.
//! - `Occupancy`, the capacity predicate.
//! - `Error` with its closed `ErrorCode` taxonomy.
//! - `EnrollmentCoordinator` and `EnrollmentQueryService`.

pub mod capacity;
pub mod enrollment;
pub mod enrollment_classifier;
pub mod enrollment_coordinator;
pub mod enrollment_query;
pub mod error;
pub mod ids;
pub mod ports;

pub use self::capacity::{capacity_from_db, Occupancy};
pub use self::enrollment::{Enrollment, EnrollmentFilter, EnrollmentStatus, ProgramEnrollment};
pub use self::enrollment_coordinator::EnrollmentCoordinator;
pub use self::enrollment_query::EnrollmentQueryService;
pub use self::error::{ConflictReason, Error, ErrorCode, ErrorValidationError};
pub use self::ids::{CustomerId, EnrollmentId, EventId, ProgramId, ResourceId};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use facility_backend::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<()> {
///     Err(Error::not_found("Event not found"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
