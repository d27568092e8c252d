//! Driving port for enrollment mutations.
//!
//! HTTP handlers and batch jobs call this port. Every failure is classified
//! once into the closed [`Error`] taxonomy and returned synchronously; nothing
//! is retried behind the caller's back.

use async_trait::async_trait;

use crate::domain::{
    CustomerId, Enrollment, Error, EventId, Occupancy, ProgramEnrollment, ProgramId, ResourceId,
};

/// Enrollment admission control.
#[async_trait]
pub trait EnrollmentCommand: Send + Sync {
    /// Enroll a customer into one event.
    async fn enroll_in_event(
        &self,
        customer: CustomerId,
        event: EventId,
    ) -> Result<Enrollment, Error>;

    /// Enroll a customer into every event of a program as one unit.
    async fn enroll_in_program(
        &self,
        customer: CustomerId,
        program: ProgramId,
    ) -> Result<ProgramEnrollment, Error>;

    /// Cancel the customer's active enrollment(s) for a resource.
    async fn un_enroll(&self, customer: CustomerId, resource: ResourceId) -> Result<(), Error>;

    /// Record attendance for an active event enrollment.
    async fn check_in(&self, customer: CustomerId, event: EventId) -> Result<Enrollment, Error>;

    /// Report whether a resource has reached its capacity.
    async fn is_full(&self, resource: ResourceId) -> Result<bool, Error>;

    /// Read a resource's capacity and live enrollment count.
    async fn occupancy(&self, resource: ResourceId) -> Result<Occupancy, Error>;
}
