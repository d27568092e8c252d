//! Port for the transactional enrollment store.
//!
//! Every method of [`EnrollmentStore`] is one unit of work: adapters run it
//! as a single transaction and either commit all of its effects or none.
//! Writes that can consume a seat must serialize against every other writer
//! for the same seats, by row locks or serializable isolation, so the store
//! rather than the application decides who gets the last seat.
//!
//! Errors carry the raw store signal (unique conflict, foreign key, or
//! serialization failure) or the diagnosis the adapter made inside the same
//! transaction. Turning those into the caller-facing taxonomy is the job of
//! the enrollment classifier.

use async_trait::async_trait;

use crate::domain::{CustomerId, Enrollment, EventId, Occupancy, ProgramId, ResourceId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by enrollment store adapters.
    pub enum EnrollmentStoreError {
        /// Connection could not be checked out or was lost.
        Connection { message: String } =>
            "enrollment store connection failed: {message}",
        /// Query or mutation failed for a reason the adapter cannot classify.
        Query { message: String } =>
            "enrollment store query failed: {message}",
        /// A uniqueness constraint rejected the write.
        UniqueViolation { constraint: String } =>
            "unique constraint violated: {constraint}",
        /// A foreign key constraint rejected the write.
        ForeignKeyViolation { constraint: String } =>
            "foreign key constraint violated: {constraint}",
        /// The store aborted the transaction to preserve serializability.
        SerializationFailure { message: String } =>
            "transaction aborted by a concurrent writer: {message}",
        /// The referenced event or program does not exist.
        ResourceMissing { resource: ResourceId } =>
            "{resource} does not exist",
        /// The referenced customer does not exist.
        CustomerMissing { customer: CustomerId } =>
            "customer {customer} does not exist",
        /// The program has no events to enroll into.
        EmptyProgram { program: ProgramId } =>
            "program {program} has no events",
        /// The capacity predicate rejected the write.
        CapacityReached { resource: ResourceId } =>
            "{resource} has no seats left",
        /// The customer already holds an active enrollment.
        AlreadyEnrolled { customer: CustomerId, resource: ResourceId } =>
            "customer {customer} is already enrolled in {resource}",
        /// The customer holds no active enrollment.
        NotEnrolled { customer: CustomerId, resource: ResourceId } =>
            "customer {customer} holds no active enrollment in {resource}",
        /// The active enrollment was already checked in.
        AlreadyCheckedIn { customer: CustomerId, resource: ResourceId } =>
            "customer {customer} already checked in to {resource}",
    }
}

/// Transactional writes over enrollment rows plus the capacity oracle read.
///
/// Adapters are the only writers of enrollment rows. Implementations must not
/// cache counts between calls and must not retry aborted transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Create, or reactivate a cancelled, enrollment for one event.
    ///
    /// The capacity predicate and the write happen in one transaction that
    /// holds the seat-owning rows. A program-owned event also counts against
    /// the program's distinct-customer capacity. Rejections are reported as
    /// [`EnrollmentStoreError::CapacityReached`],
    /// [`EnrollmentStoreError::AlreadyEnrolled`],
    /// [`EnrollmentStoreError::ResourceMissing`], or
    /// [`EnrollmentStoreError::CustomerMissing`].
    async fn enroll_in_event(
        &self,
        customer: CustomerId,
        event: EventId,
    ) -> Result<Enrollment, EnrollmentStoreError>;

    /// Enroll into every event currently linked to the program, atomically.
    ///
    /// Returns one enrollment per event. When any event rejects the write the
    /// whole transaction rolls back and no row is left behind.
    async fn enroll_in_program(
        &self,
        customer: CustomerId,
        program: ProgramId,
    ) -> Result<Vec<Enrollment>, EnrollmentStoreError>;

    /// Cancel the customer's active enrollments for the resource.
    ///
    /// Checked-in enrollments are never cancelled. Returns the number of rows
    /// cancelled, which is always at least one on success.
    async fn cancel(
        &self,
        customer: CustomerId,
        resource: ResourceId,
    ) -> Result<u64, EnrollmentStoreError>;

    /// Record attendance on an active enrollment.
    async fn check_in(
        &self,
        customer: CustomerId,
        event: EventId,
    ) -> Result<Enrollment, EnrollmentStoreError>;

    /// Read the enrollments through which the customer holds the resource.
    ///
    /// Returns `Some` with rows ordered by event when the customer holds an
    /// active enrollment for the event, or for every event of the program, and
    /// `None` otherwise. Used to learn whether an attempt whose outcome was
    /// lost did commit.
    async fn held_enrollments(
        &self,
        customer: CustomerId,
        resource: ResourceId,
    ) -> Result<Option<Vec<Enrollment>>, EnrollmentStoreError>;

    /// Read the capacity and live enrollment count of a resource.
    async fn occupancy(&self, resource: ResourceId) -> Result<Occupancy, EnrollmentStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn diagnosis_messages_name_the_resource() {
        let customer = CustomerId::random();
        let program = ProgramId::random();
        let err = EnrollmentStoreError::already_enrolled(customer, program);

        let message = err.to_string();
        assert!(message.contains(&customer.to_string()));
        assert!(message.contains(&format!("program {program}")));
    }

    #[rstest]
    fn capacity_reached_accepts_event_identifiers() {
        let event = EventId::random();
        let err = EnrollmentStoreError::capacity_reached(event);
        assert_eq!(
            err,
            EnrollmentStoreError::CapacityReached {
                resource: ResourceId::Event(event)
            }
        );
    }
}
