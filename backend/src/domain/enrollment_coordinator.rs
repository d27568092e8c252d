//! Enrollment coordinator.
//!
//! Implements the [`EnrollmentCommand`] driving port on top of an
//! [`EnrollmentStore`]. Each call is exactly one store transaction; failures
//! are classified once and returned to the caller. Serialization aborts and
//! attempt timeouts are resolved by a single occupancy re-read so the caller
//! learns whether the resource is now full or was merely contended. A timed
//! out enrollment first checks whether the customer now holds the resource,
//! since the abandoned transaction may have committed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::enrollment_classifier::{
    classify, resolve_ambiguous, Classification, Operation, CONTENDED_MESSAGE, INTERNAL_MESSAGE,
};
use super::error::{ConflictReason, Error};
use super::ports::{EnrollmentCommand, EnrollmentStore, EnrollmentStoreError};
use super::{
    CustomerId, Enrollment, EventId, Occupancy, ProgramEnrollment, ProgramId, ResourceId,
};

/// Admission control for events and programs.
#[derive(Clone)]
pub struct EnrollmentCoordinator<S> {
    store: Arc<S>,
    attempt_timeout: Option<Duration>,
}

impl<S> EnrollmentCoordinator<S> {
    /// Create a coordinator over the enrollment store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            attempt_timeout: None,
        }
    }

    /// Bound each store attempt. An attempt that overruns is treated as an
    /// aborted transaction.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }
}

impl<S> EnrollmentCoordinator<S>
where
    S: EnrollmentStore,
{
    /// Await one store call, giving up once the attempt timeout elapses.
    ///
    /// `None` means the attempt was abandoned and its outcome is unknown.
    async fn attempt<T, F>(
        &self,
        resource: ResourceId,
        work: F,
    ) -> Option<Result<T, EnrollmentStoreError>>
    where
        F: Future<Output = Result<T, EnrollmentStoreError>> + Send,
        T: Send,
    {
        let Some(limit) = self.attempt_timeout else {
            return Some(work.await);
        };
        match tokio::time::timeout(limit, work).await {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!(
                    %resource,
                    timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    "enrollment attempt timed out"
                );
                None
            }
        }
    }

    async fn run<T, F>(&self, resource: ResourceId, operation: Operation, work: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, EnrollmentStoreError>> + Send,
        T: Send,
    {
        match self.attempt(resource, work).await {
            Some(outcome) => self.settle(resource, operation, outcome).await,
            None => Err(self.resolve(resource, operation).await),
        }
    }

    /// Run an enrollment, checking whether an abandoned attempt committed.
    ///
    /// The attempt may be dropped after the database accepted the commit, so
    /// before reporting failure the customer's holdings are re-read and an
    /// existing enrollment is returned as the outcome.
    async fn run_enroll<F>(
        &self,
        customer: CustomerId,
        resource: ResourceId,
        work: F,
    ) -> Result<Vec<Enrollment>, Error>
    where
        F: Future<Output = Result<Vec<Enrollment>, EnrollmentStoreError>> + Send,
    {
        if let Some(outcome) = self.attempt(resource, work).await {
            return self.settle(resource, Operation::Enroll, outcome).await;
        }
        match self.store.held_enrollments(customer, resource).await {
            Ok(Some(enrollments)) => {
                info!(%customer, %resource, "timed out enrollment had committed");
                Ok(enrollments)
            }
            Ok(None) => Err(self.resolve(resource, Operation::Enroll).await),
            Err(error) => {
                warn!(%resource, error = %error, "enrollment re-read failed");
                Err(self.resolve(resource, Operation::Enroll).await)
            }
        }
    }

    async fn settle<T>(
        &self,
        resource: ResourceId,
        operation: Operation,
        outcome: Result<T, EnrollmentStoreError>,
    ) -> Result<T, Error> {
        match outcome {
            Ok(value) => Ok(value),
            Err(error) => match classify(error, &resource, operation) {
                Classification::Rejected(error) => {
                    if let Some(reason) = error.reason() {
                        warn!(%resource, ?reason, "enrollment request rejected");
                    }
                    Err(error)
                }
                Classification::Ambiguous { detail } => {
                    debug!(%resource, %detail, "enrollment transaction aborted");
                    let error = self.resolve(resource, operation).await;
                    warn!(%resource, reason = ?error.reason(), "aborted transaction resolved");
                    Err(error)
                }
            },
        }
    }

    async fn resolve(&self, resource: ResourceId, operation: Operation) -> Error {
        if operation != Operation::Enroll {
            return Error::conflict(ConflictReason::Contended, CONTENDED_MESSAGE);
        }
        let recheck = self.store.occupancy(resource).await;
        if let Err(error) = &recheck {
            warn!(%resource, error = %error, "occupancy re-read failed");
        }
        resolve_ambiguous(&resource, recheck)
    }
}

#[async_trait]
impl<S> EnrollmentCommand for EnrollmentCoordinator<S>
where
    S: EnrollmentStore,
{
    async fn enroll_in_event(
        &self,
        customer: CustomerId,
        event: EventId,
    ) -> Result<Enrollment, Error> {
        let store = &self.store;
        let enrollment = self
            .run_enroll(customer, event.into(), async move {
                store
                    .enroll_in_event(customer, event)
                    .await
                    .map(|enrollment| vec![enrollment])
            })
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::internal(INTERNAL_MESSAGE))?;
        info!(%customer, %event, enrollment = %enrollment.id, "customer enrolled in event");
        Ok(enrollment)
    }

    async fn enroll_in_program(
        &self,
        customer: CustomerId,
        program: ProgramId,
    ) -> Result<ProgramEnrollment, Error> {
        let enrollments = self
            .run_enroll(
                customer,
                program.into(),
                self.store.enroll_in_program(customer, program),
            )
            .await?;
        info!(
            %customer,
            %program,
            events = enrollments.len(),
            "customer enrolled in program"
        );
        Ok(ProgramEnrollment {
            program_id: program,
            customer_id: customer,
            enrollments,
        })
    }

    async fn un_enroll(&self, customer: CustomerId, resource: ResourceId) -> Result<(), Error> {
        let cancelled = self
            .run(resource, Operation::Cancel, self.store.cancel(customer, resource))
            .await?;
        info!(%customer, %resource, cancelled, "enrollment cancelled");
        Ok(())
    }

    async fn check_in(&self, customer: CustomerId, event: EventId) -> Result<Enrollment, Error> {
        let enrollment = self
            .run(
                event.into(),
                Operation::CheckIn,
                self.store.check_in(customer, event),
            )
            .await?;
        info!(%customer, %event, "customer checked in");
        Ok(enrollment)
    }

    async fn is_full(&self, resource: ResourceId) -> Result<bool, Error> {
        Ok(self.occupancy(resource).await?.is_full())
    }

    async fn occupancy(&self, resource: ResourceId) -> Result<Occupancy, Error> {
        self.run(resource, Operation::Inspect, self.store.occupancy(resource))
            .await
    }
}

#[cfg(test)]
#[path = "enrollment_coordinator_tests.rs"]
mod tests;
