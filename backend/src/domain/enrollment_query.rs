//! Enrollment query service.
//!
//! Read-only listing over the enrollment record store. Reads here are plain
//! snapshots and play no part in admission control.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::domain::enrollment_classifier::INTERNAL_MESSAGE;
use crate::domain::ports::{EnrollmentQuery, EnrollmentRecordStore, EnrollmentRecordStoreError};
use crate::domain::{Enrollment, EnrollmentFilter, EnrollmentId, Error};

fn map_record_store_error(error: EnrollmentRecordStoreError) -> Error {
    error!(error = %error, "enrollment record store failure");
    Error::internal(INTERNAL_MESSAGE)
}

/// Enrollment service implementing the query driving port.
#[derive(Clone)]
pub struct EnrollmentQueryService<R> {
    record_store: Arc<R>,
}

impl<R> EnrollmentQueryService<R> {
    /// Create a new query service with the enrollment record store.
    pub fn new(record_store: Arc<R>) -> Self {
        Self { record_store }
    }
}

#[async_trait]
impl<R> EnrollmentQuery for EnrollmentQueryService<R>
where
    R: EnrollmentRecordStore,
{
    async fn list_enrollments(&self, filter: EnrollmentFilter) -> Result<Vec<Enrollment>, Error> {
        self.record_store
            .list(filter)
            .await
            .map_err(map_record_store_error)
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, Error> {
        self.record_store
            .find_by_id(id)
            .await
            .map_err(map_record_store_error)?
            .ok_or_else(|| Error::not_found(format!("enrollment {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::ports::MockEnrollmentRecordStore;
    use crate::domain::{CustomerId, EnrollmentStatus, ErrorCode, EventId, ProgramId};

    fn sample_enrollment() -> Enrollment {
        let now = Utc::now();
        Enrollment {
            id: EnrollmentId::random(),
            customer_id: CustomerId::random(),
            event_id: EventId::random(),
            created_at: now,
            updated_at: now,
            checked_in_at: None,
            is_cancelled: false,
        }
    }

    #[tokio::test]
    async fn list_passes_the_filter_through() {
        let program = ProgramId::random();
        let filter = EnrollmentFilter::default()
            .for_resource(program)
            .with_status(EnrollmentStatus::All);
        let rows = vec![sample_enrollment()];
        let returned = rows.clone();

        let mut store = MockEnrollmentRecordStore::new();
        store
            .expect_list()
            .withf(move |f| *f == filter)
            .times(1)
            .return_once(move |_| Ok(returned));

        let service = EnrollmentQueryService::new(Arc::new(store));
        let listed = service
            .list_enrollments(filter)
            .await
            .expect("listing succeeds");

        assert_eq!(listed, rows);
    }

    #[tokio::test]
    async fn get_maps_absent_rows_to_not_found() {
        let mut store = MockEnrollmentRecordStore::new();
        store.expect_find_by_id().times(1).return_once(|_| Ok(None));

        let service = EnrollmentQueryService::new(Arc::new(store));
        let error = service
            .get_enrollment(EnrollmentId::random())
            .await
            .expect_err("missing enrollment");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn get_returns_existing_rows() {
        let enrollment = sample_enrollment();
        let returned = enrollment.clone();
        let mut store = MockEnrollmentRecordStore::new();
        store
            .expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(returned)));

        let service = EnrollmentQueryService::new(Arc::new(store));
        let found = service
            .get_enrollment(enrollment.id)
            .await
            .expect("lookup succeeds");

        assert_eq!(found, enrollment);
    }

    #[tokio::test]
    async fn store_failures_are_redacted() {
        let mut store = MockEnrollmentRecordStore::new();
        store
            .expect_list()
            .times(1)
            .return_once(|_| Err(EnrollmentRecordStoreError::query("syntax error at or near")));

        let service = EnrollmentQueryService::new(Arc::new(store));
        let error = service
            .list_enrollments(EnrollmentFilter::default())
            .await
            .expect_err("query failure");

        assert_eq!(error.code(), ErrorCode::InternalError);
        assert_eq!(error.message(), INTERNAL_MESSAGE);
    }
}
