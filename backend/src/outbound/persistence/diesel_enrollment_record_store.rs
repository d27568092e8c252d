//! PostgreSQL-backed `EnrollmentRecordStore` implementation using Diesel.
//!
//! Plain reads at the default isolation level. Program filters are expanded
//! to the program's events with a subselect on `events`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{EnrollmentRecordStore, EnrollmentRecordStoreError};
use crate::domain::{Enrollment, EnrollmentFilter, EnrollmentId, EnrollmentStatus, ResourceId};

use super::diesel_helpers::{map_record_diesel_error, map_record_pool_error};
use super::models::EnrollmentRow;
use super::pool::DbPool;
use super::schema::{enrollments, events};

/// Diesel-backed implementation of the `EnrollmentRecordStore` port.
#[derive(Clone)]
pub struct DieselEnrollmentRecordStore {
    pool: DbPool,
}

impl DieselEnrollmentRecordStore {
    /// Create a new record store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn filtered(filter: EnrollmentFilter) -> enrollments::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = enrollments::table.into_boxed();

    match filter.resource {
        Some(ResourceId::Event(event)) => {
            query = query.filter(enrollments::event_id.eq(*event.as_uuid()));
        }
        Some(ResourceId::Program(program)) => {
            let program_events = events::table
                .filter(events::program_id.eq(*program.as_uuid()))
                .select(events::id);
            query = query.filter(enrollments::event_id.eq_any(program_events));
        }
        None => {}
    }

    if let Some(customer) = filter.customer {
        query = query.filter(enrollments::customer_id.eq(*customer.as_uuid()));
    }

    match filter.status {
        EnrollmentStatus::Active => query.filter(enrollments::is_cancelled.eq(false)),
        EnrollmentStatus::Cancelled => query.filter(enrollments::is_cancelled.eq(true)),
        EnrollmentStatus::All => query,
    }
}

#[async_trait]
impl EnrollmentRecordStore for DieselEnrollmentRecordStore {
    async fn find_by_id(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentRecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_record_pool_error)?;

        let row: Option<EnrollmentRow> = enrollments::table
            .find(*id.as_uuid())
            .select(EnrollmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_record_diesel_error(err, "find_by_id"))?;

        Ok(row.map(Enrollment::from))
    }

    async fn list(
        &self,
        filter: EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, EnrollmentRecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_record_pool_error)?;

        let rows: Vec<EnrollmentRow> = filtered(filter)
            .select(EnrollmentRow::as_select())
            .order_by((enrollments::created_at.asc(), enrollments::id.asc()))
            .load(&mut conn)
            .await
            .map_err(|err| map_record_diesel_error(err, "list"))?;

        Ok(rows.into_iter().map(Enrollment::from).collect())
    }
}
