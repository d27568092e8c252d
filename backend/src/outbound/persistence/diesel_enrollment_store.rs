//! PostgreSQL-backed `EnrollmentStore` implementation using Diesel.
//!
//! Every write runs in a `READ COMMITTED` transaction. Enrollments first lock
//! the rows that own the seats with `SELECT ... FOR UPDATE`: the program row
//! when there is one, then the event rows in id order. Racers on the same
//! resource queue on those locks, and each `INSERT ... SELECT` counts seats
//! only after the previous holder committed, so a loser sees the seat gone and
//! is told the resource is full. Serialization failures can still surface from
//! the database and are never retried here.
//!
//! A cancelled row is reactivated in place through
//! `ON CONFLICT ... DO UPDATE ... WHERE enrollments.is_cancelled`, keeping one
//! row per `(customer_id, event_id)`. When a write affects no row the adapter
//! explains why with existence checks read in the same transaction.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Uuid as SqlUuid;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{EnrollmentStore, EnrollmentStoreError};
use crate::domain::{
    capacity_from_db, CustomerId, Enrollment, EventId, Occupancy, ProgramId, ResourceId,
};

use super::diesel_helpers::{count_from_db, map_diesel_error, map_pool_error};
use super::models::{CountRow, DiagnosisRow, EnrollmentRow, OccupancyRow};
use super::pool::DbPool;
use super::schema::{enrollments, events, programs};

const RETURNING_ENROLLMENT: &str =
    "RETURNING id, customer_id, event_id, created_at, updated_at, checked_in_at, is_cancelled";

const REACTIVATE_ON_CONFLICT: &str = "ON CONFLICT (customer_id, event_id) DO UPDATE \
     SET is_cancelled = false, checked_in_at = NULL, updated_at = now() \
     WHERE enrollments.is_cancelled";

/// Insert one event enrollment when a seat is free.
///
/// `$1` customer, `$2` event. An event without its own capacity inherits its
/// program's; neither set means unlimited.
const ENROLL_EVENT_SQL: &str = "\
WITH target AS (
    SELECT e.id, COALESCE(e.capacity, p.capacity) AS capacity
    FROM events e
    LEFT JOIN programs p ON p.id = e.program_id
    WHERE e.id = $2
),
taken AS (
    SELECT count(*) AS n
    FROM enrollments
    WHERE event_id = $2 AND NOT is_cancelled
)
INSERT INTO enrollments (customer_id, event_id)
SELECT $1, target.id
FROM target, taken
WHERE target.capacity IS NULL OR taken.n < target.capacity";

/// Insert one enrollment per program event whose seat predicate holds.
///
/// `$1` customer, `$2` program.
const ENROLL_PROGRAM_SQL: &str = "\
WITH targets AS (
    SELECT e.id,
           COALESCE(e.capacity, p.capacity) AS capacity,
           (SELECT count(*) FROM enrollments en
            WHERE en.event_id = e.id AND NOT en.is_cancelled) AS taken
    FROM events e
    JOIN programs p ON p.id = e.program_id
    WHERE e.program_id = $2
)
INSERT INTO enrollments (customer_id, event_id)
SELECT $1, t.id
FROM targets t
WHERE t.capacity IS NULL OR t.taken < t.capacity";

/// Distinct customers other than `$2` actively enrolled in program `$1`.
const PROGRAM_OTHER_CUSTOMERS_SQL: &str = "\
SELECT count(DISTINCT en.customer_id) AS count
FROM enrollments en
JOIN events e ON e.id = en.event_id
WHERE e.program_id = $1 AND NOT en.is_cancelled AND en.customer_id <> $2";

const EVENT_OCCUPANCY_SQL: &str = "\
SELECT COALESCE(e.capacity, p.capacity) AS capacity,
       (SELECT count(*) FROM enrollments en
        WHERE en.event_id = e.id AND NOT en.is_cancelled) AS taken
FROM events e
LEFT JOIN programs p ON p.id = e.program_id
WHERE e.id = $1";

const PROGRAM_OCCUPANCY_SQL: &str = "\
SELECT p.capacity AS capacity,
       (SELECT count(DISTINCT en.customer_id) FROM enrollments en
        JOIN events e ON e.id = en.event_id
        WHERE e.program_id = p.id AND NOT en.is_cancelled) AS taken
FROM programs p
WHERE p.id = $1";

const EVENT_DIAGNOSIS_SQL: &str = "\
SELECT EXISTS (SELECT 1 FROM events WHERE id = $1) AS resource_exists,
       EXISTS (SELECT 1 FROM customers WHERE id = $2) AS customer_exists,
       (SELECT count(*) FROM enrollments
        WHERE event_id = $1 AND customer_id = $2 AND NOT is_cancelled) AS active,
       (SELECT count(*) FROM enrollments
        WHERE event_id = $1 AND customer_id = $2 AND NOT is_cancelled
          AND checked_in_at IS NOT NULL) AS checked_in";

const PROGRAM_DIAGNOSIS_SQL: &str = "\
SELECT EXISTS (SELECT 1 FROM programs WHERE id = $1) AS resource_exists,
       EXISTS (SELECT 1 FROM customers WHERE id = $2) AS customer_exists,
       (SELECT count(*) FROM enrollments en JOIN events e ON e.id = en.event_id
        WHERE e.program_id = $1 AND en.customer_id = $2 AND NOT en.is_cancelled) AS active,
       (SELECT count(*) FROM enrollments en JOIN events e ON e.id = en.event_id
        WHERE e.program_id = $1 AND en.customer_id = $2 AND NOT en.is_cancelled
          AND en.checked_in_at IS NOT NULL) AS checked_in";

const CANCEL_EVENT_SQL: &str = "\
UPDATE enrollments
SET is_cancelled = true, updated_at = now()
WHERE customer_id = $1 AND event_id = $2
  AND NOT is_cancelled AND checked_in_at IS NULL";

const CANCEL_PROGRAM_SQL: &str = "\
UPDATE enrollments en
SET is_cancelled = true, updated_at = now()
FROM events e
WHERE e.id = en.event_id AND e.program_id = $2 AND en.customer_id = $1
  AND NOT en.is_cancelled AND en.checked_in_at IS NULL";

const CHECK_IN_SQL: &str = "\
UPDATE enrollments
SET checked_in_at = now(), updated_at = now()
WHERE customer_id = $1 AND event_id = $2
  AND NOT is_cancelled AND checked_in_at IS NULL";

/// Failure raised inside a transaction closure.
///
/// Returning `Rejected` from the closure rolls the transaction back while
/// keeping the diagnosis made before the rollback.
#[derive(Debug)]
enum TxError {
    Diesel(diesel::result::Error),
    Rejected(EnrollmentStoreError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl TxError {
    fn into_store_error(self, operation: &str) -> EnrollmentStoreError {
        match self {
            Self::Diesel(error) => map_diesel_error(error, operation),
            Self::Rejected(error) => error,
        }
    }
}

/// Why a write matched no row, read inside the failed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Diagnosis {
    resource_exists: bool,
    customer_exists: bool,
    active: u64,
    checked_in: u64,
}

impl From<DiagnosisRow> for Diagnosis {
    fn from(row: DiagnosisRow) -> Self {
        Self {
            resource_exists: row.resource_exists,
            customer_exists: row.customer_exists,
            active: count_from_db(row.active),
            checked_in: count_from_db(row.checked_in),
        }
    }
}

impl Diagnosis {
    fn missing_reference(
        &self,
        customer: CustomerId,
        resource: ResourceId,
    ) -> Option<EnrollmentStoreError> {
        if !self.resource_exists {
            Some(EnrollmentStoreError::resource_missing(resource))
        } else if !self.customer_exists {
            Some(EnrollmentStoreError::customer_missing(customer))
        } else {
            None
        }
    }

    /// Discount rows written earlier in the same transaction.
    fn excluding_written(self, written: u64) -> Self {
        Self {
            active: self.active.saturating_sub(written),
            ..self
        }
    }

    /// Explain an enrollment insert that produced fewer rows than expected.
    fn enroll_rejection(&self, customer: CustomerId, resource: ResourceId) -> EnrollmentStoreError {
        self.missing_reference(customer, resource)
            .unwrap_or_else(|| {
                if self.active > 0 {
                    EnrollmentStoreError::already_enrolled(customer, resource)
                } else {
                    EnrollmentStoreError::capacity_reached(resource)
                }
            })
    }

    /// Explain a cancel or check-in update that matched no row.
    fn update_rejection(&self, customer: CustomerId, resource: ResourceId) -> EnrollmentStoreError {
        self.missing_reference(customer, resource)
            .unwrap_or_else(|| {
                if self.checked_in > 0 {
                    EnrollmentStoreError::already_checked_in(customer, resource)
                } else {
                    EnrollmentStoreError::not_enrolled(customer, resource)
                }
            })
    }
}

async fn diagnose(
    conn: &mut AsyncPgConnection,
    customer: CustomerId,
    resource: ResourceId,
) -> Result<Diagnosis, diesel::result::Error> {
    let sql = match resource {
        ResourceId::Event(_) => EVENT_DIAGNOSIS_SQL,
        ResourceId::Program(_) => PROGRAM_DIAGNOSIS_SQL,
    };
    let row: DiagnosisRow = sql_query(sql)
        .bind::<SqlUuid, _>(*resource.as_uuid())
        .bind::<SqlUuid, _>(*customer.as_uuid())
        .get_result(conn)
        .await?;
    Ok(row.into())
}

async fn read_occupancy(
    conn: &mut AsyncPgConnection,
    resource: ResourceId,
) -> Result<Option<Occupancy>, diesel::result::Error> {
    let sql = match resource {
        ResourceId::Event(_) => EVENT_OCCUPANCY_SQL,
        ResourceId::Program(_) => PROGRAM_OCCUPANCY_SQL,
    };
    let row: Option<OccupancyRow> = sql_query(sql)
        .bind::<SqlUuid, _>(*resource.as_uuid())
        .get_result(conn)
        .await
        .optional()?;
    Ok(row.map(Into::into))
}

/// Lock the program row and read its capacity.
///
/// Every enrollment touching a program takes this lock before any event lock,
/// so racers on one program queue here instead of deadlocking.
async fn lock_program(
    conn: &mut AsyncPgConnection,
    program: ProgramId,
) -> Result<Option<u32>, TxError> {
    let capacity: Option<Option<i32>> = programs::table
        .find(*program.as_uuid())
        .select(programs::capacity)
        .for_update()
        .get_result(conn)
        .await
        .optional()?;
    capacity
        .map(capacity_from_db)
        .ok_or_else(|| TxError::Rejected(EnrollmentStoreError::resource_missing(program)))
}

/// Lock the program's events in id order and return how many there are.
async fn lock_program_events(
    conn: &mut AsyncPgConnection,
    program: ProgramId,
) -> Result<u64, diesel::result::Error> {
    let locked: Vec<Uuid> = events::table
        .filter(events::program_id.eq(*program.as_uuid()))
        .select(events::id)
        .order(events::id)
        .for_update()
        .load(conn)
        .await?;
    Ok(locked.len() as u64)
}

async fn lock_event(
    conn: &mut AsyncPgConnection,
    event: EventId,
) -> Result<(), diesel::result::Error> {
    let _: Uuid = events::table
        .find(*event.as_uuid())
        .select(events::id)
        .for_update()
        .get_result(conn)
        .await?;
    Ok(())
}

/// Reject when the program already holds `capacity` customers besides this one.
///
/// The caller must hold the program lock so the count cannot move underneath.
async fn check_program_seat(
    conn: &mut AsyncPgConnection,
    customer: CustomerId,
    program: ProgramId,
    capacity: Option<u32>,
) -> Result<(), TxError> {
    if capacity.is_none() {
        return Ok(());
    }
    let others: CountRow = sql_query(PROGRAM_OTHER_CUSTOMERS_SQL)
        .bind::<SqlUuid, _>(*program.as_uuid())
        .bind::<SqlUuid, _>(*customer.as_uuid())
        .get_result(conn)
        .await?;
    if Occupancy::new(capacity, count_from_db(others.count)).is_full() {
        return Err(TxError::Rejected(EnrollmentStoreError::capacity_reached(
            program,
        )));
    }
    Ok(())
}

fn reactivating_insert(base: &str) -> String {
    format!("{base}\n{REACTIVATE_ON_CONFLICT}\n{RETURNING_ENROLLMENT}")
}

/// Diesel-backed implementation of the `EnrollmentStore` port.
#[derive(Clone)]
pub struct DieselEnrollmentStore {
    pool: DbPool,
}

impl DieselEnrollmentStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for DieselEnrollmentStore {
    async fn enroll_in_event(
        &self,
        customer: CustomerId,
        event: EventId,
    ) -> Result<Enrollment, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let resource = ResourceId::Event(event);
        let event_uuid = *event.as_uuid();
        let insert = reactivating_insert(ENROLL_EVENT_SQL);

        conn.build_transaction()
            .read_committed()
            .run(|conn| {
                async move {
                    let owner: Option<Option<Uuid>> = events::table
                        .find(event_uuid)
                        .select(events::program_id)
                        .get_result(conn)
                        .await
                        .optional()?;
                    let Some(owner) = owner else {
                        return Err(TxError::Rejected(EnrollmentStoreError::resource_missing(
                            resource,
                        )));
                    };

                    if let Some(program_uuid) = owner {
                        let program = ProgramId::from(program_uuid);
                        let capacity = lock_program(conn, program).await?;
                        check_program_seat(conn, customer, program, capacity).await?;
                    }
                    lock_event(conn, event).await?;

                    let row: Option<EnrollmentRow> = sql_query(insert)
                        .bind::<SqlUuid, _>(*customer.as_uuid())
                        .bind::<SqlUuid, _>(event_uuid)
                        .get_result(conn)
                        .await
                        .optional()?;

                    match row {
                        Some(row) => Ok(Enrollment::from(row)),
                        None => {
                            let diagnosis = diagnose(conn, customer, resource).await?;
                            Err(TxError::Rejected(
                                diagnosis.enroll_rejection(customer, resource),
                            ))
                        }
                    }
                }
                .scope_boxed()
            })
            .await
            .map_err(|err: TxError| err.into_store_error("enroll_in_event"))
    }

    async fn enroll_in_program(
        &self,
        customer: CustomerId,
        program: ProgramId,
    ) -> Result<Vec<Enrollment>, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let resource = ResourceId::Program(program);
        let program_uuid = *program.as_uuid();
        let insert = reactivating_insert(ENROLL_PROGRAM_SQL);

        conn.build_transaction()
            .read_committed()
            .run(|conn| {
                async move {
                    let capacity = lock_program(conn, program).await?;

                    let event_count = lock_program_events(conn, program).await?;
                    if event_count == 0 {
                        return Err(TxError::Rejected(EnrollmentStoreError::empty_program(
                            program,
                        )));
                    }

                    check_program_seat(conn, customer, program, capacity).await?;

                    let mut rows: Vec<EnrollmentRow> = sql_query(insert)
                        .bind::<SqlUuid, _>(*customer.as_uuid())
                        .bind::<SqlUuid, _>(program_uuid)
                        .load(conn)
                        .await?;

                    let written = rows.len() as u64;
                    if event_count > written {
                        let diagnosis = diagnose(conn, customer, resource)
                            .await?
                            .excluding_written(written);
                        return Err(TxError::Rejected(
                            diagnosis.enroll_rejection(customer, resource),
                        ));
                    }

                    rows.sort_by_key(|row| row.event_id);
                    Ok(rows.into_iter().map(Enrollment::from).collect())
                }
                .scope_boxed()
            })
            .await
            .map_err(|err: TxError| err.into_store_error("enroll_in_program"))
    }

    async fn cancel(
        &self,
        customer: CustomerId,
        resource: ResourceId,
    ) -> Result<u64, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let sql = match resource {
            ResourceId::Event(_) => CANCEL_EVENT_SQL,
            ResourceId::Program(_) => CANCEL_PROGRAM_SQL,
        };

        conn.build_transaction()
            .read_committed()
            .run(|conn| {
                async move {
                    let cancelled = sql_query(sql)
                        .bind::<SqlUuid, _>(*customer.as_uuid())
                        .bind::<SqlUuid, _>(*resource.as_uuid())
                        .execute(conn)
                        .await?;
                    if cancelled == 0 {
                        let diagnosis = diagnose(conn, customer, resource).await?;
                        return Err(TxError::Rejected(
                            diagnosis.update_rejection(customer, resource),
                        ));
                    }
                    Ok(cancelled as u64)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err: TxError| err.into_store_error("cancel"))
    }

    async fn check_in(
        &self,
        customer: CustomerId,
        event: EventId,
    ) -> Result<Enrollment, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let resource = ResourceId::Event(event);
        let update = format!("{CHECK_IN_SQL}\n{RETURNING_ENROLLMENT}");

        conn.build_transaction()
            .read_committed()
            .run(|conn| {
                async move {
                    let row: Option<EnrollmentRow> = sql_query(update)
                        .bind::<SqlUuid, _>(*customer.as_uuid())
                        .bind::<SqlUuid, _>(*event.as_uuid())
                        .get_result(conn)
                        .await
                        .optional()?;
                    match row {
                        Some(row) => Ok(Enrollment::from(row)),
                        None => {
                            let diagnosis = diagnose(conn, customer, resource).await?;
                            Err(TxError::Rejected(
                                diagnosis.update_rejection(customer, resource),
                            ))
                        }
                    }
                }
                .scope_boxed()
            })
            .await
            .map_err(|err: TxError| err.into_store_error("check_in"))
    }

    async fn held_enrollments(
        &self,
        customer: CustomerId,
        resource: ResourceId,
    ) -> Result<Option<Vec<Enrollment>>, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let query = enrollments::table
            .filter(enrollments::customer_id.eq(*customer.as_uuid()))
            .filter(enrollments::is_cancelled.eq(false))
            .into_boxed();
        let (query, expected) = match resource {
            ResourceId::Event(event) => (
                query.filter(enrollments::event_id.eq(*event.as_uuid())),
                1,
            ),
            ResourceId::Program(program) => {
                let expected: i64 = events::table
                    .filter(events::program_id.eq(*program.as_uuid()))
                    .count()
                    .get_result(&mut conn)
                    .await
                    .map_err(|err| map_diesel_error(err, "held_enrollments"))?;
                let program_events = events::table
                    .filter(events::program_id.eq(*program.as_uuid()))
                    .select(events::id);
                (
                    query.filter(enrollments::event_id.eq_any(program_events)),
                    count_from_db(expected),
                )
            }
        };

        let rows: Vec<EnrollmentRow> = query
            .select(EnrollmentRow::as_select())
            .order_by(enrollments::event_id.asc())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "held_enrollments"))?;

        if expected == 0 || (rows.len() as u64) < expected {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().map(Enrollment::from).collect()))
    }

    async fn occupancy(&self, resource: ResourceId) -> Result<Occupancy, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        read_occupancy(&mut conn, resource)
            .await
            .map_err(|err| map_diesel_error(err, "occupancy"))?
            .ok_or_else(|| EnrollmentStoreError::resource_missing(resource))
    }
}
