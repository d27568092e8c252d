//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer, Nullable};
use uuid::Uuid;

use crate::domain::{capacity_from_db, Enrollment, Occupancy};

use super::schema::enrollments;

/// Row struct for reading from the enrollments table.
///
/// Also loadable from raw SQL `RETURNING` clauses, hence `QueryableByName`.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub is_cancelled: bool,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            id: row.id.into(),
            customer_id: row.customer_id.into(),
            event_id: row.event_id.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            checked_in_at: row.checked_in_at,
            is_cancelled: row.is_cancelled,
        }
    }
}

/// Capacity and live count read by the occupancy queries.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct OccupancyRow {
    #[diesel(sql_type = Nullable<Integer>)]
    pub capacity: Option<i32>,
    #[diesel(sql_type = BigInt)]
    pub taken: i64,
}

impl From<OccupancyRow> for Occupancy {
    fn from(row: OccupancyRow) -> Self {
        Self::new(
            capacity_from_db(row.capacity),
            u64::try_from(row.taken).unwrap_or(0),
        )
    }
}

/// Existence checks used to explain a rejected write.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct DiagnosisRow {
    #[diesel(sql_type = Bool)]
    pub resource_exists: bool,
    #[diesel(sql_type = Bool)]
    pub customer_exists: bool,
    #[diesel(sql_type = BigInt)]
    pub active: i64,
    #[diesel(sql_type = BigInt)]
    pub checked_in: i64,
}

/// Single count column.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}
