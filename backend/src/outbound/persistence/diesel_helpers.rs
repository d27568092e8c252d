//! Shared error mapping for the Diesel enrollment adapters.
//!
//! PostgreSQL reports the signals the enrollment classifier cares about as
//! SQLSTATE classes: `23505` unique violation, `23503` foreign key violation,
//! and `40001` serialization failure. Diesel surfaces these as
//! [`DatabaseErrorKind`] variants; everything else collapses into query or
//! connection failures.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{EnrollmentRecordStoreError, EnrollmentStoreError};

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
        timed_out @ PoolError::TimedOut { .. } => timed_out.to_string(),
    }
}

/// Map pool errors to enrollment store connection errors.
pub fn map_pool_error(error: PoolError) -> EnrollmentStoreError {
    EnrollmentStoreError::connection(map_pool_error_message(error))
}

/// Map pool errors to enrollment record store connection errors.
pub fn map_record_pool_error(error: PoolError) -> EnrollmentRecordStoreError {
    EnrollmentRecordStoreError::connection(map_pool_error_message(error))
}

fn log_diesel_error(error: &DieselError, operation: &str) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = ?info.constraint_name(),
                operation,
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            operation,
            "diesel operation failed"
        ),
    }
}

/// Map Diesel errors to enrollment store errors.
///
/// Constraint names are kept so the classifier can tell a missing customer
/// from a missing event.
pub fn map_diesel_error(error: DieselError, operation: &str) -> EnrollmentStoreError {
    log_diesel_error(&error, operation);

    match error {
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => EnrollmentStoreError::unique_violation(
                info.constraint_name().unwrap_or("unique constraint"),
            ),
            DatabaseErrorKind::ForeignKeyViolation => EnrollmentStoreError::foreign_key_violation(
                info.constraint_name().unwrap_or("foreign key constraint"),
            ),
            DatabaseErrorKind::SerializationFailure => {
                EnrollmentStoreError::serialization_failure(info.message())
            }
            DatabaseErrorKind::ClosedConnection => {
                EnrollmentStoreError::connection("database connection error")
            }
            _ => EnrollmentStoreError::query(info.message()),
        },
        DieselError::NotFound => EnrollmentStoreError::query("record not found"),
        DieselError::QueryBuilderError(_) => EnrollmentStoreError::query("database query error"),
        DieselError::BrokenTransactionManager => {
            EnrollmentStoreError::connection("transaction manager is broken")
        }
        DieselError::DeserializationError(err) => {
            EnrollmentStoreError::query(format!("row decoding failed: {err}"))
        }
        _ => EnrollmentStoreError::query("database error"),
    }
}

/// Map Diesel errors to enrollment record store errors.
pub fn map_record_diesel_error(error: DieselError, operation: &str) -> EnrollmentRecordStoreError {
    log_diesel_error(&error, operation);

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            EnrollmentRecordStoreError::connection("database connection error")
        }
        DieselError::QueryBuilderError(_) => {
            EnrollmentRecordStoreError::query("database query error")
        }
        _ => EnrollmentRecordStoreError::query("database error"),
    }
}

/// Convert a non-negative row count reported by PostgreSQL.
pub fn count_from_db(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
