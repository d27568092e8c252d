//! Port for read-only access to enrollment rows.
//!
//! The record store is a query façade for reporting and listing. It never
//! writes and sits outside the concurrency-critical path.

use async_trait::async_trait;

use crate::domain::{Enrollment, EnrollmentFilter, EnrollmentId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by enrollment record store adapters.
    pub enum EnrollmentRecordStoreError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "enrollment record store connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "enrollment record store query failed: {message}",
    }
}

/// Filtered point and range reads over enrollments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRecordStore: Send + Sync {
    /// Fetch one enrollment by identifier.
    async fn find_by_id(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentRecordStoreError>;

    /// List enrollments matching the filter, oldest first.
    async fn list(
        &self,
        filter: EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, EnrollmentRecordStoreError>;
}
