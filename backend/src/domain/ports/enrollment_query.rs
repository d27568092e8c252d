//! Driving port for enrollment reads.

use async_trait::async_trait;

use crate::domain::{Enrollment, EnrollmentFilter, EnrollmentId, Error};

/// Enrollment listing for reporting and account pages.
#[async_trait]
pub trait EnrollmentQuery: Send + Sync {
    /// List enrollments matching the filter.
    async fn list_enrollments(&self, filter: EnrollmentFilter) -> Result<Vec<Enrollment>, Error>;

    /// Fetch one enrollment, failing with `NotFound` when it does not exist.
    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, Error>;
}
