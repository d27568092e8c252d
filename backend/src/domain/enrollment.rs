//! Enrollment entity and query filters.
//!
//! An [`Enrollment`] ties one customer to one event. Program enrollment is
//! the set of per-event enrollments for every event of the program, created
//! or rejected as a unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CustomerId, EnrollmentId, EventId, ProgramId, ResourceId};

/// One customer's seat in one event.
///
/// ## Invariants
/// - At most one enrollment exists per `(customer_id, event_id)`.
/// - `is_cancelled` and `checked_in_at.is_some()` never hold together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    /// Server-assigned identifier.
    pub id: EnrollmentId,
    /// Enrolled customer.
    pub customer_id: CustomerId,
    /// Event holding the seat.
    pub event_id: EventId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set once when the customer attends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Logical deletion flag.
    pub is_cancelled: bool,
}

impl Enrollment {
    /// Whether the enrollment currently occupies a seat.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_cancelled
    }

    /// Whether the customer has attended.
    #[must_use]
    pub const fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }
}

/// Outcome of a successful program enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramEnrollment {
    /// Program the customer joined.
    pub program_id: ProgramId,
    /// Customer who joined.
    pub customer_id: CustomerId,
    /// One enrollment per event of the program.
    pub enrollments: Vec<Enrollment>,
}

/// Which enrollments a listing should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Non-cancelled enrollments.
    #[default]
    Active,
    /// Cancelled enrollments, used by reporting.
    Cancelled,
    /// Everything.
    All,
}

/// Filter accepted by the enrollment record store.
///
/// Every field is optional; an empty filter lists active enrollments across
/// all resources and customers.
///
/// # Examples
/// ```
/// use facility_backend::domain::{CustomerId, EnrollmentFilter, EnrollmentStatus, ProgramId};
///
/// let filter = EnrollmentFilter::default()
///     .for_resource(ProgramId::random())
///     .for_customer(CustomerId::random())
///     .with_status(EnrollmentStatus::Cancelled);
/// assert!(filter.resource.is_some());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFilter {
    /// Restrict to an event, or to every event of a program.
    pub resource: Option<ResourceId>,
    /// Restrict to one customer.
    pub customer: Option<CustomerId>,
    /// Status restriction.
    #[serde(default)]
    pub status: EnrollmentStatus,
}

impl EnrollmentFilter {
    /// Restrict the listing to a resource.
    #[must_use]
    pub fn for_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Restrict the listing to a customer.
    #[must_use]
    pub const fn for_customer(mut self, customer: CustomerId) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Select which statuses are listed.
    #[must_use]
    pub const fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample(cancelled: bool, checked_in: bool) -> Enrollment {
        let now = Utc::now();
        Enrollment {
            id: EnrollmentId::random(),
            customer_id: CustomerId::random(),
            event_id: EventId::random(),
            created_at: now,
            updated_at: now,
            checked_in_at: checked_in.then_some(now),
            is_cancelled: cancelled,
        }
    }

    #[rstest]
    #[case(false, false, true, false)]
    #[case(false, true, true, true)]
    #[case(true, false, false, false)]
    fn state_accessors_reflect_flags(
        #[case] cancelled: bool,
        #[case] checked_in: bool,
        #[case] active: bool,
        #[case] attended: bool,
    ) {
        let enrollment = sample(cancelled, checked_in);
        assert_eq!(enrollment.is_active(), active);
        assert_eq!(enrollment.is_checked_in(), attended);
    }

    #[rstest]
    fn default_filter_lists_active_enrollments() {
        let filter = EnrollmentFilter::default();
        assert_eq!(filter.status, EnrollmentStatus::Active);
        assert!(filter.resource.is_none());
        assert!(filter.customer.is_none());
    }

    #[rstest]
    fn filter_builders_set_fields() {
        let event = EventId::random();
        let customer = CustomerId::random();
        let filter = EnrollmentFilter::default()
            .for_resource(event)
            .for_customer(customer)
            .with_status(EnrollmentStatus::All);

        assert_eq!(filter.resource, Some(ResourceId::Event(event)));
        assert_eq!(filter.customer, Some(customer));
        assert_eq!(filter.status, EnrollmentStatus::All);
    }

    #[rstest]
    fn enrollment_serialises_camel_case_and_omits_missing_check_in() {
        let enrollment = sample(false, false);
        let json = serde_json::to_value(&enrollment).expect("serialise");
        assert!(json.get("customerId").is_some());
        assert!(json.get("isCancelled").is_some());
        assert!(json.get("checkedInAt").is_none());
    }
}
