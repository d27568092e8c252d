//! Capacity predicate evaluated by the capacity oracle.
//!
//! The store computes the live count inside the caller's transaction and
//! hands it back as an [`Occupancy`]; the decision of whether a resource is
//! full lives here so every adapter applies the same rule. Counts are never
//! cached outside the transaction that read them.

use serde::{Deserialize, Serialize};

/// Snapshot of a resource's declared capacity and its active enrollments.
///
/// ## Invariants
/// - `capacity == None` means the resource is unlimited and never full.
/// - `taken` counts active (non-cancelled) enrollments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    /// Declared seat capacity, if any.
    pub capacity: Option<u32>,
    /// Active enrollments counted in the same snapshot.
    pub taken: u64,
}

impl Occupancy {
    /// Build an occupancy snapshot.
    #[must_use]
    pub const fn new(capacity: Option<u32>, taken: u64) -> Self {
        Self { capacity, taken }
    }

    /// Whether `taken >= capacity`.
    ///
    /// # Examples
    /// ```
    /// use facility_backend::domain::Occupancy;
    ///
    /// assert!(Occupancy::new(Some(2), 2).is_full());
    /// assert!(!Occupancy::new(None, 10_000).is_full());
    /// ```
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.taken >= u64::from(capacity))
    }

    /// Seats still available, or `None` for unlimited resources.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        self.capacity
            .map(|capacity| u64::from(capacity).saturating_sub(self.taken))
    }
}

/// Convert a nullable database capacity into the domain representation.
///
/// Negative values are rejected by a check constraint; should one slip
/// through it is treated as zero seats rather than unlimited.
#[must_use]
pub fn capacity_from_db(raw: Option<i32>) -> Option<u32> {
    raw.map(|value| u32::try_from(value).unwrap_or(0))
}
