//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod enrollment_command;
mod enrollment_query;
mod enrollment_record_store;
mod enrollment_store;

pub use enrollment_command::EnrollmentCommand;
pub use enrollment_query::EnrollmentQuery;
#[cfg(test)]
pub use enrollment_record_store::MockEnrollmentRecordStore;
pub use enrollment_record_store::{EnrollmentRecordStore, EnrollmentRecordStoreError};
#[cfg(test)]
pub use enrollment_store::MockEnrollmentStore;
pub use enrollment_store::{EnrollmentStore, EnrollmentStoreError};
