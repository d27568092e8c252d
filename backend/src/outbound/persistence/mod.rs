//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the enrollment store ports backed by
//! PostgreSQL via `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: the stores translate between Diesel rows and domain
//!   types. Admission decisions live in SQL predicates evaluated inside the
//!   transaction, never in Rust-side counters.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) are never exposed to the domain layer.
//! - **Strongly typed errors**: database errors are mapped to the port error
//!   enums with constraint names preserved.
//!
//! # Example
//!
//! ```ignore
//! use facility_backend::outbound::persistence::{DbPool, DieselEnrollmentStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/facility")).await?;
//! let store = DieselEnrollmentStore::new(pool);
//! ```

mod diesel_enrollment_record_store;
mod diesel_enrollment_store;
pub(crate) mod diesel_helpers;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_enrollment_record_store::DieselEnrollmentRecordStore;
pub use diesel_enrollment_store::DieselEnrollmentStore;
pub use migrations::{run_migrations, MigrationError, MIGRATIONS};
pub use pool::{DbPool, PoolConfig, PoolError};
