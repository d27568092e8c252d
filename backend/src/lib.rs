//! Enrollment admission control for capacity-bound events and programs.
//!
//! Customers enroll into single events or into whole programs. Capacity is
//! enforced by the database under row locks on the seat-owning rows; the coordinator
//! classifies every failure into `Conflict`, `NotFound`, or `Internal`.
//!
//! - [`domain`]: identifiers, entities, ports, and services.
//! - [`outbound`]: Diesel/PostgreSQL adapters for the store ports.
//! - [`inbound`]: HTTP status mapping for domain errors.
//! - [`settings`]: configuration loaded with `ortho_config`.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
