//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, update this file to match. The
//! `diesel print-schema` command can regenerate it from a live database.

diesel::table! {
    /// Customers who can hold enrollments.
    customers (id) {
        /// Primary key.
        id -> Uuid,
        /// Given name.
        first_name -> Varchar,
        /// Family name.
        last_name -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Programs grouping events under a shared capacity.
    programs (id) {
        /// Primary key.
        id -> Uuid,
        /// Unique program name.
        name -> Varchar,
        /// Maximum distinct enrolled customers; `NULL` means unlimited.
        capacity -> Nullable<Int4>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Scheduled events, optionally owned by a program.
    events (id) {
        /// Primary key.
        id -> Uuid,
        /// Owning program; `NULL` for standalone events.
        program_id -> Nullable<Uuid>,
        /// Seat capacity; `NULL` falls back to the program's capacity.
        capacity -> Nullable<Int4>,
        /// Scheduled start.
        starts_at -> Timestamptz,
        /// Scheduled end, strictly after `starts_at`.
        ends_at -> Timestamptz,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One row per `(customer_id, event_id)`; cancellation is logical.
    enrollments (id) {
        /// Primary key assigned by the database.
        id -> Uuid,
        /// Enrolled customer.
        customer_id -> Uuid,
        /// Event holding the seat.
        event_id -> Uuid,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
        /// Attendance timestamp, set at most once.
        checked_in_at -> Nullable<Timestamptz>,
        /// Logical deletion flag; cancelled rows hold no seat.
        is_cancelled -> Bool,
    }
}

diesel::joinable!(enrollments -> customers (customer_id));
diesel::joinable!(enrollments -> events (event_id));
diesel::joinable!(events -> programs (program_id));

diesel::allow_tables_to_appear_in_same_query!(customers, enrollments, events, programs);
