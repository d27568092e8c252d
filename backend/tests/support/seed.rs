//! Fixture rows for enrollment integration tests.
//!
//! Seeding uses the synchronous `postgres` client so it stays independent of
//! the adapters under test.

use chrono::{Duration, Utc};
use facility_backend::domain::{CustomerId, EventId, ProgramId};
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

/// Synchronous seeding connection.
pub struct Seeder {
    client: Client,
}

impl Seeder {
    /// Connect to the test database.
    pub fn connect(url: &str) -> Result<Self, String> {
        let client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
        Ok(Self { client })
    }

    /// Insert a customer.
    pub fn customer(&mut self) -> Result<CustomerId, String> {
        let id = Uuid::new_v4();
        self.client
            .execute(
                "INSERT INTO customers (id, first_name, last_name) VALUES ($1, $2, $3)",
                &[&id, &"Ada", &"Lovelace"],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(CustomerId::from_uuid(id))
    }

    /// Insert `count` customers.
    pub fn customers(&mut self, count: usize) -> Result<Vec<CustomerId>, String> {
        (0..count).map(|_| self.customer()).collect()
    }

    /// Insert a program with an optional capacity.
    pub fn program(&mut self, capacity: Option<i32>) -> Result<ProgramId, String> {
        let id = Uuid::new_v4();
        let name = format!("program-{id}");
        self.client
            .execute(
                "INSERT INTO programs (id, name, capacity) VALUES ($1, $2, $3)",
                &[&id, &name, &capacity],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(ProgramId::from_uuid(id))
    }

    /// Insert an event, optionally inside a program.
    pub fn event(
        &mut self,
        program: Option<ProgramId>,
        capacity: Option<i32>,
    ) -> Result<EventId, String> {
        let id = Uuid::new_v4();
        let program_id = program.map(Uuid::from);
        let starts_at = Utc::now() + Duration::days(7);
        let ends_at = starts_at + Duration::hours(2);
        self.client
            .execute(
                "INSERT INTO events (id, program_id, capacity, starts_at, ends_at) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[&id, &program_id, &capacity, &starts_at, &ends_at],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(EventId::from_uuid(id))
    }

    /// Count enrollment rows, active or not, for a customer in the given events.
    pub fn rows_for(&mut self, customer: CustomerId, events: &[EventId]) -> Result<i64, String> {
        let event_ids: Vec<Uuid> = events.iter().map(|event| Uuid::from(*event)).collect();
        let row = self
            .client
            .query_one(
                "SELECT count(*) FROM enrollments WHERE customer_id = $1 AND event_id = ANY($2)",
                &[&Uuid::from(customer), &event_ids],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    /// Count active enrollments in an event.
    pub fn active_in_event(&mut self, event: EventId) -> Result<i64, String> {
        let row = self
            .client
            .query_one(
                "SELECT count(*) FROM enrollments WHERE event_id = $1 AND NOT is_cancelled",
                &[&Uuid::from(event)],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }

    /// Distinct customers holding an active enrollment in any program event.
    pub fn active_customers_in_program(&mut self, program: ProgramId) -> Result<i64, String> {
        let row = self
            .client
            .query_one(
                "SELECT count(DISTINCT en.customer_id) FROM enrollments en \
                 JOIN events e ON e.id = en.event_id \
                 WHERE e.program_id = $1 AND NOT en.is_cancelled",
                &[&Uuid::from(program)],
            )
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }
}
