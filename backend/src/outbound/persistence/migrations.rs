//! Embedded schema migrations.
//!
//! The SQL under `backend/migrations` is compiled into the binary so the admin
//! CLI and the integration tests apply exactly the schema the adapters were
//! built against.

use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

/// Migrations from the `backend/migrations` directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },
    /// A migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
}

/// Apply every pending migration and return the names of those applied.
///
/// Blocking; call it before the async runtime starts or from
/// `spawn_blocking`.
///
/// # Errors
///
/// Returns [`MigrationError::Connect`] when the URL cannot be reached and
/// [`MigrationError::Apply`] when a migration fails.
pub fn run_migrations(database_url: &str) -> Result<Vec<String>, MigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| MigrationError::Connect {
        message: err.to_string(),
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;
    let names: Vec<String> = applied.iter().map(ToString::to_string).collect();
    info!(count = names.len(), "applied pending migrations");
    Ok(names)
}
