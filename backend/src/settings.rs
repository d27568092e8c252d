//! Enrollment configuration loaded via OrthoConfig.
//!
//! Values come from `ENROLLMENT_*` environment variables or a configuration
//! file. Every field is optional; accessors supply the defaults.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::persistence::PoolConfig;

/// Configuration values for the enrollment store and coordinator.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ENROLLMENT")]
pub struct EnrollmentSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum pooled connections, which also caps concurrent enrollments.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept open.
    pub pool_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout_secs: Option<u64>,
    /// Upper bound on one enrollment attempt, in milliseconds.
    pub attempt_timeout_ms: Option<u64>,
}

impl EnrollmentSettings {
    /// Configured database URL, if any.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Maximum pool size, falling back to the pool default.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(PoolConfig::DEFAULT_MAX_SIZE)
    }

    /// Minimum idle connections, falling back to the pool default.
    pub fn pool_min_idle(&self) -> u32 {
        self.pool_min_idle.unwrap_or(PoolConfig::DEFAULT_MIN_IDLE)
    }

    /// Connection checkout timeout, falling back to the pool default.
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout_secs
            .map_or(PoolConfig::DEFAULT_CONNECTION_TIMEOUT, Duration::from_secs)
    }

    /// Per-attempt timeout; `None` leaves attempts unbounded.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    /// Build the pool configuration for `database_url`.
    ///
    /// The minimum idle count is clamped to the maximum size.
    pub fn pool_config(&self, database_url: impl Into<String>) -> PoolConfig {
        let max_size = self.pool_max_size().max(1);
        PoolConfig::new(database_url)
            .with_max_size(max_size)
            .with_min_idle(Some(self.pool_min_idle().min(max_size)))
            .with_connection_timeout(self.connection_timeout())
    }
}
