//! Bus session management
//!
//! One long-lived connection, opened explicitly and handed to whatever
//! needs to talk to the Bluetooth daemon. Nothing here is process-global.

use std::time::Duration;
use tracing::{debug, info, warn};
use zbus::Connection;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::types::BusType;

/// An open connection to the bus hosting the Bluetooth daemon
#[derive(Debug, Clone)]
pub struct BusSession {
    connection: Connection,
    config: SessionConfig,
}

impl BusSession {
    /// Connect with retries and exponential backoff
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let connection = try_connect(&config).await?;
        info!(
            bus = %config.bus_type,
            service = %config.service,
            unique_name = ?connection.unique_name().map(|n| n.as_str()),
            "Connected to bus"
        );
        Ok(Self { connection, config })
    }

    /// Connect using `BLUEZ_*` environment settings
    pub async fn from_env() -> Result<Self> {
        Self::connect(SessionConfig::from_env()).await
    }

    /// Wrap an already established connection
    pub fn with_connection(connection: Connection, config: SessionConfig) -> Self {
        Self { connection, config }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Well-known name handles are addressed to
    pub fn service(&self) -> &str {
        &self.config.service
    }

    pub fn is_connected(&self) -> bool {
        self.connection.unique_name().is_some()
    }

    /// Close the connection. Clones of this session share the same
    /// connection and stop working too.
    pub async fn close(self) -> Result<()> {
        self.connection.close().await?;
        info!(bus = %self.config.bus_type, "Closed bus connection");
        Ok(())
    }
}

/// Upper bound for the pause between connect attempts
const MAX_BACKOFF_MS: u64 = 5000;

/// Why the last connect attempt failed
enum Failure {
    Bus(zbus::Error),
    TimedOut,
}

/// Exponential backoff from 100ms, capped at `MAX_BACKOFF_MS`
fn backoff_delay(attempt: u32) -> Duration {
    let ms = 2u64
        .saturating_pow(attempt.saturating_sub(1))
        .saturating_mul(100);
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

async fn try_connect(config: &SessionConfig) -> Result<Connection> {
    let mut last_failure = None;
    let timeout = Duration::from_millis(config.timeout_ms);

    for attempt in 1..=config.max_retries {
        debug!("Connection attempt {} for {} bus", attempt, config.bus_type);

        let pending = async {
            match config.bus_type {
                BusType::System => Connection::system().await,
                BusType::Session => Connection::session().await,
            }
        };

        match tokio::time::timeout(timeout, pending).await {
            Ok(Ok(conn)) => return Ok(conn),
            Ok(Err(e)) => {
                warn!("Connection attempt {} failed: {}", attempt, e);
                last_failure = Some(Failure::Bus(e));
            }
            Err(_) => {
                warn!(
                    "Connection attempt {} timed out after {}ms",
                    attempt, config.timeout_ms
                );
                last_failure = Some(Failure::TimedOut);
            }
        }

        if attempt < config.max_retries {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    Err(match last_failure {
        Some(Failure::TimedOut) => Error::Timeout(format!(
            "connecting to {} bus: timed out after {}ms",
            config.bus_type, config.timeout_ms
        )),
        Some(Failure::Bus(e)) => Error::connection(format!(
            "Failed to connect to {} bus after {} attempts: {}",
            config.bus_type, config.max_retries, e
        )),
        None => Error::connection(format!(
            "Failed to connect to {} bus: no attempts made",
            config.bus_type
        )),
    })
}
