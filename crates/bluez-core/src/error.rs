//! Error types for bluez-objects

use thiserror::Error;

/// Main error type for BlueZ object lookups and introspection
#[derive(Error, Debug)]
pub enum Error {
    /// No object in the managed-object graph satisfied the adapter match
    #[error("Bluetooth adapter not found{}", pattern_suffix(.pattern))]
    NoBluezAdapterFound { pattern: Option<String> },

    /// No object satisfied the device match, including the case where the
    /// restricting adapter resolved but no device lives under its path
    #[error("Bluetooth device not found: {address}")]
    NoBluezDeviceFound { address: String },

    #[error("Malformed introspection data: {0}")]
    MalformedIntrospection(String),

    #[error("DBus error: {0}")]
    Dbus(#[from] zbus::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

fn pattern_suffix(pattern: &Option<String>) -> String {
    match pattern {
        Some(p) => format!(" (pattern: {})", p),
        None => String::new(),
    }
}

impl Error {
    pub fn adapter_not_found(pattern: Option<&str>) -> Self {
        Error::NoBluezAdapterFound {
            pattern: pattern.map(str::to_string),
        }
    }

    pub fn device_not_found(address: impl Into<String>) -> Self {
        Error::NoBluezDeviceFound {
            address: address.into(),
        }
    }

    /// Create a malformed introspection error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedIntrospection(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// True for the two lookup failures (adapter or device absent)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoBluezAdapterFound { .. } | Error::NoBluezDeviceFound { .. }
        )
    }
}
