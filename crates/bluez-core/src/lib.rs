//! Core types and utilities for bluez-objects
//!
//! # Modules
//!
//! - `config`: Environment configuration and session settings
//! - `connection`: Explicit bus session (open, share, close)
//! - `error`: Error types and Result alias
//! - `types`: Bus constants, managed-object graph, introspection summary

pub mod config;
pub mod connection;
pub mod error;
pub mod types;

// Re-exports
pub use config::SessionConfig;
pub use connection::BusSession;
pub use error::{Error, Result};
pub use types::*;
