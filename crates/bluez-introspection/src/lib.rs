//! bluez-introspection: find BlueZ adapters and devices on the bus and
//! summarise what their objects expose
//!
//! This crate provides:
//! - Adapter/device resolution over a `GetManagedObjects` snapshot
//! - Introspection XML parsing into a JSON-serializable summary
//! - A zbus-backed transport and the [`BluezObjects`] service tying them
//!   together
//!
//! Lookups never cache: every call fetches a fresh snapshot.

pub mod parser;
pub mod resolver;
pub mod transport;

pub use parser::{convert, IntrospectionParser};
pub use resolver::{find_adapter_path, find_device_path, Entity};
pub use transport::{BusTransport, ZbusTransport};

use bluez_core::{
    BusSession, IntrospectionSummary, ManagedObjects, Result, ADAPTER_INTERFACE,
    DEVICE_INTERFACE,
};
use tracing::debug;

/// High-level lookup service over a [`BusTransport`]
pub struct BluezObjects<T: BusTransport> {
    transport: T,
    parser: IntrospectionParser,
}

impl BluezObjects<ZbusTransport> {
    /// Service over an already opened session
    pub fn with_session(session: BusSession) -> Self {
        Self::new(ZbusTransport::new(session))
    }
}

impl<T: BusTransport> BluezObjects<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            parser: IntrospectionParser::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Current `GetManagedObjects` snapshot
    pub async fn managed_objects(&self) -> Result<ManagedObjects> {
        self.transport.get_managed_objects().await
    }

    /// Bind a handle to an arbitrary path and interface
    pub async fn proxy(&self, path: &str, interface: &str) -> Result<T::Handle> {
        self.transport.proxy(path, interface).await
    }

    /// Handle to the adapter matching `pattern`.
    ///
    /// The pattern is either the tail of the adapter's object path (`hci0`)
    /// or its address (`00:11:22:33:44:55`). Without a pattern the first
    /// adapter is returned. Fails with `NoBluezAdapterFound`.
    pub async fn find_adapter(&self, pattern: Option<&str>) -> Result<T::Handle> {
        let objects = self.transport.get_managed_objects().await?;
        let path = find_adapter_path(&objects, pattern)?;
        debug!(?pattern, path, "Resolved adapter");
        self.transport.proxy(path, ADAPTER_INTERFACE).await
    }

    /// Handle to the device with `address`, optionally only under the
    /// adapter matching `adapter_pattern`.
    ///
    /// Fails with `NoBluezAdapterFound` when the adapter pattern matches
    /// nothing, otherwise `NoBluezDeviceFound` when no device matches.
    pub async fn find_device(
        &self,
        address: &str,
        adapter_pattern: Option<&str>,
    ) -> Result<T::Handle> {
        let objects = self.transport.get_managed_objects().await?;
        let path = find_device_path(&objects, address, adapter_pattern)?;
        debug!(address, ?adapter_pattern, path, "Resolved device");
        self.transport.proxy(path, DEVICE_INTERFACE).await
    }

    /// Introspect `path` and convert the reply
    pub async fn introspect(&self, path: &str) -> Result<IntrospectionSummary> {
        let xml = self.transport.introspect(path).await?;
        self.parser.parse(&xml)
    }

    /// Introspect `path` and return the summary as JSON
    pub async fn introspect_json(&self, path: &str) -> Result<serde_json::Value> {
        let summary = self.introspect(path).await?;
        Ok(serde_json::to_value(summary)?)
    }
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        convert, resolver, BluezObjects, BusTransport, Entity, IntrospectionParser,
        ZbusTransport,
    };
    pub use bluez_core::{
        BusSession, Error, IntrospectionSummary, ManagedObjects, Result, SessionConfig,
    };
}
