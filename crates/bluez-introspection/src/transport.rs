//! Bus transport
//!
//! The resolver and parser never talk to the bus themselves. Everything that
//! needs a round trip goes through [`BusTransport`], which [`ZbusTransport`]
//! implements on top of an open [`BusSession`].

use async_trait::async_trait;
use tracing::debug;

use bluez_core::{
    BusSession, ManagedObjects, Result, INTROSPECTABLE_INTERFACE, OBJECT_MANAGER_INTERFACE,
};

/// Black-box RPC substrate exposing the three calls lookups depend on
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Bound reference to one (path, interface) pair
    type Handle: Send;

    /// Fetch a fresh `GetManagedObjects` snapshot from the service root
    async fn get_managed_objects(&self) -> Result<ManagedObjects>;

    /// Fetch the introspection XML of one object
    async fn introspect(&self, path: &str) -> Result<String>;

    /// Bind a handle to `path` and `interface`
    async fn proxy(&self, path: &str, interface: &str) -> Result<Self::Handle>;
}

/// [`BusTransport`] over a zbus connection
#[derive(Debug, Clone)]
pub struct ZbusTransport {
    session: BusSession,
}

impl ZbusTransport {
    pub fn new(session: BusSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &BusSession {
        &self.session
    }

    /// Give the session back, e.g. to close it
    pub fn into_session(self) -> BusSession {
        self.session
    }
}

#[async_trait]
impl BusTransport for ZbusTransport {
    type Handle = zbus::Proxy<'static>;

    async fn get_managed_objects(&self) -> Result<ManagedObjects> {
        let manager = self.proxy("/", OBJECT_MANAGER_INTERFACE).await?;
        let reply = manager.call_method("GetManagedObjects", &()).await?;
        let objects: ManagedObjects = reply.body().deserialize()?;

        debug!(
            service = %self.session.service(),
            objects = objects.len(),
            "Fetched managed objects"
        );
        Ok(objects)
    }

    async fn introspect(&self, path: &str) -> Result<String> {
        let proxy = self.proxy(path, INTROSPECTABLE_INTERFACE).await?;
        let xml: String = proxy.call("Introspect", &()).await?;

        debug!(path, bytes = xml.len(), "Introspected object");
        Ok(xml)
    }

    async fn proxy(&self, path: &str, interface: &str) -> Result<zbus::Proxy<'static>> {
        // No property cache, so building a handle needs no round trip.
        let proxy: zbus::Proxy<'static> = zbus::proxy::Builder::new(self.session.connection())
            .destination(self.session.service().to_string())?
            .path(path.to_string())?
            .interface(interface.to_string())?
            .cache_properties(zbus::proxy::CacheProperties::No)
            .build()
            .await?;
        Ok(proxy)
    }
}
