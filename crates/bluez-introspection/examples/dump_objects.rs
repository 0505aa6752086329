//! Dump what BlueZ knows: the managed objects, the configured adapter's
//! introspection data, and every device resolved by address.
//!
//! `BLUEZ_ADAPTER` picks the adapter (default `hci0`); see
//! `bluez_core::config` for the connection settings.

use anyhow::Result;
use tracing::{info, warn};

use bluez_core::config::{get_config, load_environment, ADAPTER_VAR};
use bluez_introspection::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    load_environment();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bluez_introspection=debug".parse()?)
                .add_directive("bluez_core=info".parse()?),
        )
        .init();

    let session = BusSession::from_env().await?;
    let bluez = BluezObjects::with_session(session);

    let objects = bluez.managed_objects().await?;
    println!("Managed objects:");
    for (path, ifaces) in objects.iter() {
        let mut names: Vec<_> = ifaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        println!("  {} [{}]", path, names.join(", "));
    }

    let pattern = get_config(ADAPTER_VAR, "hci0");
    let adapter = bluez.find_adapter(Some(&pattern)).await?;
    println!("Adapter found: {}", adapter.path());

    let summary = bluez.introspect_json(adapter.path().as_str()).await?;
    println!("Introspection data for adapter:");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    for device in resolver::devices(&objects) {
        match bluez.find_device(device.address, None).await {
            Ok(found) => println!("Device found: {} ({})", found.path(), device.address),
            Err(e) => warn!(address = device.address, "Lookup failed: {}", e),
        }
    }

    info!("Closing session");
    bluez.into_transport().into_session().close().await?;
    Ok(())
}
