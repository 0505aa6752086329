//! Adapter and device lookup over a managed-object snapshot
//!
//! Everything here is pure: it walks one [`ManagedObjects`] value in
//! iteration order and returns the path of the first object that matches.
//! Binding a handle to that path is the caller's job.

use bluez_core::{
    string_property, Error, ManagedObjects, ObjectInterfaces, Result, ADAPTER_INTERFACE,
    ADDRESS_PROPERTY, DEVICE_INTERFACE,
};

/// A blank pattern is treated as no pattern at all.
fn normalize(pattern: Option<&str>) -> Option<&str> {
    pattern.filter(|p| !p.is_empty())
}

fn adapter_matches(path: &str, ifaces: &ObjectInterfaces, pattern: Option<&str>) -> bool {
    if !ifaces.contains_key(ADAPTER_INTERFACE) {
        return false;
    }
    let address = string_property(ifaces, ADAPTER_INTERFACE, ADDRESS_PROPERTY);

    match pattern {
        None => address.is_some_and(|a| !a.is_empty()),
        Some(p) => address == Some(p.to_uppercase().as_str()) || path.ends_with(&p.to_lowercase()),
    }
}

/// Path of the first adapter matching `pattern`.
///
/// Without a pattern, the first adapter exposing a non-empty `Address`.
/// With one, the first adapter whose address equals the upper-cased pattern
/// or whose path ends with the lower-cased pattern (`hci0`, `AA:BB:..`).
pub fn find_adapter_path<'a>(objects: &'a ManagedObjects, pattern: Option<&str>) -> Result<&'a str> {
    let pattern = normalize(pattern);
    objects
        .iter()
        .find(|(path, ifaces)| adapter_matches(path, ifaces, pattern))
        .map(|(path, _)| path)
        .ok_or_else(|| Error::adapter_not_found(pattern))
}

/// Path of the first device whose `Address` equals the upper-cased
/// `address`.
///
/// With `adapter_pattern`, the adapter is resolved first and its failure is
/// returned as is; only devices whose path starts with the adapter path are
/// then considered.
pub fn find_device_path<'a>(
    objects: &'a ManagedObjects,
    address: &str,
    adapter_pattern: Option<&str>,
) -> Result<&'a str> {
    let prefix = match normalize(adapter_pattern) {
        Some(pattern) => find_adapter_path(objects, Some(pattern))?,
        None => "",
    };
    let wanted = address.to_uppercase();

    objects
        .iter()
        .find(|(path, ifaces)| {
            string_property(ifaces, DEVICE_INTERFACE, ADDRESS_PROPERTY) == Some(wanted.as_str())
                && path.starts_with(prefix)
        })
        .map(|(path, _)| path)
        .ok_or_else(|| Error::device_not_found(address))
}

/// An adapter or device as listed in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity<'a> {
    pub path: &'a str,
    pub address: &'a str,
}

fn entities<'a>(objects: &'a ManagedObjects, interface: &'a str) -> Vec<Entity<'a>> {
    objects
        .iter()
        .filter_map(|(path, ifaces)| {
            string_property(ifaces, interface, ADDRESS_PROPERTY)
                .filter(|a| !a.is_empty())
                .map(|address| Entity { path, address })
        })
        .collect()
}

/// Every adapter with an address, in iteration order
pub fn adapters(objects: &ManagedObjects) -> Vec<Entity<'_>> {
    entities(objects, ADAPTER_INTERFACE)
}

/// Every device with an address, in iteration order
pub fn devices(objects: &ManagedObjects) -> Vec<Entity<'_>> {
    entities(objects, DEVICE_INTERFACE)
}
