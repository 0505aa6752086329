//! Common types used across bluez-objects

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Signature, Type, Value};

/// Well-known bus name of the Bluetooth daemon
pub const SERVICE_NAME: &str = "org.bluez";
pub const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";
pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";

/// Property carrying the MAC address on adapters and devices
pub const ADDRESS_PROPERTY: &str = "Address";

/// Bus type for DBus connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    System,
    Session,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::System => write!(f, "system"),
            BusType::Session => write!(f, "session"),
        }
    }
}

impl std::str::FromStr for BusType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "system" => Ok(BusType::System),
            "session" => Ok(BusType::Session),
            other => Err(crate::Error::invalid_argument(format!(
                "unknown bus type '{}'",
                other
            ))),
        }
    }
}

/// Property name -> value for one interface on one object
pub type InterfaceProperties = HashMap<String, OwnedValue>;

/// Interface name -> properties for one object
pub type ObjectInterfaces = HashMap<String, InterfaceProperties>;

/// Snapshot returned by `GetManagedObjects`.
///
/// Entries keep the order in which the service delivered them; lookups
/// walk them front to back and the first match wins.
#[derive(Debug, Default)]
pub struct ManagedObjects {
    entries: Vec<(String, ObjectInterfaces)>,
    /// path -> position in `entries`
    index: HashMap<String, usize>,
}

impl ManagedObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, replacing the interfaces of an existing path in place
    pub fn insert(&mut self, path: impl Into<String>, interfaces: ObjectInterfaces) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&pos) => self.entries[pos].1 = interfaces,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, interfaces));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&ObjectInterfaces> {
        self.index.get(path).map(|&pos| &self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectInterfaces)> {
        self.entries.iter().map(|(p, ifaces)| (p.as_str(), ifaces))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>> FromIterator<(P, ObjectInterfaces)> for ManagedObjects {
    fn from_iter<I: IntoIterator<Item = (P, ObjectInterfaces)>>(iter: I) -> Self {
        let mut objects = ManagedObjects::new();
        for (path, ifaces) in iter {
            objects.insert(path, ifaces);
        }
        objects
    }
}

// Same wire signature as the map zbus would decode `a{oa{sa{sv}}}` into.
impl Type for ManagedObjects {
    const SIGNATURE: &'static Signature =
        <HashMap<OwnedObjectPath, ObjectInterfaces> as Type>::SIGNATURE;
}

impl<'de> Deserialize<'de> for ManagedObjects {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectsVisitor;

        impl<'de> Visitor<'de> for ObjectsVisitor {
            type Value = ManagedObjects;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dictionary of object paths to interfaces")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut objects = ManagedObjects::new();
                while let Some((path, ifaces)) =
                    map.next_entry::<OwnedObjectPath, ObjectInterfaces>()?
                {
                    objects.insert(path.as_str(), ifaces);
                }
                Ok(objects)
            }
        }

        deserializer.deserialize_map(ObjectsVisitor)
    }
}

impl Serialize for ManagedObjects {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, ifaces) in &self.entries {
            let path = ObjectPath::try_from(path.as_str()).map_err(serde::ser::Error::custom)?;
            map.serialize_entry(&path, ifaces)?;
        }
        map.end()
    }
}

/// Read a string-typed property, `None` when absent or not a string
pub fn string_property<'a>(
    interfaces: &'a ObjectInterfaces,
    interface: &str,
    property: &str,
) -> Option<&'a str> {
    let value = interfaces.get(interface)?.get(property)?;
    match &**value {
        Value::Str(s) => Some(s.as_str()),
        _ => None,
    }
}

/// XML attribute name -> value for one introspection element
pub type Attributes = BTreeMap<String, String>;

/// A method or signal declaration and its `arg` children, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub args: Vec<Attributes>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

// Serialized as `{ "<name>": [args...] }`
impl Serialize for Declaration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.args)?;
        map.end()
    }
}

/// Methods, signals and properties of one interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceSummary {
    #[serde(rename = "method")]
    pub methods: Vec<Declaration>,
    #[serde(rename = "property")]
    pub properties: Vec<Attributes>,
    #[serde(rename = "signal")]
    pub signals: Vec<Declaration>,
}

impl InterfaceSummary {
    pub fn method(&self, name: &str) -> Option<&Declaration> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn signal(&self, name: &str) -> Option<&Declaration> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&Attributes> {
        self.properties
            .iter()
            .find(|p| p.get("name").map(String::as_str) == Some(name))
    }
}

/// Structured form of one introspection document.
///
/// Interfaces appear in document order. A repeated interface name restarts
/// that entry in its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectionSummary {
    interfaces: Vec<(String, InterfaceSummary)>,
}

impl IntrospectionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh, empty entry for `name` and return it
    pub fn begin_interface(&mut self, name: &str) -> &mut InterfaceSummary {
        let idx = match self.interfaces.iter().position(|(n, _)| n == name) {
            Some(idx) => {
                self.interfaces[idx].1 = InterfaceSummary::default();
                idx
            }
            None => {
                self.interfaces
                    .push((name.to_string(), InterfaceSummary::default()));
                self.interfaces.len() - 1
            }
        };
        &mut self.interfaces[idx].1
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceSummary> {
        self.interfaces
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, iface)| iface)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut InterfaceSummary> {
        self.interfaces
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, iface)| iface)
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InterfaceSummary)> {
        self.interfaces.iter().map(|(n, iface)| (n.as_str(), iface))
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

impl Serialize for IntrospectionSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.interfaces.len()))?;
        for (name, iface) in &self.interfaces {
            map.serialize_entry(name, iface)?;
        }
        map.end()
    }
}
