//! Integration tests for adapter/device lookups and introspection through
//! the `BluezObjects` service

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bluez_core::{
        Error, InterfaceProperties, ManagedObjects, ObjectInterfaces, Result, ADAPTER_INTERFACE,
        ADDRESS_PROPERTY, DEVICE_INTERFACE,
    };
    use bluez_introspection::{BluezObjects, BusTransport};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zbus::zvariant::{OwnedValue, Value};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Handle {
        path: String,
        interface: String,
    }

    /// Serves a fixed graph and fixed XML documents
    struct InMemoryTransport {
        objects: Vec<(&'static str, &'static str, &'static str)>,
        xml: HashMap<&'static str, &'static str>,
        fetches: AtomicUsize,
    }

    impl InMemoryTransport {
        fn bluez() -> Self {
            let mut xml = HashMap::new();
            xml.insert(
                "/org/bluez/hci0",
                r#"<node>
                  <interface name="org.bluez.Adapter1">
                    <method name="StartDiscovery"/>
                    <method name="RemoveDevice"><arg name="device" type="o" direction="in"/></method>
                    <property name="Address" type="s" access="read"/>
                  </interface>
                  <node name="dev_11_22_33_44_55_66"/>
                </node>"#,
            );
            xml.insert("/broken", "<node><interface name=\"x\">");

            Self {
                objects: vec![
                    ("/org/bluez/hci0", ADAPTER_INTERFACE, "AA:BB:CC:DD:EE:FF"),
                    (
                        "/org/bluez/hci0/dev_11_22_33_44_55_66",
                        DEVICE_INTERFACE,
                        "11:22:33:44:55:66",
                    ),
                ],
                xml,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BusTransport for InMemoryTransport {
        type Handle = Handle;

        async fn get_managed_objects(&self) -> Result<ManagedObjects> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .objects
                .iter()
                .map(|(path, interface, address)| {
                    let mut props = InterfaceProperties::new();
                    props.insert(
                        ADDRESS_PROPERTY.to_string(),
                        OwnedValue::try_from(Value::from(*address)).unwrap(),
                    );
                    let mut ifaces = ObjectInterfaces::new();
                    ifaces.insert(interface.to_string(), props);
                    (*path, ifaces)
                })
                .collect())
        }

        async fn introspect(&self, path: &str) -> Result<String> {
            self.xml
                .get(path)
                .map(|xml| xml.to_string())
                .ok_or_else(|| Error::invalid_argument(format!("no object at {}", path)))
        }

        async fn proxy(&self, path: &str, interface: &str) -> Result<Handle> {
            Ok(Handle {
                path: path.to_string(),
                interface: interface.to_string(),
            })
        }
    }

    fn service() -> BluezObjects<InMemoryTransport> {
        BluezObjects::new(InMemoryTransport::bluez())
    }

    #[tokio::test]
    async fn test_find_adapter_by_name_and_address() {
        let bluez = service();

        let by_name = bluez.find_adapter(Some("hci0")).await.unwrap();
        let by_address = bluez.find_adapter(Some("aa:bb:cc:dd:ee:ff")).await.unwrap();
        let first = bluez.find_adapter(None).await.unwrap();

        assert_eq!(by_name.path, "/org/bluez/hci0");
        assert_eq!(by_name.interface, ADAPTER_INTERFACE);
        assert_eq!(by_address, by_name);
        assert_eq!(first, by_name);
    }

    #[tokio::test]
    async fn test_every_lookup_refetches() {
        let bluez = service();
        bluez.find_adapter(None).await.unwrap();
        bluez.find_adapter(None).await.unwrap();
        bluez.find_device("11:22:33:44:55:66", None).await.unwrap();
        assert_eq!(bluez.transport().fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_find_adapter_missing() {
        let bluez = service();
        let err = bluez.find_adapter(Some("hci1")).await.unwrap_err();
        assert!(matches!(err, Error::NoBluezAdapterFound { .. }));
    }

    #[tokio::test]
    async fn test_find_device() {
        let bluez = service();
        let device = bluez
            .find_device("11:22:33:44:55:66", Some("hci0"))
            .await
            .unwrap();
        assert_eq!(device.path, "/org/bluez/hci0/dev_11_22_33_44_55_66");
        assert_eq!(device.interface, DEVICE_INTERFACE);
    }

    #[tokio::test]
    async fn test_find_device_failures_stay_distinct() {
        let bluez = service();

        let err = bluez
            .find_device("11:22:33:44:55:66", Some("hci1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoBluezAdapterFound { .. }));

        let err = bluez
            .find_device("66:55:44:33:22:11", Some("hci0"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoBluezDeviceFound { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_introspect_json() {
        let bluez = service();
        let value = bluez.introspect_json("/org/bluez/hci0").await.unwrap();
        assert_eq!(
            value,
            json!({
                "org.bluez.Adapter1": {
                    "method": [
                        {"StartDiscovery": []},
                        {"RemoveDevice": [{"direction": "in", "name": "device", "type": "o"}]}
                    ],
                    "property": [{"access": "read", "name": "Address", "type": "s"}],
                    "signal": []
                }
            })
        );
    }

    #[tokio::test]
    async fn test_introspect_malformed() {
        let bluez = service();
        let err = bluez.introspect("/broken").await.unwrap_err();
        assert!(matches!(err, Error::MalformedIntrospection(_)));
    }
}
