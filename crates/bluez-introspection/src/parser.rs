//! Introspection XML parser
//!
//! Walks the document once, in document order, and folds every
//! `interface`, `method`, `signal`, `property` and `arg` element into an
//! [`IntrospectionSummary`]. Other elements (`node`, `annotation`, ...) are
//! skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use bluez_core::{Attributes, Declaration, Error, IntrospectionSummary, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Method,
    Signal,
    Property,
}

/// Where the next element lands
#[derive(Debug, Default)]
struct Cursor {
    interface: Option<String>,
    declaration: Option<(Category, String)>,
}

impl Cursor {
    fn enter_interface(&mut self, name: String) {
        self.interface = Some(name);
        self.declaration = None;
    }

    fn leave_interface(&mut self) {
        self.interface = None;
        self.declaration = None;
    }

    fn interface(&self, element: &str) -> Result<&str> {
        self.interface.as_deref().ok_or_else(|| {
            Error::malformed(format!("<{}> outside of an <interface>", element))
        })
    }
}

pub struct IntrospectionParser;

impl IntrospectionParser {
    pub fn new() -> Self {
        Self
    }

    /// Convert one introspection document into its summary.
    ///
    /// Fails with `MalformedIntrospection` when the document is not
    /// well-formed XML or an element shows up where it cannot be attached
    /// (an `arg` outside a method or signal, a declaration outside an
    /// interface).
    pub fn parse(&self, xml: &str) -> Result<IntrospectionSummary> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut summary = IntrospectionSummary::new();
        let mut cursor = Cursor::default();
        let mut depth: usize = 0;
        let mut seen_root = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::malformed(format!("XML parse error at {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    if depth == 0 && seen_root {
                        return Err(Error::malformed("more than one root element"));
                    }
                    seen_root = true;

                    visit(&mut summary, &mut cursor, e)?;

                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    } else {
                        close(&mut cursor, e.name().as_ref());
                    }
                }
                Event::End(ref e) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| Error::malformed("unbalanced closing tag"))?;
                    close(&mut cursor, e.name().as_ref());
                }
                Event::Text(_) | Event::CData(_) if depth == 0 => {
                    return Err(Error::malformed("text outside of the root element"));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(Error::malformed("document has no root element"));
        }
        if depth != 0 {
            return Err(Error::malformed(format!("{} unclosed element(s)", depth)));
        }

        Ok(summary)
    }
}

impl Default for IntrospectionParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for `IntrospectionParser::new().parse(xml)`
pub fn convert(xml: &str) -> Result<IntrospectionSummary> {
    IntrospectionParser::new().parse(xml)
}

fn visit(summary: &mut IntrospectionSummary, cursor: &mut Cursor, e: &BytesStart<'_>) -> Result<()> {
    match e.name().as_ref() {
        b"interface" => {
            let name = required_name(e, "interface")?;
            summary.begin_interface(&name);
            cursor.enter_interface(name);
        }
        b"method" | b"signal" => {
            let (category, element) = if e.name().as_ref() == b"method" {
                (Category::Method, "method")
            } else {
                (Category::Signal, "signal")
            };
            let name = required_name(e, element)?;
            let iface = active_interface(summary, cursor, element)?;
            let declarations = match category {
                Category::Method => &mut iface.methods,
                _ => &mut iface.signals,
            };
            declarations.push(Declaration::new(name.clone()));
            cursor.declaration = Some((category, name));
        }
        b"property" => {
            let attrs = attributes(e)?;
            let iface = active_interface(summary, cursor, "property")?;
            iface.properties.push(attrs);
            let name = iface
                .properties
                .last()
                .and_then(|p| p.get("name"))
                .cloned()
                .unwrap_or_default();
            cursor.declaration = Some((Category::Property, name));
        }
        b"arg" => {
            let attrs = attributes(e)?;
            let (category, name) = match &cursor.declaration {
                Some((category @ (Category::Method | Category::Signal), name)) => {
                    (*category, name.clone())
                }
                _ => return Err(Error::malformed("<arg> outside of a <method> or <signal>")),
            };
            let iface = active_interface(summary, cursor, "arg")?;
            let declarations = match category {
                Category::Method => &mut iface.methods,
                _ => &mut iface.signals,
            };
            match declarations.last_mut() {
                Some(decl) if decl.name == name => decl.args.push(attrs),
                _ => {
                    return Err(Error::malformed(format!(
                        "<arg> has no open declaration named '{}'",
                        name
                    )))
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Close the cursor frame an end tag (or self-closing element) finishes
fn close(cursor: &mut Cursor, element: &[u8]) {
    match element {
        b"interface" => cursor.leave_interface(),
        b"method" | b"signal" | b"property" => cursor.declaration = None,
        _ => {}
    }
}

fn active_interface<'s>(
    summary: &'s mut IntrospectionSummary,
    cursor: &Cursor,
    element: &str,
) -> Result<&'s mut bluez_core::InterfaceSummary> {
    let name = cursor.interface(element)?;
    summary
        .interface_mut(name)
        .ok_or_else(|| Error::malformed(format!("interface '{}' vanished", name)))
}

fn attributes(e: &BytesStart<'_>) -> Result<Attributes> {
    let mut attrs = Attributes::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::malformed(format!("bad attribute: {}", err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|err| Error::malformed(format!("bad attribute value for '{}': {}", key, err)))?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn required_name(e: &BytesStart<'_>, element: &str) -> Result<String> {
    attributes(e)?
        .remove("name")
        .ok_or_else(|| Error::malformed(format!("<{}> without a name attribute", element)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADAPTER_XML: &str = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
  <interface name="org.freedesktop.DBus.Introspectable">
    <method name="Introspect">
      <arg name="xml" type="s" direction="out"/>
    </method>
  </interface>
  <interface name="org.bluez.Adapter1">
    <method name="StartDiscovery"></method>
    <method name="RemoveDevice">
      <arg name="device" type="o" direction="in"/>
    </method>
    <property name="Address" type="s" access="read"></property>
    <property name="Powered" type="b" access="readwrite"></property>
  </interface>
  <interface name="org.freedesktop.DBus.Properties">
    <method name="Get">
      <arg name="interface" type="s" direction="in"/>
      <arg name="name" type="s" direction="in"/>
      <arg name="value" type="v" direction="out"/>
    </method>
    <signal name="PropertiesChanged">
      <arg name="interface" type="s"/>
      <arg name="changed_properties" type="a{sv}"/>
      <arg name="invalidated_properties" type="as"/>
    </signal>
  </interface>
  <node name="dev_11_22_33_44_55_66"/>
</node>"#;

    #[test]
    fn test_single_method_without_args() {
        let xml = r#"<node><interface name="org.bluez.Device1"><method name="Connect"/></interface></node>"#;
        let summary = convert(xml).unwrap();

        let iface = summary.interface("org.bluez.Device1").unwrap();
        assert_eq!(iface.methods, vec![Declaration::new("Connect")]);
        assert!(iface.signals.is_empty());
        assert!(iface.properties.is_empty());
        assert_eq!(
            serde_json::to_value(iface).unwrap(),
            json!({"method": [{"Connect": []}], "property": [], "signal": []})
        );
    }

    #[test]
    fn test_full_adapter_document() {
        let summary = convert(ADAPTER_XML).unwrap();
        assert_eq!(
            summary.interface_names().collect::<Vec<_>>(),
            vec![
                "org.freedesktop.DBus.Introspectable",
                "org.bluez.Adapter1",
                "org.freedesktop.DBus.Properties",
            ]
        );

        let adapter = summary.interface("org.bluez.Adapter1").unwrap();
        assert_eq!(adapter.methods.len(), 2);
        assert!(adapter.method("StartDiscovery").unwrap().args.is_empty());
        let remove = adapter.method("RemoveDevice").unwrap();
        assert_eq!(remove.args.len(), 1);
        assert_eq!(remove.args[0]["type"], "o");
        assert_eq!(remove.args[0]["direction"], "in");
        assert_eq!(adapter.property("Powered").unwrap()["access"], "readwrite");

        let props = summary.interface("org.freedesktop.DBus.Properties").unwrap();
        let get = props.method("Get").unwrap();
        let names: Vec<_> = get.args.iter().map(|a| a["name"].as_str()).collect();
        assert_eq!(names, vec!["interface", "name", "value"]);
        assert_eq!(props.signal("PropertiesChanged").unwrap().args.len(), 3);
    }

    #[test]
    fn test_sibling_interfaces_do_not_share_entries() {
        let xml = r#"<node>
            <interface name="a.First"><method name="One"><arg type="s"/></method></interface>
            <interface name="a.Second"><signal name="Two"/></interface>
        </node>"#;
        let summary = convert(xml).unwrap();

        let first = summary.interface("a.First").unwrap();
        let second = summary.interface("a.Second").unwrap();
        assert_eq!(first.methods.len(), 1);
        assert!(first.signals.is_empty());
        assert!(second.methods.is_empty());
        assert_eq!(second.signals, vec![Declaration::new("Two")]);
    }

    #[test]
    fn test_property_keeps_raw_attributes() {
        let xml = r#"<node><interface name="org.bluez.Device1">
            <property name="Alias" type="s" access="readwrite">
              <annotation name="org.freedesktop.DBus.Property.EmitsChangedSignal" value="true"/>
            </property>
        </interface></node>"#;
        let summary = convert(xml).unwrap();
        let props = &summary.interface("org.bluez.Device1").unwrap().properties;
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].len(), 3);
        assert_eq!(props[0]["name"], "Alias");
    }

    #[test]
    fn test_attribute_entities_are_unescaped() {
        let xml = r#"<node><interface name="x.Y"><method name="M"><arg name="a&amp;b" type="s"/></method></interface></node>"#;
        let summary = convert(xml).unwrap();
        let method = summary.interface("x.Y").unwrap().method("M").unwrap();
        assert_eq!(method.args[0]["name"], "a&b");
    }

    #[test]
    fn test_arg_without_declaration_fails() {
        let xml = r#"<node><interface name="x.Y"><arg name="stray" type="s"/></interface></node>"#;
        assert!(matches!(convert(xml), Err(Error::MalformedIntrospection(_))));
    }

    #[test]
    fn test_arg_after_closed_method_fails() {
        let xml = r#"<node><interface name="x.Y"><method name="M"/><arg type="s"/></interface></node>"#;
        assert!(matches!(convert(xml), Err(Error::MalformedIntrospection(_))));
    }

    #[test]
    fn test_arg_under_property_fails() {
        let xml = r#"<node><interface name="x.Y"><property name="P" type="s"><arg type="s"/></property></interface></node>"#;
        assert!(matches!(convert(xml), Err(Error::MalformedIntrospection(_))));
    }

    #[test]
    fn test_method_outside_interface_fails() {
        let xml = r#"<node><method name="Orphan"/></node>"#;
        assert!(matches!(convert(xml), Err(Error::MalformedIntrospection(_))));
    }

    #[test]
    fn test_malformed_documents() {
        for xml in [
            "",
            "not xml at all",
            "<node><interface name=\"x.Y\"></node>",
            "<node><interface name=\"x.Y\">",
            "<node/><node/>",
        ] {
            assert!(
                matches!(convert(xml), Err(Error::MalformedIntrospection(_))),
                "expected failure for {:?}",
                xml
            );
        }
    }

    #[test]
    fn test_conversion_is_deterministic() {
        assert_eq!(convert(ADAPTER_XML).unwrap(), convert(ADAPTER_XML).unwrap());
    }
}
