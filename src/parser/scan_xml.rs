//! Scan-tool XML. Only the Nmap dialect (`<nmaprun>`) is interpreted: hosts
//! with an IPv4 address, and open ports that carry a `<service>` element.

use super::{ParseResult, ParsedFile};
use crate::graph::{EntityId, EntityType, RelationshipType};
use crate::resolve::RawRecord;
use roxmltree::{Document, Node, ParsingOptions};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Confidence for facts reported directly by a scanner
pub const SCAN_CONFIDENCE: f64 = 0.9;

const NMAP_ROOT: &str = "nmaprun";

pub(super) fn parse(bytes: &[u8], source: &str) -> ParseResult<ParsedFile> {
    let text = std::str::from_utf8(bytes)?;
    // Nmap writes `<!DOCTYPE nmaprun>`
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(text, options)?;
    let root = document.root_element();

    let mut parsed = ParsedFile::default();
    if root.tag_name().name() != NMAP_ROOT {
        debug!(source = source, root = root.tag_name().name(), "unrecognized XML dialect, nothing extracted");
        return Ok(parsed);
    }

    for host in root.descendants().filter(|n| n.has_tag_name("host")) {
        let Some(ip) = ipv4_address(host) else {
            continue;
        };
        let ip_id = EntityId::derive(EntityType::IpAddress, ip);

        parsed.entities.push(
            RawRecord::new()
                .with("type", EntityType::IpAddress.as_str())
                .with("value", ip)
                .with("source", source)
                .with("confidence", SCAN_CONFIDENCE),
        );

        for port in host.descendants().filter(|n| n.has_tag_name("port")) {
            if let Some((service, hosts)) = open_service(port, ip, &ip_id, source) {
                parsed.entities.push(service);
                parsed.relationships.push(hosts);
            }
        }
    }

    Ok(parsed)
}

fn ipv4_address<'a>(host: Node<'a, 'a>) -> Option<&'a str> {
    host.descendants()
        .find(|n| n.has_tag_name("address") && n.attribute("addrtype") == Some("ipv4"))
        .and_then(|n| n.attribute("addr"))
}

/// Service entity plus the `hosts` edge from its address, for an open port
fn open_service(port: Node, ip: &str, ip_id: &EntityId, source: &str) -> Option<(RawRecord, RawRecord)> {
    let state = port
        .descendants()
        .find(|n| n.has_tag_name("state"))
        .and_then(|n| n.attribute("state"));
    if state != Some("open") {
        return None;
    }

    let service = port.descendants().find(|n| n.has_tag_name("service"))?;
    let name = service.attribute("name").map(str::trim).filter(|n| !n.is_empty())?;

    let port_id = port.attribute("portid")?;
    let protocol = port.attribute("protocol").unwrap_or("unknown");
    let port_value = port_id
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(port_id));

    let mut attributes = Map::new();
    attributes.insert("port".to_string(), port_value.clone());
    attributes.insert("protocol".to_string(), Value::from(protocol));
    for key in ["product", "version"] {
        if let Some(v) = service.attribute(key) {
            attributes.insert(key.to_string(), Value::from(v));
        }
    }

    // Scoped to the host so identical service names on different hosts stay distinct
    let service_id = format!("{}:{}:{}/{}", EntityType::Service.as_str(), ip, port_id, protocol);

    let entity = RawRecord::new()
        .with("id", service_id.as_str())
        .with("type", EntityType::Service.as_str())
        .with("value", name)
        .with("source", source)
        .with("confidence", SCAN_CONFIDENCE)
        .with("attributes", Value::Object(attributes));

    let relationship = RawRecord::new()
        .with("source_id", ip_id.as_str())
        .with("target_id", service_id)
        .with("type", RelationshipType::Hosts.as_str())
        .with("source", source)
        .with("confidence", SCAN_CONFIDENCE)
        .with("attributes", json!({ "port": port_value, "protocol": protocol }));

    Some((entity, relationship))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseError;

    const SCAN: &str = r#"<?xml version="1.0"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sV 10.0.0.0/24">
  <host>
    <status state="up"/>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <address addr="00:11:22:33:44:55" addrtype="mac"/>
    <ports>
      <port protocol="tcp" portid="443">
        <state state="open" reason="syn-ack"/>
        <service name="https" product="nginx" version="1.18.0"/>
      </port>
      <port protocol="tcp" portid="22">
        <state state="closed"/>
        <service name="ssh"/>
      </port>
      <port protocol="udp" portid="161">
        <state state="open"/>
      </port>
    </ports>
  </host>
  <host>
    <address addr="fe80::1" addrtype="ipv6"/>
  </host>
</nmaprun>"#;

    #[test]
    fn extracts_host_service_and_edge() {
        let parsed = parse(SCAN.as_bytes(), "nmap").unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.relationships.len(), 1);

        let ip = &parsed.entities[0];
        assert_eq!(ip.get_scalar("type").as_deref(), Some("ip_address"));
        assert_eq!(ip.get_scalar("value").as_deref(), Some("10.0.0.5"));

        let service = &parsed.entities[1];
        assert_eq!(service.get_scalar("value").as_deref(), Some("https"));
        assert_eq!(service.get_scalar("id").as_deref(), Some("service:10.0.0.5:443/tcp"));
        let attrs = service.get("attributes").unwrap();
        assert_eq!(attrs["port"], json!(443));
        assert_eq!(attrs["protocol"], json!("tcp"));
        assert_eq!(attrs["product"], json!("nginx"));
        assert_eq!(attrs["version"], json!("1.18.0"));

        let hosts = &parsed.relationships[0];
        assert_eq!(hosts.get_scalar("source_id").as_deref(), Some("ip_address:10.0.0.5"));
        assert_eq!(hosts.get_scalar("target_id").as_deref(), Some("service:10.0.0.5:443/tcp"));
        assert_eq!(hosts.get_scalar("type").as_deref(), Some("hosts"));
        assert_eq!(hosts.get("confidence").and_then(|v| v.as_f64()), Some(0.9));
    }

    #[test]
    fn other_dialects_yield_nothing() {
        let parsed = parse(b"<report><host/></report>", "openvas").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn broken_xml_is_parse_error() {
        let err = parse(b"<nmaprun><host>", "nmap").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }
}
