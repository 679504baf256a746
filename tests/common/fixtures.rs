//! Canned tool outputs

pub const NMAP_HTTPS_HOST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sV -oX scan.xml 10.0.0.5" version="7.94">
  <host starttime="1700000000" endtime="1700000100">
    <status state="up" reason="echo-reply"/>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <hostnames><hostname name="web.acme.test" type="PTR"/></hostnames>
    <ports>
      <extraports state="closed" count="998"/>
      <port protocol="tcp" portid="443">
        <state state="open" reason="syn-ack" reason_ttl="64"/>
        <service name="https" product="nginx" version="1.24.0" method="table" conf="10"/>
      </port>
      <port protocol="tcp" portid="8080">
        <state state="filtered" reason="no-response"/>
        <service name="http-proxy" method="table" conf="3"/>
      </port>
    </ports>
  </host>
  <runstats><finished time="1700000100"/></runstats>
</nmaprun>
"#;

pub const SUBDOMAINS_JSON: &str = r#"[
  {"type": "subdomain", "value": "mail.acme.test", "confidence": 0.85},
  {"type": "subdomain", "value": "vpn.acme.test", "confidence": 0.85}
]"#;

pub const DNS_ENVELOPE_JSON: &str = r#"{
  "entities": [
    {"domain": "acme.test", "registrar": "Example Registrar"},
    {"ip": "10.0.0.5"}
  ],
  "relationships": [
    {"source_id": "domain:acme.test", "target_id": "ip_address:10.0.0.5", "type": "resolves_to", "confidence": 0.95},
    {"source_id": "domain:acme.test", "target_id": "ip_address:203.0.113.77", "type": "resolves_to"}
  ]
}"#;

pub const SHERLOCK_CSV: &str = "username,site,url\n\
acmeops,GitHub,https://github.com/acmeops\n\
acmeops,Reddit,https://reddit.com/u/acmeops\n\
acme_sec,Keybase,https://keybase.io/acme_sec\n";

pub const NOTES_TXT: &str = "Visit example.com or mail admin@example.com from 192.168.1.1";
