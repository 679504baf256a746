//! Pattern library: validators and extractors for network identifiers
//!
//! Stateless predicates over single values (`is_*`) and set-returning
//! scanners over free text (`find_*`). Regexes are compiled once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};

/// Cached regexes, anchored variants for validation and unanchored for scanning.
mod compiled {
    use super::*;

    /// Label chain of alnum/hyphen labels ending in an alphabetic TLD of 2+ chars
    pub static DOMAIN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
            .expect("Invalid domain regex")
    });

    pub static EMAIL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("Invalid email regex")
    });

    pub static DOMAIN_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}\b")
            .expect("Invalid domain scan regex")
    });

    pub static IPV4_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("Invalid IPv4 scan regex")
    });

    pub static EMAIL_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}\b")
            .expect("Invalid email scan regex")
    });
}

/// True if `s` is a fully-qualified domain name
pub fn is_domain(s: &str) -> bool {
    compiled::DOMAIN.is_match(s)
}

/// True if `s` parses as an IPv4 or IPv6 address
pub fn is_ip_address(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

/// True if `s` is an email address with a 2+ char TLD
pub fn is_email(s: &str) -> bool {
    compiled::EMAIL.is_match(s)
}

/// Unique domain names mentioned in `text`
///
/// A candidate directly followed by `@` is the local part of an email
/// address and is not a domain.
pub fn find_domains(text: &str) -> BTreeSet<String> {
    compiled::DOMAIN_IN_TEXT
        .find_iter(text)
        .filter(|m| !text[m.end()..].starts_with('@'))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Unique dotted-quad IPv4 addresses mentioned in `text`
///
/// Matches with out-of-range octets (e.g. `999.1.1.1`) are dropped.
pub fn find_ips(text: &str) -> BTreeSet<String> {
    compiled::IPV4_IN_TEXT
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|candidate| candidate.parse::<Ipv4Addr>().is_ok())
        .map(str::to_string)
        .collect()
}

/// Unique email addresses mentioned in `text`
pub fn find_emails(text: &str) -> BTreeSet<String> {
    compiled::EMAIL_IN_TEXT
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_domains() {
        assert!(is_domain("example.com"));
        assert!(is_domain("mail.sub-domain.example.co.uk"));
        assert!(!is_domain("localhost"));
        assert!(!is_domain("example.c"));
        assert!(!is_domain("-bad.example.com"));
        assert!(!is_domain("10.0.0.1"));
        assert!(!is_domain("admin@example.com"));
    }

    #[test]
    fn validates_ip_addresses() {
        assert!(is_ip_address("10.0.0.1"));
        assert!(is_ip_address("::1"));
        assert!(is_ip_address("2001:db8::ff00:42:8329"));
        assert!(!is_ip_address("256.0.0.1"));
        assert!(!is_ip_address("example.com"));
    }

    #[test]
    fn validates_emails() {
        assert!(is_email("admin@example.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("admin@example"));
        assert!(!is_email("example.com"));
    }

    #[test]
    fn finds_each_kind_in_mixed_text() {
        let text = "Visit example.com or mail admin@example.com from 192.168.1.1";
        assert_eq!(find_domains(text), BTreeSet::from(["example.com".to_string()]));
        assert_eq!(find_emails(text), BTreeSet::from(["admin@example.com".to_string()]));
        assert_eq!(find_ips(text), BTreeSet::from(["192.168.1.1".to_string()]));
    }

    #[test]
    fn find_returns_unique_matches() {
        let text = "10.0.0.1 10.0.0.1 10.0.0.2 and example.com, example.com.";
        assert_eq!(find_ips(text).len(), 2);
        assert_eq!(find_domains(text).len(), 1);
    }

    #[test]
    fn email_local_part_is_not_a_domain() {
        let domains = find_domains("contact john.doe@corp.example.net today");
        assert!(!domains.contains("john.doe"));
        assert!(domains.contains("corp.example.net"));
    }

    #[test]
    fn out_of_range_octets_are_dropped() {
        assert!(find_ips("bogus 999.10.10.10 here").is_empty());
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(find_domains("").is_empty());
        assert!(find_ips("").is_empty());
        assert!(find_emails("").is_empty());
    }
}
