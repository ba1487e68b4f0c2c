//! Caller identity resolution.
//!
//! Quota is tracked per [`Identifier`]: the authenticated user id when one
//! is known, otherwise the client network address. Resolution never fails -
//! a request with no usable address lands in the shared `ip:unknown` bucket,
//! which is an accepted imprecision, not an error.

use std::fmt;

use serde::Serialize;

/// The key under which quota is tracked: `user:<id>` or `ip:<address>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn user(id: &str) -> Self {
        Self(format!("user:{id}"))
    }

    pub fn ip(address: &str) -> Self {
        Self(format!("ip:{address}"))
    }

    /// Resolve an identifier from request material.
    ///
    /// Precedence: non-empty authenticated id, then the first hop of the
    /// forwarded-for header, then the direct-connection address header,
    /// then `ip:unknown`.
    pub fn resolve(
        authenticated_id: Option<&str>,
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
    ) -> Self {
        if let Some(id) = authenticated_id
            && !id.is_empty()
        {
            return Self::user(id);
        }

        let address = forwarded_for
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .or(real_ip)
            .unwrap_or("unknown");

        Self::ip(address)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite counter key: `(class, identifier)`.
///
/// This is the unit of isolation - distinct keys never share a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub class: String,
    pub identifier: Identifier,
}

impl CounterKey {
    pub fn new(class: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            class: class.into(),
            identifier,
        }
    }

    /// Canonical string form, used as the storage key in both backends.
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.class, self.identifier)
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_id_wins() {
        let id = Identifier::resolve(Some("42"), Some("10.0.0.1"), Some("10.0.0.2"));
        assert_eq!(id.as_str(), "user:42");
    }

    #[test]
    fn empty_authenticated_id_falls_back_to_ip() {
        let id = Identifier::resolve(Some(""), Some("10.0.0.1"), None);
        assert_eq!(id.as_str(), "ip:10.0.0.1");
    }

    #[test]
    fn forwarded_for_uses_first_hop() {
        let id = Identifier::resolve(None, Some("203.0.113.7, 10.0.0.1, 10.0.0.2"), None);
        assert_eq!(id.as_str(), "ip:203.0.113.7");
    }

    #[test]
    fn real_ip_used_when_forwarded_for_absent() {
        let id = Identifier::resolve(None, None, Some("198.51.100.4"));
        assert_eq!(id.as_str(), "ip:198.51.100.4");
    }

    #[test]
    fn no_address_information_degrades_to_unknown() {
        let id = Identifier::resolve(None, None, None);
        assert_eq!(id.as_str(), "ip:unknown");

        // A forwarded header with an empty first hop is treated as absent.
        let id = Identifier::resolve(None, Some(" "), None);
        assert_eq!(id.as_str(), "ip:unknown");
    }

    #[test]
    fn counter_key_canonical_form() {
        let key = CounterKey::new("upload", Identifier::user("42"));
        assert_eq!(key.canonical(), "upload:user:42");
    }
}
