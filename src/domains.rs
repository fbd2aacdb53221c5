//! Domain restrictions shared by all rule kinds.

use log::debug;

/// Negation prefix for restricted domains.
const NOT_MARK: char = '~';

/// Separators allowed in a domain list.
const DOMAIN_SEPARATORS: [char; 2] = [',', '|'];

/// Domains a rule is permitted or restricted on.
///
/// A scope without permitted domains is generic and applies everywhere except on
/// the restricted domains.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct DomainScope {
    permitted: Vec<String>,
    restricted: Vec<String>,
}

impl DomainScope {
    /// Parse a `,` or `|` delimited domain list like `a.com,~b.a.com`.
    pub fn parse(domains: &str) -> Self {
        let mut scope = Self::default();
        scope.add_domains(domains);
        scope
    }

    /// Add all domains of a `,` or `|` delimited domain list.
    pub fn add_domains(&mut self, domains: &str) {
        for domain in domains.split(DOMAIN_SEPARATORS) {
            let domain = domain.trim();
            match domain.strip_prefix(NOT_MARK) {
                Some(restricted) => {
                    push_unique(&mut self.restricted, to_punycode(restricted.trim()))
                },
                None => push_unique(&mut self.permitted, to_punycode(domain)),
            }
        }
    }

    pub fn permitted_domains(&self) -> &[String] {
        &self.permitted
    }

    pub fn restricted_domains(&self) -> &[String] {
        &self.restricted
    }

    /// Check if the scope has no permitted domains.
    pub fn is_generic(&self) -> bool {
        self.permitted.is_empty()
    }

    /// Check if the scope mentions any domain at all.
    pub fn is_domain_sensitive(&self) -> bool {
        !self.permitted.is_empty() || !self.restricted.is_empty()
    }

    /// Check if a rule with this scope applies to `domain`.
    pub fn is_permitted(&self, domain: &str) -> bool {
        if domain.is_empty() || is_domain_or_subdomain(domain, &self.restricted) {
            return false;
        }

        self.permitted.is_empty() || is_domain_or_subdomain(domain, &self.permitted)
    }
}

/// Check if `domain` is equal to or a subdomain of any of the `domains`.
pub fn is_domain_or_subdomain(domain: &str, domains: &[String]) -> bool {
    domains.iter().any(|candidate| {
        if domain.len() == candidate.len() {
            return domain.eq_ignore_ascii_case(candidate);
        }

        // Only match on a label boundary.
        domain.len() > candidate.len()
            && domain.is_char_boundary(domain.len() - candidate.len())
            && domain[domain.len() - candidate.len()..].eq_ignore_ascii_case(candidate)
            && domain.as_bytes()[domain.len() - candidate.len() - 1] == b'.'
    })
}

/// Convert a non-ASCII domain to its punycode representation.
///
/// Domains which cannot be converted are returned unchanged.
pub fn to_punycode(domain: &str) -> String {
    if domain.is_ascii() {
        return domain.into();
    }

    match idna::domain_to_ascii(domain) {
        Ok(ascii) => ascii,
        Err(err) => {
            debug!("Cannot convert {domain:?} to punycode: {err:?}");
            domain.into()
        },
    }
}

fn push_unique(domains: &mut Vec<String>, domain: String) {
    if !domain.is_empty() && !domains.contains(&domain) {
        domains.push(domain);
    }
}
