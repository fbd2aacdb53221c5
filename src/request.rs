//! Network request descriptor used for URL rule matching.

use std::net::IpAddr;

use url::Url;

use crate::content_type::ContentType;

/// Request checked against URL filter rules.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Request {
    url: String,
    referrer_domain: Option<String>,
    third_party: bool,
    content_types: ContentType,
}

impl Request {
    /// Describe a request for `url` loaded by the page at `referrer`.
    ///
    /// A request is third-party when its host is on another registrable domain
    /// than the referrer. Requests without a referrer are always first-party.
    pub fn new(url: &str, referrer: Option<&str>) -> Self {
        let referrer_domain = referrer.and_then(host);
        let third_party = match (&referrer_domain, host(url)) {
            (Some(referrer), Some(host)) => {
                !registrable_domain(referrer).eq_ignore_ascii_case(registrable_domain(&host))
            },
            (Some(_), None) => true,
            (None, _) => false,
        };

        let content_types = ContentType::from_url(url);
        Self { url: url.into(), referrer_domain, third_party, content_types }
    }

    /// Override the content types detected from the URL.
    pub fn with_content_types(mut self, content_types: ContentType) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host of the page which initiated the request.
    pub fn referrer_domain(&self) -> Option<&str> {
        self.referrer_domain.as_deref()
    }

    pub fn is_third_party(&self) -> bool {
        self.third_party
    }

    pub fn content_types(&self) -> ContentType {
        self.content_types
    }
}

fn host(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.host_str().filter(|host| !host.is_empty()).map(String::from)
}

/// Registrable domain of a host, like `bbc.co.uk` for `news.bbc.co.uk`.
///
/// Hosts without a registrable domain, like IP addresses, are returned unchanged.
fn registrable_domain(host: &str) -> &str {
    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return host;
    }

    psl::domain_str(host).unwrap_or(host)
}
