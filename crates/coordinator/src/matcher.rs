//! Host match patterns derived from page origins.

use std::fmt;

use url::Url;

/// A `*://host[:port]/*` pattern covering every page of an origin on either
/// `http` or `https`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostMatcher(String);

impl HostMatcher {
    /// Replace a leading `http:`/`https:` with `*:` and append `/*`.
    pub fn from_origin(origin: &str) -> Self {
        let rest = origin
            .strip_prefix("https:")
            .or_else(|| origin.strip_prefix("http:"));
        match rest {
            Some(rest) => Self(format!("*:{rest}/*")),
            None => Self(format!("{origin}/*")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a tab's URL falls under this pattern. Host and port must be
    /// equal; any path matches.
    pub fn matches(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        let Some((scheme, rest)) = self.0.split_once("://") else {
            return false;
        };
        let Some(host) = rest.strip_suffix("/*") else {
            return false;
        };

        let scheme_matches = match scheme {
            "*" => matches!(url.scheme(), "http" | "https"),
            scheme => scheme == url.scheme(),
        };
        scheme_matches && authority(&url).is_some_and(|authority| authority == host)
    }
}

impl fmt::Display for HostMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
