use std::fmt;

use serde::Serialize;

/// URL prefix of the current management-agent API generation.
pub const CURRENT_PREFIX: &str = "wp-json/site-agent/v2";

/// URL prefix of the legacy management-agent API generation.
pub const LEGACY_PREFIX: &str = "wp-json/site-agent/v1";

/// URL prefix of the generic content-management REST surface.
pub const REST_PREFIX: &str = "wp-json/wp/v2";

/// Header read by the current agent generation.
pub const PRIMARY_KEY_HEADER: &str = "X-Api-Key";

/// Header read by the legacy agent generation.
pub const LEGACY_KEY_HEADER: &str = "X-Site-Agent-Key";

/// Header identifying the calling client to the agent.
pub const CLIENT_ID_HEADER: &str = "X-Site-Agent-Client";

/// Endpoint family a request is addressed to.
///
/// `Current` and `Legacy` are the two incompatible generations of the remote
/// management agent. `Rest` is the content-management system's own REST API,
/// used only as a last resort for software updates.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Current management-agent API.
    Current,
    /// Legacy management-agent API.
    Legacy,
    /// Generic REST surface authenticated with a bearer token.
    Rest,
}

impl Namespace {
    /// Returns the lowercase label used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Legacy => "legacy",
            Self::Rest => "rest",
        }
    }

    /// Reports whether the namespace is served by the management agent.
    #[must_use]
    pub const fn is_agent(self) -> bool {
        matches!(self, Self::Current | Self::Legacy)
    }

    /// Returns the API-key headers for this namespace, most specific first.
    ///
    /// Both agent generations receive both headers because a site may run
    /// either one. The REST surface uses bearer authentication instead.
    #[must_use]
    pub const fn key_headers(self) -> &'static [&'static str] {
        match self {
            Self::Current => &[PRIMARY_KEY_HEADER, LEGACY_KEY_HEADER],
            Self::Legacy => &[LEGACY_KEY_HEADER, PRIMARY_KEY_HEADER],
            Self::Rest => &[],
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefixes under which each [`Namespace`] is mounted on a site.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NamespaceLayout {
    current: String,
    legacy: String,
    rest: String,
}

impl NamespaceLayout {
    /// Creates a layout from explicit prefixes. Surrounding slashes are dropped.
    #[must_use]
    pub fn new(current: &str, legacy: &str, rest: &str) -> Self {
        Self {
            current: trim_slashes(current).to_owned(),
            legacy: trim_slashes(legacy).to_owned(),
            rest: trim_slashes(rest).to_owned(),
        }
    }

    /// Returns the prefix for `namespace`.
    #[must_use]
    pub fn prefix(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Current => &self.current,
            Namespace::Legacy => &self.legacy,
            Namespace::Rest => &self.rest,
        }
    }

    /// Joins the namespace prefix and an operation path into a site-relative path.
    ///
    /// ```
    /// use wire::{Namespace, NamespaceLayout};
    ///
    /// let layout = NamespaceLayout::default();
    /// assert_eq!(
    ///     layout.relative_path(Namespace::Legacy, "/site-status"),
    ///     "wp-json/site-agent/v1/site-status"
    /// );
    /// ```
    #[must_use]
    pub fn relative_path(&self, namespace: Namespace, path: &str) -> String {
        let prefix = self.prefix(namespace);
        let path = trim_slashes(path);
        match (prefix.is_empty(), path.is_empty()) {
            (true, _) => path.to_owned(),
            (false, true) => prefix.to_owned(),
            (false, false) => format!("{prefix}/{path}"),
        }
    }
}

impl Default for NamespaceLayout {
    fn default() -> Self {
        Self::new(CURRENT_PREFIX, LEGACY_PREFIX, REST_PREFIX)
    }
}

fn trim_slashes(value: &str) -> &str {
    value.trim().trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_namespaces_send_both_key_headers() {
        for namespace in [Namespace::Current, Namespace::Legacy] {
            let headers = namespace.key_headers();
            assert!(headers.contains(&PRIMARY_KEY_HEADER));
            assert!(headers.contains(&LEGACY_KEY_HEADER));
        }
        assert!(Namespace::Rest.key_headers().is_empty());
        assert_eq!(Namespace::Legacy.key_headers()[0], LEGACY_KEY_HEADER);
    }

    #[test]
    fn layout_normalises_slashes() {
        let layout = NamespaceLayout::new("/agent/v9/", "old", "");
        assert_eq!(layout.prefix(Namespace::Current), "agent/v9");
        assert_eq!(layout.relative_path(Namespace::Current, "status/"), "agent/v9/status");
        assert_eq!(layout.relative_path(Namespace::Rest, "/plugins"), "plugins");
        assert_eq!(layout.relative_path(Namespace::Legacy, ""), "old");
    }

    #[test]
    fn display_matches_label() {
        assert_eq!(Namespace::Current.to_string(), "current");
        assert!(!Namespace::Rest.is_agent());
    }
}
