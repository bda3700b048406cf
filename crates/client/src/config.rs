//! Client configuration and site credentials.
//!
//! [`ClientConfig`] carries every tunable of the client with defaults suited
//! to slow shared hosting: reads time out after 30 seconds, single updates
//! after four minutes and bulk updates after three. Values can be adjusted
//! through [`ClientConfigBuilder`] or from `SITEWARDEN_*` environment
//! variables via [`ClientConfig::from_env`].

use std::fmt;
use std::time::Duration;

use pacing::{DEFAULT_MIN_INTERVAL, DEFAULT_RATE_LIMIT_COOLDOWN};
use thiserror::Error;
use url::Url;
use wire::{NamespaceLayout, TimeoutClass};

/// Default timeout for inventory reads and quick mutations.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Default timeout for a single software update.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(240);
/// Default timeout for a bulk update call.
pub const DEFAULT_BULK_TIMEOUT: Duration = Duration::from_secs(180);
/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default pause before re-checking a mutation whose request timed out.
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(10);

/// Read timeout override, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SITEWARDEN_TIMEOUT_SECS";
/// Update timeout override, in seconds.
pub const ENV_UPDATE_TIMEOUT_SECS: &str = "SITEWARDEN_UPDATE_TIMEOUT_SECS";
/// Bulk timeout override, in seconds.
pub const ENV_BULK_TIMEOUT_SECS: &str = "SITEWARDEN_BULK_TIMEOUT_SECS";
/// Minimum request spacing override, in milliseconds.
pub const ENV_MIN_INTERVAL_MS: &str = "SITEWARDEN_MIN_INTERVAL_MS";
/// Rate-limit cooldown override, in seconds.
pub const ENV_RATE_LIMIT_COOLDOWN_SECS: &str = "SITEWARDEN_RATE_LIMIT_COOLDOWN_SECS";
/// Verification delay override, in seconds.
pub const ENV_VERIFY_DELAY_SECS: &str = "SITEWARDEN_VERIFY_DELAY_SECS";
/// User agent override.
pub const ENV_USER_AGENT: &str = "SITEWARDEN_USER_AGENT";

/// Errors raised while building a configuration or credential.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    /// The base URL could not be parsed.
    #[error("invalid site URL '{url}': {reason}")]
    InvalidUrl {
        /// Rejected input.
        url: String,
        /// Parser message.
        reason: String,
    },
    /// The base URL uses a scheme other than http or https.
    #[error("unsupported URL scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme {
        /// Rejected scheme.
        scheme: String,
    },
    /// The base URL has no host.
    #[error("site URL '{url}' has no host")]
    MissingHost {
        /// Rejected input.
        url: String,
    },
    /// The API key is empty after trimming.
    #[error("API key must not be empty")]
    EmptyApiKey,
    /// A timeout was configured as zero.
    #[error("{name} must be greater than zero")]
    ZeroTimeout {
        /// Name of the setting.
        name: &'static str,
    },
    /// The user agent is empty.
    #[error("user agent must not be empty")]
    EmptyUserAgent,
    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {var}: expected a non-negative integer")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
    /// The HTTP stack could not be initialised.
    #[error("failed to initialise HTTP client: {0}")]
    HttpClient(String),
}

/// Base URL and API key of one site.
///
/// Construction validates the URL and performs no network activity. The key
/// is redacted from `Debug` output.
#[derive(Clone, Eq, PartialEq)]
pub struct SiteCredential {
    base_url: Url,
    api_key: String,
}

impl SiteCredential {
    /// Validates and normalises a credential.
    ///
    /// The URL must be absolute http(s) with a host. Query and fragment are
    /// dropped and the path gains a trailing slash so namespace prefixes join
    /// below it.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        let mut url = Url::parse(trimmed).map_err(|error| ConfigError::InvalidUrl {
            url: trimmed.to_owned(),
            reason: error.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingHost {
                url: trimmed.to_owned(),
            });
        }
        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }

        Ok(Self {
            base_url: url,
            api_key: api_key.to_owned(),
        })
    }

    /// Returns the normalised base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for SiteCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteCredential")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Tunables shared by every call of one client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    read_timeout: Duration,
    update_timeout: Duration,
    bulk_timeout: Duration,
    connect_timeout: Duration,
    min_interval: Duration,
    rate_limit_cooldown: Duration,
    verify_delay: Duration,
    layout: NamespaceLayout,
    user_agent: String,
    client_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
            bulk_timeout: DEFAULT_BULK_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            min_interval: DEFAULT_MIN_INTERVAL,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            verify_delay: DEFAULT_VERIFY_DELAY,
            layout: NamespaceLayout::default(),
            user_agent: default_user_agent(),
            client_id: "sitewarden".to_owned(),
        }
    }
}

fn default_user_agent() -> String {
    format!("sitewarden/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Starts a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns a builder seeded with this configuration.
    #[must_use]
    pub fn to_builder(&self) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: self.clone(),
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Applies overrides supplied by `lookup` on top of the defaults.
    ///
    /// Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(var) {
                Some(value) if !value.trim().is_empty() => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnv { var, value }),
                _ => Ok(None),
            }
        };

        let mut builder = Self::builder();
        if let Some(secs) = read(ENV_TIMEOUT_SECS)? {
            builder = builder.read_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = read(ENV_UPDATE_TIMEOUT_SECS)? {
            builder = builder.update_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = read(ENV_BULK_TIMEOUT_SECS)? {
            builder = builder.bulk_timeout(Duration::from_secs(secs));
        }
        if let Some(millis) = read(ENV_MIN_INTERVAL_MS)? {
            builder = builder.min_interval(Duration::from_millis(millis));
        }
        if let Some(secs) = read(ENV_RATE_LIMIT_COOLDOWN_SECS)? {
            builder = builder.rate_limit_cooldown(Duration::from_secs(secs));
        }
        if let Some(secs) = read(ENV_VERIFY_DELAY_SECS)? {
            builder = builder.verify_delay(Duration::from_secs(secs));
        }
        if let Some(agent) = lookup(ENV_USER_AGENT).filter(|value| !value.trim().is_empty()) {
            builder = builder.user_agent(agent.trim());
        }
        builder.build()
    }

    /// Timeout for reads and quick mutations.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Timeout for single software updates.
    #[must_use]
    pub const fn update_timeout(&self) -> Duration {
        self.update_timeout
    }

    /// Timeout for bulk updates.
    #[must_use]
    pub const fn bulk_timeout(&self) -> Duration {
        self.bulk_timeout
    }

    /// Timeout for establishing a connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Minimum spacing between two requests to the site.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Pause after a rate-limited response.
    #[must_use]
    pub const fn rate_limit_cooldown(&self) -> Duration {
        self.rate_limit_cooldown
    }

    /// Pause before re-checking a mutation that timed out.
    #[must_use]
    pub const fn verify_delay(&self) -> Duration {
        self.verify_delay
    }

    /// Namespace prefixes.
    #[must_use]
    pub const fn layout(&self) -> &NamespaceLayout {
        &self.layout
    }

    /// User agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Client identifier sent to the agent.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the timeout for `class`.
    #[must_use]
    pub const fn timeout_for(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Read => self.read_timeout,
            TimeoutClass::Update => self.update_timeout,
            TimeoutClass::Bulk => self.bulk_timeout,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Sets the single-update timeout.
    #[must_use]
    pub const fn update_timeout(mut self, timeout: Duration) -> Self {
        self.config.update_timeout = timeout;
        self
    }

    /// Sets the bulk-update timeout.
    #[must_use]
    pub const fn bulk_timeout(mut self, timeout: Duration) -> Self {
        self.config.bulk_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the minimum spacing between requests. Zero disables spacing.
    #[must_use]
    pub const fn min_interval(mut self, interval: Duration) -> Self {
        self.config.min_interval = interval;
        self
    }

    /// Sets the rate-limit cooldown.
    #[must_use]
    pub const fn rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.rate_limit_cooldown = cooldown;
        self
    }

    /// Sets the verification delay.
    #[must_use]
    pub const fn verify_delay(mut self, delay: Duration) -> Self {
        self.config.verify_delay = delay;
        self
    }

    /// Sets the namespace prefixes.
    #[must_use]
    pub fn layout(mut self, layout: NamespaceLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Sets the client identifier sent to the agent.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = id.into();
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let config = self.config;
        for (name, value) in [
            ("read timeout", config.read_timeout),
            ("update timeout", config.update_timeout),
            ("bulk timeout", config.bulk_timeout),
            ("connect timeout", config.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout { name });
            }
        }
        if config.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        Ok(config)
    }
}
