//! Server configuration

use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Public base URL; verification links are built from it
    pub canonical_url: String,

    /// Name used in outbound messages
    pub site_name: String,

    /// SQLite database path; in-memory stores when unset
    pub database_path: Option<String>,

    /// Seconds between outbound queue sweeps
    pub dequeue_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            canonical_url: "http://localhost:3000".to_string(),
            site_name: "Tipline".to_string(),
            database_path: None,
            dequeue_interval_secs: 60,
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults
    ///
    /// - PORT
    /// - CANONICAL_URL
    /// - SITE_NAME
    /// - DATABASE_PATH
    /// - DEQUEUE_INTERVAL_SECS
    pub fn from_env() -> Self {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        let defaults = Self::default();
        Self {
            port: get_env("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            canonical_url: get_env("CANONICAL_URL").unwrap_or(defaults.canonical_url),
            site_name: get_env("SITE_NAME").unwrap_or(defaults.site_name),
            database_path: get_env("DATABASE_PATH"),
            dequeue_interval_secs: get_env("DEQUEUE_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.dequeue_interval_secs),
        }
    }

    pub fn site(&self) -> Result<SiteConfig, url::ParseError> {
        SiteConfig::new(&self.canonical_url, &self.site_name)
    }
}

/// Site identity shared by request handlers and the sweep
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub canonical_url: Url,
    pub site_name: String,
}

impl SiteConfig {
    pub fn new(canonical_url: &str, site_name: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            canonical_url: Url::parse(canonical_url)?,
            site_name: site_name.to_string(),
        })
    }

    /// Link that completes verification of `address` for `username`
    pub fn verification_link(&self, username: &str, address: &str, nonce: &str) -> String {
        let mut url = self.canonical_url.clone();
        url.set_path(&format!("/{username}/emails/verify.html"));
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("email", address)
            .append_pair("nonce", nonce);
        url.to_string()
    }
}
