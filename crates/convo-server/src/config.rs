use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub realtime_secret: String,
    /// Base URL of the user search index. `None` disables indexing.
    pub search_url: Option<String>,
    /// `None` disables the background digest sweep.
    pub digest_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let jwt_secret = get("CONVO_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CONVO_JWT_SECRET is unset or still a placeholder");
        }

        let port = match get("CONVO_PORT") {
            Some(v) => v.parse().context("CONVO_PORT must be a port number")?,
            None => 3000,
        };
        let digest_secs: u64 = match get("CONVO_DIGEST_INTERVAL_SECS") {
            Some(v) => v
                .parse()
                .context("CONVO_DIGEST_INTERVAL_SECS must be a number of seconds")?,
            None => 86_400,
        };

        Ok(Self {
            host: get("CONVO_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("CONVO_DB_PATH").unwrap_or_else(|| "convo.db".into()).into(),
            realtime_secret: get("CONVO_REALTIME_SECRET").unwrap_or_else(|| jwt_secret.clone()),
            jwt_secret,
            search_url: get("CONVO_SEARCH_URL"),
            digest_interval: (digest_secs > 0).then(|| Duration::from_secs(digest_secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("CONVO_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("convo.db"));
        assert_eq!(config.realtime_secret, "s3cret");
        assert!(config.search_url.is_none());
        assert_eq!(config.digest_interval, Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn placeholder_and_missing_secrets_are_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("CONVO_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn zero_interval_disables_digests() {
        let config = config(&[
            ("CONVO_JWT_SECRET", "s3cret"),
            ("CONVO_DIGEST_INTERVAL_SECS", "0"),
            ("CONVO_SEARCH_URL", "http://search:9200"),
        ])
        .unwrap();
        assert!(config.digest_interval.is_none());
        assert_eq!(config.search_url.as_deref(), Some("http://search:9200"));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("CONVO_JWT_SECRET", "s3cret"), ("CONVO_PORT", "http")]).is_err());
    }
}
