//! Trend store connection settings from environment variables.

use anyhow::{Result, bail};
use std::fmt;

pub const STORE_URL_VAR: &str = "TRENDS_STORE_URL";
pub const STORE_KEY_VAR: &str = "TRENDS_STORE_KEY";

/// Where the store lives and how to authenticate. Both are required.
#[derive(Clone)]
pub struct StoreEnvConfig {
    pub endpoint: String,
    pub credential: String,
}

impl StoreEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = lookup(STORE_URL_VAR)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let credential = lookup(STORE_KEY_VAR)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        let missing: Vec<&str> = [(STORE_URL_VAR, &endpoint), (STORE_KEY_VAR, &credential)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            bail!("Missing store configuration: {}", missing.join(", "));
        }

        Ok(Self {
            endpoint,
            credential,
        })
    }
}

impl fmt::Debug for StoreEnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreEnvConfig")
            .field("endpoint", &self.endpoint)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_store_config_requires_both_values() {
        let err = StoreEnvConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("TRENDS_STORE_URL, TRENDS_STORE_KEY"));

        let err =
            StoreEnvConfig::from_lookup(lookup(&[(STORE_URL_VAR, "sqlite://t.db")])).unwrap_err();
        assert!(err.to_string().contains(STORE_KEY_VAR));
        assert!(!err.to_string().contains(STORE_URL_VAR));

        let err = StoreEnvConfig::from_lookup(lookup(&[
            (STORE_URL_VAR, "  "),
            (STORE_KEY_VAR, "secret"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(STORE_URL_VAR));
    }

    #[test]
    fn test_store_config_loads_and_redacts() {
        let config = StoreEnvConfig::from_lookup(lookup(&[
            (STORE_URL_VAR, "sqlite://data/trends.db"),
            (STORE_KEY_VAR, "secret"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "sqlite://data/trends.db");
        assert_eq!(config.credential, "secret");
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
