//! Client configuration.
//!
//! Read from the environment; CLI flags override individual fields.
//!
//! | variable | default |
//! |---|---|
//! | `KARATBOOK_API_URL` | `http://localhost:5000/api` |
//! | `KARATBOOK_HTTP_TIMEOUT_SECS` | `30` |
//! | `KARATBOOK_STATE_DB` | `<data dir>/karatbook/state.db` |

use std::path::PathBuf;
use std::time::Duration;

pub const API_URL_VAR: &str = "KARATBOOK_API_URL";
pub const TIMEOUT_VAR: &str = "KARATBOOK_HTTP_TIMEOUT_SECS";
pub const STATE_DB_VAR: &str = "KARATBOOK_STATE_DB";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid KARATBOOK_HTTP_TIMEOUT_SECS value '{0}': expected whole seconds")]
    InvalidTimeout(String),
    #[error("could not determine a data directory; set KARATBOOK_STATE_DB")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    /// SQLite file holding the persisted session.
    pub state_db: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = var(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let request_timeout = match var(TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let state_db = match var(STATE_DB_VAR) {
            Some(path) => PathBuf::from(path),
            None => default_state_db().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            api_url,
            request_timeout,
            state_db,
        })
    }
}

/// `<data dir>/karatbook/state.db`, if the platform has a data directory.
pub fn default_state_db() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("karatbook").join("state.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_values_win() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://shop.example/api"),
            (TIMEOUT_VAR, "5"),
            (STATE_DB_VAR, "/tmp/kb.db"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://shop.example/api");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.state_db, PathBuf::from("/tmp/kb.db"));
    }

    #[test]
    fn defaults_apply_to_unset_and_blank_values() {
        let config =
            ClientConfig::from_lookup(lookup(&[(API_URL_VAR, " "), (STATE_DB_VAR, "/tmp/kb.db")]))
                .unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon"), (STATE_DB_VAR, "x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(v) if v == "soon"));
    }
}
