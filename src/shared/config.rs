use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project URL of the hosted backend, without the `/rest/v1` suffix.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    pub sync_on_reconnect: bool,
    pub command_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/cim.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                url: None,
                api_key: None,
                access_token: None,
                request_timeout: 15,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 30,
                sync_on_reconnect: true,
                command_buffer: 32,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so callers (and tests) are not tied to
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("CIM_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.database.url = format!("sqlite:{}/cim.db?mode=rwc", v.trim_end_matches('/'));
            cfg.storage.data_dir = v;
        }
        if let Some(v) = lookup("CIM_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            cfg.database.url = v;
        }
        if let Some(value) = lookup("CIM_DB_MAX_CONNECTIONS").and_then(|v| parse_u64(&v)) {
            cfg.database.max_connections = value.min(u64::from(u32::MAX)) as u32;
        }

        cfg.remote.url = lookup("CIM_REMOTE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());
        cfg.remote.api_key = lookup("CIM_REMOTE_API_KEY").filter(|v| !v.is_empty());
        cfg.remote.access_token = lookup("CIM_REMOTE_ACCESS_TOKEN").filter(|v| !v.is_empty());
        if let Some(value) = lookup("CIM_REMOTE_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.remote.request_timeout = value.max(1);
        }

        if let Some(v) = lookup("CIM_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = lookup("CIM_SYNC_INTERVAL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.sync.sync_interval = value.max(1);
        }
        if let Some(v) = lookup("CIM_SYNC_ON_RECONNECT") {
            cfg.sync.sync_on_reconnect = parse_bool(&v, cfg.sync.sync_on_reconnect);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.sync_interval == 0 {
            return Err("Sync interval must be greater than 0".to_string());
        }
        if self.sync.command_buffer == 0 {
            return Err("Sync command_buffer must be greater than 0".to_string());
        }
        if let Some(url) = &self.remote.url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(format!("Remote url must be http(s): {url}"));
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sync.sync_interval, 30);
        assert!(cfg.remote.url.is_none());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("CIM_REMOTE_URL", "https://example.supabase.co/"),
            ("CIM_REMOTE_API_KEY", "anon"),
            ("CIM_SYNC_INTERVAL_SECS", "0"),
            ("CIM_AUTO_SYNC", "off"),
            ("CIM_DB_MAX_CONNECTIONS", "2"),
        ]));

        assert_eq!(cfg.remote.url.as_deref(), Some("https://example.supabase.co"));
        assert_eq!(cfg.remote.api_key.as_deref(), Some("anon"));
        assert_eq!(cfg.sync.sync_interval, 1);
        assert!(!cfg.sync.auto_sync);
        assert_eq!(cfg.database.max_connections, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn data_dir_moves_database_unless_url_is_explicit() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("CIM_DATA_DIR", "/var/lib/cim/")]));
        assert_eq!(cfg.database.url, "sqlite:/var/lib/cim/cim.db?mode=rwc");

        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("CIM_DATA_DIR", "/var/lib/cim"),
            ("CIM_DATABASE_URL", "sqlite::memory:"),
        ]));
        assert_eq!(cfg.database.url, "sqlite::memory:");
    }

    #[test]
    fn rejects_non_http_remote() {
        let mut cfg = AppConfig::default();
        cfg.remote.url = Some("ftp://nope".to_string());
        assert!(cfg.validate().is_err());
    }
}
