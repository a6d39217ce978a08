use anyhow::Context;
use serde::Deserialize;

/// Runtime configuration, read from environment variables.
///
/// `USE_IN_MEMORY_DB=true` swaps the postgres store for the process local
/// one. `SEED_USERS` provisions accounts at startup from comma separated
/// `username:token` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub use_in_memory_db: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    #[serde(default = "default_db_host")]
    pub db_host: String,
    #[serde(default = "default_db_username")]
    pub db_username: String,
    #[serde(default = "default_db_password")]
    pub db_password: String,
    #[serde(default)]
    pub seed_users: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_username() -> String {
    "postgres".to_string()
}

fn default_db_password() -> String {
    "postgres".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_in_memory_db: false,
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            db_host: default_db_host(),
            db_username: default_db_username(),
            db_password: default_db_password(),
            seed_users: None,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("Failed to read configuration from environment")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Parses `SEED_USERS` into (username, token) pairs.
    ///
    /// Malformed entries are skipped with a warning instead of failing
    /// startup.
    pub fn parsed_seed_users(&self) -> Vec<(String, String)> {
        let Some(raw) = self.seed_users.as_deref() else {
            return vec![];
        };
        raw.split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                match entry.split_once(':') {
                    Some((username, token)) if !username.is_empty() && !token.is_empty() => {
                        Some((username.to_string(), token.to_string()))
                    }
                    _ => {
                        tracing::warn!("Ignoring malformed seed user entry: {}", entry);
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.use_in_memory_db);
        assert_eq!(settings.bind_address, "0.0.0.0");
        assert_eq!(settings.bind_port, 8080);
        assert_eq!(settings.db_host, "127.0.0.1");
        assert!(settings.seed_users.is_none());
        assert!(settings.parsed_seed_users().is_empty());
    }

    #[test]
    fn test_seed_users_parsing() {
        let settings = Settings {
            seed_users: Some("alice:alice-token, bob:bob-token".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings.parsed_seed_users(),
            vec![
                ("alice".to_string(), "alice-token".to_string()),
                ("bob".to_string(), "bob-token".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_seed_user_entries_are_skipped() {
        let settings = Settings {
            seed_users: Some("no-token,, :early,alice:ok,:".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings.parsed_seed_users(),
            vec![("alice".to_string(), "ok".to_string())]
        );
    }

    #[test]
    fn test_token_may_contain_a_colon() {
        let settings = Settings {
            seed_users: Some("alice:v1:abc".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings.parsed_seed_users(),
            vec![("alice".to_string(), "v1:abc".to_string())]
        );
    }
}
