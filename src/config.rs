//! Application-level configuration loading: sign-in accounts and new-match defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    auth::AuthUser,
    scoreboard::{MatchDefaults, TeamMap},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG_PATH";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    accounts: Vec<Account>,
    defaults: MatchDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Credentials allowed to sign in.
pub struct Account {
    /// Login email, compared case-insensitively.
    pub email: String,
    /// Plain password as declared in the configuration file.
    pub password: String,
    /// Name shown once signed in.
    pub display_name: String,
}

impl AppConfig {
    /// Build a configuration from explicit parts.
    pub fn new(accounts: Vec<Account>, defaults: MatchDefaults) -> Self {
        Self { accounts, defaults }
    }

    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        accounts = config.accounts.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if config.accounts.is_empty() {
            warn!("no accounts configured; every sign-in will be rejected");
        }
        config
    }

    /// Parse the JSON configuration format.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Names used to seed new matches.
    pub fn match_defaults(&self) -> &MatchDefaults {
        &self.defaults
    }

    /// Resolve the account matching `email` and `password`.
    pub fn authenticate(&self, email: &str, password: &str) -> Option<AuthUser> {
        self.accounts
            .iter()
            .find(|account| account.email.eq_ignore_ascii_case(email.trim()))
            .filter(|account| account.password == password)
            .map(|account| AuthUser {
                email: account.email.clone(),
                display_name: account.display_name.clone(),
            })
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    accounts: Vec<RawAccount>,
    #[serde(default)]
    defaults: Option<RawDefaults>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    email: String,
    password: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    teams: TeamMap<String>,
    players: TeamMap<[String; 2]>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let accounts = value.accounts.into_iter().map(Into::into).collect();
        let defaults = value
            .defaults
            .map(|raw| MatchDefaults {
                team_names: raw.teams,
                player_names: raw.players,
            })
            .unwrap_or_default();
        Self { accounts, defaults }
    }
}

impl From<RawAccount> for Account {
    fn from(value: RawAccount) -> Self {
        let display_name = value
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| value.email.clone());
        Self {
            email: value.email,
            password: value.password,
            display_name,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "accounts": [
            {"email": "Umpire@Club.test", "password": "shuttle42", "display_name": "Chair"},
            {"email": "scorer@club.test", "password": "netcord"}
        ],
        "defaults": {
            "teams": {"a": "Home", "b": "Away"},
            "players": {"a": ["H1", "H2"], "b": ["A1", "A2"]}
        }
    }"#;

    #[test]
    fn parses_accounts_and_defaults() {
        let config = AppConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.match_defaults().team_names.b, "Away");
        assert_eq!(config.match_defaults().player_names.a[1], "H2");

        let user = config.authenticate("scorer@club.test", "netcord").unwrap();
        assert_eq!(user.display_name, "scorer@club.test");
    }

    #[test]
    fn email_match_ignores_case_but_password_does_not() {
        let config = AppConfig::from_json(SAMPLE).unwrap();
        assert!(config.authenticate(" umpire@club.test", "shuttle42").is_some());
        assert!(config.authenticate("umpire@club.test", "Shuttle42").is_none());
        assert!(config.authenticate("nobody@club.test", "shuttle42").is_none());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.match_defaults(), &MatchDefaults::default());
        assert!(config.authenticate("a@b.c", "whatever").is_none());
    }
}
