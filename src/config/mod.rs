//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::rules::{FireMode, RuleSet, Tuning};
use crate::game::server::ServerSettings;
use crate::util::time::{clamp_tick_rate, DEFAULT_TPS};

/// Default cap on connected players per room
pub const DEFAULT_MAX_PLAYERS: usize = 16;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable text
    pub log_json: bool,
    /// Allowed client origins for CORS, comma separated; `*` allows any
    pub client_origin: String,

    /// Simulation rate in ticks per second
    pub tick_rate: u32,
    /// Rules used when the host does not override them
    pub default_rules: RuleSet,
    pub max_players: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR for hosted deployments
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let tick_rate = match lookup("TICK_RATE") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid("TICK_RATE", raw))?,
            None => DEFAULT_TPS,
        };

        let defaults = RuleSet::default();
        let fire_mode = match lookup("FIRE_MODE").as_deref().map(str::trim) {
            None => defaults.fire_mode,
            Some("limited_ammo") => FireMode::LimitedAmmo,
            Some("cooldown_only") => FireMode::CooldownOnly,
            Some(other) => return Err(ConfigError::Invalid("FIRE_MODE", other.to_string())),
        };

        let hider_min_distance = match lookup("HIDER_MIN_DISTANCE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|d| d.is_finite())
                .ok_or(ConfigError::Invalid("HIDER_MIN_DISTANCE", raw))?
                .max(0.0),
            None => defaults.hider_min_distance,
        };

        let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") | Some("pretty") => false,
            Some("json") => true,
            Some(other) => return Err(ConfigError::Invalid("LOG_FORMAT", other.to_string())),
        };

        let max_players = match lookup("MAX_PLAYERS_PER_ROOM") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("MAX_PLAYERS_PER_ROOM", raw))?,
            None => DEFAULT_MAX_PLAYERS,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json,
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            tick_rate: clamp_tick_rate(tick_rate),
            default_rules: RuleSet {
                fire_mode,
                casualty_penalty: parse_flag(&lookup, "CASUALTY_PENALTY", defaults.casualty_penalty)?,
                obstacles: parse_flag(&lookup, "OBSTACLES", defaults.obstacles)?,
                hider_min_distance,
            },
            max_players,
        })
    }

    /// Settings handed to the tick loop
    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            tick_rate: self.tick_rate,
            default_rules: self.default_rules,
            tuning: Tuning::default(),
            max_players: self.max_players,
        }
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key, raw)),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.default_rules, RuleSet::default());
        assert_eq!(config.max_players, DEFAULT_MAX_PLAYERS);
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn rule_variables_are_parsed() {
        let config = load(&[
            ("FIRE_MODE", "cooldown_only"),
            ("CASUALTY_PENALTY", "true"),
            ("OBSTACLES", "1"),
            ("HIDER_MIN_DISTANCE", "0"),
        ])
        .unwrap();
        assert_eq!(config.default_rules.fire_mode, FireMode::CooldownOnly);
        assert!(config.default_rules.casualty_penalty);
        assert!(config.default_rules.obstacles);
        assert_eq!(config.default_rules.hider_min_distance, 0.0);
    }

    #[test]
    fn log_format_selects_json() {
        assert!(!load(&[]).unwrap().log_json);
        assert!(load(&[("LOG_FORMAT", "json")]).unwrap().log_json);
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid("LOG_FORMAT", _))
        ));
    }

    #[test]
    fn tick_rate_is_clamped() {
        assert_eq!(load(&[("TICK_RATE", "1000")]).unwrap().tick_rate, 120);
        assert_eq!(load(&[("TICK_RATE", "2")]).unwrap().tick_rate, 10);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            load(&[("FIRE_MODE", "laser")]),
            Err(ConfigError::Invalid("FIRE_MODE", _))
        ));
        assert!(matches!(
            load(&[("OBSTACLES", "maybe")]),
            Err(ConfigError::Invalid("OBSTACLES", _))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
