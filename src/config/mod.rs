//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::rules::GameRules;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,

    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,
    /// Directory with the browser views, served at `/`
    pub static_dir: Option<PathBuf>,

    /// Name of the rule set in use
    pub rules_name: String,
    /// Rule set with overrides applied
    pub rules: GameRules,
    /// Spawner seed; random when unset
    pub game_seed: Option<u64>,
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
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::invalid("LOG_FORMAT", other)),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let rules_name = lookup("GAME_RULES").unwrap_or_else(|| "standard".to_string());
        let mut rules = GameRules::by_name(&rules_name)
            .ok_or_else(|| ConfigError::invalid("GAME_RULES", &rules_name))?;

        if let Some(max_lives) = parse(&lookup, "MAX_LIVES")? {
            rules.max_lives = max_lives;
        }
        if let Some(initial_lives) = parse(&lookup, "INITIAL_LIVES")? {
            rules.initial_lives = initial_lives;
        }
        if rules.initial_lives == 0 || rules.initial_lives > rules.max_lives {
            return Err(ConfigError::invalid(
                "INITIAL_LIVES",
                &rules.initial_lives.to_string(),
            ));
        }
        match parse::<_, bool>(&lookup, "DIFFICULTY_SCALING")? {
            Some(false) => rules.difficulty = None,
            // Rule sets without a ramp borrow the standard one
            Some(true) if rules.difficulty.is_none() => {
                rules.difficulty = GameRules::standard().difficulty;
            }
            _ => {}
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            client_origins,
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),
            rules_name,
            rules,
            game_seed: parse(&lookup, "GAME_SEED")?,
        })
    }
}

/// Parse an optional variable, rejecting values that do not parse
fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| raw.trim().parse().map_err(|_| ConfigError::invalid(key, &raw)))
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
        }
    }
}
