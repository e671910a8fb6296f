use thiserror::Error;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub listen: String,
    pub pool_size: u32,
    pub development: bool,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to honor a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let listen = lookup("COVIDVAX_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());

        let pool_size = match lookup("COVIDVAX_POOL_SIZE") {
            None => DEFAULT_POOL_SIZE,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid { name: "COVIDVAX_POOL_SIZE", value: raw }),
            },
        };

        let development = match lookup("COVIDVAX_DEV").as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid { name: "COVIDVAX_DEV", value: other.to_string() })
            }
        };

        Ok(Config { database_url, listen, pool_size, development })
    }

    pub fn default_log_filter(&self) -> &'static str {
        if self.development {
            "debug"
        } else {
            "info"
        }
    }
}
