//! Server configuration: TOML file plus environment/CLI overrides.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command-line entry point, parsed with [`clap`].
///
/// Every field mirrors a key in [`ServerConfig`] and, when present, overrides
/// the value loaded from the config file -- `clap`'s `env` feature also lets
/// each one be set from the environment variable of the same name, so the
/// same binary can be driven from a file, a process manager's environment,
/// or plain flags.
#[derive(Debug, Parser)]
#[command(name = "lob-server", about = "Multi-product limit order book trading server")]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "LOB_CONFIG", default_value = "lob-server.toml")]
    pub config: PathBuf,

    /// Rebuild state from the newest persisted snapshot file before
    /// accepting connections, instead of starting empty.
    #[arg(long)]
    pub load: bool,

    /// Directory persisted snapshot files are read from and written to.
    #[arg(long, env = "LOB_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, env = "LOB_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "LOB_TRADING_SESSION")]
    pub trading_session: Option<String>,

    #[arg(long, env = "LOB_QUOTE_SESSION")]
    pub quote_session: Option<String>,
}

/// Error loading or validating a [`ServerConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    /// `PRODUCTS` was empty, or a required string key was blank.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "could not read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "could not parse config file: {err}"),
            ConfigError::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Static server configuration: the products traded, network endpoints, and
/// the defaults applied to every newly registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Product identifiers this server will open a book for.
    pub products: Vec<String>,
    /// TCP port the trading and quote sessions listen on.
    pub port: u16,
    /// Bind address for the state-mutating session, `host:port`.
    pub trading_session: String,
    /// Bind address for the read-only session, `host:port`.
    pub quote_session: String,
    /// Starting cash budget assigned to a newly registered user.
    pub initial_budget: i64,
    /// Flat per-order fee, in ticks.
    pub fixed_fee: i64,
    /// Notional-proportional per-order fee (e.g. `0.001` = 10 bps).
    pub percentage_fee: f64,
}

impl ServerConfig {
    /// Load from a TOML file at `path`, then apply any CLI overrides.
    pub fn load(path: &std::path::Path, cli: &Cli) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ServerConfig = toml::from_str(&contents)?;
        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(trading_session) = &cli.trading_session {
            self.trading_session = trading_session.clone();
        }
        if let Some(quote_session) = &cli.quote_session {
            self.quote_session = quote_session.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.products.is_empty() {
            return Err(ConfigError::Invalid("PRODUCTS must list at least one product".to_string()));
        }
        if self.trading_session.is_empty() || self.quote_session.is_empty() {
            return Err(ConfigError::Invalid("TRADING_SESSION and QUOTE_SESSION must both be set".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
            products = ["ABC", "XYZ"]
            port = 7000
            trading_session = "0.0.0.0:7001"
            quote_session = "0.0.0.0:7002"
            initial_budget = 10000
            fixed_fee = 1
            percentage_fee = 0.001
        "#
    }

    #[test]
    fn parses_well_formed_config() {
        let config: ServerConfig = toml::from_str(sample_toml()).unwrap();
        assert_eq!(config.products, vec!["ABC".to_string(), "XYZ".to_string()]);
        assert_eq!(config.port, 7000);
        assert_eq!(config.initial_budget, 10000);
    }

    #[test]
    fn rejects_empty_product_list() {
        let mut config: ServerConfig = toml::from_str(sample_toml()).unwrap();
        config.products.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn cli_port_override_wins_over_file() {
        let mut config: ServerConfig = toml::from_str(sample_toml()).unwrap();
        let cli = Cli {
            config: "lob-server.toml".into(),
            load: false,
            data_dir: "data".into(),
            port: Some(9999),
            trading_session: None,
            quote_session: None,
        };
        config.apply_overrides(&cli);
        assert_eq!(config.port, 9999);
        assert_eq!(config.trading_session, "0.0.0.0:7001");
    }
}
