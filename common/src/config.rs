// common/src/config.rs
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};

/// Central configuration for the authentication platform
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub auth_server_addr: String,

    pub session: SessionConfig,
    pub nonce: NonceConfig,
    pub app_check: AppCheckConfig,
    pub chains: ChainsConfig,
}

/// Session token issuance settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

/// Pending-nonce lifecycle settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NonceConfig {
    /// Anti-replay window; short on purpose
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

/// Device attestation token settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppCheckConfig {
    /// Empty means the minter is unconfigured and refuses to issue tokens
    pub secret: String,
    pub token_ttl_secs: u64,
}

/// On-chain providers used for Safe contract-signature verification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainsConfig {
    pub default_chain_id: u64,
    /// Chain id (as a string key, TOML-friendly) to JSON-RPC endpoint
    pub rpc_urls: HashMap<String, String>,
}

impl ChainsConfig {
    pub fn rpc_url(&self, chain_id: u64) -> Option<&str> {
        self.rpc_urls.get(&chain_id.to_string()).map(String::as_str)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_server_addr: "127.0.0.1:8081".to_string(),

            session: SessionConfig {
                jwt_secret: "dev_secret".to_string(),
                token_ttl_secs: 86400,
            },
            nonce: NonceConfig {
                ttl_secs: 600, // 10 minutes
                cleanup_interval_secs: 600,
            },
            app_check: AppCheckConfig {
                secret: String::new(),
                token_ttl_secs: 3600,
            },
            chains: ChainsConfig {
                default_chain_id: 1,
                rpc_urls: HashMap::from([(
                    "1".to_string(),
                    "http://127.0.0.1:8545".to_string(),
                )]),
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        // Build configuration
        let config = ConfigFile::builder()
            // Start with defaults
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add environment specific config
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Add a local config file for local overrides
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment variables with prefix "APP"
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Build and deserialize
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from environment variables directly (backward compatibility)
    pub fn from_env() -> Self {
        // Try to load from file first
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let mut config = Self::default();

                if let Ok(addr) = env::var("AUTH_SERVER_ADDR") {
                    config.auth_server_addr = addr;
                }
                if let Ok(secret) = env::var("SESSION_JWT_SECRET") {
                    config.session.jwt_secret = secret;
                }
                if let Ok(ttl) = env::var("SESSION_TOKEN_TTL_SECS") {
                    if let Ok(ttl) = ttl.parse() {
                        config.session.token_ttl_secs = ttl;
                    }
                }
                if let Ok(ttl) = env::var("NONCE_TTL_SECS") {
                    if let Ok(ttl) = ttl.parse() {
                        config.nonce.ttl_secs = ttl;
                    }
                }
                if let Ok(interval) = env::var("NONCE_CLEANUP_INTERVAL_SECS") {
                    if let Ok(interval) = interval.parse() {
                        config.nonce.cleanup_interval_secs = interval;
                    }
                }
                if let Ok(secret) = env::var("APP_CHECK_SECRET") {
                    config.app_check.secret = secret;
                }
                if let Ok(ttl) = env::var("APP_CHECK_TOKEN_TTL_SECS") {
                    if let Ok(ttl) = ttl.parse() {
                        config.app_check.token_ttl_secs = ttl;
                    }
                }
                if let Ok(chain_id) = env::var("DEFAULT_CHAIN_ID") {
                    if let Ok(chain_id) = chain_id.parse() {
                        config.chains.default_chain_id = chain_id;
                    }
                }
                if let Ok(url) = env::var("CHAIN_RPC_URL") {
                    let key = config.chains.default_chain_id.to_string();
                    config.chains.rpc_urls.insert(key, url);
                }

                config
            }
        }
    }
}
