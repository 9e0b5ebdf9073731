//! RPC endpoint configuration
//!
//! Resolution order:
//! 1. `SUI_RPC_URL` - explicit full node endpoint (highest priority)
//! 2. Public full node for the configured network - rate limited, for testing only
//!
//! `SUI_RPC_AUTH_TOKEN` optionally supplies a bearer token for providers
//! that require one. It is held as a secret and never logged.
//!
//! # Examples
//!
//! ```bash
//! export SUI_RPC_URL="https://sui-testnet.example-provider.io"
//! export SUI_RPC_AUTH_TOKEN="YOUR_TOKEN"
//! ```

use super::Network;
use crate::{Error, Result};
use secrecy::SecretString;
use url::Url;

/// Environment variable names
mod env_vars {
    pub const SUI_RPC_URL: &str = "SUI_RPC_URL";
    pub const SUI_RPC_AUTH_TOKEN: &str = "SUI_RPC_AUTH_TOKEN";
}

/// Full node connection settings
#[derive(Debug, Clone)]
pub struct RpcConfig {
    url: Url,
    auth_token: Option<SecretString>,
}

impl RpcConfig {
    /// Resolve the endpoint for `network` from the environment
    pub fn from_env(network: Network) -> Result<Self> {
        let url = match std::env::var(env_vars::SUI_RPC_URL) {
            Ok(url) => {
                tracing::debug!("Using SUI_RPC_URL");
                url
            }
            Err(_) => {
                tracing::warn!(
                    network = network.name(),
                    "No RPC configured, using public full node (rate limited)"
                );
                network.public_fullnode().to_string()
            }
        };

        let mut config = Self::with_url(&url)?;
        if let Ok(token) = std::env::var(env_vars::SUI_RPC_AUTH_TOKEN) {
            tracing::info!("Using SUI_RPC_AUTH_TOKEN for RPC authentication");
            config.auth_token = Some(SecretString::from(token));
        }
        Ok(config)
    }

    /// Create with an explicit endpoint
    pub fn with_url(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::Config(format!("Invalid RPC URL {}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "RPC URL must be http or https, got {}",
                url.scheme()
            )));
        }
        Ok(Self {
            url,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn auth_token(&self) -> Option<&SecretString> {
        self.auth_token.as_ref()
    }
}
