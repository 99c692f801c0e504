//! Runtime configuration read from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_PINATA_GATEWAY: &str = "https://gateway.pinata.cloud";
pub const DEFAULT_NETWORK_ID: &str = "testnet";
pub const DEFAULT_CONTRACT_ID: &str = "veritasai.testnet";

/// Pinning endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinningConfig {
    /// Base URL of the pinning API (no trailing slash)
    pub api_url: String,
    /// Public gateway used to build retrieval URLs
    pub gateway_url: String,
    /// Bearer token; requests are sent unauthenticated when absent
    pub jwt: Option<String>,
    /// Per-request timeout. `None` means wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for PinningConfig {
    fn default() -> Self {
        PinningConfig {
            api_url: trim_url(
                &std::env::var("PINATA_API_URL")
                    .unwrap_or_else(|_| DEFAULT_PINATA_API_URL.to_string()),
            ),
            gateway_url: trim_url(
                &std::env::var("PINATA_GATEWAY")
                    .unwrap_or_else(|_| DEFAULT_PINATA_GATEWAY.to_string()),
            ),
            jwt: std::env::var("PINATA_JWT").ok().filter(|t| !t.is_empty()),
            request_timeout_secs: None,
        }
    }
}

impl PinningConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific API endpoint
    pub fn new(api_url: &str) -> Self {
        PinningConfig {
            api_url: trim_url(api_url),
            gateway_url: DEFAULT_PINATA_GATEWAY.to_string(),
            jwt: None,
            request_timeout_secs: None,
        }
    }

    /// Set authentication token
    pub fn with_jwt(mut self, jwt: &str) -> Self {
        self.jwt = Some(jwt.to_string());
        self
    }

    pub fn with_gateway(mut self, gateway_url: &str) -> Self {
        self.gateway_url = trim_url(gateway_url);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Wallet session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub network_id: String,
    /// Marketplace contract the session signs in against
    pub contract_id: String,
    /// Where the file-backed session store keeps the signed-in account
    pub session_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            network_id: std::env::var("VERITAS_NETWORK")
                .unwrap_or_else(|_| DEFAULT_NETWORK_ID.to_string()),
            contract_id: std::env::var("VERITAS_CONTRACT")
                .unwrap_or_else(|_| DEFAULT_CONTRACT_ID.to_string()),
            session_file: std::env::var("VERITAS_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".veritas").join("session.json")),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config rooted at an explicit session file, with default network and contract.
    pub fn at(session_file: PathBuf) -> Self {
        SessionConfig {
            network_id: DEFAULT_NETWORK_ID.to_string(),
            contract_id: DEFAULT_CONTRACT_ID.to_string(),
            session_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = PinningConfig::new("http://127.0.0.1:9000/");
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert!(config.jwt.is_none());
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let config = PinningConfig::new("http://x")
            .with_jwt("token")
            .with_gateway("https://gw.example/")
            .with_timeout(30);
        assert_eq!(config.jwt.as_deref(), Some("token"));
        assert_eq!(config.gateway_url, "https://gw.example");
        assert_eq!(config.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_env_urls_are_trimmed() {
        std::env::set_var("PINATA_API_URL", "http://127.0.0.1:9000//");
        std::env::set_var("PINATA_GATEWAY", "https://gw.example/");
        let config = PinningConfig::from_env();
        std::env::remove_var("PINATA_API_URL");
        std::env::remove_var("PINATA_GATEWAY");

        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.gateway_url, "https://gw.example");
    }

    #[test]
    fn test_session_config_at() {
        let config = SessionConfig::at(PathBuf::from("/tmp/s.json"));
        assert_eq!(config.network_id, "testnet");
        assert_eq!(config.contract_id, "veritasai.testnet");
    }
}
