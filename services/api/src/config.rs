//! Service configuration
//!
//! Defaults are layered under `STOKVEL_*` environment variables, e.g.
//! `STOKVEL_PORT=8080` or `STOKVEL_PAYMENT_WEBHOOK_SECRET=...`.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// HTTP server and collaborator settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the hosted checkout page
    pub payment_checkout_base_url: String,
    pub payment_currency: String,
    /// Shared secret expected in `X-Webhook-Secret`; unset disables the check
    pub payment_webhook_secret: Option<String>,
    /// Endpoint receiving notification events; unset logs them instead
    pub notification_url: Option<String>,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 4000)?
            .set_default(
                "payment_checkout_base_url",
                "https://sandbox.payfast.co.za/fake",
            )?
            .set_default("payment_currency", "ZAR")?
            .add_source(Environment::with_prefix("STOKVEL"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            payment_checkout_base_url: "https://sandbox.payfast.co.za/fake".to_string(),
            payment_currency: "ZAR".to_string(),
            payment_webhook_secret: None,
            notification_url: None,
        }
    }
}
