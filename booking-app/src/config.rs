//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use anyhow::Context;
use booking_types::Currency;

/// Which payment gateway adapter to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayConfig {
    Stripe {
        secret_key: String,
        api_base: Option<String>,
    },
    /// In-memory gateway that settles every session immediately.
    Sandbox,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub site_domain: String,
    pub gateway: GatewayConfig,
    pub currency: Currency,
    pub default_location: String,
    pub rate_limit_per_minute: u32,
    pub sweep_interval: Duration,
    pub sweep_max_attempts: i32,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "3000").parse().context("PORT must be a port number")?;

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let site_domain = get("SITE_DOMAIN")
            .ok_or_else(|| anyhow::anyhow!("SITE_DOMAIN environment variable is required"))?;

        let gateway = match or("PAYMENT_GATEWAY", "stripe").to_ascii_lowercase().as_str() {
            "stripe" => GatewayConfig::Stripe {
                secret_key: get("STRIPE_SECRET_KEY").ok_or_else(|| {
                    anyhow::anyhow!("STRIPE_SECRET_KEY is required when PAYMENT_GATEWAY=stripe")
                })?,
                api_base: get("STRIPE_API_BASE"),
            },
            "sandbox" => GatewayConfig::Sandbox,
            other => anyhow::bail!("Unknown PAYMENT_GATEWAY: {} (expected stripe or sandbox)", other),
        };

        let currency = or("CHECKOUT_CURRENCY", "bdt")
            .parse()
            .context("CHECKOUT_CURRENCY is not a supported currency")?;

        let default_location = or("DEFAULT_LOCATION", "Dhaka");

        let rate_limit_per_minute = or("RATE_LIMIT_PER_MINUTE", "100")
            .parse()
            .context("RATE_LIMIT_PER_MINUTE must be a number")?;

        let sweep_secs: u64 = or("SWEEP_INTERVAL_SECS", "30")
            .parse()
            .context("SWEEP_INTERVAL_SECS must be a number of seconds")?;
        if sweep_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be at least 1");
        }
        let sweep_interval = Duration::from_secs(sweep_secs);

        let sweep_max_attempts = or("SWEEP_MAX_ATTEMPTS", "5")
            .parse()
            .context("SWEEP_MAX_ATTEMPTS must be a number")?;

        let cors_origins = or(
            "CORS_ORIGINS",
            &booking_hex::inbound::DEFAULT_CORS_ORIGINS.join(","),
        )
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

        Ok(Self {
            port,
            database_url,
            site_domain,
            gateway,
            currency,
            default_location,
            rate_limit_per_minute,
            sweep_interval,
            sweep_max_attempts,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SITE_DOMAIN", "http://localhost:5173"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
        ])
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.currency, Currency::BDT);
        assert_eq!(config.default_location, "Dhaka");
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.sweep_max_attempts, 5);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "http://localhost:5174"]
        );
        assert_eq!(
            config.gateway,
            GatewayConfig::Stripe {
                secret_key: "sk_test_123".to_string(),
                api_base: None,
            }
        );
    }

    #[test]
    fn test_sandbox_needs_no_secret() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SITE_DOMAIN", "http://localhost:5173"),
            ("PAYMENT_GATEWAY", "Sandbox"),
            ("CHECKOUT_CURRENCY", "usd"),
            ("CORS_ORIGINS", "https://shop.example.com, "),
        ])
        .unwrap();

        assert_eq!(config.gateway, GatewayConfig::Sandbox);
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.cors_origins, vec!["https://shop.example.com"]);
    }

    #[test]
    fn test_missing_required_values() {
        assert!(load(&[("SITE_DOMAIN", "http://localhost:5173")]).is_err());
        assert!(load(&[("DATABASE_URL", "sqlite::memory:")]).is_err());

        // Stripe is the default gateway and needs its key.
        let err = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SITE_DOMAIN", "http://localhost:5173"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("STRIPE_SECRET_KEY"));
    }

    #[test]
    fn test_rejects_unknown_gateway() {
        let result = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SITE_DOMAIN", "http://localhost:5173"),
            ("PAYMENT_GATEWAY", "paypal"),
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_sweep_interval() {
        let err = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SITE_DOMAIN", "http://localhost:5173"),
            ("PAYMENT_GATEWAY", "sandbox"),
            ("SWEEP_INTERVAL_SECS", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SWEEP_INTERVAL_SECS"));

        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SITE_DOMAIN", "http://localhost:5173"),
            ("PAYMENT_GATEWAY", "sandbox"),
            ("SWEEP_INTERVAL_SECS", "1"),
        ])
        .unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
    }
}
