//! Configuration loading and representation.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Defaults in code
//! 2. `config/{environment}.toml`, if present
//! 3. Environment variables with the `SHOPLEDGER_` prefix, `__` between
//!    sections (e.g. `SHOPLEDGER_DATABASE__URL`)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use shopledger_accounting::PaymentTerms;
use shopledger_core::{Decimal, DomainResult};
use shopledger_observability::LogConfig;
use shopledger_sales::TaxRate;

use crate::engine::BusinessPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// development, production, ...
    pub environment: String,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub business: BusinessConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL. Without one the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Where the external accounting ledger lives.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub url: String,
    /// Company name exactly as the ledger knows it.
    pub company: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConfig {
    pub tax_rate: Decimal,
    pub payment_terms_days: u32,
    pub default_min_stock: Decimal,
    /// Attempts at issuing a document number before giving up.
    pub number_attempts: u32,
}

impl BusinessConfig {
    pub fn policy(&self) -> DomainResult<BusinessPolicy> {
        Ok(BusinessPolicy {
            tax_rate: TaxRate::new(self.tax_rate)?,
            payment_terms: PaymentTerms::net(self.payment_terms_days),
            default_min_stock: self.default_min_stock,
            number_attempts: self.number_attempts.max(1),
        })
    }
}

impl AppConfig {
    /// Load for the environment named by `SHOPLEDGER_ENVIRONMENT`
    /// (default `development`).
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("SHOPLEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self::load_for(&environment)
    }

    pub fn load_for(environment: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .set_default("environment", environment)?
            .set_default("database.max_connections", 5)?
            .set_default("ledger.url", "http://localhost:9000")?
            .set_default("ledger.company", "Your Company Name")?
            .set_default("business.tax_rate", "0.18")?
            .set_default("business.payment_terms_days", 30)?
            .set_default("business.default_min_stock", "5")?
            .set_default("business.number_attempts", 5)?
            .set_default("log.filter", "info")?
            .set_default("log.json", true)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("SHOPLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
