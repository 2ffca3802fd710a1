//! Engine configuration read from the process environment.
//!
//! The binary loads a `.env` file through `dotenvy` first; everything here
//! only looks at already-exported variables so tests can build configs
//! directly.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::{EngineError, Result};

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_ADAPTER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_WAREHOUSE_STOCK: u32 = 0;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub port: u16,
    /// Upper bound for a single `is_activated_for` or `calculate` call.
    pub adapter_timeout: Duration,
    pub vat_rates: VatRates,
    pub nats_url: Option<String>,
    pub warehouse_default_stock: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            adapter_timeout: Duration::from_millis(DEFAULT_ADAPTER_TIMEOUT_MS),
            vat_rates: VatRates::default(),
            nats_url: None,
            warehouse_default_stock: DEFAULT_WAREHOUSE_STOCK,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let port = match lookup("PORT") {
            Some(raw) => parse_setting("PORT", &raw)?,
            None => defaults.port,
        };
        let adapter_timeout = match lookup("PRICING_ADAPTER_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_setting("PRICING_ADAPTER_TIMEOUT_MS", &raw)?),
            None => defaults.adapter_timeout,
        };
        let vat_rates = match lookup("PRICING_VAT_RATES") {
            Some(raw) => raw.parse()?,
            None => defaults.vat_rates,
        };
        let warehouse_default_stock = match lookup("WAREHOUSE_DEFAULT_STOCK") {
            Some(raw) => parse_setting("WAREHOUSE_DEFAULT_STOCK", &raw)?,
            None => defaults.warehouse_default_stock,
        };
        Ok(Self {
            port,
            adapter_timeout,
            vat_rates,
            nats_url: lookup("NATS_URL").filter(|s| !s.trim().is_empty()),
            warehouse_default_stock,
        })
    }
}

fn parse_setting<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| EngineError::Validation(format!("{name} has an invalid value: {raw}")))
}

/// VAT rates keyed by ISO country code, as fractions (`0.081` = 8.1%).
#[derive(Clone, Debug, PartialEq)]
pub struct VatRates(BTreeMap<String, Decimal>);

impl VatRates {
    pub fn new(rates: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        Self(rates.into_iter().map(|(country, rate)| (country.to_uppercase(), rate)).collect())
    }

    pub fn rate_for(&self, country: &str) -> Option<Decimal> {
        self.0.get(&country.to_uppercase()).copied()
    }
}

impl Default for VatRates {
    fn default() -> Self {
        Self::new([
            ("CH".to_string(), Decimal::new(81, 3)),
            ("LI".to_string(), Decimal::new(81, 3)),
            ("DE".to_string(), Decimal::new(19, 2)),
            ("AT".to_string(), Decimal::new(20, 2)),
            ("FR".to_string(), Decimal::new(20, 2)),
            ("IT".to_string(), Decimal::new(22, 2)),
        ])
    }
}

impl FromStr for VatRates {
    type Err = EngineError;

    /// Parses `CH=0.081,DE=0.19`.
    fn from_str(raw: &str) -> Result<Self> {
        let mut rates = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (country, rate) = pair
                .split_once('=')
                .ok_or_else(|| EngineError::Validation(format!("PRICING_VAT_RATES entry without '=': {pair}")))?;
            let rate: Decimal = parse_setting("PRICING_VAT_RATES", rate)?;
            if rate.is_sign_negative() {
                return Err(EngineError::Validation(format!("negative VAT rate for {country}")));
            }
            rates.push((country.trim().to_string(), rate));
        }
        Ok(Self::new(rates))
    }
}
