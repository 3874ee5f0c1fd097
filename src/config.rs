//! Runtime settings loaded from environment variables.
//!
//! Required: `GOOGLE_APPLICATION_CREDENTIALS_JSON` (inline service account
//! JSON), `DOCAI_PROCESSOR_ID`, and `SCAN_TIMEOUT_SECS`. The timeout is
//! deliberately not defaulted so a deployment must state how long a hung
//! scan may hold a concurrency slot. Everything else has defaults, and the
//! OpenAI key is optional (enhancement disables itself without it).

use crate::address::AddressStrategy;
use crate::scan::token::ServiceAccountKey;
use anyhow::{Context, Result};
use std::env;

#[derive(Clone)]
pub struct Settings {
    pub bind_addr: String,
    /// Concurrency ceiling K for batch scans.
    pub concurrency: usize,
    /// Per-scan timeout, seconds. Required.
    pub scan_timeout_secs: u64,
    pub dedup_enabled: bool,
    pub address_strategy: AddressStrategy,
    /// Run AI enhancement over completed scans when exporting.
    pub enhance_on_export: bool,
    pub docai_location: String,
    pub docai_processor_id: String,
    pub credentials: ServiceAccountKey,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let credentials_json = env::var("GOOGLE_APPLICATION_CREDENTIALS_JSON")
            .context("GOOGLE_APPLICATION_CREDENTIALS_JSON environment variable not set")?;
        let credentials: ServiceAccountKey = serde_json::from_str(&credentials_json)
            .context("Failed to parse GOOGLE_APPLICATION_CREDENTIALS_JSON")?;

        let docai_processor_id = env::var("DOCAI_PROCESSOR_ID")
            .context("DOCAI_PROCESSOR_ID environment variable not set")?;

        let scan_timeout_secs: u64 = env::var("SCAN_TIMEOUT_SECS")
            .context("SCAN_TIMEOUT_SECS environment variable not set")?
            .parse()
            .context("SCAN_TIMEOUT_SECS must be an integer number of seconds")?;

        let concurrency = match env::var("MAX_CONCURRENT_SCANS") {
            Ok(v) => v
                .parse::<usize>()
                .ok()
                .filter(|k| *k >= 1)
                .context("MAX_CONCURRENT_SCANS must be an integer >= 1")?,
            Err(_) => 5,
        };

        let address_strategy = match env::var("ADDRESS_STRATEGY") {
            Ok(v) => AddressStrategy::from_str(&v).with_context(|| {
                format!(
                    "Unknown ADDRESS_STRATEGY '{}'. Expected: static, ai, sentinel",
                    v
                )
            })?,
            Err(_) => AddressStrategy::FailSentinel,
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            concurrency,
            scan_timeout_secs,
            dedup_enabled: env_flag("DEDUP_ENABLED", true),
            address_strategy,
            enhance_on_export: env_flag("ENHANCE_ON_EXPORT", false),
            docai_location: env::var("DOCAI_LOCATION").unwrap_or_else(|_| "us".to_string()),
            docai_processor_id,
            credentials,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}
