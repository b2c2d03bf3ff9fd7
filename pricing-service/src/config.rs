use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub first_order_code: String,
    pub auto_apply_candidate_limit: usize,
    pub store: RetryPolicy,
    pub cors_allowed_origins: Vec<String>,
}

const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

impl PricingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .and_then(|v| normalize_optional(&v))
            .context("DATABASE_URL must be set")?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|err| anyhow!("Invalid PORT '{raw}': {err}"))?,
            None => 8090,
        };
        let first_order_code = lookup("FIRST_ORDER_DISCOUNT_CODE")
            .and_then(|v| normalize_optional(&v))
            .unwrap_or_else(|| "WELCOME30".to_string())
            .to_ascii_uppercase();
        let auto_apply_candidate_limit = number_from(&lookup, "AUTO_APPLY_CANDIDATE_LIMIT").unwrap_or(5);
        let timeout_ms = number_from(&lookup, "STORE_TIMEOUT_MS").unwrap_or(2000);
        let retries = number_from(&lookup, "STORE_RETRY_ATTEMPTS").unwrap_or(2);
        let base_ms = number_from(&lookup, "STORE_RETRY_BASE_MS").unwrap_or(25);
        let max_ms = number_from(&lookup, "STORE_RETRY_MAX_MS").unwrap_or(250);
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| parse_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect());

        Ok(Self {
            database_url,
            host,
            port,
            first_order_code,
            auto_apply_candidate_limit: auto_apply_candidate_limit.max(1) as usize,
            store: RetryPolicy {
                timeout: Duration::from_millis(timeout_ms.max(50)),
                retries: retries.min(10) as u32,
                base_delay: Duration::from_millis(base_ms.max(1)),
                max_delay: Duration::from_millis(max_ms.max(base_ms.max(1))),
            },
            cors_allowed_origins,
        })
    }
}

fn number_from<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.trim().parse::<u64>().ok())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(normalize_optional)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
