//! Read-only access to the backing stores. The orchestrator only sees these
//! traits; Postgres and in-memory implementations live in submodules.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{DiscountCode, TaxRate, VariantDiscount, VariantPriceRequest};

pub mod guarded;
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("store read timed out after {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Timeouts and connectivity faults may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout(_) | StoreError::Unavailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "database",
            StoreError::Timeout(_) => "timeout",
            StoreError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Case-insensitive lookup; returns inactive records too.
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError>;

    /// Active, auto-apply, in-window records whose minimum is met by `subtotal`,
    /// highest priority first, at most `limit` rows. First-purchase records are
    /// left out unless `first_purchase_ok`, so they cannot crowd the limit.
    async fn auto_apply_candidates(
        &self,
        subtotal: &BigDecimal,
        now: DateTime<Utc>,
        limit: usize,
        first_purchase_ok: bool,
    ) -> Result<Vec<DiscountCode>, StoreError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Whether the user has at least one order with a completed payment.
    async fn has_completed_order(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TaxRateRepository: Send + Sync {
    async fn find_state_rate(&self, country: &str, state: &str) -> Result<Option<TaxRate>, StoreError>;
    /// Country-wide row (no state code).
    async fn find_country_rate(&self, country: &str) -> Result<Option<TaxRate>, StoreError>;
}

#[async_trait]
pub trait VariantDiscountRepository: Send + Sync {
    async fn variant_discount(&self, request: &VariantPriceRequest) -> Result<VariantDiscount, StoreError>;
}

/// The set of stores injected into the pricing service.
#[derive(Clone)]
pub struct Repositories {
    pub discounts: Arc<dyn DiscountRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub tax_rates: Arc<dyn TaxRateRepository>,
    pub variants: Arc<dyn VariantDiscountRepository>,
}
