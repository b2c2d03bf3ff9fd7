use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_observability::PricingMetrics;
use uuid::Uuid;

use super::{
    DiscountRepository, OrderRepository, Repositories, StoreError, TaxRateRepository,
    VariantDiscountRepository,
};
use crate::model::{DiscountCode, TaxRate, VariantDiscount, VariantPriceRequest};
use crate::retry::{guarded_read, RetryPolicy};

/// Wraps a repository so each read gets a deadline and bounded retry.
pub struct Guarded<R: ?Sized> {
    inner: Arc<R>,
    policy: RetryPolicy,
    metrics: Arc<PricingMetrics>,
}

impl<R: ?Sized> Guarded<R> {
    pub fn new(inner: Arc<R>, policy: RetryPolicy, metrics: Arc<PricingMetrics>) -> Self {
        Guarded { inner, policy, metrics }
    }
}

impl Repositories {
    pub fn guarded(self, policy: RetryPolicy, metrics: Arc<PricingMetrics>) -> Repositories {
        Repositories {
            discounts: Arc::new(Guarded::new(self.discounts, policy.clone(), metrics.clone())),
            orders: Arc::new(Guarded::new(self.orders, policy.clone(), metrics.clone())),
            tax_rates: Arc::new(Guarded::new(self.tax_rates, policy.clone(), metrics.clone())),
            variants: Arc::new(Guarded::new(self.variants, policy, metrics)),
        }
    }
}

#[async_trait]
impl DiscountRepository for Guarded<dyn DiscountRepository> {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
        guarded_read(&self.policy, "discounts", &self.metrics, || self.inner.find_by_code(code)).await
    }

    async fn auto_apply_candidates(
        &self,
        subtotal: &BigDecimal,
        now: DateTime<Utc>,
        limit: usize,
        first_purchase_ok: bool,
    ) -> Result<Vec<DiscountCode>, StoreError> {
        guarded_read(&self.policy, "discounts", &self.metrics, || {
            self.inner.auto_apply_candidates(subtotal, now, limit, first_purchase_ok)
        })
        .await
    }
}

#[async_trait]
impl OrderRepository for Guarded<dyn OrderRepository> {
    async fn has_completed_order(&self, user_id: Uuid) -> Result<bool, StoreError> {
        guarded_read(&self.policy, "orders", &self.metrics, || self.inner.has_completed_order(user_id)).await
    }
}

#[async_trait]
impl TaxRateRepository for Guarded<dyn TaxRateRepository> {
    async fn find_state_rate(&self, country: &str, state: &str) -> Result<Option<TaxRate>, StoreError> {
        guarded_read(&self.policy, "tax_rates", &self.metrics, || self.inner.find_state_rate(country, state)).await
    }

    async fn find_country_rate(&self, country: &str) -> Result<Option<TaxRate>, StoreError> {
        guarded_read(&self.policy, "tax_rates", &self.metrics, || self.inner.find_country_rate(country)).await
    }
}

#[async_trait]
impl VariantDiscountRepository for Guarded<dyn VariantDiscountRepository> {
    async fn variant_discount(&self, request: &VariantPriceRequest) -> Result<VariantDiscount, StoreError> {
        guarded_read(&self.policy, "variants", &self.metrics, || self.inner.variant_discount(request)).await
    }
}
