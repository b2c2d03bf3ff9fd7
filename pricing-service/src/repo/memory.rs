//! In-process stores for tests and local runs without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use common_money::{normalize_scale, percent_of};
use uuid::Uuid;

use super::{
    DiscountRepository, OrderRepository, Repositories, StoreError, TaxRateRepository,
    VariantDiscountRepository,
};
use crate::model::{DiscountCode, TaxRate, VariantDiscount, VariantPriceRequest};

#[derive(Debug, Default, Clone)]
pub struct InMemoryDiscounts {
    rows: Vec<DiscountCode>,
}

impl InMemoryDiscounts {
    pub fn new(rows: Vec<DiscountCode>) -> Self {
        InMemoryDiscounts { rows }
    }
}

#[async_trait]
impl DiscountRepository for InMemoryDiscounts {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
        Ok(self.rows.iter().find(|d| d.code.eq_ignore_ascii_case(code)).cloned())
    }

    async fn auto_apply_candidates(
        &self,
        subtotal: &BigDecimal,
        now: DateTime<Utc>,
        limit: usize,
        first_purchase_ok: bool,
    ) -> Result<Vec<DiscountCode>, StoreError> {
        let mut out: Vec<DiscountCode> = self
            .rows
            .iter()
            .filter(|d| d.is_active && d.auto_apply)
            .filter(|d| first_purchase_ok || !d.first_purchase_only)
            .filter(|d| d.valid_from.map_or(true, |from| from <= now))
            .filter(|d| d.valid_until.map_or(true, |until| until >= now))
            .filter(|d| d.minimum_purchase.as_ref().map_or(true, |min| min <= subtotal))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.code.to_ascii_uppercase().cmp(&b.code.to_ascii_uppercase()))
        });
        out.truncate(limit);
        Ok(out)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryOrders {
    completed: HashSet<Uuid>,
}

impl InMemoryOrders {
    pub fn with_completed(users: impl IntoIterator<Item = Uuid>) -> Self {
        InMemoryOrders { completed: users.into_iter().collect() }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn has_completed_order(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.completed.contains(&user_id))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryTaxRates {
    rows: Vec<TaxRate>,
}

impl InMemoryTaxRates {
    pub fn new(rows: Vec<TaxRate>) -> Self {
        InMemoryTaxRates { rows }
    }
}

#[async_trait]
impl TaxRateRepository for InMemoryTaxRates {
    async fn find_state_rate(&self, country: &str, state: &str) -> Result<Option<TaxRate>, StoreError> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.country_code == country && r.state_code.as_deref() == Some(state))
            .cloned())
    }

    async fn find_country_rate(&self, country: &str) -> Result<Option<TaxRate>, StoreError> {
        Ok(self.rows.iter().find(|r| r.country_code == country && r.state_code.is_none()).cloned())
    }
}

/// Variant discounts keyed by variant id, expressed as a percentage off.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVariantDiscounts {
    percentages: HashMap<Uuid, BigDecimal>,
    failing: HashSet<Uuid>,
}

impl InMemoryVariantDiscounts {
    pub fn with_discount(mut self, variant_id: Uuid, percentage: BigDecimal) -> Self {
        self.percentages.insert(variant_id, percentage);
        self
    }

    pub fn failing_for(mut self, variant_id: Uuid) -> Self {
        self.failing.insert(variant_id);
        self
    }
}

#[async_trait]
impl VariantDiscountRepository for InMemoryVariantDiscounts {
    async fn variant_discount(&self, request: &VariantPriceRequest) -> Result<VariantDiscount, StoreError> {
        if self.failing.contains(&request.variant_id) {
            return Err(StoreError::Database(format!("variant function failed for {}", request.variant_id)));
        }
        match self.percentages.get(&request.variant_id) {
            Some(pct) if !pct.is_zero() => {
                let off = percent_of(&request.base_price, pct);
                Ok(VariantDiscount {
                    has_discount: true,
                    discount_percentage: pct.clone(),
                    discounted_price: normalize_scale(&(&request.base_price - &off)),
                })
            }
            _ => Ok(VariantDiscount::none(&request.base_price)),
        }
    }
}

/// How a [`FaultyStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every read fails with a non-transient database error.
    Error,
    /// Every read fails with a transient connectivity error.
    Unavailable,
    /// Every read never resolves.
    Hang,
}

/// A store that fails every read; used to exercise fail-safe paths.
#[derive(Debug, Clone, Copy)]
pub struct FaultyStore(pub Fault);

impl FaultyStore {
    async fn fail<T>(&self) -> Result<T, StoreError> {
        match self.0 {
            Fault::Error => Err(StoreError::Database("relation does not exist".into())),
            Fault::Unavailable => Err(StoreError::Unavailable("connection refused".into())),
            Fault::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl DiscountRepository for FaultyStore {
    async fn find_by_code(&self, _code: &str) -> Result<Option<DiscountCode>, StoreError> {
        self.fail().await
    }

    async fn auto_apply_candidates(
        &self,
        _subtotal: &BigDecimal,
        _now: DateTime<Utc>,
        _limit: usize,
        _first_purchase_ok: bool,
    ) -> Result<Vec<DiscountCode>, StoreError> {
        self.fail().await
    }
}

#[async_trait]
impl OrderRepository for FaultyStore {
    async fn has_completed_order(&self, _user_id: Uuid) -> Result<bool, StoreError> {
        self.fail().await
    }
}

#[async_trait]
impl TaxRateRepository for FaultyStore {
    async fn find_state_rate(&self, _country: &str, _state: &str) -> Result<Option<TaxRate>, StoreError> {
        self.fail().await
    }

    async fn find_country_rate(&self, _country: &str) -> Result<Option<TaxRate>, StoreError> {
        self.fail().await
    }
}

#[async_trait]
impl VariantDiscountRepository for FaultyStore {
    async fn variant_discount(&self, _request: &VariantPriceRequest) -> Result<VariantDiscount, StoreError> {
        self.fail().await
    }
}

/// Builder for an all-in-memory [`Repositories`] set.
#[derive(Default)]
pub struct MemoryStores {
    pub discounts: InMemoryDiscounts,
    pub orders: InMemoryOrders,
    pub tax_rates: InMemoryTaxRates,
    pub variants: InMemoryVariantDiscounts,
}

impl MemoryStores {
    pub fn into_repositories(self) -> Repositories {
        Repositories {
            discounts: Arc::new(self.discounts),
            orders: Arc::new(self.orders),
            tax_rates: Arc::new(self.tax_rates),
            variants: Arc::new(self.variants),
        }
    }
}

/// Every store replaced by the same fault.
pub fn faulty_repositories(fault: Fault) -> Repositories {
    let store = Arc::new(FaultyStore(fault));
    Repositories {
        discounts: store.clone(),
        orders: store.clone(),
        tax_rates: store.clone(),
        variants: store,
    }
}
