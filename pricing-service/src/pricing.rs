//! Request-level composition of the evaluator, selector, calculator and tax
//! resolver over the injected stores. Nothing here is written back.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_money::Money;
use common_observability::PricingMetrics;
use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calculator::{amount_off, format_display};
use crate::eligibility::{is_eligible, EligibilityContext, FailureKind};
use crate::model::{CartItem, DiscountCode, DiscountType, PricedVariant, VariantDiscount, VariantPriceRequest};
use crate::repo::{Repositories, StoreError};
use crate::selector::select_best;
use crate::tax::{TaxResolver, TaxResult};

pub const MSG_DISCOUNT_APPLIED: &str = "Discount applied";
pub const MSG_SIGN_IN_FOR_FIRST_ORDER: &str = "Sign in to receive your first order discount";
pub const MSG_NOT_FIRST_ORDER: &str = "First order discount is only available on your first order";
pub const MSG_NO_FIRST_ORDER_CODE: &str = "No first order discount is currently available";
pub const MSG_FIRST_ORDER_UNAVAILABLE: &str = "First order discount is unavailable right now";

#[derive(Debug, Clone)]
pub struct PricingSettings {
    /// Canonical first-purchase code, stored uppercase.
    pub first_order_code: String,
    pub candidate_limit: usize,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings { first_order_code: "WELCOME30".to_string(), candidate_limit: 5 }
    }
}

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("discount lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// A discount resolved against a concrete subtotal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub discount_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: BigDecimal,
    pub amount_off: Money,
    pub display: String,
    pub stackable: bool,
    pub is_auto_apply: bool,
}

impl AppliedDiscount {
    pub fn resolve(discount: &DiscountCode, subtotal: &BigDecimal) -> Self {
        AppliedDiscount {
            discount_id: discount.id,
            code: discount.code.clone(),
            discount_type: discount.discount_type,
            discount_value: discount.discount_value.clone(),
            amount_off: Money::new(amount_off(discount, subtotal)),
            display: format_display(discount),
            stackable: discount.stackable,
            is_auto_apply: discount.auto_apply,
        }
    }
}

pub struct ValidateInput<'a> {
    pub code: &'a str,
    pub subtotal: &'a BigDecimal,
    pub items: &'a [CartItem],
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub is_valid: bool,
    pub discount: Option<DiscountCode>,
    pub amount_off: Money,
    pub message: String,
    pub display: Option<String>,
    /// Best auto-apply discount for the same cart; whether it combines with
    /// the code is up to the caller and the code's `stackable` flag.
    pub auto_apply: Option<AppliedDiscount>,
}

impl Validation {
    fn rejected(failure: &FailureKind) -> Self {
        Validation {
            is_valid: false,
            discount: None,
            amount_off: Money::zero(),
            message: failure.to_string(),
            display: None,
            auto_apply: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirstOrderOffer {
    pub has_first_order_discount: bool,
    pub discount: Option<AppliedDiscount>,
    pub message: Option<String>,
}

impl FirstOrderOffer {
    fn declined(message: impl Into<String>) -> Self {
        FirstOrderOffer { has_first_order_discount: false, discount: None, message: Some(message.into()) }
    }
}

pub struct PricingService {
    repos: Repositories,
    tax: TaxResolver,
    settings: PricingSettings,
    metrics: Arc<PricingMetrics>,
}

impl PricingService {
    pub fn new(repos: Repositories, settings: PricingSettings, metrics: Arc<PricingMetrics>) -> Self {
        let tax = TaxResolver::new(repos.tax_rates.clone());
        PricingService { repos, tax, settings, metrics }
    }

    pub fn metrics(&self) -> &PricingMetrics {
        &self.metrics
    }

    async fn order_history(&self, user_id: Option<Uuid>) -> Result<Option<bool>, StoreError> {
        match user_id {
            Some(id) => self.repos.orders.has_completed_order(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Order history first, then candidates; first-purchase rows are only
    /// fetched once the caller is known to have no completed order.
    async fn history_and_candidates(
        &self,
        subtotal: &BigDecimal,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> (Result<Option<bool>, StoreError>, Result<Vec<DiscountCode>, StoreError>) {
        let history = self.order_history(user_id).await;
        let first_purchase_ok = matches!(history, Ok(Some(false)));
        let candidates = self
            .repos
            .discounts
            .auto_apply_candidates(subtotal, now, self.settings.candidate_limit, first_purchase_ok)
            .await;
        (history, candidates)
    }

    /// Evaluate an explicit code for a cart. Only a failed code lookup (or a
    /// failed history lookup for a first-purchase code) is an error.
    pub async fn validate(&self, input: ValidateInput<'_>) -> Result<Validation, PricingError> {
        let now = Utc::now();
        let code = input.code.trim().to_ascii_uppercase();
        let (found, (history, candidates)) = tokio::join!(
            self.repos.discounts.find_by_code(&code),
            self.history_and_candidates(input.subtotal, input.user_id, now),
        );

        let found = found.inspect_err(|err| {
            warn!(store = "discounts", code = %code, error = %err, "Discount lookup failed");
            self.metrics.discount_outcome("validate", "store_error");
        })?;
        let Some(discount) = found.filter(|d| d.is_active) else {
            self.metrics.discount_outcome("validate", FailureKind::CodeNotFound.kind());
            return Ok(Validation::rejected(&FailureKind::CodeNotFound));
        };

        let has_completed_order = match history {
            Ok(known) => known,
            Err(err) if discount.first_purchase_only => {
                warn!(store = "orders", code = %code, error = %err, "Order history lookup failed");
                self.metrics.discount_outcome("validate", "store_error");
                return Err(err.into());
            }
            Err(_) => None,
        };

        let ctx = EligibilityContext {
            subtotal: input.subtotal,
            items: input.items,
            user_id: input.user_id,
            has_completed_order,
            now,
        };
        if let Err(failure) = is_eligible(&discount, &ctx) {
            debug!(code = %code, reason = failure.kind(), "Discount not eligible");
            self.metrics.discount_outcome("validate", failure.kind());
            return Ok(Validation::rejected(&failure));
        }

        let auto_apply = match candidates {
            Ok(list) => select_best(&list, &ctx)
                .filter(|best| best.id != discount.id)
                .map(|best| AppliedDiscount::resolve(best, input.subtotal)),
            Err(err) => {
                warn!(store = "discounts", error = %err, "Auto-apply lookup failed; skipping");
                None
            }
        };

        self.metrics.discount_outcome("validate", "valid");
        Ok(Validation {
            is_valid: true,
            amount_off: Money::new(amount_off(&discount, input.subtotal)),
            message: MSG_DISCOUNT_APPLIED.to_string(),
            display: Some(format_display(&discount)),
            discount: Some(discount),
            auto_apply,
        })
    }

    /// Best auto-apply discount for `subtotal`; store faults yield `None`.
    pub async fn auto_apply(&self, subtotal: &BigDecimal, user_id: Option<Uuid>) -> Option<AppliedDiscount> {
        let now = Utc::now();
        let (history, candidates) = self.history_and_candidates(subtotal, user_id, now).await;
        let has_completed_order = history.unwrap_or_else(|err| {
            warn!(store = "orders", error = %err, "Order history lookup failed; treating as unknown");
            None
        });
        let candidates = match candidates {
            Ok(list) => list,
            Err(err) => {
                warn!(store = "discounts", error = %err, "Auto-apply lookup failed; no discount");
                self.metrics.discount_outcome("auto_apply", "store_error");
                return None;
            }
        };
        let ctx = EligibilityContext {
            subtotal,
            items: &[],
            user_id,
            has_completed_order,
            now,
        };
        let selected = select_best(&candidates, &ctx).map(|best| AppliedDiscount::resolve(best, subtotal));
        match selected.as_ref() {
            Some(applied) => {
                debug!(code = %applied.code, "Auto-apply discount selected");
                self.metrics.discount_outcome("auto_apply", "selected");
            }
            None => self.metrics.discount_outcome("auto_apply", "none"),
        }
        selected
    }

    /// Offer the canonical first-purchase discount to a new customer. Every
    /// failure becomes a declined offer with a message.
    pub async fn first_order(&self, user_id: Option<Uuid>, total: &BigDecimal) -> FirstOrderOffer {
        let Some(user) = user_id else {
            self.metrics.discount_outcome("first_order", "anonymous");
            return FirstOrderOffer::declined(MSG_SIGN_IN_FOR_FIRST_ORDER);
        };
        let now = Utc::now();
        let (history, found) = tokio::join!(
            self.repos.orders.has_completed_order(user),
            self.repos.discounts.find_by_code(&self.settings.first_order_code),
        );

        let has_completed_order = match history {
            Ok(v) => v,
            Err(err) => {
                warn!(store = "orders", error = %err, "Order history lookup failed; declining first order discount");
                self.metrics.discount_outcome("first_order", "store_error");
                return FirstOrderOffer::declined(MSG_FIRST_ORDER_UNAVAILABLE);
            }
        };
        if has_completed_order {
            self.metrics.discount_outcome("first_order", "returning_customer");
            return FirstOrderOffer::declined(MSG_NOT_FIRST_ORDER);
        }

        let discount = match found {
            Ok(Some(d)) if d.is_active && d.first_purchase_only => d,
            Ok(_) => {
                self.metrics.discount_outcome("first_order", "unavailable");
                return FirstOrderOffer::declined(MSG_NO_FIRST_ORDER_CODE);
            }
            Err(err) => {
                warn!(store = "discounts", error = %err, "First order code lookup failed");
                self.metrics.discount_outcome("first_order", "store_error");
                return FirstOrderOffer::declined(MSG_FIRST_ORDER_UNAVAILABLE);
            }
        };

        let ctx = EligibilityContext {
            subtotal: total,
            items: &[],
            user_id: Some(user),
            has_completed_order: Some(false),
            now,
        };
        if let Err(failure) = is_eligible(&discount, &ctx) {
            self.metrics.discount_outcome("first_order", failure.kind());
            return FirstOrderOffer::declined(failure.to_string());
        }

        self.metrics.discount_outcome("first_order", "applied");
        FirstOrderOffer {
            has_first_order_discount: true,
            discount: Some(AppliedDiscount::resolve(&discount, total)),
            message: None,
        }
    }

    pub async fn resolve_tax(&self, country: &str, state: Option<&str>) -> TaxResult {
        let result = self.tax.resolve(country, state).await;
        self.metrics.tax_level(result.level.as_str());
        result
    }

    /// Price each variant through the store's discount function concurrently.
    /// A failed call leaves that variant undiscounted.
    pub async fn price_variants(&self, requests: Vec<VariantPriceRequest>) -> Vec<PricedVariant> {
        let lookups = requests.iter().map(|req| self.repos.variants.variant_discount(req));
        let results = join_all(lookups).await;
        requests
            .into_iter()
            .zip(results)
            .map(|(req, result)| {
                let discount = result.unwrap_or_else(|err| {
                    warn!(store = "variants", variant_id = %req.variant_id, error = %err, "Variant discount failed; using base price");
                    VariantDiscount::none(&req.base_price)
                });
                PricedVariant::merge(req, discount)
            })
            .collect()
    }
}
