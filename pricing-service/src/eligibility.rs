use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_money::display_amount;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{CartItem, DiscountCode};

/// Why a discount cannot be used. `Display` is the user-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("This discount code is no longer active")]
    Inactive,
    #[error("This discount code is not yet valid")]
    NotYetValid,
    #[error("This discount code has expired")]
    Expired,
    #[error("A minimum purchase of ${} is required for this discount", display_amount(.minimum))]
    BelowMinimumPurchase { minimum: BigDecimal },
    #[error("This discount is only available on your first order")]
    NotFirstPurchase,
    #[error("Invalid discount code")]
    CodeNotFound,
}

impl FailureKind {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FailureKind::Inactive => "inactive",
            FailureKind::NotYetValid => "not_yet_valid",
            FailureKind::Expired => "expired",
            FailureKind::BelowMinimumPurchase { .. } => "below_minimum_purchase",
            FailureKind::NotFirstPurchase => "not_first_purchase",
            FailureKind::CodeNotFound => "code_not_found",
        }
    }
}

/// Everything the evaluator may look at. `now` is captured once per request.
#[derive(Debug, Clone)]
pub struct EligibilityContext<'a> {
    pub subtotal: &'a BigDecimal,
    pub items: &'a [CartItem],
    pub user_id: Option<Uuid>,
    /// `None` when unknown (anonymous caller or history lookup failed).
    pub has_completed_order: Option<bool>,
    pub now: DateTime<Utc>,
}

/// Checks run in order and stop at the first failure. Cart items are carried
/// but do not restrict eligibility.
pub fn is_eligible(discount: &DiscountCode, ctx: &EligibilityContext<'_>) -> Result<(), FailureKind> {
    if !discount.is_active {
        return Err(FailureKind::Inactive);
    }
    if let Some(from) = discount.valid_from {
        if ctx.now < from {
            return Err(FailureKind::NotYetValid);
        }
    }
    if let Some(until) = discount.valid_until {
        if ctx.now > until {
            return Err(FailureKind::Expired);
        }
    }
    if let Some(minimum) = discount.minimum_purchase.as_ref() {
        if ctx.subtotal < minimum {
            return Err(FailureKind::BelowMinimumPurchase { minimum: minimum.clone() });
        }
    }
    if discount.first_purchase_only {
        let new_customer = ctx.user_id.is_some() && ctx.has_completed_order == Some(false);
        if !new_customer {
            return Err(FailureKind::NotFirstPurchase);
        }
    }
    Ok(())
}
