use std::cmp::Ordering;

use crate::eligibility::{is_eligible, EligibilityContext};
use crate::model::DiscountCode;

/// Higher priority first; equal priorities fall back to the uppercased code, then id.
fn rank(a: &DiscountCode, b: &DiscountCode) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.code.to_ascii_uppercase().cmp(&b.code.to_ascii_uppercase()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Best auto-apply discount among `candidates`. Each candidate is re-checked
/// regardless of any filtering the store already did.
pub fn select_best<'d>(candidates: &'d [DiscountCode], ctx: &EligibilityContext<'_>) -> Option<&'d DiscountCode> {
    candidates
        .iter()
        .filter(|d| d.auto_apply && is_eligible(d, ctx).is_ok())
        .min_by(|a, b| rank(a, b))
}
