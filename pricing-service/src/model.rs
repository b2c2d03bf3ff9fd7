use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> Option<DiscountType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" => Some(DiscountType::Percentage),
            "fixed" | "fixed_amount" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

/// A promotional discount record as stored in the discount catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent (0-100) for percentage discounts, currency amount for fixed ones.
    pub discount_value: BigDecimal,
    /// Cap on the computed amount; only meaningful for percentage discounts.
    pub maximum_discount: Option<BigDecimal>,
    pub minimum_purchase: Option<BigDecimal>,
    pub stackable: bool,
    pub auto_apply: bool,
    pub first_purchase_only: bool,
    pub priority: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * &BigDecimal::from(self.quantity)
    }
}

/// Sum of line totals, unrounded.
pub fn cart_subtotal(items: &[CartItem]) -> BigDecimal {
    items.iter().fold(BigDecimal::zero(), |acc, item| acc + item.line_total())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRate {
    pub country_code: String,
    pub state_code: Option<String>,
    pub state_name: Option<String>,
    /// Fraction, e.g. 0.13 for 13%.
    pub rate: BigDecimal,
    pub tax_type: Option<String>,
    pub gst: Option<BigDecimal>,
    pub pst: Option<BigDecimal>,
    pub qst: Option<BigDecimal>,
    pub hst: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPriceRequest {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub base_price: BigDecimal,
}

/// Result of the store-side variant discount function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDiscount {
    pub has_discount: bool,
    pub discount_percentage: BigDecimal,
    pub discounted_price: BigDecimal,
}

impl VariantDiscount {
    pub fn none(base_price: &BigDecimal) -> Self {
        VariantDiscount {
            has_discount: false,
            discount_percentage: BigDecimal::zero(),
            discounted_price: base_price.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedVariant {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub base_price: BigDecimal,
    pub has_discount: bool,
    pub discount_percentage: BigDecimal,
    pub discounted_price: BigDecimal,
}

impl PricedVariant {
    pub fn merge(request: VariantPriceRequest, discount: VariantDiscount) -> Self {
        PricedVariant {
            variant_id: request.variant_id,
            product_id: request.product_id,
            base_price: request.base_price,
            has_discount: discount.has_discount,
            discount_percentage: discount.discount_percentage,
            discounted_price: discount.discounted_price,
        }
    }
}
