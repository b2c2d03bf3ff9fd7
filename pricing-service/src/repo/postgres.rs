use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::{
    DiscountRepository, OrderRepository, Repositories, StoreError, TaxRateRepository,
    VariantDiscountRepository,
};
use crate::model::{DiscountCode, DiscountType, TaxRate, VariantDiscount, VariantPriceRequest};

const DISCOUNT_COLUMNS: &str = "id, code, discount_type, discount_value, maximum_discount, minimum_purchase, \
     stackable, auto_apply, first_purchase_only, priority, valid_from, valid_until, is_active";

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_value: BigDecimal,
    maximum_discount: Option<BigDecimal>,
    minimum_purchase: Option<BigDecimal>,
    stackable: bool,
    auto_apply: bool,
    first_purchase_only: bool,
    priority: i32,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    is_active: bool,
}

impl DiscountRow {
    fn into_discount(self) -> Option<DiscountCode> {
        let Some(discount_type) = DiscountType::parse(&self.discount_type) else {
            warn!(code = %self.code, discount_type = %self.discount_type, "Skipping discount with unknown type");
            return None;
        };
        Some(DiscountCode {
            id: self.id,
            code: self.code,
            discount_type,
            discount_value: self.discount_value,
            maximum_discount: self.maximum_discount,
            minimum_purchase: self.minimum_purchase,
            stackable: self.stackable,
            auto_apply: self.auto_apply,
            first_purchase_only: self.first_purchase_only,
            priority: self.priority,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
        })
    }
}

#[derive(Clone)]
pub struct PgDiscountRepository {
    pool: PgPool,
}

impl PgDiscountRepository {
    pub fn new(pool: PgPool) -> Self {
        PgDiscountRepository { pool }
    }
}

#[async_trait]
impl DiscountRepository for PgDiscountRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
        let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes WHERE upper(code) = upper($1) LIMIT 1");
        let row = sqlx::query_as::<_, DiscountRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(DiscountRow::into_discount))
    }

    async fn auto_apply_candidates(
        &self,
        subtotal: &BigDecimal,
        now: DateTime<Utc>,
        limit: usize,
        first_purchase_ok: bool,
    ) -> Result<Vec<DiscountCode>, StoreError> {
        let sql = format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discount_codes \
             WHERE is_active = TRUE AND auto_apply = TRUE \
               AND (valid_from IS NULL OR valid_from <= $1) \
               AND (valid_until IS NULL OR valid_until >= $1) \
               AND (minimum_purchase IS NULL OR minimum_purchase <= $2) \
               AND (first_purchase_only = FALSE OR $4) \
             ORDER BY priority DESC, upper(code) ASC \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, DiscountRow>(&sql)
            .bind(now)
            .bind(subtotal)
            .bind(limit as i64)
            .bind(first_purchase_ok)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().filter_map(DiscountRow::into_discount).collect())
    }
}

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        PgOrderRepository { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn has_completed_order(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1 AND payment_status = 'completed')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaxRateRow {
    country_code: String,
    state_code: Option<String>,
    state_name: Option<String>,
    rate: BigDecimal,
    tax_type: Option<String>,
    gst: Option<BigDecimal>,
    pst: Option<BigDecimal>,
    qst: Option<BigDecimal>,
    hst: Option<BigDecimal>,
}

impl From<TaxRateRow> for TaxRate {
    fn from(row: TaxRateRow) -> Self {
        TaxRate {
            country_code: row.country_code,
            state_code: row.state_code,
            state_name: row.state_name,
            rate: row.rate,
            tax_type: row.tax_type,
            gst: row.gst,
            pst: row.pst,
            qst: row.qst,
            hst: row.hst,
        }
    }
}

#[derive(Clone)]
pub struct PgTaxRateRepository {
    pool: PgPool,
}

impl PgTaxRateRepository {
    pub fn new(pool: PgPool) -> Self {
        PgTaxRateRepository { pool }
    }
}

#[async_trait]
impl TaxRateRepository for PgTaxRateRepository {
    async fn find_state_rate(&self, country: &str, state: &str) -> Result<Option<TaxRate>, StoreError> {
        let row = sqlx::query_as::<_, TaxRateRow>(
            "SELECT country_code, state_code, state_name, rate, tax_type, gst, pst, qst, hst \
             FROM tax_rates WHERE country_code = $1 AND state_code = $2 LIMIT 1",
        )
        .bind(country)
        .bind(state)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TaxRate::from))
    }

    async fn find_country_rate(&self, country: &str) -> Result<Option<TaxRate>, StoreError> {
        let row = sqlx::query_as::<_, TaxRateRow>(
            "SELECT country_code, state_code, state_name, rate, tax_type, gst, pst, qst, hst \
             FROM tax_rates WHERE country_code = $1 AND state_code IS NULL LIMIT 1",
        )
        .bind(country)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TaxRate::from))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantDiscountRow {
    has_discount: Option<bool>,
    discount_percentage: Option<BigDecimal>,
    discounted_price: Option<BigDecimal>,
}

/// Calls the database-side `calculate_variant_discount` function.
#[derive(Clone)]
pub struct PgVariantDiscountRepository {
    pool: PgPool,
}

impl PgVariantDiscountRepository {
    pub fn new(pool: PgPool) -> Self {
        PgVariantDiscountRepository { pool }
    }
}

#[async_trait]
impl VariantDiscountRepository for PgVariantDiscountRepository {
    async fn variant_discount(&self, request: &VariantPriceRequest) -> Result<VariantDiscount, StoreError> {
        let row = sqlx::query_as::<_, VariantDiscountRow>(
            "SELECT has_discount, discount_percentage, discounted_price \
             FROM calculate_variant_discount($1, $2, $3, $4)",
        )
        .bind(request.variant_id)
        .bind(request.product_id)
        .bind(request.category_id)
        .bind(&request.base_price)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(VariantDiscount::none(&request.base_price));
        };
        if !row.has_discount.unwrap_or(false) {
            return Ok(VariantDiscount::none(&request.base_price));
        }
        Ok(VariantDiscount {
            has_discount: true,
            discount_percentage: row.discount_percentage.unwrap_or_else(|| BigDecimal::from(0)),
            discounted_price: row.discounted_price.unwrap_or_else(|| request.base_price.clone()),
        })
    }
}

/// Postgres-backed store set sharing one pool.
pub fn pg_repositories(pool: PgPool) -> Repositories {
    Repositories {
        discounts: std::sync::Arc::new(PgDiscountRepository::new(pool.clone())),
        orders: std::sync::Arc::new(PgOrderRepository::new(pool.clone())),
        tax_rates: std::sync::Arc::new(PgTaxRateRepository::new(pool.clone())),
        variants: std::sync::Arc::new(PgVariantDiscountRepository::new(pool)),
    }
}
