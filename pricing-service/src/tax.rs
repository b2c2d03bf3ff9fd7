use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::TaxRate;
use crate::repo::{StoreError, TaxRateRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxLevel {
    State,
    Country,
    None,
}

impl TaxLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxLevel::State => "state",
            TaxLevel::Country => "country",
            TaxLevel::None => "none",
        }
    }
}

/// Informational split of the rate; components absent in the store are zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxBreakdown {
    pub gst: BigDecimal,
    pub pst: BigDecimal,
    pub qst: BigDecimal,
    pub hst: BigDecimal,
}

impl TaxBreakdown {
    fn zero() -> Self {
        TaxBreakdown {
            gst: BigDecimal::zero(),
            pst: BigDecimal::zero(),
            qst: BigDecimal::zero(),
            hst: BigDecimal::zero(),
        }
    }

    fn from_rate(rate: &TaxRate) -> Self {
        let or_zero = |v: &Option<BigDecimal>| v.clone().unwrap_or_else(BigDecimal::zero);
        TaxBreakdown {
            gst: or_zero(&rate.gst),
            pst: or_zero(&rate.pst),
            qst: or_zero(&rate.qst),
            hst: or_zero(&rate.hst),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    pub rate: BigDecimal,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_type: Option<String>,
    pub breakdown: TaxBreakdown,
    pub level: TaxLevel,
}

impl TaxResult {
    fn none(country: String) -> Self {
        TaxResult {
            rate: BigDecimal::zero(),
            country,
            state: None,
            state_name: None,
            tax_type: None,
            breakdown: TaxBreakdown::zero(),
            level: TaxLevel::None,
        }
    }

    fn from_row(row: TaxRate, level: TaxLevel) -> Self {
        let breakdown = TaxBreakdown::from_rate(&row);
        let (state, state_name) = match level {
            TaxLevel::State => (row.state_code, row.state_name),
            _ => (None, None),
        };
        TaxResult {
            rate: row.rate,
            country: row.country_code,
            state,
            state_name,
            tax_type: row.tax_type,
            breakdown,
            level,
        }
    }
}

/// Maps a (country, state) pair to the most specific stored tax rate.
#[derive(Clone)]
pub struct TaxResolver {
    rates: Arc<dyn TaxRateRepository>,
}

impl TaxResolver {
    pub fn new(rates: Arc<dyn TaxRateRepository>) -> Self {
        TaxResolver { rates }
    }

    /// State row, then country row, then a zero rate. Store faults resolve to
    /// the zero rate and are logged; this never fails.
    pub async fn resolve(&self, country: &str, state: Option<&str>) -> TaxResult {
        let country = country.trim().to_ascii_uppercase();
        if country.is_empty() {
            return TaxResult::none(country);
        }
        let state = state.map(|s| s.trim().to_ascii_uppercase()).filter(|s| !s.is_empty());
        match self.lookup(&country, state.as_deref()).await {
            Ok(Some(result)) => {
                debug!(country = %country, level = result.level.as_str(), "Resolved tax rate");
                result
            }
            Ok(None) => TaxResult::none(country),
            Err(err) => {
                warn!(store = "tax_rates", country = %country, error = %err, "Tax lookup failed; using zero rate");
                TaxResult::none(country)
            }
        }
    }

    async fn lookup(&self, country: &str, state: Option<&str>) -> Result<Option<TaxResult>, StoreError> {
        if let Some(state) = state {
            if let Some(row) = self.rates.find_state_rate(country, state).await? {
                return Ok(Some(TaxResult::from_row(row, TaxLevel::State)));
            }
        }
        Ok(self
            .rates
            .find_country_rate(country)
            .await?
            .map(|row| TaxResult::from_row(row, TaxLevel::Country)))
    }
}
