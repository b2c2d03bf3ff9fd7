use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Once, OnceLock};
use tracing::info;

/// How monetary values are reduced to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Ties move away from zero (default).
    HalfUp,
    /// Ties move to the even cent.
    Bankers,
    /// Extra precision is dropped toward zero.
    Truncate,
}

impl RoundingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "half-up" | "half_up" | "halfup" => Some(RoundingMode::HalfUp),
            "bankers" | "half-even" | "half_even" => Some(RoundingMode::Bankers),
            "truncate" | "trunc" => Some(RoundingMode::Truncate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "half-up",
            RoundingMode::Bankers => "bankers",
            RoundingMode::Truncate => "truncate",
        }
    }
}

static ROUNDING_MODE: OnceLock<RoundingMode> = OnceLock::new();

/// Resolve the process-wide rounding mode from `MONEY_ROUNDING` (first call wins).
pub fn init_rounding_mode_from_env() -> RoundingMode {
    *ROUNDING_MODE.get_or_init(|| {
        std::env::var("MONEY_ROUNDING")
            .ok()
            .and_then(|v| RoundingMode::parse(&v))
            .unwrap_or(RoundingMode::HalfUp)
    })
}

pub fn rounding_mode() -> RoundingMode {
    init_rounding_mode_from_env()
}

pub fn log_rounding_mode_once() {
    static LOGGED: Once = Once::new();
    LOGGED.call_once(|| {
        info!(mode = rounding_mode().as_str(), "Money rounding mode resolved");
    });
}

fn cent() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

fn half_cent() -> BigDecimal {
    BigDecimal::new(5.into(), 3)
}

/// Round `value` to 2 decimal places using an explicit mode.
pub fn round_with(value: &BigDecimal, mode: RoundingMode) -> BigDecimal {
    // with_scale drops digits toward zero
    let truncated = value.with_scale(2);
    if mode == RoundingMode::Truncate {
        return truncated;
    }
    let remainder = (value - &truncated).abs();
    let half = half_cent();
    let away = match mode {
        RoundingMode::HalfUp => remainder >= half,
        RoundingMode::Bankers => {
            if remainder == half {
                let cents = (&truncated * &BigDecimal::from(100)).to_i64().unwrap_or(0);
                cents % 2 != 0
            } else {
                remainder > half
            }
        }
        RoundingMode::Truncate => false,
    };
    if !away {
        return truncated;
    }
    if value < &BigDecimal::zero() {
        (truncated - cent()).with_scale(2)
    } else {
        (truncated + cent()).with_scale(2)
    }
}

/// Normalize a monetary value to 2 decimal places using the configured rounding mode.
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    round_with(value, rounding_mode())
}

/// `base × percent / 100`, unrounded.
pub fn percent_of(base: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    base * percent / BigDecimal::from(100)
}

/// Clamp `value` into `[0, ceiling]`.
pub fn clamp_to(value: BigDecimal, ceiling: &BigDecimal) -> BigDecimal {
    let floor = BigDecimal::zero();
    if value < floor {
        return floor;
    }
    if &value > ceiling {
        return ceiling.clone();
    }
    value
}

/// Human-readable amount: two decimals with trailing zeros trimmed ("30.00" -> "30", "12.50" -> "12.5").
pub fn display_amount(value: &BigDecimal) -> String {
    let s = normalize_scale(value).to_string();
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct Money(BigDecimal);

impl Money {
    pub fn new(raw: BigDecimal) -> Self {
        Self(normalize_scale(&raw))
    }

    pub fn zero() -> Self {
        Self(BigDecimal::zero().with_scale(2))
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(BigDecimal::new(cents.into(), 2))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<BigDecimal> for Money {
    fn from(value: BigDecimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for BigDecimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.with_scale(2))
    }
}
