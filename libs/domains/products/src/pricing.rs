//! Time source and sale pricing policy.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Source of "now" for sale-window checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Price charged while a product is inside its sale window.
pub trait SalePricing: Send + Sync {
    fn sale_price(&self, price: Decimal) -> Decimal;
}

/// Takes a fixed percentage off, rounded half away from zero to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentageDiscount {
    percent: Decimal,
}

impl PercentageDiscount {
    pub const DEFAULT_PERCENT: u32 = 10;

    /// `percent` is clamped to `0..=100`.
    pub fn new(percent: Decimal) -> Self {
        Self {
            percent: percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
        }
    }

    pub fn percent(&self) -> Decimal {
        self.percent
    }
}

impl Default for PercentageDiscount {
    fn default() -> Self {
        Self::new(Decimal::from(Self::DEFAULT_PERCENT))
    }
}

impl SalePricing for PercentageDiscount {
    fn sale_price(&self, price: Decimal) -> Decimal {
        let factor = (Decimal::ONE_HUNDRED - self.percent) / Decimal::ONE_HUNDRED;
        (price * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}
