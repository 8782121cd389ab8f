use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::error::RollupError;
use crate::types::{Money, Multiplier, Rate};
use crate::CoreResult;

/// Smallest margin rate the engine accepts (a full discount).
pub const MIN_RATE: Rate = dec!(-1);
/// Largest margin rate the engine accepts.
pub const MAX_RATE: Rate = dec!(10);
/// Largest global margin multiplier the engine accepts.
pub const MAX_MULTIPLIER: Multiplier = dec!(10);

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Margin rate for a group amount within a category.
///
/// `None` means no tier is configured for that amount; the engine treats
/// it as "no markup". Rates are expected within `MIN_RATE..=MAX_RATE`.
pub trait CategoryMarginLookup {
    fn category_margin(&self, category_id: i64, amount: Money) -> Option<Rate>;
}

/// Business-wide margin for a net amount, as a multiplier (1.05 = +5%).
///
/// `None` means no tier is configured; the engine treats it as the neutral
/// multiplier 1. Multipliers are expected within `(0, MAX_MULTIPLIER]`.
pub trait GlobalMarginLookup {
    fn global_margin(&self, amount: Money) -> Option<Multiplier>;
}

impl<F> CategoryMarginLookup for F
where
    F: Fn(i64, Money) -> Option<Rate>,
{
    fn category_margin(&self, category_id: i64, amount: Money) -> Option<Rate> {
        self(category_id, amount)
    }
}

impl<F> GlobalMarginLookup for F
where
    F: Fn(Money) -> Option<Multiplier>,
{
    fn global_margin(&self, amount: Money) -> Option<Multiplier> {
        self(amount)
    }
}

/// Lookup with nothing configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMargin;

impl CategoryMarginLookup for NoMargin {
    fn category_margin(&self, _category_id: i64, _amount: Money) -> Option<Rate> {
        None
    }
}

impl GlobalMarginLookup for NoMargin {
    fn global_margin(&self, _amount: Money) -> Option<Multiplier> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tier tables
// ---------------------------------------------------------------------------

/// One "margin by amount" tier. Bounds are inclusive; an open `to_amount`
/// extends to infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginTier {
    pub from_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_amount: Option<Money>,
    pub rate: Decimal,
}

impl MarginTier {
    pub fn contains(&self, amount: Money) -> bool {
        amount >= self.from_amount && self.to_amount.map_or(true, |to| amount <= to)
    }
}

/// Ordered tier list; the first tier containing the amount wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarginTierTable {
    pub tiers: Vec<MarginTier>,
}

impl MarginTierTable {
    pub fn new(tiers: Vec<MarginTier>) -> Self {
        MarginTierTable { tiers }
    }

    pub fn rate_for(&self, amount: Money) -> Option<Decimal> {
        self.tiers.iter().find(|t| t.contains(amount)).map(|t| t.rate)
    }

    /// Reject tiers whose rate falls outside `rates`.
    pub fn validate_rates(&self, table: &str, rates: RangeInclusive<Decimal>) -> CoreResult<()> {
        match self.tiers.iter().find(|t| !rates.contains(&t.rate)) {
            Some(tier) => Err(RollupError::InvalidTier {
                table: table.to_string(),
                reason: format!(
                    "rate {} at {} is outside {} to {}",
                    tier.rate,
                    tier.from_amount,
                    rates.start(),
                    rates.end()
                ),
            }),
            None => Ok(()),
        }
    }

    /// Reject negative bounds, inverted ranges and overlapping tiers.
    pub fn validate(&self, table: &str) -> CoreResult<()> {
        let invalid = |reason: String| RollupError::InvalidTier {
            table: table.to_string(),
            reason,
        };

        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.from_amount < Decimal::ZERO {
                return Err(invalid(format!("tier {i}: from_amount cannot be negative")));
            }
            if let Some(to) = tier.to_amount {
                if to < tier.from_amount {
                    return Err(invalid(format!(
                        "tier {i}: to_amount ({to}) is below from_amount ({})",
                        tier.from_amount
                    )));
                }
            }
        }

        let mut sorted: Vec<&MarginTier> = self.tiers.iter().collect();
        sorted.sort_by(|a, b| a.from_amount.cmp(&b.from_amount));
        for pair in sorted.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            let overlaps = lower.to_amount.map_or(true, |to| to >= upper.from_amount);
            if overlaps {
                return Err(invalid(format!(
                    "tiers starting at {} and {} overlap",
                    lower.from_amount, upper.from_amount
                )));
            }
        }
        Ok(())
    }
}

/// Tier tables keyed by category id. Rates are plain rates (0.15 = +15%).
#[derive(Debug, Clone, Default)]
pub struct CategoryMarginTable {
    categories: HashMap<i64, MarginTierTable>,
}

impl CategoryMarginTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category_id: i64, table: MarginTierTable) {
        self.categories.insert(category_id, table);
    }

    pub fn with_category(mut self, category_id: i64, table: MarginTierTable) -> Self {
        self.insert(category_id, table);
        self
    }

    pub fn contains(&self, category_id: i64) -> bool {
        self.categories.contains_key(&category_id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn validate(&self) -> CoreResult<()> {
        let mut ids: Vec<&i64> = self.categories.keys().collect();
        ids.sort();
        for id in ids {
            let name = format!("category {id}");
            let table = &self.categories[id];
            table.validate(&name)?;
            table.validate_rates(&name, MIN_RATE..=MAX_RATE)?;
        }
        Ok(())
    }
}

impl CategoryMarginLookup for CategoryMarginTable {
    fn category_margin(&self, category_id: i64, amount: Money) -> Option<Rate> {
        self.categories
            .get(&category_id)
            .and_then(|table| table.rate_for(amount))
    }
}

/// Global margin tiers. Rates are multipliers (1.05 = +5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalMarginTable(pub MarginTierTable);

impl GlobalMarginTable {
    pub fn validate(&self) -> CoreResult<()> {
        self.0.validate("global")?;
        if let Some(tier) = self.0.tiers.iter().find(|t| t.rate <= Decimal::ZERO) {
            return Err(RollupError::InvalidTier {
                table: "global".into(),
                reason: format!(
                    "multiplier {} at {} must be positive",
                    tier.rate, tier.from_amount
                ),
            });
        }
        self.0.validate_rates("global", Decimal::ZERO..=MAX_MULTIPLIER)
    }
}

impl GlobalMarginLookup for GlobalMarginTable {
    fn global_margin(&self, amount: Money) -> Option<Multiplier> {
        self.0.rate_for(amount)
    }
}
