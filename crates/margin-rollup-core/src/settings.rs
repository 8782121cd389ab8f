use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RollupError;
use crate::lookup::{CategoryMarginTable, GlobalMarginTable, MarginTier, MarginTierTable};
use crate::types::Rate;
use crate::CoreResult;

/// Business policy passed into every roll-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupSettings {
    /// Minimum overall margin as a rate (0.20 = overall total at least
    /// 120% of the group amount)
    pub min_margin_rate: Rate,
    /// Raise the user margin automatically when the policy is violated
    pub adjust_to_minimum: bool,
    /// User margin used when a snapshot does not carry one
    pub default_user_margin: Rate,
}

impl Default for RollupSettings {
    fn default() -> Self {
        RollupSettings {
            min_margin_rate: Decimal::ZERO,
            adjust_to_minimum: false,
            default_user_margin: Decimal::ZERO,
        }
    }
}

/// Tier list of a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTiers {
    pub category_id: i64,
    pub tiers: Vec<MarginTier>,
}

/// Margin tier configuration: per-category rates and global multipliers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginConfig {
    pub categories: Vec<CategoryTiers>,
    pub global: Vec<MarginTier>,
}

impl MarginConfig {
    /// Build the two lookup tables, validating every tier list. A category
    /// listed twice is rejected.
    pub fn into_tables(self) -> CoreResult<(CategoryMarginTable, GlobalMarginTable)> {
        let mut categories = CategoryMarginTable::new();
        for entry in self.categories {
            if categories.contains(entry.category_id) {
                return Err(RollupError::InvalidTier {
                    table: format!("category {}", entry.category_id),
                    reason: "category is configured more than once".into(),
                });
            }
            categories.insert(entry.category_id, MarginTierTable::new(entry.tiers));
        }
        categories.validate()?;
        let global = GlobalMarginTable(MarginTierTable::new(self.global));
        global.validate()?;
        Ok((categories, global))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{CategoryMarginLookup, GlobalMarginLookup};
    use rust_decimal_macros::dec;

    #[test]
    fn test_settings_default_from_empty_json() {
        let settings: RollupSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, RollupSettings::default());
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: RollupSettings =
            serde_json::from_str(r#"{"min_margin_rate": "0.25", "adjust_to_minimum": true}"#).unwrap();
        assert_eq!(settings.min_margin_rate, dec!(0.25));
        assert!(settings.adjust_to_minimum);
        assert_eq!(settings.default_user_margin, Decimal::ZERO);
    }

    #[test]
    fn test_config_into_tables() {
        let json = r#"{
            "categories": [
                {"category_id": 4, "tiers": [
                    {"from_amount": "0", "to_amount": "499.99", "rate": "0.25"},
                    {"from_amount": "500", "rate": "0.18"}
                ]}
            ],
            "global": [
                {"from_amount": "0", "to_amount": "9999.99", "rate": "1.08"},
                {"from_amount": "10000", "rate": "1.04"}
            ]
        }"#;
        let config: MarginConfig = serde_json::from_str(json).unwrap();
        let (categories, global) = config.into_tables().unwrap();
        assert_eq!(categories.category_margin(4, dec!(100)), Some(dec!(0.25)));
        assert_eq!(categories.category_margin(4, dec!(800)), Some(dec!(0.18)));
        assert_eq!(global.global_margin(dec!(12000)), Some(dec!(1.04)));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let tiers = |rate| {
            vec![MarginTier {
                from_amount: dec!(0),
                to_amount: None,
                rate,
            }]
        };
        let config = MarginConfig {
            categories: vec![
                CategoryTiers {
                    category_id: 9,
                    tiers: tiers(dec!(0.1)),
                },
                CategoryTiers {
                    category_id: 9,
                    tiers: tiers(dec!(0.2)),
                },
            ],
            global: vec![],
        };
        let err = config.into_tables().unwrap_err();
        assert!(matches!(err, RollupError::InvalidTier { ref table, .. } if table == "category 9"));
    }

    #[test]
    fn test_config_with_bad_tiers_rejected() {
        let config = MarginConfig {
            categories: vec![CategoryTiers {
                category_id: 1,
                tiers: vec![MarginTier {
                    from_amount: dec!(10),
                    to_amount: Some(dec!(5)),
                    rate: dec!(0.1),
                }],
            }],
            global: vec![],
        };
        assert!(config.into_tables().is_err());
    }
}
