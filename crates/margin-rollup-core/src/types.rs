use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rounding::DECIMAL_PLACES;

/// Monetary amounts in the calculation's currency. Never f64.
pub type Money = Decimal;

/// Rates as decimals (0.15 = +15%), never percentages.
pub type Rate = Decimal;

/// A rate expressed as a cumulative factor, `1 + rate` (1.15 = +15%).
pub type Multiplier = Decimal;

/// Envelope returned by [`crate::run_rollup`] and the outer surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    /// Inputs that shaped the result, echoed back as JSON
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
    /// Rounding applied to every stored amount
    pub rounding: String,
}

pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
            rounding: format!("half_away_from_zero_{DECIMAL_PLACES}dp"),
        },
    }
}
