pub mod adjust;
pub mod aggregate;
pub mod error;
pub mod lookup;
pub mod rollup;
pub mod rounding;
pub mod row;
pub mod settings;
pub mod totals;
pub mod types;

pub use adjust::{adjust, required_user_margin, MarginAdjustment};
pub use aggregate::{aggregate, GroupMargin, LineItem, SourceGroup};
pub use error::RollupError;
pub use lookup::{
    CategoryMarginLookup, CategoryMarginTable, GlobalMarginLookup, GlobalMarginTable, MarginTier,
    MarginTierTable, NoMargin,
};
pub use rollup::{compute_rollup, run_rollup, solve_user_margin, validate_input, RollupInput, RollupResult};
pub use row::{GroupRow, Label, LegacyRow, RowKind};
pub use settings::{CategoryTiers, MarginConfig, RollupSettings};
pub use totals::compute_totals;
pub use types::*;

/// Standard result type for the fallible edges of the engine
pub type CoreResult<T> = Result<T, RollupError>;
