use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::adjust::{self, is_below_minimum, MarginAdjustment};
use crate::aggregate::{aggregate, GroupMargin, SourceGroup};
use crate::error::RollupError;
use crate::lookup::{CategoryMarginLookup, GlobalMarginLookup, MAX_MULTIPLIER, MAX_RATE, MIN_RATE};
use crate::rounding::is_zero;
use crate::row::{find_row, GroupRow, LegacyRow, RowKind};
use crate::settings::RollupSettings;
use crate::totals::compute_totals;
use crate::types::*;
use crate::CoreResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// A calculation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupInput {
    /// Groups in display order
    pub groups: Vec<SourceGroup>,
    /// User margin as a rate, e.g. 0.10; `None` when the snapshot carries
    /// none, which rolls up as zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_margin: Option<Rate>,
    /// Pre-known global margin multiplier; looked up from the net total
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_margin: Option<Multiplier>,
    /// Minimum overall margin as a rate
    #[serde(default)]
    pub min_margin_rate: Rate,
    /// Raise the user margin when the minimum is not met
    #[serde(default)]
    pub adjust: bool,
}

impl RollupInput {
    /// Snapshot with policy fields taken from `settings`.
    pub fn with_settings(groups: Vec<SourceGroup>, settings: &RollupSettings) -> Self {
        RollupInput {
            groups,
            user_margin: Some(settings.default_user_margin),
            global_margin: None,
            min_margin_rate: settings.min_margin_rate,
            adjust: settings.adjust_to_minimum,
        }
    }

    /// Apply process-wide policy to a stored snapshot. The minimum margin and
    /// the adjustment switch always come from `settings`; the user margin
    /// only when the snapshot carries none.
    pub fn apply_settings(&mut self, settings: &RollupSettings) {
        self.min_margin_rate = settings.min_margin_rate;
        self.adjust = settings.adjust_to_minimum;
        self.user_margin.get_or_insert(settings.default_user_margin);
    }

    /// User margin the roll-up applies.
    pub fn user_margin_rate(&self) -> Rate {
        self.user_margin.unwrap_or_default()
    }
}

/// Sealed roll-up: every row plus the summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupResult {
    pub rows: Vec<GroupRow>,
    /// Overall margin multiplier, floored (1.38 = +38% on the group amount)
    pub overall_margin_rate: Multiplier,
    pub overall_total: Money,
    pub overall_below_minimum: bool,
    /// User margin finally applied
    pub user_margin: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<MarginAdjustment>,
}

impl RollupResult {
    pub fn is_empty(&self) -> bool {
        matches!(self.rows.as_slice(), [row] if row.kind == RowKind::Empty)
    }

    pub fn row(&self, kind: RowKind) -> Option<&GroupRow> {
        find_row(&self.rows, kind)
    }

    /// Rows flattened to the legacy wire layout.
    pub fn legacy_rows(&self) -> Vec<LegacyRow> {
        self.rows.iter().map(GroupRow::to_legacy).collect()
    }
}

// ---------------------------------------------------------------------------
// Roll-up
// ---------------------------------------------------------------------------

/// Run the full pipeline: aggregate groups, derive totals, and optionally
/// raise the user margin to meet `min_margin_rate`.
///
/// Infallible and free of hidden state; identical inputs and lookups give
/// identical results. Preconditions are the caller's to check, see
/// [`validate_input`].
pub fn compute_rollup(
    input: &RollupInput,
    category_lookup: &impl CategoryMarginLookup,
    global_lookup: &impl GlobalMarginLookup,
) -> RollupResult {
    let groups = aggregate(&input.groups, category_lookup);
    if input.groups.is_empty() {
        return RollupResult {
            rows: groups,
            overall_margin_rate: Decimal::ZERO,
            overall_total: Decimal::ZERO,
            overall_below_minimum: false,
            user_margin: input.user_margin_rate(),
            adjustment: None,
        };
    }

    let mut rows = compute_totals(groups, input.user_margin_rate(), input.global_margin, global_lookup);

    let group_amount = row_value(&rows, RowKind::TotalGroup, |r| r.amount);
    let overall_rate = row_value(&rows, RowKind::OverallTotal, |r| r.margin_percent);
    let mut below_minimum =
        !is_zero(group_amount) && is_below_minimum(overall_rate, input.min_margin_rate);

    let mut adjustment = None;
    if below_minimum && input.adjust {
        adjustment = adjust::adjust(&mut rows, input.min_margin_rate);
        if adjustment.is_some() {
            below_minimum = false;
        }
    }

    RollupResult {
        overall_margin_rate: row_value(&rows, RowKind::OverallTotal, |r| r.margin_percent),
        overall_total: row_value(&rows, RowKind::OverallTotal, |r| r.total),
        user_margin: row_value(&rows, RowKind::UserMargin, |r| r.margin_percent),
        overall_below_minimum: below_minimum,
        adjustment,
        rows,
    }
}

fn row_value(rows: &[GroupRow], kind: RowKind, field: impl Fn(&GroupRow) -> Decimal) -> Decimal {
    find_row(rows, kind).map(field).unwrap_or_default()
}

/// Minimum user margin that meets the snapshot's `min_margin_rate`, or
/// `None` for an empty or zero-amount calculation.
pub fn solve_user_margin(
    input: &RollupInput,
    category_lookup: &impl CategoryMarginLookup,
    global_lookup: &impl GlobalMarginLookup,
) -> Option<Rate> {
    if input.groups.is_empty() {
        return None;
    }
    let groups = aggregate(&input.groups, category_lookup);
    let rows = compute_totals(groups, input.user_margin_rate(), input.global_margin, global_lookup);
    adjust::required_user_margin(&rows, input.min_margin_rate)
}

// ---------------------------------------------------------------------------
// Caller-side validation and envelope
// ---------------------------------------------------------------------------

/// Largest quantity a line item may carry.
pub const MAX_QUANTITY: Decimal = dec!(1000000);
/// Largest unit price a line item may carry.
pub const MAX_UNIT_PRICE: Money = dec!(1000000000);
/// Largest persisted group margin amount, in either direction.
pub const MAX_MARGIN_AMOUNT: Money = dec!(1000000000000000);

/// Check the preconditions [`compute_rollup`] relies on.
pub fn validate_input(input: &RollupInput) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for group in &input.groups {
        if !seen.insert(group.id) {
            return Err(RollupError::InvalidInput {
                field: format!("groups[{}].id", group.id),
                reason: "Group ids must be unique".into(),
            });
        }
        for (i, item) in group.line_items.iter().enumerate() {
            let field = || format!("groups[{}].line_items[{i}]", group.id);
            if item.quantity < Decimal::ZERO || item.unit_price < Decimal::ZERO {
                return Err(RollupError::InvalidInput {
                    field: field(),
                    reason: "Quantity and unit price cannot be negative".into(),
                });
            }
            if item.quantity > MAX_QUANTITY || item.unit_price > MAX_UNIT_PRICE {
                return Err(RollupError::InvalidInput {
                    field: field(),
                    reason: format!(
                        "Quantity is limited to {MAX_QUANTITY} and unit price to {MAX_UNIT_PRICE}"
                    ),
                });
            }
        }
        validate_group_margin(group)?;
    }
    if let Some(user_margin) = input.user_margin {
        if !(MIN_RATE..=MAX_RATE).contains(&user_margin) {
            return Err(RollupError::InvalidInput {
                field: "user_margin".into(),
                reason: format!("User margin must be between {MIN_RATE} and {MAX_RATE}"),
            });
        }
    }
    if !(Decimal::ZERO..=MAX_RATE).contains(&input.min_margin_rate) {
        return Err(RollupError::InvalidInput {
            field: "min_margin_rate".into(),
            reason: format!("Minimum margin rate must be between 0 and {MAX_RATE}"),
        });
    }
    if let Some(global) = input.global_margin {
        if global <= Decimal::ZERO || global > MAX_MULTIPLIER {
            return Err(RollupError::InvalidInput {
                field: "global_margin".into(),
                reason: format!("Global margin multiplier must be positive and at most {MAX_MULTIPLIER}"),
            });
        }
    }
    Ok(())
}

fn validate_group_margin(group: &SourceGroup) -> CoreResult<()> {
    if let GroupMargin::Known {
        margin_percent,
        margin_amount,
    } = &group.margin
    {
        if !(MIN_RATE..=MAX_RATE).contains(margin_percent) {
            return Err(RollupError::InvalidInput {
                field: format!("groups[{}].margin.margin_percent", group.id),
                reason: format!("Group margin must be between {MIN_RATE} and {MAX_RATE}"),
            });
        }
        if margin_amount.is_some_and(|amount| amount.abs() > MAX_MARGIN_AMOUNT) {
            return Err(RollupError::InvalidInput {
                field: format!("groups[{}].margin.margin_amount", group.id),
                reason: format!("Persisted margin amount is limited to {MAX_MARGIN_AMOUNT}"),
            });
        }
    }
    Ok(())
}

/// Validate the snapshot, compute the roll-up and wrap it with warnings and
/// metadata.
pub fn run_rollup(
    input: &RollupInput,
    category_lookup: &impl CategoryMarginLookup,
    global_lookup: &impl GlobalMarginLookup,
) -> CoreResult<ComputationOutput<RollupResult>> {
    let start = Instant::now();
    validate_input(input)?;

    let result = compute_rollup(input, category_lookup, global_lookup);

    let mut warnings: Vec<String> = Vec::new();
    if result.is_empty() {
        warnings.push("Calculation has no groups; nothing to roll up".into());
    }
    if result.overall_below_minimum {
        warnings.push(format!(
            "Overall margin {} is below the minimum of {}",
            result.overall_margin_rate,
            adjust::minimum_multiplier(input.min_margin_rate)
        ));
    }
    if let Some(adj) = &result.adjustment {
        warnings.push(format!(
            "User margin raised from {} to {} to meet the minimum margin",
            adj.previous_user_margin, adj.user_margin
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Margin roll-up: group totals, global margin, net total, user margin, overall total",
        &serde_json::json!({
            "groups": input.groups.len(),
            "user_margin": input.user_margin.map(|u| u.to_string()),
            "global_margin": input.global_margin.map(|g| g.to_string()),
            "min_margin_rate": input.min_margin_rate.to_string(),
            "adjust": input.adjust,
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Serialize a roll-up envelope with its rows in the legacy layout. Summary,
/// warnings and metadata are kept as they are.
pub fn legacy_envelope(output: &ComputationOutput<RollupResult>) -> CoreResult<serde_json::Value> {
    let mut value = serde_json::to_value(output)?;
    value["result"]["rows"] = serde_json::to_value(output.result.legacy_rows())?;
    Ok(value)
}
