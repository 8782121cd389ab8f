//! Raising the user margin to meet a minimum overall margin.
//!
//! The overall margin is measured against the raw group amount:
//! `overall_amount / group_amount >= min_margin_rate`. Solving for the user
//! margin rounds up (`ceil2`), and the reported multiplier rounds down
//! (`floor2`), so the policy is met without overstating the result.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::rounding::{ceil2, floor_multiplier, is_zero, round};
use crate::row::{find_row, find_row_mut, GroupRow, RowKind};
use crate::types::{Money, Multiplier, Rate};

/// Granularity of the user margin search.
const MARGIN_STEP: Rate = dec!(0.01);

/// Bound on the steps taken past the closed-form solution.
const MAX_STEPS: u32 = 100;

/// Record of a user margin raised to meet the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginAdjustment {
    pub previous_user_margin: Rate,
    pub user_margin: Rate,
    /// `0.01` steps taken past the closed-form solution
    pub steps: u32,
}

/// Policy threshold expressed like the `OverallTotal` multiplier.
pub fn minimum_multiplier(min_margin_rate: Rate) -> Multiplier {
    Decimal::ONE + min_margin_rate
}

/// Whether an overall multiplier violates the minimum margin policy.
pub fn is_below_minimum(overall_rate: Multiplier, min_margin_rate: Rate) -> bool {
    overall_rate < minimum_multiplier(min_margin_rate)
}

/// Net total and group amount the adjustment works from, when both exist
/// and neither is zero.
fn adjustment_base(rows: &[GroupRow]) -> Option<(Money, Money)> {
    let total_net = find_row(rows, RowKind::TotalNet)?.total;
    let group_amount = find_row(rows, RowKind::TotalGroup)?.amount;
    if is_zero(total_net) || is_zero(group_amount) {
        return None;
    }
    Some((total_net, group_amount))
}

/// Smallest user margin, at 2 decimal places, that makes the overall total
/// reach `group_amount * (1 + min_margin_rate)`.
pub fn required_user_margin(rows: &[GroupRow], min_margin_rate: Rate) -> Option<Rate> {
    let (total_net, group_amount) = adjustment_base(rows)?;
    Some(solve(total_net, group_amount, min_margin_rate).0)
}

fn solve(total_net: Money, group_amount: Money, min_margin_rate: Rate) -> (Rate, u32) {
    let target = group_amount * minimum_multiplier(min_margin_rate);
    let mut user_margin = ceil2((target - total_net) / total_net);

    // Rounding the user amount can still land a fraction of a cent short.
    let mut steps = 0;
    while total_net + round(total_net * user_margin) < target {
        if steps == MAX_STEPS {
            warn!(%user_margin, %min_margin_rate, "user margin search exhausted");
            break;
        }
        user_margin += MARGIN_STEP;
        steps += 1;
        debug!(%user_margin, steps, "raising user margin");
    }
    (user_margin, steps)
}

/// Raise the user margin so the overall margin meets `min_margin_rate`, and
/// re-derive the `UserMargin` and `OverallTotal` rows.
///
/// The user margin is never lowered. Returns `None` and leaves the rows
/// untouched when the current user margin already suffices, or when there
/// is nothing to adjust from (no derived rows, or a zero net total or group
/// amount).
pub fn adjust(rows: &mut [GroupRow], min_margin_rate: Rate) -> Option<MarginAdjustment> {
    let (total_net, group_amount) = adjustment_base(rows)?;
    let (user_margin, steps) = solve(total_net, group_amount, min_margin_rate);

    let user_row = find_row_mut(rows, RowKind::UserMargin)?;
    let previous_user_margin = user_row.margin_percent;
    if user_margin <= previous_user_margin {
        return None;
    }
    let user_amount = round(total_net * user_margin);
    user_row.margin_percent = user_margin;
    user_row.margin_amount = user_amount;
    user_row.amount = total_net;
    user_row.total = total_net + user_amount;

    let overall_total = total_net + user_amount;
    let overall_amount = overall_total - group_amount;
    let overall_row = find_row_mut(rows, RowKind::OverallTotal)?;
    overall_row.total = overall_total;
    overall_row.amount = group_amount;
    overall_row.margin_amount = overall_amount;
    overall_row.margin_percent = floor_multiplier(overall_amount, group_amount);

    info!(
        %previous_user_margin,
        %user_margin,
        %overall_total,
        "user margin raised to meet minimum margin"
    );

    Some(MarginAdjustment {
        previous_user_margin,
        user_margin,
        steps,
    })
}
