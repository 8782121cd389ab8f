use rust_decimal::Decimal;
use tracing::debug;

use crate::lookup::GlobalMarginLookup;
use crate::rounding::{floor_multiplier, is_zero, round, safe_divide};
use crate::row::{GroupRow, RowKind};
use crate::types::{Multiplier, Rate};

/// Append the five derived rows to the aggregated group rows.
///
/// Cascade: group totals -> global margin -> net total -> user margin ->
/// overall total. Each step rounds to currency precision before the next
/// one consumes it. A pre-known `global_margin` multiplier bypasses the
/// lookup; either way the multiplier minus one is applied.
pub fn compute_totals(
    mut rows: Vec<GroupRow>,
    user_margin: Rate,
    global_margin: Option<Multiplier>,
    lookup: &impl GlobalMarginLookup,
) -> Vec<GroupRow> {
    let groups = rows.iter().filter(|r| r.kind == RowKind::Group);
    let group_amount = round(groups.clone().map(|r| r.amount).sum());
    let group_margin = round(groups.map(|r| r.margin_amount).sum());

    // --- Group totals ---
    let total_net_1 = group_amount + group_margin;
    let average_rate = round(safe_divide(group_margin, group_amount));
    rows.push(GroupRow::derived(
        RowKind::TotalGroup,
        Decimal::ONE + average_rate,
        group_margin,
        group_amount,
    ));

    // --- Global margin ---
    let global_rate = global_margin.unwrap_or_else(|| resolve_global_margin(total_net_1, lookup));
    let global_amount = round(total_net_1 * (global_rate - Decimal::ONE));
    let global_row = GroupRow::derived(RowKind::GlobalMargin, global_rate, global_amount, total_net_1);
    let total_net_2 = global_row.total;
    rows.push(global_row);

    rows.push(GroupRow::derived(
        RowKind::TotalNet,
        Decimal::ZERO,
        Decimal::ZERO,
        total_net_2,
    ));

    // --- User margin and overall total ---
    let user_amount = round(total_net_2 * user_margin);
    let user_row = GroupRow::derived(RowKind::UserMargin, user_margin, user_amount, total_net_2);
    let overall_total = user_row.total;
    rows.push(user_row);

    let overall_amount = overall_total - group_amount;
    rows.push(GroupRow::derived(
        RowKind::OverallTotal,
        floor_multiplier(overall_amount, group_amount),
        overall_amount,
        group_amount,
    ));

    rows
}

fn resolve_global_margin(total_net: Decimal, lookup: &impl GlobalMarginLookup) -> Multiplier {
    // Zero net total reports the neutral multiplier, never 0.
    if is_zero(total_net) {
        return Decimal::ONE;
    }
    let multiplier = lookup.global_margin(total_net).unwrap_or(Decimal::ONE);
    debug!(%total_net, %multiplier, "global margin looked up");
    multiplier
}
