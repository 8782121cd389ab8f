use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lookup::CategoryMarginLookup;
use crate::rounding::{is_zero, round};
use crate::row::{GroupRow, Label, RowKind};
use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// A priced line item of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
}

impl LineItem {
    pub fn total(&self) -> Money {
        self.quantity * self.unit_price
    }
}

/// Where a group's margin comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum GroupMargin {
    /// Margin of an already-persisted calculation. A persisted amount is
    /// reused as-is; otherwise it is derived from the rate.
    Known {
        margin_percent: Rate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        margin_amount: Option<Money>,
    },
    /// Margin looked up by category and group amount.
    Lookup { category_id: i64 },
}

/// One group of a calculation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGroup {
    pub id: i64,
    pub name: String,
    pub line_items: Vec<LineItem>,
    pub margin: GroupMargin,
}

impl SourceGroup {
    /// Sum of the line totals, unrounded.
    pub fn line_total(&self) -> Money {
        self.line_items.iter().map(LineItem::total).sum()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Turn source groups into `Group` rows, in input order.
///
/// An empty snapshot yields the single `Empty` sentinel row. A zero amount
/// never triggers a lookup, and an unconfigured lookup means no markup.
pub fn aggregate(sources: &[SourceGroup], lookup: &impl CategoryMarginLookup) -> Vec<GroupRow> {
    if sources.is_empty() {
        return vec![GroupRow::empty()];
    }
    sources.iter().map(|group| aggregate_group(group, lookup)).collect()
}

fn aggregate_group(group: &SourceGroup, lookup: &impl CategoryMarginLookup) -> GroupRow {
    let amount = round(group.line_total());

    let (margin_percent, margin_amount) = if is_zero(amount) {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        match &group.margin {
            GroupMargin::Known {
                margin_percent,
                margin_amount: Some(persisted),
            } => (*margin_percent, *persisted),
            GroupMargin::Known {
                margin_percent,
                margin_amount: None,
            } => (*margin_percent, round(*margin_percent * amount)),
            GroupMargin::Lookup { category_id } => {
                let rate = lookup
                    .category_margin(*category_id, amount)
                    .unwrap_or_else(|| {
                        debug!(group_id = group.id, category_id, %amount, "no margin tier, applying none");
                        Decimal::ZERO
                    });
                (rate, round(rate * amount))
            }
        }
    };

    GroupRow {
        kind: RowKind::Group,
        source_id: Some(group.id),
        label: Label::Entity(group.name.clone()),
        margin_percent,
        margin_amount,
        amount,
        total: amount + margin_amount,
    }
}
