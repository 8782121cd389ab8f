use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Row kinds and labels
// ---------------------------------------------------------------------------

/// Kind of a roll-up row. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Empty,
    Group,
    TotalGroup,
    GlobalMargin,
    TotalNet,
    UserMargin,
    OverallTotal,
}

impl RowKind {
    /// Integer code used by the legacy wire layout.
    pub fn code(self) -> i64 {
        match self {
            RowKind::Empty => 0,
            RowKind::Group => 1,
            RowKind::TotalGroup => -1,
            RowKind::GlobalMargin => -2,
            RowKind::TotalNet => -3,
            RowKind::UserMargin => -4,
            RowKind::OverallTotal => -5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RowKind::Empty),
            1 => Some(RowKind::Group),
            -1 => Some(RowKind::TotalGroup),
            -2 => Some(RowKind::GlobalMargin),
            -3 => Some(RowKind::TotalNet),
            -4 => Some(RowKind::UserMargin),
            -5 => Some(RowKind::OverallTotal),
            _ => None,
        }
    }

    /// Translation key of the fixed label carried by non-group rows.
    pub fn label_key(self) -> Option<&'static str> {
        match self {
            RowKind::Empty => Some("rollup.empty"),
            RowKind::Group => None,
            RowKind::TotalGroup => Some("rollup.total_group"),
            RowKind::GlobalMargin => Some("rollup.global_margin"),
            RowKind::TotalNet => Some("rollup.total_net"),
            RowKind::UserMargin => Some("rollup.user_margin"),
            RowKind::OverallTotal => Some("rollup.overall_total"),
        }
    }

    /// Kinds whose legacy layout stores the rate in `amount` and the margin
    /// amount in `total`.
    pub fn is_rate_row(self) -> bool {
        matches!(self, RowKind::GlobalMargin | RowKind::UserMargin)
    }
}

/// Row description, either display text of a persisted entity or a
/// translation key. Translation happens outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Label {
    Entity(String),
    Key(String),
}

impl Label {
    pub fn key(key: &str) -> Self {
        Label::Key(key.to_string())
    }

    /// Resolve to display text, passing keys through `translate`.
    pub fn resolve(&self, translate: impl Fn(&str) -> String) -> String {
        match self {
            Label::Entity(text) => text.clone(),
            Label::Key(key) => translate(key),
        }
    }

    /// The raw text: entity display text or the untranslated key.
    pub fn as_str(&self) -> &str {
        match self {
            Label::Entity(text) | Label::Key(text) => text,
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One computed roll-up row.
///
/// `total == amount + margin_amount` holds for every row. `margin_percent`
/// is a plain rate on `Group` and `UserMargin` rows and a multiplier on
/// `TotalGroup`, `GlobalMargin` and `OverallTotal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub kind: RowKind,
    /// Source group id, set on `Group` rows only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    pub label: Label,
    pub margin_percent: Rate,
    pub margin_amount: Money,
    /// Base the margin is applied to
    pub amount: Money,
    pub total: Money,
}

impl GroupRow {
    /// Sentinel row standing in for an empty calculation.
    pub fn empty() -> Self {
        GroupRow::derived(RowKind::Empty, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    /// A row with a fixed label; `total` is derived from its parts.
    pub fn derived(kind: RowKind, margin_percent: Rate, margin_amount: Money, amount: Money) -> Self {
        GroupRow {
            kind,
            source_id: None,
            label: Label::key(kind.label_key().unwrap_or_default()),
            margin_percent,
            margin_amount,
            amount,
            total: amount + margin_amount,
        }
    }

    /// Flatten to the wire layout existing consumers read.
    pub fn to_legacy(&self) -> LegacyRow {
        let id = match (self.kind, self.source_id) {
            (RowKind::Group, Some(id)) => id,
            (kind, _) => kind.code(),
        };
        let (amount, total) = if self.kind.is_rate_row() {
            (self.margin_percent, self.margin_amount)
        } else if self.kind == RowKind::TotalNet {
            (self.total, self.total)
        } else {
            (self.amount, self.total)
        };
        LegacyRow {
            id,
            description: self.label.as_str().to_string(),
            margin_percent: self.margin_percent,
            margin_amount: self.margin_amount,
            amount,
            total,
        }
    }
}

/// Legacy row shape: integer kind codes, and `GlobalMargin` / `UserMargin`
/// rows carrying the rate in `amount` and the margin amount in `total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRow {
    pub id: i64,
    pub description: String,
    pub margin_percent: Rate,
    pub margin_amount: Money,
    pub amount: Money,
    pub total: Money,
}

/// First row of the given kind.
pub fn find_row(rows: &[GroupRow], kind: RowKind) -> Option<&GroupRow> {
    rows.iter().find(|r| r.kind == kind)
}

pub(crate) fn find_row_mut(rows: &mut [GroupRow], kind: RowKind) -> Option<&mut GroupRow> {
    rows.iter_mut().find(|r| r.kind == kind)
}
