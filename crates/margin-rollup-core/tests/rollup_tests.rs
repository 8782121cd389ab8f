use margin_rollup_core::lookup::{CategoryMarginTable, GlobalMarginTable, MarginTier, MarginTierTable, NoMargin};
use margin_rollup_core::rollup::{compute_rollup, run_rollup, RollupInput};
use margin_rollup_core::{GroupMargin, LineItem, MarginConfig, Money, Rate, RowKind, SourceGroup};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn line(quantity: Decimal, unit_price: Money) -> LineItem {
    LineItem {
        description: "Line".into(),
        quantity,
        unit_price,
    }
}

fn category_group(id: i64, category_id: i64, items: Vec<LineItem>) -> SourceGroup {
    SourceGroup {
        id,
        name: format!("Group {id}"),
        line_items: items,
        margin: GroupMargin::Lookup { category_id },
    }
}

fn known_group(id: i64, amount: Money, rate: Rate) -> SourceGroup {
    SourceGroup {
        id,
        name: format!("Group {id}"),
        line_items: vec![line(Decimal::ONE, amount)],
        margin: GroupMargin::Known {
            margin_percent: rate,
            margin_amount: None,
        },
    }
}

fn tier(from: Money, to: Option<Money>, rate: Decimal) -> MarginTier {
    MarginTier {
        from_amount: from,
        to_amount: to,
        rate,
    }
}

fn tables() -> (CategoryMarginTable, GlobalMarginTable) {
    let hardware = MarginTierTable::new(vec![
        tier(dec!(0), Some(dec!(999.99)), dec!(0.20)),
        tier(dec!(1000), None, dec!(0.12)),
    ]);
    let services = MarginTierTable::new(vec![tier(dec!(0), None, dec!(0.30))]);
    let categories = CategoryMarginTable::new()
        .with_category(1, hardware)
        .with_category(2, services);
    let global = GlobalMarginTable(MarginTierTable::new(vec![
        tier(dec!(0), Some(dec!(4999.99)), dec!(1.06)),
        tier(dec!(5000), None, dec!(1.03)),
    ]));
    (categories, global)
}

// ===========================================================================
// Known answers
// ===========================================================================

#[test]
fn test_empty_input_yields_only_sentinel() {
    let input = RollupInput {
        groups: vec![],
        user_margin: Some(dec!(0.15)),
        global_margin: None,
        min_margin_rate: dec!(0.3),
        adjust: false,
    };
    let result = compute_rollup(&input, &NoMargin, &NoMargin);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].kind, RowKind::Empty);
    assert!(result.row(RowKind::TotalGroup).is_none());
}

#[test]
fn test_single_group_no_margin() {
    let input = RollupInput {
        groups: vec![category_group(1, 99, vec![line(dec!(4), dec!(25))])],
        user_margin: Some(Decimal::ZERO),
        global_margin: Some(Decimal::ONE),
        min_margin_rate: Decimal::ZERO,
        adjust: false,
    };
    let result = compute_rollup(&input, &NoMargin, &NoMargin);
    assert_eq!(result.row(RowKind::TotalGroup).unwrap().total, dec!(100));
    assert_eq!(result.overall_total, dec!(100));
    assert_eq!(result.overall_margin_rate, dec!(1.00));
}

#[test]
fn test_known_cascade_exact() {
    let input = RollupInput {
        groups: vec![known_group(1, dec!(1000), dec!(0.10))],
        user_margin: Some(dec!(0.20)),
        global_margin: Some(dec!(1.05)),
        min_margin_rate: Decimal::ZERO,
        adjust: false,
    };
    let result = compute_rollup(&input, &NoMargin, &NoMargin);

    assert_eq!(result.row(RowKind::TotalGroup).unwrap().total, dec!(1100));
    assert_eq!(result.row(RowKind::GlobalMargin).unwrap().margin_amount, dec!(55));
    assert_eq!(result.row(RowKind::TotalNet).unwrap().total, dec!(1155));
    assert_eq!(result.row(RowKind::UserMargin).unwrap().margin_amount, dec!(231));
    let overall = result.row(RowKind::OverallTotal).unwrap();
    assert_eq!(overall.total, dec!(1386));
    assert_eq!(overall.margin_amount, dec!(386));
    assert_eq!(result.overall_margin_rate, dec!(1.38));
}

#[test]
fn test_zero_group_amount_never_nan() {
    let input = RollupInput {
        groups: vec![category_group(1, 1, vec![line(dec!(0), dec!(100))])],
        user_margin: Some(dec!(0.4)),
        global_margin: Some(dec!(1.2)),
        min_margin_rate: dec!(0.1),
        adjust: true,
    };
    let result = compute_rollup(&input, &NoMargin, &NoMargin);
    assert_eq!(result.overall_margin_rate, Decimal::ZERO);
    assert_eq!(result.overall_total, Decimal::ZERO);
}

// ===========================================================================
// Tiered lookups
// ===========================================================================

#[test]
fn test_tiered_lookup_cascade() {
    let (categories, global) = tables();
    let input = RollupInput {
        groups: vec![
            // 3 * 400 = 1200 -> 12% -> 144
            category_group(10, 1, vec![line(dec!(3), dec!(400))]),
            // 2.5 * 120 = 300 -> 30% -> 90
            category_group(11, 2, vec![line(dec!(2.5), dec!(120))]),
            // unconfigured category -> no markup
            category_group(12, 7, vec![line(dec!(1), dec!(50))]),
        ],
        user_margin: Some(dec!(0.05)),
        global_margin: None,
        min_margin_rate: Decimal::ZERO,
        adjust: false,
    };
    let result = compute_rollup(&input, &categories, &global);

    let margins: Vec<Decimal> = result
        .rows
        .iter()
        .filter(|r| r.kind == RowKind::Group)
        .map(|r| r.margin_amount)
        .collect();
    assert_eq!(margins, vec![dec!(144), dec!(90), dec!(0)]);

    // group 1550 + 234 = 1784 -> global 1.06 -> 107.04
    let global_row = result.row(RowKind::GlobalMargin).unwrap();
    assert_eq!(global_row.margin_percent, dec!(1.06));
    assert_eq!(global_row.margin_amount, dec!(107.04));
    // 1891.04 * 0.05 = 94.552 -> 94.55
    assert_eq!(result.row(RowKind::TotalNet).unwrap().total, dec!(1891.04));
    assert_eq!(result.overall_total, dec!(1985.59));
    // 435.59 / 1550 = 0.2810.. -> 1.28
    assert_eq!(result.overall_margin_rate, dec!(1.28));
}

#[test]
fn test_adjustment_against_tiered_configuration() {
    let (categories, global) = tables();
    let input = RollupInput {
        groups: vec![category_group(1, 1, vec![line(dec!(10), dec!(600))])],
        user_margin: Some(Decimal::ZERO),
        global_margin: None,
        min_margin_rate: dec!(0.35),
        adjust: true,
    };
    let result = compute_rollup(&input, &categories, &global);

    // 6000 + 720 = 6720 -> 1.03 -> 201.60 -> net 6921.60
    // target 8100: (8100 - 6921.60) / 6921.60 = 0.1702.. -> 0.18
    assert_eq!(result.user_margin, dec!(0.18));
    assert!(!result.overall_below_minimum);
    let overall = result.row(RowKind::OverallTotal).unwrap();
    assert!(overall.margin_amount / overall.amount >= dec!(0.35));
    assert!(result.overall_margin_rate >= dec!(1.35));
}

#[test]
fn test_margin_config_from_json_drives_rollup() {
    let config: MarginConfig = serde_json::from_str(
        r#"{
            "categories": [{"category_id": 5, "tiers": [{"from_amount": 0, "rate": 0.25}]}],
            "global": [{"from_amount": 0, "rate": 1.1}]
        }"#,
    )
    .unwrap();
    let (categories, global) = config.into_tables().unwrap();
    let input = RollupInput {
        groups: vec![category_group(1, 5, vec![line(dec!(1), dec!(200))])],
        user_margin: Some(Decimal::ZERO),
        global_margin: None,
        min_margin_rate: Decimal::ZERO,
        adjust: false,
    };
    let result = compute_rollup(&input, &categories, &global);
    // 200 + 50 = 250 -> +25 -> 275
    assert_eq!(result.overall_total, dec!(275));
}

// ===========================================================================
// Envelope and serialization
// ===========================================================================

#[test]
fn test_snapshot_json_round_trip_through_run_rollup() {
    let json = r#"{
        "groups": [
            {
                "id": 1,
                "name": "Network",
                "line_items": [{"description": "Switch", "quantity": "2", "unit_price": "450.00"}],
                "margin": {"source": "known", "margin_percent": "0.10"}
            }
        ],
        "user_margin": "0.20",
        "global_margin": "1.05"
    }"#;
    let input: RollupInput = serde_json::from_str(json).unwrap();
    let out = run_rollup(&input, &NoMargin, &NoMargin).unwrap();
    assert!(out.warnings.is_empty());
    // 900 + 90 = 990 -> +49.50 -> 1039.50 -> +207.90 -> 1247.40
    assert_eq!(out.result.overall_total, dec!(1247.40));

    let value = serde_json::to_value(&out).unwrap();
    assert_eq!(value["result"]["overall_total"], "1247.40");
    assert_eq!(value["result"]["rows"][0]["label"]["type"], "entity");
    assert_eq!(value["result"]["rows"][1]["label"]["value"], "rollup.total_group");
}

#[test]
fn test_invalid_snapshot_rejected_by_envelope() {
    let input = RollupInput {
        groups: vec![known_group(1, dec!(100), dec!(0.1))],
        user_margin: Some(dec!(25)),
        global_margin: None,
        min_margin_rate: Decimal::ZERO,
        adjust: false,
    };
    let err = run_rollup(&input, &NoMargin, &NoMargin).unwrap_err();
    assert!(err.to_string().contains("user_margin"));
}

#[test]
fn test_legacy_layout_serialization() {
    let input = RollupInput {
        groups: vec![known_group(42, dec!(1000), dec!(0.10))],
        user_margin: Some(dec!(0.20)),
        global_margin: Some(dec!(1.05)),
        min_margin_rate: Decimal::ZERO,
        adjust: false,
    };
    let legacy = compute_rollup(&input, &NoMargin, &NoMargin).legacy_rows();
    let value = serde_json::to_value(&legacy).unwrap();
    assert_eq!(value[0]["id"], 42);
    assert_eq!(value[0]["description"], "Group 42");
    assert_eq!(value[2]["id"], -2);
    assert_eq!(value[2]["amount"], "1.05");
    assert_eq!(value[2]["total"], "55.00");
    assert_eq!(value[4]["amount"], "0.20");
}
