use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use margin_rollup_core::rollup::{self, RollupInput};
use margin_rollup_core::{CategoryMarginTable, GlobalMarginTable, MarginConfig, RollupSettings};

use crate::input;

/// Arguments for a full roll-up
#[derive(Args)]
pub struct ComputeArgs {
    /// Path to the calculation snapshot (JSON); read from stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Margin tier configuration (JSON or YAML)
    #[arg(long)]
    pub tiers: Option<String>,

    /// Policy settings (JSON or YAML)
    #[arg(long)]
    pub settings: Option<String>,

    /// Override the snapshot's user margin (rate, e.g. 0.10)
    #[arg(long, allow_hyphen_values = true)]
    pub user_margin: Option<Decimal>,

    /// Override the minimum overall margin (rate, e.g. 0.20)
    #[arg(long)]
    pub min_margin: Option<Decimal>,

    /// Raise the user margin when the minimum is not met
    #[arg(long)]
    pub adjust: bool,

    /// Emit rows in the legacy layout (integer ids, rate in amount)
    #[arg(long)]
    pub legacy: bool,
}

pub fn run_compute(args: ComputeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut snapshot = load_snapshot(args.input.as_deref(), args.settings.as_deref())?;
    if let Some(user_margin) = args.user_margin {
        snapshot.user_margin = Some(user_margin);
    }
    if let Some(min_margin) = args.min_margin {
        snapshot.min_margin_rate = min_margin;
    }
    if args.adjust {
        snapshot.adjust = true;
    }

    let (categories, global) = load_tables(args.tiers.as_deref())?;
    let output = rollup::run_rollup(&snapshot, &categories, &global)?;

    if args.legacy {
        return Ok(rollup::legacy_envelope(&output)?);
    }
    Ok(serde_json::to_value(&output)?)
}

/// Arguments for solving the minimum user margin
#[derive(Args)]
pub struct SolveArgs {
    /// Path to the calculation snapshot (JSON); read from stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Margin tier configuration (JSON or YAML)
    #[arg(long)]
    pub tiers: Option<String>,

    /// Policy settings (JSON or YAML)
    #[arg(long)]
    pub settings: Option<String>,

    /// Minimum overall margin (rate, e.g. 0.20)
    #[arg(long)]
    pub min_margin: Option<Decimal>,
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut snapshot = load_snapshot(args.input.as_deref(), args.settings.as_deref())?;
    if let Some(min_margin) = args.min_margin {
        snapshot.min_margin_rate = min_margin;
    }
    rollup::validate_input(&snapshot)?;

    let (categories, global) = load_tables(args.tiers.as_deref())?;
    let required = rollup::solve_user_margin(&snapshot, &categories, &global);

    Ok(json!({
        "result": {
            "required_user_margin": required.map(|r| r.to_string()),
            "current_user_margin": snapshot.user_margin_rate().to_string(),
            "min_margin_rate": snapshot.min_margin_rate.to_string(),
            "sufficient": required.map(|r| r <= snapshot.user_margin_rate()),
        }
    }))
}

/// Arguments for tier file validation
#[derive(Args)]
pub struct ValidateTiersArgs {
    /// Margin tier configuration (JSON or YAML)
    #[arg(long)]
    pub tiers: String,
}

pub fn run_validate_tiers(args: ValidateTiersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: MarginConfig = input::file::read_document(&args.tiers)?;
    let (categories, global) = config.into_tables()?;

    Ok(json!({
        "result": {
            "valid": true,
            "categories": categories.len(),
            "global_tiers": global.0.tiers.len(),
        }
    }))
}

fn load_snapshot(
    path: Option<&str>,
    settings: Option<&str>,
) -> Result<RollupInput, Box<dyn std::error::Error>> {
    let mut snapshot: RollupInput = if let Some(path) = path {
        input::file::read_document(path)?
    } else if let Some(snapshot) = input::stdin::read_stdin()? {
        snapshot
    } else {
        return Err("--input <calculation.json> or stdin required".into());
    };

    if let Some(path) = settings {
        let settings: RollupSettings = input::file::read_document(path)?;
        snapshot.apply_settings(&settings);
    }
    Ok(snapshot)
}

fn load_tables(
    path: Option<&str>,
) -> Result<(CategoryMarginTable, GlobalMarginTable), Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => input::file::read_document::<MarginConfig>(path)?,
        None => {
            tracing::debug!("no tier file given, margins default to none");
            MarginConfig::default()
        }
    };
    Ok(config.into_tables()?)
}
