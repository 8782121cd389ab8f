use napi::Result as NapiResult;
use napi_derive::napi;

use margin_rollup_core::rollup::{self, RollupInput};
use margin_rollup_core::{CategoryMarginTable, GlobalMarginTable, MarginConfig};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse the optional tier configuration; no configuration means every
/// lookup answers "not configured".
fn tables(tiers_json: Option<String>) -> NapiResult<(CategoryMarginTable, GlobalMarginTable)> {
    let config: MarginConfig = match tiers_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => MarginConfig::default(),
    };
    config.into_tables().map_err(to_napi_error)
}

fn parse_input(input_json: &str) -> NapiResult<RollupInput> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Roll-up
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_rollup(input_json: String, tiers_json: Option<String>) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let (categories, global) = tables(tiers_json)?;
    let output = rollup::run_rollup(&input, &categories, &global).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Same as `compute_rollup`, with `result.rows` flattened to the legacy
/// layout.
#[napi]
pub fn compute_rollup_legacy(input_json: String, tiers_json: Option<String>) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let (categories, global) = tables(tiers_json)?;
    let output = rollup::run_rollup(&input, &categories, &global).map_err(to_napi_error)?;
    let value = rollup::legacy_envelope(&output).map_err(to_napi_error)?;
    serde_json::to_string(&value).map_err(to_napi_error)
}

#[napi]
pub fn solve_user_margin(input_json: String, tiers_json: Option<String>) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    rollup::validate_input(&input).map_err(to_napi_error)?;
    let (categories, global) = tables(tiers_json)?;
    let required = rollup::solve_user_margin(&input, &categories, &global);
    let output = serde_json::json!({
        "required_user_margin": required.map(|r| r.to_string()),
        "min_margin_rate": input.min_margin_rate.to_string(),
    });
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[napi]
pub fn validate_tiers(tiers_json: String) -> NapiResult<bool> {
    tables(Some(tiers_json))?;
    Ok(true)
}
