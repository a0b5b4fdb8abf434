//! Price arithmetic and the per-product adjustment policy.
//!
//! `final = round(base * (1 + adjustment / 100) * (1 + tax / 100), decimals)`
//! where `adjustment` is the product's override when present, otherwise the
//! global default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Default number of decimals prices are rounded to.
pub const DEFAULT_ROUNDING_DECIMALS: u32 = 2;

/// Upper bound for `rounding_decimals`.
pub const MAX_ROUNDING_DECIMALS: u32 = 4;

/// Percentages outside `[-100, 1000]` are rejected.
pub const MIN_PERCENT: f64 = -100.0;
pub const MAX_PERCENT: f64 = 1000.0;

/// How products without an override react to a change of the global default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentPolicy {
    /// Products without an override follow the global default.
    #[default]
    Inherit,
    /// Products without an override are frozen at the previous default
    /// before the new default takes effect.
    Snapshot,
}

impl AdjustmentPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentPolicy::Inherit => "inherit",
            AdjustmentPolicy::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for AdjustmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(AdjustmentPolicy::Inherit),
            "snapshot" => Ok(AdjustmentPolicy::Snapshot),
            other => Err(format!(
                "Invalid adjustment policy '{other}'. Must be one of: inherit, snapshot"
            )),
        }
    }
}

/// Global pricing defaults, stored in the `settings` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingDefaults {
    pub tax_percent: f64,
    pub default_adjustment_percent: f64,
    pub rounding_decimals: u32,
}

impl Default for PricingDefaults {
    fn default() -> Self {
        Self {
            tax_percent: 0.0,
            default_adjustment_percent: 0.0,
            rounding_decimals: DEFAULT_ROUNDING_DECIMALS,
        }
    }
}

impl PricingDefaults {
    pub fn validate(&self) -> Result<(), String> {
        validate_percent("tax_percent", self.tax_percent)?;
        validate_percent("default_adjustment_percent", self.default_adjustment_percent)?;
        if self.rounding_decimals > MAX_ROUNDING_DECIMALS {
            return Err(format!(
                "rounding_decimals must be at most {MAX_ROUNDING_DECIMALS}, got {}",
                self.rounding_decimals
            ));
        }
        Ok(())
    }

    /// Final price for a product with the given base cost and override.
    pub fn price(&self, base_cost: f64, adjustment_override: Option<f64>) -> f64 {
        let adjustment = effective_adjustment(adjustment_override, self.default_adjustment_percent);
        compute_price(base_cost, adjustment, self.tax_percent, self.rounding_decimals)
    }
}

/// The override when present, otherwise the global default.
pub fn effective_adjustment(adjustment_override: Option<f64>, default_percent: f64) -> f64 {
    adjustment_override.unwrap_or(default_percent)
}

pub fn compute_price(base_cost: f64, adjustment_percent: f64, tax_percent: f64, decimals: u32) -> f64 {
    let adjusted = base_cost * (1.0 + adjustment_percent / 100.0);
    let taxed = adjusted * (1.0 + tax_percent / 100.0);
    round_to(taxed, decimals)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn validate_percent(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{field} must be a finite number"));
    }
    if !(MIN_PERCENT..=MAX_PERCENT).contains(&value) {
        return Err(format!(
            "{field} must be between {MIN_PERCENT} and {MAX_PERCENT}, got {value}"
        ));
    }
    Ok(())
}

/// Overrides to write before the global default changes.
///
/// With [`AdjustmentPolicy::Snapshot`] every product that currently inherits
/// is pinned to `old_default`. With [`AdjustmentPolicy::Inherit`], or when the
/// default does not actually change, nothing is written.
pub fn plan_default_change(
    products: &[(DbId, Option<f64>)],
    old_default: f64,
    new_default: f64,
    policy: AdjustmentPolicy,
) -> Vec<(DbId, f64)> {
    if policy == AdjustmentPolicy::Inherit || old_default == new_default {
        return Vec::new();
    }
    products
        .iter()
        .filter(|(_, adjustment_override)| adjustment_override.is_none())
        .map(|(id, _)| (*id, old_default))
        .collect()
}
