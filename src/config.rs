//! Configuration loading.
//!
//! Handles parsing of `config.toml` in the data directory. Every key has a
//! default, so a missing file or a partial one is fine.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{PlanError, Result};
use crate::layout::{LayoutOptions, DEFAULT_PALETTE};
use crate::timeline::{Scale, ScaleConfig};

pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Scale used by `gantt` and `portfolio` when `--scale` is not given.
    /// Unknown names fall back to days.
    #[serde(default, deserialize_with = "lenient_scale")]
    pub default_scale: Scale,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Width of one axis unit per scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_days")]
    pub days: f64,
    #[serde(default = "default_weeks")]
    pub weeks: f64,
    #[serde(default = "default_months")]
    pub months: f64,
    #[serde(default = "default_quarters")]
    pub quarters: f64,
    #[serde(default = "default_years")]
    pub years: f64,
}

fn lenient_scale<'de, D>(deserializer: D) -> std::result::Result<Scale, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(Scale::parse_lenient(&raw))
}

fn default_days() -> f64 {
    30.0
}

fn default_weeks() -> f64 {
    40.0
}

fn default_months() -> f64 {
    50.0
}

fn default_quarters() -> f64 {
    60.0
}

fn default_years() -> f64 {
    80.0
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            weeks: default_weeks(),
            months: default_months(),
            quarters: default_quarters(),
            years: default_years(),
        }
    }
}

impl TimelineConfig {
    fn unit_width(&self, scale: Scale) -> f64 {
        match scale {
            Scale::Days => self.days,
            Scale::Weeks => self.weeks,
            Scale::Months => self.months,
            Scale::Quarters => self.quarters,
            Scale::Years => self.years,
        }
    }
}

/// Padding and colouring of layouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_lead_days")]
    pub lead_days: i64,
    #[serde(default = "default_trail_days")]
    pub trail_days: i64,
    #[serde(default = "default_min_bar_width")]
    pub min_bar_width: f64,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

fn default_lead_days() -> i64 {
    2
}

fn default_trail_days() -> i64 {
    5
}

fn default_min_bar_width() -> f64 {
    5.0
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lead_days: default_lead_days(),
            trail_days: default_trail_days(),
            min_bar_width: default_min_bar_width(),
            palette: default_palette(),
        }
    }
}

impl PlanConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlanConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the data directory, or return defaults.
    ///
    /// A file that can't be read or fails validation is reported and ignored.
    pub fn load_from_dir(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "ignoring invalid config");
            Self::default()
        })
    }

    fn validate(&self) -> Result<()> {
        for scale in Scale::ALL {
            let width = self.timeline.unit_width(scale);
            if !(width.is_finite() && width > 0.0) {
                return Err(PlanError::InvalidConfig(format!(
                    "timeline.{} must be a positive number",
                    scale.name().to_lowercase()
                )));
            }
        }
        if self.layout.lead_days < 0 || self.layout.trail_days < 0 {
            return Err(PlanError::InvalidConfig(
                "layout padding cannot be negative".to_string(),
            ));
        }
        if self.layout.min_bar_width < 0.0 {
            return Err(PlanError::InvalidConfig(
                "layout.min_bar_width cannot be negative".to_string(),
            ));
        }
        if self.layout.palette.is_empty() {
            return Err(PlanError::InvalidConfig("layout.palette cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn scale_config(&self, scale: Scale) -> ScaleConfig {
        ScaleConfig::for_scale(scale).with_unit_width(self.timeline.unit_width(scale))
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            lead_days: self.layout.lead_days,
            trail_days: self.layout.trail_days,
            min_bar_width: self.layout.min_bar_width,
            palette: self.layout.palette.clone(),
        }
    }
}
