//! Timeline coordinate mapping.
//!
//! Pure functions that turn calendar dates into positions along a horizontal
//! axis at one of five granularities, and produce the axis tick labels.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Axis granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum Scale {
    #[default]
    #[serde(alias = "days")]
    Days,
    #[serde(alias = "weeks")]
    Weeks,
    #[serde(alias = "months")]
    Months,
    #[serde(alias = "quarters")]
    Quarters,
    #[serde(alias = "years")]
    Years,
}

impl Scale {
    pub const ALL: [Scale; 5] = [
        Scale::Days,
        Scale::Weeks,
        Scale::Months,
        Scale::Quarters,
        Scale::Years,
    ];

    /// Parse a scale name; anything unrecognised falls back to `Days`.
    pub fn parse_lenient(s: &str) -> Scale {
        s.parse().unwrap_or_else(|_| {
            warn!(scale = s, "unknown scale, using Days");
            Scale::Days
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Scale::Days => "Days",
            Scale::Weeks => "Weeks",
            Scale::Months => "Months",
            Scale::Quarters => "Quarters",
            Scale::Years => "Years",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "days" | "day" | "daily" => Ok(Scale::Days),
            "weeks" | "week" | "weekly" => Ok(Scale::Weeks),
            "months" | "month" | "monthly" => Ok(Scale::Months),
            "quarters" | "quarter" | "quarterly" => Ok(Scale::Quarters),
            "years" | "year" | "yearly" => Ok(Scale::Years),
            other => Err(format!("unknown scale '{other}'")),
        }
    }
}

/// Distance between two axis ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Days(u32),
    Months(u32),
}

/// Per-scale stepping, label format and width of one axis unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleConfig {
    pub scale: Scale,
    pub step: Step,
    /// `strftime` pattern; week and quarter labels are built by hand.
    pub label_format: &'static str,
    pub unit_width: f64,
}

impl ScaleConfig {
    /// Built-in configuration for a scale.
    pub fn for_scale(scale: Scale) -> Self {
        let (step, label_format, unit_width) = match scale {
            Scale::Days => (Step::Days(1), "%d %b", 30.0),
            Scale::Weeks => (Step::Days(7), "W%V %b", 40.0),
            Scale::Months => (Step::Months(1), "%b %Y", 50.0),
            Scale::Quarters => (Step::Months(3), "%Y", 60.0),
            Scale::Years => (Step::Months(12), "%Y", 80.0),
        };
        ScaleConfig {
            scale,
            step,
            label_format,
            unit_width,
        }
    }

    pub fn with_unit_width(mut self, unit_width: f64) -> Self {
        self.unit_width = unit_width;
        self
    }

    /// Position of `date` on an axis starting at `origin`.
    pub fn offset(&self, date: NaiveDate, origin: NaiveDate) -> f64 {
        offset(date, origin, self.scale, self.unit_width)
    }

    /// Tick label for a date at this scale.
    pub fn format_label(&self, date: NaiveDate) -> String {
        match self.scale {
            Scale::Weeks => format!("W{} {}", date.iso_week().week(), date.format("%b")),
            Scale::Quarters => format!("Q{} {}", quarter(date), date.year()),
            _ => date.format(self.label_format).to_string(),
        }
    }

    /// Date of the `n`th tick after `origin`.
    fn nth_step(&self, origin: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self.step {
            Step::Days(d) => origin.checked_add_signed(Duration::days(i64::from(d) * i64::from(n))),
            Step::Months(m) => origin.checked_add_months(Months::new(m.checked_mul(n)?)),
        }
    }
}

/// Calendar quarter (1-4) of a date.
pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

fn month_units(date: NaiveDate, origin: NaiveDate) -> f64 {
    let months = 12 * (date.year() - origin.year()) + (date.month() as i32 - origin.month() as i32);
    // Flat 31-day month keeps the fraction below one for every month.
    f64::from(months) + f64::from(date.day() - 1) / 31.0
}

/// Offset of `date` from `origin` along the axis, in the same units as `unit_width`.
///
/// For a fixed scale and origin this never decreases as `date` increases.
pub fn offset(date: NaiveDate, origin: NaiveDate, scale: Scale, unit_width: f64) -> f64 {
    let units = match scale {
        Scale::Days => (date - origin).num_days() as f64,
        Scale::Weeks => (date - origin).num_days() as f64 / 7.0,
        Scale::Months => month_units(date, origin),
        Scale::Quarters => month_units(date, origin) / 3.0,
        Scale::Years => {
            f64::from(date.year() - origin.year()) + f64::from(date.ordinal() - 1) / 365.25
        }
    };
    units * unit_width
}

/// One labelled tick on the axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub date: NaiveDate,
    pub label: String,
    pub offset: f64,
}

/// Ticks from `origin` to `end` inclusive, one per scale step.
pub fn axis_ticks(origin: NaiveDate, end: NaiveDate, config: &ScaleConfig) -> Vec<AxisTick> {
    let mut ticks = Vec::new();
    let mut n = 0;
    while let Some(date) = config.nth_step(origin, n) {
        if date > end {
            break;
        }
        ticks.push(AxisTick {
            date,
            label: config.format_label(date),
            offset: config.offset(date, origin),
        });
        n += 1;
    }
    ticks
}

/// Width of the whole axis: the end offset rounded down, plus one unit.
pub fn axis_width(origin: NaiveDate, end: NaiveDate, config: &ScaleConfig) -> f64 {
    let units = offset(end, origin, config.scale, 1.0);
    (units * config.unit_width).floor() + config.unit_width
}
