//! Sensitive watch windows.
//!
//! A window is a local time-of-day range on given weekdays (e.g. the RBI
//! pre-open watch, 08:30–10:30 IST, Mon–Fri). Local time is derived from a
//! fixed UTC offset. Ranges whose end is before their start span midnight.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RailscopeError;

fn default_risk_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitiveWindow {
    pub label: String,
    /// Offset of the window's local time from UTC, in minutes (IST = 330).
    pub utc_offset_minutes: i32,
    /// "HH:MM", 24h, inclusive.
    pub start: String,
    /// "HH:MM", 24h, inclusive.
    pub end: String,
    /// 0 = Sunday .. 6 = Saturday. Empty = every day.
    #[serde(default)]
    pub days: Vec<u8>,
    /// Extra bps added to the raw adjustment while inside the window.
    #[serde(default)]
    pub boost_bps: f64,
    /// Multiplier on the risk score while inside the window.
    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,
}

/// What a window does to a corridor's aggregation at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowEffect {
    pub in_window: bool,
    pub boost_bps: f64,
    pub risk_weight: f64,
}

impl WindowEffect {
    pub const NONE: WindowEffect = WindowEffect {
        in_window: false,
        boost_bps: 0.0,
        risk_weight: 1.0,
    };
}

impl SensitiveWindow {
    pub fn validate(&self) -> Result<(), RailscopeError> {
        let bad = |what: &str| {
            RailscopeError::Config(format!("window {:?}: {what}", self.label))
        };
        parse_hhmm(&self.start).ok_or_else(|| bad("start must be HH:MM"))?;
        parse_hhmm(&self.end).ok_or_else(|| bad("end must be HH:MM"))?;
        if self.days.iter().any(|d| *d > 6) {
            return Err(bad("days must be 0..=6"));
        }
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(bad("utc offset out of range"));
        }
        if !self.boost_bps.is_finite() || self.boost_bps < 0.0 {
            return Err(bad("boost_bps must be a non-negative number"));
        }
        if !self.risk_weight.is_finite() || self.risk_weight <= 0.0 {
            return Err(bad("risk_weight must be positive"));
        }
        Ok(())
    }

    /// Whether `at` falls inside this window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let (Some(start), Some(end)) = (parse_hhmm(&self.start), parse_hhmm(&self.end)) else {
            return false;
        };
        let Some(offset) = FixedOffset::east_opt(self.utc_offset_minutes * 60) else {
            return false;
        };

        let local = at.with_timezone(&offset);
        let day = local.weekday().num_days_from_sunday() as u8;
        if !self.days.is_empty() && !self.days.contains(&day) {
            return false;
        }

        let minutes = local.hour() * 60 + local.minute();
        if start <= end {
            (start..=end).contains(&minutes)
        } else {
            minutes >= start || minutes <= end
        }
    }
}

/// The effect of the first window containing `at`, or [`WindowEffect::NONE`].
pub fn effect_at(windows: &[SensitiveWindow], at: DateTime<Utc>) -> WindowEffect {
    windows
        .iter()
        .find(|w| w.contains(at))
        .map(|w| WindowEffect {
            in_window: true,
            boost_bps: w.boost_bps,
            risk_weight: w.risk_weight,
        })
        .unwrap_or(WindowEffect::NONE)
}

fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}
