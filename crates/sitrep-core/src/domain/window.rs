//! Time window resolution.
//!
//! A window is written as `<integer><unit>` (`24h`, `7d`, `2w`) and resolved
//! once per run into an absolute cutoff. The instant it was resolved at is
//! kept as `until`, so every later age computation is relative to the same
//! "now" and never to the wall clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::InvalidWindowError;
use crate::domain::record::NormalizedRecord;

/// Unit of a window expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowUnit {
    Hours,
    Days,
    Weeks,
}

impl WindowUnit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            _ => None,
        }
    }

    fn hours(self) -> i64 {
        match self {
            Self::Hours => 1,
            Self::Days => 24,
            Self::Weeks => 24 * 7,
        }
    }

    fn noun(self, amount: u32) -> &'static str {
        match (self, amount == 1) {
            (Self::Hours, true) => "hour",
            (Self::Hours, false) => "hours",
            (Self::Days, true) => "day",
            (Self::Days, false) => "days",
            (Self::Weeks, true) => "week",
            (Self::Weeks, false) => "weeks",
        }
    }
}

/// Resolved reporting window. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Records updated at or after this instant are "recent".
    pub since: DateTime<Utc>,
    /// Instant the window was resolved at.
    pub until: DateTime<Utc>,
    pub amount: u32,
    pub unit: WindowUnit,
    /// Human label, e.g. `last 24 hours`.
    pub label: String,
}

impl TimeWindow {
    /// Length of the window.
    pub fn span(&self) -> Duration {
        self.until - self.since
    }

    /// Display label for report headers.
    pub fn display_label(&self) -> &str {
        &self.label
    }

    /// Whether `updated_at` falls inside the window.
    ///
    /// Timestamps after `until` (clock skew between systems) count as inside.
    pub fn is_within(&self, updated_at: DateTime<Utc>) -> bool {
        updated_at >= self.since
    }

    /// Whether `updated_at` is older than twice the window span.
    pub fn is_stale(&self, updated_at: DateTime<Utc>) -> bool {
        self.until - updated_at > self.span() * 2
    }

    /// Client-side filter used by gatherers without native time filtering.
    ///
    /// Open records are current state and always admitted; finished records
    /// only when they changed inside the window.
    pub fn admits(&self, record: &NormalizedRecord) -> bool {
        !record.is_terminal() || self.is_within(record.updated_at)
    }
}

/// Resolve a window expression against the current time.
pub fn resolve(expr: &str) -> Result<TimeWindow, InvalidWindowError> {
    resolve_at(expr, Utc::now())
}

/// Resolve a window expression against an explicit `now`.
pub fn resolve_at(expr: &str, now: DateTime<Utc>) -> Result<TimeWindow, InvalidWindowError> {
    let trimmed = expr.trim();
    let unit_char = trimmed.chars().last().ok_or(InvalidWindowError::Empty)?;
    let digits = &trimmed[..trimmed.len() - unit_char.len_utf8()];

    let malformed = || InvalidWindowError::Malformed {
        expr: expr.to_string(),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let unit = match WindowUnit::from_char(unit_char) {
        Some(unit) => unit,
        None if unit_char.is_alphabetic() => {
            return Err(InvalidWindowError::UnknownUnit {
                expr: expr.to_string(),
                unit: unit_char,
            })
        }
        None => return Err(malformed()),
    };

    let amount: u32 = digits.parse().map_err(|_| InvalidWindowError::Overflow {
        expr: expr.to_string(),
    })?;
    if amount == 0 {
        return Err(InvalidWindowError::Zero {
            expr: expr.to_string(),
        });
    }

    let span = Duration::hours(i64::from(amount) * unit.hours());
    let since = now
        .checked_sub_signed(span)
        .ok_or_else(|| InvalidWindowError::Overflow {
            expr: expr.to_string(),
        })?;

    Ok(TimeWindow {
        since,
        until: now,
        amount,
        unit,
        label: format!("last {} {}", amount, unit.noun(amount)),
    })
}

/// Display label of a resolved window.
pub fn to_display_label(window: &TimeWindow) -> String {
    window.label.clone()
}
