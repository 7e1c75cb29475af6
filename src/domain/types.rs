//! Core types and enums used throughout the domain layer
//!
//! This module defines the identifier newtypes, the calendar `DateKey`, and the
//! small enums (tags, tiers, goal periods) shared by habits, entries and the
//! progression engine.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::DomainError;

/// Generates a UUID-backed identifier type.
///
/// Each entity gets its own wrapper so a subtask id can never be passed where a
/// habit id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from its string form (database or wire)
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a habit
    HabitId
);
uuid_id!(
    /// Unique identifier for a subtask of a habit
    SubtaskId
);
uuid_id!(
    /// Unique identifier for a tag goal
    GoalId
);
uuid_id!(
    /// Unique identifier for a chat message
    MessageId
);

/// Opaque identity of an authenticated user.
///
/// The server never authenticates; it receives this value from whatever sits in
/// front of it and scopes every read and write by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static DATE_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date key pattern is valid"));

/// A calendar day in some user's timezone, rendered as `YYYY-MM-DD`.
///
/// Date keys are the unit of "one day" everywhere: completions, daily entries,
/// streaks and decay are all keyed by them. They carry no timezone themselves;
/// the resolver decides which key "now" maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Parse a strict `YYYY-MM-DD` key that also names a real calendar date
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if !DATE_KEY_PATTERN.is_match(raw) {
            return Err(DomainError::InvalidDateKey(format!(
                "'{}' does not match YYYY-MM-DD",
                raw
            )));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DomainError::InvalidDateKey(format!("'{}' is not a calendar date", raw)))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Convenience constructor, `None` for impossible dates
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The calendar day before this one
    pub fn previous(&self) -> Self {
        Self(self.0 - Duration::days(1))
    }

    /// The calendar day after this one
    pub fn next(&self) -> Self {
        Self(self.0 + Duration::days(1))
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Signed number of days from `earlier` to `self`
    pub fn days_since(&self, earlier: DateKey) -> i64 {
        (self.0 - earlier.0).num_days()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Attribute tags a habit can train, RPG style
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tag {
    /// Strength
    Str,
    /// Agility
    Agi,
    /// Intelligence
    Int,
    /// Vitality
    Vit,
    /// Perception
    Per,
}

impl Tag {
    pub const ALL: [Tag; 5] = [Tag::Str, Tag::Agi, Tag::Int, Tag::Vit, Tag::Per];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Str => "STR",
            Tag::Agi => "AGI",
            Tag::Int => "INT",
            Tag::Vit => "VIT",
            Tag::Per => "PER",
        }
    }

    /// Parse a tag name, case-insensitively
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let upper = raw.trim().to_uppercase();
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == upper)
            .ok_or_else(|| DomainError::Validation {
                message: format!("Unknown tag '{}'. Valid tags: STR, AGI, INT, VIT, PER", raw),
            })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse mastery label derived from a habit's statistics.
///
/// Variants are declared in ascending order so `Ord` matches mastery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Diamond => "diamond",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "bronze" => Some(Tier::Bronze),
            "silver" => Some(Tier::Silver),
            "gold" => Some(Tier::Gold),
            "platinum" => Some(Tier::Platinum),
            "diamond" => Some(Tier::Diamond),
            _ => None,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Bronze
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling window a tag goal is measured over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl GoalPeriod {
    /// Number of days in the rolling window, ending on (and including) today
    pub fn window_days(&self) -> i64 {
        match self {
            GoalPeriod::Daily => 1,
            GoalPeriod::Weekly => 7,
            GoalPeriod::Monthly => 30,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPeriod::Daily => "daily",
            GoalPeriod::Weekly => "weekly",
            GoalPeriod::Monthly => "monthly",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim().to_lowercase().as_str() {
            "daily" => Ok(GoalPeriod::Daily),
            "weekly" => Ok(GoalPeriod::Weekly),
            "monthly" => Ok(GoalPeriod::Monthly),
            _ => Err(DomainError::Validation {
                message: format!(
                    "Invalid period '{}'. Valid options: daily, weekly, monthly",
                    raw
                ),
            }),
        }
    }
}
