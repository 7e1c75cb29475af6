//! Timezone-aware day boundaries
//!
//! Every "what day is it for this user" decision goes through here. Timezones
//! are advisory: an unknown or missing zone degrades to UTC instead of failing,
//! because it only shifts where midnight falls.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::domain::DateKey;

/// Zone used whenever the supplied one cannot be resolved
pub const FALLBACK_ZONE: &str = "UTC";

/// Look a raw string up in the IANA database
pub fn parse_zone(raw: &str) -> Option<Tz> {
    raw.parse::<Tz>().ok()
}

/// Return `raw` unchanged if it names a valid IANA zone, otherwise `"UTC"`
pub fn normalize_time_zone(raw: Option<&str>) -> String {
    match raw {
        Some(zone) if parse_zone(zone).is_some() => zone.to_string(),
        _ => FALLBACK_ZONE.to_string(),
    }
}

/// Calendar date of `instant` as observed in `zone`
pub fn date_key(instant: DateTime<Utc>, zone: Tz) -> DateKey {
    DateKey::from_date(instant.with_timezone(&zone).date_naive())
}

pub fn today_key_at(now: DateTime<Utc>, zone: Tz) -> DateKey {
    date_key(now, zone)
}

/// Key of the instant exactly 24 hours before `now`.
///
/// This is deliberately not "local midnight minus one day": on the first day
/// after a DST change it can land two calendar days back.
pub fn yesterday_key_at(now: DateTime<Utc>, zone: Tz) -> DateKey {
    date_key(now - Duration::hours(24), zone)
}

pub fn today_key(zone: Tz) -> DateKey {
    today_key_at(Utc::now(), zone)
}

pub fn yesterday_key(zone: Tz) -> DateKey {
    yesterday_key_at(Utc::now(), zone)
}

/// Resolves per-request zones against a configured default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneResolver {
    default_zone: Tz,
}

impl TimeZoneResolver {
    /// An invalid default is itself degraded to UTC
    pub fn new(default_zone: &str) -> Self {
        let default_zone = parse_zone(default_zone).unwrap_or(Tz::UTC);
        Self { default_zone }
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    /// Request zone if valid, otherwise the configured default
    pub fn resolve(&self, raw: Option<&str>) -> Tz {
        match raw.and_then(parse_zone) {
            Some(zone) => zone,
            None => {
                if let Some(bad) = raw {
                    tracing::debug!("Ignoring unknown timezone '{}', using {}", bad, self.default_zone);
                }
                self.default_zone
            }
        }
    }
}

impl Default for TimeZoneResolver {
    fn default() -> Self {
        Self { default_zone: Tz::UTC }
    }
}
