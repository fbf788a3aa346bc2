// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

use jiff::Zoned;
use jiff::civil::{self, Date, DateTime, Time};
use jiff::tz::TimeZone;

/// A civil date-time that either floats or is pinned to a time zone.
///
/// A floating instant matches a different absolute time in different zones;
/// it is resolved against a caller-supplied zone at evaluation time. A zoned
/// instant keeps its zone regardless of what the caller supplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instant {
    /// Floating date and time without a time zone.
    Floating(DateTime),
    /// Date and time pinned to a specific time zone.
    Zoned(Zoned),
}

impl Instant {
    /// The date part.
    #[must_use]
    pub fn date(&self) -> Date {
        match self {
            Instant::Floating(dt) => dt.date(),
            Instant::Zoned(zoned) => zoned.date(),
        }
    }

    /// The time part.
    #[must_use]
    pub fn time(&self) -> Time {
        match self {
            Instant::Floating(dt) => dt.time(),
            Instant::Zoned(zoned) => zoned.time(),
        }
    }

    /// The wall-clock date-time, in the instant's own zone if it has one.
    #[must_use]
    pub fn civil(&self) -> DateTime {
        match self {
            Instant::Floating(dt) => *dt,
            Instant::Zoned(zoned) => zoned.datetime(),
        }
    }

    /// Whether this instant floats.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(self, Instant::Floating(_))
    }

    /// Resolve to a concrete zoned instant. A floating value is interpreted
    /// in `tz`; a zoned value keeps its own zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall-clock value falls outside the
    /// representable timestamp range.
    pub fn resolve(&self, tz: &TimeZone) -> Result<Zoned, jiff::Error> {
        match self {
            Instant::Floating(dt) => dt.to_zoned(tz.clone()),
            Instant::Zoned(zoned) => Ok(zoned.clone()),
        }
    }
}

impl From<civil::DateTime> for Instant {
    fn from(dt: civil::DateTime) -> Self {
        Instant::Floating(dt)
    }
}

impl From<Zoned> for Instant {
    fn from(zoned: Zoned) -> Self {
        Instant::Zoned(zoned)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;

    use super::*;

    #[test]
    fn provides_date_and_time_accessors() {
        let dt = datetime(2018, 8, 25, 9, 8, 7, 0);
        let floating = Instant::Floating(dt);
        let zoned = Instant::Zoned(dt.to_zoned(TimeZone::UTC).unwrap());

        assert_eq!(floating.date(), dt.date());
        assert_eq!(zoned.date(), dt.date());
        assert_eq!(floating.time(), dt.time());
        assert_eq!(zoned.time(), dt.time());
        assert_eq!(floating.civil(), dt);
        assert_eq!(zoned.civil(), dt);
        assert!(floating.is_floating());
        assert!(!zoned.is_floating());
    }

    #[test]
    fn resolves_floating_against_supplied_zone() {
        let dt = datetime(2018, 8, 25, 9, 8, 7, 0);
        let tz = TimeZone::get("America/New_York").unwrap();

        let resolved = Instant::Floating(dt).resolve(&tz).unwrap();
        assert_eq!(resolved.datetime(), dt);
        assert_eq!(resolved.time_zone(), &tz);
    }

    #[test]
    fn zoned_ignores_supplied_zone() {
        let dt = datetime(2018, 8, 25, 9, 8, 7, 0);
        let zoned = dt.to_zoned(TimeZone::UTC).unwrap();
        let tz = TimeZone::get("America/New_York").unwrap();

        let resolved = Instant::Zoned(zoned.clone()).resolve(&tz).unwrap();
        assert_eq!(resolved, zoned);
        assert_eq!(resolved.time_zone(), &TimeZone::UTC);
    }
}
