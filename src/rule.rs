// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Recurrence rule record, validation, and serialization.

use std::fmt::{self, Display};

use jiff::Zoned;
use jiff::civil::Weekday;
use jiff::tz::TimeZone;

use crate::generator::{IterError, RuleIter};
use crate::instant::Instant;
use crate::keyword::{
    KW_DAY_FR, KW_DAY_MO, KW_DAY_SA, KW_DAY_SU, KW_DAY_TH, KW_DAY_TU, KW_DAY_WE, KW_RRULE_BYDAY,
    KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY, KW_RRULE_BYSECOND,
    KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT, KW_RRULE_FREQ,
    KW_RRULE_FREQ_DAILY, KW_RRULE_FREQ_HOURLY, KW_RRULE_FREQ_MINUTELY, KW_RRULE_FREQ_MONTHLY,
    KW_RRULE_FREQ_SECONDLY, KW_RRULE_FREQ_WEEKLY, KW_RRULE_FREQ_YEARLY, KW_RRULE_INTERVAL,
    KW_RRULE_UNTIL, KW_RRULE_WKST,
};

/// Recurrence frequency, the unit of the outer iteration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(missing_docs)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Secondly => write!(f, "{KW_RRULE_FREQ_SECONDLY}"),
            Frequency::Minutely => write!(f, "{KW_RRULE_FREQ_MINUTELY}"),
            Frequency::Hourly => write!(f, "{KW_RRULE_FREQ_HOURLY}"),
            Frequency::Daily => write!(f, "{KW_RRULE_FREQ_DAILY}"),
            Frequency::Weekly => write!(f, "{KW_RRULE_FREQ_WEEKLY}"),
            Frequency::Monthly => write!(f, "{KW_RRULE_FREQ_MONTHLY}"),
            Frequency::Yearly => write!(f, "{KW_RRULE_FREQ_YEARLY}"),
        }
    }
}

/// Day of week with an optional signed occurrence ordinal.
///
/// `None` (and `0`) select every occurrence within the period; a positive
/// ordinal selects the Nth occurrence from the start of the period, a
/// negative one the Nth from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Day of the week.
    pub day: Weekday,
    /// Occurrence within the period.
    pub occurrence: Option<i8>,
}

impl Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.occurrence
            && n != 0
        {
            write!(f, "{n}")?;
        }
        write!(f, "{}", weekday_code(self.day))
    }
}

/// Two-letter RFC 5545 code for a weekday.
#[must_use]
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Sunday => KW_DAY_SU,
        Weekday::Monday => KW_DAY_MO,
        Weekday::Tuesday => KW_DAY_TU,
        Weekday::Wednesday => KW_DAY_WE,
        Weekday::Thursday => KW_DAY_TH,
        Weekday::Friday => KW_DAY_FR,
        Weekday::Saturday => KW_DAY_SA,
    }
}

/// Recovery policy when an expansion produces a day that does not exist,
/// such as February 30th.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidBehavior {
    /// Drop the candidate.
    #[default]
    Omit,
    /// Substitute the closest earlier valid day.
    Prev,
    /// Substitute the closest later valid day.
    Next,
}

/// A single recurrence rule as defined by RFC 5545 Section 3.3.10.
///
/// The rule is immutable once parsed; occurrences are produced by
/// [`Rule::iter`] against an anchor instant.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Frequency of recurrence.
    pub freq: Frequency,
    /// Inclusive upper bound on occurrences.
    pub until: Option<Instant>,
    /// Number of occurrences to generate.
    pub count: Option<u32>,
    /// Interval between periods, in units of `freq`. `None` means 1.
    pub interval: Option<u32>,
    /// Second specifier, 0-60.
    pub by_second: Vec<u8>,
    /// Minute specifier, 0-59.
    pub by_minute: Vec<u8>,
    /// Hour specifier, 0-23.
    pub by_hour: Vec<u8>,
    /// Day of week specifier.
    pub by_day: Vec<WeekdayNum>,
    /// Day of month specifier, negative values count from the month's end.
    pub by_month_day: Vec<i8>,
    /// Day of year specifier, negative values count from the year's end.
    pub by_year_day: Vec<i16>,
    /// Week number specifier, only meaningful with [`Frequency::Yearly`].
    pub by_week_no: Vec<i8>,
    /// Month specifier, 1-12.
    pub by_month: Vec<u8>,
    /// Positional selection within each period's candidate set.
    pub by_set_pos: Vec<i16>,
    /// First day of the week. `None` means Monday.
    pub week_start: Option<Weekday>,
    /// Recovery policy for nonexistent expansion targets.
    pub invalid_behavior: InvalidBehavior,
}

impl Rule {
    /// A rule with the given frequency and no other constraints.
    #[must_use]
    pub fn new(freq: Frequency) -> Self {
        Rule {
            freq,
            until: None,
            count: None,
            interval: None,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            week_start: None,
            invalid_behavior: InvalidBehavior::Omit,
        }
    }

    /// Check the structural invariants that the grammar cannot express.
    ///
    /// Runs once after parsing and should be called on programmatically
    /// constructed rules before iterating them.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval == Some(0) {
            return Err(ValidationError::ZeroInterval);
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(ValidationError::CountAndUntil);
        }
        if !self.by_set_pos.is_empty() && !self.has_by_part() {
            return Err(ValidationError::SetPosRequiresByPart);
        }
        if !self.by_week_no.is_empty() && self.freq != Frequency::Yearly {
            return Err(ValidationError::WeekNoRequiresYearly);
        }

        range_check("BYSECOND", &self.by_second, |&s| s <= 60)?;
        range_check("BYMINUTE", &self.by_minute, |&m| m <= 59)?;
        range_check("BYHOUR", &self.by_hour, |&h| h <= 23)?;
        range_check("BYMONTH", &self.by_month, |&m| (1..=12).contains(&m))?;
        range_check("BYMONTHDAY", &self.by_month_day, |&d| {
            d != 0 && (-31..=31).contains(&d)
        })?;
        range_check("BYYEARDAY", &self.by_year_day, |&d| {
            d != 0 && (-366..=366).contains(&d)
        })?;
        range_check("BYWEEKNO", &self.by_week_no, |&w| {
            w != 0 && (-53..=53).contains(&w)
        })?;
        range_check("BYSETPOS", &self.by_set_pos, |&p| {
            p != 0 && (-366..=366).contains(&p)
        })?;
        range_check("BYDAY", &self.by_day, |wd| {
            wd.occurrence.is_none_or(|n| (-53..=53).contains(&n))
        })?;

        Ok(())
    }

    /// Lazily generate the occurrences of this rule anchored at `dtstart`.
    ///
    /// A zoned anchor fixes the zone of the produced instants; a floating
    /// anchor is interpreted in `tz`, or UTC when `tz` is `None`.
    #[must_use]
    pub fn iter(&self, dtstart: &Instant, tz: Option<TimeZone>) -> RuleIter {
        RuleIter::new(self.clone(), dtstart, tz)
    }

    /// Collect up to `limit` occurrences (0 means no limit).
    ///
    /// # Errors
    ///
    /// Returns the iterator's terminal error if generation gave up before
    /// the natural end of the rule.
    pub fn all(
        &self,
        dtstart: &Instant,
        tz: Option<TimeZone>,
        limit: usize,
    ) -> Result<Vec<Zoned>, IterError> {
        let mut iter = self.iter(dtstart, tz);
        let mut out = Vec::new();
        for zoned in iter.by_ref() {
            out.push(zoned);
            if limit != 0 && out.len() >= limit {
                break;
            }
        }
        match iter.error() {
            Some(err) => Err(err.clone()),
            None => Ok(out),
        }
    }

    pub(crate) fn effective_interval(&self) -> i64 {
        i64::from(self.interval.unwrap_or(1).max(1))
    }

    pub(crate) fn effective_week_start(&self) -> Weekday {
        self.week_start.unwrap_or(Weekday::Monday)
    }

    fn has_by_part(&self) -> bool {
        !(self.by_second.is_empty()
            && self.by_minute.is_empty()
            && self.by_hour.is_empty()
            && self.by_day.is_empty()
            && self.by_month_day.is_empty()
            && self.by_year_day.is_empty()
            && self.by_week_no.is_empty()
            && self.by_month.is_empty())
    }
}

fn range_check<T>(
    part: &'static str,
    values: &[T],
    ok: impl Fn(&T) -> bool,
) -> Result<(), ValidationError> {
    match values.iter().all(ok) {
        true => Ok(()),
        false => Err(ValidationError::OutOfRange { part }),
    }
}

fn write_list<T: Display>(f: &mut fmt::Formatter<'_>, key: &str, values: &[T]) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    write!(f, ";{key}=")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

impl Display for Rule {
    /// Serialize back to an RFC 5545 RRULE body. Parsing the output yields
    /// an equivalent rule.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KW_RRULE_FREQ}={}", self.freq)?;

        if let Some(until) = &self.until {
            let (civil, utc) = match until {
                Instant::Floating(dt) => (*dt, false),
                Instant::Zoned(zoned) => (zoned.with_time_zone(TimeZone::UTC).datetime(), true),
            };
            write!(f, ";{KW_RRULE_UNTIL}={}", civil.strftime("%Y%m%dT%H%M%S"))?;
            if utc {
                write!(f, "Z")?;
            }
        } else if let Some(count) = self.count {
            write!(f, ";{KW_RRULE_COUNT}={count}")?;
        }

        if let Some(interval) = self.interval {
            write!(f, ";{KW_RRULE_INTERVAL}={interval}")?;
        }

        write_list(f, KW_RRULE_BYSECOND, &self.by_second)?;
        write_list(f, KW_RRULE_BYMINUTE, &self.by_minute)?;
        write_list(f, KW_RRULE_BYHOUR, &self.by_hour)?;
        write_list(f, KW_RRULE_BYMONTHDAY, &self.by_month_day)?;
        write_list(f, KW_RRULE_BYYEARDAY, &self.by_year_day)?;
        write_list(f, KW_RRULE_BYWEEKNO, &self.by_week_no)?;
        write_list(f, KW_RRULE_BYMONTH, &self.by_month)?;
        write_list(f, KW_RRULE_BYDAY, &self.by_day)?;
        write_list(f, KW_RRULE_BYSETPOS, &self.by_set_pos)?;

        if let Some(wkst) = self.week_start {
            write!(f, ";{KW_RRULE_WKST}={}", weekday_code(wkst))?;
        }

        Ok(())
    }
}

/// Structural rule invariants violated after a syntactically valid parse
/// or a programmatic construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// INTERVAL must be at least 1.
    #[error("INTERVAL must be at least 1")]
    ZeroInterval,

    /// COUNT and UNTIL must not both be set.
    #[error("COUNT and UNTIL are mutually exclusive")]
    CountAndUntil,

    /// BYSETPOS requires at least one other BY-part.
    #[error("BYSETPOS requires at least one other BY-part")]
    SetPosRequiresByPart,

    /// BYWEEKNO is only valid with FREQ=YEARLY.
    #[error("BYWEEKNO is only valid with FREQ=YEARLY")]
    WeekNoRequiresYearly,

    /// A BY-part value is outside its legal range.
    #[error("{part} value out of range")]
    OutOfRange {
        /// The offending rule part.
        part: &'static str,
    },
}
