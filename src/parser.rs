// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Line-oriented parser for the recurrence-bearing subset of iCalendar.

use chumsky::Parser;
use chumsky::error::Rich;
use chumsky::extra;
use chumsky::prelude::end;

use jiff::tz::TimeZone;

use crate::instant::Instant;
use crate::keyword::{
    KW_PROP_DTSTART, KW_PROP_EXDATE, KW_PROP_EXRULE, KW_PROP_RDATE, KW_PROP_RRULE, KW_TZID,
};
use crate::recurrence::Recurrence;
use crate::rule::{Rule, ValidationError};
use crate::value::{ValueDateTime, value_end_date, value_rrule, values_date_time};

/// Failure to understand the textual input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A line without a `NAME:value` shape, or with an empty value.
    #[error("misformatted line {0:?}")]
    MalformedLine(String),

    /// An RRULE body the grammar rejects, including unknown rule parts.
    #[error("invalid RRULE {input:?}: {message}")]
    Rule {
        /// The offending RRULE body.
        input: String,
        /// What the grammar expected.
        message: String,
    },

    /// A date or date-time value the grammar rejects.
    #[error("invalid date-time {input:?}: {message}")]
    DateTime {
        /// The offending value.
        input: String,
        /// What the grammar expected.
        message: String,
    },

    /// A `TZID` parameter naming a zone the platform does not know.
    #[error("unknown time zone {0:?}")]
    UnknownTimeZone(String),

    /// A syntactically valid rule violating a structural invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Parse a single RRULE (or EXRULE) body such as
/// `FREQ=DAILY;COUNT=10;BYDAY=MO,WE,FR`.
///
/// Rule-part keys and `FREQ` values are matched case-insensitively.
/// Validation of structural invariants runs before the rule is returned.
///
/// # Errors
///
/// Returns [`ParseError::Rule`] for anything the grammar rejects and
/// [`ParseError::Validation`] for structurally invalid rules.
pub fn parse_rule(src: &str) -> Result<Rule, ParseError> {
    let rule = value_rrule::<_, extra::Err<Rich<char>>>()
        .then_ignore(end())
        .parse(src)
        .into_result()
        .map_err(|errs| ParseError::Rule {
            input: src.to_string(),
            message: join_errors(&errs),
        })?;
    rule.validate()?;
    Ok(rule)
}

/// Parse a whole recurrence from recurrence-bearing iCalendar lines.
///
/// Recognized properties are `DTSTART`, `RRULE`, `EXRULE`, `RDATE`, and
/// `EXDATE`; other properties are ignored. `tz` defines what floating
/// values mean to the parsed recurrence at evaluation time, defaulting to
/// UTC. A property with a `TZID` parameter keeps its named zone instead:
///
/// ```text
/// DTSTART;TZID=America/New_York:19991231T000000
/// RRULE:FREQ=YEARLY
/// ```
///
/// tracks New York's midnight regardless of `tz`.
///
/// # Errors
///
/// Returns the first malformed line, rejected value, unknown time zone, or
/// rule validation failure.
pub fn parse_recurrence(src: &str, tz: Option<TimeZone>) -> Result<Recurrence, ParseError> {
    let mut recurrence = Recurrence {
        time_zone: tz.unwrap_or(TimeZone::UTC),
        ..Recurrence::default()
    };

    for raw in src.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            continue;
        }

        let (name, tzid, value) = split_line(line)?;
        match name.to_ascii_uppercase().as_str() {
            KW_PROP_DTSTART => {
                recurrence.dtstart = Some(parse_instant(value, tzid)?);
            }
            KW_PROP_RRULE => recurrence.rrules.push(parse_rule(value)?),
            KW_PROP_EXRULE => recurrence.exrules.push(parse_rule(value)?),
            KW_PROP_RDATE => recurrence.rdates.extend(parse_instants(value, tzid)?),
            KW_PROP_EXDATE => recurrence.exdates.extend(parse_instants(value, tzid)?),
            other => tracing::debug!(property = other, "ignoring unrecognized property"),
        }
    }

    Ok(recurrence)
}

/// Split a `NAME[;param=value...]:value` content line into the property
/// name, its `TZID` parameter if any, and the value.
fn split_line(line: &str) -> Result<(&str, Option<&str>, &str), ParseError> {
    let malformed = || ParseError::MalformedLine(line.to_string());

    let (head, value) = line.split_once(':').ok_or_else(malformed)?;
    if value.is_empty() {
        return Err(malformed());
    }

    let mut params = head.split(';');
    let name = params.next().ok_or_else(malformed)?;
    let mut tzid = None;
    for param in params {
        let (key, param_value) = param.split_once('=').ok_or_else(malformed)?;
        if key.eq_ignore_ascii_case(KW_TZID) {
            tzid = Some(param_value);
        }
        // Other parameters (VALUE=DATE and friends) carry no information
        // the value grammar does not already recover.
    }

    Ok((name, tzid, value))
}

fn parse_instant(value: &str, tzid: Option<&str>) -> Result<Instant, ParseError> {
    let dt = value_end_date::<_, extra::Err<Rich<char>>>()
        .then_ignore(end())
        .parse(value)
        .into_result()
        .map_err(|errs| ParseError::DateTime {
            input: value.to_string(),
            message: join_errors(&errs),
        })?;
    to_instant(dt, tzid)
}

fn parse_instants(value: &str, tzid: Option<&str>) -> Result<Vec<Instant>, ParseError> {
    let dts = values_date_time::<_, extra::Err<Rich<char>>>()
        .then_ignore(end())
        .parse(value)
        .into_result()
        .map_err(|errs| ParseError::DateTime {
            input: value.to_string(),
            message: join_errors(&errs),
        })?;
    dts.into_iter().map(|dt| to_instant(dt, tzid)).collect()
}

fn to_instant(dt: ValueDateTime, tzid: Option<&str>) -> Result<Instant, ParseError> {
    // A trailing Z wins; RFC 5545 forbids combining it with TZID.
    if dt.time.utc {
        return zoned(dt, TimeZone::UTC);
    }
    match tzid {
        Some(tzid) => {
            let tz = TimeZone::get(tzid)
                .map_err(|_| ParseError::UnknownTimeZone(tzid.to_string()))?;
            zoned(dt, tz)
        }
        None => Ok(Instant::Floating(dt.civil())),
    }
}

fn zoned(dt: ValueDateTime, tz: TimeZone) -> Result<Instant, ParseError> {
    dt.civil()
        .to_zoned(tz)
        .map(Instant::Zoned)
        .map_err(|err| ParseError::DateTime {
            input: dt.civil().to_string(),
            message: err.to_string(),
        })
}

fn join_errors(errs: &[Rich<'_, char>]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;

    use super::*;
    use crate::rule::Frequency;

    #[test]
    fn parses_dtstart_forms() {
        let rec = parse_recurrence("DTSTART:20180825T090807\n", None).unwrap();
        assert_eq!(
            rec.dtstart,
            Some(Instant::Floating(datetime(2018, 8, 25, 9, 8, 7, 0)))
        );

        let rec = parse_recurrence("DTSTART:20180825T090807Z\n", None).unwrap();
        let dtstart = rec.dtstart.unwrap();
        assert!(!dtstart.is_floating());
        assert_eq!(dtstart.civil(), datetime(2018, 8, 25, 9, 8, 7, 0));

        let rec =
            parse_recurrence("DTSTART;TZID=America/New_York:19991231T000000\n", None).unwrap();
        match rec.dtstart.unwrap() {
            Instant::Zoned(zoned) => {
                assert_eq!(zoned.time_zone().iana_name(), Some("America/New_York"));
                assert_eq!(zoned.datetime(), datetime(1999, 12, 31, 0, 0, 0, 0));
            }
            Instant::Floating(_) => panic!("expected a zoned dtstart"),
        }
    }

    #[test]
    fn collects_rules_and_date_lists() {
        let src = "DTSTART:20180825T090807Z\n\
                   RRULE:FREQ=DAILY;COUNT=3\n\
                   EXRULE:FREQ=WEEKLY\n\
                   RDATE:20180901T000000Z,20180902T000000Z\n\
                   EXDATE:20180826T090807Z\n";
        let rec = parse_recurrence(src, None).unwrap();
        assert_eq!(rec.rrules.len(), 1);
        assert_eq!(rec.rrules[0].freq, Frequency::Daily);
        assert_eq!(rec.exrules.len(), 1);
        assert_eq!(rec.rdates.len(), 2);
        assert_eq!(rec.exdates.len(), 1);
    }

    #[test]
    fn ignores_unrecognized_properties() {
        let src = "SUMMARY:standup\nDTSTART:20180825T090807Z\nX-CUSTOM;FOO=1:bar\n";
        let rec = parse_recurrence(src, None).unwrap();
        assert!(rec.dtstart.is_some());
        assert!(rec.rrules.is_empty());
    }

    #[test]
    fn rejects_malformed_lines() {
        for src in ["DTSTART", "DTSTART:", "RRULE;FREQ=DAILY"] {
            assert!(
                matches!(
                    parse_recurrence(src, None),
                    Err(ParseError::MalformedLine(_))
                ),
                "expected malformed line for {src:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_time_zones() {
        let err = parse_recurrence("DTSTART;TZID=Atlantis/Capital:20180825T090807\n", None)
            .unwrap_err();
        assert_eq!(err, ParseError::UnknownTimeZone("Atlantis/Capital".into()));
    }

    #[test]
    fn surfaces_validation_errors() {
        let err = parse_rule("FREQ=DAILY;BYWEEKNO=20").unwrap_err();
        assert_eq!(
            err,
            ParseError::Validation(ValidationError::WeekNoRequiresYearly)
        );

        let err = parse_rule("FREQ=DAILY;BYSETPOS=1").unwrap_err();
        assert_eq!(
            err,
            ParseError::Validation(ValidationError::SetPosRequiresByPart)
        );
    }

    #[test]
    fn rejects_unknown_rule_parts() {
        assert!(matches!(
            parse_rule("FREQ=DAILY;BYGALAXY=3"),
            Err(ParseError::Rule { .. })
        ));
    }
}
