// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Parsers for date and date-time values as defined in RFC 5545 Section 3.3.

use chumsky::Parser;
use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::input::ValueInput;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::value::primitive::{
    ValueExpected, i8_0_1, i8_0_2, i8_0_3, i8_0_5, i8_0_9, i8_1_2, i8_1_9, i16_0_9,
};

/// Date value in the iCalendar `YYYYMMDD` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDate {
    /// Year component.
    pub year: i16,
    /// Month component, 1-12.
    pub month: i8,
    /// Day component, 1-31.
    pub day: i8,
}

impl ValueDate {
    /// Convert to `jiff::civil::Date`.
    #[must_use]
    pub fn civil(self) -> jiff::civil::Date {
        jiff::civil::date(self.year, self.month, self.day)
    }
}

impl From<jiff::civil::Date> for ValueDate {
    fn from(value: jiff::civil::Date) -> Self {
        Self {
            year: value.year(),
            month: value.month(),
            day: value.day(),
        }
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// date               = date-value
///
/// date-value         = date-fullyear date-month date-mday
/// date-fullyear      = 4DIGIT
/// date-month         = 2DIGIT        ;01-12
/// date-mday          = 2DIGIT        ;01-28, 01-29, 01-30, 01-31
///                                    ;based on month/year
/// ```
pub fn value_date<'src, I, E>() -> impl Parser<'src, I, ValueDate, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    let year = i16_0_9()
        .then(i16_0_9())
        .then(i16_0_9())
        .then(i16_0_9())
        .map(|(((a, b), c), d)| 1000 * a + 100 * b + 10 * c + d);

    let month = choice((
        just('0').ignore_then(i8_1_9()),
        just('1').ignore_then(i8_0_2()).map(|b| 10 + b),
    ));

    let day = choice((
        just('0').ignore_then(i8_1_9()),
        i8_1_2().then(i8_0_9()).map(|(a, b)| 10 * a + b),
        just('3').ignore_then(i8_0_1()).map(|b| 30 + b),
    ));

    year.then(month)
        .then(day)
        .try_map(|((year, month), day), span| {
            if jiff::civil::Date::new(year, month, day).is_err() {
                return Err(E::Error::expected_found([ValueExpected::Date], None, span));
            }
            Ok(ValueDate { year, month, day })
        })
}

/// Time value in the iCalendar `HHMMSS[Z]` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTime {
    /// Hour component, 0-23.
    pub hour: i8,
    /// Minute component, 0-59.
    pub minute: i8,
    /// Second component, 0-60 (60 for leap second).
    pub second: i8,
    /// Whether the time is in UTC (indicated by a trailing 'Z').
    pub utc: bool,
}

impl ValueTime {
    /// Midnight, floating.
    pub(crate) const MIDNIGHT: ValueTime = ValueTime {
        hour: 0,
        minute: 0,
        second: 0,
        utc: false,
    };

    /// Convert to `jiff::civil::Time`. A leap second collapses onto `:59`.
    #[must_use]
    pub fn civil(self) -> jiff::civil::Time {
        jiff::civil::time(self.hour, self.minute, self.second.min(59), 0)
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// time         = time-hour time-minute time-second [time-utc]
///
/// time-hour    = 2DIGIT        ;00-23
/// time-minute  = 2DIGIT        ;00-59
/// time-second  = 2DIGIT        ;00-60
/// ;The "60" value is used to account for positive "leap" seconds.
///
/// time-utc     = "Z"
/// ```
pub fn value_time<'src, I, E>() -> impl Parser<'src, I, ValueTime, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    let hour = choice((
        just('2').ignore_then(i8_0_3()).map(|b| 20 + b),
        i8_0_1().then(i8_0_9()).map(|(a, b)| 10 * a + b),
    ));

    let minute = i8_0_5().then(i8_0_9()).map(|(a, b)| 10 * a + b);

    let second = choice((
        i8_0_5().then(i8_0_9()).map(|(a, b)| 10 * a + b),
        just("60").to(60),
    ));

    hour.then(minute)
        .then(second)
        .then(just('Z').or_not())
        .try_map(|(((hour, minute), second), utc), span| {
            if jiff::civil::Time::new(hour, minute, second.min(59), 0).is_err() {
                return Err(E::Error::expected_found([ValueExpected::Time], None, span));
            }
            Ok(ValueTime {
                hour,
                minute,
                second,
                utc: utc.is_some(),
            })
        })
}

/// Date-Time value defined in the RFC 5545 Section 3.3.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDateTime {
    /// Date component.
    pub date: ValueDate,
    /// Time component.
    pub time: ValueTime,
}

impl ValueDateTime {
    /// Convert to `jiff::civil::DateTime`.
    #[must_use]
    pub fn civil(self) -> jiff::civil::DateTime {
        jiff::civil::DateTime::from_parts(self.date.civil(), self.time.civil())
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// date-time  = date "T" time ;As specified in the DATE and TIME
/// ```
pub fn value_date_time<'src, I, E>() -> impl Parser<'src, I, ValueDateTime, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    value_date()
        .then_ignore(just('T'))
        .then(value_time())
        .map(|(date, time)| ValueDateTime { date, time })
}

/// A date-time, or a bare date read as floating midnight.
///
/// ```txt
/// enddate     = date / date-time
/// ```
pub fn value_end_date<'src, I, E>() -> impl Parser<'src, I, ValueDateTime, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    choice((
        value_date_time(),
        value_date().map(|date| ValueDateTime {
            date,
            time: ValueTime::MIDNIGHT,
        }),
    ))
}

/// Date-Time multiple values parser.
///
/// If the property permits, multiple "DATE-TIME" values are specified as a
/// COMMA-separated list of values.
pub fn values_date_time<'src, I, E>() -> impl Parser<'src, I, Vec<ValueDateTime>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    value_end_date().separated_by(just(',')).collect()
}
