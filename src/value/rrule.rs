// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Parser for the RRULE value grammar of RFC 5545 Section 3.3.10.

use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::input::ValueInput;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use jiff::civil::Weekday;
use jiff::tz::TimeZone;

use crate::instant::Instant;
use crate::keyword::{
    KW_DAY_FR, KW_DAY_MO, KW_DAY_SA, KW_DAY_SU, KW_DAY_TH, KW_DAY_TU, KW_DAY_WE, KW_RRULE_BYDAY,
    KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY, KW_RRULE_BYSECOND,
    KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT, KW_RRULE_FREQ,
    KW_RRULE_FREQ_DAILY, KW_RRULE_FREQ_HOURLY, KW_RRULE_FREQ_MINUTELY, KW_RRULE_FREQ_MONTHLY,
    KW_RRULE_FREQ_SECONDLY, KW_RRULE_FREQ_WEEKLY, KW_RRULE_FREQ_YEARLY, KW_RRULE_INTERVAL,
    KW_RRULE_UNTIL, KW_RRULE_WKST,
};
use crate::rule::{Frequency, Rule, WeekdayNum};
use crate::value::datetime::{ValueDateTime, value_end_date};
use crate::value::primitive::{
    ValueExpected, i8_0_1, i8_0_3, i8_0_9, i8_1_2, i8_1_4, i8_1_9, i16_0_5, i16_0_6, i16_0_9,
    i16_1_2, i16_1_9, is_positive, keyword_ci, u8_0_1, u8_0_3, u8_0_5, u8_0_9, u8_1_9,
};

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// recur           = recur-rule-part *( ";" recur-rule-part )
///                 ;
///                 ; The rule parts are not ordered in any
///                 ; particular sequence.
///                 ;
///                 ; The FREQ rule part is REQUIRED,
///                 ; but MUST NOT occur more than once.
///                 ;
///                 ; The UNTIL or COUNT rule parts are OPTIONAL,
///                 ; but they MUST NOT occur in the same 'recur'.
///                 ;
///                 ; The other rule parts are OPTIONAL,
///                 ; but MUST NOT occur more than once.
/// ```
///
/// Part names and FREQ values are matched without regard to ASCII case.
pub fn value_rrule<'src, I, E>() -> impl Parser<'src, I, Rule, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    recur_rule_part()
        .separated_by(just(';'))
        .at_least(1)
        .collect()
        .try_map(build_from_parts::<I, E::Error>)
}

fn build_from_parts<'src, I, Err>(parts: Vec<Part>, span: I::Span) -> Result<Rule, Err>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    Err: LabelError<'src, I, ValueExpected>,
{
    let duplicate = || Err::expected_found([ValueExpected::RuleDuplicatePart], None, span);

    let mut freq = None;
    let mut until: Option<ValueDateTime> = None;
    let mut count = None;
    let mut interval = None;
    let mut by_second = Vec::new();
    let mut by_minute = Vec::new();
    let mut by_hour = Vec::new();
    let mut by_day = Vec::new();
    let mut by_month_day = Vec::new();
    let mut by_year_day = Vec::new();
    let mut by_week_no = Vec::new();
    let mut by_month = Vec::new();
    let mut by_set_pos = Vec::new();
    let mut week_start = None;

    for part in parts {
        match part {
            Part::Freq(f) => match freq {
                Some(_) => return Err(duplicate()),
                None => freq = Some(f),
            },
            Part::Until(u) => match until {
                Some(_) => return Err(duplicate()),
                None => until = Some(u),
            },
            Part::Count(c) => match count {
                Some(_) => return Err(duplicate()),
                None => count = Some(c),
            },
            Part::Interval(i) => match interval {
                Some(_) => return Err(duplicate()),
                None => interval = Some(i),
            },
            Part::BySecond(v) => match by_second.is_empty() {
                false => return Err(duplicate()),
                true => by_second = v,
            },
            Part::ByMinute(v) => match by_minute.is_empty() {
                false => return Err(duplicate()),
                true => by_minute = v,
            },
            Part::ByHour(v) => match by_hour.is_empty() {
                false => return Err(duplicate()),
                true => by_hour = v,
            },
            Part::ByDay(v) => match by_day.is_empty() {
                false => return Err(duplicate()),
                true => by_day = v,
            },
            Part::ByMonthDay(v) => match by_month_day.is_empty() {
                false => return Err(duplicate()),
                true => by_month_day = v,
            },
            Part::ByYearDay(v) => match by_year_day.is_empty() {
                false => return Err(duplicate()),
                true => by_year_day = v,
            },
            Part::ByWeekNo(v) => match by_week_no.is_empty() {
                false => return Err(duplicate()),
                true => by_week_no = v,
            },
            Part::ByMonth(v) => match by_month.is_empty() {
                false => return Err(duplicate()),
                true => by_month = v,
            },
            Part::BySetPos(v) => match by_set_pos.is_empty() {
                false => return Err(duplicate()),
                true => by_set_pos = v,
            },
            Part::Wkst(w) => match week_start {
                Some(_) => return Err(duplicate()),
                None => week_start = Some(w),
            },
        }
    }

    let Some(freq) = freq else {
        return Err(Err::expected_found(
            [ValueExpected::RuleRequiredFreq],
            None,
            span,
        ));
    };

    if until.is_some() && count.is_some() {
        return Err(Err::expected_found(
            [ValueExpected::RuleCountUntilExclusion],
            None,
            span,
        ));
    }

    let until = match until {
        Some(u) if u.time.utc => {
            let zoned = u
                .civil()
                .to_zoned(TimeZone::UTC)
                .map_err(|_| Err::expected_found([ValueExpected::Date], None, span))?;
            Some(Instant::Zoned(zoned))
        }
        Some(u) => Some(Instant::Floating(u.civil())),
        None => None,
    };

    let mut rule = Rule::new(freq);
    rule.until = until;
    rule.count = count;
    rule.interval = interval;
    rule.by_second = by_second;
    rule.by_minute = by_minute;
    rule.by_hour = by_hour;
    rule.by_day = by_day;
    rule.by_month_day = by_month_day;
    rule.by_year_day = by_year_day;
    rule.by_week_no = by_week_no;
    rule.by_month = by_month;
    rule.by_set_pos = by_set_pos;
    rule.week_start = week_start;
    Ok(rule)
}

#[derive(Debug, Clone)]
enum Part {
    Freq(Frequency),
    Until(ValueDateTime),
    Count(u32),
    Interval(u32),
    BySecond(Vec<u8>),
    ByMinute(Vec<u8>),
    ByHour(Vec<u8>),
    ByDay(Vec<WeekdayNum>),
    ByMonthDay(Vec<i8>),
    ByYearDay(Vec<i16>),
    ByWeekNo(Vec<i8>),
    ByMonth(Vec<u8>),
    BySetPos(Vec<i16>),
    Wkst(Weekday),
}

/// ```txt
/// recur-rule-part = ( "FREQ" "=" freq )
///                 / ( "UNTIL" "=" enddate )
///                 / ( "COUNT" "=" 1*DIGIT )
///                 / ( "INTERVAL" "=" 1*DIGIT )
///                 / ( "BYSECOND" "=" byseclist )
///                 / ( "BYMINUTE" "=" byminlist )
///                 / ( "BYHOUR" "=" byhrlist )
///                 / ( "BYDAY" "=" bywdaylist )
///                 / ( "BYMONTHDAY" "=" bymodaylist )
///                 / ( "BYYEARDAY" "=" byyrdaylist )
///                 / ( "BYWEEKNO" "=" bywknolist )
///                 / ( "BYMONTH" "=" bymolist )
///                 / ( "BYSETPOS" "=" bysplist )
///                 / ( "WKST" "=" weekday )
/// ```
fn recur_rule_part<'src, I, E>() -> impl Parser<'src, I, Part, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    let kw = |kw| keyword_ci(kw).ignore_then(just('='));

    let freq = kw(KW_RRULE_FREQ).ignore_then(freq()).map(Part::Freq);

    // UNTIL can be a date or date-time
    let until = kw(KW_RRULE_UNTIL)
        .ignore_then(value_end_date())
        .map(Part::Until);

    let count = kw(KW_RRULE_COUNT)
        .ignore_then(u32_non_zero())
        .map(Part::Count);

    let interval = kw(KW_RRULE_INTERVAL)
        .ignore_then(u32_non_zero())
        .map(Part::Interval);

    // BYSECOND - 0 to 60
    let by_second = kw(KW_RRULE_BYSECOND)
        .ignore_then(byseclist())
        .map(Part::BySecond);

    // BYMINUTE - 0 to 59
    let by_minute = kw(KW_RRULE_BYMINUTE)
        .ignore_then(byminlist())
        .map(Part::ByMinute);

    // BYHOUR - 0 to 23
    let by_hour = kw(KW_RRULE_BYHOUR)
        .ignore_then(byhrlist())
        .map(Part::ByHour);

    // BYDAY - weekday with optional occurrence
    let by_day = kw(KW_RRULE_BYDAY)
        .ignore_then(bywdaylist())
        .map(Part::ByDay);

    // BYMONTHDAY - -31 to -1 and 1 to 31
    let by_month_day = kw(KW_RRULE_BYMONTHDAY)
        .ignore_then(bymodaylist())
        .map(Part::ByMonthDay);

    // BYYEARDAY - -366 to -1 and 1 to 366
    let by_year_day = kw(KW_RRULE_BYYEARDAY)
        .ignore_then(byyrdaylist())
        .map(Part::ByYearDay);

    // BYWEEKNO - -53 to -1 and 1 to 53
    let by_week_no = kw(KW_RRULE_BYWEEKNO)
        .ignore_then(bywknolist())
        .map(Part::ByWeekNo);

    // BYMONTH - 1 to 12
    let by_month = kw(KW_RRULE_BYMONTH)
        .ignore_then(bymolist())
        .map(Part::ByMonth);

    // BYSETPOS - -366 to -1 and 1 to 366
    let by_set_pos = kw(KW_RRULE_BYSETPOS)
        .ignore_then(bysplist())
        .map(Part::BySetPos);

    // WKST - single weekday
    let wkst = kw(KW_RRULE_WKST).ignore_then(weekday()).map(Part::Wkst);

    choice((
        freq,
        until,
        count,
        interval,
        by_second,
        by_minute,
        by_hour,
        by_day,
        by_month_day,
        by_year_day,
        by_week_no,
        by_month,
        by_set_pos,
        wkst,
    ))
}

/// ```txt
/// freq        = "SECONDLY" / "MINUTELY" / "HOURLY" / "DAILY"
///             / "WEEKLY" / "MONTHLY" / "YEARLY"
/// ```
fn freq<'src, I, E>() -> impl Parser<'src, I, Frequency, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    choice((
        keyword_ci(KW_RRULE_FREQ_SECONDLY).to(Frequency::Secondly),
        keyword_ci(KW_RRULE_FREQ_MINUTELY).to(Frequency::Minutely),
        keyword_ci(KW_RRULE_FREQ_HOURLY).to(Frequency::Hourly),
        keyword_ci(KW_RRULE_FREQ_DAILY).to(Frequency::Daily),
        keyword_ci(KW_RRULE_FREQ_WEEKLY).to(Frequency::Weekly),
        keyword_ci(KW_RRULE_FREQ_MONTHLY).to(Frequency::Monthly),
        keyword_ci(KW_RRULE_FREQ_YEARLY).to(Frequency::Yearly),
    ))
}

/// ```txt
/// byseclist   = ( seconds *("," seconds) )
/// seconds     = 1*2DIGIT       ;0 to 60
/// ```
fn byseclist<'src, I, E>() -> impl Parser<'src, I, Vec<u8>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    let seconds = choice((
        u8_0_5().then(u8_0_9()).map(|(a, b)| a * 10 + b), // 00-59
        just("60").to(60),                                // 60
        u8_0_9(),                                         // 0-9
    ));

    seconds.separated_by(just(',')).collect()
}

/// ```txt
/// byminlist   = ( minutes *("," minutes) )
/// minutes     = 1*2DIGIT       ;0 to 59
/// ```
fn byminlist<'src, I, E>() -> impl Parser<'src, I, Vec<u8>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    let minutes = choice((
        u8_0_5().then(u8_0_9()).map(|(a, b)| a * 10 + b), // 00-59
        u8_0_9(),                                         // 0-9
    ));

    minutes.separated_by(just(',')).collect()
}

/// ```txt
/// byhrlist    = ( hour *("," hour) )
/// hour        = 1*2DIGIT       ;0 to 23
/// ```
fn byhrlist<'src, I, E>() -> impl Parser<'src, I, Vec<u8>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    let hour = choice((
        u8_0_1().then(u8_0_9()).map(|(a, b)| a * 10 + b), // 00-19
        just('2').ignore_then(u8_0_3()).map(|b| 20 + b),  // 20-23
        u8_0_9(),                                         // 0-9
    ));

    hour.separated_by(just(',')).collect()
}

/// ```txt
/// bywdaylist  = ( weekdaynum *("," weekdaynum) )
/// ```
fn bywdaylist<'src, I, E>() -> impl Parser<'src, I, Vec<WeekdayNum>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    weekdaynum().separated_by(just(',')).collect()
}

/// ```txt
/// weekdaynum  = [[plus / minus] ordwk] weekday
/// plus        = "+"
/// minus       = "-"
/// ```
fn weekdaynum<'src, I, E>() -> impl Parser<'src, I, WeekdayNum, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    is_positive()
        .then(ordwk())
        .map(|(positive, n)| if positive { n } else { -n })
        .or_not()
        .then(weekday())
        .map(|(occurrence, day)| WeekdayNum { day, occurrence })
}

/// ```txt
/// ordwk       = 1*2DIGIT       ;1 to 53
/// ```
fn ordwk<'src, I, E>() -> impl Parser<'src, I, i8, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    choice((
        i8_1_4().then(i8_0_9()).map(|(a, b)| a * 10 + b), // 10-49
        just('5').ignore_then(i8_0_3()).map(|a| 50 + a),  // 50-53
        just('0').ignore_then(i8_1_9()),                  // 01-09
        i8_1_9(),                                         // 1-9
    ))
}

/// ```txt
/// weekday     = "SU" / "MO" / "TU" / "WE" / "TH" / "FR" / "SA"
/// ```
fn weekday<'src, I, E>() -> impl Parser<'src, I, Weekday, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    choice((
        keyword_ci(KW_DAY_SU).to(Weekday::Sunday),
        keyword_ci(KW_DAY_MO).to(Weekday::Monday),
        keyword_ci(KW_DAY_TU).to(Weekday::Tuesday),
        keyword_ci(KW_DAY_WE).to(Weekday::Wednesday),
        keyword_ci(KW_DAY_TH).to(Weekday::Thursday),
        keyword_ci(KW_DAY_FR).to(Weekday::Friday),
        keyword_ci(KW_DAY_SA).to(Weekday::Saturday),
    ))
}

/// ```txt
/// bymodaylist = ( monthdaynum *("," monthdaynum) )
/// monthdaynum = [plus / minus] ordmoday
/// ```
fn bymodaylist<'src, I, E>() -> impl Parser<'src, I, Vec<i8>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    is_positive()
        .then(ordmoday())
        .map(|(positive, n)| if positive { n } else { -n })
        .separated_by(just(','))
        .collect()
}

/// ```txt
/// ordmoday    = 1*2DIGIT       ;1 to 31
/// ```
fn ordmoday<'src, I, E>() -> impl Parser<'src, I, i8, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    choice((
        i8_1_2().then(i8_0_9()).map(|(a, b)| a * 10 + b), // 10-29
        just('3').ignore_then(i8_0_1()).map(|a| 30 + a),  // 30-31
        just('0').or_not().ignore_then(i8_1_9()),         // 1-9 / 01-09
    ))
}

/// ```txt
/// byyrdaylist = ( yeardaynum *("," yeardaynum) )
/// ```
fn byyrdaylist<'src, I, E>() -> impl Parser<'src, I, Vec<i16>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    yeardaynum().separated_by(just(',')).collect()
}

/// ```txt
/// yeardaynum  = [plus / minus] ordyrday
/// ```
fn yeardaynum<'src, I, E>() -> impl Parser<'src, I, i16, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    is_positive()
        .then(ordyrday())
        .map(|(positive, n)| if positive { n } else { -n })
}

/// ```txt
/// ordyrday    = 1*3DIGIT      ;1 to 366
/// ```
fn ordyrday<'src, I, E>() -> impl Parser<'src, I, i16, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    let i16_1_99 = i16_1_9().then(i16_0_9().or_not()).map(|(a, b)| match b {
        Some(b) => a * 10 + b, // 10-99
        None => a,             // 1-9
    });

    choice((
        just('3').ignore_then(choice((
            just('6').ignore_then(i16_0_6()).map(|a| 360 + a), // 360-366
            i16_0_5().then(i16_0_9()).map(|(a, b)| 300 + a * 10 + b), // 300-359
        ))),
        i16_1_2()
            .then(i16_0_9())
            .then(i16_0_9())
            .map(|((a, b), c)| a * 100 + b * 10 + c), // 100-299
        just('0').or_not().ignore_then(choice((
            just('0').ignore_then(i16_0_9()), // 01-09 / 001-009
            i16_1_99,                         // 1-9 / 10-99 / 010-099
        ))),
    ))
}

/// ```txt
/// bywknolist  = ( weeknum *("," weeknum) )
/// weeknum     = [plus / minus] ordwk
/// ```
fn bywknolist<'src, I, E>() -> impl Parser<'src, I, Vec<i8>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    is_positive()
        .then(ordwk())
        .map(|(positive, n)| if positive { n } else { -n })
        .separated_by(just(','))
        .collect()
}

/// ```txt
/// bymolist    = ( monthnum *("," monthnum) )
/// monthnum    = 1*2DIGIT       ;1 to 12
/// ```
fn bymolist<'src, I, E>() -> impl Parser<'src, I, Vec<u8>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    let monthnum = choice((
        just('0').ignore_then(u8_1_9()),                 // 01-09
        just('1').ignore_then(u8_0_9()).map(|a| 10 + a), // 10-12
        u8_1_9(),                                        // 1-9
    ));

    monthnum.separated_by(just(',')).collect()
}

/// ```txt
/// bysplist    = ( setposday *("," setposday) )
/// setposday   = yeardaynum
/// ```
fn bysplist<'src, I, E>() -> impl Parser<'src, I, Vec<i16>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    yeardaynum().separated_by(just(',')).collect()
}

/// Parse u32 (1 or more digits), rejecting zero.
fn u32_non_zero<'src, I, E>() -> impl Parser<'src, I, u32, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    select! { c @ '0'..='9' => c }
        .repeated()
        .at_least(1)
        .at_most(10) // u32 max is 10 digits
        .collect::<String>()
        .try_map_with(|str, e| {
            lexical::parse_partial::<u32, _>(&str)
                .map_err(|_| E::Error::expected_found([ValueExpected::U32], None, e.span()))
                .and_then(|(v, _)| match v {
                    0 => Err(E::Error::expected_found(
                        [ValueExpected::PositiveU32],
                        None,
                        e.span(),
                    )),
                    v => Ok(v),
                })
        })
}
