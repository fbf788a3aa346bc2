// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar arithmetic helpers. Pure date math on jiff's civil types; no
//! knowledge of recurrence rules beyond the weekday-ordinal and
//! invalid-day vocabulary.

use jiff::Span;
use jiff::civil::{Date, DateTime, Weekday, date};

use crate::rule::{Frequency, InvalidBehavior, WeekdayNum};

pub(crate) fn add_days(d: Date, days: i64) -> Date {
    d.saturating_add(Span::new().days(days))
}

/// The closest date on or after `d` that falls on `wd`.
pub(crate) fn forward_to_weekday(d: Date, wd: Weekday) -> Date {
    let shift = i64::from(wd.to_monday_zero_offset())
        - i64::from(d.weekday().to_monday_zero_offset());
    add_days(d, shift.rem_euclid(7))
}

/// The closest date on or before `d` that falls on `wd`.
pub(crate) fn back_to_weekday(d: Date, wd: Weekday) -> Date {
    let shift = i64::from(d.weekday().to_monday_zero_offset())
        - i64::from(wd.to_monday_zero_offset());
    add_days(d, -shift.rem_euclid(7))
}

/// Advance `t` by `interval` units of `freq`.
///
/// Only exact-length units are stepped this way; monthly and yearly periods
/// are advanced on year/month fields by the caller so that short months
/// never skew the cursor.
pub(crate) fn step(t: DateTime, freq: Frequency, interval: i64) -> DateTime {
    let span = match freq {
        Frequency::Secondly => Span::new().seconds(interval),
        Frequency::Minutely => Span::new().minutes(interval),
        Frequency::Hourly => Span::new().hours(interval),
        Frequency::Daily => Span::new().days(interval),
        Frequency::Weekly => Span::new().weeks(interval),
        Frequency::Monthly => Span::new().months(interval),
        Frequency::Yearly => Span::new().years(interval),
    };
    t.saturating_add(span)
}

/// Resolve a signed day-of-month. Negative days count 1-based from the
/// month's end. A day with no valid date in the month resolves per `ib`.
pub(crate) fn resolve_day(year: i16, month: i8, day: i8, ib: InvalidBehavior) -> Option<Date> {
    let len = date(year, month, 1).days_in_month();
    let resolved = if day < 0 { len + 1 + day } else { day };
    if (1..=len).contains(&resolved) {
        return Some(date(year, month, resolved));
    }
    match ib {
        InvalidBehavior::Omit => None,
        InvalidBehavior::Prev => Some(if resolved > len {
            date(year, month, len)
        } else {
            date(year, month, 1)
        }),
        InvalidBehavior::Next => Some(if resolved > len {
            first_of_next_month(year, month)
        } else {
            date(year, month, 1)
        }),
    }
}

/// Resolve a signed day-of-year. Negative days count 1-based from the
/// year's end; out-of-range days have no recovery and yield `None`.
pub(crate) fn nth_year_day(year: i16, yd: i16) -> Option<Date> {
    let len = date(year, 12, 31).day_of_year();
    let resolved = if yd < 0 { len + 1 + yd } else { yd };
    if !(1..=len).contains(&resolved) {
        return None;
    }
    date(year, 1, 1).with().day_of_year(resolved).build().ok()
}

/// The day in week `n` of `t`'s year that falls on `t`'s weekday. Week 1
/// counts from January 1st, week -1 from December 31st.
pub(crate) fn week_in_year(t: DateTime, n: i8) -> Option<DateTime> {
    let year = t.year();
    let day = match n {
        0 => return None,
        n if n > 0 => {
            let anchor = forward_to_weekday(date(year, 1, 1), t.weekday());
            add_days(anchor, (i64::from(n) - 1) * 7)
        }
        n => {
            let anchor = back_to_weekday(date(year, 12, 31), t.weekday());
            add_days(anchor, (i64::from(n) + 1) * 7)
        }
    };
    (day.year() == year).then(|| DateTime::from_parts(day, t.time()))
}

/// Every instant in `t`'s month matching any of the qualified weekdays,
/// carrying `t`'s clock. A non-empty `set_pos` projects the sorted result
/// onto the given 1-based positions (negative from the end).
pub(crate) fn weekdays_in_month(
    t: DateTime,
    wds: &[WeekdayNum],
    set_pos: &[i16],
    ib: InvalidBehavior,
) -> Vec<DateTime> {
    let first = t.date().first_of_month();
    let last = t.date().last_of_month();
    let mut days = Vec::new();
    for wd in wds {
        qualified_occurrences(&mut days, first, last, *wd, ib);
    }
    days.sort_unstable();
    days.dedup();

    let out: Vec<DateTime> = days
        .into_iter()
        .map(|d| DateTime::from_parts(d, t.time()))
        .collect();
    if set_pos.is_empty() {
        out
    } else {
        select_positions(&out, set_pos)
    }
}

/// Every instant in `t`'s year matching the qualified weekday, carrying
/// `t`'s clock.
pub(crate) fn weekdays_in_year(t: DateTime, wd: WeekdayNum, ib: InvalidBehavior) -> Vec<DateTime> {
    let first = date(t.year(), 1, 1);
    let last = date(t.year(), 12, 31);
    let mut days = Vec::new();
    qualified_occurrences(&mut days, first, last, wd, ib);
    days.into_iter()
        .map(|d| DateTime::from_parts(d, t.time()))
        .collect()
}

/// Project a sorted candidate set onto 1-based positions; negative
/// positions count from the end, out-of-range positions select nothing.
pub(crate) fn select_positions(sorted: &[DateTime], set_pos: &[i16]) -> Vec<DateTime> {
    let mut out = Vec::new();
    for &p in set_pos {
        let idx = match p {
            0 => continue,
            p if p > 0 => i64::from(p) - 1,
            p => sorted.len() as i64 + i64::from(p),
        };
        if let Ok(idx) = usize::try_from(idx)
            && let Some(t) = sorted.get(idx)
        {
            out.push(*t);
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

pub(crate) fn month_day_matches(d: Date, md: i8) -> bool {
    if md > 0 {
        d.day() == md
    } else {
        d.day() == d.days_in_month() + 1 + md
    }
}

pub(crate) fn year_day_matches(d: Date, yd: i16) -> bool {
    if yd > 0 {
        d.day_of_year() == yd
    } else {
        d.day_of_year() == d.days_in_year() + 1 + yd
    }
}

fn first_of_next_month(year: i16, month: i8) -> Date {
    if month == 12 {
        date(year + 1, 1, 1)
    } else {
        date(year, month + 1, 1)
    }
}

/// Append the dates selected by one qualified weekday within [first, last].
fn qualified_occurrences(
    days: &mut Vec<Date>,
    first: Date,
    last: Date,
    wd: WeekdayNum,
    ib: InvalidBehavior,
) {
    let mut occs = Vec::new();
    let mut cur = forward_to_weekday(first, wd.day);
    while cur <= last {
        occs.push(cur);
        cur = add_days(cur, 7);
    }

    match wd.occurrence.unwrap_or(0) {
        0 => days.extend(occs),
        n if n > 0 => match occs.get(n as usize - 1) {
            Some(d) => days.push(*d),
            None => match ib {
                InvalidBehavior::Omit => {}
                InvalidBehavior::Prev => days.extend(occs.last()),
                InvalidBehavior::Next => {
                    days.push(forward_to_weekday(add_days(last, 1), wd.day));
                }
            },
        },
        n => {
            let idx = occs.len() as i64 + i64::from(n);
            match usize::try_from(idx).ok().and_then(|idx| occs.get(idx)) {
                Some(d) => days.push(*d),
                None => match ib {
                    InvalidBehavior::Omit => {}
                    InvalidBehavior::Prev => {
                        days.push(back_to_weekday(add_days(first, -1), wd.day));
                    }
                    InvalidBehavior::Next => days.extend(occs.first()),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;

    use super::*;

    #[test]
    fn shifts_to_weekdays() {
        // 2018-08-25 is a Saturday
        let sat = date(2018, 8, 25);
        assert_eq!(forward_to_weekday(sat, Weekday::Saturday), sat);
        assert_eq!(forward_to_weekday(sat, Weekday::Sunday), date(2018, 8, 26));
        assert_eq!(forward_to_weekday(sat, Weekday::Friday), date(2018, 8, 31));
        assert_eq!(back_to_weekday(sat, Weekday::Saturday), sat);
        assert_eq!(back_to_weekday(sat, Weekday::Friday), date(2018, 8, 24));
        assert_eq!(back_to_weekday(sat, Weekday::Sunday), date(2018, 8, 19));
    }

    #[test]
    fn steps_by_exact_units() {
        let t = datetime(2018, 8, 25, 9, 8, 7, 0);
        assert_eq!(
            step(t, Frequency::Secondly, 2),
            datetime(2018, 8, 25, 9, 8, 9, 0)
        );
        assert_eq!(
            step(t, Frequency::Daily, 7),
            datetime(2018, 9, 1, 9, 8, 7, 0)
        );
        assert_eq!(
            step(t, Frequency::Weekly, 1),
            datetime(2018, 9, 1, 9, 8, 7, 0)
        );
    }

    #[test]
    fn resolves_negative_month_days() {
        let ib = InvalidBehavior::Omit;
        assert_eq!(resolve_day(2018, 8, -1, ib), Some(date(2018, 8, 31)));
        assert_eq!(resolve_day(2018, 9, -1, ib), Some(date(2018, 9, 30)));
        assert_eq!(resolve_day(2018, 2, -28, ib), Some(date(2018, 2, 1)));
        assert_eq!(resolve_day(2018, 2, -29, ib), None);
    }

    #[test]
    fn resolves_invalid_days_per_behavior() {
        // February 29 on a non-leap year
        assert_eq!(resolve_day(2018, 2, 29, InvalidBehavior::Omit), None);
        assert_eq!(
            resolve_day(2018, 2, 29, InvalidBehavior::Prev),
            Some(date(2018, 2, 28))
        );
        assert_eq!(
            resolve_day(2018, 2, 29, InvalidBehavior::Next),
            Some(date(2018, 3, 1))
        );
        // ...and on a leap year it simply exists
        assert_eq!(
            resolve_day(2020, 2, 29, InvalidBehavior::Omit),
            Some(date(2020, 2, 29))
        );
        // December rolls into the next year
        assert_eq!(
            resolve_day(2018, 12, 32, InvalidBehavior::Next),
            Some(date(2019, 1, 1))
        );
    }

    #[test]
    fn resolves_signed_year_days() {
        assert_eq!(nth_year_day(2018, 1), Some(date(2018, 1, 1)));
        assert_eq!(nth_year_day(2018, 365), Some(date(2018, 12, 31)));
        assert_eq!(nth_year_day(2018, 366), None);
        assert_eq!(nth_year_day(2020, 366), Some(date(2020, 12, 31)));
        assert_eq!(nth_year_day(2018, -1), Some(date(2018, 12, 31)));
        assert_eq!(nth_year_day(2018, -365), Some(date(2018, 1, 1)));
    }

    #[test]
    fn finds_weeks_preserving_weekday() {
        // 2018-08-25 is the Saturday of week 34 counting from Jan 6
        let t = datetime(2018, 8, 25, 9, 8, 7, 0);
        let w1 = week_in_year(t, 1).unwrap();
        assert_eq!(w1.date(), date(2018, 1, 6));
        assert_eq!(w1.time(), t.time());
        assert_eq!(week_in_year(t, 34).unwrap().date(), date(2018, 8, 25));
        assert_eq!(week_in_year(t, -1).unwrap().date(), date(2018, 12, 29));
        assert_eq!(week_in_year(t, 0), None);
    }

    #[test]
    fn collects_qualified_weekdays_in_month() {
        let t = datetime(2018, 9, 1, 9, 8, 7, 0);
        let first_tue = WeekdayNum {
            day: Weekday::Tuesday,
            occurrence: Some(1),
        };
        let days = weekdays_in_month(t, &[first_tue], &[], InvalidBehavior::Omit);
        assert_eq!(days, vec![datetime(2018, 9, 4, 9, 8, 7, 0)]);

        let last_mon = WeekdayNum {
            day: Weekday::Monday,
            occurrence: Some(-1),
        };
        let days = weekdays_in_month(t, &[last_mon], &[], InvalidBehavior::Omit);
        assert_eq!(days, vec![datetime(2018, 9, 24, 9, 8, 7, 0)]);

        let every_sat = WeekdayNum {
            day: Weekday::Saturday,
            occurrence: None,
        };
        let days = weekdays_in_month(t, &[every_sat], &[], InvalidBehavior::Omit);
        assert_eq!(
            days.iter().map(|d| d.day()).collect::<Vec<_>>(),
            vec![1, 8, 15, 22, 29]
        );
    }

    #[test]
    fn omits_nonexistent_weekday_ordinals() {
        // September 2018 has only four Fridays
        let t = datetime(2018, 9, 1, 0, 0, 0, 0);
        let fifth_fri = WeekdayNum {
            day: Weekday::Friday,
            occurrence: Some(5),
        };
        assert!(weekdays_in_month(t, &[fifth_fri], &[], InvalidBehavior::Omit).is_empty());
        assert_eq!(
            weekdays_in_month(t, &[fifth_fri], &[], InvalidBehavior::Prev),
            vec![datetime(2018, 9, 28, 0, 0, 0, 0)]
        );
        assert_eq!(
            weekdays_in_month(t, &[fifth_fri], &[], InvalidBehavior::Next),
            vec![datetime(2018, 10, 5, 0, 0, 0, 0)]
        );
    }

    #[test]
    fn projects_month_weekdays_onto_set_positions() {
        let t = datetime(2018, 8, 25, 9, 8, 7, 0);
        let all: Vec<WeekdayNum> = [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ]
        .into_iter()
        .map(|day| WeekdayNum {
            day,
            occurrence: None,
        })
        .collect();

        let days = weekdays_in_month(t, &all, &[1, 3, -1], InvalidBehavior::Omit);
        assert_eq!(
            days.iter().map(|d| d.day()).collect::<Vec<_>>(),
            vec![1, 3, 31]
        );
    }

    #[test]
    fn collects_qualified_weekdays_in_year() {
        let t = datetime(2018, 8, 25, 9, 8, 7, 0);
        // 2018 began on a Monday, so it holds 53 Mondays
        let mondays = weekdays_in_year(
            t,
            WeekdayNum {
                day: Weekday::Monday,
                occurrence: None,
            },
            InvalidBehavior::Omit,
        );
        assert_eq!(mondays.len(), 53);
        assert_eq!(mondays[0].date(), date(2018, 1, 1));

        let w35 = weekdays_in_year(
            t,
            WeekdayNum {
                day: Weekday::Wednesday,
                occurrence: Some(35),
            },
            InvalidBehavior::Omit,
        );
        assert_eq!(w35, vec![datetime(2018, 8, 29, 9, 8, 7, 0)]);

        let m17_back = weekdays_in_year(
            t,
            WeekdayNum {
                day: Weekday::Monday,
                occurrence: Some(-17),
            },
            InvalidBehavior::Omit,
        );
        assert_eq!(m17_back, vec![datetime(2018, 9, 10, 9, 8, 7, 0)]);
    }

    #[test]
    fn selects_positions_from_both_ends() {
        let set: Vec<DateTime> = (1..=5)
            .map(|d| datetime(2018, 8, d, 0, 0, 0, 0))
            .collect();
        let picked = select_positions(&set, &[1, 3, -1]);
        assert_eq!(
            picked.iter().map(|d| d.day()).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );

        // Out-of-range positions select nothing
        assert!(select_positions(&[], &[-1]).is_empty());
        assert!(select_positions(&set, &[6, -6]).is_empty());
    }

    #[test]
    fn matches_signed_month_and_year_days() {
        let d = date(2018, 8, 31);
        assert!(month_day_matches(d, 31));
        assert!(month_day_matches(d, -1));
        assert!(!month_day_matches(d, 30));
        assert!(!month_day_matches(date(2018, 8, 30), -1));

        let last = date(2018, 12, 31);
        assert!(year_day_matches(last, 365));
        assert!(year_day_matches(last, -1));
        assert!(!year_day_matches(last, 1));
    }
}
