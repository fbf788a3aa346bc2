// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! The occurrence generator: a lazy, strictly increasing stream of the
//! instants described by a single recurrence rule.

use std::collections::VecDeque;

use jiff::Zoned;
use jiff::civil::{Date, DateTime, Time, date};
use jiff::tz::TimeZone;

use crate::calendar;
use crate::instant::Instant;
use crate::rule::{Frequency, Rule};

/// Consecutive periods allowed to produce nothing before generation gives
/// up. Bounds the work done by rules that can never match, such as
/// `BYMONTHDAY=30;BYMONTH=2`.
const MAX_EMPTY_PERIODS: u32 = 10_000;

/// Terminal failure of a [`RuleIter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IterError {
    /// The safety cap on empty periods was reached.
    #[error("no occurrences produced within {0} consecutive periods")]
    NoProgress(u32),

    /// An occurrence fell outside the representable timestamp range.
    #[error("occurrence outside the representable timestamp range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone)]
enum State {
    Active,
    Drained,
    Failed(IterError),
}

/// Outer iteration cursor. Exact-length periods step a full date-time;
/// months and years step their own fields so that a short month never
/// skews later periods away from the anchor's day-of-month.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    Fine(DateTime),
    Month { year: i32, month: i8 },
    Year(i32),
}

/// Lazy iterator over the occurrences of one rule, created by
/// [`Rule::iter`].
///
/// The stream is strictly increasing. It ends when `COUNT` or `UNTIL` is
/// exhausted, when no further candidates exist, or when the generator gives
/// up on a rule that matches nothing; the latter is distinguishable through
/// [`RuleIter::error`].
#[derive(Debug)]
pub struct RuleIter {
    rule: Rule,
    tz: TimeZone,
    dtstart: DateTime,
    until: Option<DateTime>,
    cursor: Cursor,
    pending: VecDeque<DateTime>,
    last: Option<DateTime>,
    emitted: u64,
    state: State,
}

impl RuleIter {
    pub(crate) fn new(rule: Rule, dtstart: &Instant, tz: Option<TimeZone>) -> RuleIter {
        let tz = match dtstart {
            Instant::Zoned(zoned) => zoned.time_zone().clone(),
            Instant::Floating(_) => tz.unwrap_or(TimeZone::UTC),
        };
        let start = dtstart.civil();
        let until = rule.until.as_ref().map(|u| match u {
            Instant::Floating(dt) => *dt,
            Instant::Zoned(zoned) => zoned.with_time_zone(tz.clone()).datetime(),
        });
        let cursor = match rule.freq {
            Frequency::Monthly => Cursor::Month {
                year: i32::from(start.year()),
                month: start.month(),
            },
            Frequency::Yearly => Cursor::Year(i32::from(start.year())),
            _ => Cursor::Fine(start),
        };
        RuleIter {
            rule,
            tz,
            dtstart: start,
            until,
            cursor,
            pending: VecDeque::new(),
            last: None,
            emitted: 0,
            state: State::Active,
        }
    }

    /// The terminal error, if generation gave up rather than finishing.
    #[must_use]
    pub fn error(&self) -> Option<&IterError> {
        match &self.state {
            State::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Produce candidate sets period by period until one survives the
    /// global filters, the rule is exhausted, or the safety cap trips.
    fn fill(&mut self) {
        let mut empty = 0u32;
        while matches!(self.state, State::Active) && self.pending.is_empty() {
            if self.cursor_year() > 9999 {
                self.state = State::Drained;
                return;
            }
            if let Some(until) = self.until
                && self.period_start() > until
            {
                self.state = State::Drained;
                return;
            }

            let (mut candidates, positions_applied) = self.period_candidates();
            self.advance();

            candidates.sort_unstable();
            candidates.dedup();
            if !positions_applied && !self.rule.by_set_pos.is_empty() {
                candidates = calendar::select_positions(&candidates, &self.rule.by_set_pos);
            }

            for c in candidates {
                if c < self.dtstart {
                    continue;
                }
                if self.last.is_some_and(|last| c <= last) {
                    continue;
                }
                if self.until.is_some_and(|until| c > until) {
                    self.state = State::Drained;
                    break;
                }
                self.pending.push_back(c);
            }

            if self.pending.is_empty() && matches!(self.state, State::Active) {
                empty += 1;
                if empty >= MAX_EMPTY_PERIODS {
                    tracing::warn!(
                        rule = %self.rule,
                        "giving up after {MAX_EMPTY_PERIODS} empty periods"
                    );
                    self.state = State::Failed(IterError::NoProgress(MAX_EMPTY_PERIODS));
                }
            }
        }
    }

    fn cursor_year(&self) -> i32 {
        match self.cursor {
            Cursor::Fine(t) => i32::from(t.year()),
            Cursor::Month { year, .. } => year,
            Cursor::Year(year) => year,
        }
    }

    /// Earliest instant any candidate of the current period can take.
    fn period_start(&self) -> DateTime {
        let day = match self.cursor {
            Cursor::Fine(t) => match self.rule.freq {
                Frequency::Weekly => {
                    calendar::back_to_weekday(t.date(), self.rule.effective_week_start())
                }
                _ => t.date(),
            },
            Cursor::Month { year, month } => date(clamp_year(year), month, 1),
            Cursor::Year(year) => date(clamp_year(year), 1, 1),
        };
        DateTime::from_parts(day, Time::midnight())
    }

    fn advance(&mut self) {
        let interval = self.rule.effective_interval();
        match &mut self.cursor {
            Cursor::Fine(t) => *t = calendar::step(*t, self.rule.freq, interval),
            Cursor::Month { year, month } => {
                let months = i64::from(*month) - 1 + interval;
                *year = year.saturating_add(i32::try_from(months.div_euclid(12)).unwrap_or(i32::MAX));
                *month = i8::try_from(months.rem_euclid(12) + 1).unwrap_or(1);
            }
            Cursor::Year(year) => {
                *year = year.saturating_add(i32::try_from(interval).unwrap_or(i32::MAX));
            }
        }
    }

    /// The sorted-later candidate set of the current period, and whether
    /// the set-position projection was already applied while building it.
    fn period_candidates(&self) -> (Vec<DateTime>, bool) {
        match self.cursor {
            Cursor::Fine(t) => (self.fine_candidates(t), false),
            Cursor::Month { year, month } => self.month_candidates(clamp_year(year), month),
            Cursor::Year(year) => self.year_candidates(clamp_year(year)),
        }
    }

    /// Candidates for a secondly through weekly period.
    fn fine_candidates(&self, t: DateTime) -> Vec<DateTime> {
        let r = &self.rule;
        let mut tt = match r.freq {
            Frequency::Weekly if !r.by_day.is_empty() => {
                // Weekday expansion within the current week; ordinals are
                // ignored at this frequency.
                let week = calendar::back_to_weekday(t.date(), r.effective_week_start());
                r.by_day
                    .iter()
                    .map(|wd| {
                        DateTime::from_parts(calendar::forward_to_weekday(week, wd.day), t.time())
                    })
                    .collect()
            }
            _ => vec![t],
        };

        let check_weekday = r.freq != Frequency::Weekly;
        tt.retain(|c| self.day_limits_ok(c.date(), check_weekday));
        self.clock_pipeline(tt)
    }

    /// Candidates for one month of a monthly rule.
    fn month_candidates(&self, year: i16, month: i8) -> (Vec<DateTime>, bool) {
        let r = &self.rule;
        if !r.by_month.is_empty() && !r.by_month.contains(&month.unsigned_abs()) {
            return (Vec::new(), false);
        }

        let time = self.dtstart.time();
        let anchor = DateTime::from_parts(date(year, month, 1), time);
        let mut positions_applied = false;

        let mut tt = if !r.by_month_day.is_empty() {
            let mut days: Vec<DateTime> = r
                .by_month_day
                .iter()
                .filter_map(|&md| calendar::resolve_day(year, month, md, r.invalid_behavior))
                .map(|d| DateTime::from_parts(d, time))
                .collect();
            if !r.by_day.is_empty() {
                // BYMONTHDAY combined with BYDAY keeps their intersection.
                let by_weekday =
                    calendar::weekdays_in_month(anchor, &r.by_day, &[], r.invalid_behavior);
                days.retain(|c| by_weekday.binary_search(c).is_ok());
            }
            days
        } else if !r.by_day.is_empty() {
            let set_pos = self.day_level_set_pos();
            positions_applied = !set_pos.is_empty();
            calendar::weekdays_in_month(anchor, &r.by_day, set_pos, r.invalid_behavior)
        } else {
            calendar::resolve_day(year, month, self.dtstart.day(), r.invalid_behavior)
                .map(|d| DateTime::from_parts(d, time))
                .into_iter()
                .collect()
        };

        if !r.by_year_day.is_empty() {
            tt.retain(|c| {
                r.by_year_day
                    .iter()
                    .any(|&yd| calendar::year_day_matches(c.date(), yd))
            });
        }

        (self.clock_pipeline(tt), positions_applied)
    }

    /// Candidates for one year of a yearly rule.
    fn year_candidates(&self, year: i16) -> (Vec<DateTime>, bool) {
        let r = &self.rule;
        let time = self.dtstart.time();

        let tt = if !r.by_year_day.is_empty() {
            // Year days pin the dates outright; everything else limits.
            let mut tt: Vec<DateTime> = r
                .by_year_day
                .iter()
                .filter_map(|&yd| calendar::nth_year_day(year, yd))
                .map(|d| DateTime::from_parts(d, time))
                .collect();
            tt.retain(|c| self.day_limits_ok(c.date(), true));
            tt
        } else if !r.by_week_no.is_empty() {
            let mut tt = Vec::new();
            for t in self.year_seed(year) {
                for &n in &r.by_week_no {
                    tt.extend(calendar::week_in_year(t, n));
                }
            }
            if !r.by_day.is_empty() {
                // BYDAY expands within each selected week.
                let week_start = r.effective_week_start();
                let mut expanded = Vec::with_capacity(tt.len() * r.by_day.len());
                for t in &tt {
                    let week = calendar::back_to_weekday(t.date(), week_start);
                    for wd in &r.by_day {
                        expanded.push(DateTime::from_parts(
                            calendar::forward_to_weekday(week, wd.day),
                            time,
                        ));
                    }
                }
                tt = expanded;
            }
            if !r.by_month_day.is_empty() {
                tt.retain(|c| {
                    r.by_month_day
                        .iter()
                        .any(|&md| calendar::month_day_matches(c.date(), md))
                });
            }
            tt
        } else {
            let seed = self.year_seed(year);
            if !r.by_month_day.is_empty() {
                let mut tt = Vec::with_capacity(seed.len() * r.by_month_day.len());
                for t in &seed {
                    for &md in &r.by_month_day {
                        if let Some(d) =
                            calendar::resolve_day(t.year(), t.month(), md, r.invalid_behavior)
                        {
                            tt.push(DateTime::from_parts(d, time));
                        }
                    }
                }
                if !r.by_day.is_empty() {
                    tt.retain(|c| r.by_day.iter().any(|wd| wd.day == c.weekday()));
                }
                tt
            } else if !r.by_day.is_empty() {
                let mut tt = Vec::new();
                if r.by_month.is_empty() {
                    // Ordinals count within the whole year.
                    for t in &seed {
                        for wd in &r.by_day {
                            tt.extend(calendar::weekdays_in_year(*t, *wd, r.invalid_behavior));
                        }
                    }
                } else {
                    // With BYMONTH present the weekday expansion is scoped
                    // to each selected month. The set-position projection
                    // still spans the whole year, so it is not pushed down.
                    for t in &seed {
                        tt.extend(calendar::weekdays_in_month(
                            *t,
                            &r.by_day,
                            &[],
                            r.invalid_behavior,
                        ));
                    }
                }
                tt
            } else {
                seed
            }
        };

        (self.clock_pipeline(tt), false)
    }

    /// The per-month anchors a yearly period starts from: the anchor's
    /// month, or each month of BYMONTH. When a later stage replaces the
    /// day outright, the seed sits on the 1st so that a short month cannot
    /// drop the whole period; the week-number stage keeps the anchor's day
    /// because it inherits the seed's weekday.
    fn year_seed(&self, year: i16) -> Vec<DateTime> {
        let r = &self.rule;
        let time = self.dtstart.time();
        let day = if (r.by_day.is_empty() && r.by_month_day.is_empty()) || !r.by_week_no.is_empty()
        {
            self.dtstart.day()
        } else {
            1
        };
        let months: Vec<i8> = if r.by_month.is_empty() {
            vec![self.dtstart.month()]
        } else {
            r.by_month.iter().map(|&m| m.cast_signed()).collect()
        };
        months
            .into_iter()
            .filter_map(|m| calendar::resolve_day(year, m, day, r.invalid_behavior))
            .map(|d| DateTime::from_parts(d, time))
            .collect()
    }

    /// Day-level limit filters, per the frequency's limit columns.
    fn day_limits_ok(&self, d: Date, check_weekday: bool) -> bool {
        let r = &self.rule;
        if !r.by_month.is_empty() && !r.by_month.contains(&d.month().unsigned_abs()) {
            return false;
        }
        if !r.by_year_day.is_empty()
            && !r
                .by_year_day
                .iter()
                .any(|&yd| calendar::year_day_matches(d, yd))
        {
            return false;
        }
        if !r.by_month_day.is_empty()
            && !r
                .by_month_day
                .iter()
                .any(|&md| calendar::month_day_matches(d, md))
        {
            return false;
        }
        if check_weekday
            && !r.by_day.is_empty()
            && !r.by_day.iter().any(|wd| wd.day == d.weekday())
        {
            return false;
        }
        true
    }

    /// Hour, minute, and second stages: expansions below the frequency's
    /// granularity, limit filters at or above it.
    fn clock_pipeline(&self, mut tt: Vec<DateTime>) -> Vec<DateTime> {
        let r = &self.rule;
        match r.freq {
            Frequency::Secondly => {
                tt.retain(|t| {
                    clock_ok(t.hour(), &r.by_hour)
                        && clock_ok(t.minute(), &r.by_minute)
                        && clock_ok(t.second(), &r.by_second)
                });
                tt
            }
            Frequency::Minutely => {
                tt.retain(|t| clock_ok(t.hour(), &r.by_hour) && clock_ok(t.minute(), &r.by_minute));
                expand_seconds(tt, &r.by_second)
            }
            Frequency::Hourly => {
                tt.retain(|t| clock_ok(t.hour(), &r.by_hour));
                expand_seconds(expand_minutes(tt, &r.by_minute), &r.by_second)
            }
            _ => expand_seconds(
                expand_minutes(expand_hours(tt, &r.by_hour), &r.by_minute),
                &r.by_second,
            ),
        }
    }

    /// The set positions to push into the weekday expansion, when the
    /// projection can run at day level because no clock expansion follows.
    fn day_level_set_pos(&self) -> &[i16] {
        let r = &self.rule;
        if r.by_hour.is_empty() && r.by_minute.is_empty() && r.by_second.is_empty() {
            &r.by_set_pos
        } else {
            &[]
        }
    }
}

impl Iterator for RuleIter {
    type Item = Zoned;

    fn next(&mut self) -> Option<Zoned> {
        loop {
            if let Some(c) = self.pending.pop_front() {
                self.last = Some(c);
                self.emitted += 1;
                if self.rule.count.is_some_and(|n| self.emitted >= u64::from(n)) {
                    self.state = State::Drained;
                    self.pending.clear();
                }
                match c.to_zoned(self.tz.clone()) {
                    Ok(zoned) => return Some(zoned),
                    Err(err) => {
                        self.state = State::Failed(IterError::OutOfRange(err.to_string()));
                        return None;
                    }
                }
            }
            if !matches!(self.state, State::Active) {
                return None;
            }
            self.fill();
            if self.pending.is_empty() {
                return None;
            }
        }
    }
}

fn clamp_year(year: i32) -> i16 {
    i16::try_from(year.clamp(-9999, 9999)).unwrap_or(9999)
}

fn clock_ok(component: i8, list: &[u8]) -> bool {
    list.is_empty() || list.contains(&component.unsigned_abs())
}

fn expand_hours(tt: Vec<DateTime>, hours: &[u8]) -> Vec<DateTime> {
    if hours.is_empty() {
        return tt;
    }
    let mut e = Vec::with_capacity(tt.len() * hours.len());
    for t in tt {
        for &h in hours {
            if let Ok(nt) = t.with().hour(h.cast_signed()).build() {
                e.push(nt);
            }
        }
    }
    e
}

fn expand_minutes(tt: Vec<DateTime>, minutes: &[u8]) -> Vec<DateTime> {
    if minutes.is_empty() {
        return tt;
    }
    let mut e = Vec::with_capacity(tt.len() * minutes.len());
    for t in tt {
        for &m in minutes {
            if let Ok(nt) = t.with().minute(m.cast_signed()).build() {
                e.push(nt);
            }
        }
    }
    e
}

fn expand_seconds(tt: Vec<DateTime>, seconds: &[u8]) -> Vec<DateTime> {
    if seconds.is_empty() {
        return tt;
    }
    let mut e = Vec::with_capacity(tt.len() * seconds.len());
    for t in tt {
        for &s in seconds {
            // A leap second collapses onto :59.
            if let Ok(nt) = t.with().second(s.min(59).cast_signed()).build() {
                e.push(nt);
            }
        }
    }
    e
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;

    use super::*;
    use crate::rule::InvalidBehavior;

    fn start() -> Instant {
        Instant::Zoned(
            datetime(2018, 8, 25, 9, 8, 7, 0)
                .to_zoned(TimeZone::UTC)
                .unwrap(),
        )
    }

    fn civil_all(rule: &Rule, limit: usize) -> Vec<DateTime> {
        rule.all(&start(), None, limit)
            .unwrap()
            .into_iter()
            .map(|z| z.datetime())
            .collect()
    }

    #[test]
    fn gives_up_on_rules_that_never_match() {
        // February 30th does not exist in any year
        let mut rule = Rule::new(Frequency::Monthly);
        rule.by_month = vec![2];
        rule.by_month_day = vec![30];

        let mut iter = rule.iter(&start(), None);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.error(), Some(&IterError::NoProgress(MAX_EMPTY_PERIODS)));
        // terminal: stays ended
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn yearly_rules_drain_at_the_calendar_horizon() {
        // A yearly rule exhausts the supported year range before the
        // empty-period cap can trip; it drains without an error.
        let mut rule = Rule::new(Frequency::Yearly);
        rule.by_month = vec![2];
        rule.by_month_day = vec![30];

        let mut iter = rule.iter(&start(), None);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.error(), None);
    }

    #[test]
    fn emits_anchor_only_when_it_satisfies_filters() {
        let mut rule = Rule::new(Frequency::Daily);
        rule.count = Some(2);
        rule.by_day = vec![crate::rule::WeekdayNum {
            day: jiff::civil::Weekday::Saturday,
            occurrence: None,
        }];
        // 2018-08-25 is a Saturday, so the anchor itself matches
        assert_eq!(
            civil_all(&rule, 0),
            vec![
                datetime(2018, 8, 25, 9, 8, 7, 0),
                datetime(2018, 9, 1, 9, 8, 7, 0)
            ]
        );

        // With a Sunday filter the anchor is skipped
        rule.by_day[0].day = jiff::civil::Weekday::Sunday;
        assert_eq!(
            civil_all(&rule, 0),
            vec![
                datetime(2018, 8, 26, 9, 8, 7, 0),
                datetime(2018, 9, 2, 9, 8, 7, 0)
            ]
        );
    }

    #[test]
    fn monthly_from_month_end_respects_invalid_behavior() {
        let dtstart = Instant::Floating(datetime(2018, 1, 31, 12, 0, 0, 0));
        let mut rule = Rule::new(Frequency::Monthly);
        rule.count = Some(3);

        // Omit skips February, March stays on the 31st
        let days: Vec<DateTime> = rule
            .all(&dtstart, None, 0)
            .unwrap()
            .into_iter()
            .map(|z| z.datetime())
            .collect();
        assert_eq!(
            days,
            vec![
                datetime(2018, 1, 31, 12, 0, 0, 0),
                datetime(2018, 3, 31, 12, 0, 0, 0),
                datetime(2018, 5, 31, 12, 0, 0, 0)
            ]
        );

        // Prev clamps to the month's last day
        rule.invalid_behavior = InvalidBehavior::Prev;
        let days: Vec<DateTime> = rule
            .all(&dtstart, None, 0)
            .unwrap()
            .into_iter()
            .map(|z| z.datetime())
            .collect();
        assert_eq!(
            days,
            vec![
                datetime(2018, 1, 31, 12, 0, 0, 0),
                datetime(2018, 2, 28, 12, 0, 0, 0),
                datetime(2018, 3, 31, 12, 0, 0, 0)
            ]
        );
    }

    #[test]
    fn interval_spaces_periods() {
        let mut rule = Rule::new(Frequency::Daily);
        rule.interval = Some(10);
        rule.count = Some(3);
        assert_eq!(
            civil_all(&rule, 0),
            vec![
                datetime(2018, 8, 25, 9, 8, 7, 0),
                datetime(2018, 9, 4, 9, 8, 7, 0),
                datetime(2018, 9, 14, 9, 8, 7, 0)
            ]
        );
    }

    #[test]
    fn until_is_inclusive() {
        let mut rule = Rule::new(Frequency::Daily);
        rule.until = Some(Instant::Floating(datetime(2018, 8, 27, 9, 8, 7, 0)));
        assert_eq!(
            civil_all(&rule, 0),
            vec![
                datetime(2018, 8, 25, 9, 8, 7, 0),
                datetime(2018, 8, 26, 9, 8, 7, 0),
                datetime(2018, 8, 27, 9, 8, 7, 0)
            ]
        );
    }

    #[test]
    fn floating_anchor_resolves_in_supplied_zone() {
        let dtstart = Instant::Floating(datetime(2018, 8, 25, 9, 8, 7, 0));
        let tz = TimeZone::get("America/New_York").unwrap();
        let mut rule = Rule::new(Frequency::Daily);
        rule.count = Some(1);

        let out = rule.all(&dtstart, Some(tz.clone()), 0).unwrap();
        assert_eq!(out[0].time_zone(), &tz);
        assert_eq!(out[0].datetime(), datetime(2018, 8, 25, 9, 8, 7, 0));

        // Without a zone the anchor floats in UTC
        let out = rule.all(&dtstart, None, 0).unwrap();
        assert_eq!(out[0].time_zone(), &TimeZone::UTC);
    }

    #[test]
    fn weekly_respects_week_start() {
        // RFC 5545 WKST example: FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU
        // from Tuesday 1997-08-05 differs between WKST=MO and WKST=SU.
        let dtstart = Instant::Floating(datetime(1997, 8, 5, 9, 0, 0, 0));
        let mut rule = Rule::new(Frequency::Weekly);
        rule.interval = Some(2);
        rule.count = Some(4);
        rule.by_day = vec![
            crate::rule::WeekdayNum {
                day: jiff::civil::Weekday::Tuesday,
                occurrence: None,
            },
            crate::rule::WeekdayNum {
                day: jiff::civil::Weekday::Sunday,
                occurrence: None,
            },
        ];

        let days: Vec<Date> = rule
            .all(&dtstart, None, 0)
            .unwrap()
            .iter()
            .map(Zoned::date)
            .collect();
        assert_eq!(
            days,
            vec![
                date(1997, 8, 5),
                date(1997, 8, 10),
                date(1997, 8, 19),
                date(1997, 8, 24)
            ]
        );

        rule.week_start = Some(jiff::civil::Weekday::Sunday);
        let days: Vec<Date> = rule
            .all(&dtstart, None, 0)
            .unwrap()
            .iter()
            .map(Zoned::date)
            .collect();
        assert_eq!(
            days,
            vec![
                date(1997, 8, 5),
                date(1997, 8, 17),
                date(1997, 8, 19),
                date(1997, 8, 31)
            ]
        );
    }
}
