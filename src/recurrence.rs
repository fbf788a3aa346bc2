// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! A full recurrence: an anchor, rule sets, and explicit date lists,
//! merged into one ordered occurrence stream.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use jiff::tz::TimeZone;
use jiff::{Timestamp, Zoned};

use crate::generator::{IterError, RuleIter};
use crate::instant::Instant;
use crate::rule::Rule;

/// An anchor instant with inclusion and exclusion rules and explicit
/// include/exclude dates, as assembled by
/// [`parse_recurrence`](crate::parse_recurrence).
#[derive(Debug, Clone)]
pub struct Recurrence {
    /// The anchor instant. Rules only produce occurrences when an anchor
    /// is present; explicit dates stand on their own.
    pub dtstart: Option<Instant>,
    /// Inclusion rules.
    pub rrules: Vec<Rule>,
    /// Exclusion rules.
    pub exrules: Vec<Rule>,
    /// Explicit include dates.
    pub rdates: Vec<Instant>,
    /// Explicit exclude dates.
    pub exdates: Vec<Instant>,
    /// Zone that floating instants resolve against at evaluation time.
    pub time_zone: TimeZone,
}

impl Default for Recurrence {
    fn default() -> Self {
        Recurrence {
            dtstart: None,
            rrules: Vec::new(),
            exrules: Vec::new(),
            rdates: Vec::new(),
            exdates: Vec::new(),
            time_zone: TimeZone::UTC,
        }
    }
}

impl Recurrence {
    /// Merge all inclusion sources into one ordered, deduplicated stream,
    /// drop everything matched by an exclusion source, and collect up to
    /// `limit` occurrences (0 means no limit).
    ///
    /// # Errors
    ///
    /// Propagates the first terminal error from any inclusion or exclusion
    /// source, and fails on instants outside the representable range.
    pub fn all(&self, limit: usize) -> Result<Vec<Zoned>, IterError> {
        let mut sources = Vec::new();
        if let Some(dtstart) = &self.dtstart {
            for rule in &self.rrules {
                sources.push(Source::Rule(
                    rule.iter(dtstart, Some(self.time_zone.clone())),
                ));
            }
        }
        sources.push(Source::Dates(self.resolve_dates(&self.rdates)?.into_iter()));

        let mut exclusions = Vec::new();
        if let Some(dtstart) = &self.dtstart {
            for rule in &self.exrules {
                exclusions.push(Source::Rule(
                    rule.iter(dtstart, Some(self.time_zone.clone())),
                ));
            }
        }
        exclusions.push(Source::Dates(
            self.resolve_dates(&self.exdates)?.into_iter(),
        ));
        let mut exclusions = ExclusionSet::new(exclusions)?;

        // Min-heap over (instant, source-id); the id keeps ties stable.
        let mut heap = BinaryHeap::new();
        for (id, source) in sources.iter_mut().enumerate() {
            if let Some(zoned) = source.try_next()? {
                heap.push(Entry::new(zoned, id));
            }
        }

        let mut out: Vec<Zoned> = Vec::new();
        while let Some(entry) = heap.pop() {
            let Entry { ts, id, zoned } = entry;
            if let Some(source) = sources.get_mut(id)
                && let Some(next) = source.try_next()?
            {
                heap.push(Entry::new(next, id));
            }
            if out.last().is_some_and(|prev| prev.timestamp() == ts) {
                continue;
            }
            if exclusions.contains(ts)? {
                continue;
            }
            out.push(zoned);
            if limit != 0 && out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    fn resolve_dates(&self, dates: &[Instant]) -> Result<Vec<Zoned>, IterError> {
        let mut resolved = dates
            .iter()
            .map(|d| {
                d.resolve(&self.time_zone)
                    .map_err(|err| IterError::OutOfRange(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        resolved.sort_unstable();
        Ok(resolved)
    }
}

enum Source {
    Rule(RuleIter),
    Dates(std::vec::IntoIter<Zoned>),
}

impl Source {
    /// Pull the next instant, surfacing a rule iterator's terminal error.
    fn try_next(&mut self) -> Result<Option<Zoned>, IterError> {
        match self {
            Source::Rule(iter) => match iter.next() {
                Some(zoned) => Ok(Some(zoned)),
                None => match iter.error() {
                    Some(err) => Err(err.clone()),
                    None => Ok(None),
                },
            },
            Source::Dates(dates) => Ok(dates.next()),
        }
    }
}

/// Exclusion streams, advanced lazily to each tested candidate.
struct ExclusionSet {
    sources: Vec<Source>,
    heads: Vec<Option<Timestamp>>,
}

impl ExclusionSet {
    fn new(mut sources: Vec<Source>) -> Result<ExclusionSet, IterError> {
        let mut heads = Vec::with_capacity(sources.len());
        for source in &mut sources {
            heads.push(source.try_next()?.map(|z| z.timestamp()));
        }
        Ok(ExclusionSet { sources, heads })
    }

    fn contains(&mut self, ts: Timestamp) -> Result<bool, IterError> {
        let mut hit = false;
        for (head, source) in self.heads.iter_mut().zip(&mut self.sources) {
            while head.is_some_and(|h| h < ts) {
                *head = source.try_next()?.map(|z| z.timestamp());
            }
            hit = hit || *head == Some(ts);
        }
        Ok(hit)
    }
}

struct Entry {
    ts: Timestamp,
    id: usize,
    zoned: Zoned,
}

impl Entry {
    fn new(zoned: Zoned, id: usize) -> Entry {
        Entry {
            ts: zoned.timestamp(),
            id,
            zoned,
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.id == other.id
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// Reversed so that `BinaryHeap` pops the earliest instant first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.ts, other.id).cmp(&(self.ts, self.id))
    }
}
