// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Parse RFC 5545 recurrence rules and enumerate their occurrences.
//!
//! The crate has three layers: a chumsky grammar for the textual surface
//! ([`parse_recurrence`], [`parse_rule`]), a lazy occurrence generator per
//! rule ([`Rule::iter`]), and a combiner that merges rule streams with
//! explicit include/exclude dates ([`Recurrence::all`]).
//!
//! ```
//! use recur::parse_recurrence;
//!
//! let src = "\
//! DTSTART:20180825T090807Z
//! RRULE:FREQ=DAILY;COUNT=3
//! ";
//! let recurrence = parse_recurrence(src, None).unwrap();
//! let occurrences = recurrence.all(0).unwrap();
//! assert_eq!(occurrences.len(), 3);
//! assert_eq!(occurrences[0].to_string(), "2018-08-25T09:08:07+00:00[UTC]");
//! ```

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(clippy::similar_names, clippy::single_match_else, clippy::match_bool)]

mod calendar;
mod generator;
mod instant;
mod parser;
mod recurrence;
mod rule;

pub mod keyword;
pub mod value;

pub use crate::generator::{IterError, RuleIter};
pub use crate::instant::Instant;
pub use crate::parser::{ParseError, parse_recurrence, parse_rule};
pub use crate::recurrence::Recurrence;
pub use crate::rule::{
    Frequency, InvalidBehavior, Rule, ValidationError, WeekdayNum, weekday_code,
};
