// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Parsers for property values as defined in RFC 5545 Section 3.3.

mod datetime;
mod primitive;
mod rrule;

pub use datetime::{
    ValueDate, ValueDateTime, ValueTime, value_date, value_date_time, value_end_date,
    values_date_time,
};
pub use primitive::ValueExpected;
pub use rrule::value_rrule;
