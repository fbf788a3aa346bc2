// SPDX-FileCopyrightText: 2026 The recur authors
//
// SPDX-License-Identifier: Apache-2.0

//! Low-level character-class parsers shared by the value grammars.

use std::borrow::Cow;

use chumsky::Parser;
use chumsky::error::RichPattern;
use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::input::ValueInput;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

/// Failure reasons when a specific value type was expected but not found.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueExpected {
    /// A calendar date was expected
    Date,
    /// A wall-clock time was expected
    Time,
    /// A 32-bit unsigned integer value was expected
    U32,
    /// A positive (non-zero) 32-bit unsigned integer value was expected
    PositiveU32,
    /// A specific keyword was expected
    Keyword(&'static str),
    /// A recurrence rule part occurred more than once
    RuleDuplicatePart,
    /// A recurrence rule is missing its FREQ part
    RuleRequiredFreq,
    /// UNTIL and COUNT must not occur in the same recurrence rule
    RuleCountUntilExclusion,
}

impl From<ValueExpected> for RichPattern<'_, char> {
    fn from(expected: ValueExpected) -> Self {
        match expected {
            ValueExpected::Date => Self::Label(Cow::Borrowed("invalid date")),
            ValueExpected::Time => Self::Label(Cow::Borrowed("invalid time")),
            ValueExpected::U32 => Self::Label(Cow::Borrowed("u32 out of range")),
            ValueExpected::PositiveU32 => Self::Label(Cow::Borrowed("expected positive integer")),
            ValueExpected::Keyword(kw) => Self::Label(Cow::Borrowed(kw)),
            ValueExpected::RuleDuplicatePart => Self::Label(Cow::Borrowed("duplicate rule part")),
            ValueExpected::RuleRequiredFreq => Self::Label(Cow::Borrowed("missing FREQ part")),
            ValueExpected::RuleCountUntilExclusion => {
                Self::Label(Cow::Borrowed("UNTIL and COUNT are mutually exclusive"))
            }
        }
    }
}

/// Match a keyword without regard to ASCII case, per RFC 5545's
/// case-insensitive property and rule-part names.
pub(crate) fn keyword_ci<'src, I, E>(kw: &'static str) -> impl Parser<'src, I, (), E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    any()
        .repeated()
        .exactly(kw.len())
        .collect::<String>()
        .try_map(move |s: String, span| {
            if s.eq_ignore_ascii_case(kw) {
                Ok(())
            } else {
                Err(E::Error::expected_found(
                    [ValueExpected::Keyword(kw)],
                    None,
                    span,
                ))
            }
        })
}

/// Optional sign prefix; absent or `+` is positive.
pub(crate) fn is_positive<'src, I, E>() -> impl Parser<'src, I, bool, E> + Copy
where
    I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
    E: ParserExtra<'src, I>,
{
    select! { c @ ('+' | '-') => c }
        .or_not()
        .map(|c| !matches!(c, Some('-')))
}

macro_rules! digit {
    ($name:ident, $ty:ty, $lo:literal, $hi:literal) => {
        pub(crate) fn $name<'src, I, E>() -> impl Parser<'src, I, $ty, E> + Copy
        where
            I: Input<'src, Token = char, Span = SimpleSpan> + ValueInput<'src>,
            E: ParserExtra<'src, I>,
        {
            select! { c @ ($lo..=$hi) => c as $ty - '0' as $ty }
        }
    };
}

digit!(u8_0_1, u8, '0', '1');
digit!(u8_0_3, u8, '0', '3');
digit!(u8_0_5, u8, '0', '5');
digit!(u8_0_9, u8, '0', '9');
digit!(u8_1_9, u8, '1', '9');
digit!(i8_0_1, i8, '0', '1');
digit!(i8_0_2, i8, '0', '2');
digit!(i8_0_3, i8, '0', '3');
digit!(i8_0_5, i8, '0', '5');
digit!(i8_0_9, i8, '0', '9');
digit!(i8_1_2, i8, '1', '2');
digit!(i8_1_4, i8, '1', '4');
digit!(i8_1_9, i8, '1', '9');
digit!(i16_0_5, i16, '0', '5');
digit!(i16_0_6, i16, '0', '6');
digit!(i16_0_9, i16, '0', '9');
digit!(i16_1_2, i16, '1', '2');
digit!(i16_1_9, i16, '1', '9');

#[cfg(test)]
mod tests {
    use chumsky::extra;

    use super::*;

    #[test]
    fn matches_keywords_in_any_case() {
        let parser = keyword_ci::<_, extra::Err<Rich<char>>>("BYDAY");
        for src in ["BYDAY", "byday", "ByDay", "bYdAy"] {
            assert!(parser.parse(src).into_result().is_ok(), "failed for {src}");
        }
        assert!(parser.parse("BYDAX").into_result().is_err());
        assert!(parser.parse("BYDA").into_result().is_err());
    }

    #[test]
    fn parses_sign_prefixes() {
        let parser = is_positive::<_, extra::Err<Rich<char>>>();
        assert_eq!(parser.parse("+").into_result().unwrap(), true);
        assert_eq!(parser.parse("-").into_result().unwrap(), false);
        assert_eq!(parser.parse("").into_result().unwrap(), true);
    }
}
