//! Parsers for CAN timing values given on the command line.
//!
//! Bitrates accept an optional `k`/`M` suffix (`500k`, `1M`, `125000`).
//! Sample points are accepted either as a fraction (`0.875`) or directly in
//! tenths of a percent (`875`), the unit the kernel uses.

use winnow::ascii::digit1;
use winnow::combinator::{opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::one_of;

type PResult<T> = Result<T, ErrMode<ContextError>>;

/// Error returned for malformed timing values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid bitrate: {0}")]
    Bitrate(String),

    #[error("invalid sample point: {0} (expected 0.001-0.999 or 1-999)")]
    SamplePoint(String),
}

/// Parse a bitrate in bits/second.
pub fn parse_bitrate(s: &str) -> Result<u32, ParseError> {
    let mut input = s.trim();
    match bitrate(&mut input) {
        Ok(value) if input.is_empty() && value > 0 => Ok(value),
        _ => Err(ParseError::Bitrate(s.to_string())),
    }
}

/// Parse a sample point into tenths of a percent.
pub fn parse_sample_point(s: &str) -> Result<u32, ParseError> {
    let mut input = s.trim();
    match sample_point(&mut input) {
        Ok(value) if input.is_empty() && (1..1000).contains(&value) => Ok(value),
        _ => Err(ParseError::SamplePoint(s.to_string())),
    }
}

fn bitrate(input: &mut &str) -> PResult<u32> {
    (digit1, opt(one_of(['k', 'K', 'M', 'm'])))
        .verify_map(|(digits, suffix): (&str, Option<char>)| {
            let value: u32 = digits.parse().ok()?;
            let scale = match suffix {
                Some('k' | 'K') => 1_000,
                Some('M' | 'm') => 1_000_000,
                _ => 1,
            };
            value.checked_mul(scale)
        })
        .parse_next(input)
}

fn sample_point(input: &mut &str) -> PResult<u32> {
    (digit1, opt(preceded('.', digit1)))
        .verify_map(|(whole, frac): (&str, Option<&str>)| match frac {
            // 0.875 -> 875, 0.8 -> 800
            Some(frac) if whole.chars().all(|c| c == '0') && frac.len() <= 3 => {
                let value: u32 = frac.parse().ok()?;
                Some(value * 10u32.pow(3 - frac.len() as u32))
            }
            Some(_) => None,
            None => whole.parse().ok(),
        })
        .parse_next(input)
}
