//! Decodes the text lines the scale firmware prints over the BLE-UART link.
//!
//! The only message the scale sends is a raw load-cell reading:
//!
//! ```text
//! Weight: <number>
//! ```
//!
//! where `<number>` is a decimal that may be negative, fractional, or written
//! with an exponent. Anything else (boot banners, calibration chatter, half a
//! line left over from a reconnect) fails to decode and is meant to be dropped
//! by the caller.

use nom::{
    bytes::complete::tag,
    character::complete::space0,
    combinator::{all_consuming, map, verify},
    error::Error,
    number::complete::double,
    sequence::{preceded, terminated},
    Finish, IResult,
};

use std::str::FromStr;

/// Literal that starts every reading line.
pub const WEIGHT_PREFIX: &str = "Weight: ";

/// A single raw reading from the load cell, before tare.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightReading {
    /// Raw value as printed by the scale, in grams.
    pub grams: f64,
}

fn parse_grams(s: &str) -> IResult<&str, f64> {
    verify(double, |grams: &f64| grams.is_finite())(s)
}

fn parse_weight_reading(s: &str) -> IResult<&str, WeightReading> {
    map(preceded(tag(WEIGHT_PREFIX), parse_grams), |grams| {
        WeightReading { grams }
    })(s)
}

impl FromStr for WeightReading {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(terminated(parse_weight_reading, space0))(s).finish() {
            Ok((_remaining, reading)) => Ok(reading),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

/// Line-level convenience used by the weight pipeline: `Some(grams)` for a
/// well-formed reading, `None` for anything else.
pub fn decode_line(line: &str) -> Option<f64> {
    line.parse::<WeightReading>().ok().map(|r| r.grams)
}
