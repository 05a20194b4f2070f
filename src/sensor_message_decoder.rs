//! Parser for the line protocol spoken by a serial sensor bridge. Each line
//! carries one orientation event:
//!
//! ```text
//! +ORIENT:<alpha>,<beta>,<gamma>,<compass>,<timestamp_ms>
//! ```
//!
//! Any angle the device does not report is sent as `-`.

use crate::orientation_source::OrientationEvent;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, line_ending, space0},
    combinator::{eof, map, value},
    error::Error,
    number::complete::double,
    sequence::{preceded, terminated, tuple},
    Finish, IResult,
};

use std::str::FromStr;

fn parse_optional_angle(s: &str) -> IResult<&str, Option<f64>> {
    alt((map(double, Some), value(None, char('-'))))(s)
}

fn parse_orient_event(s: &str) -> IResult<&str, OrientationEvent> {
    map(
        terminated(
            tuple((
                preceded(tag("+ORIENT:"), parse_optional_angle),
                preceded(char(','), parse_optional_angle),
                preceded(char(','), parse_optional_angle),
                preceded(char(','), parse_optional_angle),
                preceded(char(','), double),
            )),
            preceded(space0, alt((line_ending, eof))),
        ),
        |(alpha, beta, gamma, compass_heading, timestamp_ms)| OrientationEvent {
            alpha,
            beta,
            gamma,
            compass_heading,
            timestamp_ms,
        },
    )(s)
}

/// A single message from the sensor bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorMessage {
    /// An orientation reading
    Orient(OrientationEvent),
}

impl FromStr for SensorMessage {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_orient_event(s).finish() {
            Ok((_remaining, event)) => Ok(SensorMessage::Orient(event)),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}
