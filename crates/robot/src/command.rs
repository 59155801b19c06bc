//! Drive command tokens and device replies.

use std::fmt;
use std::str::FromStr;

use rigbot_core::Direction;

use crate::error::RobotError;

/// A parsed drive command such as `F200` or `S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveCommand {
    direction: Direction,
    speed: Option<u8>,
    token: String,
}

impl DriveCommand {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Speed suffix, if the token carried one.
    pub fn speed(&self) -> Option<u8> {
        self.speed
    }

    /// The token as it goes out on the wire, without the line terminator.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl FromStr for DriveCommand {
    type Err = RobotError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim();
        let mut chars = token.chars();
        let letter = chars.next().ok_or(RobotError::MissingCommand)?;

        let direction = Direction::from_letter(letter).ok_or_else(|| {
            RobotError::InvalidCommand(format!(
                "unknown direction '{}', expected one of F, B, L, R, S",
                letter
            ))
        })?;

        let suffix = chars.as_str();
        let speed = if suffix.is_empty() {
            None
        } else {
            let speed = suffix.parse::<u8>().map_err(|_| {
                RobotError::InvalidCommand(format!(
                    "speed '{}' must be an integer between 0 and 255",
                    suffix
                ))
            })?;
            Some(speed)
        };

        Ok(Self {
            direction,
            speed,
            token: token.to_string(),
        })
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Voltage reported in a `V:<volts>` reply line.
pub fn parse_voltage(reply: &str) -> Option<f64> {
    let (key, value) = reply.trim().split_once(':')?;
    if key.trim() != "V" {
        return None;
    }
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
