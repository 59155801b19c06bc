use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::DEFAULT_SPEED;

/// Drive direction understood by the microcontroller firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Drive forward.
    #[serde(rename = "F")]
    Forward,

    /// Drive backward.
    #[serde(rename = "B")]
    Back,

    /// Turn left.
    #[serde(rename = "L")]
    Left,

    /// Turn right.
    #[serde(rename = "R")]
    Right,

    /// Stop.
    #[serde(rename = "S")]
    Stop,
}

impl Direction {
    /// Parse the single-letter wire form.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'F' => Some(Self::Forward),
            'B' => Some(Self::Back),
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            'S' => Some(Self::Stop),
            _ => None,
        }
    }

    /// Single-letter wire form.
    pub fn letter(self) -> char {
        match self {
            Self::Forward => 'F',
            Self::Back => 'B',
            Self::Left => 'L',
            Self::Right => 'R',
            Self::Stop => 'S',
        }
    }

    /// Numeric code used for charting (0 = stop, 1..4 = F, B, L, R).
    pub fn code(self) -> u8 {
        match self {
            Self::Stop => 0,
            Self::Forward => 1,
            Self::Back => 2,
            Self::Left => 3,
            Self::Right => 4,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// State of the link to the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Last round trip succeeded.
    Connected,

    /// Last round trip failed, or no status check has run yet.
    Disconnected,

    /// No serial device; commands are accepted but not transmitted.
    Demo,
}

impl ConnectionStatus {
    /// 1 when connected, 0 otherwise.
    pub fn as_flag(self) -> u8 {
        match self {
            Self::Connected => 1,
            Self::Disconnected | Self::Demo => 0,
        }
    }
}

/// Last known robot state.
///
/// Fields are independent of each other; every update replaces individual
/// values wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub direction: Direction,
    pub speed: u8,
    pub timestamp: DateTime<Local>,
    pub voltage: f64,
    pub connection_status: ConnectionStatus,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            direction: Direction::Stop,
            speed: DEFAULT_SPEED,
            timestamp: Local::now(),
            voltage: 0.0,
            connection_status: ConnectionStatus::Disconnected,
        }
    }
}
