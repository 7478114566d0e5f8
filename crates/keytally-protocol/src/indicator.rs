//! Outbound indicator commands.
//!
//! Each command is one text line understood by the firmware:
//!
//! | Command | Wire line | Effect on the device |
//! |---------|-----------|----------------------|
//! | [`All`](IndicatorCommand::All) | `LED:ALL:r,g,b` | every light set, animation cancelled |
//! | [`Set`](IndicatorCommand::Set) | `LED:i:r,g,b` | one light set, its animation cancelled |
//! | [`Animate`](IndicatorCommand::Animate) | `LED:ANIM:i:r,g,b` | one light pulses on a 2 s cycle |
//! | [`StopAnimation`](IndicatorCommand::StopAnimation) | `LED:STOP` | animation cancelled, colors kept |

use keytally_core::constants::{LED_ALL, LED_ANIM, LED_PREFIX, LED_STOP};
use keytally_core::{Error, IndicatorIndex, Rgb};
use std::fmt;

/// Command changing the indicator lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorCommand {
    /// Set every light to one color.
    All(Rgb),

    /// Set a single light.
    Set { index: IndicatorIndex, color: Rgb },

    /// Start a pulse animation on one light.
    Animate { index: IndicatorIndex, color: Rgb },

    /// Cancel the running animation.
    StopAnimation,
}

impl IndicatorCommand {
    /// Command turning every light off.
    pub const CLEAR: IndicatorCommand = IndicatorCommand::All(Rgb::OFF);

    pub fn set(index: IndicatorIndex, color: Rgb) -> Self {
        Self::Set { index, color }
    }

    pub fn animate(index: IndicatorIndex, color: Rgb) -> Self {
        Self::Animate { index, color }
    }

    /// Wire representation including the trailing newline.
    ///
    /// ```
    /// use keytally_protocol::IndicatorCommand;
    /// use keytally_core::{IndicatorIndex, Rgb};
    ///
    /// let cmd = IndicatorCommand::set(IndicatorIndex::LAYER, Rgb::YELLOW);
    /// assert_eq!(cmd.encode(), "LED:7:255,255,0\n");
    /// ```
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for IndicatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::All(color) => write!(f, "{LED_PREFIX}:{LED_ALL}:{color}"),
            Self::Set { index, color } => write!(f, "{LED_PREFIX}:{index}:{color}"),
            Self::Animate { index, color } => {
                write!(f, "{LED_PREFIX}:{LED_ANIM}:{index}:{color}")
            }
            Self::StopAnimation => write!(f, "{LED_PREFIX}:{LED_STOP}"),
        }
    }
}

impl std::str::FromStr for IndicatorCommand {
    type Err = Error;

    /// Parse a command line as the firmware would.
    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidColor(format!("not an indicator command: {s}"));

        let body = s
            .trim()
            .strip_prefix(LED_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(invalid)?;

        let parts: Vec<&str> = body.split(':').collect();
        match parts.as_slice() {
            [LED_STOP] => Ok(Self::StopAnimation),
            [LED_ALL, color] => Ok(Self::All(color.parse()?)),
            [LED_ANIM, index, color] => Ok(Self::Animate {
                index: parse_index(index)?,
                color: color.parse()?,
            }),
            [index, color] => Ok(Self::Set {
                index: parse_index(index)?,
                color: color.parse()?,
            }),
            _ => Err(invalid()),
        }
    }
}

fn parse_index(s: &str) -> Result<IndicatorIndex, Error> {
    let value: u8 = s
        .trim()
        .parse()
        .map_err(|_| Error::NotANumber(s.to_string()))?;
    IndicatorIndex::new(value)
}
