//! Target-size parsing for the `WxH` argument convention.
//!
//! Every subcommand takes its desired output size as a single `WIDTHxHEIGHT`
//! string (`1920x1080`). The string must be exactly two runs of ASCII digits
//! joined by a lowercase `x` — no signs, no whitespace, no units — and both
//! components must be strictly positive. The parsed value renders back
//! through [`Display`](std::fmt::Display) in canonical form, which is what
//! names the per-size output directory and feeds `convert`'s geometry
//! arguments, so `0128x128` and `128x128` address the same outputs.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DimensionsError {
    #[error("dimension string ({0}) is not valid, expected WIDTHxHEIGHT")]
    Malformed(String),
    #[error("width is not a valid positive integer")]
    InvalidWidth,
    #[error("height is not a valid positive integer")]
    InvalidHeight,
}

/// A validated output size in pixels. Both components are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Aspect ratio as width over height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = DimensionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((w, h)) = s.split_once('x') else {
            return Err(DimensionsError::Malformed(s.to_string()));
        };
        if !is_digit_run(w) || !is_digit_run(h) {
            return Err(DimensionsError::Malformed(s.to_string()));
        }

        // A digit run that overflows u32 is no more usable than a zero.
        let width = w
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(DimensionsError::InvalidWidth)?;
        let height = h
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(DimensionsError::InvalidHeight)?;

        Ok(Dimensions { width, height })
    }
}

/// One or more ASCII digits, nothing else.
fn is_digit_run(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
