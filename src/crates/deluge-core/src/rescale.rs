use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Tick resolution of the Deluge sequencer
pub const DEST_PPQ: i64 = 48;

/// Converts tick positions between a source time base and the destination grid.
///
/// All conversions are exact integer arithmetic followed by a single
/// round-half-to-even, so repeated conversions never accumulate float error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRescaler {
    source_ppq: i64,
    dest_ppq: i64,
    tick_offset: i64,
}

impl TimeRescaler {
    /// Create a rescaler from `source_ppq` to `dest_ppq`
    pub fn new(source_ppq: i64, dest_ppq: i64) -> Result<Self> {
        if source_ppq <= 0 || dest_ppq <= 0 {
            return Err(ConvertError::InvalidPpq {
                source_ppq,
                dest_ppq,
            });
        }

        Ok(TimeRescaler {
            source_ppq,
            dest_ppq,
            tick_offset: 0,
        })
    }

    /// Create a rescaler onto the Deluge's 48 PPQ grid
    pub fn to_deluge(source_ppq: i64) -> Result<Self> {
        Self::new(source_ppq, DEST_PPQ)
    }

    /// Return a copy that subtracts `tick_offset` before converting in [`Self::to_dest_offset`]
    pub fn with_offset(self, tick_offset: i64) -> Self {
        TimeRescaler {
            tick_offset,
            ..self
        }
    }

    pub fn source_ppq(&self) -> i64 {
        self.source_ppq
    }

    pub fn dest_ppq(&self) -> i64 {
        self.dest_ppq
    }

    pub fn tick_offset(&self) -> i64 {
        self.tick_offset
    }

    /// Source ticks to destination ticks
    pub fn to_dest(&self, t: i64) -> i64 {
        round_div_even(t as i128 * self.dest_ppq as i128, self.source_ppq as i128)
    }

    /// Source ticks to destination ticks, relative to the tick offset
    pub fn to_dest_offset(&self, t: i64) -> i64 {
        self.to_dest(t - self.tick_offset)
    }

    /// Destination ticks back to source ticks
    pub fn to_source(&self, t: i64) -> i64 {
        round_div_even(t as i128 * self.source_ppq as i128, self.dest_ppq as i128)
    }
}

/// `num / den` rounded to the nearest integer, ties to even. `den` must be positive.
fn round_div_even(num: i128, den: i128) -> i64 {
    let quotient = num.div_euclid(den);
    let twice_rem = num.rem_euclid(den) * 2;

    let rounded = if twice_rem > den || (twice_rem == den && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    };

    rounded as i64
}
