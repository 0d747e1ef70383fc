//! Value encoding helpers for Deluge parameter fields
//!
//! The Deluge stores most parameters as signed 32-bit hex words. These helpers
//! are not needed to write note data but are kept for callers that also set
//! clip parameters.

/// Format the low 32 bits of `v` as 8 uppercase hex digits
pub fn hex_lz32(v: i64) -> String {
    format!("{:08X}", v & 0xFFFF_FFFF)
}

/// Encode a normalized value (0.0 to 1.0) as a signed Deluge parameter word
pub fn norm_to_hex(v: f64) -> String {
    let v = v.clamp(0.0, 1.0);
    let value = (v * 0x7FFF_FFFF as f64).round() as i64 - 0x4000_0000;
    hex_lz32(value)
}

/// Linear mapping from one range onto another.
///
/// Either range may be reversed (`min > max`); values are then mirrored so the
/// first bound of the input still lands on the first bound of the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMapper {
    old_min: f64,
    old_max: f64,
    new_min: f64,
    new_max: f64,
    reverse_input: bool,
    reverse_output: bool,
}

impl RangeMapper {
    /// Returns `None` when either range has zero width
    pub fn new(o_min: f64, o_max: f64, n_min: f64, n_max: f64) -> Option<Self> {
        if o_min == o_max || n_min == n_max {
            return None;
        }

        let reverse_input = o_min > o_max;
        let reverse_output = n_min > n_max;
        let (old_min, old_max) = if reverse_input { (o_max, o_min) } else { (o_min, o_max) };
        let (new_min, new_max) = if reverse_output { (n_max, n_min) } else { (n_min, n_max) };

        Some(RangeMapper {
            old_min,
            old_max,
            new_min,
            new_max,
            reverse_input,
            reverse_output,
        })
    }

    pub fn map(&self, x: f64) -> f64 {
        let old_span = self.old_max - self.old_min;
        let new_span = self.new_max - self.new_min;

        if self.reverse_input {
            // A reversed input takes precedence over a reversed output
            return (self.old_max - x) * new_span / old_span + self.new_min;
        }

        let portion = (x - self.old_min) * new_span / old_span;
        if self.reverse_output {
            self.new_max - portion
        } else {
            portion + self.new_min
        }
    }
}
