use std::collections::HashSet;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{ConvertError, Result};

/// Synth presets assigned to generated clips. Also caps the number of clips per song.
pub const PRESET_NAMES: [&str; 16] = [
    "000 Rich Saw Bass",
    "001 Sync Bass",
    "002 Basic Square Bass",
    "003 Synthwave Bass",
    "005 Sweet Mono Bass",
    "006 Vaporwave Bass",
    "007 Detuned Saw Bass",
    "009 Hoover Bass",
    "019 Fizzy Strings",
    "026 Pw Organ",
    "030 Distant Porta",
    "040 Spacer Leader",
    "073 Piano",
    "074 Electric Piano",
    "076 Organ",
    "078 House",
];

/// Valid `colourOffset` values
pub const COLOR_OFFSETS: RangeInclusive<i32> = -63..=63;

/// Hands out preset names and color offsets without repeats within one pass.
///
/// The random source is injectable so tests can pin the sequence. Call
/// [`ResourceAllocator::reset`] at the start of every document pass.
#[derive(Debug, Clone)]
pub struct ResourceAllocator<R = StdRng> {
    rng: R,
    used_presets: HashSet<&'static str>,
    used_colors: HashSet<i32>,
}

impl ResourceAllocator<StdRng> {
    /// Allocator seeded from the OS entropy source
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Allocator with a reproducible sequence
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ResourceAllocator<R> {
    pub fn new(rng: R) -> Self {
        ResourceAllocator {
            rng,
            used_presets: HashSet::new(),
            used_colors: HashSet::new(),
        }
    }

    /// Maximum number of clips one pass can allocate for
    pub fn capacity(&self) -> usize {
        PRESET_NAMES.len()
    }

    /// Pick an unused preset name
    pub fn next_preset(&mut self) -> Result<&'static str> {
        let available: Vec<&'static str> = PRESET_NAMES
            .iter()
            .copied()
            .filter(|p| !self.used_presets.contains(p))
            .collect();

        let preset = *available
            .choose(&mut self.rng)
            .ok_or(ConvertError::PoolExhausted("presets"))?;

        self.used_presets.insert(preset);
        Ok(preset)
    }

    /// Pick an unused color offset
    pub fn next_color(&mut self) -> Result<i32> {
        let available: Vec<i32> = COLOR_OFFSETS
            .filter(|c| !self.used_colors.contains(c))
            .collect();

        let color = *available
            .choose(&mut self.rng)
            .ok_or(ConvertError::PoolExhausted("colors"))?;

        self.used_colors.insert(color);
        Ok(color)
    }

    /// Forget every allocation made so far
    pub fn reset(&mut self) {
        self.used_presets.clear();
        self.used_colors.clear();
    }

    pub fn used_presets(&self) -> &HashSet<&'static str> {
        &self.used_presets
    }

    pub fn used_colors(&self) -> &HashSet<i32> {
        &self.used_colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_presets_unique_until_exhausted() {
        let mut alloc = ResourceAllocator::seeded(7);
        let mut seen = HashSet::new();

        for _ in 0..PRESET_NAMES.len() {
            let preset = alloc.next_preset().unwrap();
            assert!(PRESET_NAMES.contains(&preset));
            assert!(seen.insert(preset));
        }

        assert!(matches!(
            alloc.next_preset(),
            Err(ConvertError::PoolExhausted("presets"))
        ));
    }

    #[test]
    fn test_colors_cover_whole_range() {
        let mut alloc = ResourceAllocator::seeded(11);
        let mut colors: Vec<i32> = (0..127).map(|_| alloc.next_color().unwrap()).collect();
        colors.sort();

        assert_eq!(colors, COLOR_OFFSETS.collect::<Vec<_>>());
        assert!(alloc.next_color().is_err());
    }

    #[test]
    fn test_reset_restores_pools() {
        let mut alloc = ResourceAllocator::seeded(3);
        for _ in 0..PRESET_NAMES.len() {
            alloc.next_preset().unwrap();
        }
        alloc.next_color().unwrap();

        alloc.reset();
        assert!(alloc.used_presets().is_empty());
        assert!(alloc.used_colors().is_empty());
        assert!(alloc.next_preset().is_ok());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = ResourceAllocator::seeded(42);
        let mut b = ResourceAllocator::seeded(42);

        for _ in 0..8 {
            assert_eq!(a.next_preset().unwrap(), b.next_preset().unwrap());
            assert_eq!(a.next_color().unwrap(), b.next_color().unwrap());
        }
    }

    #[test]
    fn test_injected_rng() {
        // A zero-step mock always yields the first candidate
        let mut alloc = ResourceAllocator::new(StepRng::new(0, 0));
        assert_eq!(alloc.next_preset().unwrap(), PRESET_NAMES[0]);
        assert_eq!(alloc.next_preset().unwrap(), PRESET_NAMES[1]);
        assert_eq!(alloc.next_color().unwrap(), -63);
        assert_eq!(alloc.next_color().unwrap(), -62);
        assert_eq!(alloc.capacity(), 16);
    }
}
