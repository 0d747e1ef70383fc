//! MIDI to Deluge converter library
//!
//! This library reads Standard MIDI Files and writes their melodic tracks into
//! a Deluge song template, one instrument clip per track.

pub mod convert;
pub mod midi;

// Re-export main types for convenience
pub use convert::{convert_file, midi_to_clips, ConvertOptions, PipelineError, Summary};
pub use midi::{parse_song, read_song, MidiError};

#[cfg(test)]
pub(crate) mod fixtures;
