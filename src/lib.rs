//! Batch conversion of MIDI folders into Deluge songs
//!
//! Wraps the single-file pipeline from `midi-to-deluge` with folder discovery,
//! output naming and per-file error isolation.

pub mod batch;


pub use batch::{discover_midi_files, run_batch, sanitize_filename, BatchMode, BatchReport};
