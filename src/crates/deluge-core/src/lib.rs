//! Core types and encoders for building Synthstrom Deluge session documents
//!
//! This crate turns already-parsed note events into the Deluge's song XML:
//! every melodic track becomes one `instrumentClip` whose notes are packed,
//! one lane per pitch, into the hex `noteDataWithLift` format.
//!
//! # Examples
//!
//! ```
//! use deluge_core::{ClipAssembler, NoteEvent, Song, Track};
//!
//! let song = Song::new(96, vec![Track::melodic(vec![
//!     NoteEvent::new(60, 0, 96, 100),
//!     NoteEvent::new(64, 96, 192, 90),
//! ])]);
//!
//! let clips = ClipAssembler::default().assemble(&song).unwrap();
//! assert_eq!(clips.len(), 1);
//! assert_eq!(clips[0].length, 96);
//! ```
//!
//! # Main Components
//!
//! - **TimeRescaler**: maps source ticks onto the Deluge's 48 PPQ grid
//! - **LaneEncoder**: packs one track's notes into per-pitch hex lanes
//! - **ClipAssembler**: turns a whole song into an ordered list of clips
//! - **ResourceAllocator**: hands out unique preset names and color offsets
//! - **DocumentInjector**: clones the template clip once per clip and writes the song

pub mod allocator;
pub mod clip;
pub mod document;
pub mod error;
pub mod lane;
pub mod note;
pub mod rescale;
pub mod scale;


pub use allocator::{ResourceAllocator, COLOR_OFFSETS, PRESET_NAMES};
pub use clip::{Clip, ClipAssembler, NoteRow};
pub use document::DocumentInjector;
pub use error::{ConvertError, Result};
pub use lane::{EncodedTrack, LaneAnomaly, LaneEncoder, NoteRecord};
pub use note::{NoteEvent, Song, Track};
pub use rescale::{TimeRescaler, DEST_PPQ};
pub use scale::{hex_lz32, norm_to_hex, RangeMapper};
