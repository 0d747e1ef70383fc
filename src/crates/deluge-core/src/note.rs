use serde::{Deserialize, Serialize};

/// A single note as produced by the upstream parser, in source ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_tick: i64,
    pub end_tick: i64,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: u8, start_tick: i64, end_tick: i64, velocity: u8) -> Self {
        NoteEvent {
            pitch,
            start_tick,
            end_tick,
            velocity,
        }
    }

    /// Length of the note in source ticks
    pub fn duration_ticks(&self) -> i64 {
        self.end_tick - self.start_tick
    }
}

/// One instrument's worth of notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: Option<String>,
    pub program: u8,
    pub channel: u8,
    pub is_drum: bool,
    pub notes: Vec<NoteEvent>,
}

impl Track {
    /// A melodic track on channel 1 with no name
    pub fn melodic(notes: Vec<NoteEvent>) -> Self {
        Track {
            notes,
            ..Default::default()
        }
    }

    /// A percussion track on channel 10
    pub fn drums(notes: Vec<NoteEvent>) -> Self {
        Track {
            channel: 9,
            is_drum: true,
            notes,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// A parsed source document: its tick resolution and its tracks in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// Ticks per quarter note of the source
    pub ppq: i64,
    /// Nominal end of the document (latest note end), in source ticks
    pub end_tick: i64,
    pub tracks: Vec<Track>,
}

impl Song {
    /// Build a song, deriving `end_tick` from the latest note end
    pub fn new(ppq: i64, tracks: Vec<Track>) -> Self {
        let end_tick = tracks
            .iter()
            .flat_map(|t| t.notes.iter())
            .map(|n| n.end_tick)
            .max()
            .unwrap_or(0);

        Song {
            ppq,
            end_tick,
            tracks,
        }
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }
}
