use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::lane::{LaneEncoder, NoteRecord, LANE_PREFIX, RECORD_HEX_LEN};
use crate::note::Song;
use crate::rescale::{TimeRescaler, DEST_PPQ};

/// One pitch lane of a clip, ready for the `noteRow` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRow {
    #[serde(rename = "y")]
    pub pitch: u8,
    #[serde(rename = "noteDataWithLift")]
    pub note_data: String,
}

impl NoteRow {
    pub fn new(pitch: u8, note_data: String) -> Self {
        NoteRow { pitch, note_data }
    }

    /// Decode the lane back into records; malformed trailing data is ignored
    pub fn records(&self) -> Vec<NoteRecord> {
        let body = self.note_data.strip_prefix(LANE_PREFIX).unwrap_or("");
        body.as_bytes()
            .chunks(RECORD_HEX_LEN)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .filter_map(NoteRecord::decode)
            .collect()
    }
}

/// One track's worth of encoded lanes, destined for one `instrumentClip`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clip {
    pub note_rows: Vec<NoteRow>,
    /// Length in destination ticks
    pub length: i64,
}

impl Clip {
    pub fn new(note_rows: Vec<NoteRow>, length: i64) -> Self {
        Clip { note_rows, length }
    }

    /// Check the invariants the injector relies on
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.length < 0 {
            return Err(format!("negative length {}", self.length));
        }

        let mut last_pitch: Option<u8> = None;
        for row in &self.note_rows {
            if row.pitch > 127 {
                return Err(format!("pitch {} out of range", row.pitch));
            }
            if last_pitch.is_some_and(|p| p >= row.pitch) {
                return Err(format!("note rows not strictly ascending at pitch {}", row.pitch));
            }
            last_pitch = Some(row.pitch);

            let body = row.note_data.strip_prefix(LANE_PREFIX).ok_or_else(|| {
                format!("lane for pitch {} lacks the {} prefix", row.pitch, LANE_PREFIX)
            })?;

            if body.len() % RECORD_HEX_LEN != 0 {
                return Err(format!("lane for pitch {} has a partial record", row.pitch));
            }

            let records = row.records();
            if records.len() * RECORD_HEX_LEN != body.len() {
                return Err(format!("lane for pitch {} has non-hex data", row.pitch));
            }

            if let Some(end) = records.iter().map(NoteRecord::end).max() {
                if end > self.length {
                    return Err(format!(
                        "note on pitch {} ends at {} past clip length {}",
                        row.pitch, end, self.length
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn note_count(&self) -> usize {
        self.note_rows.iter().map(|r| r.records().len()).sum()
    }
}

/// Turns a parsed song into clips, one per melodic track with notes
#[derive(Debug, Clone, Copy)]
pub struct ClipAssembler {
    dest_ppq: i64,
}

impl Default for ClipAssembler {
    fn default() -> Self {
        ClipAssembler { dest_ppq: DEST_PPQ }
    }
}

impl ClipAssembler {
    pub fn new(dest_ppq: i64) -> Self {
        ClipAssembler { dest_ppq }
    }

    /// Build clips in source track order. Drum tracks and empty tracks are skipped.
    pub fn assemble(&self, song: &Song) -> Result<Vec<Clip>> {
        let rescaler = TimeRescaler::new(song.ppq, self.dest_ppq)?;
        let mut clips = Vec::new();

        for (idx, track) in song.tracks.iter().enumerate() {
            let track_num = idx + 1;

            if track.is_drum {
                info!("Skipping drum track {}.", track_num);
                continue;
            }

            info!("Processing track {}: program {}", track_num, track.program);

            let encoder = LaneEncoder::new(rescaler).for_track(track_num);
            let Some(encoded) = encoder.encode(&track.notes) else {
                continue;
            };

            info!("Processed track {}: Length={} ticks", track_num, encoded.length);
            clips.push(Clip::new(encoded.rows, encoded.length));
        }

        Ok(clips)
    }
}
