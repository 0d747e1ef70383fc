//! Per-pitch lane encoding
//!
//! The Deluge stores a clip's notes as one `noteRow` per pitch. Each row holds
//! a `noteDataWithLift` string: `0x` followed by one 11-byte record per note.
//!
//! | bytes | field                          |
//! |-------|--------------------------------|
//! | 4     | start, destination ticks       |
//! | 4     | duration, destination ticks    |
//! | 1     | velocity (0-127)               |
//! | 1     | lift (fixed `0x40`)            |
//! | 1     | controller (fixed `0x14`)      |

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::clip::NoteRow;
use crate::note::NoteEvent;
use crate::rescale::TimeRescaler;
use crate::scale::hex_lz32;

/// Fixed lift byte written into every record
pub const LIFT: u8 = 0x40;

/// Fixed controller byte written into every record
pub const CC: u8 = 0x14;

/// Prefix of every encoded lane
pub const LANE_PREFIX: &str = "0x";

/// Hex characters per encoded note
pub const RECORD_HEX_LEN: usize = 22;

/// One note on the destination grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRecord {
    pub start: i64,
    pub duration: i64,
    pub velocity: u8,
}

impl NoteRecord {
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }

    /// Encode as 22 uppercase hex characters
    pub fn encode(&self) -> String {
        format!(
            "{}{}{:02X}{:02X}{:02X}",
            hex_lz32(self.start),
            hex_lz32(self.duration),
            self.velocity.min(127),
            LIFT,
            CC
        )
    }

    /// Parse one 22-character record back into destination ticks
    pub fn decode(hex: &str) -> Option<Self> {
        let is_hex = hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'));
        if hex.len() != RECORD_HEX_LEN || !is_hex {
            return None;
        }

        let word = |range: std::ops::Range<usize>| u32::from_str_radix(&hex[range], 16).ok();
        Some(NoteRecord {
            start: word(0..8)? as i32 as i64,
            duration: word(8..16)? as i32 as i64,
            velocity: u8::from_str_radix(&hex[16..18], 16).ok()?,
        })
    }
}

/// A timing irregularity found while walking a lane. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaneAnomaly {
    /// A note starts at or before the previous note's start
    OutOfOrder { pitch: u8, start_tick: i64, last_start: i64 },
    /// A note starts before the previous note on the same pitch has ended
    Overlap { pitch: u8, start_tick: i64, last_end: i64 },
}

impl fmt::Display for LaneAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneAnomaly::OutOfOrder { pitch, start_tick, last_start } => {
                write!(f, "out of order note on pitch {}: {} <= {}", pitch, start_tick, last_start)
            }
            LaneAnomaly::Overlap { pitch, start_tick, last_end } => {
                write!(f, "overlapping note on pitch {}: {} < {}", pitch, start_tick, last_end)
            }
        }
    }
}

/// Result of encoding one track
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTrack {
    /// One row per pitch, ascending
    pub rows: Vec<NoteRow>,
    /// Clip length in destination ticks
    pub length: i64,
    pub anomalies: Vec<LaneAnomaly>,
}

/// Packs a track's notes into per-pitch lanes
#[derive(Debug, Clone, Copy)]
pub struct LaneEncoder {
    rescaler: TimeRescaler,
    track_index: usize,
}

impl LaneEncoder {
    pub fn new(rescaler: TimeRescaler) -> Self {
        LaneEncoder {
            rescaler,
            track_index: 0,
        }
    }

    /// Tag log output with the source track number
    pub fn for_track(self, track_index: usize) -> Self {
        LaneEncoder {
            track_index,
            ..self
        }
    }

    /// Encode `notes` into lanes. Returns `None` when there is nothing to encode.
    pub fn encode(&self, notes: &[NoteEvent]) -> Option<EncodedTrack> {
        let Some(max_end) = notes.iter().map(|n| n.end_tick).max() else {
            warn!(track = self.track_index, "No notes found in track, skipping");
            return None;
        };

        // Same time base as the record starts
        let mut length = self.rescaler.to_dest_offset(max_end);

        // BTreeMap keeps lanes in ascending pitch order
        let mut lanes: BTreeMap<u8, Vec<NoteEvent>> = BTreeMap::new();
        for note in notes {
            lanes.entry(note.pitch).or_default().push(*note);
        }

        let mut rows = Vec::with_capacity(lanes.len());
        let mut anomalies = Vec::new();

        for (pitch, mut lane) in lanes {
            lane.sort_by_key(|n| n.start_tick);

            let mut data = String::with_capacity(LANE_PREFIX.len() + lane.len() * RECORD_HEX_LEN);
            data.push_str(LANE_PREFIX);

            let mut last_start = i64::MIN;
            let mut last_end = i64::MIN;

            for note in &lane {
                let start_tick = note.start_tick;
                let duration_ticks = note.duration_ticks();

                if start_tick <= last_start {
                    anomalies.push(LaneAnomaly::OutOfOrder { pitch, start_tick, last_start });
                }
                if start_tick < last_end {
                    anomalies.push(LaneAnomaly::Overlap { pitch, start_tick, last_end });
                }

                last_start = start_tick;
                last_end = start_tick + duration_ticks;

                // Duration is rescaled as a tick count, not as the difference of two endpoints
                let record = NoteRecord {
                    start: self.rescaler.to_dest_offset(start_tick),
                    duration: self.rescaler.to_dest(duration_ticks),
                    velocity: note.velocity.min(127),
                };

                length = length.max(record.end());
                data.push_str(&record.encode());
            }

            rows.push(NoteRow::new(pitch, data));
        }

        for anomaly in &anomalies {
            warn!(track = self.track_index, "{}", anomaly);
        }

        debug!(
            track = self.track_index,
            pitches = ?rows.iter().map(|r| r.pitch).collect::<Vec<_>>(),
            "Encoded lanes"
        );

        Some(EncodedTrack {
            rows,
            length,
            anomalies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoder(source_ppq: i64) -> LaneEncoder {
        LaneEncoder::new(TimeRescaler::to_deluge(source_ppq).unwrap())
    }

    #[test]
    fn test_quarter_note_record() {
        let track = encoder(220)
            .encode(&[NoteEvent::new(60, 0, 220, 100)])
            .unwrap();

        assert_eq!(track.rows.len(), 1);
        assert_eq!(track.rows[0].pitch, 60);
        assert_eq!(track.rows[0].note_data, "0x0000000000000030644014");
        assert_eq!(track.length, 48);
        assert!(track.anomalies.is_empty());
    }

    #[test]
    fn test_overlap_is_encoded_and_reported() {
        let track = encoder(96)
            .encode(&[NoteEvent::new(60, 0, 100, 90), NoteEvent::new(60, 50, 150, 90)])
            .unwrap();

        let data = &track.rows[0].note_data;
        assert_eq!(data.len(), LANE_PREFIX.len() + 2 * RECORD_HEX_LEN);
        assert_eq!(
            track.anomalies,
            vec![LaneAnomaly::Overlap { pitch: 60, start_tick: 50, last_end: 100 }]
        );
        // 50 * 48 / 96 = 25, 100 * 48 / 96 = 50
        assert_eq!(&data[24..], "00000019000000325A4014");
        assert_eq!(track.length, 75);
    }

    #[test]
    fn test_same_start_is_out_of_order() {
        let track = encoder(48)
            .encode(&[NoteEvent::new(62, 10, 20, 64), NoteEvent::new(62, 10, 30, 64)])
            .unwrap();

        assert!(track.anomalies.contains(&LaneAnomaly::OutOfOrder {
            pitch: 62,
            start_tick: 10,
            last_start: 10
        }));
        assert!(track.anomalies.contains(&LaneAnomaly::Overlap {
            pitch: 62,
            start_tick: 10,
            last_end: 20
        }));
    }

    #[test]
    fn test_lanes_sorted_within_and_across() {
        let track = encoder(48)
            .encode(&[
                NoteEvent::new(72, 96, 120, 100),
                NoteEvent::new(48, 0, 24, 100),
                NoteEvent::new(72, 0, 24, 100),
            ])
            .unwrap();

        let pitches: Vec<u8> = track.rows.iter().map(|r| r.pitch).collect();
        assert_eq!(pitches, vec![48, 72]);

        let starts: Vec<i64> = track.rows[1].records().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 96]);
        assert!(track.anomalies.is_empty());
    }

    #[test]
    fn test_velocity_capped() {
        let track = encoder(48).encode(&[NoteEvent::new(60, 0, 48, 200)]).unwrap();
        assert_eq!(track.rows[0].records()[0].velocity, 127);
    }

    #[test]
    fn test_length_grows_with_rounded_records() {
        // start 1 -> 0 (tie to even), duration 3 -> 2, end tick 4 -> 2
        let track = encoder(96).encode(&[NoteEvent::new(60, 1, 4, 100)]).unwrap();
        assert_eq!(track.length, 2);

        // start 3 -> 2, duration 3 -> 2, record end 4 > to_dest(6) = 3
        let track = encoder(96).encode(&[NoteEvent::new(60, 3, 6, 100)]).unwrap();
        assert_eq!(track.length, 4);
    }

    #[test]
    fn test_length_follows_tick_offset() {
        let rescaler = TimeRescaler::new(480, 48).unwrap().with_offset(960);
        let track = LaneEncoder::new(rescaler)
            .encode(&[NoteEvent::new(60, 960, 1440, 100)])
            .unwrap();

        let records = track.rows[0].records();
        assert_eq!(records, vec![NoteRecord { start: 0, duration: 48, velocity: 100 }]);
        assert_eq!(track.length, 48);
    }

    #[test]
    fn test_empty_track() {
        assert!(encoder(96).encode(&[]).is_none());
    }

    #[test]
    fn test_record_decode() {
        let record = NoteRecord { start: 384, duration: 24, velocity: 100 };
        assert_eq!(NoteRecord::decode(&record.encode()), Some(record));
        assert_eq!(NoteRecord::decode("00000000000000306440"), None);
        assert_eq!(NoteRecord::decode("0000000000000030644o14"), None);
    }

    fn note_strategy() -> impl Strategy<Value = NoteEvent> {
        (0u8..=127, 0i64..100_000, 0i64..10_000, 0u8..=255)
            .prop_map(|(pitch, start, len, vel)| NoteEvent::new(pitch, start, start + len, vel))
    }

    proptest! {
        #[test]
        fn records_are_fixed_width_uppercase_hex(
            notes in prop::collection::vec(note_strategy(), 1..64),
            ppq in prop::sample::select(vec![24i64, 96, 220, 384, 480, 960]),
        ) {
            let track = encoder(ppq).encode(&notes).unwrap();
            for row in &track.rows {
                let body = row.note_data.strip_prefix(LANE_PREFIX).unwrap();
                prop_assert_eq!(body.len() % RECORD_HEX_LEN, 0);
                prop_assert!(body.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F')));
            }
        }

        #[test]
        fn length_covers_every_record(
            notes in prop::collection::vec(note_strategy(), 1..64),
            ppq in prop::sample::select(vec![24i64, 96, 220, 384, 480, 960]),
        ) {
            let track = encoder(ppq).encode(&notes).unwrap();
            for row in &track.rows {
                for record in row.records() {
                    prop_assert!(track.length >= record.end());
                }
            }
        }

        #[test]
        fn rows_strictly_ascending_and_complete(
            notes in prop::collection::vec(note_strategy(), 1..64),
        ) {
            let track = encoder(480).encode(&notes).unwrap();
            prop_assert!(track.rows.windows(2).all(|w| w[0].pitch < w[1].pitch));

            let encoded: usize = track.rows.iter().map(|r| r.records().len()).sum();
            prop_assert_eq!(encoded, notes.len());
        }
    }
}
