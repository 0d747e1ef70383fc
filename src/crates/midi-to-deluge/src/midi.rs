use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use deluge_core::{NoteEvent, Song, Track};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::{debug, info};

/// General MIDI percussion channel (channel 10)
pub const DRUM_CHANNEL: u8 = 9;

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("Failed to read MIDI file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse MIDI file: {0}")]
    Parse(#[from] midly::Error),

    #[error("Timecode-based MIDI timing is not supported")]
    UnsupportedTiming,
}

/// Read and parse a MIDI file
pub fn read_song(path: &Path) -> Result<Song, MidiError> {
    let data = std::fs::read(path).map_err(|source| MidiError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let song = parse_song(&data)?;
    info!("Loaded MIDI file: {}", path.display());
    Ok(song)
}

/// Parse MIDI bytes into tracks of absolute-tick notes.
///
/// Each (track, channel) pair with notes becomes one [`Track`]; channel 10 is
/// flagged as percussion.
pub fn parse_song(data: &[u8]) -> Result<Song, MidiError> {
    let smf = Smf::parse(data)?;

    let ppq = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int() as i64,
        Timing::Timecode(..) => return Err(MidiError::UnsupportedTiming),
    };

    let mut tracks = Vec::new();
    for (track_idx, track) in smf.tracks.iter().enumerate() {
        tracks.extend(collect_track(track_idx, track));
    }

    let song = Song::new(ppq, tracks);
    debug!(
        ppq,
        tracks = song.tracks.len(),
        notes = song.note_count(),
        end_tick = song.end_tick,
        "Parsed MIDI"
    );
    Ok(song)
}

#[derive(Default)]
struct ChannelNotes {
    program: u8,
    notes: Vec<NoteEvent>,
}

fn collect_track(track_idx: usize, events: &[midly::TrackEvent]) -> Vec<Track> {
    let mut tick: i64 = 0;
    let mut name: Option<String> = None;
    let mut programs = [0u8; 16];
    let mut channels: BTreeMap<u8, ChannelNotes> = BTreeMap::new();
    // Open notes per (channel, key): start tick and velocity, oldest first
    let mut open: HashMap<(u8, u8), VecDeque<(i64, u8)>> = HashMap::new();

    for event in events {
        tick += event.delta.as_int() as i64;

        match event.kind {
            TrackEventKind::Midi { channel, message } => {
                let ch = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        // The program sounding at a channel's first note is the one it keeps
                        channels.entry(ch).or_insert_with(|| ChannelNotes {
                            program: programs[ch as usize],
                            notes: Vec::new(),
                        });
                        open
                            .entry((ch, key.as_int()))
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    // NoteOn with zero velocity is a note off
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let Some((start, velocity)) =
                            open.get_mut(&(ch, key.as_int())).and_then(VecDeque::pop_front)
                        else {
                            continue;
                        };
                        push_note(&mut channels, ch, key.as_int(), start, tick, velocity);
                    }
                    MidiMessage::ProgramChange { program } => {
                        programs[ch as usize] = program.as_int();
                    }
                    _ => {}
                }
            }
            TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                if let Ok(name_str) = std::str::from_utf8(raw) {
                    let cleaned = name_str.trim_end_matches('\0').trim();
                    if !cleaned.is_empty() {
                        name = Some(cleaned.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    // Anything still sounding ends with the track
    let mut dangling: Vec<_> = open.into_iter().collect();
    dangling.sort_by_key(|(key, _)| *key);
    for ((ch, key), starts) in dangling {
        for (start, velocity) in starts {
            push_note(&mut channels, ch, key, start, tick, velocity);
        }
    }

    channels
        .into_iter()
        .filter(|(_, c)| !c.notes.is_empty())
        .map(|(channel, mut c)| {
            c.notes.sort_by_key(|n| (n.start_tick, n.pitch));
            debug!(track = track_idx, channel, notes = c.notes.len(), "Collected track");
            Track {
                name: name.clone(),
                program: c.program,
                channel,
                is_drum: channel == DRUM_CHANNEL,
                notes: c.notes,
            }
        })
        .collect()
}

fn push_note(
    channels: &mut BTreeMap<u8, ChannelNotes>,
    channel: u8,
    key: u8,
    start: i64,
    end: i64,
    velocity: u8,
) {
    if end <= start {
        debug!(channel, key, start, "Dropping zero-length note");
        return;
    }

    channels
        .entry(channel)
        .or_default()
        .notes
        .push(NoteEvent::new(key, start, end, velocity));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{smf_bytes, Ev};

    #[test]
    fn test_parse_single_note() {
        let data = smf_bytes(220, &[vec![(0, Ev::On(0, 60, 100)), (220, Ev::Off(0, 60))]]);
        let song = parse_song(&data).unwrap();

        assert_eq!(song.ppq, 220);
        assert_eq!(song.end_tick, 220);
        assert_eq!(song.tracks.len(), 1);
        assert_eq!(song.tracks[0].notes, vec![NoteEvent::new(60, 0, 220, 100)]);
        assert!(!song.tracks[0].is_drum);
    }

    #[test]
    fn test_zero_velocity_note_on_closes() {
        let data = smf_bytes(96, &[vec![(10, Ev::On(0, 64, 80)), (86, Ev::On(0, 64, 0))]]);
        let song = parse_song(&data).unwrap();
        assert_eq!(song.tracks[0].notes, vec![NoteEvent::new(64, 10, 96, 80)]);
    }

    #[test]
    fn test_overlapping_same_key_closes_oldest_first() {
        let data = smf_bytes(
            96,
            &[vec![
                (0, Ev::On(0, 60, 90)),
                (50, Ev::On(0, 60, 70)),
                (50, Ev::Off(0, 60)),
                (50, Ev::Off(0, 60)),
            ]],
        );
        let song = parse_song(&data).unwrap();
        assert_eq!(
            song.tracks[0].notes,
            vec![NoteEvent::new(60, 0, 100, 90), NoteEvent::new(60, 50, 150, 70)]
        );
    }

    #[test]
    fn test_channels_split_and_drums_flagged() {
        let data = smf_bytes(
            480,
            &[vec![
                (0, Ev::Name("Band\0")),
                (0, Ev::Program(1, 33)),
                (0, Ev::On(1, 40, 100)),
                (0, Ev::On(9, 36, 110)),
                (240, Ev::Off(9, 36)),
                (240, Ev::Off(1, 40)),
            ]],
        );
        let song = parse_song(&data).unwrap();

        assert_eq!(song.tracks.len(), 2);
        assert_eq!(song.tracks[0].channel, 1);
        assert_eq!(song.tracks[0].program, 33);
        assert_eq!(song.tracks[0].name.as_deref(), Some("Band"));
        assert!(!song.tracks[0].is_drum);
        assert!(song.tracks[1].is_drum);
    }

    #[test]
    fn test_dangling_note_closed_at_track_end() {
        let data = smf_bytes(96, &[vec![(0, Ev::On(0, 60, 100)), (96, Ev::Program(0, 5))]]);
        let song = parse_song(&data).unwrap();
        assert_eq!(song.tracks[0].notes, vec![NoteEvent::new(60, 0, 96, 100)]);
    }

    #[test]
    fn test_program_taken_at_first_note_on() {
        let data = smf_bytes(
            96,
            &[vec![
                (0, Ev::On(0, 60, 100)),
                (10, Ev::Program(0, 5)),
                (10, Ev::Off(0, 60)),
                (0, Ev::On(0, 62, 100)),
                (48, Ev::Off(0, 62)),
            ]],
        );
        let song = parse_song(&data).unwrap();
        assert_eq!(song.tracks[0].program, 0);
        assert_eq!(song.tracks[0].notes.len(), 2);
    }

    #[test]
    fn test_program_of_dangling_first_note() {
        let data = smf_bytes(
            96,
            &[vec![
                (0, Ev::Program(3, 12)),
                (0, Ev::On(3, 60, 100)),
                (48, Ev::Program(3, 80)),
            ]],
        );
        let song = parse_song(&data).unwrap();
        assert_eq!(song.tracks[0].program, 12);
        assert_eq!(song.tracks[0].notes, vec![NoteEvent::new(60, 0, 48, 100)]);
    }

    #[test]
    fn test_tracks_without_notes_dropped() {
        let data = smf_bytes(
            96,
            &[
                vec![(0, Ev::Name("Conductor"))],
                vec![(0, Ev::On(0, 60, 100)), (48, Ev::Off(0, 60))],
                vec![(0, Ev::On(2, 62, 100)), (0, Ev::Off(2, 62))],
            ],
        );
        let song = parse_song(&data).unwrap();
        assert_eq!(song.tracks.len(), 1);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(parse_song(b"not a midi file"), Err(MidiError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_song(Path::new("no/such/file.mid")),
            Err(MidiError::Io { .. })
        ));
    }
}
