//! In-memory MIDI files for tests

use midly::num::{u15, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

#[derive(Debug, Clone, Copy)]
pub enum Ev {
    On(u8, u8, u8),
    Off(u8, u8),
    Program(u8, u8),
    Name(&'static str),
}

/// Build an SMF from `(delta, event)` lists, one per track
pub fn smf_bytes(ppq: u16, tracks: &[Vec<(u32, Ev)>]) -> Vec<u8> {
    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(ppq))));

    for events in tracks {
        let mut track: Vec<TrackEvent<'static>> = events
            .iter()
            .map(|&(delta, ev)| TrackEvent {
                delta: u28::new(delta),
                kind: match ev {
                    Ev::On(ch, key, vel) => TrackEventKind::Midi {
                        channel: u4::new(ch),
                        message: MidiMessage::NoteOn { key: u7::new(key), vel: u7::new(vel) },
                    },
                    Ev::Off(ch, key) => TrackEventKind::Midi {
                        channel: u4::new(ch),
                        message: MidiMessage::NoteOff { key: u7::new(key), vel: u7::new(64) },
                    },
                    Ev::Program(ch, program) => TrackEventKind::Midi {
                        channel: u4::new(ch),
                        message: MidiMessage::ProgramChange { program: u7::new(program) },
                    },
                    Ev::Name(name) => TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
                },
            })
            .collect();

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    let mut buf = Vec::new();
    smf.write_std(&mut buf).unwrap();
    buf
}
