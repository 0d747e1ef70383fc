use std::path::{Path, PathBuf};

use deluge_core::{
    Clip, ClipAssembler, ConvertError, DocumentInjector, ResourceAllocator, DEST_PPQ,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::midi::{read_song, MidiError};

/// Default location of the song template, relative to the working directory
pub const DEFAULT_TEMPLATE: &str = "resources/base.xml";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Midi(#[from] MidiError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("No clip data generated from {}", .0.display())]
    NoClips(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Song template holding one `instrumentClip` under `sessionClips`
    pub template: PathBuf,
    /// Destination tick resolution
    pub dest_ppq: i64,
    /// Seed for preset and color selection; random when unset
    pub seed: Option<u64>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            template: PathBuf::from(DEFAULT_TEMPLATE),
            dest_ppq: DEST_PPQ,
            seed: None,
        }
    }
}

impl ConvertOptions {
    pub fn allocator(&self) -> ResourceAllocator {
        match self.seed {
            Some(seed) => ResourceAllocator::seeded(seed),
            None => ResourceAllocator::from_entropy(),
        }
    }

    pub fn injector(&self) -> DocumentInjector {
        DocumentInjector::new(&self.template)
    }
}

/// What one conversion produced
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub source: PathBuf,
    pub output: PathBuf,
    pub clips: usize,
    pub notes: usize,
}

/// Parse a MIDI file and encode its melodic tracks
pub fn midi_to_clips(midi: &Path, dest_ppq: i64) -> Result<Vec<Clip>, PipelineError> {
    let song = read_song(midi)?;
    let clips = ClipAssembler::new(dest_ppq).assemble(&song)?;

    if clips.is_empty() {
        warn!("No clip data in {}", midi.display());
    }
    Ok(clips)
}

/// Convert one MIDI file into one Deluge song at `output`
pub fn convert_file(
    midi: &Path,
    output: &Path,
    options: &ConvertOptions,
    allocator: &mut ResourceAllocator,
) -> Result<Summary, PipelineError> {
    info!("Starting MIDI to Deluge XML conversion of {}", midi.display());

    let clips = midi_to_clips(midi, options.dest_ppq)?;
    if clips.is_empty() {
        return Err(PipelineError::NoClips(midi.to_path_buf()));
    }

    options.injector().inject(&clips, allocator, output)?;

    Ok(Summary {
        source: midi.to_path_buf(),
        output: output.to_path_buf(),
        clips: clips.len(),
        notes: clips.iter().map(Clip::note_count).sum(),
    })
}
