use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::ValueEnum;
use deluge_core::Clip;
use midi_to_deluge::{convert_file, midi_to_clips, ConvertOptions, PipelineError};
use regex::Regex;
use tracing::{error, info, warn};

/// How a folder of MIDI files maps onto output songs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchMode {
    /// Every file's clips go into one song
    Combined,
    /// One song per MIDI file
    Separate,
}

/// Outcome of one batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub converted: usize,
    /// Files that parsed but held no melodic notes
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    fn skip(&mut self, path: &Path) {
        warn!("No clip data in '{}', skipping.", path.display());
        self.skipped.push(path.to_path_buf());
    }

    fn fail(&mut self, path: &Path, err: impl std::fmt::Display) {
        error!("Failed to convert '{}'. Error: {}", path.display(), err);
        self.failed.push((path.to_path_buf(), err.to_string()));
    }
}

/// Replace characters that are invalid in filenames with `_`
pub fn sanitize_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let re = INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid pattern"));
    re.replace_all(name, "_").into_owned()
}

/// MIDI files directly inside `dir`, sorted by name
pub fn discover_midi_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input folder {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_midi = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"));

        if is_midi && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Convert every MIDI file in `input` into songs under `output_dir`.
///
/// A file that fails is recorded in the report and skipped.
pub fn run_batch(
    input: &Path,
    output_dir: &Path,
    mode: BatchMode,
    options: &ConvertOptions,
) -> Result<BatchReport> {
    let files = discover_midi_files(input)?;
    if files.is_empty() {
        anyhow::bail!("No MIDI files found in '{}'", input.display());
    }
    info!("Found {} MIDI file(s) to convert.", files.len());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output folder {}", output_dir.display()))?;

    match mode {
        BatchMode::Combined => run_combined(&files, output_dir, options),
        BatchMode::Separate => Ok(run_separate(&files, output_dir, options)),
    }
}

fn run_combined(
    files: &[PathBuf],
    output_dir: &Path,
    options: &ConvertOptions,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut all_clips: Vec<Clip> = Vec::new();
    let mut first_stem: Option<String> = None;

    for file in files {
        match midi_to_clips(file, options.dest_ppq) {
            Ok(clips) if clips.is_empty() => report.skip(file),
            Ok(clips) => {
                info!("Converted '{}' to {} clip(s).", file.display(), clips.len());
                all_clips.extend(clips);
                report.converted += 1;
                if first_stem.is_none() {
                    first_stem = file
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .map(sanitize_filename);
                }
            }
            Err(e) => report.fail(file, e),
        }
    }

    info!("Total clip data collected: {} clips.", all_clips.len());
    if all_clips.is_empty() {
        anyhow::bail!("No clip data generated from MIDI files. Aborting XML injection.");
    }

    let name = match first_stem {
        Some(stem) => format!("{}_combined.xml", stem),
        None => "combined_deluge_song.xml".to_string(),
    };
    let output = output_dir.join(name);

    let mut allocator = options.allocator();
    options
        .injector()
        .inject(&all_clips, &mut allocator, &output)
        .with_context(|| format!("Failed to write combined song {}", output.display()))?;

    info!("Combined Deluge XML saved to: {}", output.display());
    report.written.push(output);
    Ok(report)
}

fn run_separate(files: &[PathBuf], output_dir: &Path, options: &ConvertOptions) -> BatchReport {
    let mut report = BatchReport::default();
    let mut allocator = options.allocator();

    for file in files {
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
        let output = output_dir.join(format!("{}.xml", sanitize_filename(stem)));

        match convert_file(file, &output, options, &mut allocator) {
            Ok(summary) => {
                info!(
                    "Deluge XML for '{}' saved to: {} ({} clips)",
                    stem,
                    summary.output.display(),
                    summary.clips
                );
                report.converted += 1;
                report.written.push(summary.output);
            }
            Err(PipelineError::NoClips(_)) => report.skip(file),
            Err(e) => report.fail(file, e),
        }
    }

    report
}
