use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use deluge_converter::{run_batch, BatchMode};
use midi_to_deluge::convert::DEFAULT_TEMPLATE;
use midi_to_deluge::ConvertOptions;

#[derive(Parser, Debug)]
#[command(name = "deluge-batch")]
#[command(about = "Convert a folder of MIDI files to Synthstrom Deluge songs", long_about = None)]
struct Args {
    /// Folder containing .mid files
    #[arg(short, long, default_value = "data/input_midi")]
    input: PathBuf,

    /// Folder the songs are written to (created if missing)
    #[arg(short, long, default_value = "data/deluge_songs")]
    output_dir: PathBuf,

    /// Song template containing one instrumentClip under sessionClips
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Put every file into one song, or write one song per file
    #[arg(short, long, value_enum, default_value_t = BatchMode::Combined)]
    mode: BatchMode,

    /// Seed for preset and color selection
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let options = ConvertOptions {
        template: args.template,
        seed: args.seed,
        ..Default::default()
    };

    let report = run_batch(&args.input, &args.output_dir, args.mode, &options)?;

    tracing::info!(
        "Converted {} file(s), {} without clips, {} failed, {} song(s) written",
        report.converted,
        report.skipped.len(),
        report.failed.len(),
        report.written.len()
    );
    for (path, reason) in &report.failed {
        tracing::warn!("Skipped {}: {}", path.display(), reason);
    }

    Ok(())
}
