use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use deluge_core::ClipAssembler;
use midi_to_deluge::convert::DEFAULT_TEMPLATE;
use midi_to_deluge::{convert_file, read_song, ConvertOptions};

#[derive(Parser, Debug)]
#[command(name = "midi-to-deluge")]
#[command(about = "Convert MIDI files to Synthstrom Deluge songs", long_about = None)]
struct Args {
    /// Path to the MIDI file (default: uses first .mid file in current directory)
    #[arg(short, long)]
    midi: Option<PathBuf>,

    /// Output file path (default: `<midi-name>.xml`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Song template containing one instrumentClip under sessionClips
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Seed for preset and color selection
    #[arg(long)]
    seed: Option<u64>,

    /// Print the encoded clips as JSON instead of writing a song
    #[arg(long)]
    json: bool,

    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet);

    // Find MIDI file
    let midi_path = if let Some(path) = args.midi {
        if !path.exists() {
            anyhow::bail!("MIDI file not found: {}", path.display());
        }
        path
    } else {
        find_first_midi_file()?
    };

    let options = ConvertOptions {
        template: args.template,
        seed: args.seed,
        ..Default::default()
    };

    if args.json {
        let song = read_song(&midi_path)?;
        let clips = ClipAssembler::new(options.dest_ppq).assemble(&song)?;
        println!("{}", serde_json::to_string_pretty(&clips)?);
        return Ok(());
    }

    // Determine output path (use .xml extension)
    let output_path = if let Some(path) = args.output {
        path
    } else {
        let stem = midi_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        PathBuf::from(format!("{}.xml", stem))
    };

    let mut allocator = options.allocator();
    let summary = convert_file(&midi_path, &output_path, &options, &mut allocator)
        .with_context(|| format!("Failed to convert {}", midi_path.display()))?;

    tracing::info!(
        "Successfully created Deluge XML: {} ({} clips, {} notes)",
        summary.output.display(),
        summary.clips,
        summary.notes
    );

    Ok(())
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".").context("Failed to read current directory")?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) == Some("mid") {
            return Ok(path);
        }
    }

    anyhow::bail!("No MIDI files found in current directory")
}
