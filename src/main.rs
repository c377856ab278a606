mod cli;

use mp4forge::{config, logging, manifest, mux::Muxer};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use mp4forge_media::inspect::{read_video_track, LocatedSample};
use serde::Serialize;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose);

    match cli.command {
        Commands::Encode { input, output } => encode_file(&input, &output),
        Commands::Mux { manifest, output } => mux_file(&manifest, &output, cli.config.as_deref()),
        Commands::Inspect { file, json } => inspect_file(&file, json),
        Commands::Validate { path } => {
            let path = path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mp4forge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn encode_file(input: &Path, output: &Path) -> Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read box description: {:?}", input))?;
    let node = mp4forge_media::boxes::parse_box_str(&json)
        .with_context(|| format!("Invalid box description: {:?}", input))?;
    let bytes = mp4forge_media::serialize(&node)?;
    std::fs::write(output, &bytes).with_context(|| format!("Failed to write {:?}", output))?;
    println!("Wrote {} ({} bytes)", node.box_type(), bytes.len());
    Ok(())
}

fn mux_file(manifest_path: &Path, output: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let track = manifest::load_track(manifest_path)?;
    tracing::info!(
        "Muxing {} samples ({} payload bytes)",
        track.samples.len(),
        track.payload.len()
    );
    Muxer::new(config).mux_to_file(&track, output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    track_id: u32,
    codec: String,
    width: u16,
    height: u16,
    movie_timescale: u32,
    media_timescale: u32,
    media_duration: u64,
    samples: Vec<LocatedSample>,
}

fn inspect_file(file: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let track = read_video_track(&bytes).with_context(|| format!("Failed to read video track of {:?}", file))?;
    let samples = track.resolve_samples()?;

    if json {
        let report = InspectReport {
            track_id: track.track_id,
            codec: track.codec.to_string(),
            width: track.width,
            height: track.height,
            movie_timescale: track.movie_timescale,
            media_timescale: track.media_timescale,
            media_duration: track.media_duration,
            samples,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Track: {} ({} {}x{})", track.track_id, track.codec, track.width, track.height);
    println!(
        "Timescale: movie {}, media {} (duration {})",
        track.movie_timescale, track.media_timescale, track.media_duration
    );
    println!("Samples: {}", samples.len());
    println!("Chunks: {}", track.chunk_offsets.len());
    let sync = samples.iter().filter(|s| s.sample.is_keyframe).count();
    println!("Sync samples: {}", sync);
    println!("stts entries: {}", track.durations.len());
    if !track.composition_offsets.is_empty() {
        println!("ctts entries: {}", track.composition_offsets.len());
    }
    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Configuration is valid");
    println!("  Brands: {} / {}", config.file.major_brand, config.file.compatible_brands.join(","));
    println!("  Movie timescale: {}", config.movie.timescale);
    println!("  Chunk policy: {:?}", config.video.chunk_policy);
    Ok(())
}
