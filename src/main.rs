use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chromatix_interp_rs::iq_interpolation::{
    ChromatixBundle, FrameSequence, FrameSynthesizer, Outcome, SynthesisConfig,
};
use chromatix_interp_rs::logger;
use clap::{Parser, ValueHint};

use tracing::{error, info, warn};

/// Replays a frame sequence through every block of a chromatix bundle.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Chromatix bundle (TOML) with one table per block
    #[arg(value_hint = ValueHint::FilePath)]
    chromatix: PathBuf,

    /// Frame trigger sequence (TOML, `[[frames]]` tables)
    #[arg(value_hint = ValueHint::FilePath)]
    frames: PathBuf,

    /// Rebuild every block on every frame, even when its triggers did not move
    #[arg(long)]
    no_dirty_check: bool,
}

fn run(chromatix_path: &Path, frames_path: &Path, dirty_check: bool) -> Result<bool> {
    let bundle = ChromatixBundle::from_toml_file(chromatix_path)
        .with_context(|| format!("loading chromatix from {}", chromatix_path.display()))?;
    let sequence = FrameSequence::from_toml_file(frames_path)
        .with_context(|| format!("loading frames from {}", frames_path.display()))?;

    let config = SynthesisConfig::builder().dirty_check(dirty_check).build();
    let mut synthesizer =
        FrameSynthesizer::from_bundle(bundle, config).context("registering blocks")?;
    info!(
        blocks = ?synthesizer.blocks().collect::<Vec<_>>(),
        frames = sequence.frames.len(),
        dirty_check,
        "Frame synthesizer ready"
    );

    let mut all_succeeded = true;
    for (index, frame) in sequence.frames.iter().enumerate() {
        frame.dump();
        let (report, timings) = synthesizer.synthesize_with_timings(frame);
        for (block, outcome) in report.iter() {
            match outcome {
                Ok(Outcome::Computed) => info!(frame = index, %block, "Computed"),
                Ok(Outcome::Reused) => info!(frame = index, %block, "Reused previous record"),
                Ok(Outcome::Disabled) => info!(frame = index, %block, "Disabled"),
                Err(e) => {
                    all_succeeded = false;
                    error!(frame = index, %block, "Synthesis failed: {}", e);
                }
            }
        }
        if !timings.is_empty() {
            timings.print_summary();
        }
    }

    for block in synthesizer.blocks() {
        if let Some(stats) = synthesizer.stats(block) {
            info!(
                %block,
                computed = stats.computed,
                reused = stats.reused,
                disabled = stats.disabled,
                failed = stats.failed,
                "Block summary"
            );
        }
    }

    Ok(all_succeeded)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logger::init();

    info!("Starting chromatix interpolation...");
    if run(&cli.chromatix, &cli.frames, !cli.no_dirty_check)? {
        info!("All frames synthesized");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Some blocks failed; previous records were kept where available");
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_paths_and_flag() {
        let cli = Cli::try_parse_from([
            "chromatix_interp_rs",
            "bundle.toml",
            "frames.toml",
            "--no-dirty-check",
        ])
        .unwrap();
        assert_eq!(cli.chromatix, PathBuf::from("bundle.toml"));
        assert_eq!(cli.frames, PathBuf::from("frames.toml"));
        assert!(cli.no_dirty_check);

        let cli =
            Cli::try_parse_from(["chromatix_interp_rs", "bundle.toml", "frames.toml"]).unwrap();
        assert!(!cli.no_dirty_check);
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        let err = Cli::try_parse_from([
            "chromatix_interp_rs",
            "bundle.toml",
            "frames.toml",
            "--no-dirty-chek",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_requires_both_paths() {
        let err = Cli::try_parse_from(["chromatix_interp_rs", "bundle.toml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
