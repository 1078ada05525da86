use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use wallslice::dimensions::Dimensions;
use wallslice::gravity::Gravity;
use wallslice::multi_error::MultiError;
use wallslice::slicer;
use wallslice::source::HttpDownloader;
use wallslice::tool::MagickTool;

/// Shared flags for commands that acquire source images.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Cache directory for source images; reused across runs to avoid
    /// repeated downloads
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Timeout in seconds for remote downloads (unbounded when omitted)
    #[arg(long)]
    timeout: Option<u64>,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "wallslice")]
#[command(about = "Manipulate images for use as desktop wallpapers")]
#[command(long_about = "\
Manipulate images for use as desktop wallpapers

Given a source image and a WIDTHxHEIGHT target, wallslice produces one crop
per gravity (the eight compass points plus Center) padded or cropped to the
exact target size, plus a few scale-to-cover variants chosen by comparing
the image's aspect ratio to the target's. Outputs land in a directory named
after the target size:

  <destination>/1920x1080/photo_north.jpg
  <destination>/1920x1080/photo_scaled_center.jpg
  ...

Existing outputs are never regenerated, so re-running is cheap and safe.

Sources may be local paths or URLs. Pass --cache to keep downloaded sources
in a durable directory shared across runs; without it each source is staged
through a temporary directory that is removed afterwards.

Requires ImageMagick's `convert` on PATH.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every slice of the given images
    Extract {
        /// Target size as WIDTHxHEIGHT, e.g. 1920x1080
        dimensions: String,
        /// Directory to place the per-size output directory in
        destination_dir: PathBuf,
        /// Source images: local paths or URLs
        #[arg(required = true)]
        images: Vec<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Extract a single slice of the given images
    Pick {
        /// Target size as WIDTHxHEIGHT, e.g. 1920x1080
        dimensions: String,
        /// Directory to place the per-size output directory in
        destination_dir: PathBuf,
        /// Gravity to anchor the crop at, e.g. NorthWest or Center
        gravity: String,
        /// Scale the image to cover the target before cropping
        #[arg(long)]
        scaled: bool,
        /// Source images: local paths or URLs
        #[arg(required = true)]
        images: Vec<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the build version and exit
    Version,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Extract {
            dimensions,
            destination_dir,
            images,
            source,
        } => {
            let desired: Dimensions = dimensions.parse()?;
            let downloader = HttpDownloader::new(source.timeout.map(Duration::from_secs));
            let failures = slicer::extract_batch(
                desired,
                &destination_dir,
                &images,
                source.cache.as_deref(),
                &MagickTool,
                &downloader,
            )?;
            Ok(finish(failures))
        }
        Command::Pick {
            dimensions,
            destination_dir,
            gravity,
            scaled,
            images,
            source,
        } => {
            let desired: Dimensions = dimensions.parse()?;
            let gravity: Gravity = gravity.parse()?;
            let downloader = HttpDownloader::new(source.timeout.map(Duration::from_secs));
            let failures = slicer::pick_batch(
                desired,
                &destination_dir,
                gravity,
                scaled,
                &images,
                source.cache.as_deref(),
                &MagickTool,
                &downloader,
            )?;
            Ok(finish(failures))
        }
        Command::Version => {
            println!("wallslice: {}", version_string());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Exit-code policy: an all-soft composite is a warning, anything else
/// fails the run. Either way the composite is printed once, to stderr.
fn finish(failures: MultiError) -> ExitCode {
    if !failures.exists() {
        return ExitCode::SUCCESS;
    }
    eprintln!("{failures}");
    if failures.is_all_soft() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
