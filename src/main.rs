//! `maskcanvas` command line: replay a recorded annotation session.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use maskcanvas::script::{Replay, ReplayOptions, Script, ScriptError};
use maskcanvas::{CanvasConfig, ImageInfo};

/// Replay an annotation session script through the canvas core.
///
/// Prints the resulting prompts, candidates, final mask and zoom state as
/// JSON. Segmentation answers come from the script; persistence is in memory.
#[derive(Parser, Debug)]
#[command(name = "maskcanvas", version)]
struct CliArgs {
    /// Session script (JSON).
    script: PathBuf,

    /// Image whose dimensions replace the script's `image` events.
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Configuration file. Defaults to the platform config directory.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Include the final draw commands of both canvases.
    #[arg(long)]
    frames: bool,

    /// Compact JSON output.
    #[arg(long)]
    compact: bool,

    /// Debug-level logging regardless of the configured level.
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &CliArgs) -> Result<bool, ScriptError> {
    let config = match &args.config {
        Some(path) => CanvasConfig::load_from_path(path)?,
        None => CanvasConfig::load_from_default_path().unwrap_or_default(),
    };

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level.to_level_filter()
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let image = match &args.image {
        Some(path) => {
            let decoded = image::open(path)?;
            let id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            log::info!("Using {} ({}x{})", id, decoded.width(), decoded.height());
            Some(ImageInfo::from_dynamic(id, &decoded))
        }
        None => None,
    };

    let script = Script::load(&args.script)?;
    let options = ReplayOptions {
        image,
        frames: args.frames,
    };
    let report = Replay::new(config, options).run(script);

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");
    Ok(report.errors.is_empty())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
