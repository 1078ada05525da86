//! The external raster tool seam.
//!
//! All pixel work is delegated to ImageMagick's `convert` binary; this crate
//! only decides what to invoke it with. The [`ImageTool`] trait is that
//! boundary: one method, one subprocess run. The slicer takes the trait
//! rather than spawning directly so tests can substitute a recording mock
//! without touching process state.

use std::ffi::OsString;
use std::io;
use std::process::Command;
use thiserror::Error;

const MAGICK_BIN: &str = "convert";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("could not run {MAGICK_BIN}: {0}")]
    Spawn(#[from] io::Error),
    /// Non-zero exit. Carries both the combined stdout/stderr text and the
    /// exit status, since either may be the only clue `convert` leaves.
    #[error("{MAGICK_BIN} {status}: {output}")]
    Failed { status: String, output: String },
}

/// Strategy object for one external-tool invocation.
pub trait ImageTool {
    /// Run the tool with the given arguments, blocking until it exits.
    fn run(&self, args: &[OsString]) -> Result<(), ToolError>;
}

/// Production runner: spawns `convert` and captures its combined output.
#[derive(Debug, Default)]
pub struct MagickTool;

impl ImageTool for MagickTool {
    fn run(&self, args: &[OsString]) -> Result<(), ToolError> {
        let output = Command::new(MAGICK_BIN).args(args).output()?;
        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(ToolError::Failed {
            status: output.status.to_string(),
            output: combined.trim_end().to_string(),
        })
    }
}
