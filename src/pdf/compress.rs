//! Optional whole-file recompression through an external tool

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use crate::error::{Error, Result};

/// Rewrites a PDF at `input` into a smaller PDF at `output`
///
/// The pipeline treats any error as "compression unavailable" and keeps the
/// uncompressed file, so implementations need not clean up after themselves.
pub trait Compressor {
    fn compress(&self, input: &Path, output: &Path) -> Result<()>;
}

impl<F> Compressor for F
where
    F: Fn(&Path, &Path) -> Result<()>,
{
    fn compress(&self, input: &Path, output: &Path) -> Result<()> {
        self(input, output)
    }
}

/// Ghostscript `pdfwrite` with the prepress preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ghostscript {
    /// Executable to run, looked up on `PATH` when not absolute
    pub program: PathBuf,
}

impl Default for Ghostscript {
    fn default() -> Self {
        Self::new("gs")
    }
}

impl Ghostscript {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Command-line arguments for compressing `input` into `output`
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut out_flag = OsString::from("-sOutputFile=");
        out_flag.push(output.as_os_str());

        vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.4".into(),
            "-dPDFSETTINGS=/prepress".into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            out_flag,
            input.as_os_str().to_os_string(),
        ]
    }
}

impl Compressor for Ghostscript {
    fn compress(&self, input: &Path, output: &Path) -> Result<()> {
        log::debug!("running {} on {}", self.program.display(), input.display());

        let result = Command::new(&self.program)
            .args(self.arguments(input, output))
            .output()
            .map_err(|e| {
                Error::CompressionUnavailable(format!("{}: {}", self.program.display(), e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::CompressionUnavailable(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(Error::CompressionUnavailable(format!(
                "{} produced no output",
                self.program.display()
            )));
        }

        Ok(())
    }
}
