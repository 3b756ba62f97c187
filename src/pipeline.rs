//! Batch processing: redact, merge, compress
//!
//! [`Pipeline::process`] is the single entry point for callers. It either
//! produces one output file and its statistics or fails as a whole; per-file
//! intermediates written before a failure are removed again.

use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::config::WatermarkConfig;
use crate::error::{Error, Result};
use crate::pdf::compress::{Compressor, Ghostscript};
use crate::pdf::merge::{merge_pdfs, MergeOptions};
use crate::pdf::redact::{derived_path, PageRedactor, RedactOptions};

/// Suffix of the concatenated document
pub const MERGED_SUFFIX: &str = "_merged";
/// Suffix of the recompressed document
pub const COMPRESSED_SUFFIX: &str = "_compressed";

/// Flags for one processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub remove_text: bool,
    pub remove_qr: bool,
    /// Concatenate all inputs; when false only the first input is processed
    pub merge: bool,
    pub compress: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            remove_text: true,
            remove_qr: true,
            merge: true,
            compress: true,
        }
    }
}

impl ProcessOptions {
    fn redact_options(&self) -> RedactOptions {
        RedactOptions {
            remove_text: self.remove_text,
            remove_qr: self.remove_qr,
        }
    }
}

/// Totals for a processing run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    /// Pages in the files that were actually processed
    pub pages: usize,
    /// Accepted input files, processed or not
    pub files: usize,
    pub watermarks: usize,
    /// Size of the returned file in MB, rounded to 2 decimals
    pub size_mb: f64,
}

/// The final file of a run and its statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub path: PathBuf,
    pub stats: ProcessingStats,
}

/// Orchestrates redaction, merging and compression of a batch of files
pub struct Pipeline {
    redactor: PageRedactor,
    compressor: Box<dyn Compressor>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(WatermarkConfig::default())
    }
}

impl Pipeline {
    /// Pipeline with the given detection settings and Ghostscript compression
    pub fn new(config: WatermarkConfig) -> Self {
        Self {
            redactor: PageRedactor::new(&config),
            compressor: Box::new(Ghostscript::default()),
        }
    }

    /// Replace the compression capability
    pub fn with_compressor(mut self, compressor: Box<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Process `inputs` in order and return the final file
    ///
    /// Inputs without a `.pdf` extension are skipped; if none remain the call
    /// fails with [`Error::InvalidInput`] before touching the filesystem.
    pub fn process<P: AsRef<Path>>(&self, inputs: &[P], options: &ProcessOptions) -> Result<ProcessOutput> {
        let inputs = accepted_inputs(inputs)?;
        let mut intermediates: Vec<PathBuf> = Vec::new();

        let result = self.run(&inputs, options, &mut intermediates);
        if result.is_err() {
            for path in &intermediates {
                remove_quietly(path);
            }
        }
        result
    }

    fn run(
        &self,
        inputs: &[PathBuf],
        options: &ProcessOptions,
        intermediates: &mut Vec<PathBuf>,
    ) -> Result<ProcessOutput> {
        let redact_options = options.redact_options();
        let mut stats = ProcessingStats {
            files: inputs.len(),
            ..ProcessingStats::default()
        };
        let mut cleaned: Vec<PathBuf> = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.iter().enumerate() {
            log::info!("processing file {}/{}: {}", index + 1, inputs.len(), input.display());

            let redacted = self.redactor.redact_file(input, &redact_options)?;
            intermediates.push(redacted.path.clone());
            stats.pages += redacted.pages;
            stats.watermarks += redacted.watermarks;

            if !options.merge {
                if inputs.len() > 1 {
                    log::info!("merge disabled, skipping {} remaining file(s)", inputs.len() - 1);
                }
                stats.size_mb = size_mb(&redacted.path)?;
                return Ok(ProcessOutput {
                    path: redacted.path,
                    stats,
                });
            }
            cleaned.push(redacted.path);
        }

        let mut current = match cleaned.as_slice() {
            [single] => single.clone(),
            _ => {
                let merged_path = derived_path(&inputs[0], MERGED_SUFFIX);
                log::info!("merging {} files into {}", cleaned.len(), merged_path.display());
                intermediates.push(merged_path.clone());
                let merged_pages = merge_pdfs(&MergeOptions {
                    input_paths: cleaned.clone(),
                    output_path: merged_path.clone(),
                })?;
                if merged_pages != stats.pages {
                    log::warn!(
                        "merged document has {} pages, inputs had {}",
                        merged_pages,
                        stats.pages
                    );
                    stats.pages = merged_pages;
                }
                for path in &cleaned {
                    remove_quietly(path);
                }
                merged_path
            }
        };

        if options.compress {
            current = self.compress(current);
        }

        stats.size_mb = size_mb(&current)?;
        log::info!(
            "done: {} pages, {} files, {} watermarks, {:.2} MB",
            stats.pages,
            stats.files,
            stats.watermarks,
            stats.size_mb
        );

        Ok(ProcessOutput {
            path: current,
            stats,
        })
    }

    /// Compress `input`, falling back to it unchanged on any failure
    fn compress(&self, input: PathBuf) -> PathBuf {
        let output = derived_path(&input, COMPRESSED_SUFFIX);
        log::info!("compressing {}", input.display());

        match self.compressor.compress(&input, &output) {
            Ok(()) if output.exists() => {
                remove_quietly(&input);
                output
            }
            Ok(()) => {
                log::warn!("compression produced no output, keeping uncompressed file");
                input
            }
            Err(e) => {
                log::warn!("{}, keeping uncompressed file", e);
                remove_quietly(&output);
                input
            }
        }
    }
}

/// Keep the `.pdf` inputs, in order
fn accepted_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(Error::InvalidInput("No input files provided".to_string()));
    }

    let mut accepted = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = input.as_ref();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            accepted.push(path.to_path_buf());
        } else {
            log::warn!("skipping non-PDF input: {}", path.display());
        }
    }

    if accepted.is_empty() {
        return Err(Error::InvalidInput("No PDF files provided".to_string()));
    }
    Ok(accepted)
}

fn size_mb(path: &Path) -> Result<f64> {
    let bytes = fs::metadata(path)?.len();
    Ok(round2(bytes as f64 / (1024.0 * 1024.0)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("could not remove {}: {}", path.display(), e);
        }
    }
}
