//! PDF Dewatermark CLI tool
//!
//! A command-line tool for removing scanner-app watermarks from PDFs.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;

use pdf_dewatermark::pdf::Ghostscript;
use pdf_dewatermark::{Pipeline, ProcessOptions, ScanReporter, WatermarkConfig};

/// PDF Dewatermark - Remove scanner-app watermarks, merge and compress PDFs
#[derive(Parser)]
#[command(name = "pdf-dewatermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Clean, merge and compress all scans in order
    pdf-dewatermark process -o clean.pdf \"scans/*.pdf\"

    # Only remove QR stamps, keep the result uncompressed
    pdf-dewatermark process --keep-text --no-compress -o out.pdf page1.pdf page2.pdf

    # Preview what would be removed
    pdf-dewatermark scan scans/page1.pdf

LOGGING:
    Set RUST_LOG=debug for per-page detection details.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove watermarks, then merge and compress the results
    Process {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Move the final file to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not remove text watermarks
        #[arg(long)]
        keep_text: bool,

        /// Do not remove QR-code stamps
        #[arg(long)]
        keep_qr: bool,

        /// Process only the first input instead of merging all of them
        #[arg(long)]
        no_merge: bool,

        /// Skip Ghostscript compression
        #[arg(long)]
        no_compress: bool,

        /// JSON file overriding keywords, thresholds and zones
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ghostscript executable
        #[arg(long, default_value = "gs")]
        gs: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report watermarks found in a PDF without changing it
    Scan {
        /// PDF file to inspect
        input: PathBuf,

        /// JSON file overriding keywords, thresholds and zones
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            inputs, output, keep_text, keep_qr, no_merge, no_compress, config, gs, json,
        } => {
            let options = ProcessOptions {
                remove_text: !keep_text,
                remove_qr: !keep_qr,
                merge: !no_merge,
                compress: !no_compress,
            };
            cmd_process(inputs, output, options, config, gs, json)
        }
        Commands::Scan { input, config, json } => cmd_scan(input, config, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Invalid pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // Sort each pattern's matches; explicit argument order is kept
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

fn load_config(path: Option<&Path>) -> Result<WatermarkConfig> {
    match path {
        Some(path) => WatermarkConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(WatermarkConfig::default()),
    }
}

/// Clean, merge and compress a batch of PDFs
fn cmd_process(
    inputs: Vec<String>,
    output: Option<PathBuf>,
    options: ProcessOptions,
    config: Option<PathBuf>,
    gs: PathBuf,
    json: bool,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    let config = load_config(config.as_deref())?;

    let pipeline = Pipeline::new(config).with_compressor(Box::new(Ghostscript::new(gs)));
    let result = pipeline.process(&inputs, &options)?;

    let final_path = match output {
        Some(output) if output != result.path => {
            std::fs::rename(&result.path, &output)
                .or_else(|_| {
                    // rename fails across filesystems
                    std::fs::copy(&result.path, &output)
                        .and_then(|_| std::fs::remove_file(&result.path))
                })
                .with_context(|| format!("Failed to write {}", output.display()))?;
            output
        }
        _ => result.path,
    };

    if json {
        let mut value = serde_json::to_value(&result.stats)?;
        value["output"] = serde_json::Value::String(final_path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Output: {}", final_path.display());
        println!("Pages: {}", result.stats.pages);
        println!("Files: {}", result.stats.files);
        println!("Watermarks removed: {}", result.stats.watermarks);
        println!("Size: {:.2} MB", result.stats.size_mb);
    }

    Ok(())
}

/// Show what a scan finds in a PDF
fn cmd_scan(input: PathBuf, config: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let report = ScanReporter::new(&config)
        .scan(&input)
        .with_context(|| format!("Failed to scan {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("Pages: {}", report.pages);
    println!("Images: {}", report.images);
    println!("Text watermark: {}", if report.has_text_watermark { "yes" } else { "no" });
    println!("QR watermark: {}", if report.has_qr_watermark { "yes" } else { "no" });

    if !report.text_samples.is_empty() {
        println!("Text samples (page 1):");
        for sample in &report.text_samples {
            println!("  {:?} ({:.1}pt)", sample.text, sample.size);
        }
    }
    if !report.image_samples.is_empty() {
        println!("Suspicious images:");
        for image in &report.image_samples {
            println!(
                "  page {}: position {}, size {}",
                image.page,
                image.position_label(),
                image.size_label()
            );
        }
    }

    Ok(())
}
