//! PDF Dewatermark Library
//!
//! Removes scanner-app watermarks (text banners and QR-code stamps) from PDF
//! pages, optionally merges several documents and optionally recompresses the
//! result. This library provides:
//! - Keyword and geometry based watermark detection
//! - Overlay redaction that keeps page count and layout intact
//! - A batch pipeline with merge and compression stages
//! - A read-only scan for previewing what would be removed
//!
//! # Example
//!
//! ```no_run
//! use pdf_dewatermark::{Pipeline, ProcessOptions, WatermarkConfig};
//!
//! let pipeline = Pipeline::new(WatermarkConfig::default());
//! let output = pipeline
//!     .process(&["scan1.pdf", "scan2.pdf"], &ProcessOptions::default())
//!     .expect("Failed to process PDFs");
//!
//! println!("{} pages, {} watermarks", output.stats.pages, output.stats.watermarks);
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod scan;

// Re-export commonly used items
pub use config::WatermarkConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, ProcessOptions, ProcessOutput, ProcessingStats};
pub use scan::{ScanReport, ScanReporter};
