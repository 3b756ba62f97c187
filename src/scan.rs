//! Read-only watermark preview
//!
//! Scanning runs the same keyword and region checks as redaction but never
//! writes anything, so it is safe to call on untrusted inputs before deciding
//! whether to process them.

use std::path::Path;
use lopdf::{Document, ObjectId};
use serde::Serialize;
use crate::config::WatermarkConfig;
use crate::detect::{KeywordMatcher, RegionHeuristic};
use crate::error::{Error, Result};
use crate::pdf::content::{analyze_page, PageLayout};

/// Shortest and longest (exclusive) span length kept as a text sample, in chars
const SAMPLE_MIN_CHARS: usize = 2;
const SAMPLE_MAX_CHARS: usize = 30;

/// A short text span from the first page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSample {
    pub text: String,
    /// Effective font size in points
    pub size: f32,
}

/// An image placement the region heuristic flagged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspiciousImage {
    /// 1-based page number
    pub page: usize,
    pub rel_x: f32,
    pub rel_y: f32,
    pub width: f32,
    pub height: f32,
}

impl SuspiciousImage {
    /// Relative position as `(0.85, 0.90)`
    pub fn position_label(&self) -> String {
        format!("({:.2}, {:.2})", self.rel_x, self.rel_y)
    }

    /// Absolute size as `90x90`
    pub fn size_label(&self) -> String {
        format!("{:.0}x{:.0}", self.width, self.height)
    }
}

/// Diagnostic summary of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub pages: usize,
    /// Images drawn on each page, summed over pages
    pub images: usize,
    pub has_text_watermark: bool,
    pub has_qr_watermark: bool,
    pub text_samples: Vec<TextSample>,
    pub image_samples: Vec<SuspiciousImage>,
}

/// Builds [`ScanReport`]s
#[derive(Debug, Clone)]
pub struct ScanReporter {
    matcher: KeywordMatcher,
    heuristic: RegionHeuristic,
    max_text_samples: usize,
}

impl Default for ScanReporter {
    fn default() -> Self {
        Self::new(&WatermarkConfig::default())
    }
}

impl ScanReporter {
    pub fn new(config: &WatermarkConfig) -> Self {
        Self {
            matcher: KeywordMatcher::new(&config.keywords),
            heuristic: RegionHeuristic::new(config.region),
            max_text_samples: config.max_text_samples,
        }
    }

    /// Open `path` read-only and report what redaction would find
    pub fn scan(&self, path: &Path) -> Result<ScanReport> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted(path.to_path_buf()));
        }

        let report = self.scan_document(&doc)?;
        if report.pages == 0 {
            return Err(Error::EmptyPdf(path.to_path_buf()));
        }

        log::info!(
            "scanned {}: {} pages, {} images, text watermark: {}, QR watermark: {}",
            path.display(),
            report.pages,
            report.images,
            report.has_text_watermark,
            report.has_qr_watermark
        );
        Ok(report)
    }

    /// Report on an already loaded document
    pub fn scan_document(&self, doc: &Document) -> Result<ScanReport> {
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let mut report = ScanReport {
            pages: page_ids.len(),
            ..ScanReport::default()
        };

        for (index, page_id) in page_ids.into_iter().enumerate() {
            let layout = analyze_page(doc, page_id)?;

            if index == 0 {
                report.text_samples = self.text_samples(&layout);
            }
            if self.matcher.matches(&layout.text()) {
                report.has_text_watermark = true;
            }

            report.images += layout.images.len();
            for image in &layout.images {
                for rect in &image.rects {
                    let verdict = self.heuristic.classify(rect, layout.width(), layout.height());
                    if verdict.is_watermark {
                        report.has_qr_watermark = true;
                        report.image_samples.push(SuspiciousImage {
                            page: index + 1,
                            rel_x: verdict.rel_x,
                            rel_y: verdict.rel_y,
                            width: verdict.width,
                            height: verdict.height,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    fn text_samples(&self, layout: &PageLayout) -> Vec<TextSample> {
        layout
            .spans
            .iter()
            .filter_map(|span| {
                let text = span.text.trim();
                let chars = text.chars().count();
                (SAMPLE_MIN_CHARS..SAMPLE_MAX_CHARS).contains(&chars).then(|| TextSample {
                    text: text.to_string(),
                    size: span.font_size,
                })
            })
            .take(self.max_text_samples)
            .collect()
    }
}
