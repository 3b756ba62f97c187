//! Watermark redaction by opaque overlay
//!
//! Redaction never removes page content. The original content streams are
//! wrapped in `q`/`Q` so any transform they leave behind is undone, then a
//! final stream paints white rectangles over every detected region. Page count
//! and layout stay exactly as they were.

use std::path::{Path, PathBuf};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::config::WatermarkConfig;
use crate::detect::{KeywordMatcher, RegionHeuristic};
use crate::error::{Error, Result};
use crate::layout::{PageBox, Rect, Zone};
use crate::pdf::content::{analyze_page, PageLayout};
use crate::pdf::save::save_compacted;

/// Suffix appended to the file stem of redacted documents
pub const CLEAN_SUFFIX: &str = "_clean";

/// Which kinds of watermark to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedactOptions {
    pub remove_text: bool,
    pub remove_qr: bool,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            remove_text: true,
            remove_qr: true,
        }
    }
}

impl RedactOptions {
    pub fn any(&self) -> bool {
        self.remove_text || self.remove_qr
    }
}

/// A region classified as a watermark on one page (page space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatermarkCandidate {
    /// The page text matched a keyword; covers the lower-right text zone
    TextRegion(Rect),
    /// An image placement passed the region heuristic; covers the placement
    ImageRegion(Rect),
}

impl WatermarkCandidate {
    pub fn rect(&self) -> Rect {
        match self {
            WatermarkCandidate::TextRegion(rect) | WatermarkCandidate::ImageRegion(rect) => *rect,
        }
    }
}

/// What was painted on one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRedaction {
    pub candidates: Vec<WatermarkCandidate>,
    /// Fixed zones painted regardless of detection
    pub safety_net: Vec<Rect>,
}

impl PageRedaction {
    /// Number of detected watermarks (safety-net zones are not counted)
    pub fn watermarks(&self) -> usize {
        self.candidates.len()
    }

    /// Every rectangle painted, in drawing order
    pub fn rects(&self) -> Vec<Rect> {
        self.candidates
            .iter()
            .map(WatermarkCandidate::rect)
            .chain(self.safety_net.iter().copied())
            .collect()
    }
}

/// A redacted copy of an input file
#[derive(Debug, Clone, PartialEq)]
pub struct RedactedFile {
    pub path: PathBuf,
    pub pages: usize,
    pub watermarks: usize,
}

/// Detects watermarks on pages and paints over them
#[derive(Debug, Clone)]
pub struct PageRedactor {
    matcher: KeywordMatcher,
    heuristic: RegionHeuristic,
    text_zone: Zone,
    safety_net: Vec<Zone>,
}

impl Default for PageRedactor {
    fn default() -> Self {
        Self::new(&WatermarkConfig::default())
    }
}

impl PageRedactor {
    pub fn new(config: &WatermarkConfig) -> Self {
        Self {
            matcher: KeywordMatcher::new(&config.keywords),
            heuristic: RegionHeuristic::new(config.region),
            text_zone: config.text_zone,
            safety_net: config.safety_net.clone(),
        }
    }

    /// Classify the regions of an analyzed page
    ///
    /// Text detection yields at most one region per page. Image detection
    /// yields one region per qualifying placement.
    pub fn detect(&self, layout: &PageLayout, options: &RedactOptions) -> Vec<WatermarkCandidate> {
        let (width, height) = (layout.width(), layout.height());
        let mut candidates = Vec::new();

        if options.remove_text {
            if let Some(keyword) = self.matcher.find(&layout.text()) {
                log::debug!("text watermark keyword {:?}", keyword);
                candidates.push(WatermarkCandidate::TextRegion(
                    self.text_zone.resolve(width, height),
                ));
            }
        }

        if options.remove_qr {
            for image in &layout.images {
                for rect in &image.rects {
                    let verdict = self.heuristic.classify(rect, width, height);
                    if verdict.is_watermark {
                        log::debug!(
                            "image /{} at ({:.2}, {:.2}) {:.0}x{:.0} classified as stamp",
                            image.name,
                            verdict.rel_x,
                            verdict.rel_y,
                            verdict.width,
                            verdict.height
                        );
                        candidates.push(WatermarkCandidate::ImageRegion(*rect));
                    }
                }
            }
        }

        candidates
    }

    /// Detect and paint over watermarks on one page
    ///
    /// When either option is set, the safety-net zones are painted even if
    /// nothing was detected; on pages that are not scanner output this can
    /// cover real content in the lower-right corner.
    pub fn redact_page(
        &self,
        doc: &mut Document,
        page_id: ObjectId,
        options: &RedactOptions,
    ) -> Result<PageRedaction> {
        if !options.any() {
            return Ok(PageRedaction::default());
        }

        let layout = analyze_page(doc, page_id)?;
        let (width, height) = (layout.width(), layout.height());

        let redaction = PageRedaction {
            candidates: self.detect(&layout, options),
            safety_net: self
                .safety_net
                .iter()
                .map(|zone| zone.resolve(width, height))
                .collect(),
        };

        let rects: Vec<Rect> = redaction
            .rects()
            .into_iter()
            .filter(|rect| !rect.is_empty())
            .collect();
        if !rects.is_empty() {
            let overlay = overlay_stream(&layout.page_box, &rects)?;
            let overlay_id = doc.add_object(overlay);
            isolate_and_append(doc, page_id, overlay_id)?;
        }

        Ok(redaction)
    }

    /// Redact every page of a loaded document, returning the watermark count
    pub fn redact_document(&self, doc: &mut Document, options: &RedactOptions) -> Result<usize> {
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let mut watermarks = 0;

        for (index, page_id) in page_ids.into_iter().enumerate() {
            let redaction = self.redact_page(doc, page_id, options)?;
            if redaction.watermarks() > 0 {
                log::debug!("page {}: {} watermark(s)", index + 1, redaction.watermarks());
            }
            watermarks += redaction.watermarks();
        }

        Ok(watermarks)
    }

    /// Redact a PDF file into a sibling file with the `_clean` suffix
    pub fn redact_file(&self, input: &Path, options: &RedactOptions) -> Result<RedactedFile> {
        if !input.exists() {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }

        let mut doc = Document::load(input)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted(input.to_path_buf()));
        }

        let pages = doc.get_pages().len();
        if pages == 0 {
            return Err(Error::EmptyPdf(input.to_path_buf()));
        }

        let watermarks = self.redact_document(&mut doc, options)?;

        let path = derived_path(input, CLEAN_SUFFIX);
        save_compacted(&mut doc, &path)?;
        log::info!("  removed {} watermark(s) from {}", watermarks, input.display());

        Ok(RedactedFile {
            path,
            pages,
            watermarks,
        })
    }
}

/// Sibling path with `suffix` inserted before the `.pdf` extension
///
/// `scans/report.pdf` with `_clean` becomes `scans/report_clean.pdf`.
pub fn derived_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}.pdf", stem, suffix))
}

/// White fill and stroke over each rectangle
fn overlay_stream(page_box: &PageBox, rects: &[Rect]) -> Result<Stream> {
    let white = || vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)];

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", white()),
        Operation::new("RG", white()),
    ];
    for rect in rects {
        let (x, y, w, h) = page_box.to_user_rect(rect);
        operations.push(Operation::new(
            "re",
            vec![Object::Real(x), Object::Real(y), Object::Real(w), Object::Real(h)],
        ));
        operations.push(Operation::new("B", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    let content = Content { operations };
    Ok(Stream::new(Dictionary::new(), content.encode()?))
}

/// The page's content stream references, flattened into a list
fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let references = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(parts)) => parts.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(parts)) => parts.clone(),
        _ => Vec::new(),
    };
    Ok(references)
}

/// Wrap the existing content in q/Q and append the overlay after it
///
/// Appending keeps the overlay on top of everything the page draws; the
/// wrapper makes it start from the default coordinate system even when the
/// original content leaves a `cm` in effect.
fn isolate_and_append(doc: &mut Document, page_id: ObjectId, overlay_id: ObjectId) -> Result<()> {
    let existing = content_references(doc, page_id)?;

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    let page_obj = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut page_dict) = page_obj {
        page_dict.set("Contents", Object::Array(contents));
    }

    Ok(())
}
