//! Read-only page analysis
//!
//! Walks a page's content stream with a small graphics-state interpreter and
//! collects what the watermark heuristics need: text spans with approximate
//! bounding boxes, and every placement of every image XObject. Form XObjects
//! are followed so stamps wrapped in a form are still found.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::Result;
use crate::layout::{Matrix, PageBox, Rect};

/// Nesting limit for Form XObjects (guards against self-referencing forms)
const MAX_FORM_DEPTH: usize = 8;

/// Nesting limit when walking up the page tree for inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// TJ adjustments beyond this (thousandths of an em) are treated as a word gap
const WORD_GAP: f32 = 200.0;

/// Glyph box relative to the baseline, in ems
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// Spans whose baselines differ by less than this fraction of the font size share a line
const LINE_TOLERANCE: f32 = 0.3;

/// A gap wider than this fraction of the average glyph width separates words
const SPACE_THRESHOLD: f32 = 0.2;

/// A run of text shown by one text operator
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Approximate bounds in page space (widths are estimated, not measured)
    pub bbox: Rect,
    /// Page-space y of the baseline at the start of the span
    pub baseline: f32,
    /// Effective font size after text and graphics transforms
    pub font_size: f32,
}

/// An image XObject and every place it is drawn on the page
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub id: Option<ObjectId>,
    /// Resource name used by the last `Do` that drew it
    pub name: String,
    /// Intrinsic size in pixels
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Placements in page space
    pub rects: Vec<Rect>,
}

/// Everything the detector knows about one page
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_box: PageBox,
    pub spans: Vec<TextSpan>,
    pub images: Vec<PageImage>,
}

impl PageLayout {
    pub fn width(&self) -> f32 {
        self.page_box.width()
    }

    pub fn height(&self) -> f32 {
        self.page_box.height()
    }

    /// Plain text of the page, one line per text line
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    /// Spans grouped into lines, top to bottom, each line read left to right
    ///
    /// Text drawn by several operators on one baseline comes back as a single
    /// line, so a phrase split across `Tj` calls still reads as one string.
    pub fn lines(&self) -> Vec<String> {
        let mut spans: Vec<&TextSpan> = self.spans.iter().collect();
        spans.sort_by(|a, b| {
            a.baseline
                .partial_cmp(&b.baseline)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<Vec<&TextSpan>> = Vec::new();
        let mut current_y: Option<f32> = None;
        for span in spans {
            let tolerance = (span.font_size * LINE_TOLERANCE).max(1.0);
            let same_line = current_y.is_some_and(|y| (span.baseline - y).abs() <= tolerance);
            if same_line {
                if let Some(line) = lines.last_mut() {
                    line.push(span);
                    continue;
                }
            }
            current_y = Some(span.baseline);
            lines.push(vec![span]);
        }

        lines.into_iter().map(join_line).collect()
    }
}

/// Concatenate the spans of one line in x order, adding a space at word gaps
fn join_line(mut spans: Vec<&TextSpan>) -> String {
    spans.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal));

    let mut line = String::new();
    let mut previous: Option<&TextSpan> = None;
    for span in spans {
        if let Some(prev) = previous {
            let chars = span.text.chars().count();
            let glyph = if chars > 0 && span.bbox.width() > 0.0 {
                span.bbox.width() / chars as f32
            } else {
                span.font_size * 0.5
            };
            let gap = span.bbox.x0 - prev.bbox.x1;

            let prev_last = prev.text.chars().last();
            let next_first = span.text.chars().next();
            let both_wide = prev_last.is_some_and(is_wide_char) && next_first.is_some_and(is_wide_char);
            let has_space = prev_last.is_some_and(char::is_whitespace)
                || next_first.is_some_and(char::is_whitespace);

            if gap > glyph * SPACE_THRESHOLD && !both_wide && !has_space {
                line.push(' ');
            }
        }
        line.push_str(&span.text);
        previous = Some(span);
    }
    line
}

/// Analyze a single page without modifying the document
pub fn analyze_page(doc: &Document, page_id: ObjectId) -> Result<PageLayout> {
    let page_box = page_box(doc, page_id);
    let resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|res| res.as_dict().ok());
    let content = page_content(doc, page_id)?;

    let mut interpreter = Interpreter {
        doc,
        page_box,
        spans: Vec::new(),
        images: Vec::new(),
    };
    interpreter.run(&content, resources, Matrix::identity(), 0)?;

    log::debug!(
        "page {:?}: {} text spans, {} images",
        page_id,
        interpreter.spans.len(),
        interpreter.images.len()
    );

    Ok(PageLayout {
        page_box,
        spans: interpreter.spans,
        images: interpreter.images,
    })
}

/// Follow a reference to the object it points at
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up the page tree for inherited values
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value).ok();
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The visible area of a page
///
/// The CropBox clipped to the MediaBox when the page has one, otherwise the
/// MediaBox, otherwise US Letter.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let media_box = page_rectangle(doc, page_id, b"MediaBox").unwrap_or_else(PageBox::letter);
    page_rectangle(doc, page_id, b"CropBox")
        .and_then(|crop_box| crop_box.intersect(&media_box))
        .unwrap_or(media_box)
}

fn page_rectangle(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PageBox> {
    let corners: Vec<f32> = inherited_attribute(doc, page_id, key)?
        .as_array()
        .ok()?
        .iter()
        .filter_map(|obj| resolve(doc, obj).ok().and_then(number))
        .collect();

    match corners.as_slice() {
        [x0, y0, x1, y1] => Some(PageBox::from_corners(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

/// Decoded bytes of a stream, decompressing only when a filter is present
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Decoded stream bytes, or nothing when the filter cannot be undone
fn readable_stream(stream: &Stream) -> Vec<u8> {
    stream_bytes(stream).unwrap_or_else(|e| {
        log::warn!("skipping undecodable content stream: {}", e);
        Vec::new()
    })
}

/// Concatenated content streams of a page
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(contents) => resolve(doc, contents)?,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Stream(stream) => Ok(readable_stream(stream)),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                if let Object::Stream(stream) = resolve(doc, part)? {
                    content.extend_from_slice(&readable_stream(stream));
                    content.push(b'\n');
                }
            }
            Ok(content)
        }
        _ => Ok(Vec::new()),
    }
}

/// Helper: extract a number from an integer or real operand
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    let nums: Vec<f32> = operands.iter().filter_map(number).collect();
    match nums.as_slice() {
        [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

/// Characters from scripts that are typically set full-width
fn is_wide_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        || (0x3000..=0x30FF).contains(&code)
        || (0xAC00..=0xD7AF).contains(&code)
        || (0xFF00..=0xFFEF).contains(&code)
}

/// Estimated advance of a glyph, in ems
fn glyph_width(c: char) -> f32 {
    if is_wide_char(c) {
        1.0
    } else {
        0.5
    }
}

/// Simple text decoding fallback when no font encoding is available
fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with byte order mark
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Text parameters that survive between text objects
#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line: Matrix,
    font: Option<Vec<u8>>,
    size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::identity(),
            line: Matrix::identity(),
            font: None,
            size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line = Matrix::translate(tx, ty).then(&self.line);
        self.matrix = self.line;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    page_box: PageBox,
    spans: Vec<TextSpan>,
    images: Vec<PageImage>,
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base: Matrix,
        depth: usize,
    ) -> Result<()> {
        // Analysis is best effort: an unparsable stream contributes nothing
        let content = match Content::decode(content) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("could not parse content stream, skipping its text and images: {}", e);
                return Ok(());
            }
        };

        let mut ctm = base;
        let mut text = TextState::default();
        let mut saved: Vec<(Matrix, TextState)> = Vec::new();

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => saved.push((ctm, text.clone())),
                "Q" => {
                    if let Some((restored_ctm, restored_text)) = saved.pop() {
                        ctm = restored_ctm;
                        text = restored_text;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "BT" => {
                    text.matrix = Matrix::identity();
                    text.line = Matrix::identity();
                }
                "Tf" => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        text.font = Some(name.to_vec());
                    }
                    if let Some(size) = operands.get(1).and_then(number) {
                        text.size = size;
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(number) {
                        text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        text.leading = -ty;
                    }
                    text.move_line(tx, ty);
                }
                "Tm" => {
                    if let Some(m) = matrix_from(operands) {
                        text.matrix = m;
                        text.line = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" => {
                    if let Some(item @ Object::String(..)) = operands.first() {
                        self.show(&mut text, &ctm, resources, std::slice::from_ref(item));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show(&mut text, &ctm, resources, items);
                    }
                }
                "'" => {
                    text.next_line();
                    if let Some(item @ Object::String(..)) = operands.first() {
                        self.show(&mut text, &ctm, resources, std::slice::from_ref(item));
                    }
                }
                "\"" => {
                    text.next_line();
                    if let Some(item @ Object::String(..)) = operands.get(2) {
                        self.show(&mut text, &ctm, resources, std::slice::from_ref(item));
                    }
                }
                "Do" => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        self.invoke_xobject(name, resources, &ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Record a text-showing operation and advance the text matrix
    fn show(
        &mut self,
        state: &mut TextState,
        ctm: &Matrix,
        resources: Option<&'a Dictionary>,
        items: &[Object],
    ) {
        let origin = state.matrix;
        let size = state.size;
        let mut text = String::new();
        let mut advance = 0.0f32;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = self.decode(resources, state.font.as_deref(), bytes);
                    advance += decoded.chars().map(glyph_width).sum::<f32>() * size;
                    text.push_str(&decoded);
                }
                other => {
                    if let Some(adjustment) = number(other) {
                        advance -= adjustment / 1000.0 * size;
                        let wants_space = text
                            .chars()
                            .last()
                            .is_some_and(|c| !c.is_whitespace() && !is_wide_char(c));
                        if -adjustment > WORD_GAP && wants_space {
                            text.push(' ');
                        }
                    }
                }
            }
        }

        state.matrix = Matrix::translate(advance, 0.0).then(&state.matrix);

        // Whitespace is kept so lines can be rejoined with their separators
        if text.trim().is_empty() {
            return;
        }

        let render = origin.then(ctm);
        let user = render.transform_rect(0.0, -DESCENT * size, advance.max(0.0), ASCENT * size);
        let (_, baseline_y) = render.apply(0.0, 0.0);
        self.spans.push(TextSpan {
            text,
            bbox: self.page_box.to_page_space(&user),
            baseline: self.page_box.ury - baseline_y,
            font_size: size * render.vertical_scale(),
        });
    }

    fn decode(&self, resources: Option<&'a Dictionary>, font: Option<&[u8]>, bytes: &[u8]) -> String {
        let font_dict = match (resources, font) {
            (Some(resources), Some(name)) => self.font_dictionary(resources, name),
            _ => None,
        };

        if let Some(font_dict) = font_dict {
            if let Ok(encoding) = font_dict.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
            log::debug!("falling back to raw text decoding");
        }
        decode_text_simple(bytes)
    }

    fn font_dictionary(&self, resources: &'a Dictionary, name: &[u8]) -> Option<&'a Dictionary> {
        let fonts = resolve(self.doc, resources.get(b"Font").ok()?).ok()?.as_dict().ok()?;
        resolve(self.doc, fonts.get(name).ok()?).ok()?.as_dict().ok()
    }

    fn xobject(&self, resources: &'a Dictionary, name: &[u8]) -> Option<(Option<ObjectId>, &'a Stream)> {
        let doc = self.doc;
        let xobjects = resolve(doc, resources.get(b"XObject").ok()?).ok()?.as_dict().ok()?;
        match xobjects.get(name).ok()? {
            Object::Reference(id) => match doc.get_object(*id).ok()? {
                Object::Stream(stream) => Some((Some(*id), stream)),
                _ => None,
            },
            Object::Stream(stream) => Some((None, stream)),
            _ => None,
        }
    }

    fn invoke_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: &Matrix,
        depth: usize,
    ) -> Result<()> {
        let Some((id, stream)) = resources.and_then(|res| self.xobject(res, name)) else {
            log::warn!("XObject /{} not found in resources", String::from_utf8_lossy(name));
            return Ok(());
        };

        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).unwrap_or_default();
        match subtype {
            b"Image" => self.record_image(id, name, stream, ctm),
            b"Form" if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| matrix_from(m))
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|res| resolve(self.doc, res).ok())
                    .and_then(|res| res.as_dict().ok())
                    .or(resources);
                let content = readable_stream(stream);
                self.run(&content, form_resources, form_matrix.then(ctm), depth + 1)?;
            }
            b"Form" => log::warn!("Form XObject nesting deeper than {}, skipped", MAX_FORM_DEPTH),
            _ => {}
        }
        Ok(())
    }

    /// Images occupy the unit square of the current transformation
    fn record_image(&mut self, id: Option<ObjectId>, name: &[u8], stream: &Stream, ctm: &Matrix) {
        let rect = self.page_box.to_page_space(&ctm.transform_rect(0.0, 0.0, 1.0, 1.0));
        let name = String::from_utf8_lossy(name).into_owned();

        let existing = self.images.iter_mut().find(|image| match id {
            Some(_) => image.id == id,
            None => image.id.is_none() && image.name == name,
        });
        if let Some(image) = existing {
            image.name = name;
            image.rects.push(rect);
            return;
        }

        let dimension = |key: &[u8]| {
            stream
                .dict
                .get(key)
                .ok()
                .and_then(number)
                .map(|v| v.max(0.0) as u32)
                .unwrap_or(0)
        };
        self.images.push(PageImage {
            id,
            name,
            pixel_width: dimension(b"Width"),
            pixel_height: dimension(b"Height"),
            rects: vec![rect],
        });
    }
}
