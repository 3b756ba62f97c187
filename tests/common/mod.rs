//! Programmatic test PDFs

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use std::path::{Path, PathBuf};

/// One page of a generated test document
pub struct TestPage {
    pub width: f32,
    pub height: f32,
    /// Text shown at a user-space baseline position
    pub texts: Vec<(f32, f32, String)>,
    /// Images drawn into user-space rectangles (x, y, w, h)
    pub images: Vec<(f32, f32, f32, f32)>,
}

impl TestPage {
    pub fn blank(width: f32, height: f32) -> Self {
        Self { width, height, texts: Vec::new(), images: Vec::new() }
    }

    pub fn text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.texts.push((x, y, text.to_string()));
        self
    }

    pub fn image(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.images.push((x, y, w, h));
        self
    }
}

/// Write a PDF with the given pages to `dir/name`
pub fn write_pdf(dir: &Path, name: &str, pages: Vec<TestPage>) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for page in pages {
        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();

        for (x, y, text) in &page.texts {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Real(10.0)]));
            operations.push(Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        for (index, (x, y, w, h)) in page.images.iter().enumerate() {
            let name = format!("Im{}", index + 1);
            let mut image = Dictionary::new();
            image.set("Type", Object::Name(b"XObject".to_vec()));
            image.set("Subtype", Object::Name(b"Image".to_vec()));
            image.set("Width", Object::Integer(16));
            image.set("Height", Object::Integer(16));
            image.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            image.set("BitsPerComponent", Object::Integer(8));
            let image_id = doc.add_object(Stream::new(image, vec![0u8; 256]));
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(image_id));

            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    Object::Real(*w),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(*h),
                    Object::Real(*x),
                    Object::Real(*y),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("Failed to encode content"),
        ));

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.width),
                Object::Real(page.height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let path = dir.join(name);
    doc.save(&path).expect("Failed to save test PDF");
    path
}

/// Page widths of a PDF on disk, in page order
pub fn page_widths(path: &Path) -> Vec<f32> {
    let doc = Document::load(path).expect("Failed to load PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).expect("page dictionary");
            let media_box = page
                .get(b"MediaBox")
                .and_then(Object::as_array)
                .expect("page MediaBox");
            let number = |obj: &Object| match obj {
                Object::Integer(i) => *i as f32,
                Object::Real(r) => *r,
                _ => panic!("non-numeric MediaBox entry"),
            };
            number(&media_box[2]) - number(&media_box[0])
        })
        .collect()
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).expect("Failed to load PDF").get_pages().len()
}
