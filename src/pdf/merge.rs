//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::PathBuf;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};
use crate::pdf::content::inherited_attribute;
use crate::pdf::save::save_compacted;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Merge multiple PDF files into a single PDF, returning its page count
///
/// Pages keep their input order: every page of the first file, then every
/// page of the second, and so on.
///
/// # Example
///
/// ```no_run
/// use pdf_dewatermark::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("part1_clean.pdf"),
///         PathBuf::from("part2_clean.pdf"),
///     ],
///     output_path: PathBuf::from("part1_clean_merged.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::InvalidInput("No input files provided".to_string()));
    }

    // Validate all input files exist
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut documents: Vec<Document> = Vec::with_capacity(options.input_paths.len());
    for path in &options.input_paths {
        let mut doc = Document::load(path)?;

        if doc.get_pages().is_empty() {
            return Err(Error::EmptyPdf(path.clone()));
        }

        pin_inherited_attributes(&mut doc)?;
        documents.push(doc);
        log::info!("  merged: {}", path.display());
    }

    let mut merged = merge_documents(documents);
    let page_count = merged.get_pages().len();
    save_compacted(&mut merged, &options.output_path)?;

    log::info!("  merge complete: {} files, {} pages", options.input_paths.len(), page_count);
    Ok(page_count)
}

/// Concatenate the pages of several documents into a new document
///
/// Each page is re-parented under a single new page tree, so attributes it
/// inherited from its old tree must already be set on the page itself (see
/// [`pin_inherited_attributes`]).
pub fn merge_documents(documents: Vec<Document>) -> Document {
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber so object ids from different files cannot collide
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);

    // new_object_id() must hand out ids above everything copied in
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let catalog_id = merged.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(pages_id, Object::Dictionary(pages));
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(page)) = merged.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    merged
}

/// Copy inherited page attributes onto each page
pub fn pin_inherited_attributes(doc: &mut Document) -> Result<()> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let mut missing: Vec<(&[u8], Object)> = Vec::new();
        {
            let page = doc.get_dictionary(page_id)?;
            for key in INHERITABLE {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    missing.push((key, value.clone()));
                }
            }
        }

        if missing.is_empty() {
            continue;
        }
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            for (key, value) in missing {
                page.set(key.to_vec(), value);
            }
        }
    }

    Ok(())
}
