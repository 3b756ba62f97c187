//! Writing documents back to disk

use std::path::Path;
use lopdf::Document;
use crate::error::Result;

/// Save a document with unused objects removed and streams compressed
///
/// Objects no longer reachable from the trailer (replaced content, the old
/// page trees left behind by a merge) are dropped, the remaining objects are
/// renumbered densely and every compressible stream is flate-encoded.
pub fn save_compacted(doc: &mut Document, path: &Path) -> Result<()> {
    let pruned = doc.prune_objects();
    if !pruned.is_empty() {
        log::debug!("pruned {} unreferenced objects", pruned.len());
    }
    doc.renumber_objects();
    doc.compress();
    doc.save(path)?;
    Ok(())
}
