//! PDF manipulation module

pub mod compress;
pub mod content;
pub mod merge;
pub mod redact;
pub mod save;

// Re-export commonly used items
pub use compress::{Compressor, Ghostscript};
pub use content::{analyze_page, PageImage, PageLayout, TextSpan};
pub use merge::{merge_documents, merge_pdfs, MergeOptions};
pub use redact::{derived_path, PageRedaction, PageRedactor, RedactOptions, RedactedFile, WatermarkCandidate};
pub use save::save_compacted;
