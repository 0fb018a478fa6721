//! EXIF capture-time extraction.
//!
//! [`extract`] reads the embedded capture timestamp from an image's bytes and
//! falls back to the file modification time when no usable metadata exists.
//! Extraction is total: there is no error path, only the provenance flag.

mod reader;

pub use reader::{ExtractedTimestamp, extract};
