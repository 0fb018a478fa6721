//! Date Stamper: burn capture timestamps into photo pixels.
//!
//! Reads the EXIF capture time of each image (falling back to the file
//! modification time), formats it per the configured date format, and
//! composites the text into a chosen corner of the image. Output is encoded
//! in the source's own format.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use date_stamper::config::StampStyle;
//! use date_stamper::pipeline::{self, SourceImage};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let image = SourceImage::from_path(Path::new("photo.jpg"))?;
//!     let outcome = pipeline::process_batch(vec![image], &StampStyle::default(), None).await;
//!
//!     for entry in &outcome.stamped {
//!         std::fs::write(entry.output_file_name(), entry.stamped().bytes())?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datefmt;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod stamp;

#[cfg(test)]
pub(crate) mod test_util;
