use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::StampStyle;
use crate::datefmt;
use crate::error::{StampError, StampResult};
use crate::exif::{self, ExtractedTimestamp};
use crate::stamp::{self, EncodedImage};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

/// The format of an image file, detected from its extension.
///
/// Only raster formats the compositor can both decode and re-encode are
/// supported.
///
/// # Example
///
/// ```rust
/// use date_stamper::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("photo.jpg")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("doc.pdf")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// The declared media subtype for this kind.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }
}

/// One selected input image: raw bytes, original name, detected format, and
/// the file modification instant used as the metadata fallback.
///
/// Immutable once loaded; a new batch replaces its sources wholesale.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Vec<u8>,
    file_name: String,
    kind: ImageKind,
    modified: NaiveDateTime,
    origin: Option<PathBuf>,
}

impl SourceImage {
    /// Build a source from an in-memory buffer. The format is detected from
    /// `file_name`; `modified` stands in for the file modification time.
    pub fn from_bytes(
        bytes: Vec<u8>,
        file_name: String,
        modified: NaiveDateTime,
    ) -> StampResult<Self> {
        let kind = ImageKind::from_path(Path::new(&file_name))
            .ok_or_else(|| StampError::Unsupported(file_name.clone()))?;
        Ok(Self {
            bytes,
            file_name,
            kind,
            modified,
            origin: None,
        })
    }

    /// Load a source image from disk, capturing its modification time.
    pub fn from_path(path: &Path) -> StampResult<Self> {
        let kind = ImageKind::from_path(path)
            .ok_or_else(|| StampError::Unsupported(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        let modified = DateTime::<Utc>::from(std::fs::metadata(path)?.modified()?).naive_utc();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            bytes,
            file_name,
            kind,
            modified,
            origin: Some(path.to_path_buf()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Modification instant used when no capture metadata is embedded.
    pub fn modified(&self) -> NaiveDateTime {
        self.modified
    }

    /// The path this image was loaded from, when it came from disk.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

/// One stamped output: the source it came from, the timestamp that was
/// extracted, the text that was burned in, and the final encoded image.
#[derive(Debug, Clone)]
pub struct StampedImage {
    source: SourceImage,
    timestamp: ExtractedTimestamp,
    display_text: String,
    stamped: EncodedImage,
}

impl StampedImage {
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn timestamp(&self) -> ExtractedTimestamp {
        self.timestamp
    }

    /// The text that was composited into the pixels.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn stamped(&self) -> &EncodedImage {
        &self.stamped
    }

    /// Download name: `{originalNameWithoutExtension}-stamped.{originalExtension}`.
    pub fn output_file_name(&self) -> String {
        let name = Path::new(&self.source.file_name);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.file_name.clone());
        let ext = name
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "jpg".to_string());
        format!("{stem}-stamped.{ext}")
    }
}

/// A per-image skip notice for inputs excluded from the published batch.
#[derive(Debug, Clone)]
pub struct SkippedImage {
    pub file_name: String,
    pub reason: String,
}

/// The published result of one batch run.
///
/// A batch always completes: decode failures are excluded and reported in
/// `skipped`, never aborting the rest.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Stamped images, in original input order.
    pub stamped: Vec<StampedImage>,
    /// True when at least one stamped image used the fallback timestamp path.
    pub any_missing_metadata: bool,
    /// Images excluded from the batch, with the reason.
    pub skipped: Vec<SkippedImage>,
}

/// Run the full pipeline for one image: extract timestamp, format it, and
/// composite either the formatted string or `text_override` verbatim.
pub fn stamp_image(
    image: SourceImage,
    style: &StampStyle,
    text_override: Option<&str>,
) -> StampResult<StampedImage> {
    let timestamp = exif::extract(&image);
    let formatted =
        datefmt::format_timestamp(timestamp.datetime, style.date_format, style.show_seconds);
    let display_text = match text_override {
        Some(text) => text.to_string(),
        None => formatted,
    };
    let stamped = stamp::composite(&image, &display_text, style)?;

    Ok(StampedImage {
        source: image,
        timestamp,
        display_text,
        stamped,
    })
}

/// Process a batch of images.
///
/// Each image's path is self-contained, so the batch runs on blocking worker
/// tasks concurrently; results are collected in original input order and
/// published all at once. Dropping the returned future abandons the run —
/// no partial results escape a superseded batch.
pub async fn process_batch(
    images: Vec<SourceImage>,
    style: &StampStyle,
    text_override: Option<&str>,
) -> BatchOutcome {
    let mut handles = Vec::with_capacity(images.len());
    for image in images {
        let name = image.file_name().to_string();
        let style = style.clone();
        let text_override = text_override.map(str::to_string);
        let handle = tokio::task::spawn_blocking(move || {
            stamp_image(image, &style, text_override.as_deref())
        });
        handles.push((name, handle));
    }

    let mut outcome = BatchOutcome::default();
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(entry)) => {
                outcome.any_missing_metadata |= !entry.timestamp.from_metadata;
                outcome.stamped.push(entry);
            }
            Ok(Err(err)) => {
                outcome.skipped.push(SkippedImage {
                    file_name: name,
                    reason: err.to_string(),
                });
            }
            Err(join_err) => {
                outcome.skipped.push(SkippedImage {
                    file_name: name,
                    reason: worker_failure_reason(&join_err),
                });
            }
        }
    }

    outcome
}

/// A failed worker task is a bug in the stamper, not a problem with the
/// image; its skip notice says so instead of echoing the raw join error.
fn worker_failure_reason(err: &tokio::task::JoinError) -> String {
    if err.is_panic() {
        "internal error: stamping task panicked".to_string()
    } else {
        format!("internal error: {err}")
    }
}

/// Re-composite one entry with new display text.
///
/// Uses the entry's already-extracted timestamp and source bytes; extraction
/// is not re-run. The caller replaces the entry at its index, leaving every
/// other entry untouched.
pub fn restamp(
    entry: &StampedImage,
    text: &str,
    style: &StampStyle,
) -> StampResult<StampedImage> {
    let stamped = stamp::composite(&entry.source, text, style)?;
    Ok(StampedImage {
        source: entry.source.clone(),
        timestamp: entry.timestamp,
        display_text: text.to_string(),
        stamped,
    })
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with supported image
/// extensions are included (see [`ImageKind`]).
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StampStyle;
    use crate::datefmt::DateFormat;
    use crate::test_util::{encode_test_jpeg, encode_test_png, source_from_png};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    // ── ImageKind ─────────────────────────────────────────────────────

    #[test]
    fn image_kind_from_extension() {
        assert_eq!(ImageKind::from_path(Path::new("photo.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("photo.JPEG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("image.png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("image.webp")), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_path(Path::new("scan.tif")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("scan.tiff")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("old.bmp")), Some(ImageKind::Bmp));
    }

    #[test]
    fn image_kind_unsupported() {
        assert_eq!(ImageKind::from_path(Path::new("doc.pdf")), None);
        assert_eq!(ImageKind::from_path(Path::new("video.mp4")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn mime_types() {
        assert_eq!(ImageKind::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageKind::Png.mime_type(), "image/png");
        assert_eq!(ImageKind::WebP.mime_type(), "image/webp");
    }

    // ── SourceImage ───────────────────────────────────────────────────

    #[test]
    fn source_from_bytes_rejects_unknown_extension() {
        let err = SourceImage::from_bytes(vec![0u8], "readme.txt".to_string(), dt(2023, 1, 1, 0, 0, 0));
        assert!(matches!(err, Err(StampError::Unsupported(_))));
    }

    #[test]
    fn source_from_path_captures_modification_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        fs::write(&path, encode_test_png(4, 4)).unwrap();

        let image = SourceImage::from_path(&path).unwrap();
        assert_eq!(image.file_name(), "photo.png");
        assert_eq!(image.kind(), ImageKind::Png);
        assert_eq!(image.origin(), Some(path.as_path()));

        // The instant is the file's mtime, not a load-time clock read.
        let expected =
            DateTime::<Utc>::from(fs::metadata(&path).unwrap().modified().unwrap()).naive_utc();
        assert_eq!(image.modified(), expected);
    }

    #[test]
    fn output_file_name_inserts_stamped_suffix() {
        let entry = stamp_image(
            source_from_png(8, 8, "IMG_0042.png"),
            &StampStyle::default(),
            None,
        )
        .unwrap();
        assert_eq!(entry.output_file_name(), "IMG_0042-stamped.png");
    }

    // ── Orchestration ─────────────────────────────────────────────────

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let images = vec![
            source_from_png(8, 8, "a.png"),
            source_from_png(8, 8, "b.png"),
            source_from_png(8, 8, "c.png"),
        ];
        let outcome = process_batch(images, &StampStyle::default(), None).await;

        assert_eq!(outcome.stamped.len(), 3);
        assert!(outcome.skipped.is_empty());
        let names: Vec<&str> = outcome
            .stamped
            .iter()
            .map(|e| e.source().file_name())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[tokio::test]
    async fn batch_skips_undecodable_images_with_notice() {
        let broken =
            SourceImage::from_bytes(b"not an image".to_vec(), "broken.jpg".to_string(), dt(2023, 1, 1, 0, 0, 0))
                .unwrap();
        let images = vec![
            source_from_png(8, 8, "ok1.png"),
            broken,
            source_from_png(8, 8, "ok2.png"),
        ];
        let outcome = process_batch(images, &StampStyle::default(), None).await;

        assert_eq!(outcome.stamped.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].file_name, "broken.jpg");
        let names: Vec<&str> = outcome
            .stamped
            .iter()
            .map(|e| e.source().file_name())
            .collect();
        assert_eq!(names, vec!["ok1.png", "ok2.png"]);
    }

    #[tokio::test]
    async fn missing_metadata_flag_set_on_fallback() {
        // Plain PNGs carry no EXIF, so the fallback path is taken.
        let outcome = process_batch(
            vec![source_from_png(8, 8, "a.png")],
            &StampStyle::default(),
            None,
        )
        .await;
        assert!(outcome.any_missing_metadata);
        assert!(!outcome.stamped[0].timestamp().from_metadata);
    }

    #[tokio::test]
    async fn worker_failures_are_reported_as_internal_errors() {
        let join_err = tokio::task::spawn_blocking(|| panic!("boom"))
            .await
            .unwrap_err();
        let reason = worker_failure_reason(&join_err);
        assert!(reason.starts_with("internal error"));
        assert!(reason.contains("panicked"));
    }

    #[tokio::test]
    async fn text_override_is_stamped_verbatim() {
        let outcome = process_batch(
            vec![source_from_png(8, 8, "a.png")],
            &StampStyle::default(),
            Some("my holiday"),
        )
        .await;
        assert_eq!(outcome.stamped[0].display_text(), "my holiday");
    }

    #[tokio::test]
    async fn empty_batch_publishes_empty_outcome() {
        let outcome = process_batch(Vec::new(), &StampStyle::default(), None).await;
        assert!(outcome.stamped.is_empty());
        assert!(!outcome.any_missing_metadata);
    }

    #[test]
    fn restamp_reuses_timestamp_and_changes_only_text() {
        let style = StampStyle::default();
        let entry = stamp_image(source_from_png(8, 8, "a.png"), &style, None).unwrap();
        let original_timestamp = entry.timestamp();

        let replaced = restamp(&entry, "custom text", &style).unwrap();
        assert_eq!(replaced.display_text(), "custom text");
        assert_eq!(replaced.timestamp(), original_timestamp);
        assert_eq!(replaced.source().bytes(), entry.source().bytes());
    }

    #[tokio::test]
    async fn restamping_one_entry_leaves_others_byte_identical() {
        let style = StampStyle::default();
        let outcome = process_batch(
            vec![
                source_from_png(8, 8, "a.png"),
                source_from_png(8, 8, "b.png"),
            ],
            &style,
            None,
        )
        .await;
        let before: Vec<Vec<u8>> = outcome
            .stamped
            .iter()
            .map(|e| e.stamped().bytes().to_vec())
            .collect();

        let mut entries = outcome.stamped;
        entries[1] = restamp(&entries[1], "override", &style).unwrap();

        assert_eq!(entries[0].stamped().bytes(), before[0].as_slice());
        assert_eq!(entries[1].display_text(), "override");
    }

    // ── End-to-end ────────────────────────────────────────────────────

    #[tokio::test]
    async fn end_to_end_mixed_metadata_batch() {
        use little_exif::exif_tag::ExifTag;
        use little_exif::metadata::Metadata;

        let dir = TempDir::new().unwrap();
        let with_exif = dir.path().join("with-exif.jpg");
        fs::write(&with_exif, encode_test_jpeg(32, 32)).unwrap();
        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::DateTimeOriginal("2023:01:15 10:30:00".to_string()));
        metadata.write_to_file(&with_exif).unwrap();

        let first = SourceImage::from_path(&with_exif).unwrap();
        let second = SourceImage::from_bytes(
            encode_test_png(32, 32),
            "plain.png".to_string(),
            dt(2023, 6, 1, 0, 0, 0),
        )
        .unwrap();

        let style = StampStyle {
            date_format: DateFormat::YearMonthDay,
            show_seconds: false,
            ..StampStyle::default()
        };
        let outcome = process_batch(vec![first, second], &style, None).await;

        assert_eq!(outcome.stamped.len(), 2);
        assert_eq!(outcome.stamped[0].display_text(), "2023-01-15 10:30");
        assert_eq!(outcome.stamped[1].display_text(), "2023-06-01 00:00");
        assert!(outcome.any_missing_metadata);
        assert!(outcome.stamped[0].timestamp().from_metadata);
        assert!(!outcome.stamped[1].timestamp().from_metadata);
    }

    // ── collect_images ────────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0], jpg);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();

        let images = collect_images(&[txt]);
        assert!(images.is_empty());
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }
}
