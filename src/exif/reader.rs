use chrono::NaiveDateTime;
use nom_exif::{Exif, ExifIter, ExifTag, MediaParser, MediaSource};
use std::io::Cursor;

use crate::pipeline::SourceImage;

/// A timestamp determined for one image, with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedTimestamp {
    /// The capture or modification instant.
    pub datetime: NaiveDateTime,
    /// `true` when the instant came from embedded metadata, `false` when the
    /// file modification time was used instead.
    pub from_metadata: bool,
}

/// Determine the timestamp for an image.
///
/// Tries the EXIF capture-time tags in the image bytes first
/// (`DateTimeOriginal`, then `CreateDate`, then `ModifyDate`). Absent or
/// unparseable metadata falls back to the modification time carried by the
/// [`SourceImage`]. Never fails — a missing timestamp is an expected path,
/// reported through `from_metadata`.
pub fn extract(image: &SourceImage) -> ExtractedTimestamp {
    match capture_time(image.bytes()) {
        Some(datetime) => ExtractedTimestamp {
            datetime,
            from_metadata: true,
        },
        None => ExtractedTimestamp {
            datetime: image.modified(),
            from_metadata: false,
        },
    }
}

/// Read the first parseable capture-time tag from the image bytes.
fn capture_time(bytes: &[u8]) -> Option<NaiveDateTime> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(bytes)).ok()?;

    // Parse errors here just mean "no EXIF" (e.g. a plain PNG).
    let iter: ExifIter = parser.parse(ms).ok()?;
    let exif: Exif = iter.into();

    for tag in [
        ExifTag::DateTimeOriginal,
        ExifTag::CreateDate,
        ExifTag::ModifyDate,
    ] {
        if let Some(val) = exif.get(tag) {
            if let Some(dt) = parse_exif_datetime(&val.to_string()) {
                return Some(dt);
            }
        }
    }

    None
}

/// Parse a capture-time string.
///
/// Accepts the raw EXIF form `YYYY:MM:DD HH:MM:SS` plus the ISO-like forms
/// nom-exif renders for values it already interpreted as datetimes. Anything
/// else is treated as unsupported and triggers the fallback path.
fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim().trim_matches('"');

    const NAIVE_FORMATS: &[&str] = &[
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    // Offset-carrying renderings keep their local wall-clock time.
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    // Sub-second or zone suffixes on the EXIF form ("2023:01:15 10:30:00+01:00").
    if s.len() > 19 {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s[..19], "%Y:%m:%d %H:%M:%S") {
            return Some(dt);
        }
    }

    None
}
