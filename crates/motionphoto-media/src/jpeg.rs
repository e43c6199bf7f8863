//! JPEG motion photo locator.
//!
//! Two layouts are recognized:
//!
//! - Google MicroVideo: the XMP packet declares `GCamera:MicroVideoOffset`,
//!   the number of bytes from the start of the video to the end of the file.
//! - Samsung trailer: the video follows the last `MotionPhoto_Data` marker.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::bytes::Regex;
use tracing::debug;

use crate::{Error, Result};

const SOI: [u8; 2] = [0xFF, 0xD8];
const SAMSUNG_MARKER: &[u8] = b"MotionPhoto_Data";

/// How the video was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegVideoKind {
    MicroVideo,
    SamsungTrailer,
}

impl std::fmt::Display for JpegVideoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JpegVideoKind::MicroVideo => write!(f, "MicroVideo"),
            JpegVideoKind::SamsungTrailer => write!(f, "Samsung trailer"),
        }
    }
}

/// Video located inside a JPEG file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegMotionPhoto {
    pub kind: JpegVideoKind,
    /// Absolute offset of the first video byte.
    pub video_offset: u64,
    pub video_len: u64,
}

impl JpegMotionPhoto {
    pub fn video_range(&self) -> std::ops::Range<u64> {
        self.video_offset..self.video_offset + self.video_len
    }
}

fn micro_video_offset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?-u)MicroVideoOffset(?:="|>)\s*(\d+)"#)
            .expect("static regex is valid")
    })
}

/// Locate the embedded video in a JPEG file at the given path.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Option<JpegMotionPhoto>> {
    let data = fs::read(path)?;
    locate(&data)
}

/// Locate the embedded video in JPEG bytes.
///
/// Returns `Ok(None)` for a JPEG without a video.
pub fn locate(data: &[u8]) -> Result<Option<JpegMotionPhoto>> {
    if !data.starts_with(&SOI) {
        return Err(Error::invalid_jpeg("missing start-of-image marker"));
    }
    let file_len = data.len() as u64;

    if let Some(caps) = micro_video_offset_re().captures(data) {
        let digits = std::str::from_utf8(&caps[1])
            .map_err(|_| Error::invalid_jpeg("non-ASCII MicroVideoOffset"))?;
        let offset: u64 = digits
            .parse()
            .map_err(|_| Error::invalid_jpeg(format!("bad MicroVideoOffset {:?}", digits)))?;
        if offset == 0 || offset > file_len {
            return Err(Error::invalid_jpeg(format!(
                "MicroVideoOffset {} outside file of {} bytes",
                offset, file_len
            )));
        }
        debug!("MicroVideoOffset {} in {} byte file", offset, file_len);
        return Ok(Some(JpegMotionPhoto {
            kind: JpegVideoKind::MicroVideo,
            video_offset: file_len - offset,
            video_len: offset,
        }));
    }

    if let Some(pos) = data
        .windows(SAMSUNG_MARKER.len())
        .rposition(|w| w == SAMSUNG_MARKER)
    {
        let video_offset = (pos + SAMSUNG_MARKER.len()) as u64;
        if video_offset == file_len {
            return Ok(None);
        }
        debug!("Samsung motion photo trailer at {}", video_offset);
        return Ok(Some(JpegMotionPhoto {
            kind: JpegVideoKind::SamsungTrailer,
            video_offset,
            video_len: file_len - video_offset,
        }));
    }

    Ok(None)
}
