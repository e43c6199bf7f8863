//! Locating embedded videos and copying them out of their source files.

use anyhow::{Context, Result};
use motionphoto_media::{heif, jpeg, JpegVideoKind, MotionPhoto, ScanOptions};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;

/// Container format detected from the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Heif,
    Jpeg,
}

impl SourceKind {
    /// Detect the container from magic bytes. Returns `None` for anything else.
    pub fn sniff(path: &Path) -> Result<Option<Self>> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let mut magic = Vec::with_capacity(12);
        file.take(12)
            .read_to_end(&mut magic)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Self::from_magic(&magic))
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(&[0xFF, 0xD8]) {
            Some(Self::Jpeg)
        } else if magic.len() >= 8 && &magic[4..8] == b"ftyp" {
            Some(Self::Heif)
        } else {
            None
        }
    }
}

/// How the video is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoKind {
    /// Samsung `sefd` box in a HEIC file.
    SamsungHeic,
    /// Google `MicroVideoOffset` in a JPEG file.
    MicroVideo,
    /// Samsung `MotionPhoto_Data` trailer in a JPEG file.
    SamsungJpeg,
}

impl std::fmt::Display for VideoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoKind::SamsungHeic => write!(f, "Samsung HEIC"),
            VideoKind::MicroVideo => write!(f, "MicroVideo JPEG"),
            VideoKind::SamsungJpeg => write!(f, "Samsung JPEG"),
        }
    }
}

/// An embedded video and the absolute byte range it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLocation {
    pub kind: VideoKind,
    pub range: Range<u64>,
}

impl VideoLocation {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-invocation extraction settings, already merged with the config file.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Write only the `mdat` payload of a HEIC motion photo.
    pub payload_only: bool,
    /// Replace existing output files.
    pub force: bool,
}

impl ExtractOptions {
    pub fn from_config(config: &Config, payload_only: bool, force: bool) -> Self {
        Self {
            payload_only: payload_only || config.extract.payload_only,
            force: force || config.extract.overwrite,
        }
    }
}

/// Result of processing one input file.
#[derive(Debug)]
pub enum ExtractOutcome {
    Written {
        input: PathBuf,
        output: PathBuf,
        location: VideoLocation,
    },
    NoVideo {
        input: PathBuf,
    },
    SkippedExisting {
        input: PathBuf,
        output: PathBuf,
    },
    Failed {
        input: PathBuf,
        error: String,
    },
}

/// `<dir>/<stem><suffix>` beside the input.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, suffix))
}

/// Whether the path carries one of the configured extensions.
pub fn is_candidate(path: &Path, config: &Config) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| config.extract.accepts_extension(ext))
        .unwrap_or(false)
}

/// Find the embedded video in a file.
///
/// Returns `Ok(None)` when the file is well formed but carries no video.
pub fn locate_video(
    path: &Path,
    config: &Config,
    payload_only: bool,
) -> Result<Option<VideoLocation>> {
    match SourceKind::sniff(path)? {
        Some(SourceKind::Heif) => locate_heif(path, config, payload_only),
        Some(SourceKind::Jpeg) => {
            let found = jpeg::open(path)
                .with_context(|| format!("Failed to parse JPEG {:?}", path))?;
            Ok(found.map(|j| VideoLocation {
                kind: match j.kind {
                    JpegVideoKind::MicroVideo => VideoKind::MicroVideo,
                    JpegVideoKind::SamsungTrailer => VideoKind::SamsungJpeg,
                },
                range: j.video_range(),
            }))
        }
        None => anyhow::bail!("Unrecognized file format: {:?}", path),
    }
}

fn locate_heif(path: &Path, config: &Config, payload_only: bool) -> Result<Option<VideoLocation>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let options = ScanOptions::from(&config.scan);
    let report = heif::parse_with_options(BufReader::new(file), options)
        .with_context(|| format!("Failed to parse HEIF {:?}", path))?;

    let Some(motion_photo) = report.into_motion_photo() else {
        debug!("No sefd box in {:?}", path);
        return Ok(None);
    };

    if !motion_photo.sefd.motion_photo_data {
        debug!("sefd box in {:?} has no motion photo record", path);
        return Ok(None);
    }

    check_motion_photo(&motion_photo, &config.extract.required_major_brand)
        .with_context(|| format!("Invalid motion photo {:?}", path))?;

    if !motion_photo.has_video() {
        return Ok(None);
    }

    let range = if payload_only {
        motion_photo.payload_range()
    } else {
        motion_photo.embedded_file_range()
    };

    Ok(range.map(|range| VideoLocation {
        kind: VideoKind::SamsungHeic,
        range,
    }))
}

/// The nested boxes a usable clip needs.
fn check_motion_photo(motion_photo: &MotionPhoto, required_brand: &str) -> Result<()> {
    let ftyp = motion_photo
        .sefd
        .ftyp()
        .ok_or(motionphoto_media::Error::MissingBox("ftyp"))?;
    motion_photo
        .sefd
        .mdat()
        .ok_or(motionphoto_media::Error::MissingBox("mdat"))?;

    if !required_brand.is_empty() && ftyp.major_brand.0[..] != *required_brand.as_bytes() {
        anyhow::bail!(
            "embedded video has major brand {} (expected {})",
            ftyp.major_brand,
            required_brand
        );
    }
    Ok(())
}

/// Copy `range` of `input` into a new file at `output`.
pub fn copy_range(input: &Path, range: Range<u64>, output: &Path) -> Result<u64> {
    let expected = range.end - range.start;

    let mut source = File::open(input).with_context(|| format!("Failed to open {:?}", input))?;
    source
        .seek(SeekFrom::Start(range.start))
        .with_context(|| format!("Failed to seek in {:?}", input))?;

    let sink = File::create(output).with_context(|| format!("Failed to create {:?}", output))?;
    let mut writer = BufWriter::new(sink);
    let copied = io::copy(&mut source.take(expected), &mut writer)
        .with_context(|| format!("Failed to write {:?}", output))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", output))?;

    if copied != expected {
        anyhow::bail!(
            "{:?} ended after {} of {} video bytes",
            input,
            copied,
            expected
        );
    }
    Ok(copied)
}

/// Extract the video of a single file into `output`.
pub fn extract_file(
    input: &Path,
    output: &Path,
    options: &ExtractOptions,
    config: &Config,
) -> Result<ExtractOutcome> {
    let Some(location) = locate_video(input, config, options.payload_only)? else {
        return Ok(ExtractOutcome::NoVideo {
            input: input.to_path_buf(),
        });
    };

    if output.exists() && !options.force {
        return Ok(ExtractOutcome::SkippedExisting {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        });
    }

    copy_range(input, location.range.clone(), output)?;
    info!(
        "Extracted {} video ({} bytes) from {:?} to {:?}",
        location.kind,
        location.len(),
        input,
        output
    );

    Ok(ExtractOutcome::Written {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        location,
    })
}

/// Extract every candidate file in a directory.
///
/// Per-file failures are logged and reported as [`ExtractOutcome::Failed`];
/// the walk continues.
pub fn extract_dir(
    dir: &Path,
    recursive: bool,
    options: &ExtractOptions,
    config: &Config,
) -> Result<Vec<ExtractOutcome>> {
    info!("Scanning directory: {:?}", dir);
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut outcomes = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_candidate(path, config) {
            continue;
        }
        // Our own outputs may share a configured extension
        if path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(&config.extract.output_suffix))
            .unwrap_or(false)
        {
            continue;
        }

        let output = default_output_path(path, &config.extract.output_suffix);
        match extract_file(path, &output, options, config) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!("Failed to extract {:?}: {:#}", path, e);
                outcomes.push(ExtractOutcome::Failed {
                    input: path.to_path_buf(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    Ok(outcomes)
}
