//! HEIF motion photo parsing.
//!
//! Samsung stores the video of a HEIC motion photo inside a root-level `sefd`
//! vendor box. The box holds a short record list and, after the
//! `MotionPhoto_Data` marker, a complete MP4 starting with `ftyp`/`mdat`.
//! Offsets reported by the nested boxes are relative to the `sefd` buffer;
//! [`MotionPhoto`] turns them into absolute file ranges.

mod atoms;
mod ftyp;
mod mdat;
mod scanner;
mod sefd;

pub use atoms::{BoxHeader, BoxType};
pub use ftyp::FtypBox;
pub use mdat::MdatBox;
pub use scanner::{ContainerScanner, ScanOptions, DEFAULT_MAX_VENDOR_BOX_SIZE};
pub use sefd::{SefdBox, SefdRecord};

use crate::Result;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::ops::Range;
use std::path::Path;

/// A root-level box visited by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootBox {
    pub box_type: BoxType,
    pub offset: u64,
    pub size: u64,
}

/// What a scan found.
#[derive(Debug)]
pub enum ScanOutcome {
    /// The file is well formed but has no `sefd` box.
    NoVendorBox,
    /// A `sefd` box was found and decoded.
    Found(MotionPhoto),
}

/// Result of scanning a HEIF file.
#[derive(Debug)]
pub struct ScanReport {
    /// Every root box in file order.
    pub root_boxes: Vec<RootBox>,
    pub outcome: ScanOutcome,
}

impl ScanReport {
    /// The decoded vendor box, if any.
    pub fn motion_photo(&self) -> Option<&MotionPhoto> {
        match &self.outcome {
            ScanOutcome::Found(motion_photo) => Some(motion_photo),
            ScanOutcome::NoVendorBox => None,
        }
    }

    pub fn into_motion_photo(self) -> Option<MotionPhoto> {
        match self.outcome {
            ScanOutcome::Found(motion_photo) => Some(motion_photo),
            ScanOutcome::NoVendorBox => None,
        }
    }
}

/// Decoded `sefd` box together with its position in the source file.
#[derive(Debug, Clone)]
pub struct MotionPhoto {
    /// Absolute file offset of the `sefd` box.
    pub vendor_offset: u64,
    pub sefd: SefdBox,
}

impl MotionPhoto {
    /// Declared size of the `sefd` box.
    pub fn vendor_size(&self) -> u64 {
        self.sefd.size()
    }

    /// Whether the box carries the marker record and a non-empty `mdat`.
    pub fn has_video(&self) -> bool {
        self.sefd.motion_photo_data
            && self.sefd.ftyp().is_some()
            && self.sefd.mdat().is_some_and(|m| m.payload_len() > 0)
    }

    /// Absolute file range of the `mdat` payload.
    pub fn payload_range(&self) -> Option<Range<u64>> {
        let mdat = self.sefd.mdat()?;
        let start = self.vendor_offset + mdat.start_position();
        Some(start..start + mdat.payload_len())
    }

    /// Absolute file range of the embedded MP4, from the nested `ftyp` to the
    /// end of the `sefd` box.
    pub fn embedded_file_range(&self) -> Option<Range<u64>> {
        let ftyp_start = self.sefd.ftyp_start_offset()?;
        Some(self.vendor_offset + ftyp_start..self.vendor_offset + self.vendor_size())
    }
}

/// Scan a HEIF file at the given path.
pub fn open<P: AsRef<Path>>(path: P) -> Result<ScanReport> {
    let file = File::open(path)?;
    parse(BufReader::new(file))
}

/// Scan a HEIF stream with default options.
pub fn parse<R: Read + Seek>(reader: R) -> Result<ScanReport> {
    ContainerScanner::new(reader)?.scan()
}

/// Scan a HEIF stream with custom options.
pub fn parse_with_options<R: Read + Seek>(reader: R, options: ScanOptions) -> Result<ScanReport> {
    ContainerScanner::with_options(reader, options)?.scan()
}
