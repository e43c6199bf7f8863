//! Motionphoto-Media: locating the video embedded in motion photos
//!
//! Phones store a short video clip inside the still image they capture. This
//! crate finds that clip without decoding either the image or the video.
//!
//! # Modules
//!
//! - `cursor` - In-memory byte cursor with explicit big/little-endian reads
//! - `heif` - HEIC root box scanner and the Samsung `sefd` vendor box
//! - `jpeg` - Google MicroVideo and Samsung trailer detection in JPEG files
//!
//! # Architecture
//!
//! The HEIC path works in two stages:
//!
//! 1. Root boxes are walked directly on the file stream. Structural boxes are
//!    skipped by seeking; nothing but headers is read.
//! 2. The `sefd` box is copied into memory and decoded through a
//!    [`ByteCursor`]: records first, then the nested `ftyp`/`mdat` boxes.
//!
//! Offsets from stage 2 are relative to the `sefd` buffer. [`MotionPhoto`]
//! adds the box's file offset to give ranges that can be copied straight out
//! of the source file.

pub mod cursor;
pub mod error;
pub mod heif;
pub mod jpeg;

pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use heif::{MotionPhoto, ScanOptions, ScanOutcome, ScanReport};
pub use jpeg::{JpegMotionPhoto, JpegVideoKind};
