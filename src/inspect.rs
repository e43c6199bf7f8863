//! Human and JSON views of a motion photo's layout.

use anyhow::{Context, Result};
use motionphoto_media::{heif, jpeg, MotionPhoto, ScanOptions};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::extract::SourceKind;

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub file: PathBuf,
    pub file_size: u64,
    pub format: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub root_boxes: Vec<RootBoxInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_box: Option<VendorBoxInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoInfo>,
}

#[derive(Debug, Serialize)]
pub struct RootBoxInfo {
    pub box_type: String,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct VendorBoxInfo {
    pub offset: u64,
    pub size: u64,
    pub version: u8,
    pub flags: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_time_millis: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcc: Option<String>,
    pub motion_photo_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_brand: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub minor_brands: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoInfo {
    pub kind: String,
    pub offset: u64,
    pub len: u64,
}

impl VendorBoxInfo {
    fn from_motion_photo(mp: &MotionPhoto) -> Self {
        let sefd = &mp.sefd;
        Self {
            offset: mp.vendor_offset,
            size: mp.vendor_size(),
            version: sefd.version,
            flags: sefd.flags,
            capture_time_millis: sefd.capture_time_millis(),
            mcc: sefd
                .mcc_data
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
            motion_photo_data: sefd.motion_photo_data,
            major_brand: sefd.ftyp().map(|f| f.major_brand.to_string()),
            minor_brands: sefd
                .ftyp()
                .map(|f| f.minor_brands.iter().map(|b| b.to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

/// Describe the layout of a file without extracting anything.
pub fn inspect_file(path: &Path, config: &Config) -> Result<InspectReport> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {:?}", path))?
        .len();

    let mut report = InspectReport {
        file: path.to_path_buf(),
        file_size,
        format: "unknown",
        root_boxes: Vec::new(),
        vendor_box: None,
        video: None,
    };

    match SourceKind::sniff(path)? {
        Some(SourceKind::Heif) => {
            report.format = "heif";
            let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
            let scan = heif::parse_with_options(BufReader::new(file), ScanOptions::from(&config.scan))
                .with_context(|| format!("Failed to parse HEIF {:?}", path))?;

            report.root_boxes = scan
                .root_boxes
                .iter()
                .map(|b| RootBoxInfo {
                    box_type: b.box_type.to_string(),
                    offset: b.offset,
                    size: b.size,
                })
                .collect();

            if let Some(mp) = scan.motion_photo() {
                report.vendor_box = Some(VendorBoxInfo::from_motion_photo(mp));
                if mp.has_video() {
                    report.video = mp.payload_range().map(|r| VideoInfo {
                        kind: "mdat payload".to_string(),
                        offset: r.start,
                        len: r.end - r.start,
                    });
                }
            }
        }
        Some(SourceKind::Jpeg) => {
            report.format = "jpeg";
            let found = jpeg::open(path).with_context(|| format!("Failed to parse JPEG {:?}", path))?;
            report.video = found.map(|j| VideoInfo {
                kind: j.kind.to_string(),
                offset: j.video_offset,
                len: j.video_len,
            });
        }
        None => {}
    }

    Ok(report)
}

impl InspectReport {
    pub fn print_text(&self) {
        println!("File: {}", self.file.display());
        println!("Format: {}", self.format);
        println!("Size: {} bytes", self.file_size);

        if !self.root_boxes.is_empty() {
            println!("\nRoot boxes: {}", self.root_boxes.len());
            for b in &self.root_boxes {
                println!("  {} @ {} ({} bytes)", b.box_type, b.offset, b.size);
            }
        }

        if let Some(ref vendor) = self.vendor_box {
            println!("\nsefd box @ {} ({} bytes)", vendor.offset, vendor.size);
            println!("  Version: {}, flags: {:#08x}", vendor.version, vendor.flags);
            if let Some(millis) = vendor.capture_time_millis {
                println!("  Capture time: {} ms since epoch", millis);
            }
            if let Some(ref mcc) = vendor.mcc {
                println!("  MCC: {}", mcc);
            }
            println!("  Motion photo marker: {}", vendor.motion_photo_data);
            if let Some(ref brand) = vendor.major_brand {
                print!("  Embedded ftyp: {}", brand);
                if !vendor.minor_brands.is_empty() {
                    print!(" [{}]", vendor.minor_brands.join(", "));
                }
                println!();
            }
        }

        match self.video {
            Some(ref video) => println!(
                "\nVideo: {} @ {} ({} bytes)",
                video.kind, video.offset, video.len
            ),
            None => println!("\nVideo: none"),
        }
    }
}
