//! Root-level box scanner over a file stream.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::{debug, trace, warn};

use super::{BoxHeader, BoxType, MotionPhoto, RootBox, ScanOutcome, ScanReport, SefdBox};
use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// Default limit on the buffered vendor box (256 MB).
pub const DEFAULT_MAX_VENDOR_BOX_SIZE: u64 = 256 * 1024 * 1024;

/// Scanner settings.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Largest `sefd` box that will be read into memory.
    pub max_vendor_box_size: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_vendor_box_size: DEFAULT_MAX_VENDOR_BOX_SIZE,
        }
    }
}

/// Walks sibling boxes at the root of a HEIF stream.
///
/// Structural and unknown boxes are skipped by seeking past them. The first
/// `sefd` box is copied into memory and decoded.
pub struct ContainerScanner<R> {
    reader: R,
    stream_len: u64,
    options: ScanOptions,
}

impl<R: Read + Seek> ContainerScanner<R> {
    /// Create a scanner with default options.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, ScanOptions::default())
    }

    /// Create a scanner with custom options.
    pub fn with_options(mut reader: R, options: ScanOptions) -> Result<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            reader,
            stream_len,
            options,
        })
    }

    /// Length of the underlying stream.
    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    /// Scan every root box.
    ///
    /// Any structural violation aborts the scan. Running out of input
    /// exactly at a box boundary ends it normally.
    pub fn scan(&mut self) -> Result<ScanReport> {
        let mut root_boxes = Vec::new();
        let mut motion_photo = None;

        while let Some(header) = self.read_root_header()? {
            let root = RootBox {
                box_type: header.box_type,
                offset: header.offset,
                size: header.size,
            };
            trace!("root box {} at {} ({} bytes)", root.box_type, root.offset, root.size);
            root_boxes.push(root);

            if header.box_type == BoxType::SEFD {
                if motion_photo.is_none() {
                    let sefd = self.read_sefd(&header)?;
                    motion_photo = Some(MotionPhoto {
                        vendor_offset: header.offset,
                        sefd,
                    });
                } else {
                    warn!("ignoring additional sefd box at {}", header.offset);
                }
            } else if !header.box_type.is_structural() {
                debug!("skipping unknown root box {} at {}", header.box_type, header.offset);
            }

            // Validated in read_root_header
            let next = header.offset + header.size;
            self.reader.seek(SeekFrom::Start(next))?;
        }

        let outcome = match motion_photo {
            Some(motion_photo) => ScanOutcome::Found(motion_photo),
            None => ScanOutcome::NoVendorBox,
        };

        Ok(ScanReport {
            root_boxes,
            outcome,
        })
    }

    /// Read and validate the header at the current stream position, then
    /// seek back to the box start.
    ///
    /// Returns `None` when the stream is exhausted before the first byte.
    fn read_root_header(&mut self) -> Result<Option<BoxHeader>> {
        let offset = self.reader.stream_position()?;

        let mut compact = [0u8; 8];
        match read_full(&mut self.reader, &mut compact)? {
            0 => return Ok(None),
            8 => {}
            _ => return Err(Error::TruncatedHeader { offset }),
        }

        let size32 = u32::from_be_bytes([compact[0], compact[1], compact[2], compact[3]]);
        let box_type = BoxType::from_bytes([compact[4], compact[5], compact[6], compact[7]]);

        let (size, mut header_size) = if size32 == 1 {
            let mut ext = [0u8; 8];
            if read_full(&mut self.reader, &mut ext)? != ext.len() {
                return Err(Error::TruncatedHeader { offset });
            }
            (u64::from_be_bytes(ext), 16u8)
        } else {
            (u64::from(size32), 8u8)
        };

        let extended_type = if box_type == BoxType::UUID {
            let mut uuid = [0u8; 16];
            if read_full(&mut self.reader, &mut uuid)? != uuid.len() {
                return Err(Error::TruncatedHeader { offset });
            }
            header_size += 16;
            Some(uuid)
        } else {
            None
        };

        if size < u64::from(header_size) {
            return Err(Error::BoxTooSmall { offset, size });
        }
        let end = offset
            .checked_add(size)
            .ok_or(Error::BoxOverflow { offset, size })?;
        if end > self.stream_len {
            return Err(Error::BoxOutOfBounds {
                offset,
                size,
                stream_len: self.stream_len,
            });
        }

        self.reader.seek(SeekFrom::Start(offset))?;

        Ok(Some(BoxHeader {
            box_type,
            size,
            offset,
            header_size,
            extended_type,
        }))
    }

    /// Copy the whole vendor box into memory and decode it.
    fn read_sefd(&mut self, header: &BoxHeader) -> Result<SefdBox> {
        if header.size > self.options.max_vendor_box_size {
            return Err(Error::BoxTooLarge {
                size: header.size,
                max: self.options.max_vendor_box_size,
            });
        }

        self.reader.seek(SeekFrom::Start(header.offset))?;
        let mut data = vec![0u8; header.size as usize];
        self.reader.read_exact(&mut data)?;

        debug!("buffered sefd box at {} ({} bytes)", header.offset, header.size);
        let mut cursor = ByteCursor::new(data);
        SefdBox::parse(&mut cursor)
    }
}

/// Read until `buf` is full or the stream ends, returning the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn root_box(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        data.extend_from_slice(box_type);
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_skips_structural_and_unknown_boxes() {
        let mut data = root_box(b"ftyp", b"heicmif1");
        data.extend(root_box(b"iinf", &[1, 2, 3]));
        data.extend(root_box(b"mdat", &[0; 32]));

        let mut scanner = ContainerScanner::new(Cursor::new(data)).unwrap();
        let report = scanner.scan().unwrap();

        let types: Vec<_> = report.root_boxes.iter().map(|b| b.box_type).collect();
        assert_eq!(types, vec![BoxType::FTYP, BoxType(*b"iinf"), BoxType::MDAT]);
        assert_eq!(report.root_boxes[2].offset, 16 + 11);
        assert!(matches!(report.outcome, ScanOutcome::NoVendorBox));
    }

    #[test]
    fn test_empty_stream() {
        let mut scanner = ContainerScanner::new(Cursor::new(Vec::new())).unwrap();
        let report = scanner.scan().unwrap();
        assert!(report.root_boxes.is_empty());
        assert!(matches!(report.outcome, ScanOutcome::NoVendorBox));
    }

    #[test]
    fn test_box_smaller_than_header() {
        let mut data = root_box(b"ftyp", b"heic");
        data[3] = 4;
        let mut scanner = ContainerScanner::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            scanner.scan(),
            Err(Error::BoxTooSmall { offset: 0, size: 4 })
        ));
    }

    #[test]
    fn test_zero_size_root_box_rejected() {
        let mut data = root_box(b"free", b"");
        data[3] = 0;
        let mut scanner = ContainerScanner::new(Cursor::new(data)).unwrap();
        assert!(matches!(scanner.scan(), Err(Error::BoxTooSmall { .. })));
    }

    #[test]
    fn test_box_past_stream_end() {
        let mut data = root_box(b"ftyp", b"heicmif1");
        data.extend(root_box(b"meta", &[0; 8]));
        let len = data.len();
        data[16 + 3] = 200;

        let mut scanner = ContainerScanner::new(Cursor::new(data)).unwrap();
        match scanner.scan() {
            Err(Error::BoxOutOfBounds {
                offset,
                size,
                stream_len,
            }) => {
                assert_eq!(offset, 16);
                assert_eq!(size, 200);
                assert_eq!(stream_len, len as u64);
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.root_boxes)),
        }
    }

    #[test]
    fn test_large_size_overflow() {
        let mut data = root_box(b"free", b"");
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&u64::MAX.to_be_bytes());

        let mut scanner = ContainerScanner::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            scanner.scan(),
            Err(Error::BoxOverflow { offset: 8, .. })
        ));
    }

    #[test]
    fn test_truncated_header_mid_read() {
        let mut data = root_box(b"free", b"");
        data.extend_from_slice(&[0, 0, 0]);
        let mut scanner = ContainerScanner::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            scanner.scan(),
            Err(Error::TruncatedHeader { offset: 8 })
        ));
    }

    #[test]
    fn test_vendor_box_limit() {
        let data = root_box(b"sefd", &[0; 64]);
        let options = ScanOptions {
            max_vendor_box_size: 32,
        };
        let mut scanner = ContainerScanner::with_options(Cursor::new(data), options).unwrap();
        assert!(matches!(
            scanner.scan(),
            Err(Error::BoxTooLarge { size: 72, max: 32 })
        ));
    }
}
