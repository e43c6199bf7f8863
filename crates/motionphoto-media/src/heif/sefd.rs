//! Samsung `sefd` vendor box.
//!
//! Layout after the generic header:
//!
//! ```text
//! version   u8
//! flags     u24 big-endian
//! records   { name_len: u32 little-endian, name: [u8; name_len], value? }*
//! ftyp      nested box
//! mdat      nested box
//! ```
//!
//! Data records carry a NUL-terminated value followed by 3 bytes that are
//! discarded. The `MotionPhoto_Data` record has no value and ends the record
//! list; the nested boxes describing the embedded clip follow it. Records with
//! any other name are read as data records and kept in
//! [`SefdBox::other_records`].

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::{BoxHeader, BoxType, FtypBox, MdatBox};
use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// Bytes after a data record value that carry no information.
const RECORD_TRAILER_LEN: usize = 3;

/// Record names understood inside a `sefd` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SefdRecord {
    /// Capture time, milliseconds since the epoch as ASCII digits.
    ImageUtcData,
    /// Mobile country code of the capturing device.
    MccData,
    /// Marks the start of the embedded video.
    MotionPhotoData,
}

impl SefdRecord {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Image_UTC_Data" => Some(Self::ImageUtcData),
            b"MCC_Data" => Some(Self::MccData),
            b"MotionPhoto_Data" => Some(Self::MotionPhotoData),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ImageUtcData => "Image_UTC_Data",
            Self::MccData => "MCC_Data",
            Self::MotionPhotoData => "MotionPhoto_Data",
        }
    }
}

/// Parsed `sefd` box.
#[derive(Debug, Clone)]
pub struct SefdBox {
    pub header: BoxHeader,
    pub version: u8,
    /// Only the low 24 bits are significant.
    pub flags: u32,
    pub image_utc_data: Option<Bytes>,
    pub mcc_data: Option<Bytes>,
    /// Whether the `MotionPhoto_Data` marker record was seen.
    pub motion_photo_data: bool,
    /// Data records with unrecognized names, as `(name, value)`.
    pub other_records: Vec<(Bytes, Bytes)>,
    ftyp: Option<FtypBox>,
    ftyp_start: Option<u64>,
    mdat: Option<MdatBox>,
}

impl SefdBox {
    /// Parse a `sefd` box starting at the cursor position.
    ///
    /// The whole declared box must be present in the buffer.
    pub fn parse(cursor: &mut ByteCursor) -> Result<Self> {
        let header = BoxHeader::parse(cursor)?;
        if header.box_type != BoxType::SEFD {
            return Err(Error::invalid_box(header.box_type, "expected sefd"));
        }
        let box_end = header.end().ok_or_else(|| {
            Error::invalid_box(BoxType::SEFD, format!("size {} overflows", header.size))
        })?;
        if header.size < u64::from(header.header_size) + 4 {
            return Err(Error::invalid_box(
                BoxType::SEFD,
                format!("size {} too small for a full box", header.size),
            ));
        }
        if box_end > cursor.len() {
            return Err(Error::BufferUnderflow {
                need: usize::try_from(header.size).unwrap_or(usize::MAX),
                have: (cursor.len() - header.offset) as usize,
            });
        }

        let version = cursor.read_u8()?;
        let flags = cursor.read_u24_be()?;

        let mut sefd = Self {
            header,
            version,
            flags,
            image_utc_data: None,
            mcc_data: None,
            motion_photo_data: false,
            other_records: Vec::new(),
            ftyp: None,
            ftyp_start: None,
            mdat: None,
        };

        sefd.parse_records(cursor, box_end)?;
        sefd.parse_nested(cursor, box_end)?;

        debug!(
            "sefd: size={} version={} flags={:#08x} motion_photo={} ftyp={:?} mdat={:?}",
            sefd.header.size,
            sefd.version,
            sefd.flags,
            sefd.motion_photo_data,
            sefd.ftyp_start,
            sefd.mdat.as_ref().map(|m| (m.start_position(), m.payload_len()))
        );

        Ok(sefd)
    }

    /// Walk the record list until the marker record or the box end.
    fn parse_records(&mut self, cursor: &mut ByteCursor, box_end: u64) -> Result<()> {
        while !self.motion_photo_data && cursor.position() < box_end {
            let name_len = cursor.read_u32_le()? as usize;
            let name = cursor.read(name_len)?;

            match SefdRecord::from_name(&name) {
                Some(record) => {
                    trace!("sefd record {} at {}", record.name(), cursor.position());
                    match record {
                        SefdRecord::ImageUtcData => {
                            self.image_utc_data = Some(Self::read_record_value(cursor)?);
                        }
                        SefdRecord::MccData => {
                            self.mcc_data = Some(Self::read_record_value(cursor)?);
                        }
                        SefdRecord::MotionPhotoData => {
                            self.motion_photo_data = true;
                        }
                    }
                }
                None => {
                    warn!(
                        "sefd: unrecognized record {:?} at {}",
                        String::from_utf8_lossy(&name),
                        cursor.position()
                    );
                    let value = Self::read_record_value(cursor)?;
                    self.other_records.push((name.clone(), value));
                }
            }

            if cursor.position() > box_end {
                return Err(Error::invalid_box(
                    BoxType::SEFD,
                    format!(
                        "record {:?} runs past box end {}",
                        String::from_utf8_lossy(&name),
                        box_end
                    ),
                ));
            }
        }
        Ok(())
    }

    fn read_record_value(cursor: &mut ByteCursor) -> Result<Bytes> {
        let value = cursor.read_nul_terminated()?;
        cursor.skip(RECORD_TRAILER_LEN)?;
        Ok(value)
    }

    /// Parse the `ftyp`/`mdat` boxes that follow the records. Stops at the
    /// first other box type, leaving the cursor on it.
    fn parse_nested(&mut self, cursor: &mut ByteCursor, box_end: u64) -> Result<()> {
        loop {
            let start = cursor.position();
            if box_end - start < 8 {
                break;
            }

            // size32 and type are enough to dispatch
            cursor.skip(4)?;
            let box_type = BoxType::from_bytes(cursor.read_array()?);
            cursor.seek(start)?;

            match box_type {
                BoxType::FTYP => {
                    self.ftyp_start = Some(start);
                    self.ftyp = Some(FtypBox::parse(cursor)?);
                }
                BoxType::MDAT => {
                    self.mdat = Some(MdatBox::parse(cursor)?);
                }
                other => {
                    debug!("sefd: stopping at nested {} box at {}", other, start);
                    break;
                }
            }

            if cursor.position() > box_end {
                return Err(Error::invalid_box(
                    box_type,
                    format!("nested box at {} runs past sefd end {}", start, box_end),
                ));
            }
        }
        Ok(())
    }

    /// Declared size of the box.
    pub fn size(&self) -> u64 {
        self.header.size
    }

    pub fn ftyp(&self) -> Option<&FtypBox> {
        self.ftyp.as_ref()
    }

    pub fn mdat(&self) -> Option<&MdatBox> {
        self.mdat.as_ref()
    }

    /// Offset of the nested `ftyp` box within the sefd buffer.
    pub fn ftyp_start_offset(&self) -> Option<u64> {
        self.ftyp_start
    }

    /// Capture time from `Image_UTC_Data`, in milliseconds since the epoch.
    pub fn capture_time_millis(&self) -> Option<u64> {
        let raw = self.image_utc_data.as_ref()?;
        std::str::from_utf8(raw).ok()?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn record(buf: &mut BytesMut, name: &str, value: Option<&[u8]>) {
        buf.put_u32_le(name.len() as u32);
        buf.put_slice(name.as_bytes());
        if let Some(value) = value {
            buf.put_slice(value);
            buf.put_u8(0);
            buf.put_bytes(0xCC, RECORD_TRAILER_LEN);
        }
    }

    fn ftyp_box(buf: &mut BytesMut, major: &[u8; 4]) {
        buf.put_u32(16);
        buf.put_slice(b"ftyp");
        buf.put_slice(major);
        buf.put_u32(0);
    }

    fn mdat_box(buf: &mut BytesMut, payload: &[u8]) {
        buf.put_u32(8 + payload.len() as u32);
        buf.put_slice(b"mdat");
        buf.put_slice(payload);
    }

    fn sefd(body: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32(12 + body.len() as u32);
        buf.put_slice(b"sefd");
        buf.put_u8(0);
        buf.put_slice(&[0, 0, 0]);
        buf.put_slice(body);
        buf.to_vec()
    }

    fn motion_body(payload: &[u8]) -> BytesMut {
        let mut body = BytesMut::new();
        record(&mut body, "Image_UTC_Data", Some(b"1633024800000"));
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, payload);
        body
    }

    #[test]
    fn test_full_motion_photo() {
        let data = sefd(&motion_body(b"frames"));
        let len = data.len() as u64;
        let mut cursor = ByteCursor::new(data);

        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert!(sefd.motion_photo_data);
        assert_eq!(sefd.size(), len);
        assert_eq!(sefd.capture_time_millis(), Some(1_633_024_800_000));
        assert_eq!(sefd.ftyp().unwrap().major_brand, BoxType(*b"mp42"));

        let ftyp_start = sefd.ftyp_start_offset().unwrap();
        let mdat = sefd.mdat().unwrap();
        assert_eq!(ftyp_start + 16 + 8, mdat.start_position());
        assert_eq!(mdat.payload_len(), 6);
        // Every byte of the box was consumed
        assert_eq!(cursor.position(), len);
    }

    #[test]
    fn test_unrecognized_record_kept_as_data() {
        let mut body = BytesMut::new();
        record(&mut body, "abcd", Some(b"XYZ"));
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, b"v");
        let mut cursor = ByteCursor::new(sefd(&body));

        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert!(sefd.motion_photo_data);
        assert_eq!(sefd.other_records.len(), 1);
        assert_eq!(&sefd.other_records[0].0[..], b"abcd");
        assert_eq!(&sefd.other_records[0].1[..], b"XYZ");
        assert_eq!(sefd.mdat().unwrap().payload_len(), 1);
    }

    #[test]
    fn test_unterminated_unrecognized_record() {
        let mut body = BytesMut::new();
        body.put_u32_le(4);
        body.put_slice(b"abcd");
        body.put_slice(b"no terminator");
        let mut cursor = ByteCursor::new(sefd(&body));
        assert!(matches!(
            SefdBox::parse(&mut cursor),
            Err(Error::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_value_and_trailer_skipped() {
        let mut body = BytesMut::new();
        record(&mut body, "MCC_Data", Some(b"450"));
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, &[]);
        let mut cursor = ByteCursor::new(sefd(&body));
        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert_eq!(sefd.mcc_data.as_deref(), Some(&b"450"[..]));
        assert_eq!(
            sefd.mdat().unwrap().start_position(),
            sefd.mdat().unwrap().payload_end()
        );
    }

    #[test]
    fn test_declared_size_exceeds_buffer() {
        let mut data = sefd(&motion_body(b"frames"));
        let declared = data.len() as u32 + 100;
        data[..4].copy_from_slice(&declared.to_be_bytes());
        let mut cursor = ByteCursor::new(data);
        assert!(matches!(
            SefdBox::parse(&mut cursor),
            Err(Error::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_records_exhaust_box_without_marker() {
        let mut body = BytesMut::new();
        record(&mut body, "Image_UTC_Data", Some(b"1"));
        let mut cursor = ByteCursor::new(sefd(&body));

        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert!(!sefd.motion_photo_data);
        assert!(sefd.ftyp().is_none());
        assert!(sefd.mdat().is_none());
    }

    #[test]
    fn test_truncated_record_name() {
        let mut body = BytesMut::new();
        body.put_u32_le(64);
        body.put_slice(b"Image");
        let mut cursor = ByteCursor::new(sefd(&body));
        assert!(matches!(
            SefdBox::parse(&mut cursor),
            Err(Error::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_record_length_is_little_endian() {
        let mut body = BytesMut::new();
        // Big-endian 16 would read as 0x10000000 and underflow
        body.put_slice(&16u32.to_le_bytes());
        body.put_slice(b"MotionPhoto_Data");
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, b"x");
        let mut cursor = ByteCursor::new(sefd(&body));
        assert!(SefdBox::parse(&mut cursor).unwrap().motion_photo_data);
    }

    #[test]
    fn test_nested_scan_stops_at_other_box() {
        let mut body = BytesMut::new();
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, b"abc");
        let moov_at = body.len();
        body.put_u32(8);
        body.put_slice(b"moov");
        let mut cursor = ByteCursor::new(sefd(&body));

        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert!(sefd.mdat().is_some());
        assert_eq!(cursor.position(), 12 + moov_at as u64);
    }

    #[test]
    fn test_nested_scan_stops_at_short_uuid_box() {
        let mut body = BytesMut::new();
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, b"abc");
        let uuid_at = body.len();
        // Header only: no room for the 16-byte extended type
        body.put_u32(8);
        body.put_slice(b"uuid");
        let mut cursor = ByteCursor::new(sefd(&body));

        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert_eq!(sefd.mdat().unwrap().payload_len(), 3);
        assert_eq!(cursor.position(), 12 + uuid_at as u64);
    }

    #[test]
    fn test_nested_scan_stops_at_largesize_box() {
        let mut body = BytesMut::new();
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, b"abc");
        body.put_u32(1);
        body.put_slice(b"free");
        let mut cursor = ByteCursor::new(sefd(&body));

        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert!(sefd.ftyp().is_some());
        assert!(sefd.mdat().is_some());
    }

    #[test]
    fn test_nested_box_overruns_sefd() {
        let mut body = BytesMut::new();
        record(&mut body, "MotionPhoto_Data", None);
        ftyp_box(&mut body, b"mp42");
        mdat_box(&mut body, b"abcdef");
        let mut data = sefd(&body);
        // Shrink the declared sefd size so mdat spills past it
        let declared = data.len() as u32 - 4;
        data[..4].copy_from_slice(&declared.to_be_bytes());
        let mut cursor = ByteCursor::new(data);
        assert!(matches!(
            SefdBox::parse(&mut cursor),
            Err(Error::InvalidBox { .. })
        ));
    }

    #[test]
    fn test_flags_are_24_bit_big_endian() {
        let mut data = sefd(&motion_body(b""));
        data[9..12].copy_from_slice(&[0x00, 0x01, 0x02]);
        data[8] = 1;
        let mut cursor = ByteCursor::new(data);
        let sefd = SefdBox::parse(&mut cursor).unwrap();
        assert_eq!(sefd.version, 1);
        assert_eq!(sefd.flags, 0x000102);
    }
}
