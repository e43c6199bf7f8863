//! Media data box nested inside the sefd vendor box.

use super::{BoxHeader, BoxType};
use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// Parsed `mdat` box. The payload is not copied; only its offsets are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdatBox {
    pub header: BoxHeader,
    start: u64,
    end: u64,
}

impl MdatBox {
    /// Parse an `mdat` box starting at the cursor position and leave the
    /// cursor at `box_start + size`.
    pub fn parse(cursor: &mut ByteCursor) -> Result<Self> {
        let header = BoxHeader::parse(cursor)?;
        if header.box_type != BoxType::MDAT {
            return Err(Error::invalid_box(header.box_type, "expected mdat"));
        }
        if header.size < u64::from(header.header_size) {
            return Err(Error::invalid_box(
                BoxType::MDAT,
                format!("size {} smaller than header", header.size),
            ));
        }

        let box_end = header.end().ok_or_else(|| {
            Error::invalid_box(BoxType::MDAT, format!("size {} overflows", header.size))
        })?;
        let start = cursor.position();
        let end = box_end - start;

        cursor.seek(box_end).map_err(|_| {
            Error::invalid_box(
                BoxType::MDAT,
                format!(
                    "payload ends at {} past buffer of {} bytes",
                    box_end,
                    cursor.len()
                ),
            )
        })?;

        Ok(Self { header, start, end })
    }

    /// Offset of the first payload byte, relative to the buffer the box was
    /// parsed from.
    pub fn start_position(&self) -> u64 {
        self.start
    }

    /// `box_start + size - start_position`.
    ///
    /// Despite the name this equals the payload length, not an absolute
    /// offset. Use [`MdatBox::payload_end`] for the absolute end.
    pub fn end_position(&self) -> u64 {
        self.end
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> u64 {
        self.header.data_size()
    }

    /// Offset one past the last payload byte, relative to the parse buffer.
    pub fn payload_end(&self) -> u64 {
        self.start + self.payload_len()
    }
}
