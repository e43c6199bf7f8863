//! File type box nested inside the sefd vendor box.

use tracing::warn;

use super::{BoxHeader, BoxType};
use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// Bytes consumed by a compact header, major brand and minor version.
const FTYP_MIN_SIZE: u64 = 16;

/// Parsed `ftyp` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtypBox {
    pub header: BoxHeader,
    pub major_brand: BoxType,
    pub minor_version: u32,
    pub minor_brands: Vec<BoxType>,
}

impl FtypBox {
    /// Parse an `ftyp` box starting at the cursor position.
    ///
    /// The minor brand count is `(size - consumed) / 4`. Trailing bytes that do
    /// not form a whole brand are skipped so the cursor ends at the box end.
    pub fn parse(cursor: &mut ByteCursor) -> Result<Self> {
        let header = BoxHeader::parse(cursor)?;
        if header.box_type != BoxType::FTYP {
            return Err(Error::invalid_box(
                header.box_type,
                "expected ftyp",
            ));
        }
        if header.size < FTYP_MIN_SIZE.max(u64::from(header.header_size)) {
            return Err(Error::invalid_box(
                BoxType::FTYP,
                format!("size {} too small", header.size),
            ));
        }

        let major_brand = BoxType::from_bytes(cursor.read_array()?);
        let minor_version = cursor.read_u32_be()?;

        let consumed = cursor.position() - header.offset;
        let remaining = header.size.checked_sub(consumed).ok_or_else(|| {
            Error::invalid_box(
                BoxType::FTYP,
                format!("size {} smaller than its fixed fields", header.size),
            )
        })?;
        let count = remaining / 4;
        let tail = (remaining % 4) as usize;

        let capacity = (count as usize).min(cursor.remaining() / 4);
        let mut minor_brands = Vec::with_capacity(capacity);
        for _ in 0..count {
            minor_brands.push(BoxType::from_bytes(cursor.read_array()?));
        }

        if tail != 0 {
            warn!(
                "ftyp at {} has {} trailing bytes after {} minor brands",
                header.offset, tail, count
            );
            cursor.skip(tail)?;
        }

        Ok(Self {
            header,
            major_brand,
            minor_version,
            minor_brands,
        })
    }
}
