//! Box type codes and the generic box header.

use crate::cursor::ByteCursor;
use crate::Result;

/// Four-character box type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const ETYP: Self = Self(*b"etyp");
    pub const META: Self = Self(*b"meta");
    pub const MOOV: Self = Self(*b"moov");
    pub const MOOF: Self = Self(*b"moof");
    pub const MDAT: Self = Self(*b"mdat");
    pub const FREE: Self = Self(*b"free");
    pub const SKIP: Self = Self(*b"skip");
    pub const UUID: Self = Self(*b"uuid");
    /// Samsung motion photo vendor box.
    pub const SEFD: Self = Self(*b"sefd");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Root-level structural boxes the scanner skips without reading.
    pub fn is_structural(&self) -> bool {
        matches!(
            *self,
            Self::FTYP
                | Self::ETYP
                | Self::META
                | Self::MOOV
                | Self::MOOF
                | Self::MDAT
                | Self::FREE
                | Self::SKIP
        )
    }
}

impl std::fmt::Display for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Parsed box header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    /// Box type code.
    pub box_type: BoxType,
    /// Resolved box size including header. A `size32` of 1 is replaced by the
    /// 64-bit extended size that follows the type.
    pub size: u64,
    /// Offset of the first header byte in the buffer or stream it was read from.
    pub offset: u64,
    /// Size of the header (8, 16, 24 or 32 bytes).
    pub header_size: u8,
    /// Extended type, present only for `uuid` boxes.
    pub extended_type: Option<[u8; 16]>,
}

impl BoxHeader {
    /// Read a header at the cursor position.
    ///
    /// The declared size is not checked against the buffer; callers decide
    /// what a sane size is in their context. The cursor is left just past
    /// the header.
    pub fn parse(cursor: &mut ByteCursor) -> Result<Self> {
        let offset = cursor.position();
        let size32 = cursor.read_u32_be()?;
        let box_type = BoxType::from_bytes(cursor.read_array()?);

        let (size, mut header_size) = if size32 == 1 {
            (cursor.read_u64_be()?, 16u8)
        } else {
            (u64::from(size32), 8u8)
        };

        let extended_type = if box_type == BoxType::UUID {
            header_size += 16;
            Some(cursor.read_array::<16>()?)
        } else {
            None
        };

        Ok(Self {
            box_type,
            size,
            offset,
            header_size,
            extended_type,
        })
    }

    /// Offset one past the last byte of the box, if it fits in 64 bits.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }

    /// Offset where the box payload starts.
    pub fn data_offset(&self) -> u64 {
        self.offset + u64::from(self.header_size)
    }

    /// Payload size (size - header).
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(u64::from(self.header_size))
    }
}
