//! Container header parsing
//!
//! # Header Layout
//!
//! ```text
//! FFNT / CFNT:                      RFNT / TNFR / RFNA:
//! 0x00: signature [4]               0x00: signature [4]
//! 0x04: BOM (u16, read big-endian)  0x04: BOM (u16, read big-endian)
//! 0x06: header size (u16)           0x08: version (u16)
//! 0x08: version (u32)               0x0E: header size (u16)
//! 0x0C: file size (u32)
//! ```
//!
//! A BOM of `0xFFFE` (as read big-endian) means the rest of the file is
//! little-endian. Everything else is big-endian.

use serde::{Deserialize, Serialize};

use crate::cursor::{ByteOrder, get_u16, get_u32};
use crate::error::{FontError, Result};

/// Minimum bytes needed to probe BOM and version
const DETECT_MIN_LEN: usize = 10;

/// Minimum bytes for a full header parse
const HEADER_MIN_LEN: usize = 16;

/// Offset of the file-size field in non-Wii headers
pub const FILE_SIZE_OFFSET: usize = 12;

/// First NX version (little-endian FFNT at or above this is NX, below is Ctr)
const NX_MIN_VERSION: u32 = 0x0401_0000;

/// Container signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Ffnt,
    Cfnt,
    Rfnt,
    Tnfr,
    Rfna,
}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.get(..4)? {
            b"FFNT" => Some(Signature::Ffnt),
            b"CFNT" => Some(Signature::Cfnt),
            b"RFNT" => Some(Signature::Rfnt),
            b"TNFR" => Some(Signature::Tnfr),
            b"RFNA" => Some(Signature::Rfna),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signature::Ffnt => "FFNT",
            Signature::Cfnt => "CFNT",
            Signature::Rfnt => "RFNT",
            Signature::Tnfr => "TNFR",
            Signature::Rfna => "RFNA",
        }
    }

    /// Wii-family containers use the short (16-bit version) header
    pub fn is_wii_family(self) -> bool {
        matches!(self, Signature::Rfnt | Signature::Tnfr | Signature::Rfna)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target platform, derived from signature, byte order and version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Ctr,
    Cafe,
    #[serde(rename = "NX")]
    Nx,
    Wii,
}

impl Platform {
    /// NX stores CMAP codes as u32
    pub fn wide_codes(self) -> bool {
        self == Platform::Nx
    }
}

/// Tagged sections inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Finf,
    Tglp,
    Cwdh,
    Cmap,
}

impl SectionKind {
    pub fn tag(self) -> &'static [u8; 4] {
        match self {
            SectionKind::Finf => b"FINF",
            SectionKind::Tglp => b"TGLP",
            SectionKind::Cwdh => b"CWDH",
            SectionKind::Cmap => b"CMAP",
        }
    }

    /// Fail with `BadSectionTag` unless `buf[offset..offset + 4]` is this tag
    pub fn expect_at(self, buf: &[u8], offset: usize) -> Result<()> {
        match buf.get(offset..offset.saturating_add(4)) {
            Some(tag) if tag == self.tag() => Ok(()),
            _ => Err(FontError::BadSectionTag {
                expected: self,
                offset,
            }),
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SectionKind::Finf => "FINF",
            SectionKind::Tglp => "TGLP",
            SectionKind::Cwdh => "CWDH",
            SectionKind::Cmap => "CMAP",
        })
    }
}

/// Result of probing the BOM and version fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected {
    pub byte_order: ByteOrder,
    pub version: u32,
    pub header_size: u16,
}

/// Probe byte order, version and header size for `signature`
pub fn detect(buf: &[u8], signature: Signature) -> Result<Detected> {
    if buf.len() < DETECT_MIN_LEN {
        return Err(FontError::CorruptFile { len: buf.len() });
    }
    let corrupt = |_| FontError::CorruptFile { len: buf.len() };

    let bom = get_u16(buf, 4, ByteOrder::Big).map_err(corrupt)?;
    let byte_order = if bom == 0xFFFE {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };

    let (version, header_size) = if signature.is_wii_family() {
        let version = get_u16(buf, 8, byte_order).map_err(corrupt)?;
        let header_size = get_u16(buf, 14, byte_order).map_err(corrupt)?;
        (version as u32, header_size)
    } else {
        let header_size = get_u16(buf, 6, byte_order).map_err(corrupt)?;
        let version = get_u32(buf, 8, byte_order).map_err(corrupt)?;
        (version, header_size)
    };

    Ok(Detected {
        byte_order,
        version,
        header_size,
    })
}

/// Derive the platform from header facts
pub fn determine_platform(signature: Signature, byte_order: ByteOrder, version: u32) -> Platform {
    match signature {
        Signature::Rfnt | Signature::Tnfr | Signature::Rfna => Platform::Wii,
        Signature::Cfnt => Platform::Ctr,
        Signature::Ffnt if byte_order == ByteOrder::Big => Platform::Cafe,
        Signature::Ffnt if version >= NX_MIN_VERSION => Platform::Nx,
        Signature::Ffnt => Platform::Ctr,
    }
}

/// Offset of the first occurrence of a section tag anywhere in the buffer
pub fn find_section(buf: &[u8], kind: SectionKind) -> Result<usize> {
    buf.windows(4)
        .position(|w| w == kind.tag())
        .ok_or(FontError::SectionNotFound(kind))
}

/// Parsed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub signature: Signature,
    pub byte_order: ByteOrder,
    /// BOM as read big-endian (`0xFEFF` or `0xFFFE`)
    pub bom: u16,
    pub version: u32,
    pub header_size: u16,
    pub platform: Platform,
}

impl Header {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_MIN_LEN {
            return Err(FontError::CorruptFile { len: buf.len() });
        }
        let signature = Signature::from_bytes(buf)
            .ok_or_else(|| FontError::UnknownSignature(String::from_utf8_lossy(&buf[..4]).into()))?;
        let detected = detect(buf, signature)?;
        let bom = get_u16(buf, 4, ByteOrder::Big)?;

        Ok(Self {
            signature,
            byte_order: detected.byte_order,
            bom,
            version: detected.version,
            header_size: detected.header_size,
            platform: determine_platform(signature, detected.byte_order, detected.version),
        })
    }

    pub fn little_endian(&self) -> bool {
        self.byte_order == ByteOrder::Little
    }

    /// Offset of the u32 file-size field, if this header carries one
    pub fn file_size_offset(&self) -> Option<usize> {
        (!self.signature.is_wii_family()).then_some(FILE_SIZE_OFFSET)
    }
}
