//! Font container error types

use crate::container::SectionKind;

/// Errors raised while decoding or patching a font container
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    /// Buffer too short to hold a container header
    #[error("file is too small or damaged ({len} bytes)")]
    CorruptFile { len: usize },

    /// First four bytes are not a known container signature
    #[error("unknown signature {0:?}")]
    UnknownSignature(String),

    /// A required section could not be located
    #[error("{0} section not found")]
    SectionNotFound(SectionKind),

    /// A section pointer lands on bytes that do not carry the expected tag
    #[error("expected {expected} section at 0x{offset:X}")]
    BadSectionTag { expected: SectionKind, offset: usize },

    /// TGLP sheet data offset is zero or outside the file
    #[error("invalid sheet data offset 0x{0:X}")]
    InvalidOffset(usize),

    /// A glyph sheet extends past the end of the file
    #[error("sheet {index} ends at 0x{end:X}, past the end of the file (0x{len:X} bytes)")]
    Truncated { index: usize, end: usize, len: usize },

    /// CMAP segment uses a mapping method other than Direct/Table/Scan
    #[error("unknown CMAP mapping method {method} at 0x{offset:X}")]
    UnknownMappingMethod { method: u16, offset: usize },

    /// CMAP override segment cannot list this many pairs (u16 count)
    #[error("{count} CMAP pairs do not fit one Scan segment (max 65535)")]
    TooManyPairs { count: usize },

    /// A read or write would run past the end of the buffer
    #[error("access of {size} bytes at 0x{offset:X} runs past the end of the buffer")]
    OutOfBounds { offset: usize, size: usize },
}

/// Result alias for container operations
pub type Result<T> = std::result::Result<T, FontError>;

/// Why a glyph sheet could not be converted to or from samples
///
/// Never fatal for the file: the sheet is reported and left alone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
    /// Geometry does not describe a BC4 block grid
    #[error("sheet format 0x{format:X} ({width}x{height}, {size} bytes) is not a BC4 block grid")]
    Unsupported {
        format: u16,
        width: u16,
        height: u16,
        size: u32,
    },

    /// Edit image does not match the sheet dimensions
    #[error("image is {actual_width}x{actual_height}, expected {width}x{height}")]
    WrongDimensions {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Swizzle or block codec failure
    #[error(transparent)]
    Codec(#[from] gx2_tex::TexError),
}
