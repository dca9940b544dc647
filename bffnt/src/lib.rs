//! BFFNT: decoder and surgical re-encoder for Nintendo binary font containers
//!
//! Reads `FFNT`/`CFNT`/`RFNT` (and `TNFR`/`RFNA`) containers into an editable
//! projection and writes edits back by overwriting bytes in place. Sections
//! are never relocated or re-serialized; the only growth is an optional CMAP
//! override segment appended at the end of the file.
//!
//! # Modules
//!
//! - [`container`] - Signature, byte order, platform and section lookup
//! - [`finf`], [`tglp`], [`cwdh`], [`cmap`] - Section decoders and in-place writers
//! - [`font`] - All sections decoded from one byte snapshot
//! - [`projection`], [`document`] - The `font.json` edit surface
//! - [`sheet_image`] - Sheet images as sample grids, behind an I/O trait
//! - [`patch`] - Ordered rewrite phases
//! - [`verify`] - Content hashes of input and output
//! - [`folder`] - Unpack to / pack from a folder on disk
//!
//! # Example
//!
//! ```no_run
//! use bffnt::{Edits, Font, apply_edits};
//!
//! let original = std::fs::read("ui.bffnt").unwrap();
//! let font = Font::parse(&original).unwrap();
//!
//! let mut glyphs = font.glyphs();
//! for glyph in &mut glyphs {
//!     if glyph.index == 140 {
//!         glyph.width = Some(bffnt::WidthRecord { left: 2, glyph: 10, char_width: 8 });
//!     }
//! }
//! let edits = Edits {
//!     glyphs: Some(glyphs),
//!     ..Default::default()
//! };
//! let (bytes, report) = apply_edits(&original, &edits).unwrap();
//! assert_eq!(report.widths_patched, 1);
//! std::fs::write("ui.bffnt", bytes).unwrap();
//! ```

pub mod cmap;
pub mod container;
pub mod cursor;
pub mod cwdh;
pub mod document;
pub mod error;
pub mod finf;
pub mod folder;
pub mod font;
pub mod patch;
pub mod projection;
pub mod sheet_image;
pub mod tglp;
pub mod verify;

pub use container::{Header, Platform, SectionKind, Signature};
pub use cursor::ByteOrder;
pub use cwdh::GlyphWidth;
pub use document::{FontDocument, ParseOutcome, PngOps};
pub use error::{FontError, Result, SheetError};
pub use finf::{FinfField, FinfValues};
pub use folder::{
    PackOptions, PackOutcome, UnpackOptions, is_font_file, pack_folder, unpack_batch, unpack_dir, unpack_file,
};
pub use font::Font;
pub use patch::{Edits, PackReport, SheetOutcome, apply_edits};
pub use projection::{Codepoint, GlyphEntry, WidthRecord};
pub use sheet_image::{MemorySheetIo, PngSheetIo, SampleGrid, SheetImageIo};
pub use tglp::TglpValues;
pub use verify::{Verification, content_hash};
