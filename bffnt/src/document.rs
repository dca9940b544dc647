//! `font.json`: the editable projection of a container
//!
//! Container metadata (`signature`, `bom`, `version`, `header_size`,
//! `platform`, `tglp` structural fields) is informational. The fields that
//! feed back into a pack are `finf`, the four safe `tglp` fields, `glyphs`
//! and the sheet images named by `sheet_png` / `png_ops`.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::container::Platform;
use crate::finf::FinfValues;
use crate::projection::GlyphEntry;
use crate::tglp::TglpValues;

/// Known typo that some hand-edited files carry
const BROKEN_CHAR_KEY: &str = "\"c:har\" \"";
const FIXED_CHAR_KEY: &str = "\"char\": \"";

/// Orientation applied to sheet images after decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PngOps {
    pub rotate180: bool,
    #[serde(rename = "flipY")]
    pub flip_y: bool,
}

/// Contents of `font.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontDocument {
    pub signature: String,
    pub bom: u16,
    pub version: u32,
    pub header_size: u16,
    pub platform: Option<Platform>,
    pub finf: FinfValues,
    pub tglp: TglpValues,
    #[serde(deserialize_with = "skip_bad_glyphs")]
    pub glyphs: Vec<GlyphEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sheet_png: Vec<String>,
    pub png_ops: PngOps,
    /// File name of the container this folder was unpacked from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Base64 copy of the original container bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_b64: Option<String>,
    /// Ignore `file_b64` and read the source container from disk
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignore_file_b64: bool,
    /// Log every patched glyph at info level
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub verbose_logs: bool,
}

/// Glyph list where an entry that does not parse (no integer `index`, for
/// instance) is dropped with a warning instead of failing the whole file
fn skip_bad_glyphs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GlyphEntry>, D::Error> {
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value(value) {
            Ok(glyph) => Some(glyph),
            Err(e) => {
                warn!("font.json: skipping glyph entry {}: {}", position, e);
                None
            }
        })
        .collect())
}

/// How a document was parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Clean,
    /// The `"c:har" "` typo was repaired before parsing
    Repaired,
}

impl FontDocument {
    /// Parse `font.json` text, repairing the `"c:har" "` typo once if needed
    pub fn from_json(text: &str) -> Result<(Self, ParseOutcome), serde_json::Error> {
        match serde_json::from_str(text) {
            Ok(doc) => Ok((doc, ParseOutcome::Clean)),
            Err(err) => {
                let fixed = text.replace(BROKEN_CHAR_KEY, FIXED_CHAR_KEY);
                if fixed == text {
                    return Err(err);
                }
                let doc = serde_json::from_str(&fixed)?;
                warn!("font.json: repaired malformed \"c:har\" key");
                Ok((doc, ParseOutcome::Repaired))
            }
        }
    }

    /// Pretty JSON with non-ASCII characters kept as-is
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
