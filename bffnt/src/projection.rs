//! Glyph projection: one editable record per mapped codepoint
//!
//! Joins the CMAP mapping, CWDH widths and TGLP cell grid. Glyph `index`
//! sits on sheet `index / (rows * cols)`; within the sheet, cells run along a
//! row of `rows` cells first (`grid_x = rem % rows`, `grid_y = rem / rows`).

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::cmap::{NO_GLYPH, RESERVED_CODE};
use crate::container::Platform;
use crate::cwdh::GlyphWidth;
use crate::tglp::Tglp;

/// A Unicode codepoint, written as `U+XXXX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Codepoint(pub u32);

impl Codepoint {
    /// Parse `U+XXXX`, `0xXXXX` or a decimal string
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_uppercase();
        let value = if let Some(hex) = text.strip_prefix("U+") {
            u32::from_str_radix(hex, 16).ok()?
        } else if let Some(hex) = text.strip_prefix("0X") {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            text.parse().ok()?
        };
        Some(Codepoint(value))
    }
}

impl fmt::Display for Codepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U+{:04X}", self.0)
    }
}

impl Serialize for Codepoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts integers and strings; anything unparsable becomes `None`
fn lenient_codepoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Codepoint>, D::Error> {
    struct CodepointVisitor;

    impl<'de> Visitor<'de> for CodepointVisitor {
        type Value = Option<Codepoint>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a codepoint as U+XXXX, 0xXXXX, decimal string or integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(u32::try_from(v).ok().map(Codepoint))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(u32::try_from(v).ok().map(Codepoint))
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Codepoint::parse(v))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(CodepointVisitor)
        }
    }

    deserializer.deserialize_option(CodepointVisitor)
}

/// Width triple as written in `font.json` (unclamped on input)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthRecord {
    pub left: i64,
    pub glyph: i64,
    #[serde(rename = "char")]
    pub char_width: i64,
}

impl WidthRecord {
    pub fn to_glyph_width(self) -> GlyphWidth {
        GlyphWidth::clamped(self.left, self.glyph, self.char_width)
    }
}

impl From<GlyphWidth> for WidthRecord {
    fn from(w: GlyphWidth) -> Self {
        Self {
            left: w.left as i64,
            glyph: w.glyph as i64,
            char_width: w.char_width as i64,
        }
    }
}

/// One glyph of the edit surface
///
/// `sheet`, `grid_x` and `grid_y` are derived on unpack and ignored on pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphEntry {
    #[serde(default, deserialize_with = "lenient_codepoint")]
    pub codepoint: Option<Codepoint>,
    #[serde(rename = "char", default)]
    pub character: String,
    pub index: u32,
    #[serde(default)]
    pub sheet: u32,
    #[serde(default)]
    pub grid_x: u32,
    #[serde(default)]
    pub grid_y: u32,
    #[serde(default)]
    pub width: Option<WidthRecord>,
}

impl GlyphEntry {
    /// Explicit codepoint, else the first character of `char`
    pub fn effective_codepoint(&self) -> Option<u32> {
        self.codepoint
            .map(|cp| cp.0)
            .or_else(|| self.character.chars().next().map(|c| c as u32))
    }
}

/// Display form of a codepoint (empty for control codes and non-characters)
fn display_char(code: u32) -> String {
    if code < 32 {
        return String::new();
    }
    char::from_u32(code).map(String::from).unwrap_or_default()
}

/// Build the glyph list from decoded sections, sorted by glyph index
///
/// `U+FFFF` is never listed. A glyph without a CWDH entry gets `width: null`.
pub fn build_glyphs(
    mapping: &BTreeMap<u32, u16>,
    widths: &BTreeMap<u32, GlyphWidth>,
    tglp: &Tglp,
) -> Vec<GlyphEntry> {
    let per_sheet = tglp.cells_per_sheet();
    let rows = tglp.rows as u32;

    let mut pairs: Vec<(u32, u32)> = mapping
        .iter()
        .filter(|&(&code, _)| code != RESERVED_CODE)
        .map(|(&code, &index)| (index as u32, code))
        .collect();
    pairs.sort_unstable();

    pairs
        .into_iter()
        .map(|(index, code)| {
            let (sheet, grid_x, grid_y) = if per_sheet == 0 {
                (0, 0, 0)
            } else {
                let rem = index % per_sheet;
                (index / per_sheet, rem % rows, rem / rows)
            };
            let width = widths.get(&index).copied().map(WidthRecord::from);
            debug!(
                "glyph {} '{}' U+{:04X} -> sheet {} ({}, {}) width {:?}",
                index,
                display_char(code),
                code,
                sheet,
                grid_x,
                grid_y,
                width
            );
            GlyphEntry {
                codepoint: Some(Codepoint(code)),
                character: display_char(code),
                index,
                sheet,
                grid_x,
                grid_y,
                width,
            }
        })
        .collect()
}

/// Codepoint to glyph index map requested by an edited glyph list
///
/// Later entries override earlier ones for the same codepoint. `U+FFFF`,
/// codes wider than the platform's CMAP codes and out-of-range glyph
/// indices are dropped.
pub fn desired_mapping(glyphs: &[GlyphEntry], platform: Platform) -> BTreeMap<u32, u16> {
    let mut map = BTreeMap::new();
    for glyph in glyphs {
        let Some(code) = glyph.effective_codepoint() else {
            continue;
        };
        if code == RESERVED_CODE || (!platform.wide_codes() && code > 0xFFFF) {
            continue;
        }
        if glyph.index >= NO_GLYPH as u32 {
            warn!("glyph index {} for U+{:04X} is out of range; ignored", glyph.index, code);
            continue;
        }
        map.insert(code, glyph.index as u16);
    }
    map
}

/// Width edits per glyph index; `width: null` means "leave as is"
pub fn desired_widths(glyphs: &[GlyphEntry]) -> BTreeMap<u32, GlyphWidth> {
    glyphs
        .iter()
        .filter_map(|g| g.width.map(|w| (g.index, w.to_glyph_width())))
        .collect()
}
