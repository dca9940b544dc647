//! Folder workflow: a container unpacked to `font.json` plus sheet PNGs
//!
//! `unpack_file("ui/font.bffnt")` writes `ui/font/font.json` and
//! `ui/font/sheet_<i>[.rot180][.flipY].png`. `pack_folder("ui/font")` reads
//! them back, applies the edits to the original bytes and writes the new
//! container (by default `ui/font/font.bffnt`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::document::{FontDocument, PngOps};
use crate::font::Font;
use crate::patch::{Edits, PackReport, apply_edits};
use crate::sheet_image::{SampleGrid, SheetImageIo};

/// Name of the projection file inside an unpacked folder
pub const DOCUMENT_NAME: &str = "font.json";

/// Container file extensions, lowercase
pub const FONT_EXTENSIONS: [&str; 3] = ["bffnt", "bcfnt", "brfnt"];

/// Environment variable that turns on per-glyph pack logging
pub const VERBOSE_ENV: &str = "BFFNT_VERBOSE";

/// Output name when `font.json` does not record its source file
const DEFAULT_OUTPUT_NAME: &str = "repacked.bffnt";

/// File name suffixes tried, in order, when `sheet_png` does not name a sheet
const ORIENTATION_SUFFIXES: [&str; 5] = ["", ".flipY", ".rot180", ".rot180.flipY", ".flipY.rot180"];

/// True if `path` has one of the container extensions (any case)
pub fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// True if [`VERBOSE_ENV`] is set to anything non-empty
pub fn verbose_from_env() -> bool {
    std::env::var_os(VERBOSE_ENV).is_some_and(|v| !v.is_empty())
}

/// `sheet_<index>[.rot180][.flipY].png`
pub fn sheet_file_name(index: usize, ops: PngOps) -> String {
    let mut name = format!("sheet_{index}");
    if ops.rotate180 {
        name.push_str(".rot180");
    }
    if ops.flip_y {
        name.push_str(".flipY");
    }
    name.push_str(".png");
    name
}

/// Unpack settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Rotate sheet images by 180 degrees after decoding
    pub rotate180: bool,
    /// Mirror sheet images top to bottom after decoding
    pub flip_y: bool,
    /// Store the container bytes in `font.json` as base64
    pub embed_source: bool,
}

/// Folder that [`unpack_file`] writes for `path`: `<parent>/<stem>`
pub fn unpack_dir(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .with_context(|| format!("Font path has no file name: {}", path.display()))?;
    Ok(path.parent().unwrap_or_else(|| Path::new("")).join(stem))
}

/// Unpack `path` into `<parent>/<stem>/`, replacing any previous output
///
/// Sheets that cannot be decoded get no PNG; everything else about the
/// font is still written.
pub fn unpack_file(path: &Path, opts: &UnpackOptions, io: &dyn SheetImageIo) -> Result<PathBuf> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read font: {}", path.display()))?;
    let font = Font::parse(&bytes).with_context(|| format!("Failed to decode font: {}", path.display()))?;

    let out_dir = unpack_dir(path)?;
    if out_dir.is_dir() {
        fs::remove_dir_all(&out_dir)
            .with_context(|| format!("Failed to clear output folder: {}", out_dir.display()))?;
    }
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output folder: {}", out_dir.display()))?;

    let png_ops = PngOps {
        rotate180: opts.rotate180,
        flip_y: opts.flip_y,
    };
    let mut doc = FontDocument {
        signature: font.header.signature.as_str().to_string(),
        bom: font.header.bom,
        version: font.header.version,
        header_size: font.header.header_size,
        platform: Some(font.header.platform),
        finf: font.finf.values.clone(),
        tglp: font.tglp.values(),
        glyphs: font.glyphs(),
        png_ops,
        source_file: path.file_name().map(|name| name.to_string_lossy().into_owned()),
        file_b64: opts.embed_source.then(|| STANDARD.encode(&bytes)),
        ..Default::default()
    };

    for (index, grid) in font.decode_sheets(&bytes).into_iter().enumerate() {
        let Some(mut grid) = grid else {
            continue;
        };
        if opts.flip_y {
            grid.flip_vertical();
        }
        if opts.rotate180 {
            grid.rotate_180();
        }
        let name = sheet_file_name(index, png_ops);
        io.save(&out_dir.join(&name), &grid)?;
        doc.sheet_png.push(name);
    }

    let json = doc.to_json().context("Failed to serialize font.json")?;
    let doc_path = out_dir.join(DOCUMENT_NAME);
    fs::write(&doc_path, json).with_context(|| format!("Failed to write {}", doc_path.display()))?;

    info!(
        "unpacked {} -> {} ({} glyphs, {} of {} sheets)",
        path.display(),
        out_dir.display(),
        doc.glyphs.len(),
        doc.sheet_png.len(),
        font.tglp.sheet_count
    );
    Ok(out_dir)
}

/// Unpack many containers, one result per input in input order
///
/// Inputs that share an output folder (`ui.bffnt` and `ui.bcfnt`) are
/// unpacked one after another in input order, so the last one owns the
/// folder. Distinct folders are unpacked in parallel.
pub fn unpack_batch(
    paths: &[PathBuf],
    opts: &UnpackOptions,
    io: &dyn SheetImageIo,
) -> Vec<(PathBuf, Result<PathBuf>)> {
    let mut groups: Vec<(Option<PathBuf>, Vec<usize>)> = Vec::new();
    for (position, path) in paths.iter().enumerate() {
        let key = unpack_dir(path).ok();
        let existing = groups.iter().position(|(dir, _)| key.is_some() && *dir == key);
        match existing {
            Some(group) => groups[group].1.push(position),
            None => groups.push((key, vec![position])),
        }
    }

    for (dir, members) in &groups {
        if let Some(dir) = dir.as_ref().filter(|_| members.len() > 1) {
            let names: Vec<String> = members.iter().map(|&i| paths[i].display().to_string()).collect();
            warn!(
                "{} inputs share output folder {}; the last one wins: {}",
                members.len(),
                dir.display(),
                names.join(", ")
            );
        }
    }

    let mut results: Vec<(usize, Result<PathBuf>)> = groups
        .par_iter()
        .flat_map_iter(|(_, members)| {
            members
                .iter()
                .map(|&i| (i, unpack_file(&paths[i], opts, io)))
                .collect::<Vec<_>>()
        })
        .collect();
    results.sort_by_key(|(position, _)| *position);
    results
        .into_iter()
        .map(|(position, result)| (paths[position].clone(), result))
        .collect()
}

/// Pack settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Output file; defaults to `<folder>/<source_file>`
    pub output: Option<PathBuf>,
    /// Log per-glyph detail at info level
    pub verbose: bool,
}

/// Result of a successful pack
#[derive(Debug, Clone)]
pub struct PackOutcome {
    pub output: PathBuf,
    pub report: PackReport,
}

/// Pack an unpacked folder back into a container
pub fn pack_folder(folder: &Path, opts: &PackOptions, io: &dyn SheetImageIo) -> Result<PackOutcome> {
    let doc_path = folder.join(DOCUMENT_NAME);
    let text = fs::read_to_string(&doc_path)
        .with_context(|| format!("Failed to read {}", doc_path.display()))?;
    let (doc, _) = FontDocument::from_json(&text)
        .with_context(|| format!("Malformed {}", doc_path.display()))?;
    let verbose = opts.verbose || doc.verbose_logs || verbose_from_env();

    let original = load_source(folder, &doc)?;
    let font = Font::parse(&original).context("Failed to decode source font")?;
    let sheets = (0..font.tglp.sheet_count as usize)
        .map(|index| load_sheet(folder, index, &doc, io))
        .collect();

    let edits = Edits::from_document(&doc, sheets, verbose);
    let (bytes, report) = apply_edits(&original, &edits).context("Failed to apply edits")?;

    let output = opts.output.clone().unwrap_or_else(|| {
        let name = doc
            .source_file
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_OUTPUT_NAME);
        folder.join(name)
    });
    write_output(&output, &bytes)?;

    info!(
        "packed {} -> {} ({} bytes, sha256 {})",
        folder.display(),
        output.display(),
        bytes.len(),
        report.verification.output_hash
    );
    Ok(PackOutcome { output, report })
}

/// Original container bytes for a folder
///
/// `file_b64` wins unless `ignore_file_b64` is set. Otherwise the parent
/// directory is searched for `source_file`, then `<folder name>.<ext>`.
fn load_source(folder: &Path, doc: &FontDocument) -> Result<Vec<u8>> {
    let embedded = doc
        .file_b64
        .as_deref()
        .map(str::trim)
        .filter(|s| !doc.ignore_file_b64 && !s.is_empty());
    if let Some(b64) = embedded {
        debug!("using embedded source bytes");
        return STANDARD.decode(b64).context("file_b64 is not valid base64");
    }

    let folder = folder.canonicalize().unwrap_or_else(|_| folder.to_path_buf());
    let parent = folder.parent().unwrap_or_else(|| Path::new(""));

    let mut candidates = Vec::new();
    if let Some(name) = doc.source_file.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        candidates.push(parent.join(name));
    }
    if let Some(base) = folder.file_name() {
        for ext in FONT_EXTENSIONS {
            candidates.push(parent.join(format!("{}.{}", base.to_string_lossy(), ext)));
        }
    }

    for candidate in &candidates {
        if candidate.is_file() {
            debug!("using source font {}", candidate.display());
            return fs::read(candidate)
                .with_context(|| format!("Failed to read source font: {}", candidate.display()));
        }
    }
    bail!(
        "{} has no file_b64 and no source font was found next to {}",
        DOCUMENT_NAME,
        folder.display()
    )
}

/// Edit image for sheet `index`: names listed in `sheet_png` first, then the
/// fixed orientation candidates
fn find_sheet_image(
    folder: &Path,
    index: usize,
    doc: &FontDocument,
    io: &dyn SheetImageIo,
) -> Option<(String, PathBuf)> {
    let prefix = format!("sheet_{index}.");
    let listed = doc
        .sheet_png
        .iter()
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".png"))
        .cloned();
    let fixed = ORIENTATION_SUFFIXES
        .iter()
        .map(|suffix| format!("sheet_{index}{suffix}.png"));

    listed
        .chain(fixed)
        .map(|name| {
            let path = folder.join(&name);
            (name, path)
        })
        .find(|(_, path)| io.exists(path))
}

/// Load sheet `index` and undo the orientation recorded in its name or `png_ops`
fn load_sheet(folder: &Path, index: usize, doc: &FontDocument, io: &dyn SheetImageIo) -> Option<SampleGrid> {
    let (name, path) = find_sheet_image(folder, index, doc, io)?;
    let mut grid = match io.load(&path) {
        Ok(grid) => grid,
        Err(e) => {
            warn!("sheet {}: {:#}", index, e);
            return None;
        }
    };

    if name.contains(".rot180") || doc.png_ops.rotate180 {
        grid.rotate_180();
    }
    if name.contains(".flipY") || doc.png_ops.flip_y {
        grid.flip_vertical();
    }
    debug!("sheet {}: edit image {}", index, path.display());
    Some(grid)
}

/// Write `bytes`, retrying once after removing a file that refuses writes
fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    write_with_retry(path, bytes, |path, bytes| fs::write(path, bytes))
}

/// `write`, and on PermissionDenied: delete the file and write once more
fn write_with_retry(
    path: &Path,
    bytes: &[u8],
    write: impl Fn(&Path, &[u8]) -> io::Result<()>,
) -> Result<()> {
    match write(path, bytes) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!("{} is not writable ({}); replacing it", path.display(), e);
            if path.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove locked file: {}", path.display()))?;
            }
            write(path, bytes).with_context(|| {
                format!(
                    "Failed to write {} (close any program holding it open and retry)",
                    path.display()
                )
            })
        }
        Err(e) => Err(e).with_context(|| format!("Failed to write {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet_image::MemorySheetIo;
    use std::cell::Cell;
    use tempfile::tempdir;

    #[test]
    fn test_sheet_file_names() {
        let plain = PngOps::default();
        assert_eq!(sheet_file_name(0, plain), "sheet_0.png");
        let both = PngOps {
            rotate180: true,
            flip_y: true,
        };
        assert_eq!(sheet_file_name(3, both), "sheet_3.rot180.flipY.png");
        let flip = PngOps {
            rotate180: false,
            flip_y: true,
        };
        assert_eq!(sheet_file_name(12, flip), "sheet_12.flipY.png");
    }

    #[test]
    fn test_is_font_file() {
        assert!(is_font_file(Path::new("a/b/ui.bffnt")));
        assert!(is_font_file(Path::new("UI.BCFNT")));
        assert!(is_font_file(Path::new("x.brfnt")));
        assert!(!is_font_file(Path::new("font.json")));
        assert!(!is_font_file(Path::new("bffnt")));
    }

    #[test]
    fn test_sheet_lookup_is_exact() {
        let io = MemorySheetIo::new();
        let folder = Path::new("/fonts/ui");
        io.insert(folder.join("sheet_10.png"), SampleGrid::filled(4, 4, 1));
        io.insert(folder.join("sheet_1.rot180.png"), SampleGrid::filled(4, 4, 2));

        let doc = FontDocument {
            sheet_png: vec!["sheet_10.png".into(), "sheet_1.rot180.png".into()],
            ..Default::default()
        };
        let (name, _) = find_sheet_image(folder, 1, &doc, &io).unwrap();
        assert_eq!(name, "sheet_1.rot180.png");
        let (name, _) = find_sheet_image(folder, 10, &doc, &io).unwrap();
        assert_eq!(name, "sheet_10.png");
        assert!(find_sheet_image(folder, 2, &doc, &io).is_none());
    }

    #[test]
    fn test_sheet_lookup_falls_back_to_fixed_names() {
        let io = MemorySheetIo::new();
        let folder = Path::new("/fonts/ui");
        io.insert(folder.join("sheet_0.flipY.rot180.png"), SampleGrid::filled(4, 4, 0));

        let (name, path) = find_sheet_image(folder, 0, &FontDocument::default(), &io).unwrap();
        assert_eq!(name, "sheet_0.flipY.rot180.png");
        assert_eq!(path, folder.join("sheet_0.flipY.rot180.png"));
    }

    #[test]
    fn test_load_sheet_undoes_orientation() {
        let io = MemorySheetIo::new();
        let folder = Path::new("/fonts/ui");
        let stored = SampleGrid::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        io.insert(folder.join("sheet_0.rot180.png"), stored);

        let grid = load_sheet(folder, 0, &FontDocument::default(), &io).unwrap();
        assert_eq!(grid.samples(), &[4, 3, 2, 1]);

        let doc = FontDocument {
            png_ops: PngOps {
                rotate180: false,
                flip_y: true,
            },
            ..Default::default()
        };
        // Name says rot180, png_ops adds flipY
        let grid = load_sheet(folder, 0, &doc, &io).unwrap();
        assert_eq!(grid.samples(), &[2, 1, 4, 3]);
    }

    #[test]
    fn test_source_from_embedded_bytes() {
        let dir = tempdir().unwrap();
        let doc = FontDocument {
            file_b64: Some(STANDARD.encode(b"FFNT-bytes")),
            ..Default::default()
        };
        assert_eq!(load_source(dir.path(), &doc).unwrap(), b"FFNT-bytes");
    }

    #[test]
    fn test_source_from_sibling_file() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("ui");
        fs::create_dir(&folder).unwrap();
        fs::write(dir.path().join("ui.bcfnt"), b"by-folder-name").unwrap();
        fs::write(dir.path().join("named.bffnt"), b"by-source-file").unwrap();

        let by_name = FontDocument {
            file_b64: Some(STANDARD.encode(b"embedded")),
            ignore_file_b64: true,
            ..Default::default()
        };
        assert_eq!(load_source(&folder, &by_name).unwrap(), b"by-folder-name");

        let by_source = FontDocument {
            source_file: Some("named.bffnt".into()),
            ..Default::default()
        };
        assert_eq!(load_source(&folder, &by_source).unwrap(), b"by-source-file");
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("lonely");
        fs::create_dir(&folder).unwrap();
        let err = load_source(&folder, &FontDocument::default()).unwrap_err();
        assert!(err.to_string().contains("no source font"));
    }

    #[test]
    fn test_write_output_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bffnt");
        fs::write(&path, b"old").unwrap();
        write_output(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_write_output_replaces_read_only_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.bffnt");
        fs::write(&path, b"old").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        write_output(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_permission_denied_deletes_and_retries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("held.bffnt");
        fs::write(&path, b"old").unwrap();

        let calls = Cell::new(0);
        write_with_retry(&path, b"new", |path, bytes| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                assert!(path.is_file());
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            assert!(!path.exists());
            fs::write(path, bytes)
        })
        .unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_permission_denied_twice_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("held.bffnt");

        let calls = Cell::new(0);
        let err = write_with_retry(&path, b"new", |_, _| {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 2);
        assert!(format!("{err:#}").contains("close any program holding it open"));
    }

    #[test]
    fn test_other_write_errors_do_not_retry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bffnt");

        let calls = Cell::new(0);
        let err = write_with_retry(&path, b"new", |_, _| {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::NotFound))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert!(err.to_string().starts_with("Failed to write"));
    }
}
