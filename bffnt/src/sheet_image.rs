//! Sheet images as single-channel sample grids
//!
//! The edit surface stores each glyph sheet as a PNG. Only one channel matters:
//! alpha for RGBA images, luminance for everything else (gray+alpha included).
//! Unpacked sheets are written as white RGBA with the sample in alpha.
//!
//! Image I/O goes through [`SheetImageIo`] so the pack/unpack workflow can run
//! against real PNG files ([`PngSheetIo`]) or an in-memory store
//! ([`MemorySheetIo`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use image::{ColorType, DynamicImage, ImageFormat, Rgba, RgbaImage};

/// Which image channel carries the samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleChannel {
    Alpha,
    Luminance,
}

impl SampleChannel {
    pub fn for_image(img: &DynamicImage) -> Self {
        if matches!(img.color(), ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F) {
            SampleChannel::Alpha
        } else {
            SampleChannel::Luminance
        }
    }
}

/// Row-major 8-bit samples of one sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGrid {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl SampleGrid {
    /// Wrap `samples`; `None` if the length does not match `width * height`
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Option<Self> {
        (samples.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            samples,
        })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            samples: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.samples[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let i = self.index(x, y);
        self.samples[i] = value;
    }

    /// Mirror top to bottom
    pub fn flip_vertical(&mut self) {
        let w = self.width as usize;
        let h = self.height as usize;
        for y in 0..h / 2 {
            let (top, bottom) = self.samples.split_at_mut((h - 1 - y) * w);
            top[y * w..(y + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }

    /// Rotate by 180 degrees
    pub fn rotate_180(&mut self) {
        self.samples.reverse();
    }

    /// Extract the sample channel of a decoded image
    pub fn from_image(img: &DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let samples = match SampleChannel::for_image(img) {
            SampleChannel::Alpha => img.to_rgba8().pixels().map(|p| p[3]).collect(),
            SampleChannel::Luminance => img.to_luma8().into_raw(),
        };
        Self {
            width,
            height,
            samples,
        }
    }

    /// White RGBA image with the samples in alpha
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba([255, 255, 255, self.get(x, y)])
        })
    }
}

/// Read/write access to sheet images
pub trait SheetImageIo: Send + Sync {
    fn load(&self, path: &Path) -> Result<SampleGrid>;
    fn save(&self, path: &Path, grid: &SampleGrid) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// PNG files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct PngSheetIo;

impl SheetImageIo for PngSheetIo {
    fn load(&self, path: &Path) -> Result<SampleGrid> {
        let img = image::open(path)
            .with_context(|| format!("Failed to load sheet image: {}", path.display()))?;
        Ok(SampleGrid::from_image(&img))
    }

    fn save(&self, path: &Path, grid: &SampleGrid) -> Result<()> {
        grid.to_rgba_image()
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write sheet image: {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Sheet images kept in memory, keyed by path
#[derive(Debug, Default)]
pub struct MemorySheetIo {
    images: Mutex<HashMap<PathBuf, SampleGrid>>,
}

impl MemorySheetIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, grid: SampleGrid) {
        if let Ok(mut images) = self.images.lock() {
            images.insert(path.into(), grid);
        }
    }

    pub fn get(&self, path: &Path) -> Option<SampleGrid> {
        self.images.lock().ok()?.get(path).cloned()
    }

    /// Stored paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .images
            .lock()
            .map(|images| images.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

impl SheetImageIo for MemorySheetIo {
    fn load(&self, path: &Path) -> Result<SampleGrid> {
        match self.get(path) {
            Some(grid) => Ok(grid),
            None => bail!("No sheet image stored at {}", path.display()),
        }
    }

    fn save(&self, path: &Path, grid: &SampleGrid) -> Result<()> {
        self.insert(path, grid.clone());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }
}
