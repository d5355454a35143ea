//! Shrink-to-fit font sizing.
//!
//! [`fit`] steps a font size down from a base value until the measured text
//! width fits the available space or the floor is reached. Measurement is a
//! capability supplied by the caller through [`TextMeasure`], so the same
//! routine runs against a real TrueType face or the built-in advance table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use rusttype::{point, Font, Scale};

use crate::{Error, Result};

/// Size decrement per iteration, in pixels.
pub const STEP_PX: u32 = 2;

/// DejaVu Sans, used when no font file is given.
static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Anything that can tell how wide a string renders at a given pixel size.
pub trait TextMeasure: Send + Sync {
    fn width(&self, text: &str, px: f32) -> f32;
}

/// Per-field sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    pub base_px: u32,
    pub min_px: u32,
    pub max_width_px: f32,
}

impl FitParams {
    pub fn new(base_px: u32, min_px: u32, max_width_px: f32) -> Result<Self> {
        if base_px == 0 {
            return Err(Error::ConfigError("base font size must be positive".into()));
        }
        if min_px > base_px {
            return Err(Error::ConfigError(format!(
                "minimum font size {}px is above the base size {}px",
                min_px, base_px
            )));
        }
        if max_width_px.is_nan() || max_width_px <= 0.0 {
            return Err(Error::ConfigError("max width must be positive".into()));
        }
        Ok(Self { base_px, min_px, max_width_px })
    }
}

/// Largest size in `[min_px, base_px]` at which `text` fits `max_width_px`.
///
/// Empty text returns the base size without measuring. When even the floor
/// overflows, the floor is returned and the overflow is left alone.
pub fn fit(text: &str, params: FitParams, measure: &dyn TextMeasure) -> u32 {
    let FitParams { base_px, min_px, max_width_px } = params;
    let min_px = min_px.min(base_px);
    if text.is_empty() {
        return base_px;
    }

    let mut size = base_px;
    while size > min_px && measure.width(text, size as f32) > max_width_px {
        size = size.saturating_sub(STEP_PX).max(min_px);
    }
    size
}

/// Deterministic advance-width table in em units.
///
/// Approximates a proportional sans face; characters missing from the
/// override map fall back to a class-based width.
#[derive(Debug, Clone, Default)]
pub struct AdvanceTable {
    overrides: HashMap<char, f32>,
    letter_spacing_em: f32,
}

impl AdvanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advance(mut self, c: char, em: f32) -> Self {
        self.overrides.insert(c, em);
        self
    }

    pub fn with_letter_spacing(mut self, em: f32) -> Self {
        self.letter_spacing_em = em;
        self
    }

    /// Advance of `c` in em units.
    pub fn advance(&self, c: char) -> f32 {
        if let Some(em) = self.overrides.get(&c) {
            return *em;
        }
        match c {
            ' ' => 0.28,
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.24,
            'f' | 't' | 'r' | 'I' | '(' | ')' | '-' => 0.34,
            'm' | 'w' | 'M' | 'W' | '@' => 0.86,
            'A'..='Z' => 0.68,
            '0'..='9' => 0.56,
            'a'..='z' => 0.52,
            _ => 0.6,
        }
    }
}

impl TextMeasure for AdvanceTable {
    fn width(&self, text: &str, px: f32) -> f32 {
        let em: f32 = text
            .chars()
            .map(|c| self.advance(c) + self.letter_spacing_em)
            .sum();
        em * px
    }
}

/// A TrueType face used both for measuring and for drawing glyphs.
#[derive(Clone)]
pub struct FontMeasure {
    font: Arc<Font<'static>>,
}

impl FontMeasure {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = Font::try_from_vec(data)
            .ok_or_else(|| Error::ConfigError("font data could not be parsed".into()))?;
        Ok(Self { font: Arc::new(font) })
    }

    /// The bundled DejaVu Sans face.
    pub fn embedded() -> Result<Self> {
        let font = Font::try_from_bytes(DEJAVU_SANS)
            .ok_or_else(|| Error::ConfigError("bundled font could not be parsed".into()))?;
        Ok(Self { font: Arc::new(font) })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!("loaded font {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    pub fn font(&self) -> &Font<'static> {
        &self.font
    }
}

impl std::fmt::Debug for FontMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMeasure").field("glyphs", &self.font.glyph_count()).finish()
    }
}

impl TextMeasure for FontMeasure {
    fn width(&self, text: &str, px: f32) -> f32 {
        let scale = Scale::uniform(px);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

/// The face a card is measured and painted with.
#[derive(Debug, Clone)]
pub enum Typeface {
    /// No font file: text is measured with an [`AdvanceTable`] and painted as ink blocks.
    Builtin(AdvanceTable),
    TrueType(FontMeasure),
}

impl Typeface {
    /// Real glyphs from the bundled face.
    pub fn embedded() -> Result<Self> {
        FontMeasure::embedded().map(Typeface::TrueType)
    }
}

impl Default for Typeface {
    fn default() -> Self {
        Typeface::Builtin(AdvanceTable::new())
    }
}

impl TextMeasure for Typeface {
    fn width(&self, text: &str, px: f32) -> f32 {
        match self {
            Typeface::Builtin(t) => t.width(text, px),
            Typeface::TrueType(f) => f.width(text, px),
        }
    }
}
