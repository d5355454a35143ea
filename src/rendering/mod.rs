//! Rendering: card templates, paint commands and the PNG rasterizer

pub mod layout;
pub mod paint;
pub mod raster;
pub mod template;

use std::collections::HashMap;

use log::debug;

use crate::autofit::Typeface;
use crate::Result;
use layout::CardElement;

/// An encoded capture of a card element.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

/// Rasterize `element` at `scale` and encode it as PNG.
pub fn capture(element: &CardElement, scale: u32, typeface: &Typeface) -> Result<Screenshot> {
    let commands = paint::paint_element(element);
    let img = raster::rasterize(&commands, element.width, element.height, scale, typeface)?;
    let png_data = raster::encode_png(&img)?;
    debug!(
        "captured {} at {}x{} ({} bytes)",
        element.id,
        img.width(),
        img.height(),
        png_data.len()
    );
    Ok(Screenshot { width: img.width(), height: img.height(), png_data })
}

/// The set of currently mounted card elements, addressed by id.
///
/// Only mounted elements can be exported; a card that was never mounted, or
/// was unmounted, is not found.
#[derive(Debug, Default, Clone)]
pub struct Stage {
    elements: HashMap<String, CardElement>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `element`, replacing whatever was mounted under the same id.
    pub fn mount(&mut self, element: CardElement) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn unmount(&mut self, id: &str) -> Option<CardElement> {
        self.elements.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&CardElement> {
        self.elements.get(id)
    }

    pub fn is_mounted(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }
}
