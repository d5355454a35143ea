//! Software rasterizer for card paint commands

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use log::debug;
use rusttype::{point, Scale};

use crate::autofit::{TextMeasure, Typeface};
use crate::data_url;
use crate::rendering::layout::{Align, ImageShape};
use crate::rendering::paint::PaintCommand;
use crate::{Error, Result};

/// Largest bitmap edge the rasterizer will allocate.
pub const MAX_DIMENSION: u32 = 8192;

/// Rasterize `commands` onto a `width`x`height` logical canvas at `scale`.
pub fn rasterize(
    commands: &[PaintCommand],
    width: u32,
    height: u32,
    scale: u32,
    typeface: &Typeface,
) -> Result<RgbaImage> {
    let (w, h) = scaled_size(width, height, scale)?;
    let mut img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]));
    let s = scale as f32;

    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect { x, y, width, height, rgba } => {
                fill_rect(
                    &mut img,
                    *x as f32 * s,
                    *y as f32 * s,
                    *width as f32 * s,
                    *height as f32 * s,
                    *rgba,
                );
            }
            PaintCommand::Text { x, y, width, font_px, text, rgba, align } => {
                let px = font_px * s;
                let box_w = *width as f32 * s;
                let text_w = typeface.width(text, px);
                let left = match align {
                    Align::Left => *x as f32 * s,
                    Align::Center => *x as f32 * s + (box_w - text_w) / 2.0,
                };
                draw_text(&mut img, typeface, text, px, left, *y as f32 * s, *rgba);
            }
            PaintCommand::Image { x, y, width, height, source, shape, placeholder } => {
                let rect = (
                    *x as i64 * scale as i64,
                    *y as i64 * scale as i64,
                    width.saturating_mul(scale).min(w),
                    height.saturating_mul(scale).min(h),
                );
                draw_image(&mut img, rect, source.as_deref(), *shape, *placeholder)?;
            }
        }
    }
    Ok(img)
}

/// Lossless PNG encoding.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)?;
    Ok(buf)
}

fn scaled_size(width: u32, height: u32, scale: u32) -> Result<(u32, u32)> {
    if width == 0 || height == 0 || scale == 0 {
        return Err(Error::CaptureError(format!(
            "cannot capture a {}x{} element at scale {}",
            width, height, scale
        )));
    }
    let w = width.checked_mul(scale).filter(|v| *v <= MAX_DIMENSION);
    let h = height.checked_mul(scale).filter(|v| *v <= MAX_DIMENSION);
    match (w, h) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(Error::CaptureError(format!(
            "{}x{} at scale {} exceeds the {}px limit",
            width, height, scale, MAX_DIMENSION
        ))),
    }
}

/// Source-over blend of `src` with `coverage` in [0, 1].
fn blend(dst: &mut Rgba<u8>, src: [u8; 4], coverage: f32) {
    let a = (src[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    for i in 0..3 {
        let c = (src[i] as f32 * a + dst.0[i] as f32 * da * (1.0 - a)) / out_a;
        dst.0[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

fn put(img: &mut RgbaImage, x: i64, y: i64, src: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    blend(img.get_pixel_mut(x as u32, y as u32), src, coverage);
}

fn fill_rect(img: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]) {
    let x0 = x.round().max(0.0) as i64;
    let y0 = y.round().max(0.0) as i64;
    let x1 = ((x + w).round() as i64).min(img.width() as i64);
    let y1 = ((y + h).round() as i64).min(img.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            put(img, px, py, rgba, 1.0);
        }
    }
}

fn draw_text(img: &mut RgbaImage, typeface: &Typeface, text: &str, px: f32, left: f32, top: f32, rgba: [u8; 4]) {
    match typeface {
        Typeface::TrueType(face) => {
            let font = face.font();
            let scale = Scale::uniform(px);
            let baseline = top + font.v_metrics(scale).ascent;
            for glyph in font.layout(text, scale, point(left, baseline)) {
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, v| {
                        put(img, bb.min.x as i64 + gx as i64, bb.min.y as i64 + gy as i64, rgba, v);
                    });
                }
            }
        }
        Typeface::Builtin(table) => {
            // ink blocks: one box per visible character, x-height tall
            let mut caret = left;
            for c in text.chars() {
                let adv = table.width(c.encode_utf8(&mut [0; 4]), px);
                if !c.is_whitespace() {
                    fill_rect(img, caret + adv * 0.1, top + px * 0.3, adv * 0.8, px * 0.65, rgba);
                }
                caret += adv;
            }
        }
    }
}

fn inside(shape: ImageShape, px: u32, py: u32, w: u32, h: u32) -> bool {
    match shape {
        ImageShape::Square => true,
        ImageShape::Circle => {
            let cx = w as f32 / 2.0;
            let cy = h as f32 / 2.0;
            let r = w.min(h) as f32 / 2.0;
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            dx * dx + dy * dy <= r * r
        }
    }
}

fn draw_image(
    img: &mut RgbaImage,
    (x, y, w, h): (i64, i64, u32, u32),
    source: Option<&str>,
    shape: ImageShape,
    placeholder: [u8; 4],
) -> Result<()> {
    if w == 0 || h == 0 {
        return Ok(());
    }

    let loaded = match source {
        Some(src) if data_url::is_data_url(src) => Some(decode_cover(src, w, h)?),
        Some(src) => {
            // remote reference that nobody has fetched yet
            debug!("image {} not loaded at capture time; painting placeholder", src);
            None
        }
        None => None,
    };

    for py in 0..h {
        for px in 0..w {
            if !inside(shape, px, py, w, h) {
                continue;
            }
            let src = match &loaded {
                Some(pic) => pic.get_pixel(px, py).0,
                None => placeholder,
            };
            put(img, x + px as i64, y + py as i64, src, 1.0);
        }
    }
    Ok(())
}

/// Decode a data URL and cover-fit it to `w`x`h` (center crop, then resize).
fn decode_cover(src: &str, w: u32, h: u32) -> Result<RgbaImage> {
    let bytes = data_url::decode(src)?;
    let pic = image::load_from_memory(&bytes)
        .map_err(|e| Error::CaptureError(format!("image data could not be decoded: {}", e)))?
        .to_rgba8();
    let (sw, sh) = pic.dimensions();
    if sw == 0 || sh == 0 {
        return Err(Error::CaptureError("image has no pixels".into()));
    }

    let target = w as f32 / h as f32;
    let (cw, ch) = if sw as f32 / sh as f32 > target {
        (((sh as f32 * target).round() as u32).clamp(1, sw), sh)
    } else {
        (sw, ((sw as f32 / target).round() as u32).clamp(1, sh))
    };
    let cropped = imageops::crop_imm(&pic, (sw - cw) / 2, (sh - ch) / 2, cw, ch).to_image();
    Ok(imageops::resize(&cropped, w, h, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(x: i32, y: i32, w: u32, h: u32, rgba: [u8; 4]) -> PaintCommand {
        PaintCommand::SolidRect { x, y, width: w, height: h, rgba }
    }

    #[test]
    fn output_is_scaled() {
        let img = rasterize(&[solid(0, 0, 4, 3, [255, 0, 0, 255])], 4, 3, 2, &Typeface::default()).unwrap();
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(img.get_pixel(7, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn zero_sized_or_huge_canvases_fail_with_capture_error() {
        assert!(matches!(rasterize(&[], 0, 10, 2, &Typeface::default()), Err(Error::CaptureError(_))));
        assert!(matches!(rasterize(&[], 10, 10, 0, &Typeface::default()), Err(Error::CaptureError(_))));
        assert!(matches!(
            rasterize(&[], MAX_DIMENSION, 10, 2, &Typeface::default()),
            Err(Error::CaptureError(_))
        ));
    }

    #[test]
    fn half_transparent_fill_blends() {
        let cmds = [solid(0, 0, 1, 1, [0, 0, 0, 255]), solid(0, 0, 1, 1, [255, 255, 255, 128])];
        let img = rasterize(&cmds, 1, 1, 1, &Typeface::default()).unwrap();
        let p = img.get_pixel(0, 0).0;
        assert!(p[0] > 120 && p[0] < 135, "{:?}", p);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn builtin_text_leaves_ink() {
        let cmds = [
            solid(0, 0, 100, 20, [0, 0, 0, 255]),
            PaintCommand::Text {
                x: 0,
                y: 0,
                width: 100,
                font_px: 16.0,
                text: "Hi".into(),
                rgba: [255, 255, 255, 255],
                align: Align::Center,
            },
        ];
        let img = rasterize(&cmds, 100, 20, 1, &Typeface::default()).unwrap();
        assert!(img.pixels().any(|p| p.0 == [255, 255, 255, 255]));
        // centered text leaves the left edge untouched
        assert_eq!(img.get_pixel(0, 10).0, [0, 0, 0, 255]);
    }

    #[test]
    fn embedded_face_draws_antialiased_glyphs() {
        let cmds = [
            solid(0, 0, 100, 40, [0, 0, 0, 255]),
            PaintCommand::Text {
                x: 0,
                y: 0,
                width: 100,
                font_px: 28.0,
                text: "Ann".into(),
                rgba: [255, 255, 255, 255],
                align: Align::Left,
            },
        ];
        let img = rasterize(&cmds, 100, 40, 1, &Typeface::embedded().unwrap()).unwrap();
        assert!(img.pixels().any(|p| p.0 == [255, 255, 255, 255]));
        // glyph edges blend into the background, block ink never does
        assert!(img.pixels().any(|p| p.0[0] > 0 && p.0[0] < 255));
    }

    #[test]
    fn pending_remote_image_paints_placeholder() {
        let cmds = [PaintCommand::Image {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
            source: Some("https://dl.example.com/p.png".into()),
            shape: ImageShape::Square,
            placeholder: [10, 20, 30, 255],
        }];
        let img = rasterize(&cmds, 4, 4, 1, &Typeface::default()).unwrap();
        assert_eq!(img.get_pixel(2, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn circle_mask_leaves_corners_clear() {
        let cmds = [PaintCommand::Image {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            source: None,
            shape: ImageShape::Circle,
            placeholder: [10, 20, 30, 255],
        }];
        let img = rasterize(&cmds, 10, 10, 1, &Typeface::default()).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(5, 5).0, [10, 20, 30, 255]);
    }

    #[test]
    fn embedded_photo_is_decoded_and_drawn() {
        let photo = RgbaImage::from_pixel(3, 2, Rgba([0, 200, 0, 255]));
        let url = data_url::encode("image/png", &encode_png(&photo).unwrap());
        let cmds = [PaintCommand::Image {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
            source: Some(url),
            shape: ImageShape::Square,
            placeholder: [0, 0, 0, 255],
        }];
        let img = rasterize(&cmds, 4, 4, 2, &Typeface::default()).unwrap();
        assert_eq!(img.get_pixel(4, 4).0, [0, 200, 0, 255]);
    }

    #[test]
    fn gif_photo_is_decoded_and_drawn() {
        let frame = RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 255]));
        let mut gif = Vec::new();
        image::codecs::gif::GifEncoder::new(&mut gif)
            .encode(frame.as_raw(), 2, 2, ColorType::Rgba8)
            .unwrap();
        let url = data_url::encode(data_url::image_mime(&gif).unwrap(), &gif);
        assert!(url.starts_with("data:image/gif;base64,"));

        let cmds = [PaintCommand::Image {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
            source: Some(url),
            shape: ImageShape::Square,
            placeholder: [0, 0, 255, 255],
        }];
        let img = rasterize(&cmds, 4, 4, 2, &Typeface::default()).unwrap();
        let p = img.get_pixel(4, 4).0;
        assert!(p[0] > 180 && p[1] < 30 && p[2] < 30, "{:?}", p);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn undecodable_photo_is_a_capture_error() {
        let cmds = [PaintCommand::Image {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
            source: Some(data_url::encode("image/png", b"not a png")),
            shape: ImageShape::Square,
            placeholder: [0, 0, 0, 255],
        }];
        let err = rasterize(&cmds, 4, 4, 1, &Typeface::default()).unwrap_err();
        assert!(matches!(err, Error::CaptureError(_)));
    }

    #[test]
    fn encoded_png_has_signature() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    }
}
