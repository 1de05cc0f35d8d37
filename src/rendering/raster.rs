/// Software rasterizer for notebook display lists, plus PNG encoding.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use crate::capture::{CaptureSnapshot, RasterOptions, Rasterizer};
use crate::error::ExportErrorKind;
use crate::rendering::paint::{build_display_list, PaintCommand};
use crate::rendering::ImageBlob;
use crate::{Error, Result};

fn fill_rect(img: &mut RgbaImage, x: i64, y: i64, w: u64, h: u64, rgba: (u8, u8, u8, u8)) {
    let (iw, ih) = (img.width() as i64, img.height() as i64);
    let x0 = x.clamp(0, iw);
    let y0 = y.clamp(0, ih);
    let x1 = (x + w as i64).clamp(0, iw);
    let y1 = (y + h as i64).clamp(0, ih);
    let px = Rgba([rgba.0, rgba.1, rgba.2, rgba.3]);
    for py in y0..y1 {
        for pxx in x0..x1 {
            img.put_pixel(pxx as u32, py as u32, px);
        }
    }
}

fn fill_circle(img: &mut RgbaImage, cx: i64, cy: i64, r: i64, rgba: (u8, u8, u8, u8)) {
    let (iw, ih) = (img.width() as i64, img.height() as i64);
    let px = Rgba([rgba.0, rgba.1, rgba.2, rgba.3]);
    for y in (cy - r).max(0)..(cy + r + 1).min(ih) {
        for x in (cx - r).max(0)..(cx + r + 1).min(iw) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x as u32, y as u32, px);
            }
        }
    }
}

/// Paint `cmds` into a `width*scale` by `height*scale` image.
pub fn rasterize(cmds: &[PaintCommand], width: u32, height: u32, scale: u32) -> RgbaImage {
    let s = scale.max(1) as i64;
    let mut img = RgbaImage::new(width * scale.max(1), height * scale.max(1));
    for cmd in cmds {
        match cmd {
            PaintCommand::SolidRect { x, y, width, height, rgba }
            | PaintCommand::Glyph { x, y, width, height, rgba } => fill_rect(
                &mut img,
                *x as i64 * s,
                *y as i64 * s,
                *width as u64 * s as u64,
                *height as u64 * s as u64,
                *rgba,
            ),
            PaintCommand::Circle { cx, cy, radius, rgba } => {
                fill_circle(&mut img, *cx as i64 * s, *cy as i64 * s, *radius as i64 * s, *rgba)
            }
        }
    }
    img
}

/// Encode as PNG. PNG is lossless, so `quality` only selects the compression effort.
pub fn encode_png(img: &RgbaImage, quality: f32) -> Result<ImageBlob> {
    let compression = if quality >= 0.9 {
        CompressionType::Best
    } else if quality >= 0.5 {
        CompressionType::Default
    } else {
        CompressionType::Fast
    };
    let mut png_data = Vec::new();
    PngEncoder::new_with_quality(&mut png_data, compression, FilterType::Adaptive)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| Error::export(ExportErrorKind::Encode, e.to_string()))?;
    Ok(ImageBlob {
        width: img.width(),
        height: img.height(),
        png_data,
    })
}

/// Rasterizer backed by the built-in painter; always ready.
#[derive(Debug, Default, Clone, Copy)]
pub struct PixmapRasterizer;

impl PixmapRasterizer {
    pub fn new() -> Self {
        PixmapRasterizer
    }
}

impl Rasterizer for PixmapRasterizer {
    fn rasterize(&self, snapshot: &CaptureSnapshot, opts: &RasterOptions) -> Result<RgbaImage> {
        if opts.width == 0 || opts.height == 0 {
            return Err(Error::export(
                ExportErrorKind::Rasterize,
                format!("refusing to capture a {}x{} surface", opts.width, opts.height),
            ));
        }
        let cmds = build_display_list(
            &snapshot.layout,
            &snapshot.ruling,
            snapshot.style,
            opts.width,
            opts.height,
            opts.background,
        );
        log::debug!(
            "rasterizing {} paint commands at {}x{} scale {}",
            cmds.len(),
            opts.width,
            opts.height,
            opts.scale
        );
        Ok(rasterize(&cmds, opts.width, opts.height, opts.scale))
    }
}
