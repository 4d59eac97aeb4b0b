use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use rayon::prelude::*;

use crate::cell::{Cell, Class};
use crate::grid::Grid;

// Classification palette
const FLOW_NW: [u8; 4] = [46, 104, 196, 255];
const FLOW_SE: [u8; 4] = [64, 168, 84, 255];
const DIVIDE: [u8; 4] = [214, 48, 40, 255];
const BASIN: [u8; 4] = [150, 96, 170, 255];

/// How strongly the class color covers the height shading.
const CLASS_TINT: f32 = 0.7;

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

/// Gray in `[128, 255]`, brighter for higher ground relative to the map max.
#[inline]
fn height_shade(height: u8, max: u8) -> [u8; 4] {
    let t = height as f32 / max.max(1) as f32;
    let v = (128.0 + t * 127.0).round() as u8;
    [v, v, v, 255]
}

pub fn class_color(class: Class) -> [u8; 4] {
    match class {
        Class::NorthWest => FLOW_NW,
        Class::SouthEast => FLOW_SE,
        Class::Divide => DIVIDE,
        Class::Basin => BASIN,
    }
}

/// Paint each cell as a `scale`x`scale` block. Output is
/// `(size * scale)^2` RGBA pixels.
fn render_blocks(grid: &Grid<Cell>, scale: usize, color: impl Fn(&Cell) -> [u8; 4] + Sync) -> Vec<u8> {
    let scale = scale.max(1);
    let w = grid.size * scale;
    let mut rgba = vec![0u8; w * w * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(py, row)| {
        let y = py / scale;
        for x in 0..grid.size {
            let c = color(&grid.data[grid.idx(x, y)]);
            for px in x * scale..(x + 1) * scale {
                row[px * 4..px * 4 + 4].copy_from_slice(&c);
            }
        }
    });

    rgba
}

/// Grayscale heightmap.
pub fn render_heightmap(grid: &Grid<Cell>, scale: usize) -> Vec<u8> {
    let (_, max) = grid.height_range();
    render_blocks(grid, scale, |c| height_shade(c.height, max))
}

/// Height shading tinted by drainage class. Unresolved cells stay gray, so a
/// half-finished run shows its progress.
pub fn render_divide(grid: &Grid<Cell>, scale: usize) -> Vec<u8> {
    let (_, max) = grid.height_range();
    render_blocks(grid, scale, |c| {
        let base = height_shade(c.height, max);
        match c.class() {
            Some(class) => lerp_color(base, class_color(class), CLASS_TINT),
            None => base,
        }
    })
}

/// PNG-encode a square RGBA buffer.
pub fn encode_png(rgba: &[u8], side: usize) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        rgba,
        side as u32,
        side as u32,
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}
