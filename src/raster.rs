//! Pixel-level primitives shared by the brushes and the surface compositor.
//!
//! All layers are straight (un-premultiplied) RGBA8 `RgbaImage`s.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Fractional coverage of a pixel whose centre is `dist` from a disc edge of
/// `radius`. One pixel of linear falloff gives the anti-aliased rim.
#[inline]
pub fn edge_coverage(dist: f32, radius: f32) -> f32 {
    (radius + 0.5 - dist).clamp(0.0, 1.0)
}

/// Pixel-space bounding box of a disc, clamped to the image. `None` when the
/// disc lies entirely outside.
fn disc_bounds(img: &RgbaImage, cx: f32, cy: f32, radius: f32) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = img.dimensions();
    let reach = radius + 1.0;
    let min_x = (cx - reach).floor().max(0.0);
    let min_y = (cy - reach).floor().max(0.0);
    let max_x = (cx + reach).ceil().min(w as f32 - 1.0);
    let max_y = (cy + reach).ceil().min(h as f32 - 1.0);
    if w == 0 || h == 0 || min_x > max_x || min_y > max_y {
        return None;
    }
    Some((min_x as u32, min_y as u32, max_x as u32, max_y as u32))
}

/// Stamp an opaque anti-aliased disc using max-alpha: a pixel only changes
/// when the new coverage is at least its current alpha. Overlapping dabs of
/// one stroke therefore never build up.
pub fn stamp_disc_max(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, rgb: [u8; 3]) {
    if radius <= 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = disc_bounds(img, cx, cy, radius) else {
        return;
    };
    for y in y0..=y1 {
        let dy = y as f32 + 0.5 - cy;
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let cov = edge_coverage((dx * dx + dy * dy).sqrt(), radius);
            if cov <= 0.0 {
                continue;
            }
            let alpha = (cov * 255.0).round() as u8;
            let px = img.get_pixel_mut(x, y);
            if alpha >= px.0[3] {
                *px = Rgba([rgb[0], rgb[1], rgb[2], alpha]);
            }
        }
    }
}

/// Composite an anti-aliased disc of the given opacity source-over.
pub fn stamp_disc_over(
    img: &mut RgbaImage,
    cx: f32,
    cy: f32,
    radius: f32,
    rgb: [u8; 3],
    opacity: f32,
) {
    if radius <= 0.0 || opacity <= 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = disc_bounds(img, cx, cy, radius) else {
        return;
    };
    for y in y0..=y1 {
        let dy = y as f32 + 0.5 - cy;
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let cov = edge_coverage((dx * dx + dy * dy).sqrt(), radius);
            if cov <= 0.0 {
                continue;
            }
            let src = Rgba([rgb[0], rgb[1], rgb[2], (cov * opacity * 255.0).round() as u8]);
            let px = img.get_pixel_mut(x, y);
            *px = blend_over(*px, src);
        }
    }
}

/// Fill a `size`×`size` square with an opaque color, clipped to the image.
pub fn fill_square(img: &mut RgbaImage, x: i32, y: i32, size: u32, rgb: [u8; 3]) {
    let (w, h) = img.dimensions();
    let x0 = x.max(0);
    let y0 = y.max(0);
    let size = i32::try_from(size).unwrap_or(i32::MAX);
    let x1 = x.saturating_add(size).min(w as i32);
    let y1 = y.saturating_add(size).min(h as i32);
    for py in y0..y1 {
        for px in x0..x1 {
            img.put_pixel(px as u32, py as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
        }
    }
}

/// Straight-alpha source-over for a single pixel.
#[inline]
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src.0[3] as f32 / 255.0;
    if sa <= 0.0 {
        return dst;
    }
    if sa >= 1.0 {
        return src;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src.0[c] as f32 * sa + dst.0[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    Rgba(out)
}

/// Composite `top` over `base` in place, row-parallel. Both images must share
/// dimensions; `top` may be smaller, in which case it is anchored top-left.
pub fn composite_over(base: &mut RgbaImage, top: &RgbaImage) {
    let (bw, _) = base.dimensions();
    let (tw, th) = top.dimensions();
    let row_len = bw as usize * 4;
    let top_row_len = tw as usize * 4;
    let top_raw: &[u8] = top.as_raw();
    let copy_w = bw.min(tw) as usize;

    let base_raw: &mut [u8] = base;
    base_raw
        .par_chunks_mut(row_len)
        .enumerate()
        .filter(|(y, _)| (*y as u32) < th)
        .for_each(|(y, row)| {
            let top_row = &top_raw[y * top_row_len..y * top_row_len + top_row_len];
            for x in 0..copy_w {
                let o = x * 4;
                let src = Rgba([top_row[o], top_row[o + 1], top_row[o + 2], top_row[o + 3]]);
                if src.0[3] == 0 {
                    continue;
                }
                let dst = Rgba([row[o], row[o + 1], row[o + 2], row[o + 3]]);
                row[o..o + 4].copy_from_slice(&blend_over(dst, src).0);
            }
        });
}
