//! Resize, rotate and alpha-blend an accessory onto a base raster.
//!
//! Resampling is area-averaged with alpha weighting, so downscaled art keeps
//! clean edges: fully transparent source pixels contribute neither color nor
//! a dark fringe. Rotation keeps the resized canvas size; corners exposed by
//! the rotation are transparent.

use crate::placement::Placement;
use crate::raster::{RasterImage, TRANSPARENT};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("invalid image format: {0}")]
    InvalidImageFormat(String),
    #[error("invalid placement: {0:?}")]
    InvalidPlacement(Placement),
}

/// A rectangle of the resized sprite, in sprite pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    x: u64,
    y: u64,
    width: u32,
    height: u32,
}

/// Composite `accessory` onto a copy of `base` at `placement`.
///
/// The accessory is resized to the rounded placement size, rotated about its
/// own center, then shifted fully inside `base` if it would overhang an edge.
/// Only RGB is blended; the base alpha channel is kept as is.
///
/// Only the part of the sprite that lands on `base` is ever resampled, so the
/// work is bounded by the base size however large the placement is.
///
/// On error `base` is untouched and still owned by the caller.
pub fn place_accessory(
    base: &RasterImage,
    accessory: &RasterImage,
    placement: &Placement,
) -> Result<RasterImage, CompositeError> {
    if base.is_empty() {
        return Err(CompositeError::InvalidImageFormat(format!(
            "base raster is {}x{}",
            base.width(),
            base.height()
        )));
    }
    if accessory.is_empty() {
        return Err(CompositeError::InvalidImageFormat(format!(
            "accessory raster is {}x{}",
            accessory.width(),
            accessory.height()
        )));
    }
    if !placement.is_valid() {
        return Err(CompositeError::InvalidPlacement(*placement));
    }

    // Float-to-int casts saturate, so absurd sizes stay well defined.
    let sprite_w = placement.width.round().max(1.0) as u64;
    let sprite_h = placement.height.round().max(1.0) as u64;

    let x_offset = clamp_offset(placement.x - placement.width / 2.0, sprite_w, base.width());
    let y_offset = clamp_offset(placement.y - placement.height / 2.0, sprite_h, base.height());

    // The offset is never negative, so the visible part starts at the
    // sprite's own top-left corner.
    let cols = sprite_w.min(u64::from(base.width() - x_offset)) as u32;
    let rows = sprite_h.min(u64::from(base.height() - y_offset)) as u32;

    let sprite = if placement.rotation_degrees != 0.0 {
        rotate_visible(accessory, sprite_w, sprite_h, cols, rows, placement.rotation_degrees)
    } else {
        let window = Window { x: 0, y: 0, width: cols, height: rows };
        resize_window(accessory, sprite_w, sprite_h, window)
    };

    tracing::trace!(
        x_offset,
        y_offset,
        sprite_w,
        sprite_h,
        cols,
        rows,
        "blending accessory"
    );

    let mut out = base.clone();
    blend_over(&mut out, &sprite, x_offset, y_offset);
    Ok(out)
}

/// Snap a top-left coordinate to the pixel grid and push it inside the base.
///
/// The valid range is `[0, base - sprite]`. When the sprite is larger than
/// the base on this axis the range is empty and the offset pins to 0.
fn clamp_offset(top_left: f32, sprite: u64, base: u32) -> u32 {
    let snapped = top_left.floor() as i64;
    let max = i64::from(base) - i64::try_from(sprite).unwrap_or(i64::MAX);
    let clamped = snapped.min(max).max(0);
    if clamped != snapped {
        tracing::debug!(requested = snapped, clamped, "accessory shifted inside base");
    }
    clamped as u32
}

/// Alpha-blend `sprite` over `dst` with its top-left at `(x0, y0)`.
///
/// Only the region overlapping `dst` is written.
fn blend_over(dst: &mut RasterImage, sprite: &RasterImage, x0: u32, y0: u32) {
    let cols = sprite.width().min(dst.width().saturating_sub(x0));
    let rows = sprite.height().min(dst.height().saturating_sub(y0));

    for sy in 0..rows {
        for sx in 0..cols {
            let [r, g, b, a] = sprite.pixel(sx, sy);
            if a == TRANSPARENT {
                continue;
            }
            let alpha = a as f32 / 255.0;
            let (dx, dy) = (x0 + sx, y0 + sy);
            let [br, bg, bb, ba] = dst.pixel(dx, dy);
            let mix = |base: u8, over: u8| -> u8 {
                ((1.0 - alpha) * base as f32 + alpha * over as f32)
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            dst.put_pixel(dx, dy, [mix(br, r), mix(bg, g), mix(bb, b), ba]);
        }
    }
}

/// Source taps and normalized overlap weights for destination indices
/// `start..start + count` of a `src_len → dst_len` resize along one axis.
fn area_weights(src_len: u32, dst_len: u64, start: u64, count: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (start..start + u64::from(count))
        .map(|d| {
            let lo = d as f64 * scale;
            let hi = lo + scale;
            let first = (lo.floor() as u32).min(src_len.saturating_sub(1));
            let last = (hi.ceil() as u32).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = hi.min(s as f64 + 1.0) - lo.max(s as f64);
                    (overlap > 1e-9).then(|| (s, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}

/// Area-averaging resize of `src` to `sprite_w × sprite_h`, producing only
/// the pixels inside `window`. Color is alpha-weighted.
fn resize_window(src: &RasterImage, sprite_w: u64, sprite_h: u64, window: Window) -> RasterImage {
    if (u64::from(src.width()), u64::from(src.height())) == (sprite_w, sprite_h) {
        // Native size: the window lies inside the source.
        return src.crop(window.x as u32, window.y as u32, window.width, window.height);
    }

    let xs = area_weights(src.width(), sprite_w, window.x, window.width);
    let ys = area_weights(src.height(), sprite_h, window.y, window.height);
    let mut out = RasterImage::transparent(window.width, window.height);

    for (dy, row) in ys.iter().enumerate() {
        for (dx, col) in xs.iter().enumerate() {
            let mut acc = [0.0f32; 4];
            for &(sy, wy) in row {
                for &(sx, wx) in col {
                    let [r, g, b, a] = src.pixel(sx, sy);
                    let weight = a as f32 * wy * wx;
                    acc[0] += r as f32 * weight;
                    acc[1] += g as f32 * weight;
                    acc[2] += b as f32 * weight;
                    acc[3] += weight;
                }
            }
            out.put_pixel(dx as u32, dy as u32, unpremultiply(acc));
        }
    }

    out
}

/// The top-left `cols × rows` of the resized sprite after a clockwise
/// rotation by `degrees` about the sprite center.
///
/// The rotated canvas keeps the sprite size. Only the resized pixels the
/// window reads are resampled. Bilinear sampling on premultiplied color;
/// samples outside the sprite are fully transparent.
fn rotate_visible(
    src: &RasterImage,
    sprite_w: u64,
    sprite_h: u64,
    cols: u32,
    rows: u32,
    degrees: f32,
) -> RasterImage {
    let cx = sprite_w as f64 / 2.0;
    let cy = sprite_h as f64 / 2.0;
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();

    // Inverse-map an output pixel center into resized-sprite coordinates.
    let to_sprite = |ox: f64, oy: f64| -> (f64, f64) {
        let px = ox + 0.5 - cx;
        let py = oy + 0.5 - cy;
        (cos * px + sin * py + cx - 0.5, -sin * px + cos * py + cy - 0.5)
    };

    // The map is affine, so the corner pixels bound what the window reads.
    let (right, bottom) = (f64::from(cols) - 1.0, f64::from(rows) - 1.0);
    let corners = [(0.0, 0.0), (right, 0.0), (0.0, bottom), (right, bottom)].map(|(x, y)| to_sprite(x, y));
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (x, y) in corners {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let lo_x = min_x.floor().max(0.0);
    let hi_x = (max_x.floor() + 2.0).min(sprite_w as f64);
    let lo_y = min_y.floor().max(0.0);
    let hi_y = (max_y.floor() + 2.0).min(sprite_h as f64);

    let mut out = RasterImage::transparent(cols, rows);
    if lo_x >= hi_x || lo_y >= hi_y {
        // The window only sees area exposed by the rotation.
        return out;
    }

    let window = Window {
        x: lo_x as u64,
        y: lo_y as u64,
        width: (hi_x - lo_x) as u32,
        height: (hi_y - lo_y) as u32,
    };
    let resized = resize_window(src, sprite_w, sprite_h, window);
    let (wx, wy) = (window.x as i64, window.y as i64);

    let sample = |x: i64, y: i64| -> [f32; 4] {
        let (lx, ly) = (x - wx, y - wy);
        if lx < 0 || ly < 0 || lx >= i64::from(window.width) || ly >= i64::from(window.height) {
            return [0.0; 4];
        }
        let [r, g, b, a] = resized.pixel(lx as u32, ly as u32);
        let a = a as f32;
        [r as f32 * a, g as f32 * a, b as f32 * a, a]
    };

    for oy in 0..rows {
        for ox in 0..cols {
            let (sx, sy) = to_sprite(f64::from(ox), f64::from(oy));
            let x0 = sx.floor();
            let y0 = sy.floor();
            let fx = (sx - x0) as f32;
            let fy = (sy - y0) as f32;
            let (x0, y0) = (x0 as i64, y0 as i64);

            let tl = sample(x0, y0);
            let tr = sample(x0 + 1, y0);
            let bl = sample(x0, y0 + 1);
            let br = sample(x0 + 1, y0 + 1);

            let acc: [f32; 4] = std::array::from_fn(|c| {
                tl[c] * (1.0 - fx) * (1.0 - fy)
                    + tr[c] * fx * (1.0 - fy)
                    + bl[c] * (1.0 - fx) * fy
                    + br[c] * fx * fy
            });
            out.put_pixel(ox, oy, unpremultiply(acc));
        }
    }

    out
}

/// Convert accumulated `[r·a, g·a, b·a, a]` back to straight RGBA bytes.
fn unpremultiply(acc: [f32; 4]) -> [u8; 4] {
    let alpha = acc[3];
    if alpha <= 1e-6 {
        return [0, 0, 0, TRANSPARENT];
    }
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [
        to_u8(acc[0] / alpha),
        to_u8(acc[1] / alpha),
        to_u8(acc[2] / alpha),
        to_u8(alpha),
    ]
}
