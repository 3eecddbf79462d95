// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use std::f64::consts::{ FRAC_PI_2, PI };

use nalgebra::{ Vector3, Vector4 };
use rayon::prelude::*;

use super::interpolation::{ COEFFS_BILINEAR, COEFFS_BICUBIC, COEFFS_LANCZOS4, INTER_BITS, INTER_TAB_SIZE };
use super::{ ComputeParams, PixelBuffer };
use crate::util::map_coord;

/// Unit view direction of an output pixel: x maps linearly to longitude,
/// y to latitude, with the global yaw added to the longitude.
pub fn equirect_direction(px: f64, py: f64, params: &ComputeParams) -> Vector3<f64> {
    let lat = map_coord(py, 0.0, params.output_height as f64, -FRAC_PI_2, FRAC_PI_2);
    let lon = map_coord(px, 0.0, params.output_width as f64, -PI, PI) + params.global_yaw;

    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

/// Fill output rows [row_start, row_end). Rows are independent: each one
/// reads only the source raster and the immutable params, so they are
/// processed in parallel.
pub fn stitch_rows<const I: i32>(input: &PixelBuffer, output: &mut PixelBuffer, row_start: usize, row_end: usize, params: &ComputeParams) {
    let stride = output.stride;
    let out_width = params.output_width;

    output.data[row_start * stride..row_end * stride]
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(dy, row_bytes)| {
            let y = row_start + dy;
            row_bytes[..out_width * 4].chunks_exact_mut(4).enumerate().for_each(|(x, pix_chunk)| {
                let pix = stitch_pixel::<I>(x, y, input, params);
                pix_chunk.copy_from_slice(&pix);
            });
        });
}

fn stitch_pixel<const I: i32>(x: usize, y: usize, input: &PixelBuffer, params: &ComputeParams) -> [u8; 4] {
    let dir = equirect_direction(x as f64, y as f64, params);

    let left = &params.lenses[0];
    let right = &params.lenses[1];

    let color = match (left.project(&dir), right.project(&dir)) {
        (Some(a), Some(b)) => {
            if params.blend {
                let ca = sample_input_at::<I>((a.sx, a.sy), input);
                let cb = sample_input_at::<I>((b.sx, b.sy), input);
                let wsum = a.weight + b.weight;
                if wsum > 0.0 {
                    (ca * a.weight as f32 + cb * b.weight as f32) / wsum as f32
                } else {
                    // both lenses sit exactly on their field edge
                    (ca + cb) * 0.5
                }
            } else {
                let s = if a.weight >= b.weight { a } else { b };
                sample_input_at::<I>((s.sx, s.sy), input)
            }
        }
        (Some(s), None) | (None, Some(s)) => sample_input_at::<I>((s.sx, s.sy), input),
        (None, None) => {
            // Combined FOV under 360° leaves a gap between the two fields.
            // Sample the nearer lens without the FOV/circle rejection so the
            // whole sphere still resolves to a color.
            let lens = if left.basis.axis.dot(&dir) >= right.basis.axis.dot(&dir) { left } else { right };
            let uv = lens.project_unclamped(&dir);
            sample_input_at::<I>(uv, input)
        }
    };

    [to_u8(color.x), to_u8(color.y), to_u8(color.z), 255]
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn coeffs_for<const I: i32>() -> &'static [f64] {
    match I {
        2 => &COEFFS_BILINEAR[..],
        4 => &COEFFS_BICUBIC[..],
        8 => &COEFFS_LANCZOS4[..],
        _ => unreachable!("unsupported kernel size")
    }
}

/// Split a fixed-point coordinate into a footprint base and a coefficient row
/// index, keeping the I-wide footprint inside [0, size). At the borders the
/// base saturates instead of reading out of bounds.
#[inline]
fn clamp_base<const I: i32>(fixed: i64, size: usize) -> (usize, usize) {
    let max_base = (size as i64 - I as i64).max(0);
    let mut base = fixed >> INTER_BITS;
    let mut idx = fixed & (INTER_TAB_SIZE as i64 - 1);
    if base < 0 {
        base = 0;
        idx = 0;
    } else if base > max_base {
        // saturate the fraction; the tables carry a dedicated row for 1.0
        idx = (idx + ((base - max_base) << INTER_BITS)).min(INTER_TAB_SIZE as i64);
        base = max_base;
    }
    (base as usize, idx as usize)
}

/// Resample the source raster at a fractional coordinate with an I×I kernel
/// of tabulated coefficients (2 = bilinear, 4 = bicubic, 8 = lanczos4).
pub fn sample_input_at<const I: i32>(uv: (f64, f64), input: &PixelBuffer) -> Vector4<f32> {
    let n = I as usize;
    let table = coeffs_for::<I>();
    let offset: f64 = [0.0, 1.0, 3.0][n >> 2]; // footprint start relative to the base pixel

    let u0 = ((uv.0 - offset) * INTER_TAB_SIZE as f64).round() as i64;
    let v0 = ((uv.1 - offset) * INTER_TAB_SIZE as f64).round() as i64;

    let (sx, ix) = clamp_base::<I>(u0, input.width);
    let (sy, iy) = clamp_base::<I>(v0, input.height);

    let coeffs_x = &table[ix * n..ix * n + n];
    let coeffs_y = &table[iy * n..iy * n + n];

    let max_x = input.width - 1;
    let max_y = input.height - 1;

    let mut sum = Vector4::from_element(0.0f32);
    for yp in 0..n {
        let row = input.row((sy + yp).min(max_y));
        let mut xsum = Vector4::from_element(0.0f32);
        for xp in 0..n {
            let o = (sx + xp).min(max_x) * 4;
            let px = &row[o..o + 4];
            xsum += Vector4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) * coeffs_x[xp] as f32;
        }
        sum += xsum * coeffs_y[yp] as f32;
    }
    sum
}
