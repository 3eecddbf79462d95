// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use std::sync::atomic::{ AtomicBool, Ordering::Relaxed };

mod compute_params;
mod cpu_stitch;
mod equidistant;
mod interpolation;
mod lens_basis;
pub use compute_params::ComputeParams;
pub use cpu_stitch::{ equirect_direction, sample_input_at, stitch_rows };
pub use equidistant::{ EquidistantLens, LensSample };
pub use lens_basis::{ rotate_axis_angle, LensBasis, LensSide };

use crate::StitchError;

/// Rows processed between two progress/cancellation checks.
pub const ROWS_PER_CHUNK: usize = 32;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Bilinear = 2,
    Bicubic  = 4,
    Lanczos4 = 8
}

impl Interpolation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bilinear" => Some(Self::Bilinear),
            "bicubic"  => Some(Self::Bicubic),
            "lanczos4" => Some(Self::Lanczos4),
            _ => None
        }
    }
}

/// Row-major RGBA8 raster. `stride` is in bytes and is at least `width * 4`.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let stride = width * 4;
        Self { width, height, stride, data: vec![0; stride * height] }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, StitchError> {
        let expected = width * height * 4;
        if data.len() != expected {
            return Err(StitchError::BufferSize { expected, got: data.len() });
        }
        Ok(Self { width, height, stride: width * 4, data })
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..y * self.stride + self.width * 4]
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let o = y * self.stride + x * 4;
        [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]]
    }
}

/// Runs the per-pixel mapping over the whole output raster in row chunks,
/// reporting progress and honoring cancellation between chunks. Finished
/// rows are final at every chunk boundary; rows of a cancelled run are
/// undefined past the point of cancellation.
pub struct Stitcher {
    params: ComputeParams,
}

impl Stitcher {
    pub fn new(params: ComputeParams) -> Self {
        Self { params }
    }

    pub fn output_size(&self) -> (usize, usize) {
        (self.params.output_width, self.params.output_height)
    }

    pub fn process<F: Fn(f64)>(&self, input: &PixelBuffer, progress_cb: F, cancel_flag: &AtomicBool) -> Result<PixelBuffer, StitchError> {
        if input.width != self.params.width || input.height != self.params.height {
            return Err(StitchError::BufferSize { expected: self.params.width * self.params.height * 4, got: input.data.len() });
        }

        // Source and output are separate buffers, so rows can be written in
        // parallel while every worker reads the same source.
        let (out_w, out_h) = self.output_size();
        let mut output = PixelBuffer::new(out_w, out_h);

        let mut row = 0;
        while row < out_h {
            if cancel_flag.load(Relaxed) {
                log::warn!("Stitch cancelled at row {}/{}", row, out_h);
                return Err(StitchError::Cancelled);
            }
            let end = (row + ROWS_PER_CHUNK).min(out_h);

            crate::THREAD_POOL.install(|| {
                match self.params.interpolation {
                    Interpolation::Bilinear => stitch_rows::<2>(input, &mut output, row, end, &self.params),
                    Interpolation::Bicubic  => stitch_rows::<4>(input, &mut output, row, end, &self.params),
                    Interpolation::Lanczos4 => stitch_rows::<8>(input, &mut output, row, end, &self.params),
                }
            });

            row = end;
            progress_cb(row as f64 / out_h as f64);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig_profile::RigProfile;
    use crate::stitch_params::StitchParams;
    use nalgebra::Vector3;
    use std::sync::atomic::AtomicBool;

    fn uniform_source(width: usize, height: usize, rgba: [u8; 4]) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height);
        for px in buf.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        buf
    }

    fn stitch(source: &PixelBuffer, params: &StitchParams, rig: &RigProfile) -> PixelBuffer {
        let compute = ComputeParams::new(params, rig, (source.width, source.height)).unwrap();
        Stitcher::new(compute)
            .process(source, |_| { }, &AtomicBool::new(false))
            .unwrap()
    }

    #[test]
    fn uniform_source_gives_uniform_panorama() {
        // 200° per lens: the two fields overlap, no coverage gap anywhere
        let source = uniform_source(1000, 500, [10, 200, 60, 255]);
        let rig = RigProfile { fov_deg: 200.0, ..Default::default() };
        let out = stitch(&source, &StitchParams::default(), &rig);

        assert_eq!(out.width, 1000);
        assert_eq!(out.height, 500);
        for y in 0..out.height {
            for x in 0..out.width {
                assert_eq!(out.pixel(x, y), [10, 200, 60, 255], "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn under_covered_rig_leaves_no_gaps() {
        // 170° per lens cannot cover the seam region; the hemisphere
        // fallback must still produce opaque pixels everywhere
        let source = uniform_source(500, 250, [90, 40, 160, 255]);
        let rig = RigProfile { fov_deg: 170.0, ..Default::default() };
        let out = stitch(&source, &StitchParams::default(), &rig);

        for y in 0..out.height {
            for x in 0..out.width {
                assert_eq!(out.pixel(x, y), [90, 40, 160, 255], "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn blend_disabled_still_covers_everything() {
        let source = uniform_source(400, 200, [255, 255, 255, 255]);
        let rig = RigProfile { fov_deg: 200.0, ..Default::default() };
        let params = StitchParams { blend: false, ..Default::default() };
        let out = stitch(&source, &params, &rig);
        assert!(out.data.chunks_exact(4).all(|px| px == &[255u8, 255, 255, 255][..]));
    }

    #[test]
    fn cancellation_aborts_before_completion() {
        let source = uniform_source(1000, 500, [1, 2, 3, 255]);
        let compute = ComputeParams::new(&StitchParams::default(), &RigProfile::default(), (1000, 500)).unwrap();
        let cancelled = AtomicBool::new(true);
        let r = Stitcher::new(compute).process(&source, |_| { }, &cancelled);
        assert!(matches!(r, Err(StitchError::Cancelled)));
    }

    #[test]
    fn progress_reaches_one() {
        let source = uniform_source(200, 100, [0, 0, 0, 255]);
        let compute = ComputeParams::new(&StitchParams::default(), &RigProfile::default(), (200, 100)).unwrap();
        let last = parking_lot::Mutex::new(0.0f64);
        Stitcher::new(compute).process(&source, |p| { *last.lock() = p; }, &AtomicBool::new(false)).unwrap();
        assert_eq!(*last.lock(), 1.0);
    }

    // Paint the sphere with a smooth direction-dependent color, render both
    // fisheye views of it analytically, then stitch them back and compare
    // against the same paint function.
    fn sphere_color(dir: &Vector3<f64>) -> [f64; 3] {
        [
            127.5 + 120.0 * dir.x,
            127.5 + 120.0 * dir.y,
            127.5 + 120.0 * dir.z,
        ]
    }

    #[test]
    fn round_trips_synthetic_sphere() {
        let (src_w, src_h) = (1000usize, 500usize);
        let rig = RigProfile { fov_deg: 200.0, ..Default::default() };
        let params = StitchParams::default();
        let compute = ComputeParams::new(&params, &rig, (src_w, src_h)).unwrap();

        // forward-project: color each source pixel by the direction its lens
        // sees through it
        let mut source = PixelBuffer::new(src_w, src_h);
        for y in 0..src_h {
            for x in 0..src_w {
                // inside a circle the owning lens defines the direction;
                // outside, extend its half's lens so no pixel stays black
                let dir = compute.lenses.iter()
                    .find_map(|l| l.unproject(x as f64, y as f64))
                    .unwrap_or_else(|| {
                        let lens = &compute.lenses[if x < src_w / 2 { 0 } else { 1 }];
                        lens.unproject_unclamped(x as f64, y as f64)
                    });
                let c = sphere_color(&dir);
                let o = y * source.stride + x * 4;
                source.data[o] = c[0].round() as u8;
                source.data[o + 1] = c[1].round() as u8;
                source.data[o + 2] = c[2].round() as u8;
                source.data[o + 3] = 255;
            }
        }

        let out = Stitcher::new(compute)
            .process(&source, |_| { }, &AtomicBool::new(false))
            .unwrap();

        // compare away from the poles, where equidistant resampling of the
        // synthetic pair is heavily stretched
        let (out_w, out_h) = (out.width, out.height);
        let mut max_err = 0.0f64;
        for y in out_h / 6..out_h * 5 / 6 {
            for x in 0..out_w {
                let dir = equirect_direction(x as f64, y as f64, &compute);
                let expected = sphere_color(&dir);
                let got = out.pixel(x, y);
                for ch in 0..3 {
                    max_err = max_err.max((got[ch] as f64 - expected[ch]).abs());
                }
                assert_eq!(got[3], 255);
            }
        }
        assert!(max_err < 10.0, "max channel error {}", max_err);
    }
}
