// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

pub mod rig_profile;
pub mod stitch_params;
pub mod stitching;
pub mod util;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use parking_lot::RwLock;

pub use rig_profile::RigProfile;
pub use stitch_params::StitchParams;
pub use stitching::{ Interpolation, PixelBuffer, Stitcher };

use stitching::ComputeParams;

lazy_static::lazy_static! {
    pub static ref THREAD_POOL: rayon::ThreadPool = rayon::ThreadPoolBuilder::new().build().unwrap();
}

#[derive(thiserror::Error, Debug)]
pub enum StitchError {
    #[error("Lens FOV must be in (0, 360] degrees, got {0}")]        InvalidFov(f64),
    #[error("Radius scale must be in (0, 1], got {0}")]              InvalidRadiusScale(f64),
    #[error("Output scale must be finite and positive, got {0}")]    InvalidScale(f64),
    #[error("Blend gamma must be finite and non-negative, got {0}")] InvalidGamma(f64),
    #[error("Source raster is empty ({0}x{1})")]                     EmptySource(usize, usize),
    #[error("Buffer size mismatch: expected {expected} bytes, got {got}")] BufferSize { expected: usize, got: usize },
    #[error("Cancelled")]                                            Cancelled,
    #[error("IO error: {0:?}")]                                      IOError(#[from] std::io::Error),
    #[error("JSON error: {0:?}")]                                    JsonError(#[from] serde_json::Error),
}

/// Owns the stitching configuration and runs stitch jobs against it.
/// Parameters are shared behind locks so a host UI or job queue can adjust
/// them between invocations; each invocation snapshots them into an
/// immutable `ComputeParams` before touching any pixel.
pub struct StitchManager {
    pub params: Arc<RwLock<StitchParams>>,
    pub rig: Arc<RwLock<RigProfile>>,
}

impl Default for StitchManager {
    fn default() -> Self {
        Self {
            params: Arc::new(RwLock::new(StitchParams::default())),
            rig: Arc::new(RwLock::new(RigProfile::default())),
        }
    }
}

impl StitchManager {
    pub fn load_rig_profile(&self, path: &str) -> Result<(), StitchError> {
        self.rig.write().load_from_file(path)
    }

    pub fn set_rig_profile(&self, rig: RigProfile) {
        *self.rig.write() = rig;
    }

    pub fn set_scale         (&self, v: f64)  { self.params.write().scale          = v; }
    pub fn set_global_yaw    (&self, v: f64)  { self.params.write().global_yaw_deg = v; }
    pub fn set_blend         (&self, v: bool) { self.params.write().blend          = v; }
    pub fn set_blend_gamma   (&self, v: f64)  { self.params.write().blend_gamma    = v; }
    pub fn set_interpolation (&self, v: Interpolation) { self.params.write().interpolation = v; }

    /// Output dimensions the current parameters produce for a given source.
    pub fn output_size(&self, source_size: (usize, usize)) -> Result<(usize, usize), StitchError> {
        let compute = ComputeParams::from_manager(self, source_size)?;
        Ok((compute.output_width, compute.output_height))
    }

    pub fn stitch(&self, source: &PixelBuffer) -> Result<PixelBuffer, StitchError> {
        self.stitch_with_progress(source, |_| { }, Arc::new(AtomicBool::new(false)))
    }

    /// `progress_cb` receives the fraction of finished rows after each chunk;
    /// raising `cancel_flag` stops the run at the next chunk boundary.
    pub fn stitch_with_progress<F: Fn(f64)>(&self, source: &PixelBuffer, progress_cb: F, cancel_flag: Arc<AtomicBool>) -> Result<PixelBuffer, StitchError> {
        let compute = ComputeParams::from_manager(self, (source.width, source.height))?;
        log::info!("Stitching {}x{} -> {}x{} ({}, {:?})",
            source.width, source.height, compute.output_width, compute.output_height,
            self.rig.read().get_name(), compute.interpolation);

        Stitcher::new(compute).process(source, progress_cb, &cancel_flag)
    }
}
