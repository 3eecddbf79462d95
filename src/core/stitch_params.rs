// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use crate::stitching::Interpolation;
use crate::StitchError;

/// Runtime stitching parameters. Constructed once per stitch invocation and
/// read-only from then on; lens geometry lives in `RigProfile`.
#[derive(Clone, Copy, Debug)]
pub struct StitchParams {
    /// Output width relative to source width.
    pub scale: f64,
    /// Rotates the whole panorama horizontally.
    pub global_yaw_deg: f64,
    /// Feather blend in the overlap region. When off, the lens with the
    /// higher feather weight wins outright.
    pub blend: bool,
    /// Feather falloff exponent. 1 = linear, larger = sharper falloff away
    /// from the lens center.
    pub blend_gamma: f64,

    pub interpolation: Interpolation,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            global_yaw_deg: 0.0,
            blend: true,
            blend_gamma: 1.0,
            interpolation: Interpolation::default(),
        }
    }
}

impl StitchParams {
    pub fn validate(&self) -> Result<(), StitchError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(StitchError::InvalidScale(self.scale));
        }
        if !self.blend_gamma.is_finite() || self.blend_gamma < 0.0 {
            return Err(StitchError::InvalidGamma(self.blend_gamma));
        }
        Ok(())
    }
}
