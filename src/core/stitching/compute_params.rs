// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use super::equidistant::EquidistantLens;
use super::lens_basis::{ LensBasis, LensSide };
use super::Interpolation;
use crate::rig_profile::RigProfile;
use crate::stitch_params::StitchParams;
use crate::{ StitchError, StitchManager };

/// Everything the pixel kernel needs, derived once per stitch invocation and
/// immutable during the pixel loop.
#[derive(Clone, Copy, Debug)]
pub struct ComputeParams {
    pub width: usize,  // source raster
    pub height: usize,
    pub output_width: usize,
    pub output_height: usize,

    pub global_yaw: f64, // radians
    pub blend: bool,
    pub interpolation: Interpolation,

    pub lenses: [EquidistantLens; 2],
}

impl ComputeParams {
    pub fn from_manager(mgr: &StitchManager, source_size: (usize, usize)) -> Result<Self, StitchError> {
        let params = *mgr.params.read();
        let rig = mgr.rig.read().clone();
        Self::new(&params, &rig, source_size)
    }

    pub fn new(params: &StitchParams, rig: &RigProfile, source_size: (usize, usize)) -> Result<Self, StitchError> {
        params.validate()?;
        rig.validate()?;

        let (width, height) = source_size;
        if width == 0 || height == 0 {
            return Err(StitchError::EmptySource(width, height));
        }

        // Keep the width even so height = width / 2 holds exactly
        let mut output_width = (width as f64 * params.scale).round() as usize;
        output_width = (output_width - output_width % 2).max(2);
        let output_height = output_width / 2;

        let radius = (width as f64 * 0.25).min(height as f64 * 0.5) * rig.radius_scale;
        let half_fov = (rig.fov_deg / 2.0).to_radians();
        let gamma = params.blend_gamma;

        let make_lens = |side: LensSide, center: [f64; 2], roll_deg: f64, yaw_bias_deg: f64| {
            let basis = LensBasis::new(side, yaw_bias_deg.to_radians(), roll_deg.to_radians());
            EquidistantLens::new(basis, (center[0] * width as f64, center[1] * height as f64), radius, half_fov, gamma)
        };

        Ok(Self {
            width,
            height,
            output_width,
            output_height,
            global_yaw: params.global_yaw_deg.to_radians(),
            blend: params.blend,
            interpolation: params.interpolation,
            lenses: [
                make_lens(LensSide::Left,  rig.centers.left,  rig.roll_deg.left,  rig.yaw_bias_deg.left),
                make_lens(LensSide::Right, rig.centers.right, rig.roll_deg.right, rig.yaw_bias_deg.right),
            ],
        })
    }
}
