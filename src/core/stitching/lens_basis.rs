// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use nalgebra::Vector3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LensSide {
    Left,
    Right
}

/// Orthonormal sampling frame of one fisheye lens: optical axis, "up" and
/// "right" as seen in that lens's image circle.
#[derive(Clone, Copy, Debug)]
pub struct LensBasis {
    pub axis:  Vector3<f64>,
    pub up:    Vector3<f64>,
    pub right: Vector3<f64>,
}

/// Rodrigues axis-angle rotation: v·cosθ + (axis×v)·sinθ + axis·(axis·v)·(1−cosθ).
/// `axis` must be unit length.
pub fn rotate_axis_angle(v: Vector3<f64>, axis: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    let (sin_a, cos_a) = angle.sin_cos();
    v * cos_a + axis.cross(&v) * sin_a + axis * (axis.dot(&v) * (1.0 - cos_a))
}

impl LensBasis {
    /// Canonical frames: +X / −X axes, +Z up, and "right" with opposite sign
    /// per lens so azimuth runs the same way in both image circles.
    pub fn new(side: LensSide, yaw_bias_rad: f64, roll_rad: f64) -> Self {
        let vertical = Vector3::z();
        let (axis, up, right) = match side {
            LensSide::Left  => ( Vector3::x(), vertical,  Vector3::y()),
            LensSide::Right => (-Vector3::x(), vertical, -Vector3::y()),
        };

        // Yaw bias turns the whole frame about the world vertical. `up` is
        // parallel to the vertical so only axis and right actually move.
        let axis  = rotate_axis_angle(axis,  &vertical, yaw_bias_rad);
        let up    = rotate_axis_angle(up,    &vertical, yaw_bias_rad);
        let right = rotate_axis_angle(right, &vertical, yaw_bias_rad);

        // Roll spins the sampling frame about the lens's own axis.
        let up    = rotate_axis_angle(up,    &axis, roll_rad);
        let right = rotate_axis_angle(right, &axis, roll_rad);

        Self { axis, up, right }
    }
}
