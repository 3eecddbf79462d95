// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use nalgebra::Vector3;

use super::lens_basis::LensBasis;

/// One lens's contribution to an output pixel: fractional source coordinates
/// and the feather weight used by the blend.
#[derive(Clone, Copy, Debug)]
pub struct LensSample {
    pub sx: f64,
    pub sy: f64,
    pub weight: f64,
}

/// Equidistant fisheye lens: image radius is proportional to the incidence
/// angle, r = f·θ with f = radius / half_fov.
#[derive(Clone, Copy, Debug)]
pub struct EquidistantLens {
    pub basis: LensBasis,
    pub center: (f64, f64), // pixels in the source raster
    pub radius: f64,        // calibrated image circle radius, pixels
    pub half_fov: f64,      // radians
    pub focal: f64,         // radius / half_fov
    pub gamma: f64,         // feather falloff exponent
}

impl EquidistantLens {
    pub fn new(basis: LensBasis, center: (f64, f64), radius: f64, half_fov: f64, gamma: f64) -> Self {
        Self { basis, center, radius, half_fov, focal: radius / half_fov, gamma }
    }

    /// Map a unit view direction into this lens's image circle.
    /// Returns `None` outside the angular field or outside the calibrated
    /// circle (sensor crops can cut the circle short of the angular field).
    pub fn project(&self, dir: &Vector3<f64>) -> Option<LensSample> {
        // Rounding can push a unit dot product just past ±1, clamp before acos
        let theta = self.basis.axis.dot(dir).clamp(-1.0, 1.0).acos();
        if theta > self.half_fov {
            return None;
        }

        let (sx, sy) = self.project_with_theta(dir, theta);

        let dx = sx - self.center.0;
        let dy = sy - self.center.1;
        if dx * dx + dy * dy > self.radius * self.radius {
            return None;
        }

        let weight = (1.0 - theta / self.half_fov).max(0.0).powf(self.gamma);
        Some(LensSample { sx, sy, weight })
    }

    /// Same mapping with the FOV and circle rejection skipped. Used by the
    /// coverage-gap fallback; the result can land outside the calibrated
    /// circle, or outside the source raster entirely.
    pub fn project_unclamped(&self, dir: &Vector3<f64>) -> (f64, f64) {
        let theta = self.basis.axis.dot(dir).clamp(-1.0, 1.0).acos();
        self.project_with_theta(dir, theta)
    }

    fn project_with_theta(&self, dir: &Vector3<f64>, theta: f64) -> (f64, f64) {
        // atan2(v·right, v·up): α = 0 along "up", growing toward "right",
        // matching the (sin α, −cos α) sampling below
        let alpha = dir.dot(&self.basis.right).atan2(dir.dot(&self.basis.up));
        let d = self.focal * theta;
        (self.center.0 + d * alpha.sin(), self.center.1 - d * alpha.cos())
    }

    /// Inverse of `project`: a point inside the image circle back to a unit
    /// view direction.
    pub fn unproject(&self, sx: f64, sy: f64) -> Option<Vector3<f64>> {
        let dx = sx - self.center.0;
        let dy = sy - self.center.1;
        if dx * dx + dy * dy > self.radius * self.radius {
            return None;
        }
        Some(self.unproject_unclamped(sx, sy))
    }

    /// Inverse of `project_unclamped`: no circle check, any source point back
    /// to the direction the equidistant law assigns it.
    pub fn unproject_unclamped(&self, sx: f64, sy: f64) -> Vector3<f64> {
        let dx = sx - self.center.0;
        let dy = sy - self.center.1;
        let d = (dx * dx + dy * dy).sqrt();

        let theta = d / self.focal;
        let alpha = dx.atan2(-dy);
        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_a, cos_a) = alpha.sin_cos();
        self.basis.axis * cos_t + (self.basis.right * sin_a + self.basis.up * cos_a) * sin_t
    }

    pub fn id() -> &'static str { "equidistant" }
    pub fn name() -> &'static str { "Equidistant" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::lens_basis::LensSide;
    use test_case::test_case;

    fn lens(gamma: f64) -> EquidistantLens {
        let basis = LensBasis::new(LensSide::Left, 0.0, 0.0);
        EquidistantLens::new(basis, (250.0, 250.0), 235.0, 100f64.to_radians(), gamma)
    }

    #[test]
    fn on_axis_hits_center_with_full_weight() {
        let l = lens(1.0);
        let s = l.project(&Vector3::x()).unwrap();
        assert!((s.sx - 250.0).abs() < 1e-9);
        assert!((s.sy - 250.0).abs() < 1e-9);
        assert!((s.weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn field_edge_maps_to_circle_radius() {
        let l = lens(1.0);
        // direction at exactly half_fov incidence, tilted toward "up"
        let theta = l.half_fov;
        let dir = l.basis.axis * theta.cos() + l.basis.up * theta.sin();
        let (sx, sy) = l.project_unclamped(&dir);
        let d = ((sx - 250.0).powi(2) + (sy - 250.0).powi(2)).sqrt();
        assert!((d - l.radius).abs() < 1e-6);
    }

    #[test_case(0.0)]
    #[test_case(1.0)]
    #[test_case(2.5)]
    fn feather_weight_is_one_on_axis(gamma: f64) {
        let l = lens(gamma);
        assert!((l.project(&Vector3::x()).unwrap().weight - 1.0).abs() < 1e-12);
    }

    #[test_case(1.0)]
    #[test_case(2.5)]
    fn feather_weight_vanishes_at_field_edge(gamma: f64) {
        let l = lens(gamma);
        let theta = l.half_fov * 0.9999;
        let dir = l.basis.axis * theta.cos() + l.basis.up * theta.sin();
        let s = l.project(&dir).unwrap();
        assert!(s.weight < 1e-3);
    }

    #[test]
    fn feather_weight_is_monotonic() {
        let l = lens(2.0);
        let mut last = f64::INFINITY;
        for i in 0..100 {
            let theta = l.half_fov * (i as f64 / 100.0) * 0.999;
            let dir = l.basis.axis * theta.cos() + l.basis.up * theta.sin();
            let w = l.project(&dir).unwrap().weight;
            assert!(w <= last + 1e-12);
            last = w;
        }
    }

    #[test]
    fn outside_fov_is_not_covered() {
        let l = lens(1.0);
        assert!(l.project(&-Vector3::x()).is_none());
    }

    #[test]
    fn unproject_round_trips() {
        let l = lens(1.0);
        for &(sx, sy) in &[(250.0, 250.0), (300.0, 200.0), (120.0, 310.0), (250.0, 40.0)] {
            let dir = l.unproject(sx, sy).unwrap();
            assert!((dir.norm() - 1.0).abs() < 1e-9);
            let s = l.project(&dir).unwrap();
            assert!((s.sx - sx).abs() < 1e-6, "sx {} vs {}", s.sx, sx);
            assert!((s.sy - sy).abs() < 1e-6, "sy {} vs {}", s.sy, sy);
        }
    }
}
