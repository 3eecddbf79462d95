// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use serde::{ Serialize, Deserialize };

use crate::StitchError;

#[derive(Deserialize, Serialize, Default, Clone, Copy, Debug)]
pub struct LensPair<T> {
    pub left: T,
    pub right: T
}

/// Geometry of a dual-fisheye rig: where each lens looks and where its image
/// circle sits in the source raster. Loaded from a JSON profile; all centers
/// are normalized fractions of the source dimensions.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct RigProfile {
    pub name: String,
    pub note: String,
    pub calibrated_by: String,
    pub camera_brand: String,
    pub camera_model: String,

    /// Per-lens field of view in degrees, shared by both lenses.
    pub fov_deg: f64,
    /// Fraction of the geometric maximum radius accepted as inside the
    /// image circle.
    pub radius_scale: f64,
    pub centers: LensPair<[f64; 2]>,
    pub roll_deg: LensPair<f64>,
    pub yaw_bias_deg: LensPair<f64>,

    #[serde(skip)]
    pub filename: String,
}

impl Default for RigProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            note: String::new(),
            calibrated_by: String::new(),
            camera_brand: String::new(),
            camera_model: String::new(),

            fov_deg: 200.0,
            radius_scale: 1.0,
            centers: LensPair { left: [0.25, 0.5], right: [0.75, 0.5] },
            roll_deg: LensPair { left: 0.0, right: 0.0 },
            yaw_bias_deg: LensPair { left: 0.0, right: 0.0 },

            filename: String::new(),
        }
    }
}

impl RigProfile {
    pub fn from_json(json: &str) -> Result<Self, StitchError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load_from_file(&mut self, path: &str) -> Result<(), StitchError> {
        let data = std::fs::read_to_string(path)?;
        *self = Self::from_json(&data)?;
        self.filename = path.to_string();
        log::debug!("Loaded rig profile {} from {}", self.get_name(), path);
        Ok(())
    }

    pub fn get_json(&self) -> Result<String, StitchError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), StitchError> {
        std::fs::write(path, self.get_json()?)?;
        Ok(())
    }

    pub fn get_name(&self) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else if self.camera_brand.is_empty() && self.camera_model.is_empty() {
            format!("rig_{:.0}deg", self.fov_deg)
        } else {
            format!("{}_{}_{:.0}deg", self.camera_brand, self.camera_model, self.fov_deg)
        }
    }

    pub fn validate(&self) -> Result<(), StitchError> {
        if !self.fov_deg.is_finite() || self.fov_deg <= 0.0 || self.fov_deg > 360.0 {
            return Err(StitchError::InvalidFov(self.fov_deg));
        }
        if !self.radius_scale.is_finite() || self.radius_scale <= 0.0 || self.radius_scale > 1.0 {
            return Err(StitchError::InvalidRadiusScale(self.radius_scale));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        assert!(RigProfile::default().validate().is_ok());
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let p = RigProfile::from_json(r#"{ "name": "test rig", "fov_deg": 195.0 }"#).unwrap();
        assert_eq!(p.name, "test rig");
        assert_eq!(p.fov_deg, 195.0);
        assert_eq!(p.centers.left, [0.25, 0.5]);
        assert_eq!(p.centers.right, [0.75, 0.5]);
    }

    #[test]
    fn rejects_out_of_range_fov() {
        assert!(matches!(RigProfile::from_json(r#"{ "fov_deg": 0.0 }"#),   Err(StitchError::InvalidFov(_))));
        assert!(matches!(RigProfile::from_json(r#"{ "fov_deg": 400.0 }"#), Err(StitchError::InvalidFov(_))));
        assert!(matches!(RigProfile::from_json(r#"{ "radius_scale": 1.5 }"#), Err(StitchError::InvalidRadiusScale(_))));
    }

    #[test]
    fn json_round_trip() {
        let mut p = RigProfile::default();
        p.name = "rig".into();
        p.roll_deg.left = 1.25;
        let p2 = RigProfile::from_json(&p.get_json().unwrap()).unwrap();
        assert_eq!(p2.name, "rig");
        assert_eq!(p2.roll_deg.left, 1.25);
    }
}
