//! User preferences for the 3D canvas.
//!
//! Every section has built-in defaults, so a preferences file only needs the
//! keys it overrides.

use crate::color::Rgb;
use crate::engine::FenceColor;
use crate::error::Result;
use crate::properties::{DrawDesc, DrawResolution, DrawStyle, MapAttr, Marker, Resolution, Shading};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub view: ViewSettings,
    pub light: LightSettings,
    pub cplane: CPlaneSettings,
    pub surface: SurfaceDefaults,
    pub volume: VolumeDefaults,
    pub vector: VectorDefaults,
    pub constant: ConstantDefaults,
}

impl Settings {
    /// Loads preferences from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Base camera values restored by a view reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Eye position as fractions of the region extent.
    pub position: [f64; 2],
    pub perspective: f64,
    /// Perspective change per mouse-wheel notch.
    pub perspective_step: f64,
    pub twist: f64,
    pub background: Rgb,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            position: [0.84, 0.16],
            perspective: 40.0,
            perspective_step: 5.0,
            twist: 0.0,
            background: Rgb::WHITE,
        }
    }
}

/// Light in UI units: z, brightness and ambient on a 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub position: [f64; 3],
    pub color: Rgb,
    pub brightness: f64,
    pub ambient: f64,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            position: [0.68, -0.68, 80.0],
            color: Rgb::WHITE,
            brightness: 80.0,
            ambient: 20.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CPlaneSettings {
    pub tilt: f64,
    pub rotation: f64,
    pub position: [f64; 3],
    pub shading: FenceColor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceDefaults {
    pub shininess: MapAttr,
    pub draw: DrawDesc,
    pub resolution: Resolution,
    pub wire_color: Rgb,
    pub position: [f64; 3],
}

impl Default for SurfaceDefaults {
    fn default() -> Self {
        Self {
            shininess: MapAttr::constant("60.0"),
            draw: DrawDesc {
                mode: DrawResolution::Fine,
                style: DrawStyle::Surface,
                shading: Shading::Gouraud,
            },
            resolution: Resolution { fine: 6, coarse: 9 },
            wire_color: Rgb(136, 136, 136),
            position: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeDefaults {
    pub resolution: u32,
    pub shading: Shading,
}

impl Default for VolumeDefaults {
    fn default() -> Self {
        Self { resolution: 3, shading: Shading::Gouraud }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDefaults {
    pub color: Rgb,
    pub width: u32,
    pub flat: bool,
    pub height: f64,
}

impl Default for LineDefaults {
    fn default() -> Self {
        Self { color: Rgb(0, 0, 255), width: 2, flat: false, height: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PointDefaults {
    pub color: Rgb,
    pub width: u32,
    pub size: f64,
    pub marker: Marker,
    pub height: f64,
}

impl Default for PointDefaults {
    fn default() -> Self {
        Self {
            color: Rgb(0, 0, 255),
            width: 2,
            size: 100.0,
            marker: Marker::Sphere,
            height: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDefaults {
    pub lines: LineDefaults,
    pub points: PointDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantDefaults {
    pub value: f64,
    pub color: Rgb,
    pub resolution: u32,
}

impl Default for ConstantDefaults {
    fn default() -> Self {
        Self { value: 0.0, color: Rgb::BLACK, resolution: 6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{"view":{"perspective":25},"light":{"ambient":35}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.view.perspective, 25.0);
        assert_eq!(settings.view.perspective_step, 5.0);
        assert_eq!(settings.light.ambient, 35.0);
        assert_eq!(settings.light.brightness, 80.0);
        assert_eq!(settings.surface.resolution, Resolution { fine: 6, coarse: 9 });
    }
}
