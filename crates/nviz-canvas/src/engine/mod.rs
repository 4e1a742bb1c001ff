//! The boundary to the native 3D display engine.
//!
//! The engine owns every GPU-side object and all numeric rendering. This crate
//! only keeps a mirror of engine object ids and attribute state, and drives the
//! engine through [`DisplayEngine`]. The engine is not thread-safe; a canvas
//! talks to it from exactly one thread at a time.

pub mod recording;

pub use self::recording::RecordingEngine;

use crate::color::Rgb;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// Opaque handle returned by the engine for a loaded scene object.
/// Negative values returned from a load call signal failure.
pub type ObjectId = i32;

/// Wildcard target for surface draw calls: every loaded surface.
pub const ALL_SURFACES: ObjectId = -1;

// --- Quick-draw mask bits ---
pub const DRAW_QUICK_SURFACE: u32 = 0x01;
pub const DRAW_QUICK_VLINES: u32 = 0x02;
pub const DRAW_QUICK_VPOINTS: u32 = 0x04;
pub const DRAW_QUICK_VOLUME: u32 = 0x08;

/// Kinds of engine objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Surface,
    Volume,
    VectorLines,
    VectorPoints,
    Constant,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Surface => "raster",
            Self::Volume => "3d raster",
            Self::VectorLines => "vector (lines)",
            Self::VectorPoints => "vector (points)",
            Self::Constant => "constant",
        })
    }
}

/// Attribute channels shared by surfaces and isosurfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceAttr {
    Color,
    Mask,
    Transparency,
    Shininess,
    Emission,
}

impl SurfaceAttr {
    /// Only optional attributes have an unset form in the engine.
    pub fn supports_unset(self) -> bool {
        matches!(self, Self::Mask | Self::Transparency | Self::Emission)
    }
}

/// Cutting-plane fence shading modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FenceColor {
    Off,
    Above,
    Below,
    Blend,
    #[default]
    Grey,
}

impl FenceColor {
    pub fn code(self) -> i32 {
        match self {
            Self::Off => 0,
            Self::Above => 1,
            Self::Below => 2,
            Self::Blend => 3,
            Self::Grey => 4,
        }
    }
}

/// Values returned by the engine when the view is reset to defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewDefaults {
    pub z_exag: f64,
    pub height: f64,
    pub height_min: f64,
    pub height_max: f64,
}

/// Light parameters in the fractional ranges the engine expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub position: [f64; 3],
    pub color: Rgb,
    pub brightness: f64,
    pub ambient: f64,
}

/// Result of querying a surface under a screen position.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Elevation map value, formatted by the engine.
    pub elevation: String,
    /// Color map value, formatted by the engine.
    pub color: String,
    /// Surface the point lies on.
    pub id: ObjectId,
}

/// Operations the canvas needs from the native display engine.
pub trait DisplayEngine {
    // --- Loading ---
    fn load_surface(&mut self, name: &str) -> ObjectId;
    fn load_volume(&mut self, name: &str) -> ObjectId;
    fn load_vector(&mut self, name: &str, points: bool) -> ObjectId;
    fn add_constant(&mut self, value: f64, color: Rgb) -> ObjectId;
    fn unload_surface(&mut self, id: ObjectId) -> bool;
    fn unload_volume(&mut self, id: ObjectId) -> bool;
    fn unload_vector(&mut self, id: ObjectId, points: bool) -> bool;

    // --- Surface attributes ---
    fn set_surface_attr(&mut self, id: ObjectId, attr: SurfaceAttr, map: bool, value: &str);
    fn unset_surface_attr(&mut self, id: ObjectId, attr: SurfaceAttr);
    fn set_surface_topo(&mut self, id: ObjectId, map: bool, value: &str);
    fn set_surface_res(&mut self, id: ObjectId, fine: u32, coarse: u32);
    fn set_surface_style(&mut self, id: ObjectId, style: i32);
    fn set_wire_color(&mut self, id: ObjectId, color: Rgb);
    fn set_surface_position(&mut self, id: ObjectId, x: f64, y: f64, z: f64);

    // --- Volume attributes ---
    fn set_isosurface_res(&mut self, id: ObjectId, res: u32);
    fn set_isosurface_attr(
        &mut self,
        id: ObjectId,
        isosurf: usize,
        attr: SurfaceAttr,
        map: bool,
        value: &str,
    );
    fn unset_isosurface_attr(&mut self, id: ObjectId, isosurf: usize, attr: SurfaceAttr);

    // --- Vector attributes; mode setters return an engine status code ---
    fn set_vector_line_mode(&mut self, id: ObjectId, color: Rgb, width: u32, flat: bool) -> i32;
    fn set_vector_line_height(&mut self, id: ObjectId, height: f64);
    fn set_vector_line_surface(&mut self, id: ObjectId, surface: ObjectId);
    fn unset_vector_line_surface(&mut self, id: ObjectId, surface: ObjectId);
    fn set_vector_point_mode(
        &mut self,
        id: ObjectId,
        color: Rgb,
        width: u32,
        size: f64,
        marker: i32,
    ) -> i32;
    fn set_vector_point_height(&mut self, id: ObjectId, height: f64);
    fn set_vector_point_surface(&mut self, id: ObjectId, surface: ObjectId);
    fn unset_vector_point_surface(&mut self, id: ObjectId, surface: ObjectId);

    // --- View & light ---
    fn init_view(&mut self);
    fn resize_window(&mut self, width: u32, height: u32);
    fn set_view(&mut self, x: f64, y: f64, height: f64, perspective: f64, twist: f64);
    fn set_z_exag(&mut self, z_exag: f64);
    fn set_focus(&mut self, x: f64, y: f64, z: f64);
    fn focus(&self) -> [f64; 3];
    fn set_view_default(&mut self) -> ViewDefaults;
    fn look_at_center(&mut self);
    fn look_here(&mut self, x: i32, y: i32);
    fn set_light(&mut self, light: &LightParams);
    fn draw_lighting_model(&mut self);

    // --- Cutting planes ---
    fn cplane_count(&self) -> usize;
    fn select_cplane(&mut self, index: usize);
    fn unselect_cplane(&mut self, index: usize);
    fn set_cplane_rotation(&mut self, index: usize, tilt: f64, rotation: f64);
    fn set_cplane_translation(&mut self, index: usize, x: f64, y: f64, z: f64);
    fn set_fence_color(&mut self, color: FenceColor);

    // --- Rendering, queries, output ---
    fn draw(&mut self, quick: bool, mask: u32);
    fn draw_fringe(&mut self);
    fn erase_map(&mut self);
    fn query_map(&mut self, x: i32, y: i32) -> Option<QueryHit>;
    fn distance_along_surface(
        &mut self,
        id: ObjectId,
        from: [f64; 2],
        to: [f64; 2],
        use_exag: bool,
    ) -> f64;
    fn save_to_file(&mut self, path: &Path, width: u32, height: u32) -> bool;
}
