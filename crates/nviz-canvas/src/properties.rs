//! Typed per-object display properties with dirty tracking.
//!
//! Every attribute the engine accepts lives in a [`Tracked`] slot. Mutating a
//! slot marks it dirty; the property store pushes dirty slots to the engine and
//! clears them. Freshly built records start fully dirty so that a newly loaded
//! object receives its whole configuration on the first flush.

use crate::color::Rgb;
use crate::engine::SurfaceAttr;
use crate::settings::{ConstantDefaults, SurfaceDefaults, VectorDefaults, VolumeDefaults};
use serde::{Deserialize, Serialize};

// --- Engine draw-mode bits ---
const DM_WIRE: i32 = 0x0000_0001;
const DM_POLY: i32 = 0x0000_0004;
const DM_WIRE_POLY: i32 = 0x0000_0008;
const DM_GOURAUD: i32 = 0x0000_0100;
const DM_FLAT: i32 = 0x0000_0200;
const DM_GRID_WIRE: i32 = 0x0000_0400;
const DM_GRID_SURF: i32 = 0x0000_0800;

/// A value plus a "changed but not yet pushed" marker.
///
/// Equality compares values only, so two records with the same settings are
/// equal whatever their flush state.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    value: T,
    dirty: bool,
}

impl<T> Tracked<T> {
    /// A new slot; dirty until first pushed.
    pub fn new(value: T) -> Self {
        Self { value, dirty: true }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    /// Edits the value in place and marks it dirty.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear(&mut self) {
        self.dirty = false;
    }

    /// Mutable access that leaves the dirty flag alone.
    pub(crate) fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: PartialEq> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Where an attribute's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Not set; optional attributes are unset in the engine.
    Unset,
    /// A literal value.
    Constant,
    /// Values read from a map.
    Map,
}

/// A surface attribute: source mode plus value (literal or map name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapAttr {
    pub source: Source,
    pub value: String,
}

impl MapAttr {
    pub fn unset() -> Self {
        Self { source: Source::Unset, value: String::new() }
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Self { source: Source::Constant, value: value.into() }
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self { source: Source::Map, value: name.into() }
    }
}

// --- Surface draw settings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawResolution {
    Coarse,
    Fine,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStyle {
    Wire,
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shading {
    Flat,
    Gouraud,
}

impl DrawResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coarse => "coarse",
            Self::Fine => "fine",
            Self::Both => "both",
        }
    }
}

impl DrawStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wire => "wire",
            Self::Surface => "surface",
        }
    }
}

impl Shading {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Gouraud => "gouraud",
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Flat => DM_FLAT,
            Self::Gouraud => DM_GOURAUD,
        }
    }
}

/// Symbolic surface draw mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawDesc {
    pub mode: DrawResolution,
    pub style: DrawStyle,
    pub shading: Shading,
}

impl DrawDesc {
    /// Engine code for this mode/style/shading combination.
    pub fn code(&self) -> i32 {
        let mode = match self.mode {
            DrawResolution::Coarse => DM_WIRE,
            DrawResolution::Fine => DM_POLY,
            DrawResolution::Both => DM_WIRE_POLY,
        };
        let style = match self.style {
            DrawStyle::Wire => DM_GRID_WIRE,
            DrawStyle::Surface => DM_GRID_SURF,
        };
        mode | style | self.shading.code()
    }
}

/// Draw mode with its engine code resolved on first flush and cached.
#[derive(Debug, Clone)]
pub struct DrawMode {
    desc: DrawDesc,
    code: Option<i32>,
}

impl DrawMode {
    pub fn new(desc: DrawDesc) -> Self {
        Self { desc, code: None }
    }

    pub fn desc(&self) -> &DrawDesc {
        &self.desc
    }

    /// Cached engine code, if already resolved.
    pub fn cached_code(&self) -> Option<i32> {
        self.code
    }

    pub(crate) fn resolve(&mut self) -> i32 {
        let desc = self.desc;
        *self.code.get_or_insert_with(|| desc.code())
    }
}

impl PartialEq for DrawMode {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub fine: u32,
    pub coarse: u32,
}

/// Draw group of a surface. `apply_to_all` retargets the resolution, mode and
/// wire-color pushes at every loaded surface for the next flush only.
#[derive(Debug, Clone)]
pub struct DrawProps {
    pub apply_to_all: bool,
    pub mode: Tracked<DrawMode>,
    pub resolution: Tracked<Resolution>,
    pub wire_color: Tracked<Rgb>,
}

impl PartialEq for DrawProps {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode
            && self.resolution == other.resolution
            && self.wire_color == other.wire_color
    }
}

impl DrawProps {
    /// Replaces the symbolic draw mode; the engine code is recomputed lazily.
    pub fn set_mode(&mut self, desc: DrawDesc) {
        self.mode.set(DrawMode::new(desc));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProps {
    pub color: Tracked<MapAttr>,
    pub mask: Tracked<MapAttr>,
    pub transparency: Tracked<MapAttr>,
    pub shininess: Tracked<MapAttr>,
    pub draw: DrawProps,
    pub position: Tracked<[f64; 3]>,
}

impl SurfaceProps {
    /// Defaults for a raster; the raster itself colors the surface.
    pub fn from_defaults(defaults: &SurfaceDefaults, map_name: &str) -> Self {
        Self {
            color: Tracked::new(MapAttr::map(map_name)),
            mask: Tracked::new(MapAttr::unset()),
            transparency: Tracked::new(MapAttr::unset()),
            shininess: Tracked::new(defaults.shininess.clone()),
            draw: DrawProps {
                apply_to_all: false,
                mode: Tracked::new(DrawMode::new(defaults.draw)),
                resolution: Tracked::new(defaults.resolution),
                wire_color: Tracked::new(defaults.wire_color),
            },
            position: Tracked::new(defaults.position),
        }
    }

    /// The attribute channels in push order.
    pub fn attributes_mut(&mut self) -> [(SurfaceAttr, &mut Tracked<MapAttr>); 4] {
        [
            (SurfaceAttr::Color, &mut self.color),
            (SurfaceAttr::Mask, &mut self.mask),
            (SurfaceAttr::Transparency, &mut self.transparency),
            (SurfaceAttr::Shininess, &mut self.shininess),
        ]
    }

    pub fn mark_all_dirty(&mut self) {
        for (_, slot) in self.attributes_mut() {
            slot.mark_dirty();
        }
        self.draw.mode.mark_dirty();
        self.draw.resolution.mark_dirty();
        self.draw.wire_color.mark_dirty();
        self.position.mark_dirty();
    }
}

// --- Volumes ---

#[derive(Debug, Clone, PartialEq)]
pub struct IsosurfaceProps {
    pub color: Tracked<MapAttr>,
    pub mask: Tracked<MapAttr>,
    pub transparency: Tracked<MapAttr>,
    pub shininess: Tracked<MapAttr>,
    pub emission: Tracked<MapAttr>,
}

impl IsosurfaceProps {
    /// An isosurface colored by the volume map itself.
    pub fn new(map_name: &str, shininess: MapAttr) -> Self {
        Self {
            color: Tracked::new(MapAttr::map(map_name)),
            mask: Tracked::new(MapAttr::unset()),
            transparency: Tracked::new(MapAttr::unset()),
            shininess: Tracked::new(shininess),
            emission: Tracked::new(MapAttr::unset()),
        }
    }

    pub fn attributes_mut(&mut self) -> [(SurfaceAttr, &mut Tracked<MapAttr>); 5] {
        [
            (SurfaceAttr::Color, &mut self.color),
            (SurfaceAttr::Mask, &mut self.mask),
            (SurfaceAttr::Transparency, &mut self.transparency),
            (SurfaceAttr::Shininess, &mut self.shininess),
            (SurfaceAttr::Emission, &mut self.emission),
        ]
    }
}

/// Volume shading with a lazily resolved engine code.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeShading {
    pub shading: Shading,
    code: Option<i32>,
}

impl VolumeShading {
    pub fn new(shading: Shading) -> Self {
        Self { shading, code: None }
    }

    pub fn cached_code(&self) -> Option<i32> {
        self.code
    }

    pub(crate) fn resolve(&mut self) -> i32 {
        let shading = self.shading;
        *self.code.get_or_insert_with(|| shading.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProps {
    pub resolution: Tracked<u32>,
    pub shading: Tracked<VolumeShading>,
    /// Isosurfaces in engine index order.
    pub isosurfaces: Vec<IsosurfaceProps>,
}

impl VolumeProps {
    pub fn from_defaults(defaults: &VolumeDefaults) -> Self {
        Self {
            resolution: Tracked::new(defaults.resolution),
            shading: Tracked::new(VolumeShading::new(defaults.shading)),
            isosurfaces: Vec::new(),
        }
    }

    pub fn mark_all_dirty(&mut self) {
        self.resolution.mark_dirty();
        self.shading.mark_dirty();
        for iso in &mut self.isosurfaces {
            for (_, slot) in iso.attributes_mut() {
                slot.mark_dirty();
            }
        }
    }
}

// --- Vectors ---

/// A surface a vector overlay may be draped on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRef {
    pub name: String,
    pub show: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineMode {
    /// Flat lines are drawn at their own height, not draped.
    pub flat: bool,
    pub surfaces: Vec<SurfaceRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineProps {
    pub color: Tracked<Rgb>,
    pub width: Tracked<u32>,
    pub mode: Tracked<LineMode>,
    pub height: Tracked<f64>,
}

/// Point marker symbols; the engine numbers them from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    X,
    Box,
    Sphere,
    Cube,
    Diamond,
    DecTree,
    ConTree,
    Aster,
    Gyro,
    Histogram,
}

impl Marker {
    pub fn engine_code(self) -> i32 {
        self as i32 + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointProps {
    pub color: Tracked<Rgb>,
    pub width: Tracked<u32>,
    pub size: Tracked<f64>,
    pub marker: Tracked<Marker>,
    pub height: Tracked<f64>,
    pub surfaces: Tracked<Vec<SurfaceRef>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorProps {
    pub lines: LineProps,
    pub points: PointProps,
}

impl VectorProps {
    /// Defaults draped over every given raster; `color` overrides both line
    /// and point colors.
    pub fn from_defaults(defaults: &VectorDefaults, rasters: &[String], color: Option<Rgb>) -> Self {
        let surfaces: Vec<SurfaceRef> = rasters
            .iter()
            .map(|name| SurfaceRef { name: name.clone(), show: true })
            .collect();

        Self {
            lines: LineProps {
                color: Tracked::new(color.unwrap_or(defaults.lines.color)),
                width: Tracked::new(defaults.lines.width),
                mode: Tracked::new(LineMode {
                    flat: defaults.lines.flat,
                    surfaces: surfaces.clone(),
                }),
                height: Tracked::new(defaults.lines.height),
            },
            points: PointProps {
                color: Tracked::new(color.unwrap_or(defaults.points.color)),
                width: Tracked::new(defaults.points.width),
                size: Tracked::new(defaults.points.size),
                marker: Tracked::new(defaults.points.marker),
                height: Tracked::new(defaults.points.height),
                surfaces: Tracked::new(surfaces),
            },
        }
    }

    pub fn mark_all_dirty(&mut self) {
        let l = &mut self.lines;
        l.color.mark_dirty();
        l.width.mark_dirty();
        l.mode.mark_dirty();
        l.height.mark_dirty();

        let p = &mut self.points;
        p.color.mark_dirty();
        p.width.mark_dirty();
        p.size.mark_dirty();
        p.marker.mark_dirty();
        p.height.mark_dirty();
        p.surfaces.mark_dirty();
    }
}

// --- Constants ---

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantProps {
    pub value: Tracked<f64>,
    pub color: Tracked<Rgb>,
    pub resolution: Tracked<u32>,
}

impl ConstantProps {
    pub fn from_defaults(defaults: &ConstantDefaults) -> Self {
        Self {
            value: Tracked::new(defaults.value),
            color: Tracked::new(defaults.color),
            resolution: Tracked::new(defaults.resolution),
        }
    }

    pub(crate) fn clear_all(&mut self) {
        self.value.clear();
        self.color.clear();
        self.resolution.clear();
    }
}

/// Properties of a tree-backed layer, by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesRecord {
    Surface(SurfaceProps),
    Volume(VolumeProps),
    Vector(VectorProps),
}

impl PropertiesRecord {
    pub fn mark_all_dirty(&mut self) {
        match self {
            Self::Surface(p) => p.mark_all_dirty(),
            Self::Volume(p) => p.mark_all_dirty(),
            Self::Vector(p) => p.mark_all_dirty(),
        }
    }

    pub fn as_surface(&self) -> Option<&SurfaceProps> {
        match self {
            Self::Surface(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_surface_mut(&mut self) -> Option<&mut SurfaceProps> {
        match self {
            Self::Surface(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_volume_mut(&mut self) -> Option<&mut VolumeProps> {
        match self {
            Self::Volume(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut VectorProps> {
        match self {
            Self::Vector(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn test_tracked_set_marks_dirty() {
        let mut t = Tracked::new(1);
        t.clear();
        assert!(!t.is_dirty());
        t.set(2);
        assert!(t.is_dirty());
        assert_eq!(*t.get(), 2);
    }

    #[test]
    fn test_equality_ignores_dirty_state() {
        let a = Tracked::new(5u32);
        let mut b = Tracked::new(5u32);
        b.clear();
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_code_resolved_lazily_and_cached() {
        let desc = DrawDesc {
            mode: DrawResolution::Fine,
            style: DrawStyle::Surface,
            shading: Shading::Gouraud,
        };
        let mut mode = DrawMode::new(desc);
        assert_eq!(mode.cached_code(), None);
        let code = mode.resolve();
        assert_eq!(code, DM_POLY | DM_GRID_SURF | DM_GOURAUD);
        assert_eq!(mode.cached_code(), Some(code));
    }

    #[test]
    fn test_vector_defaults_drape_over_rasters() {
        let settings = Settings::default();
        let rasters = vec!["elevation".to_string(), "slope".to_string()];
        let props = VectorProps::from_defaults(&settings.vector, &rasters, Some(Rgb(255, 0, 0)));
        assert_eq!(*props.lines.color.get(), Rgb(255, 0, 0));
        assert_eq!(*props.points.color.get(), Rgb(255, 0, 0));
        assert_eq!(props.points.surfaces.get().len(), 2);
        assert!(props.lines.mode.get().surfaces.iter().all(|s| s.show));
    }

    #[test]
    fn test_marker_codes_start_at_one() {
        assert_eq!(Marker::X.engine_code(), 1);
        assert_eq!(Marker::Histogram.engine_code(), 10);
    }
}
