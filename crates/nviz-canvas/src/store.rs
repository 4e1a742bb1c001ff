//! Pushes dirty properties to the display engine.
//!
//! [`PropertyStore`] walks the fixed schema of each object kind, issues an
//! engine call for every dirty slot and clears the slot afterwards. Clean
//! slots never produce calls, so flushing the same record twice without an
//! intervening edit is a no-op the second time.

use crate::color::Rgb;
use crate::engine::{DisplayEngine, ObjectId, SurfaceAttr, ALL_SURFACES};
use crate::error::{ApplyFailure, Result, SceneError};
use crate::properties::{
    ConstantProps, LineProps, MapAttr, PointProps, Source, SurfaceProps, SurfaceRef, Tracked,
    VolumeProps,
};
use std::collections::HashMap;

/// Live surfaces a vector overlay can be draped on, by display name.
/// Rasters take precedence over constants of the same name.
#[derive(Debug, Clone, Default)]
pub struct SurfaceIndex {
    rasters: HashMap<String, ObjectId>,
    constants: HashMap<String, ObjectId>,
}

impl SurfaceIndex {
    pub fn insert_raster(&mut self, name: &str, id: ObjectId) {
        self.rasters.insert(name.to_owned(), id);
    }

    pub fn insert_constant(&mut self, name: &str, id: ObjectId) {
        self.constants.insert(name.to_owned(), id);
    }

    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.rasters
            .get(name)
            .or_else(|| self.constants.get(name))
            .copied()
    }
}

#[derive(Clone, Copy)]
enum Overlay {
    Lines,
    Points,
}

pub struct PropertyStore<'a, E: DisplayEngine> {
    engine: &'a mut E,
    surfaces: &'a SurfaceIndex,
}

impl<'a, E: DisplayEngine> PropertyStore<'a, E> {
    pub fn new(engine: &'a mut E, surfaces: &'a SurfaceIndex) -> Self {
        Self { engine, surfaces }
    }

    /// Pushes one attribute slot. Returns whether an engine call was made.
    fn push_attr(
        &mut self,
        slot: &mut Tracked<MapAttr>,
        attr: SurfaceAttr,
        set: impl FnOnce(&mut E, bool, &str),
        unset: impl FnOnce(&mut E),
    ) -> bool {
        if !slot.is_dirty() {
            return false;
        }

        let MapAttr { source, value } = slot.get();
        let called = match source {
            Source::Unset if attr.supports_unset() => {
                unset(&mut *self.engine);
                true
            }
            Source::Unset => false,
            // Empty values mean there is nothing to apply.
            _ if value.is_empty() => false,
            Source::Constant | Source::Map => {
                set(&mut *self.engine, *source == Source::Map, value.as_str());
                true
            }
        };
        slot.clear();
        called
    }

    /// Flushes a raster surface; returns the number of engine calls.
    pub fn apply_surface(&mut self, id: ObjectId, props: &mut SurfaceProps) -> usize {
        let mut applied = 0;

        for (attr, slot) in props.attributes_mut() {
            let pushed = self.push_attr(
                slot,
                attr,
                // Masks are always raster maps and never inverted.
                |e, map, value| e.set_surface_attr(id, attr, map || attr == SurfaceAttr::Mask, value),
                |e| e.unset_surface_attr(id, attr),
            );
            applied += usize::from(pushed);
        }

        let draw = &mut props.draw;
        let target = if draw.apply_to_all { ALL_SURFACES } else { id };

        if draw.resolution.is_dirty() {
            let res = *draw.resolution.get();
            self.engine.set_surface_res(target, res.fine, res.coarse);
            draw.resolution.clear();
            applied += 1;
        }

        if draw.mode.is_dirty() {
            let style = draw.mode.value_mut().resolve();
            self.engine.set_surface_style(target, style);
            draw.mode.clear();
            applied += 1;
        }

        if draw.wire_color.is_dirty() {
            self.engine.set_wire_color(target, *draw.wire_color.get());
            draw.wire_color.clear();
            applied += 1;
        }

        // The wildcard only applies to the push it was requested for.
        draw.apply_to_all = false;

        if props.position.is_dirty() {
            let [x, y, z] = *props.position.get();
            self.engine.set_surface_position(id, x, y, z);
            props.position.clear();
            applied += 1;
        }

        tracing::debug!(id, applied, "surface properties applied");
        applied
    }

    /// Flushes a volume and its isosurfaces.
    pub fn apply_volume(&mut self, id: ObjectId, props: &mut VolumeProps) -> usize {
        let mut applied = 0;

        if props.resolution.is_dirty() {
            self.engine.set_isosurface_res(id, *props.resolution.get());
            props.resolution.clear();
            applied += 1;
        }

        // Shading is consumed by the isosurface draw pass; only the code is cached here.
        if props.shading.is_dirty() {
            props.shading.value_mut().resolve();
            props.shading.clear();
        }

        for (index, iso) in props.isosurfaces.iter_mut().enumerate() {
            for (attr, slot) in iso.attributes_mut() {
                let pushed = self.push_attr(
                    slot,
                    attr,
                    |e, map, value| e.set_isosurface_attr(id, index, attr, map, value),
                    |e| e.unset_isosurface_attr(id, index, attr),
                );
                applied += usize::from(pushed);
            }
        }

        tracing::debug!(id, applied, "volume properties applied");
        applied
    }

    /// Flushes a vector line overlay. An engine status of `-1`/`-2` aborts the
    /// rest of this object's update and leaves its remaining slots dirty.
    pub fn apply_lines(&mut self, id: ObjectId, props: &mut LineProps) -> Result<usize> {
        let mut applied = 0;
        let flat = props.mode.get().flat;

        if props.color.is_dirty() || props.width.is_dirty() || props.mode.is_dirty() {
            if flat {
                props.mode.value_mut().surfaces.clear();
            }
            let status = self.engine.set_vector_line_mode(
                id,
                *props.color.get(),
                *props.width.get(),
                flat,
            );
            check_status(id, status)?;
            props.color.clear();
            props.width.clear();
            applied += 1;
        }

        if props.height.is_dirty() {
            self.engine.set_vector_line_height(id, *props.height.get());
            props.height.clear();
            applied += 1;
        }

        if props.mode.is_dirty() {
            if !flat {
                applied += self.drape(id, &props.mode.get().surfaces, Overlay::Lines);
            }
            props.mode.clear();
        }

        tracing::debug!(id, applied, "vector line properties applied");
        Ok(applied)
    }

    /// Flushes a vector point overlay; errors as for [`Self::apply_lines`].
    pub fn apply_points(&mut self, id: ObjectId, props: &mut PointProps) -> Result<usize> {
        let mut applied = 0;

        if props.size.is_dirty()
            || props.width.is_dirty()
            || props.marker.is_dirty()
            || props.color.is_dirty()
        {
            let status = self.engine.set_vector_point_mode(
                id,
                *props.color.get(),
                *props.width.get(),
                *props.size.get(),
                props.marker.get().engine_code(),
            );
            check_status(id, status)?;
            props.size.clear();
            props.width.clear();
            props.marker.clear();
            props.color.clear();
            applied += 1;
        }

        if props.height.is_dirty() {
            self.engine.set_vector_point_height(id, *props.height.get());
            props.height.clear();
            applied += 1;
        }

        if props.surfaces.is_dirty() {
            applied += self.drape(id, props.surfaces.get(), Overlay::Points);
            props.surfaces.clear();
        }

        tracing::debug!(id, applied, "vector point properties applied");
        Ok(applied)
    }

    /// Flushes a constant surface.
    pub fn apply_constant(&mut self, id: ObjectId, props: &mut ConstantProps) -> usize {
        let mut applied = 0;

        if props.color.is_dirty() {
            let color: Rgb = *props.color.get();
            self.engine
                .set_surface_attr(id, SurfaceAttr::Color, false, &color.to_string());
            props.color.clear();
            applied += 1;
        }

        if props.value.is_dirty() {
            self.engine
                .set_surface_topo(id, false, &props.value.get().to_string());
            props.value.clear();
            applied += 1;
        }

        if props.resolution.is_dirty() {
            let res = *props.resolution.get();
            self.engine.set_surface_res(id, res, res);
            props.resolution.clear();
            applied += 1;
        }

        applied
    }

    /// Attaches or detaches the overlay on each referenced surface that is
    /// still loaded. References to unloaded surfaces are skipped.
    fn drape(&mut self, id: ObjectId, refs: &[SurfaceRef], overlay: Overlay) -> usize {
        let mut applied = 0;
        for surface in refs {
            let Some(sid) = self.surfaces.lookup(&surface.name) else {
                tracing::debug!(id, surface = %surface.name, "reference surface not loaded; skipped");
                continue;
            };
            match (overlay, surface.show) {
                (Overlay::Lines, true) => self.engine.set_vector_line_surface(id, sid),
                (Overlay::Lines, false) => self.engine.unset_vector_line_surface(id, sid),
                (Overlay::Points, true) => self.engine.set_vector_point_surface(id, sid),
                (Overlay::Points, false) => self.engine.unset_vector_point_surface(id, sid),
            }
            applied += 1;
        }
        applied
    }
}

fn check_status(id: ObjectId, status: i32) -> Result<()> {
    match ApplyFailure::from_status(status) {
        Some(reason) => Err(SceneError::PropertyApply { id, reason }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;
    use crate::properties::{IsosurfaceProps, VectorProps};
    use crate::settings::Settings;

    fn surface() -> SurfaceProps {
        SurfaceProps::from_defaults(&Settings::default().surface, "elevation")
    }

    #[test]
    fn test_second_flush_is_noop() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let mut props = surface();

        let first = PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert!(first > 0);
        let calls = engine.take_calls();
        assert!(calls.contains(&"set_surface_attr(3, Color, true, elevation)".to_string()));
        // Mask and transparency start unset and have unset forms.
        assert!(calls.contains(&"unset_surface_attr(3, Mask)".to_string()));

        let second = PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert_eq!(second, 0);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_only_dirty_attributes_are_pushed() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let mut props = surface();
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        engine.take_calls();

        props.transparency.set(MapAttr::constant("40"));
        let applied = PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert_eq!(applied, 1);
        assert_eq!(engine.calls(), ["set_surface_attr(3, Transparency, false, 40)"]);
    }

    #[test]
    fn test_empty_value_and_unset_without_unset_form_make_no_call() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let mut props = surface();
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        engine.take_calls();

        props.color.set(MapAttr::constant(""));
        props.shininess.set(MapAttr::unset());
        let applied = PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert_eq!(applied, 0);
        assert!(engine.calls().is_empty());
        assert!(!props.color.is_dirty());
    }

    #[test]
    fn test_apply_to_all_targets_wildcard_once() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let mut props = surface();
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        engine.take_calls();

        props.draw.apply_to_all = true;
        props.draw.wire_color.set(Rgb(1, 2, 3));
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert_eq!(engine.take_calls(), ["set_wire_color(-1, 1:2:3)"]);
        assert!(!props.draw.apply_to_all);

        props.draw.wire_color.set(Rgb(4, 5, 6));
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert_eq!(engine.take_calls(), ["set_wire_color(3, 4:5:6)"]);
    }

    #[test]
    fn test_draw_mode_code_cached_on_first_flush() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let mut props = surface();
        assert_eq!(props.draw.mode.get().cached_code(), None);

        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        let code = props.draw.mode.get().cached_code().unwrap();
        assert!(engine.calls().contains(&format!("set_surface_style(3, {code})")));
    }

    #[test]
    fn test_point_status_codes_become_errors() {
        let index = SurfaceIndex::default();
        let settings = Settings::default();

        for (status, reason) in [(-1, ApplyFailure::NotFound), (-2, ApplyFailure::InvalidParameters)] {
            let mut engine = RecordingEngine::new().with_point_status(status);
            let mut props = VectorProps::from_defaults(&settings.vector, &[], None);
            let err = PropertyStore::new(&mut engine, &index)
                .apply_points(9, &mut props.points)
                .unwrap_err();
            assert!(matches!(err, SceneError::PropertyApply { id: 9, reason: r } if r == reason));
            // The failed object's remaining update was not attempted.
            assert_eq!(engine.count("set_vector_point_height"), 0);
            assert!(props.points.height.is_dirty());
        }
    }

    #[test]
    fn test_line_status_codes_become_errors() {
        let index = SurfaceIndex::default();
        let settings = Settings::default();

        for (status, reason) in [(-1, ApplyFailure::NotFound), (-2, ApplyFailure::InvalidParameters)] {
            let mut engine = RecordingEngine::new().with_line_status(status);
            let mut props = VectorProps::from_defaults(&settings.vector, &[], None);
            let err = PropertyStore::new(&mut engine, &index)
                .apply_lines(7, &mut props.lines)
                .unwrap_err();
            assert!(matches!(err, SceneError::PropertyApply { id: 7, reason: r } if r == reason));
            assert_eq!(engine.count("set_vector_line_height"), 0);
            assert!(props.lines.color.is_dirty());
            assert!(props.lines.height.is_dirty());
        }
    }

    #[test]
    fn test_mask_is_always_sent_as_map() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let mut props = surface();
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        engine.take_calls();

        props.mask.set(MapAttr::constant("lakes"));
        PropertyStore::new(&mut engine, &index).apply_surface(3, &mut props);
        assert_eq!(engine.calls(), ["set_surface_attr(3, Mask, true, lakes)"]);
    }

    #[test]
    fn test_drape_resolves_names_and_skips_missing() {
        let mut engine = RecordingEngine::new();
        let mut index = SurfaceIndex::default();
        index.insert_raster("elevation", 1);
        index.insert_constant("constant#1", 5);

        let settings = Settings::default();
        let names = vec!["elevation".to_string(), "gone".to_string(), "constant#1".to_string()];
        let mut props = VectorProps::from_defaults(&settings.vector, &names, None);
        props.lines.mode.value_mut().surfaces[2].show = false;

        PropertyStore::new(&mut engine, &index)
            .apply_lines(7, &mut props.lines)
            .unwrap();
        let calls = engine.calls();
        assert!(calls.contains(&"set_vector_line_surface(7, 1)".to_string()));
        assert!(calls.contains(&"unset_vector_line_surface(7, 5)".to_string()));
        assert_eq!(engine.count("set_vector_line_surface"), 1);
    }

    #[test]
    fn test_flat_lines_drop_surfaces() {
        let mut engine = RecordingEngine::new();
        let mut index = SurfaceIndex::default();
        index.insert_raster("elevation", 1);
        let settings = Settings::default();
        let mut props = VectorProps::from_defaults(&settings.vector, &["elevation".into()], None);
        props.lines.mode.update(|m| m.flat = true);

        PropertyStore::new(&mut engine, &index)
            .apply_lines(7, &mut props.lines)
            .unwrap();
        assert!(props.lines.mode.get().surfaces.is_empty());
        assert_eq!(engine.count("set_vector_line_surface"), 0);
        assert!(engine.calls().iter().any(|c| c.ends_with(", true)") && c.starts_with("set_vector_line_mode")));
    }

    #[test]
    fn test_volume_isosurface_unset_forms() {
        let mut engine = RecordingEngine::new();
        let index = SurfaceIndex::default();
        let settings = Settings::default();
        let mut props = VolumeProps::from_defaults(&settings.volume);
        props
            .isosurfaces
            .push(IsosurfaceProps::new("geology", MapAttr::constant("60")));

        PropertyStore::new(&mut engine, &index).apply_volume(4, &mut props);
        let calls = engine.calls();
        assert!(calls.contains(&"set_isosurface_res(4, 3)".to_string()));
        assert!(calls.contains(&"set_isosurface_attr(4, 0, Color, true, geology)".to_string()));
        assert!(calls.contains(&"unset_isosurface_attr(4, 0, Emission)".to_string()));
        assert!(props.shading.get().cached_code().is_some());
    }
}
