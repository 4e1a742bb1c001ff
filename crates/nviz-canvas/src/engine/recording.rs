//! A dry-run display engine.
//!
//! [`RecordingEngine`] hands out sequential object ids, keeps track of which
//! ids are live, and journals every call it receives. It renders nothing. The
//! CLI uses it to derive batch commands without a GPU, and tests use the
//! journal to check exactly which calls the canvas issued.

use super::{
    DisplayEngine, FenceColor, LightParams, ObjectId, QueryHit, SurfaceAttr, ViewDefaults,
};
use crate::color::Rgb;
use std::collections::{HashSet, VecDeque};
use std::path::Path;

#[derive(Debug)]
pub struct RecordingEngine {
    next_id: ObjectId,
    live: HashSet<ObjectId>,
    calls: Vec<String>,

    failing_loads: HashSet<String>,
    failing_unloads: HashSet<ObjectId>,
    line_status: i32,
    point_status: i32,

    cplanes: usize,
    defaults: ViewDefaults,
    center: [f64; 3],
    focus: [f64; 3],
    z_exag: f64,
    hits: VecDeque<QueryHit>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: HashSet::new(),
            calls: Vec::new(),
            failing_loads: HashSet::new(),
            failing_unloads: HashSet::new(),
            line_status: 1,
            point_status: 1,
            cplanes: 4,
            defaults: ViewDefaults {
                z_exag: 1.0,
                height: 1000.0,
                height_min: 0.0,
                height_max: 5000.0,
            },
            center: [0.0, 0.0, 0.0],
            focus: [0.0, 0.0, 0.0],
            z_exag: 1.0,
            hits: VecDeque::new(),
        }
    }

    // --- Configuration ---

    /// Makes every load of `name` fail with a negative id.
    pub fn with_failing_load(mut self, name: &str) -> Self {
        self.failing_loads.insert(name.to_owned());
        self
    }

    /// Makes unloading `id` report failure (the object stays live).
    pub fn with_failing_unload(mut self, id: ObjectId) -> Self {
        self.failing_unloads.insert(id);
        self
    }

    /// Status code returned by `set_vector_line_mode`.
    pub fn with_line_status(mut self, status: i32) -> Self {
        self.line_status = status;
        self
    }

    /// Status code returned by `set_vector_point_mode`.
    pub fn with_point_status(mut self, status: i32) -> Self {
        self.point_status = status;
        self
    }

    pub fn with_cplanes(mut self, count: usize) -> Self {
        self.cplanes = count;
        self
    }

    pub fn with_view_defaults(mut self, defaults: ViewDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Focus point the engine reports after `look_at_center`.
    pub fn with_center(mut self, center: [f64; 3]) -> Self {
        self.center = center;
        self
    }

    /// Queues a hit returned by the next `query_map`.
    pub fn with_query_hit(mut self, hit: QueryHit) -> Self {
        self.hits.push_back(hit);
        self
    }

    // --- Inspection ---

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Drains the journal.
    pub fn take_calls(&mut self) -> Vec<String> {
        std::mem::take(&mut self.calls)
    }

    /// Number of journaled calls to the named operation.
    pub fn count(&self, op: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| c.split('(').next() == Some(op))
            .count()
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.live.contains(&id)
    }

    fn record(&mut self, call: String) {
        tracing::debug!(call = %call, "engine call");
        self.calls.push(call);
    }

    fn load(&mut self, op: &str, name: &str) -> ObjectId {
        let id = if self.failing_loads.contains(name) {
            -1
        } else {
            let id = self.next_id;
            self.next_id += 1;
            self.live.insert(id);
            id
        };
        self.record(format!("{op}({name}) -> {id}"));
        id
    }

    fn unload(&mut self, op: String, id: ObjectId) -> bool {
        let ok = !self.failing_unloads.contains(&id) && self.live.remove(&id);
        self.record(format!("{op} -> {ok}"));
        ok
    }
}

impl DisplayEngine for RecordingEngine {
    fn load_surface(&mut self, name: &str) -> ObjectId {
        self.load("load_surface", name)
    }

    fn load_volume(&mut self, name: &str) -> ObjectId {
        self.load("load_volume", name)
    }

    fn load_vector(&mut self, name: &str, points: bool) -> ObjectId {
        let op = if points { "load_vector_points" } else { "load_vector_lines" };
        self.load(op, name)
    }

    fn add_constant(&mut self, value: f64, color: Rgb) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        self.record(format!("add_constant({value}, {color}) -> {id}"));
        id
    }

    fn unload_surface(&mut self, id: ObjectId) -> bool {
        self.unload(format!("unload_surface({id})"), id)
    }

    fn unload_volume(&mut self, id: ObjectId) -> bool {
        self.unload(format!("unload_volume({id})"), id)
    }

    fn unload_vector(&mut self, id: ObjectId, points: bool) -> bool {
        self.unload(format!("unload_vector({id}, {points})"), id)
    }

    fn set_surface_attr(&mut self, id: ObjectId, attr: SurfaceAttr, map: bool, value: &str) {
        self.record(format!("set_surface_attr({id}, {attr:?}, {map}, {value})"));
    }

    fn unset_surface_attr(&mut self, id: ObjectId, attr: SurfaceAttr) {
        self.record(format!("unset_surface_attr({id}, {attr:?})"));
    }

    fn set_surface_topo(&mut self, id: ObjectId, map: bool, value: &str) {
        self.record(format!("set_surface_topo({id}, {map}, {value})"));
    }

    fn set_surface_res(&mut self, id: ObjectId, fine: u32, coarse: u32) {
        self.record(format!("set_surface_res({id}, {fine}, {coarse})"));
    }

    fn set_surface_style(&mut self, id: ObjectId, style: i32) {
        self.record(format!("set_surface_style({id}, {style})"));
    }

    fn set_wire_color(&mut self, id: ObjectId, color: Rgb) {
        self.record(format!("set_wire_color({id}, {color})"));
    }

    fn set_surface_position(&mut self, id: ObjectId, x: f64, y: f64, z: f64) {
        self.record(format!("set_surface_position({id}, {x}, {y}, {z})"));
    }

    fn set_isosurface_res(&mut self, id: ObjectId, res: u32) {
        self.record(format!("set_isosurface_res({id}, {res})"));
    }

    fn set_isosurface_attr(
        &mut self,
        id: ObjectId,
        isosurf: usize,
        attr: SurfaceAttr,
        map: bool,
        value: &str,
    ) {
        self.record(format!(
            "set_isosurface_attr({id}, {isosurf}, {attr:?}, {map}, {value})"
        ));
    }

    fn unset_isosurface_attr(&mut self, id: ObjectId, isosurf: usize, attr: SurfaceAttr) {
        self.record(format!("unset_isosurface_attr({id}, {isosurf}, {attr:?})"));
    }

    fn set_vector_line_mode(&mut self, id: ObjectId, color: Rgb, width: u32, flat: bool) -> i32 {
        self.record(format!("set_vector_line_mode({id}, {color}, {width}, {flat})"));
        self.line_status
    }

    fn set_vector_line_height(&mut self, id: ObjectId, height: f64) {
        self.record(format!("set_vector_line_height({id}, {height})"));
    }

    fn set_vector_line_surface(&mut self, id: ObjectId, surface: ObjectId) {
        self.record(format!("set_vector_line_surface({id}, {surface})"));
    }

    fn unset_vector_line_surface(&mut self, id: ObjectId, surface: ObjectId) {
        self.record(format!("unset_vector_line_surface({id}, {surface})"));
    }

    fn set_vector_point_mode(
        &mut self,
        id: ObjectId,
        color: Rgb,
        width: u32,
        size: f64,
        marker: i32,
    ) -> i32 {
        self.record(format!(
            "set_vector_point_mode({id}, {color}, {width}, {size}, {marker})"
        ));
        self.point_status
    }

    fn set_vector_point_height(&mut self, id: ObjectId, height: f64) {
        self.record(format!("set_vector_point_height({id}, {height})"));
    }

    fn set_vector_point_surface(&mut self, id: ObjectId, surface: ObjectId) {
        self.record(format!("set_vector_point_surface({id}, {surface})"));
    }

    fn unset_vector_point_surface(&mut self, id: ObjectId, surface: ObjectId) {
        self.record(format!("unset_vector_point_surface({id}, {surface})"));
    }

    fn init_view(&mut self) {
        self.record("init_view()".into());
    }

    fn resize_window(&mut self, width: u32, height: u32) {
        self.record(format!("resize_window({width}, {height})"));
    }

    fn set_view(&mut self, x: f64, y: f64, height: f64, perspective: f64, twist: f64) {
        self.record(format!("set_view({x}, {y}, {height}, {perspective}, {twist})"));
    }

    fn set_z_exag(&mut self, z_exag: f64) {
        self.z_exag = z_exag;
        self.record(format!("set_z_exag({z_exag})"));
    }

    fn set_focus(&mut self, x: f64, y: f64, z: f64) {
        self.focus = [x, y, z];
        self.record(format!("set_focus({x}, {y}, {z})"));
    }

    fn focus(&self) -> [f64; 3] {
        self.focus
    }

    fn set_view_default(&mut self) -> ViewDefaults {
        self.z_exag = self.defaults.z_exag;
        self.record("set_view_default()".into());
        self.defaults
    }

    fn look_at_center(&mut self) {
        self.focus = self.center;
        self.record("look_at_center()".into());
    }

    fn look_here(&mut self, x: i32, y: i32) {
        self.focus = [f64::from(x), f64::from(y), self.focus[2]];
        self.record(format!("look_here({x}, {y})"));
    }

    fn set_light(&mut self, light: &LightParams) {
        let [x, y, z] = light.position;
        self.record(format!(
            "set_light({x}, {y}, {z}, {}, {}, {})",
            light.color, light.brightness, light.ambient
        ));
    }

    fn draw_lighting_model(&mut self) {
        self.record("draw_lighting_model()".into());
    }

    fn cplane_count(&self) -> usize {
        self.cplanes
    }

    fn select_cplane(&mut self, index: usize) {
        self.record(format!("select_cplane({index})"));
    }

    fn unselect_cplane(&mut self, index: usize) {
        self.record(format!("unselect_cplane({index})"));
    }

    fn set_cplane_rotation(&mut self, index: usize, tilt: f64, rotation: f64) {
        self.record(format!("set_cplane_rotation({index}, {tilt}, {rotation})"));
    }

    fn set_cplane_translation(&mut self, index: usize, x: f64, y: f64, z: f64) {
        self.record(format!("set_cplane_translation({index}, {x}, {y}, {z})"));
    }

    fn set_fence_color(&mut self, color: FenceColor) {
        self.record(format!("set_fence_color({})", color.code()));
    }

    fn draw(&mut self, quick: bool, mask: u32) {
        self.record(format!("draw({quick}, {mask:#x})"));
    }

    fn draw_fringe(&mut self) {
        self.record("draw_fringe()".into());
    }

    fn erase_map(&mut self) {
        self.record("erase_map()".into());
    }

    fn query_map(&mut self, x: i32, y: i32) -> Option<QueryHit> {
        self.record(format!("query_map({x}, {y})"));
        self.hits.pop_front()
    }

    fn distance_along_surface(
        &mut self,
        id: ObjectId,
        from: [f64; 2],
        to: [f64; 2],
        use_exag: bool,
    ) -> f64 {
        self.record(format!("distance_along_surface({id}, {use_exag})"));
        let flat = glam::DVec2::from(from).distance(glam::DVec2::from(to));
        if use_exag {
            flat * self.z_exag
        } else {
            flat
        }
    }

    fn save_to_file(&mut self, path: &Path, width: u32, height: u32) -> bool {
        self.record(format!("save_to_file({}, {width}, {height})", path.display()));
        true
    }
}
