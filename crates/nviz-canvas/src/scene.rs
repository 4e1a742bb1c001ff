//! The canvas: one engine plus every piece of state that mirrors it.
//!
//! Hosts drive a [`Scene`] with [`SceneCommand`]s. Each command mutates the
//! relevant state, pushes what changed to the engine and redraws if needed.
//! A scene is single-threaded; hosts that share it across threads wrap it
//! with [`Scene::into_shared`] so every engine call runs under one lock.

use crate::command::{build_command, FringeState};
use crate::cplane::{CPlaneField, CuttingPlaneManager};
use crate::engine::{
    DisplayEngine, DRAW_QUICK_SURFACE, DRAW_QUICK_VLINES, DRAW_QUICK_VOLUME, DRAW_QUICK_VPOINTS,
};
use crate::error::{Result, SceneError};
use crate::query::{query_surface, QueryLog, QueryReport};
use crate::registry::{LayerRegistry, ReconcileReport};
use crate::settings::Settings;
use crate::tree::{LayerHandle, LayerTree, MapMetadata};
use crate::view::ViewController;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

pub type SharedScene<E> = Arc<Mutex<Scene<E>>>;

/// State changes a host can report.
#[derive(Debug, Clone)]
pub enum SceneCommand {
    /// Camera edited; `z_exag` also pushes the exaggeration.
    ViewChanged { z_exag: bool },
    LightChanged,
    CPlaneSelected(usize),
    CPlaneChanged { index: usize, fields: Vec<CPlaneField> },
    /// New snapshot of the layer tree.
    LayersChanged(LayerTree),
    PropertiesChanged(LayerHandle),
    ConstantChanged(usize),
    /// One mouse-wheel notch; positive is away from the user.
    PerspectiveWheel(i32),
    LookHere { x: i32, y: i32 },
    Resize { width: u32, height: u32 },
}

/// Result of dispatching one command.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Whether the scene was redrawn.
    pub redraw: bool,
    pub errors: Vec<SceneError>,
}

impl Dispatch {
    fn redraw() -> Self {
        Self { redraw: true, errors: Vec::new() }
    }

    fn from_result(result: Result<bool>) -> Self {
        match result {
            Ok(redraw) => Self { redraw, errors: Vec::new() },
            Err(e) => Self { redraw: false, errors: vec![e] },
        }
    }
}

/// How the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderMode {
    /// Wireframe preview while interacting.
    pub quick: bool,
    /// Include vector lines in quick frames.
    pub vlines: bool,
    /// Include vector points in quick frames.
    pub vpoints: bool,
}

pub struct Scene<E: DisplayEngine> {
    engine: E,
    settings: Settings,
    registry: LayerRegistry,
    controller: ViewController,
    cplanes: CuttingPlaneManager,
    queries: QueryLog,
    fringe: FringeState,
    pub render: RenderMode,
    size: (u32, u32),
    metadata: Box<dyn MapMetadata + Send>,
}

impl<E: DisplayEngine> Scene<E> {
    /// Sets up the viewport, default view and light on a freshly started engine.
    pub fn new(
        mut engine: E,
        settings: Settings,
        metadata: impl MapMetadata + Send + 'static,
        size: (u32, u32),
    ) -> Self {
        engine.resize_window(size.0, size.1);
        engine.init_view();

        let cplanes = CuttingPlaneManager::new(engine.cplane_count(), &settings.cplane);
        let mut controller = ViewController::new(&settings);
        controller.reset_view(&mut engine, &settings);
        controller.update_light(&mut engine);

        tracing::info!(
            width = size.0,
            height = size.1,
            cplanes = cplanes.len(),
            "scene initialized"
        );

        Self {
            engine,
            settings,
            registry: LayerRegistry::new(),
            controller,
            cplanes,
            queries: QueryLog::new(),
            fringe: FringeState::default(),
            render: RenderMode::default(),
            size,
            metadata: Box::new(metadata),
        }
    }

    pub fn into_shared(self) -> SharedScene<E> {
        Arc::new(Mutex::new(self))
    }

    // --- Command dispatch ---

    pub fn dispatch(&mut self, command: SceneCommand) -> Dispatch {
        tracing::debug!(command = ?command, "dispatching scene command");

        let outcome = match command {
            SceneCommand::ViewChanged { z_exag } => {
                self.controller.update_view(&mut self.engine, z_exag);
                Dispatch::redraw()
            }
            SceneCommand::LightChanged => {
                self.controller.update_light(&mut self.engine);
                Dispatch::redraw()
            }
            SceneCommand::CPlaneSelected(index) => Dispatch::from_result(
                self.cplanes.select(&mut self.engine, index).map(|()| true),
            ),
            SceneCommand::CPlaneChanged { index, fields } => Dispatch::from_result(
                self.cplanes
                    .update(&mut self.engine, index, &fields)
                    .map(|()| true),
            ),
            SceneCommand::LayersChanged(tree) => {
                let report = self.sync(&tree);
                Dispatch { redraw: report.changed(), errors: report.errors }
            }
            SceneCommand::PropertiesChanged(handle) => {
                let applied = self.registry.apply_properties(&mut self.engine, handle);
                Dispatch { redraw: applied.calls > 0, errors: applied.errors }
            }
            SceneCommand::ConstantChanged(index) => Dispatch::from_result(
                self.registry
                    .apply_constant(&mut self.engine, index)
                    .map(|applied| applied > 0),
            ),
            SceneCommand::PerspectiveWheel(wheel) => Dispatch {
                redraw: self.controller.adjust_perspective(&mut self.engine, wheel),
                errors: Vec::new(),
            },
            SceneCommand::LookHere { x, y } => {
                // Window y grows downwards, the engine's grows upwards.
                let gl_y = i32::try_from(self.size.1).unwrap_or(i32::MAX) - y;
                self.controller.look_here(&mut self.engine, x, gl_y);
                self.controller.update_view(&mut self.engine, false);
                Dispatch::redraw()
            }
            SceneCommand::Resize { width, height } => {
                self.size = (width, height);
                self.engine.resize_window(width, height);
                Dispatch::redraw()
            }
        };

        for e in &outcome.errors {
            tracing::error!(error = %e, "scene command failed");
        }
        if outcome.redraw {
            self.redraw();
        }
        outcome
    }

    /// Reconciles loaded layers with a tree snapshot. New data resets the view
    /// so its defaults and focus follow the loaded extent.
    pub fn sync(&mut self, tree: &LayerTree) -> ReconcileReport {
        let report = self
            .registry
            .reconcile(&mut self.engine, tree, self.metadata.as_ref(), &self.settings);
        if !report.loaded.is_empty() {
            self.controller.reset_view(&mut self.engine, &self.settings);
        }
        report
    }

    /// Draws one frame in the current render mode.
    pub fn redraw(&mut self) {
        if self.render.quick {
            let mut mask = DRAW_QUICK_SURFACE | DRAW_QUICK_VOLUME;
            if self.render.vlines {
                mask |= DRAW_QUICK_VLINES;
            }
            if self.render.vpoints {
                mask |= DRAW_QUICK_VPOINTS;
            }
            self.engine.draw(true, mask);
        } else {
            self.engine.draw(false, u32::MAX);
            self.engine.draw_fringe();
        }
    }

    /// Unloads every tree layer, forgets query points and restores the default view.
    pub fn reset(&mut self) -> Vec<SceneError> {
        let errors = self.registry.reset(&mut self.engine);
        self.queries.clear();
        self.engine.erase_map();
        self.controller.reset_view(&mut self.engine, &self.settings);
        tracing::info!(errors = errors.len(), "scene reset");
        errors
    }

    // --- Constants ---

    pub fn new_constant(&mut self) -> Result<usize> {
        let index = self.registry.new_constant(&mut self.engine, &self.settings)?;
        self.redraw();
        Ok(index)
    }

    pub fn delete_constant(&mut self, index: usize) -> Result<()> {
        let result = self.registry.delete_constant(&mut self.engine, index);
        self.redraw();
        result
    }

    // --- Queries and output ---

    pub fn query(&mut self, x: i32, y: i32) -> Option<QueryReport> {
        query_surface(&mut self.engine, &mut self.queries, x, y)
    }

    /// Batch command reproducing the current scene.
    pub fn command_string(&self) -> Result<String> {
        build_command(&self.registry, &self.controller, &self.fringe, self.size)
    }

    pub fn save_to_file(&mut self, path: &Path) -> Result<()> {
        let (width, height) = self.size;
        if !self.engine.save_to_file(path, width, height) {
            return Err(SceneError::Save(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), width, height, "image saved");
        Ok(())
    }

    // --- Accessors ---

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut LayerRegistry {
        &mut self.registry
    }

    pub fn view(&self) -> &ViewController {
        &self.controller
    }

    pub fn view_mut(&mut self) -> &mut ViewController {
        &mut self.controller
    }

    pub fn cplanes_mut(&mut self) -> &mut CuttingPlaneManager {
        &mut self.cplanes
    }

    pub fn fringe_mut(&mut self) -> &mut FringeState {
        &mut self.fringe
    }

    pub fn queries(&self) -> &QueryLog {
        &self.queries
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;
    use crate::properties::MapAttr;
    use crate::tree::{NodeKind, TreeNode, VectorInfo};
    use std::collections::HashMap;

    fn scene() -> Scene<RecordingEngine> {
        let meta: HashMap<String, VectorInfo> = HashMap::new();
        Scene::new(RecordingEngine::new(), Settings::default(), meta, (640, 480))
    }

    fn tree() -> LayerTree {
        LayerTree::new(vec![TreeNode::layer(1, "elevation", NodeKind::Raster)])
    }

    #[test]
    fn test_new_initializes_view_and_light() {
        let scene = scene();
        let calls = scene.engine().calls();
        assert_eq!(calls[0], "resize_window(640, 480)");
        assert_eq!(calls[1], "init_view()");
        assert!(calls.contains(&"set_view_default()".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("draw_lighting_model()"));
        assert_eq!(scene.cplanes.len(), 4);
    }

    #[test]
    fn test_unchanged_tree_does_not_redraw() {
        let mut scene = scene();
        assert!(scene.dispatch(SceneCommand::LayersChanged(tree())).redraw);
        scene.engine_mut().take_calls();

        let outcome = scene.dispatch(SceneCommand::LayersChanged(tree()));
        assert!(!outcome.redraw);
        assert!(scene.engine().calls().is_empty());
    }

    #[test]
    fn test_properties_changed_pushes_dirty_only() {
        let mut scene = scene();
        scene.dispatch(SceneCommand::LayersChanged(tree()));
        scene
            .registry_mut()
            .properties_mut(LayerHandle(1))
            .and_then(|r| r.as_surface_mut())
            .unwrap()
            .transparency
            .set(MapAttr::constant("50"));
        scene.engine_mut().take_calls();

        let outcome = scene.dispatch(SceneCommand::PropertiesChanged(LayerHandle(1)));
        assert!(outcome.redraw);
        assert_eq!(
            scene.engine().calls(),
            [
                "set_surface_attr(1, Transparency, false, 50)",
                "draw(false, 0xffffffff)",
                "draw_fringe()",
            ]
        );

        let outcome = scene.dispatch(SceneCommand::PropertiesChanged(LayerHandle(1)));
        assert!(!outcome.redraw);
    }

    #[test]
    fn test_loading_layers_resets_view() {
        let mut scene = scene();
        scene.view_mut().view.twist = 45.0;
        scene.engine_mut().take_calls();

        scene.dispatch(SceneCommand::LayersChanged(tree()));
        let calls = scene.engine().calls();
        let load = calls.iter().position(|c| c.starts_with("load_surface")).unwrap();
        let reset = calls.iter().position(|c| c == "set_view_default()").unwrap();
        assert!(load < reset);
        assert_eq!(scene.view().view.twist, 0.0);

        // Nothing new loaded, so the view is left alone.
        scene.engine_mut().take_calls();
        scene.view_mut().view.twist = 45.0;
        scene.dispatch(SceneCommand::LayersChanged(tree()));
        assert_eq!(scene.engine().count("set_view_default"), 0);
        assert_eq!(scene.view().view.twist, 45.0);
    }

    #[test]
    fn test_look_here_flips_window_y() {
        let mut scene = scene();
        scene.engine_mut().take_calls();

        scene.dispatch(SceneCommand::LookHere { x: 100, y: 30 });
        assert_eq!(scene.engine().calls()[0], "look_here(100, 450)");
    }

    #[test]
    fn test_quick_render_mask() {
        let mut scene = scene();
        scene.render = RenderMode { quick: true, vlines: true, vpoints: false };
        scene.engine_mut().take_calls();

        scene.redraw();
        assert_eq!(scene.engine().calls(), ["draw(true, 0xb)"]);
    }

    #[test]
    fn test_wheel_at_limit_skips_redraw() {
        let mut scene = scene();
        scene.view_mut().view.perspective = 100.0;
        scene.engine_mut().take_calls();

        let outcome = scene.dispatch(SceneCommand::PerspectiveWheel(-1));
        assert!(!outcome.redraw);
        assert!(scene.engine().calls().is_empty());
    }

    #[test]
    fn test_bad_cplane_index_is_reported() {
        let mut scene = scene();
        let outcome = scene.dispatch(SceneCommand::CPlaneSelected(9));
        assert!(!outcome.redraw);
        assert!(matches!(outcome.errors.as_slice(), [SceneError::Precondition(_)]));
    }

    #[test]
    fn test_reset_unloads_layers_and_clears_queries() {
        let mut scene = scene();
        scene.dispatch(SceneCommand::LayersChanged(tree()));

        assert!(scene.reset().is_empty());
        assert!(scene.registry().entries().is_empty());
        assert!(scene.queries().points().is_empty());
        assert!(!scene.engine().is_live(1));
    }

    #[test]
    fn test_command_string_needs_a_surface() {
        let mut scene = scene();
        assert!(matches!(scene.command_string(), Err(SceneError::InsufficientData)));

        scene.new_constant().unwrap();
        let cmd = scene.command_string().unwrap();
        assert!(cmd.ends_with("size=640,480 "));
    }

    #[test]
    fn test_shared_scene_across_threads() {
        let shared = scene().into_shared();
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                shared.lock().dispatch(SceneCommand::Resize { width: 800, height: 600 })
            })
        };
        let outcome = worker.join().unwrap();
        assert!(outcome.redraw);
        assert_eq!(shared.lock().size(), (800, 600));
    }
}
