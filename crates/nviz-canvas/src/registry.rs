//! Mirror of the layers and constant surfaces loaded into the display engine.
//!
//! The registry maps layer-tree handles to engine object ids. [`LayerRegistry::reconcile`]
//! diffs the checked layers of a tree snapshot against what is loaded, unloads
//! what disappeared, loads what appeared and pushes the new objects' properties.
//! A failed load still leaves an entry without an id behind, so the same layer is
//! not retried on every sync; it is retried once it leaves the tree and returns.

use crate::color::Rgb;
use crate::engine::{DisplayEngine, ObjectId, ObjectKind};
use crate::error::{Result, SceneError};
use crate::properties::{ConstantProps, PropertiesRecord, SurfaceProps, VectorProps, VolumeProps};
use crate::settings::Settings;
use crate::store::{PropertyStore, SurfaceIndex};
use crate::tree::{LayerHandle, LayerKind, LayerTree, MapMetadata, TreeNode};
use std::collections::HashMap;

/// Engine ids of one layer. `None` marks a load that failed or was not needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineIds {
    Surface(Option<ObjectId>),
    Volume(Option<ObjectId>),
    Vector {
        lines: Option<ObjectId>,
        points: Option<ObjectId>,
    },
}

impl EngineIds {
    pub fn is_loaded(&self) -> bool {
        match *self {
            Self::Surface(id) | Self::Volume(id) => id.is_some(),
            Self::Vector { lines, points } => lines.is_some() || points.is_some(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerEntry {
    pub handle: LayerHandle,
    pub name: String,
    pub ids: EngineIds,
}

impl LayerEntry {
    pub fn kind(&self) -> LayerKind {
        match self.ids {
            EngineIds::Surface(_) => LayerKind::Raster,
            EngineIds::Volume(_) => LayerKind::Volume,
            EngineIds::Vector { .. } => LayerKind::Vector,
        }
    }

    /// Surface id, if this is a loaded raster.
    pub fn surface_id(&self) -> Option<ObjectId> {
        match self.ids {
            EngineIds::Surface(id) => id,
            _ => None,
        }
    }
}

/// A constant-elevation plane. Numbers start at 1 and follow the last constant,
/// so deleting the last one frees its number for the next.
#[derive(Debug, Clone)]
pub struct ConstantSurface {
    pub name: u32,
    pub id: ObjectId,
    pub props: ConstantProps,
}

impl ConstantSurface {
    pub fn display_name(&self) -> String {
        format!("constant#{}", self.name)
    }
}

/// Outcome of one reconcile pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub loaded: Vec<LayerHandle>,
    pub unloaded: Vec<LayerHandle>,
    pub errors: Vec<SceneError>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        !self.loaded.is_empty() || !self.unloaded.is_empty()
    }
}

/// Engine calls made while flushing one layer, and the objects that refused them.
#[derive(Debug, Default)]
pub struct AppliedProperties {
    pub calls: usize,
    pub errors: Vec<SceneError>,
}

impl AppliedProperties {
    fn record(&mut self, result: Result<usize>) {
        match result {
            Ok(calls) => self.calls += calls,
            Err(e) => self.errors.push(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct LayerRegistry {
    entries: Vec<LayerEntry>,
    /// Kept across unload so edits survive unchecking a layer.
    properties: HashMap<LayerHandle, PropertiesRecord>,
    constants: Vec<ConstantSurface>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Tree layers ---

    /// Brings the engine in line with the checked layers of `tree`.
    pub fn reconcile<E: DisplayEngine>(
        &mut self,
        engine: &mut E,
        tree: &LayerTree,
        meta: &dyn MapMetadata,
        settings: &Settings,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let wanted = tree.checked_layers();

        // Unload first so stale objects never overlap their replacements.
        let (keep, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| wanted.iter().any(|n| n.handle == e.handle && n.name == e.name));
        self.entries = keep;
        for entry in stale {
            report.errors.extend(unload_entry(engine, &entry));
            report.unloaded.push(entry.handle);
        }

        self.properties.retain(|handle, _| tree.contains(*handle));

        // Rasters first so vectors can drape over them, then volumes, then vectors.
        for kind in [LayerKind::Raster, LayerKind::Volume, LayerKind::Vector] {
            for node in wanted.iter().filter(|n| n.kind.layer_kind() == Some(kind)) {
                if self.entry(node.handle).is_some() {
                    continue;
                }
                if node.name.contains(' ') {
                    tracing::warn!(name = %node.name, "map names containing spaces cannot be loaded");
                    continue;
                }
                self.load_layer(engine, node, kind, meta, settings, &mut report);
            }
        }

        for handle in report.loaded.clone() {
            let applied = self.apply_properties(engine, handle);
            for e in &applied.errors {
                tracing::error!(error = %e, "applying layer properties failed");
            }
            report.errors.extend(applied.errors);
        }

        if report.changed() {
            tracing::info!(
                loaded = report.loaded.len(),
                unloaded = report.unloaded.len(),
                errors = report.errors.len(),
                "layers reconciled"
            );
        }
        report
    }

    fn load_layer<E: DisplayEngine>(
        &mut self,
        engine: &mut E,
        node: &TreeNode,
        kind: LayerKind,
        meta: &dyn MapMetadata,
        settings: &Settings,
        report: &mut ReconcileReport,
    ) {
        let name = node.name.as_str();
        let mut load = |object: ObjectKind| -> Option<ObjectId> {
            let id = match object {
                ObjectKind::Surface => engine.load_surface(name),
                ObjectKind::Volume => engine.load_volume(name),
                ObjectKind::VectorPoints => engine.load_vector(name, true),
                _ => engine.load_vector(name, false),
            };
            if id < 0 {
                tracing::error!(name, kind = %object, "loading map failed");
                report.errors.push(SceneError::Load { name: name.to_owned(), kind: object });
                None
            } else {
                tracing::info!(name, kind = %object, id, "map loaded");
                Some(id)
            }
        };

        let ids = match kind {
            LayerKind::Raster => EngineIds::Surface(load(ObjectKind::Surface)),
            LayerKind::Volume => EngineIds::Volume(load(ObjectKind::Volume)),
            LayerKind::Vector => {
                let info = meta.vector_info(name);
                let points = (info.points > 0).then(|| load(ObjectKind::VectorPoints)).flatten();
                let lines = (info.lines > 0).then(|| load(ObjectKind::VectorLines)).flatten();
                EngineIds::Vector { lines, points }
            }
        };

        if ids.is_loaded() {
            match self.properties.get_mut(&node.handle) {
                // A returning layer keeps its edits and gets all of them pushed again.
                Some(record) => record.mark_all_dirty(),
                None => {
                    let record = self.default_record(node, kind, settings);
                    self.properties.insert(node.handle, record);
                }
            }
            report.loaded.push(node.handle);
        }

        self.entries.push(LayerEntry {
            handle: node.handle,
            name: node.name.clone(),
            ids,
        });
    }

    fn default_record(&self, node: &TreeNode, kind: LayerKind, settings: &Settings) -> PropertiesRecord {
        match kind {
            LayerKind::Raster => {
                PropertiesRecord::Surface(SurfaceProps::from_defaults(&settings.surface, &node.name))
            }
            LayerKind::Volume => PropertiesRecord::Volume(VolumeProps::from_defaults(&settings.volume)),
            LayerKind::Vector => {
                let rasters: Vec<String> = self
                    .layer_names(LayerKind::Raster)
                    .into_iter()
                    .map(str::to_owned)
                    .collect();
                let color = node
                    .vector_option("color")
                    .and_then(|c| c.parse::<Rgb>().ok());
                PropertiesRecord::Vector(VectorProps::from_defaults(&settings.vector, &rasters, color))
            }
        }
    }

    /// Pushes the dirty properties of a loaded layer.
    pub fn apply_properties<E: DisplayEngine>(
        &mut self,
        engine: &mut E,
        handle: LayerHandle,
    ) -> AppliedProperties {
        let mut outcome = AppliedProperties::default();
        let Some(ids) = self.entry(handle).map(|e| e.ids) else {
            return outcome;
        };
        let index = self.surface_index();
        let Some(record) = self.properties.get_mut(&handle) else {
            return outcome;
        };
        let mut store = PropertyStore::new(engine, &index);

        match (ids, record) {
            (EngineIds::Surface(Some(id)), PropertiesRecord::Surface(props)) => {
                outcome.calls = store.apply_surface(id, props);
            }
            (EngineIds::Volume(Some(id)), PropertiesRecord::Volume(props)) => {
                outcome.calls = store.apply_volume(id, props);
            }
            (EngineIds::Vector { lines, points }, PropertiesRecord::Vector(props)) => {
                // Lines and points are separate objects; one failing leaves the other alone.
                if let Some(id) = lines {
                    outcome.record(store.apply_lines(id, &mut props.lines));
                }
                if let Some(id) = points {
                    outcome.record(store.apply_points(id, &mut props.points));
                }
            }
            _ => {}
        }
        outcome
    }

    /// Unloads every tree layer. Constants stay loaded.
    pub fn reset<E: DisplayEngine>(&mut self, engine: &mut E) -> Vec<SceneError> {
        let mut errors = Vec::new();
        for entry in std::mem::take(&mut self.entries) {
            errors.extend(unload_entry(engine, &entry));
        }
        errors
    }

    pub fn entry(&self, handle: LayerHandle) -> Option<&LayerEntry> {
        self.entries.iter().find(|e| e.handle == handle)
    }

    pub fn entries(&self) -> &[LayerEntry] {
        &self.entries
    }

    pub fn properties(&self, handle: LayerHandle) -> Option<&PropertiesRecord> {
        self.properties.get(&handle)
    }

    pub fn properties_mut(&mut self, handle: LayerHandle) -> Option<&mut PropertiesRecord> {
        self.properties.get_mut(&handle)
    }

    /// Loaded rasters with their surface properties, in load order.
    pub fn rasters(&self) -> impl Iterator<Item = (&LayerEntry, &SurfaceProps)> {
        self.entries.iter().filter_map(|e| {
            e.surface_id()?;
            let props = self.properties.get(&e.handle)?.as_surface()?;
            Some((e, props))
        })
    }

    /// Names of loaded layers of one kind.
    pub fn layer_names(&self, kind: LayerKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind() == kind && e.ids.is_loaded())
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Engine id of a loaded object by kind and display name.
    pub fn layer_id(&self, kind: ObjectKind, name: &str) -> Option<ObjectId> {
        if kind == ObjectKind::Constant {
            let number: u32 = name.strip_prefix("constant#")?.parse().ok()?;
            return self.constants.iter().find(|c| c.name == number).map(|c| c.id);
        }

        // Rasters and vectors may share a name.
        self.entries
            .iter()
            .filter(|e| e.name == name)
            .find_map(|e| match (kind, e.ids) {
                (ObjectKind::Surface, EngineIds::Surface(id)) => id,
                (ObjectKind::Volume, EngineIds::Volume(id)) => id,
                (ObjectKind::VectorLines, EngineIds::Vector { lines, .. }) => lines,
                (ObjectKind::VectorPoints, EngineIds::Vector { points, .. }) => points,
                _ => None,
            })
    }

    fn surface_index(&self) -> SurfaceIndex {
        let mut index = SurfaceIndex::default();
        for entry in &self.entries {
            if let Some(id) = entry.surface_id() {
                index.insert_raster(&entry.name, id);
            }
        }
        for constant in &self.constants {
            index.insert_constant(&constant.display_name(), constant.id);
        }
        index
    }

    // --- Constant surfaces ---

    /// Adds a constant plane built from the defaults; returns its index.
    pub fn new_constant<E: DisplayEngine>(&mut self, engine: &mut E, settings: &Settings) -> Result<usize> {
        let name = self.constants.last().map_or(1, |c| c.name + 1);
        let mut props = ConstantProps::from_defaults(&settings.constant);

        let id = engine.add_constant(*props.value.get(), *props.color.get());
        if id < 0 {
            return Err(SceneError::Load {
                name: format!("constant#{name}"),
                kind: ObjectKind::Constant,
            });
        }
        let res = *props.resolution.get();
        engine.set_surface_res(id, res, res);
        props.clear_all();

        tracing::info!(name, id, "constant surface added");
        self.constants.push(ConstantSurface { name, id, props });
        Ok(self.constants.len() - 1)
    }

    /// Removes a constant plane. The entry is dropped even when the engine
    /// refuses the unload; the refusal is still reported.
    pub fn delete_constant<E: DisplayEngine>(&mut self, engine: &mut E, index: usize) -> Result<()> {
        if index >= self.constants.len() {
            return Err(SceneError::Precondition(format!("no constant surface at index {index}")));
        }
        let constant = self.constants.remove(index);
        if !engine.unload_surface(constant.id) {
            tracing::error!(name = %constant.display_name(), id = constant.id, "unloading constant failed");
            return Err(SceneError::Unload {
                name: constant.display_name(),
                kind: ObjectKind::Constant,
            });
        }
        tracing::info!(name = %constant.display_name(), "constant surface deleted");
        Ok(())
    }

    pub fn constants(&self) -> &[ConstantSurface] {
        &self.constants
    }

    pub fn constant_mut(&mut self, index: usize) -> Option<&mut ConstantProps> {
        self.constants.get_mut(index).map(|c| &mut c.props)
    }

    pub fn constant_names(&self) -> Vec<String> {
        self.constants.iter().map(ConstantSurface::display_name).collect()
    }

    /// Pushes the dirty properties of one constant.
    pub fn apply_constant<E: DisplayEngine>(&mut self, engine: &mut E, index: usize) -> Result<usize> {
        let index_map = SurfaceIndex::default();
        let constant = self
            .constants
            .get_mut(index)
            .ok_or_else(|| SceneError::Precondition(format!("no constant surface at index {index}")))?;
        Ok(PropertyStore::new(engine, &index_map).apply_constant(constant.id, &mut constant.props))
    }
}

/// Unloads every object of an entry. Vector points go before lines.
fn unload_entry<E: DisplayEngine>(engine: &mut E, entry: &LayerEntry) -> Vec<SceneError> {
    let mut attempts: Vec<(ObjectKind, ObjectId, bool)> = Vec::new();
    match entry.ids {
        EngineIds::Surface(Some(id)) => attempts.push((ObjectKind::Surface, id, engine.unload_surface(id))),
        EngineIds::Volume(Some(id)) => attempts.push((ObjectKind::Volume, id, engine.unload_volume(id))),
        EngineIds::Vector { lines, points } => {
            if let Some(id) = points {
                attempts.push((ObjectKind::VectorPoints, id, engine.unload_vector(id, true)));
            }
            if let Some(id) = lines {
                attempts.push((ObjectKind::VectorLines, id, engine.unload_vector(id, false)));
            }
        }
        _ => {}
    }

    let mut errors = Vec::new();
    for (kind, id, ok) in attempts {
        if ok {
            tracing::info!(name = %entry.name, %kind, id, "map unloaded");
        } else {
            tracing::error!(name = %entry.name, %kind, id, "unloading map failed");
            errors.push(SceneError::Unload { name: entry.name.clone(), kind });
        }
    }
    errors
}
