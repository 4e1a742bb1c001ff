//! Cutting planes: a fixed set sized by the engine, at most one selected.

use crate::engine::{DisplayEngine, FenceColor};
use crate::error::{Result, SceneError};
use crate::settings::CPlaneSettings;
use glam::DVec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct CuttingPlane {
    pub tilt: f64,
    pub rotation: f64,
    pub position: DVec3,
    pub shading: FenceColor,
}

impl CuttingPlane {
    fn from_settings(settings: &CPlaneSettings) -> Self {
        Self {
            tilt: settings.tilt,
            rotation: settings.rotation,
            position: DVec3::from(settings.position),
            shading: settings.shading,
        }
    }
}

/// Plane settings a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CPlaneField {
    Rotation,
    Position,
    Shading,
}

#[derive(Debug, Clone)]
pub struct CuttingPlaneManager {
    planes: Vec<CuttingPlane>,
    selected: Option<usize>,
}

impl CuttingPlaneManager {
    /// One plane per engine slot, all starting from the preferences.
    pub fn new(count: usize, settings: &CPlaneSettings) -> Self {
        Self {
            planes: vec![CuttingPlane::from_settings(settings); count],
            selected: None,
        }
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn plane_mut(&mut self, index: usize) -> Result<&mut CuttingPlane> {
        let count = self.planes.len();
        self.planes.get_mut(index).ok_or_else(|| out_of_range(index, count))
    }

    /// Selects one plane and unselects every other one.
    pub fn select<E: DisplayEngine>(&mut self, engine: &mut E, index: usize) -> Result<()> {
        if index >= self.planes.len() {
            return Err(out_of_range(index, self.planes.len()));
        }

        for plane in 0..self.planes.len() {
            if plane == index {
                engine.select_cplane(plane);
            } else {
                engine.unselect_cplane(plane);
            }
        }
        self.selected = Some(index);
        tracing::debug!(index, "cutting plane selected");
        Ok(())
    }

    /// Pushes only the listed fields of one plane.
    pub fn update<E: DisplayEngine>(
        &self,
        engine: &mut E,
        index: usize,
        fields: &[CPlaneField],
    ) -> Result<()> {
        let plane = self
            .planes
            .get(index)
            .ok_or_else(|| out_of_range(index, self.planes.len()))?;

        for field in fields {
            match field {
                CPlaneField::Rotation => engine.set_cplane_rotation(index, plane.tilt, plane.rotation),
                CPlaneField::Position => {
                    let p = plane.position;
                    engine.set_cplane_translation(index, p.x, p.y, p.z);
                }
                CPlaneField::Shading => engine.set_fence_color(plane.shading),
            }
        }
        Ok(())
    }
}

fn out_of_range(index: usize, count: usize) -> SceneError {
    SceneError::Precondition(format!(
        "cutting plane index {index} out of range ({count} planes)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;

    #[test]
    fn test_select_unselects_the_rest() {
        let mut engine = RecordingEngine::new().with_cplanes(4);
        let mut planes = CuttingPlaneManager::new(engine.cplane_count(), &CPlaneSettings::default());

        planes.select(&mut engine, 2).unwrap();
        assert_eq!(planes.selected(), Some(2));
        assert_eq!(
            engine.calls(),
            ["unselect_cplane(0)", "unselect_cplane(1)", "select_cplane(2)", "unselect_cplane(3)"]
        );
    }

    #[test]
    fn test_select_out_of_range() {
        let mut engine = RecordingEngine::new().with_cplanes(4);
        let mut planes = CuttingPlaneManager::new(4, &CPlaneSettings::default());

        let err = planes.select(&mut engine, 4).unwrap_err();
        assert!(matches!(err, SceneError::Precondition(_)));
        assert_eq!(planes.selected(), None);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_update_pushes_listed_fields_only() {
        let mut engine = RecordingEngine::new();
        let mut planes = CuttingPlaneManager::new(4, &CPlaneSettings::default());
        {
            let plane = planes.plane_mut(1).unwrap();
            plane.tilt = 15.0;
            plane.rotation = 90.0;
            plane.shading = FenceColor::Blend;
        }

        planes.update(&mut engine, 1, &[CPlaneField::Rotation]).unwrap();
        assert_eq!(engine.take_calls(), ["set_cplane_rotation(1, 15, 90)"]);

        planes.update(&mut engine, 1, &[CPlaneField::Shading, CPlaneField::Position]).unwrap();
        assert_eq!(
            engine.take_calls(),
            ["set_fence_color(3)", "set_cplane_translation(1, 0, 0, 0)"]
        );
    }
}
