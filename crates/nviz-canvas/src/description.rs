//! JSON description of a scene to replay.

use anyhow::Context;
use nviz_canvas::color::Rgb;
use nviz_canvas::command::FringeState;
use nviz_canvas::engine::DisplayEngine;
use nviz_canvas::settings::LightSettings;
use nviz_canvas::tree::{LayerTree, VectorInfo};
use nviz_canvas::view::LightState;
use nviz_canvas::{Scene, SceneCommand};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantSpec {
    pub value: f64,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub resolution: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub tree: LayerTree,
    /// Feature counts per vector map name.
    pub vector_info: HashMap<String, VectorInfo>,
    pub constants: Vec<ConstantSpec>,
    pub fringe: FringeState,
    pub background: Option<Rgb>,
    pub z_exag: Option<f64>,
    pub light: Option<LightSettings>,
}

impl SceneDescription {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene description {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scene description {}", path.display()))
    }

    /// Everything except the layer tree. Apply after syncing the tree, since
    /// loading layers resets the view.
    pub fn apply<E: DisplayEngine>(&self, scene: &mut Scene<E>) -> anyhow::Result<()> {
        for spec in &self.constants {
            let index = scene.new_constant().context("Failed to add constant surface")?;
            if let Some(props) = scene.registry_mut().constant_mut(index) {
                props.value.set(spec.value);
                if let Some(color) = spec.color {
                    props.color.set(color);
                }
                if let Some(res) = spec.resolution {
                    props.resolution.set(res);
                }
            }
            for e in scene.dispatch(SceneCommand::ConstantChanged(index)).errors {
                tracing::warn!(error = %e, "constant surface update failed");
            }
        }

        if let Some(background) = self.background {
            scene.view_mut().view.background = background;
        }
        if let Some(z_exag) = self.z_exag {
            scene.view_mut().view.z_exag.value = z_exag;
            scene.dispatch(SceneCommand::ViewChanged { z_exag: true });
        }
        if let Some(light) = &self.light {
            scene.view_mut().light = LightState::from_settings(light);
            scene.dispatch(SceneCommand::LightChanged);
        }
        *scene.fringe_mut() = self.fringe.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nviz_canvas::engine::RecordingEngine;
    use nviz_canvas::settings::Settings;

    #[test]
    fn test_description_drives_scene() {
        let json = r#"{
            "tree": {"nodes": [
                {"handle": 1, "name": "elevation", "kind": "raster"},
                {"handle": 2, "name": "streams", "kind": "vector"}
            ]},
            "vector_info": {"streams": {"lines": 5}},
            "constants": [{"value": 250, "color": [0, 0, 255]}],
            "background": [0, 0, 0],
            "fringe": {"nw": true},
            "light": {"brightness": 60},
            "z_exag": 3
        }"#;
        let description: SceneDescription = serde_json::from_str(json).unwrap();
        let mut scene = Scene::new(
            RecordingEngine::new(),
            Settings::default(),
            description.vector_info.clone(),
            (640, 480),
        );
        let report = scene.sync(&description.tree);
        assert!(report.errors.is_empty());
        description.apply(&mut scene).unwrap();

        assert_eq!(scene.engine().count("load_vector_lines"), 1);
        assert_eq!(scene.engine().count("load_vector_points"), 0);
        let cmd = scene.command_string().unwrap();
        assert!(cmd.starts_with("nviz_cmd elevation_value=250 elevation_map=elevation "));
        assert!(cmd.contains("color_map=elevation color=0:0:255 "));
        assert!(cmd.contains("zexag=3 "));
        assert!(cmd.contains("bgcolor=0:0:0 "));
        assert!(cmd.contains("fringe=nw "));
        assert!(cmd.contains("light_brightness=60 light_ambient=20 "));
    }
}
