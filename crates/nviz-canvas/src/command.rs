//! Exports the current scene as an `nviz_cmd` batch invocation.
//!
//! The output is a flat run of space-separated `key=value[,value...]` tokens.
//! Values are not escaped, so a map name containing a comma cannot be
//! represented faithfully.

use crate::color::Rgb;
use crate::error::{Result, SceneError};
use crate::properties::{DrawProps, Source};
use crate::registry::LayerRegistry;
use crate::view::ViewController;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Colored skirt drawn along chosen edges of the region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FringeState {
    pub nw: bool,
    pub ne: bool,
    pub sw: bool,
    pub se: bool,
    pub color: Rgb,
    pub elevation: f64,
}

impl Default for FringeState {
    fn default() -> Self {
        Self {
            nw: false,
            ne: false,
            sw: false,
            se: false,
            color: Rgb(198, 198, 198),
            elevation: 55.0,
        }
    }
}

impl FringeState {
    /// Selected edges in `nw, ne, sw, se` order.
    pub fn edges(&self) -> Vec<&'static str> {
        [("nw", self.nw), ("ne", self.ne), ("sw", self.sw), ("se", self.se)]
            .into_iter()
            .filter_map(|(edge, on)| on.then_some(edge))
            .collect()
    }
}

/// `%d`-style rendering of a float.
fn int(v: f64) -> i64 {
    v.trunc() as i64
}

/// Per-surface draw lists, one value per raster then per constant.
#[derive(Default)]
struct DrawLists {
    mode: Vec<String>,
    fine: Vec<String>,
    coarse: Vec<String>,
    shading: Vec<String>,
    style: Vec<String>,
    wire: Vec<String>,
}

impl DrawLists {
    fn push_raster(&mut self, draw: &DrawProps) {
        let desc = draw.mode.get().desc();
        let res = draw.resolution.get();
        self.mode.push(desc.mode.as_str().to_owned());
        self.fine.push(res.fine.to_string());
        self.coarse.push(res.coarse.to_string());
        self.shading.push(desc.shading.as_str().to_owned());
        self.style.push(desc.style.as_str().to_owned());
        self.wire.push(draw.wire_color.get().to_string());
    }

    fn push_constant(&mut self, resolution: u32) {
        self.mode.push("fine".into());
        self.fine.push(resolution.to_string());
        self.coarse.push(resolution.to_string());
        self.shading.push("gouraud".into());
        self.style.push("surface".into());
        self.wire.push(Rgb::BLACK.to_string());
    }

    /// `key=v1,v2,...` clauses in fixed key order.
    fn clauses(&self) -> [String; 6] {
        [
            format!("mode={}", self.mode.join(",")),
            format!("resolution_fine={}", self.fine.join(",")),
            format!("resolution_coarse={}", self.coarse.join(",")),
            format!("shading={}", self.shading.join(",")),
            format!("style={}", self.style.join(",")),
            format!("wire_color={}", self.wire.join(",")),
        ]
    }

    /// `key=v1` clauses taking only the first surface's value.
    fn first_clauses(&self) -> [String; 6] {
        let first = |v: &[String]| v.first().cloned().unwrap_or_default();
        [
            format!("mode={}", first(&self.mode)),
            format!("resolution_fine={}", first(&self.fine)),
            format!("resolution_coarse={}", first(&self.coarse)),
            format!("shading={}", first(&self.shading)),
            format!("style={}", first(&self.style)),
            format!("wire_color={}", first(&self.wire)),
        ]
    }
}

/// Builds the batch command for the current scene. Fails when there is
/// neither a raster nor a constant surface to show.
pub fn build_command(
    registry: &LayerRegistry,
    view: &ViewController,
    fringe: &FringeState,
    size: (u32, u32),
) -> Result<String> {
    let rasters: Vec<_> = registry.rasters().collect();
    let constants = registry.constants();
    if rasters.is_empty() && constants.is_empty() {
        return Err(SceneError::InsufficientData);
    }

    let mut cmd = String::from("nviz_cmd ");

    // --- Elevation ---
    if !constants.is_empty() {
        let values: Vec<String> = constants
            .iter()
            .map(|c| int(*c.props.value.get()).to_string())
            .collect();
        let _ = write!(cmd, "elevation_value={} ", values.join(","));
    }

    if let Some((_, first)) = rasters.first() {
        let names: Vec<&str> = rasters.iter().map(|(e, _)| e.name.as_str()).collect();
        let _ = write!(cmd, "elevation_map={} ", names.join(","));

        // --- Draw mode ---
        let all_same = rasters.iter().all(|(_, p)| p.draw == first.draw);
        if all_same {
            cmd.push_str("-a ");
        }

        let mut lists = DrawLists::default();
        for (_, props) in &rasters {
            lists.push_raster(&props.draw);
        }
        for constant in constants {
            lists.push_constant(*constant.props.resolution.get());
        }

        if all_same {
            // Only the values that matter for the shared mode.
            let [mode, fine, coarse, shading, style, wire] = lists.first_clauses();
            let mut picked = vec![&mode];
            if mode.contains("fine") {
                picked.push(&fine);
            } else if mode.contains("coarse") {
                picked.push(&coarse);
            } else if mode.contains("both") {
                picked.push(&coarse);
                picked.push(&fine);
            }
            if shading.contains("flat") {
                picked.push(&shading);
            }
            if style.contains("wire") {
                picked.push(&style);
            }
            if mode.contains("coarse") || (mode.contains("both") && shading.contains("wire")) {
                picked.push(&wire);
            }
            for clause in picked {
                let _ = write!(cmd, "{clause} ");
            }
        } else {
            for clause in lists.clauses() {
                let _ = write!(cmd, "{clause} ");
            }
        }

        // --- Colors ---
        let mut color_map = Vec::new();
        let mut color_value = Vec::new();
        for (entry, props) in &rasters {
            let color = props.color.get();
            match color.source {
                Source::Map => color_map.push(color.value.clone()),
                Source::Constant => color_value.push(color.value.clone()),
                Source::Unset => color_map.push(entry.name.clone()),
            }
        }
        color_value.extend(constants.iter().map(|c| c.props.color.get().to_string()));

        if !color_map.is_empty() {
            let _ = write!(cmd, "color_map={} ", color_map.join(","));
        }
        if !color_value.is_empty() {
            let _ = write!(cmd, "color={} ", color_value.join(","));
        }
    }

    // --- Viewpoint ---
    let v = &view.view;
    let focus = v
        .focus
        .map_or([-1, -1, -1], |f| [int(f.x), int(f.y), int(f.z)]);
    let _ = write!(
        cmd,
        "position={:.2},{:.2} height={} perspective={} twist={} zexag={} focus={},{},{} ",
        v.position.x,
        v.position.y,
        int(v.height.value),
        int(v.perspective),
        int(v.twist),
        int(v.z_exag.value),
        focus[0],
        focus[1],
        focus[2],
    );

    if v.background != Rgb::WHITE {
        let _ = write!(cmd, "bgcolor={} ", v.background);
    }

    // --- Light ---
    let l = &view.light;
    let _ = write!(
        cmd,
        "light_position={:.2},{:.2},{:.2} light_brightness={} light_ambient={} light_color={} ",
        l.position.x,
        l.position.y,
        l.position.z / 100.0,
        int(l.brightness),
        int(l.ambient),
        l.color,
    );

    // --- Fringe ---
    let edges = fringe.edges();
    if !edges.is_empty() {
        let _ = write!(
            cmd,
            "fringe={} fringe_color={} fringe_elevation={} ",
            edges.join(","),
            fringe.color,
            int(fringe.elevation),
        );
    }

    let _ = write!(cmd, "output=nviz_output format=ppm size={},{} ", size.0, size.1);
    Ok(cmd)
}
