//! Snapshot of the layer tree the canvas reconciles against.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable identity of a tree node, independent of engine ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerHandle(pub u64);

/// What a tree node displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Group,
    Raster,
    #[serde(rename = "3d-raster")]
    Volume,
    Vector,
    /// Any other display command (grids, labels, ...); ignored in 3D.
    Command,
}

/// Map layer kinds the 3D canvas can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Raster,
    Volume,
    Vector,
}

impl NodeKind {
    pub fn layer_kind(self) -> Option<LayerKind> {
        match self {
            Self::Raster => Some(LayerKind::Raster),
            Self::Volume => Some(LayerKind::Volume),
            Self::Vector => Some(LayerKind::Vector),
            Self::Group | Self::Command => None,
        }
    }
}

fn checked_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub handle: LayerHandle,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default = "checked_by_default")]
    pub checked: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    /// Display command the node was created from, e.g. `["d.vect", "map=roads", "color=red"]`.
    #[serde(default)]
    pub command: Vec<String>,
}

impl TreeNode {
    pub fn layer(handle: u64, name: &str, kind: NodeKind) -> Self {
        Self {
            handle: LayerHandle(handle),
            name: name.to_owned(),
            kind,
            checked: true,
            children: Vec::new(),
            command: Vec::new(),
        }
    }

    /// Value of a `key=value` option in a `d.vect` command.
    pub fn vector_option(&self, key: &str) -> Option<&str> {
        let (program, options) = self.command.split_first()?;
        if program != "d.vect" {
            return None;
        }
        options
            .iter()
            .filter_map(|opt| opt.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerTree {
    #[serde(default)]
    pub nodes: Vec<TreeNode>,
}

impl LayerTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Checked, loadable layers in tree order. Groups always expand their
    /// children; the group's own check state does not hide them.
    pub fn checked_layers(&self) -> Vec<&TreeNode> {
        fn walk<'a>(nodes: &'a [TreeNode], out: &mut Vec<&'a TreeNode>) {
            for node in nodes {
                if node.kind == NodeKind::Group {
                    walk(&node.children, out);
                    continue;
                }
                if node.checked && node.kind.layer_kind().is_some() {
                    out.push(node);
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    pub fn find(&self, handle: LayerHandle) -> Option<&TreeNode> {
        fn walk(nodes: &[TreeNode], handle: LayerHandle) -> Option<&TreeNode> {
            nodes.iter().find_map(|n| {
                if n.handle == handle {
                    Some(n)
                } else {
                    walk(&n.children, handle)
                }
            })
        }
        walk(&self.nodes, handle)
    }

    pub fn contains(&self, handle: LayerHandle) -> bool {
        self.find(handle).is_some()
    }
}

/// Feature counts of a vector map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorInfo {
    #[serde(default)]
    pub points: usize,
    #[serde(default)]
    pub lines: usize,
    #[serde(default)]
    pub features: usize,
    #[serde(default)]
    pub is_3d: bool,
}

/// Inspects map metadata on behalf of the canvas.
pub trait MapMetadata {
    fn vector_info(&self, name: &str) -> VectorInfo;
}

impl MapMetadata for HashMap<String, VectorInfo> {
    fn vector_info(&self, name: &str) -> VectorInfo {
        self.get(name).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_expand_and_unchecked_are_skipped() {
        let mut group = TreeNode::layer(1, "group", NodeKind::Group);
        group.checked = false;
        group.children = vec![
            TreeNode::layer(2, "elevation", NodeKind::Raster),
            TreeNode::layer(3, "grid", NodeKind::Command),
        ];
        let mut hidden = TreeNode::layer(4, "roads", NodeKind::Vector);
        hidden.checked = false;
        let tree = LayerTree::new(vec![group, hidden, TreeNode::layer(5, "geology", NodeKind::Volume)]);

        let handles: Vec<u64> = tree.checked_layers().iter().map(|n| n.handle.0).collect();
        assert_eq!(handles, vec![2, 5]);
        assert!(tree.contains(LayerHandle(4)));
        assert!(!tree.contains(LayerHandle(9)));
    }

    #[test]
    fn test_vector_option_only_reads_d_vect() {
        let mut node = TreeNode::layer(1, "roads", NodeKind::Vector);
        node.command = vec!["d.vect".into(), "map=roads".into(), "color=red".into()];
        assert_eq!(node.vector_option("color"), Some("red"));

        node.command[0] = "d.rast".into();
        assert_eq!(node.vector_option("color"), None);
    }

    #[test]
    fn test_tree_from_json() {
        let json = r#"{"nodes":[{"handle":7,"name":"vol","kind":"3d-raster"}]}"#;
        let tree: LayerTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.nodes[0].kind, NodeKind::Volume);
        assert!(tree.nodes[0].checked);
    }
}
