//! Filter graph: ordered effect nodes with resolved back-references.

pub(crate) mod build;
pub(crate) mod desc;
pub(crate) mod node;

use crate::{
    graph::{
        build::GraphBuilder,
        node::{EffectNode, NodeId},
    },
    pixel::buffer::ColorSpace,
    render::region::{FilterUnits, RegionSpec},
};

/// A node the lenient builder dropped, with the reason it failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedNode {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Immutable, validated list of effect nodes in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterGraph {
    pub(crate) nodes: Vec<EffectNode>,
    pub(crate) region: RegionSpec,
    pub(crate) primitive_units: FilterUnits,
    pub(crate) color_space: ColorSpace,
    pub(crate) dropped: Vec<DroppedNode>,
}

impl Default for FilterGraph {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            region: RegionSpec::default(),
            primitive_units: FilterUnits::UserSpace,
            color_space: ColorSpace::LinearRgb,
            dropped: Vec::new(),
        }
    }
}

impl FilterGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn nodes(&self) -> &[EffectNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&EffectNode> {
        self.nodes.get(id.0)
    }

    /// Most recent node carrying `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .rposition(|n| n.name == name)
            .map(NodeId)
    }

    /// Look a node up by the hash of its result name.
    pub fn find_by_hash(&self, id: u32) -> Option<NodeId> {
        if id == 0 {
            return None;
        }
        self.nodes.iter().rposition(|n| n.id == id).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn region(&self) -> &RegionSpec {
        &self.region
    }

    pub fn primitive_units(&self) -> FilterUnits {
        self.primitive_units
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn dropped(&self) -> &[DroppedNode] {
        &self.dropped
    }

    /// Discard every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.dropped.clear();
    }
}
