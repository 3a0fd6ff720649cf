//! The node arena produced by the solid BSP builder.

use crate::bounds::Bounds;
use crate::face::Face;
use crate::game::Contents;
use crate::math::Vec3;
use crate::plane::PlaneRegistry;

pub type NodeId = usize;

/// A face stored on a decision node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeFace {
    pub face: Face,
    pub node: NodeId,
    /// Set by the outside fill when the face only borders filled space.
    pub removed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Decision {
        planenum: usize,
        /// Front and back child.
        children: [NodeId; 2],
        /// Indices into `BspTree::faces`, both facings.
        faces: Vec<usize>,
        detail_separator: bool,
    },
    Leaf {
        contents: Contents,
        /// Node faces with a fragment bordering this leaf.
        markfaces: Vec<usize>,
        /// Entity placed in this leaf, for the outside fill.
        occupied: Option<usize>,
        visleafnum: Option<usize>,
        cluster: Option<usize>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Bounding volume, not just the points inside.
    pub bounds: Bounds,
    pub kind: NodeKind,
}

impl Node {
    pub fn leaf(bounds: Bounds, contents: Contents, markfaces: Vec<usize>) -> Node {
        Node {
            bounds,
            kind: NodeKind::Leaf { contents, markfaces, occupied: None, visleafnum: None, cluster: None },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn planenum(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Decision { planenum, .. } => Some(*planenum),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn children(&self) -> Option<[NodeId; 2]> {
        match &self.kind {
            NodeKind::Decision { children, .. } => Some(*children),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Leaf contents, `None` for decision nodes.
    pub fn contents(&self) -> Option<Contents> {
        match &self.kind {
            NodeKind::Leaf { contents, .. } => Some(*contents),
            NodeKind::Decision { .. } => None,
        }
    }

    pub fn set_contents(&mut self, value: Contents) {
        if let NodeKind::Leaf { contents, .. } = &mut self.kind {
            *contents = value;
        }
    }

    pub fn markfaces(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Leaf { markfaces, .. } => markfaces,
            NodeKind::Decision { .. } => &[],
        }
    }

    pub fn occupied(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Leaf { occupied, .. } => *occupied,
            NodeKind::Decision { .. } => None,
        }
    }

    pub fn visleafnum(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Leaf { visleafnum, .. } => *visleafnum,
            NodeKind::Decision { .. } => None,
        }
    }

    pub fn cluster(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Leaf { cluster, .. } => *cluster,
            NodeKind::Decision { .. } => None,
        }
    }

    pub fn is_detail_separator(&self) -> bool {
        matches!(self.kind, NodeKind::Decision { detail_separator: true, .. })
    }
}

/// A BSP tree for one hull of one entity. Nodes refer to each other by index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BspTree {
    pub nodes: Vec<Node>,
    pub faces: Vec<NodeFace>,
    pub head: NodeId,
}

impl BspTree {
    pub fn new() -> BspTree {
        BspTree::default()
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Ids of every leaf, in depth first front-to-back order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.head];
        while let Some(id) = stack.pop() {
            match self.nodes[id].children() {
                Some([front, back]) => {
                    stack.push(back);
                    stack.push(front);
                }
                None => leaves.push(id),
            }
        }
        leaves
    }

    /// Ids of every decision node, in depth first front-to-back order.
    pub fn decision_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut stack = vec![self.head];
        while let Some(id) = stack.pop() {
            if let Some([front, back]) = self.nodes[id].children() {
                nodes.push(id);
                stack.push(back);
                stack.push(front);
            }
        }
        nodes
    }

    /// The leaf containing a point. Points on a plane go to the back.
    pub fn point_in_leaf(&self, point: &Vec3, planes: &PlaneRegistry) -> NodeId {
        let mut id = self.head;
        while let NodeKind::Decision { planenum, children, .. } = &self.nodes[id].kind {
            let d = planes.get(*planenum).distance_to(point);
            id = if d > 0.0 { children[0] } else { children[1] };
        }
        id
    }

    /// Leaves reachable from the head with the given contents.
    pub fn count_leaves(&self, contents: Contents) -> usize {
        self.leaves().into_iter().filter(|&id| self.nodes[id].contents() == Some(contents)).count()
    }
}
