//! Portal generation: the polygons joining neighbouring leaves of a tree.

use cgmath::Zero;
use log::info;

use crate::context::CompileContext;
use crate::error::{CompileError, Result, Warning};
use crate::game::Contents;
use crate::math::{Plane, Vec3, BASE_WINDING_RADIUS, ON_EPSILON};
use crate::plane::{PlaneRegistry, PlaneSide};
use crate::tree::{BspTree, Node, NodeId, NodeKind};
use crate::winding::Winding;

/// A polygon on a node plane with one node on each side.
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    pub planenum: usize,
    /// The nodes in front of and behind the canonical plane.
    pub nodes: [NodeId; 2],
    pub winding: Winding,
}

impl Portal {
    /// Which slot of `nodes` holds `node`.
    pub fn side_of(&self, node: NodeId) -> Option<usize> {
        if self.nodes[0] == node {
            Some(0)
        } else if self.nodes[1] == node {
            Some(1)
        } else {
            None
        }
    }

    /// The node on the far side from `node`.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        self.side_of(node).map(|side| self.nodes[1 - side])
    }
}

/// Portals of one tree, linked to the nodes on both sides.
///
/// Portals only bound leaves, detail separators (whose whole subtree forms
/// one cluster) and the outside node. The outside node is a SOLID leaf
/// added to the tree arena that is not reachable from the head.
#[derive(Clone, Debug)]
pub struct PortalGraph {
    pub portals: Vec<Portal>,
    node_portals: Vec<Vec<usize>>,
    pub outside_node: NodeId,
    visleafs: Vec<Option<usize>>,
    clusters: Vec<Option<usize>>,
    pub num_visleafs: usize,
    pub num_clusters: usize,
    pub num_visportals: usize,
    transwater: bool,
    transsky: bool,
}

/// Contents of a leaf, or the combined contents of a cluster subtree.
pub fn cluster_contents(tree: &BspTree, node: NodeId) -> Contents {
    let [front, back] = match &tree.node(node).kind {
        NodeKind::Leaf { contents, .. } => return *contents,
        NodeKind::Decision { children, .. } => *children,
    };
    let contents0 = cluster_contents(tree, front);
    let contents1 = cluster_contents(tree, back);

    if contents0 == contents1 {
        return contents0;
    }
    // clusters may be partially solid but still be seen into
    if contents0 == Contents::Empty || contents1 == Contents::Empty {
        return Contents::Empty;
    }
    if contents0.is_liquid() {
        return contents0;
    }
    if contents1.is_liquid() {
        return contents1;
    }
    if contents0 == Contents::Sky || contents1 == Contents::Sky {
        return Contents::Sky;
    }
    Contents::Solid
}

impl PortalGraph {
    fn new(node_count: usize, outside_node: NodeId, transwater: bool, transsky: bool) -> PortalGraph {
        PortalGraph {
            portals: Vec::new(),
            node_portals: vec![Vec::new(); node_count],
            outside_node,
            visleafs: vec![None; node_count],
            clusters: vec![None; node_count],
            num_visleafs: 0,
            num_clusters: 0,
            num_visportals: 0,
            transwater,
            transsky,
        }
    }

    /// Portal indices touching a node.
    pub fn node_portals(&self, node: NodeId) -> &[usize] {
        self.node_portals.get(node).map_or(&[], |v| v.as_slice())
    }

    pub fn visleaf(&self, node: NodeId) -> Option<usize> {
        self.visleafs.get(node).copied().flatten()
    }

    pub fn cluster(&self, node: NodeId) -> Option<usize> {
        self.clusters.get(node).copied().flatten()
    }

    /// True when a PRT file carries the cluster table.
    pub fn has_detail_clusters(&self) -> bool {
        self.num_clusters != self.num_visleafs
    }

    /// Whether the vis stage can see through a portal.
    pub fn portal_thru(&self, tree: &BspTree, portal: &Portal) -> bool {
        if portal.nodes.contains(&self.outside_node) {
            return false;
        }
        let contents0 = cluster_contents(tree, portal.nodes[0]);
        let contents1 = cluster_contents(tree, portal.nodes[1]);

        if contents0 == Contents::Solid || contents1 == Contents::Solid {
            return false;
        }
        if contents0 == contents1 {
            return true;
        }
        if self.transwater
            && ((contents0.is_liquid() && contents1 == Contents::Empty)
                || (contents1.is_liquid() && contents0 == Contents::Empty))
        {
            return true;
        }
        self.transsky
            && ((contents0 == Contents::Sky && contents1 == Contents::Empty)
                || (contents0 == Contents::Empty && contents1 == Contents::Sky))
    }

    fn link(&mut self, portal: usize, nodes: [NodeId; 2]) {
        self.portals[portal].nodes = nodes;
        self.node_portals[nodes[0]].push(portal);
        self.node_portals[nodes[1]].push(portal);
    }

    fn add_portal(&mut self, planenum: usize, winding: Winding, nodes: [NodeId; 2]) -> usize {
        self.portals.push(Portal { planenum, nodes, winding });
        let index = self.portals.len() - 1;
        self.node_portals[nodes[0]].push(index);
        self.node_portals[nodes[1]].push(index);
        index
    }

    fn unlink_from(&mut self, portal: usize, node: NodeId) -> Result<()> {
        let list = &mut self.node_portals[node];
        let position = list
            .iter()
            .position(|&p| p == portal)
            .ok_or_else(|| {
                CompileError::invariant("remove portal", format!("portal {} not in node {}", portal, node))
            })?;
        list.remove(position);
        Ok(())
    }

    /// Six portals around the padded head bounds, facing the outside node.
    fn make_headnode_portals(&mut self, planes: &mut PlaneRegistry, tree: &BspTree) -> Result<()> {
        let bounds = tree.node(tree.head).bounds;
        let mut boundary = Vec::with_capacity(6);

        for i in 0..3 {
            for j in 0..2 {
                let mut normal = Vec3::zero();
                let plane = if j == 0 {
                    normal[i] = 1.0;
                    Plane::new(normal, bounds.mins[i])
                } else {
                    normal[i] = -1.0;
                    Plane::new(normal, -bounds.maxs[i])
                };
                let found = planes.add_or_find_plane(&plane)?;
                let nodes = match found.side {
                    PlaneSide::Front => [tree.head, self.outside_node],
                    PlaneSide::Back => [self.outside_node, tree.head],
                };
                boundary.push((plane, found.planenum, nodes));
            }
        }

        // clip the base windings by all the other planes
        for (i, (plane, planenum, nodes)) in boundary.iter().enumerate() {
            let mut winding = Some(Winding::from_plane(plane, BASE_WINDING_RADIUS));
            for (j, (other, _, _)) in boundary.iter().enumerate() {
                if i == j {
                    continue;
                }
                winding = match winding {
                    Some(w) => w.clip_front(other, true)?,
                    None => None,
                };
            }
            let winding = winding
                .ok_or_else(|| CompileError::invariant("headnode portals", "bounds portal clipped away"))?;
            self.add_portal(*planenum, winding, *nodes);
        }
        Ok(())
    }

    fn cut_node_portals(&mut self, ctx: &mut CompileContext, tree: &BspTree, node: NodeId) -> Result<()> {
        // no portals inside detail clusters
        let (planenum, [front, back]) = match &tree.node(node).kind {
            NodeKind::Decision { planenum, children, detail_separator: false, .. } => (*planenum, *children),
            _ => return Ok(()),
        };
        let plane = ctx.planes.get(planenum).as_plane();

        // the full plane, clipped by the planes of the portals already
        // bounding this node
        let mut winding = Some(Winding::from_plane(&plane, BASE_WINDING_RADIUS));
        for &p in &self.node_portals[node] {
            let portal = &self.portals[p];
            let clip = ctx.planes.get(portal.planenum).as_plane();
            let clip = match portal.side_of(node) {
                Some(0) => clip,
                Some(_) => clip.flipped(),
                None => {
                    return Err(CompileError::invariant("cut node portals", format!("mislinked portal {}", p)));
                }
            };
            winding = match winding {
                Some(w) => w.clip_front(&clip, true)?,
                None => None,
            };
            if winding.is_none() {
                ctx.warn(Warning::PortalClippedAway { node });
                break;
            }
        }
        if let Some(winding) = winding {
            self.add_portal(planenum, winding, [front, back]);
        }

        // move the node's portals down to the children, splitting the ones
        // that cross the plane
        let portals = std::mem::take(&mut self.node_portals[node]);
        for p in portals {
            let side = self.portals[p]
                .side_of(node)
                .ok_or_else(|| CompileError::invariant("cut node portals", format!("mislinked portal {}", p)))?;
            let other = self.portals[p].nodes[1 - side];
            self.unlink_from(p, other)?;

            let place = |child: NodeId| if side == 0 { [child, other] } else { [other, child] };
            let winding = std::mem::take(&mut self.portals[p].winding);
            match winding.clip(&plane, ON_EPSILON, false)? {
                (None, Some(w)) => {
                    self.portals[p].winding = w;
                    self.link(p, place(back));
                }
                (Some(w), None) => {
                    self.portals[p].winding = w;
                    self.link(p, place(front));
                }
                (Some(f), Some(b)) => {
                    let portal_planenum = self.portals[p].planenum;
                    self.portals[p].winding = f;
                    self.link(p, place(front));
                    self.add_portal(portal_planenum, b, place(back));
                }
                (None, None) => {
                    return Err(CompileError::invariant("cut node portals", format!("portal {} vanished", p)));
                }
            }
        }

        self.cut_node_portals(ctx, tree, front)?;
        self.cut_node_portals(ctx, tree, back)
    }

    /// Assign visleaf numbers to non-solid leaves and cluster numbers to
    /// leaves and detail separators.
    fn number_leafs(&mut self, tree: &BspTree, node: NodeId, cluster: Option<usize>) {
        match &tree.node(node).kind {
            NodeKind::Decision { children, detail_separator, .. } => {
                let mut cluster = cluster;
                if cluster.is_none() && *detail_separator {
                    cluster = Some(self.num_clusters);
                    self.clusters[node] = cluster;
                    self.num_clusters += 1;
                }
                for &child in children {
                    self.number_leafs(tree, child, cluster);
                }
            }
            // the viewpoint is never inside a solid leaf
            NodeKind::Leaf { contents: Contents::Solid, .. } => {}
            NodeKind::Leaf { .. } => {
                let cluster = match cluster {
                    Some(cluster) => cluster,
                    None => {
                        self.num_clusters += 1;
                        self.num_clusters - 1
                    }
                };
                self.visleafs[node] = Some(self.num_visleafs);
                self.clusters[node] = Some(cluster);
                self.num_visleafs += 1;
            }
        }
    }
}

/// Build the portals of a tree and number its visible leaves.
///
/// Adds the outside node to the tree and records the visleaf and cluster
/// numbers on the leaves.
pub fn portalize(ctx: &mut CompileContext, tree: &mut BspTree, hull: usize) -> Result<PortalGraph> {
    info!("Portalize");

    let outside_bounds = tree.node(tree.head).bounds;
    let outside_node = tree.add_node(Node::leaf(outside_bounds, Contents::Solid, Vec::new()));
    let mut graph = PortalGraph::new(
        tree.nodes.len(),
        outside_node,
        ctx.options.transwater,
        ctx.options.transsky,
    );

    graph.make_headnode_portals(&mut ctx.planes, tree)?;
    graph.cut_node_portals(ctx, tree, tree.head)?;

    graph.number_leafs(tree, tree.head, None);
    graph.num_visportals = graph.portals.iter().filter(|p| graph.portal_thru(&*tree, p)).count();

    for id in 0..tree.nodes.len() {
        let (visleaf, cluster) = (graph.visleaf(id), graph.cluster(id));
        if let NodeKind::Leaf { visleafnum, cluster: leaf_cluster, .. } = &mut tree.node_mut(id).kind {
            *visleafnum = visleaf;
            *leaf_cluster = cluster;
        }
    }

    if hull == 0 {
        info!("{:8} vis leafs", graph.num_visleafs);
        info!("{:8} vis clusters", graph.num_clusters);
        info!("{:8} vis portals", graph.num_visportals);
    }
    Ok(graph)
}
