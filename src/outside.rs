//! Outside fill: seal the void around the world and trace leaks.

use std::collections::VecDeque;

use cgmath::{InnerSpace, Zero};
use log::{debug, info};

use crate::context::CompileContext;
use crate::error::{CompileError, Result, Warning};
use crate::game::Contents;
use crate::map::MapData;
use crate::math::{Vec3, ON_EPSILON};
use crate::plane::PlaneRegistry;
use crate::portals::{cluster_contents, PortalGraph};
use crate::tree::{BspTree, NodeId, NodeKind};

/// The path from an entity inside the world to the outside.
#[derive(Clone, Debug, PartialEq)]
pub struct LeakTrail {
    /// Entity whose leaf the fill reached.
    pub entity: usize,
    pub origin: Vec3,
    /// Trail points, spaced at most `leak_dist` apart, starting at the entity.
    pub points: Vec<Vec3>,
    /// `.por` diagnostic text when requested.
    pub por: Option<String>,
}

impl LeakTrail {
    /// The `.pts` point file read by level editors.
    pub fn pts_text(&self) -> String {
        self.points
            .iter()
            .map(|p| format!("{:.6} {:.6} {:.6}\n", p.x, p.y, p.z))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FillOutcome {
    /// Every leaf reachable from outside is now solid.
    Filled { outleafs: usize },
    /// No entity was inside the world, nothing was filled.
    NoOccupants,
    /// An entity can see the void. Only hull 0 records a trail.
    Leaked { entity: usize, trail: Option<LeakTrail> },
}

impl FillOutcome {
    pub fn filled(&self) -> bool {
        matches!(self, FillOutcome::Filled { .. })
    }
}

/// Mark the leaf containing every point entity that is not in solid space.
/// Returns whether any entity was placed.
fn place_occupants(tree: &mut BspTree, planes: &PlaneRegistry, map: &MapData) -> bool {
    let mut inside = false;
    for (num, entity) in map.entities.iter().enumerate().skip(1) {
        let Some(origin) = entity.origin else {
            continue;
        };
        if origin == Vec3::zero() {
            continue;
        }
        let leaf = tree.point_in_leaf(&origin, planes);
        if let NodeKind::Leaf { contents, occupied, .. } = &mut tree.node_mut(leaf).kind {
            if *contents != Contents::Solid {
                *occupied = Some(num);
                inside = true;
            }
        }
    }
    inside
}

/// Leaves under a portal node: the node itself, or a whole detail cluster.
fn subtree_leaves(tree: &BspTree, node: NodeId) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        match tree.node(id).children() {
            Some([front, back]) => {
                stack.push(back);
                stack.push(front);
            }
            None => leaves.push(id),
        }
    }
    leaves
}

fn occupant(tree: &BspTree, node: NodeId) -> Option<usize> {
    subtree_leaves(tree, node).into_iter().find_map(|id| tree.node(id).occupied())
}

fn blocks_fill(tree: &BspTree, node: NodeId) -> bool {
    matches!(cluster_contents(tree, node), Contents::Solid | Contents::Sky)
}

/// Result of the flood from the outside node.
struct Flood {
    /// Nodes reached, in visit order.
    visited: Vec<NodeId>,
    /// The occupied node reached and the portal path back to the outside.
    leak: Option<(NodeId, usize, Vec<usize>)>,
}

/// Breadth first search over portals from the outside node, stopping at
/// solid and sky. Parent portals give the shortest path of any leak.
fn flood_from_outside(tree: &BspTree, graph: &PortalGraph) -> Flood {
    let mut parent: Vec<Option<usize>> = vec![None; tree.nodes.len()];
    let mut seen = vec![false; tree.nodes.len()];
    let mut visited = Vec::new();
    let mut queue = VecDeque::new();

    seen[graph.outside_node] = true;
    for &p in graph.node_portals(graph.outside_node) {
        if let Some(next) = graph.portals[p].other(graph.outside_node) {
            if !seen[next] && !blocks_fill(tree, next) {
                seen[next] = true;
                parent[next] = Some(p);
                queue.push_back(next);
            }
        }
    }

    while let Some(node) = queue.pop_front() {
        if let Some(entity) = occupant(tree, node) {
            // walk back to the outside, nearest portal to the entity first
            let mut path = Vec::new();
            let mut current = node;
            while let Some(p) = parent[current] {
                path.push(p);
                match graph.portals[p].other(current) {
                    Some(prev) if prev != graph.outside_node => current = prev,
                    _ => break,
                }
            }
            return Flood { visited, leak: Some((node, entity, path)) };
        }
        visited.push(node);

        for &p in graph.node_portals(node) {
            let Some(next) = graph.portals[p].other(node) else {
                continue;
            };
            if seen[next] || blocks_fill(tree, next) {
                continue;
            }
            seen[next] = true;
            parent[next] = Some(p);
            queue.push_back(next);
        }
    }
    Flood { visited, leak: None }
}

/// True when the segment crosses no face bordering the leaves it passes through.
fn line_clear(tree: &BspTree, planes: &PlaneRegistry, node: NodeId, v1: &Vec3, v2: &Vec3) -> bool {
    match &tree.node(node).kind {
        NodeKind::Leaf { markfaces, .. } => {
            for &index in markfaces {
                let face = &tree.faces[index].face;
                let plane = planes.get(face.planenum);
                let dist1 = plane.distance_to(v1);
                let dist2 = plane.distance_to(v2);

                // segment doesn't cross the plane
                if (dist1 < -ON_EPSILON && dist2 < -ON_EPSILON) || (dist1 > ON_EPSILON && dist2 > ON_EPSILON) {
                    continue;
                }

                let mid = if dist1.abs() < ON_EPSILON {
                    if dist2.abs() < ON_EPSILON {
                        // too short or lying in the plane
                        return false;
                    }
                    *v1
                } else if dist2.abs() < ON_EPSILON {
                    *v2
                } else {
                    *v1 + (*v2 - *v1) * (dist1 / (dist1 - dist2))
                };

                if face.winding.contains_point(&plane.normal, &mid) {
                    return false;
                }
            }
            true
        }
        NodeKind::Decision { planenum, children, .. } => {
            let plane = planes.get(*planenum);
            let dist1 = plane.distance_to(v1);
            let dist2 = plane.distance_to(v2);
            if dist1 < -ON_EPSILON && dist2 < -ON_EPSILON {
                return line_clear(tree, planes, children[1], v1, v2);
            }
            if dist1 > ON_EPSILON && dist2 > ON_EPSILON {
                return line_clear(tree, planes, children[0], v1, v2);
            }
            line_clear(tree, planes, children[0], v1, v2) && line_clear(tree, planes, children[1], v1, v2)
        }
    }
}

/// Points from `p1` toward `p2`, `step` apart. `p2` itself is left out.
fn trail_segment(points: &mut Vec<Vec3>, p1: Vec3, p2: Vec3, step: f64) {
    let dir = p2 - p1;
    let mut len = dir.magnitude();
    if len == 0.0 {
        return;
    }
    let dir = dir / len;
    let mut point = p1;
    points.push(point);
    while len > step {
        point += dir * step;
        len -= step;
        points.push(point);
    }
}

/// Drop waypoints that can be skipped with a clear line of sight.
fn simplify_waypoints(tree: &BspTree, planes: &PlaneRegistry, waypoints: &[Vec3]) -> Vec<Vec3> {
    let mut kept = Vec::new();
    if waypoints.is_empty() {
        return kept;
    }
    let last = waypoints.len() - 1;
    let mut i = 0;
    kept.push(waypoints[0]);
    while i < last {
        let mut j = last;
        while j > i + 1 && !line_clear(tree, planes, tree.head, &waypoints[i], &waypoints[j]) {
            j -= 1;
        }
        kept.push(waypoints[j]);
        i = j;
    }
    kept
}

fn por_portal_points(out: &mut String, points: &[Vec3]) {
    out.push_str(&format!("{} ", points.len()));
    for p in points {
        out.push_str(&format!("{:.6} {:.6} {:.6} ", p.x, p.y, p.z));
    }
}

/// The `.por` dump: the entity origin, the open portals of the leaked
/// leaf, then the centre and points of every portal on the path.
fn por_text(tree: &BspTree, graph: &PortalGraph, origin: &Vec3, leak_node: NodeId, path: &[usize]) -> String {
    let mut out = format!("{}\n", path.len());
    out.push_str(&format!("{:.6} {:.6} {:.6}\n", origin.x, origin.y, origin.z));

    let open: Vec<usize> = graph
        .node_portals(leak_node)
        .iter()
        .copied()
        .filter(|&p| {
            graph.portals[p]
                .other(leak_node)
                .is_some_and(|other| !blocks_fill(tree, other))
        })
        .collect();
    out.push_str(&format!("{}\n", open.len()));
    for p in open {
        por_portal_points(&mut out, graph.portals[p].winding.points());
        out.push('\n');
    }

    for &p in path {
        let winding = &graph.portals[p].winding;
        let center = winding.center();
        out.push_str(&format!("{:.6} {:.6} {:.6} ", center.x, center.y, center.z));
        por_portal_points(&mut out, winding.points());
        out.push('\n');
    }
    out
}

fn leak_trail(
    ctx: &CompileContext,
    tree: &BspTree,
    graph: &PortalGraph,
    entity: usize,
    origin: Vec3,
    leak_node: NodeId,
    path: &[usize],
) -> LeakTrail {
    let mut waypoints = vec![origin];
    waypoints.extend(path.iter().map(|&p| graph.portals[p].winding.center()));

    if !ctx.options.old_leak {
        waypoints = simplify_waypoints(tree, &ctx.planes, &waypoints);
    }

    let mut points = Vec::new();
    for pair in waypoints.windows(2) {
        trail_segment(&mut points, pair[0], pair[1], ctx.options.leak_dist);
    }
    if let Some(&end) = waypoints.last() {
        points.push(end);
    }

    let por = ctx.options.bsp_leak.then(|| por_text(tree, graph, &origin, leak_node, path));
    LeakTrail { entity, origin, points, por }
}

/// Mark the faces bordering solid leaves as removed.
fn clear_out_faces(tree: &mut BspTree) {
    for id in tree.leaves() {
        let node = tree.node(id);
        if node.contents() != Some(Contents::Solid) {
            continue;
        }
        let markfaces = node.markfaces().to_vec();
        for index in markfaces {
            tree.faces[index].removed = true;
        }
    }
}

/// Flood the void outside the world from the outside node.
///
/// With no leak, every reachable leaf becomes SOLID and faces that only
/// border solid space are removed from the tree.
pub fn fill_outside(
    ctx: &mut CompileContext,
    tree: &mut BspTree,
    graph: &PortalGraph,
    map: &MapData,
    hull: usize,
) -> Result<FillOutcome> {
    info!("FillOutside");

    if !place_occupants(tree, &ctx.planes, map) {
        ctx.warn(Warning::NoFilling { hull });
        return Ok(FillOutcome::NoOccupants);
    }

    let flood = flood_from_outside(tree, graph);

    if let Some((leak_node, entity, path)) = flood.leak {
        let origin = map
            .entities
            .get(entity)
            .and_then(|e| e.origin)
            .ok_or_else(|| CompileError::invariant("fill outside", format!("entity {} has no origin", entity)))?;

        let trail = (hull == 0).then(|| leak_trail(ctx, tree, graph, entity, origin, leak_node, &path));
        let trail_points = trail.as_ref().map_or(0, |t| t.points.len());
        ctx.warn(Warning::Leak { hull, entity, origin, trail_points });
        return Ok(FillOutcome::Leaked { entity, trail });
    }

    let mut outleafs = 0;
    for node in flood.visited {
        for leaf in subtree_leaves(tree, node) {
            let leaf = tree.node_mut(leaf);
            if leaf.contents() != Some(Contents::Solid) {
                leaf.set_contents(Contents::Solid);
                outleafs += 1;
            }
        }
    }
    debug!("filled {} leaves from outside", outleafs);

    clear_out_faces(tree);

    info!("{:4} outleafs", outleafs);
    Ok(FillOutcome::Filled { outleafs })
}
