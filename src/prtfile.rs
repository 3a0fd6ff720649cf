//! Text portal file for the vis stage.
//!
//! `PRT1` lists visleaf numbers on each portal. When detail separators
//! grouped leaves into clusters, `PRT2` lists cluster numbers instead and
//! appends the leaves of every cluster.

use cgmath::InnerSpace;

use crate::error::{CompileError, Result};
use crate::game::Contents;
use crate::math::{ANGLE_EPSILON, ZERO_EPSILON};
use crate::plane::PlaneRegistry;
use crate::portals::{Portal, PortalGraph};
use crate::tree::{BspTree, NodeId, NodeKind};

fn write_float(out: &mut String, v: f64) {
    let rounded = v.round();
    if (v - rounded).abs() < ZERO_EPSILON {
        out.push_str(&format!("{} ", rounded as i64));
    } else {
        out.push_str(&format!("{:.6} ", v));
    }
}

fn write_portal(out: &mut String, portal: &Portal, front: usize, back: usize, planes: &PlaneRegistry) {
    let winding = &portal.winding;

    // planes near the changeover between axes can come out turned around,
    // so read the plane the way vis will and swap the leaf order to match
    let plane = planes.get(portal.planenum);
    let (first, second) = if plane.normal.dot(winding.plane().normal) < 1.0 - ANGLE_EPSILON {
        (back, front)
    } else {
        (front, back)
    };

    out.push_str(&format!("{} {} {} ", winding.len(), first, second));
    for point in winding.points() {
        out.push('(');
        write_float(out, point.x);
        write_float(out, point.y);
        write_float(out, point.z);
        out.push_str(") ");
    }
    out.push('\n');
}

fn write_portals(
    out: &mut String,
    tree: &BspTree,
    graph: &PortalGraph,
    planes: &PlaneRegistry,
    node: NodeId,
    clusters: bool,
) -> Result<()> {
    let number = |id: NodeId| {
        let value = if clusters { graph.cluster(id) } else { graph.visleaf(id) };
        value.ok_or_else(|| CompileError::invariant("write portals", format!("node {} has no vis number", id)))
    };

    match &tree.node(node).kind {
        NodeKind::Decision { children, detail_separator: false, .. } => {
            for &child in children {
                write_portals(out, tree, graph, planes, child, clusters)?;
            }
            return Ok(());
        }
        NodeKind::Leaf { contents: Contents::Solid, .. } => return Ok(()),
        _ => {}
    }

    for &p in graph.node_portals(node) {
        let portal = &graph.portals[p];
        // written once, from the front node
        if portal.nodes[0] != node || !graph.portal_thru(tree, portal) {
            continue;
        }
        write_portal(out, portal, number(portal.nodes[0])?, number(portal.nodes[1])?, planes);
    }
    Ok(())
}

/// Append the visleafs of each cluster, one cluster per line ending in `-1`.
fn write_clusters(out: &mut String, tree: &BspTree, graph: &PortalGraph, current: &mut usize) -> Result<()> {
    for id in tree.leaves() {
        let (Some(visleaf), Some(cluster)) = (graph.visleaf(id), graph.cluster(id)) else {
            continue;
        };
        // the next cluster starts a new line
        if cluster != *current {
            out.push_str("-1\n");
            *current += 1;
        }
        if cluster != *current {
            return Err(CompileError::invariant("write clusters", "detail cluster mismatch"));
        }
        out.push_str(&format!("{} ", visleaf));
    }
    Ok(())
}

/// Render the portal file of a portalized tree.
pub fn portal_file(tree: &BspTree, graph: &PortalGraph, planes: &PlaneRegistry) -> Result<String> {
    let mut out = String::new();

    if !graph.has_detail_clusters() {
        out.push_str("PRT1\n");
        out.push_str(&format!("{}\n", graph.num_visleafs));
        out.push_str(&format!("{}\n", graph.num_visportals));
        write_portals(&mut out, tree, graph, planes, tree.head, false)?;
        return Ok(out);
    }

    out.push_str("PRT2\n");
    out.push_str(&format!("{}\n", graph.num_visleafs));
    out.push_str(&format!("{}\n", graph.num_clusters));
    out.push_str(&format!("{}\n", graph.num_visportals));
    write_portals(&mut out, tree, graph, planes, tree.head, true)?;

    let mut current = 0;
    write_clusters(&mut out, tree, graph, &mut current)?;
    if graph.num_clusters > 0 && current != graph.num_clusters - 1 {
        return Err(CompileError::invariant("write clusters", "detail cluster mismatch"));
    }
    out.push_str("-1\n");
    Ok(out)
}
