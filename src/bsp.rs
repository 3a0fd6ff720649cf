//! Solid BSP construction: recursively partition the surfaces of an entity
//! into a tree of convex leaves.

use std::collections::BTreeMap;

use cgmath::InnerSpace;
use log::{info, trace};

use crate::bounds::Bounds;
use crate::context::CompileContext;
use crate::csg::{build_surfaces, Surface};
use crate::error::{CompileError, Result, Warning};
use crate::face::Face;
use crate::game::{ContentFlags, Contents};
use crate::map::TexFlags;
use crate::math::{points_are_same, Plane, Side, Vec3, ANGLE_EPSILON, ON_EPSILON, SIDESPACE, VECT_MAX};
use crate::plane::{MapPlane, PlaneSide};
use crate::tree::{BspTree, Node, NodeFace, NodeId, NodeKind};

/// Deeper than this means the partitioning is not converging.
const MAX_TREE_DEPTH: usize = 1024;

#[derive(Debug, Default)]
struct BspStats {
    split_nodes: usize,
    leaf_faces: usize,
    node_faces: usize,
    solid: usize,
    empty: usize,
    water: usize,
}

struct SolidBsp<'a> {
    ctx: &'a mut CompileContext,
    tree: BspTree,
    midsplit: bool,
    subdivide: bool,
    stats: BspStats,
}

/// Classify a face against a plane for the split heuristic.
fn face_side(face: &Face, split: &MapPlane) -> Side {
    let dist = split.normal.dot(face.sphere.origin) - split.dist;
    if dist > face.sphere.radius {
        return Side::Front;
    }
    if dist < -face.sphere.radius {
        return Side::Back;
    }

    let mut have_front = false;
    let mut have_back = false;
    for point in face.winding.points() {
        let d = split.distance_to(point);
        if d > ON_EPSILON {
            if have_back {
                return Side::On;
            }
            have_front = true;
        } else if d < -ON_EPSILON {
            if have_front {
                return Side::On;
            }
            have_back = true;
        }
    }

    match (have_front, have_back) {
        (false, _) => Side::Back,
        (true, false) => Side::Front,
        (true, true) => Side::On,
    }
}

/// Spatial quality of a split, smaller is better.
fn split_plane_metric(plane: &MapPlane, bounds: &Bounds) -> f64 {
    let size = bounds.size();
    match plane.plane_type.axis() {
        Some(axis) => {
            let dist = plane.dist * plane.normal[axis];
            let mut value = 0.0;
            for i in 0..3 {
                if i == axis {
                    value += (bounds.maxs[i] - dist) * (bounds.maxs[i] - dist);
                    value += (dist - bounds.mins[i]) * (dist - bounds.mins[i]);
                } else {
                    value += 2.0 * size[i] * size[i];
                }
            }
            value
        }
        None => {
            let (front, back) = bounds.divide(&plane.as_plane());
            let (fsize, bsize) = (front.size(), back.size());
            (0..3).map(|i| fsize[i] * fsize[i] + bsize[i] * bsize[i]).sum()
        }
    }
}

fn texflags(ctx: &CompileContext, texinfo: usize) -> TexFlags {
    ctx.texinfo(texinfo).map_or(TexFlags::empty(), |t| t.flags)
}

/// Cut a face along its texture axes until no piece is longer than
/// `subdivide` in either direction.
pub fn subdivide_face(face: Face, ctx: &CompileContext) -> Result<Vec<Face>> {
    let Some(texinfo) = ctx.texinfo(face.texinfo) else {
        return Ok(vec![face]);
    };
    // special (non-surface cached) faces don't need subdivision
    if texinfo.flags.intersects(TexFlags::SPECIAL | TexFlags::SKIP | TexFlags::HINT) {
        return Ok(vec![face]);
    }
    let subdivide = ctx.options.subdivide;
    let axes = [texinfo.axis(0), texinfo.axis(1)];

    let mut done = Vec::new();
    let mut pending = vec![face];
    while let Some(mut face) = pending.pop() {
        for axis in &axes {
            let length = axis.magnitude();
            if length < ANGLE_EPSILON {
                continue;
            }
            loop {
                let (mins, maxs) = face
                    .winding
                    .points()
                    .iter()
                    .map(|p| p.dot(*axis))
                    .fold((VECT_MAX, -VECT_MAX), |(lo, hi), v| (lo.min(v), hi.max(v)));
                if maxs - mins <= subdivide {
                    break;
                }

                // carve a valid sized piece off the low end
                let plane = Plane::new(axis / length, (mins + subdivide - 16.0) / length);
                match face.split(&plane)? {
                    (Some(front), Some(back)) => {
                        pending.push(front);
                        face = back;
                    }
                    _ => {
                        return Err(CompileError::invariant("subdivide face", "didn't split the polygon"));
                    }
                }
            }
        }
        done.push(face);
    }
    Ok(done)
}

impl<'a> SolidBsp<'a> {
    fn plane(&self, planenum: usize) -> MapPlane {
        *self.ctx.planes.get(planenum)
    }

    fn choose_mid_plane(&self, surfaces: &[Surface], bounds: &Bounds) -> Result<usize> {
        let pick = |axial_only: bool| {
            let mut best_metric = VECT_MAX;
            let mut best = None;
            for (i, surface) in surfaces.iter().enumerate() {
                if surface.onnode {
                    continue;
                }
                let plane = self.plane(surface.planenum);
                if axial_only && !plane.plane_type.is_axial() {
                    continue;
                }
                let metric = split_plane_metric(&plane, bounds);
                if metric < best_metric {
                    best_metric = metric;
                    best = Some(i);
                }
            }
            best
        };

        // axis aligned planes first, then anything on spatial subdivision only
        pick(true)
            .or_else(|| pick(false))
            .ok_or_else(|| CompileError::invariant("choose mid plane", "no valid planes in surface list"))
    }

    /// The split-minimising heuristic. Detail surfaces are only considered
    /// once no structural surface is left.
    fn choose_plane(&self, surfaces: &mut [Surface], bounds: &Bounds) -> Option<usize> {
        let mut min_splits = usize::MAX - 1;
        let mut best_distribution = VECT_MAX;
        let mut best = None;

        for pass in 0..2 {
            for (i, surface) in surfaces.iter().enumerate() {
                if surface.onnode {
                    continue;
                }

                let mut detail_test = false;
                let mut hint_split = false;
                for face in &surface.faces {
                    let detail = face.cflags[1].contains(ContentFlags::DETAIL);
                    if (pass == 1) == detail {
                        detail_test = true;
                    }
                    if texflags(self.ctx, face.texinfo).contains(TexFlags::HINT) {
                        hint_split = true;
                    }
                }
                if !detail_test {
                    continue;
                }

                let plane = self.plane(surface.planenum);
                let mut splits = 0usize;

                'count: for (j, other) in surfaces.iter().enumerate() {
                    if j == i || other.onnode {
                        continue;
                    }
                    let other_plane = self.plane(other.planenum);
                    if plane.plane_type.is_axial() && plane.plane_type == other_plane.plane_type {
                        continue;
                    }
                    for face in &other.faces {
                        let flags = texflags(self.ctx, face.texinfo);
                        // splitting skip faces costs nothing
                        if flags.contains(TexFlags::SKIP) {
                            continue;
                        }
                        if face_side(face, &plane) == Side::On {
                            // never split a hint face except with a hint
                            if !hint_split && flags.contains(TexFlags::HINT) {
                                splits = usize::MAX;
                                break 'count;
                            }
                            splits += 1;
                            if splits >= min_splits {
                                break;
                            }
                        }
                    }
                    if splits > min_splits {
                        break;
                    }
                }
                if splits > min_splits {
                    continue;
                }

                // on equal splits axial planes win, then the better distribution
                let axial = plane.plane_type.is_axial();
                if splits < min_splits || (splits == min_splits && axial) {
                    if axial {
                        let distribution = split_plane_metric(&plane, bounds);
                        if distribution > best_distribution && splits == min_splits {
                            continue;
                        }
                        best_distribution = distribution;
                    }
                    min_splits = splits;
                    best = Some(i);
                }
            }

            // a candidate on the first pass means no second pass
            if let Some(i) = best {
                surfaces[i].detail_separator = pass > 0;
                break;
            }
        }
        best
    }

    /// Pick the surface to split on, or `None` when this is a leaf.
    fn select_partition(&mut self, surfaces: &mut [Surface]) -> Result<Option<usize>> {
        let mut remaining = surfaces.iter().enumerate().filter(|(_, s)| !s.onnode);
        let Some((first, _)) = remaining.next() else {
            return Ok(None);
        };
        if remaining.next().is_none() {
            // final split
            return Ok(Some(first));
        }

        let mut bounds = Bounds::empty();
        for surface in surfaces.iter() {
            bounds.add_bounds(&surface.bounds);
        }

        if self.midsplit {
            return self.choose_mid_plane(surfaces, &bounds).map(Some);
        }
        match self.choose_plane(surfaces, &bounds) {
            Some(i) => Ok(Some(i)),
            // every choice would cut a hint face
            None => self.choose_mid_plane(surfaces, &bounds).map(Some),
        }
    }

    /// Decide the contents of a leaf and record the node faces bordering it.
    fn link_convex_faces(&mut self, surfaces: Vec<Surface>, bounds: Bounds) -> NodeId {
        let game = self.ctx.game;
        let mut contents: Option<Contents> = None;
        let mut mixed: Option<Vec3> = None;
        let mut markfaces = Vec::new();

        for surface in &surfaces {
            for face in &surface.faces {
                let face_contents = face.contents[0];
                match contents {
                    None => contents = Some(face_contents),
                    Some(current) if current != face_contents => {
                        if mixed.is_none() {
                            mixed = face.winding.points().first().copied();
                        }
                        if game.contents_priority(face_contents) > game.contents_priority(current) {
                            contents = Some(face_contents);
                        }
                    }
                    Some(_) => {}
                }
                if let Some(original) = face.original {
                    if !markfaces.contains(&original) {
                        markfaces.push(original);
                    }
                }
            }
        }

        let contents = contents.unwrap_or(Contents::Solid);
        if let Some(point) = mixed {
            self.ctx.warn(Warning::MixedContents { point, chosen: contents });
        }

        match contents {
            Contents::Empty => self.stats.empty += 1,
            Contents::Solid => self.stats.solid += 1,
            _ => self.stats.water += 1,
        }
        self.stats.leaf_faces += markfaces.len();

        self.tree.add_node(Node::leaf(bounds, contents, markfaces))
    }

    /// Subdivide the faces of the split surface and copy them onto the node.
    /// The surface's faces are pointed at their copies.
    fn link_node_faces(&mut self, surface: &mut Surface, node: NodeId) -> Result<Vec<usize>> {
        if self.subdivide {
            let faces = std::mem::take(&mut surface.faces);
            for face in faces {
                surface.faces.extend(subdivide_face(face, self.ctx)?);
            }
        }

        let mut ids = Vec::with_capacity(surface.faces.len());
        for face in surface.faces.iter_mut() {
            let id = self.tree.faces.len();
            self.tree.faces.push(NodeFace { face: face.clone(), node, removed: false });
            face.original = Some(id);
            ids.push(id);
        }
        self.stats.node_faces += ids.len();
        Ok(ids)
    }

    /// Divide one surface by the split plane into front and back parts.
    fn divide_plane(
        &self,
        mut surface: Surface,
        split_planenum: usize,
        split: &MapPlane,
    ) -> Result<(Option<Surface>, Option<Surface>)> {
        let in_plane = self.plane(surface.planenum);

        // parallel case is easy
        if points_are_same(&in_plane.normal, &split.normal) {
            // exactly on the node
            if surface.planenum == split_planenum {
                surface.onnode = true;
                let (front_faces, back_faces): (Vec<Face>, Vec<Face>) = std::mem::take(&mut surface.faces)
                    .into_iter()
                    .partition(|face| face.planeside == PlaneSide::Front);

                let mut back = surface.clone();
                back.faces = back_faces;
                surface.faces = front_faces;

                let front = Some(surface).filter(|s| !s.faces.is_empty());
                let back = Some(back).filter(|s| !s.faces.is_empty());
                return Ok((front, back));
            }

            if in_plane.dist > split.dist {
                return Ok((Some(surface), None));
            }
            return Ok((None, Some(surface)));
        }

        // do a real split, may still end up entirely on one side
        let plane = split.as_plane();
        let mut front_faces = Vec::new();
        let mut back_faces = Vec::new();
        for face in std::mem::take(&mut surface.faces) {
            let (front, back) = face.split(&plane)?;
            front_faces.extend(front);
            back_faces.extend(back);
        }

        if front_faces.is_empty() {
            surface.faces = back_faces;
            return Ok((None, Some(surface)));
        }
        if back_faces.is_empty() {
            surface.faces = front_faces;
            return Ok((Some(surface), None));
        }

        let mut back = surface.clone();
        back.faces = back_faces;
        back.calc_info()?;
        surface.faces = front_faces;
        surface.calc_info()?;
        Ok((Some(surface), Some(back)))
    }

    fn partition_surfaces(&mut self, mut surfaces: Vec<Surface>, bounds: Bounds, depth: usize) -> Result<NodeId> {
        if depth > MAX_TREE_DEPTH {
            return Err(CompileError::invariant(
                "partition surfaces",
                format!("tree deeper than {} nodes, near {:?}", MAX_TREE_DEPTH, bounds.center()),
            ));
        }

        let Some(split_index) = self.select_partition(&mut surfaces)? else {
            return Ok(self.link_convex_faces(surfaces, bounds));
        };

        self.stats.split_nodes += 1;

        let split_planenum = surfaces[split_index].planenum;
        let detail_separator = surfaces[split_index].detail_separator;
        let split = self.plane(split_planenum);
        trace!("split node {} on plane {}", self.stats.split_nodes, split_planenum);

        // reserve the node so the node faces can point at it
        let node = self.tree.add_node(Node::leaf(bounds, Contents::Solid, Vec::new()));
        let faces = self.link_node_faces(&mut surfaces[split_index], node)?;

        let (front_bounds, back_bounds) = bounds.divide(&split.as_plane());

        let mut front_list = Vec::new();
        let mut back_list = Vec::new();
        for surface in surfaces {
            let (front, back) = self.divide_plane(surface, split_planenum, &split)?;
            front_list.extend(front);
            back_list.extend(back);
        }

        let front = self.partition_surfaces(front_list, front_bounds, depth + 1)?;
        let back = self.partition_surfaces(back_list, back_bounds, depth + 1)?;

        self.tree.node_mut(node).kind = NodeKind::Decision {
            planenum: split_planenum,
            children: [front, back],
            faces,
            detail_separator,
        };
        Ok(node)
    }
}

/// Build the BSP tree of one entity's surfaces.
///
/// `midsplit` picks splits by spatial subdivision only, which is fast and
/// good enough for clip hulls and for trees that will be rebuilt.
pub fn solid_bsp(
    ctx: &mut CompileContext,
    entity_bounds: &Bounds,
    surfaces: Vec<Surface>,
    midsplit: bool,
    hull: usize,
) -> Result<BspTree> {
    let head_bounds = entity_bounds.expand_by(SIDESPACE);

    if surfaces.is_empty() {
        // an entity with no visible brushes still needs a simple empty hull
        let plane = ctx.planes.add_or_find_plane(&Plane::new(Vec3::unit_z(), 0.0))?;
        let (front_bounds, back_bounds) = head_bounds.divide(&ctx.planes.get(plane.planenum).as_plane());
        let mut tree = BspTree::new();
        let head = tree.add_node(Node::leaf(head_bounds, Contents::Solid, Vec::new()));
        let front = tree.add_node(Node::leaf(front_bounds, Contents::Empty, Vec::new()));
        let back = tree.add_node(Node::leaf(back_bounds, Contents::Empty, Vec::new()));
        tree.node_mut(head).kind = NodeKind::Decision {
            planenum: plane.planenum,
            children: [front, back],
            faces: Vec::new(),
            detail_separator: false,
        };
        tree.head = head;
        return Ok(tree);
    }

    info!("SolidBSP");

    let mut builder = SolidBsp {
        ctx,
        tree: BspTree::new(),
        midsplit,
        subdivide: hull == 0,
        stats: BspStats::default(),
    };
    let head = builder.partition_surfaces(surfaces, head_bounds, 0)?;
    builder.tree.head = head;

    let stats = &builder.stats;
    info!("{:8} split nodes", stats.split_nodes);
    info!("{:8} solid leafs", stats.solid);
    info!("{:8} empty leafs", stats.empty);
    info!("{:8} water leafs", stats.water);
    info!("{:8} leaffaces", stats.leaf_faces);
    info!("{:8} nodefaces", stats.node_faces);

    Ok(builder.tree)
}

/// Collect the faces left on the decision nodes after the outside fill,
/// ready for a second partition.
pub fn gather_node_faces(tree: &BspTree) -> Result<Vec<Surface>> {
    let mut plane_faces: BTreeMap<usize, Vec<Face>> = BTreeMap::new();
    for id in tree.decision_nodes() {
        if let NodeKind::Decision { faces, .. } = &tree.node(id).kind {
            for &index in faces {
                let node_face = &tree.faces[index];
                if node_face.removed {
                    continue;
                }
                let mut face = node_face.face.clone();
                face.original = None;
                plane_faces.entry(face.planenum).or_default().push(face);
            }
        }
    }
    build_surfaces(plane_faces)
}
