//! Turns map brushes into groups of faces, expanding them for the clip hulls.

use cgmath::InnerSpace;
use log::{debug, info};

use crate::bounds::Bounds;
use crate::context::CompileContext;
use crate::error::{BrushLocation, CompileError, Result, Warning};
use crate::face::{check_face, Face};
use crate::game::{ContentFlags, Contents, HullSize};
use crate::map::{MapBrush, MapData, MapEntity, MapFace};
use crate::math::{
    points_are_same, snap_point, Plane, Vec3, ANGLE_EPSILON, BASE_WINDING_RADIUS, NORMAL_EPSILON, ON_EPSILON,
};
use crate::winding::{Winding, MAXEDGES};

/// Bevelled clip hull brushes can grow many extra faces.
pub const MAX_FACES: usize = 128;
const MAX_HULL_POINTS: usize = 512;
const MAX_HULL_EDGES: usize = 1024;

/// A map brush converted to faces for one hull.
#[derive(Clone, Debug, PartialEq)]
pub struct Brush {
    pub faces: Vec<Face>,
    pub contents: Contents,
    pub cflags: ContentFlags,
    pub bounds: Bounds,
    pub location: BrushLocation,
}

/// Every brush an entity contributes to one hull, in CSG order.
#[derive(Clone, Debug, Default)]
pub struct EntityBrushes {
    pub brushes: Vec<Brush>,
    /// Bounds of every brush, clip brushes in hull 0 included.
    pub bounds: Bounds,
    pub detail_count: usize,
}

/// Working state for expanding one brush by a hull box.
struct HullBrush {
    faces: Vec<MapFace>,
    points: Vec<Vec3>,
    corners: Vec<[Vec3; 8]>,
    edges: Vec<(usize, usize)>,
    location: BrushLocation,
}

impl HullBrush {
    fn new(faces: Vec<MapFace>, location: BrushLocation) -> HullBrush {
        HullBrush { faces, points: Vec::new(), corners: Vec::new(), edges: Vec::new(), location }
    }

    fn add_brush_plane(&mut self, plane: &Plane) -> Result<()> {
        let length = plane.normal.magnitude();
        if length < 1.0 - NORMAL_EPSILON || length > 1.0 + NORMAL_EPSILON {
            return Err(CompileError::invariant(
                "add brush plane",
                format!("invalid normal (vector length {:.4}) at {}", length, self.location),
            ));
        }

        let exists = self.faces.iter().any(|face| {
            points_are_same(&face.plane.normal, &plane.normal) && (face.plane.dist - plane.dist).abs() < ON_EPSILON
        });
        if exists {
            return Ok(());
        }
        if self.faces.len() == MAX_FACES {
            return Err(CompileError::limit("brush faces", MAX_FACES + 1, MAX_FACES));
        }

        self.faces.push(MapFace { plane: *plane, texinfo: 0, line: self.location.line });
        Ok(())
    }

    /// Add the plane if every expanded corner is on one side of it, facing
    /// away from the corners.
    fn test_add_plane(&mut self, plane: &Plane) -> Result<()> {
        if self.faces.iter().any(|face| face.plane.is_equal(plane) || face.plane.is_inverse(plane)) {
            return Ok(());
        }

        let mut points_front = false;
        let mut points_back = false;
        for corner in self.corners.iter().flatten() {
            let d = plane.distance_to(corner);
            if d < -ON_EPSILON {
                if points_front {
                    return Ok(());
                }
                points_back = true;
            } else if d > ON_EPSILON {
                if points_back {
                    return Ok(());
                }
                points_front = true;
            }
        }

        // the plane is a separator
        if points_front {
            self.add_brush_plane(&plane.flipped())
        } else {
            self.add_brush_plane(plane)
        }
    }

    /// Index of the point, adding it with its eight hull corners if new.
    fn add_hull_point(&mut self, point: &Vec3, hull: &HullSize) -> Result<usize> {
        if let Some(index) = self.points.iter().position(|p| points_are_same(p, point)) {
            return Ok(index);
        }
        if self.points.len() == MAX_HULL_POINTS {
            return Err(CompileError::limit("hull brush points", MAX_HULL_POINTS + 1, MAX_HULL_POINTS));
        }

        let size = [hull.mins, hull.maxs];
        let mut corners = [Vec3::new(0.0, 0.0, 0.0); 8];
        let mut c = 0;
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    corners[c] = Vec3::new(point.x + size[x][0], point.y + size[y][1], point.z + size[z][2]);
                    c += 1;
                }
            }
        }

        self.points.push(*point);
        self.corners.push(corners);
        Ok(self.points.len() - 1)
    }

    /// Create the bevel planes around an edge, once per edge.
    fn add_hull_edge(&mut self, p1: &Vec3, p2: &Vec3, hull: &HullSize) -> Result<()> {
        let pt1 = self.add_hull_point(p1, hull)?;
        let pt2 = self.add_hull_point(p2, hull)?;

        if self.edges.iter().any(|&(a, b)| (a == pt1 && b == pt2) || (a == pt2 && b == pt1)) {
            return Ok(());
        }
        if self.edges.len() == MAX_HULL_EDGES {
            return Err(CompileError::limit("hull brush edges", MAX_HULL_EDGES + 1, MAX_HULL_EDGES));
        }
        self.edges.push((pt1, pt2));

        let size = [hull.mins, hull.maxs];
        let edge = (p1 - p2).normalize();

        for a in 0..3 {
            let b = (a + 1) % 3;
            let c = (a + 2) % 3;

            let mut axis = Vec3::new(0.0, 0.0, 0.0);
            axis[a] = 1.0;
            let normal = axis.cross(edge);
            let length = normal.magnitude();

            // edge almost parallel to this axis
            if length < ANGLE_EPSILON {
                continue;
            }

            let normal = normal / length;
            for d in 0..2 {
                for e in 0..2 {
                    let mut origin = *p1;
                    origin[b] += size[d][b];
                    origin[c] += size[e][c];
                    self.test_add_plane(&Plane::new(normal, origin.dot(normal)))?;
                }
            }
        }
        Ok(())
    }

    /// Push every plane out by the hull box and bevel the corners and edges.
    fn expand(&mut self, hull: &HullSize, faces: &[Face], bounds: &Bounds) -> Result<()> {
        self.points.clear();
        self.corners.clear();
        self.edges.clear();

        for face in faces {
            for point in face.winding.points() {
                self.add_hull_point(point, hull)?;
            }
        }

        for face in self.faces.iter_mut() {
            let mut corner = Vec3::new(0.0, 0.0, 0.0);
            for x in 0..3 {
                if face.plane.normal[x] > 0.0 {
                    corner[x] = hull.maxs[x];
                } else if face.plane.normal[x] < 0.0 {
                    corner[x] = hull.mins[x];
                }
            }
            face.plane.dist += corner.dot(face.plane.normal);
        }

        // axis planes bevel off the corners
        for x in 0..3 {
            let mut normal = Vec3::new(0.0, 0.0, 0.0);
            normal[x] = -1.0;
            self.add_brush_plane(&Plane::new(normal, -bounds.mins[x] - hull.mins[x]))?;
            normal[x] = 1.0;
            self.add_brush_plane(&Plane::new(normal, bounds.maxs[x] + hull.maxs[x]))?;
        }

        for face in faces {
            for (p1, p2) in face.winding.edges() {
                self.add_hull_edge(&p1, &p2, hull)?;
            }
        }
        Ok(())
    }
}

/// Build the faces of a convex brush by clipping each side's plane by all
/// the others. Returns the faces and their bounds, plus how many sides were
/// deliberately left out.
fn create_brush_faces(
    ctx: &mut CompileContext,
    hull_brush: &HullBrush,
    hull: usize,
) -> Result<(Vec<Face>, Bounds, usize)> {
    let mut faces = Vec::with_capacity(hull_brush.faces.len());
    let mut bounds = Bounds::empty();
    let mut skipped = 0;

    for (i, mapface) in hull_brush.faces.iter().enumerate() {
        if hull == 0 {
            let hintskip = ctx
                .texinfo(mapface.texinfo)
                .map_or(false, |texinfo| texinfo.name.eq_ignore_ascii_case("hintskip"));
            if hintskip {
                skipped += 1;
                continue;
            }
        }

        let mut winding = Some(Winding::from_plane(&mapface.plane, BASE_WINDING_RADIUS));
        for (j, other) in hull_brush.faces.iter().enumerate() {
            if j == i {
                continue;
            }
            // keep the back side of every other plane
            winding = match winding {
                Some(w) => w.clip_front(&other.plane.flipped(), false)?,
                None => break,
            };
        }
        // overconstrained plane
        let Some(winding) = winding else {
            continue;
        };

        if winding.len() > MAXEDGES {
            return Err(CompileError::limit("points on brush face", winding.len(), MAXEDGES));
        }

        let mut snapped = Winding::new();
        for point in winding.points() {
            let point = snap_point(point);
            bounds.add_point(&point);
            snapped.push(point)?;
        }

        let plane_ref = ctx.planes.add_or_find_plane(&mapface.plane)?;
        let texinfo = if hull == 0 { mapface.texinfo } else { 0 };
        let mut face = Face::new(plane_ref.planenum, plane_ref.side, texinfo, snapped);
        check_face(&mut face, &ctx.planes, hull_brush.location, &mut ctx.diagnostics)?;
        faces.push(face);
    }

    Ok((faces, bounds, skipped))
}

/// Sides of a brush with repeated planes removed. Each repeat is reported.
fn unique_brush_faces(ctx: &mut CompileContext, mapbrush: &MapBrush, location: BrushLocation) -> Vec<MapFace> {
    let mut faces: Vec<MapFace> = Vec::with_capacity(mapbrush.faces.len());
    for face in &mapbrush.faces {
        if faces.iter().any(|f| f.plane.is_equal(&face.plane)) {
            ctx.warn(Warning::Brush {
                location: BrushLocation { line: face.line, ..location },
                reason: "brush with duplicate plane".to_string(),
            });
            continue;
        }
        faces.push(face.clone());
    }
    faces
}

/// Convert one map brush to a brush for `hull`. Returns `None`, with a
/// warning, when the brush has no usable faces.
pub fn load_brush(
    ctx: &mut CompileContext,
    mapbrush: &MapBrush,
    location: BrushLocation,
    hull: usize,
) -> Result<Option<(Vec<Face>, Bounds)>> {
    if mapbrush.faces.len() > MAX_FACES {
        return Err(CompileError::limit("brush faces", mapbrush.faces.len(), MAX_FACES));
    }

    let mut hull_brush = HullBrush::new(unique_brush_faces(ctx, mapbrush, location), location);
    let (mut faces, mut bounds, skipped) = create_brush_faces(ctx, &hull_brush, hull)?;
    if faces.is_empty() {
        ctx.warn(Warning::Brush { location, reason: "couldn't create brush faces".to_string() });
        return Ok(None);
    }
    if faces.len() + skipped < 4 {
        ctx.warn(Warning::Brush { location, reason: format!("degenerate brush with {} faces", faces.len()) });
        return Ok(None);
    }

    let size = ctx.game.hulls().get(hull).copied();
    if let Some(size) = size.filter(|size| !size.is_point()) {
        hull_brush.expand(&size, &faces, &bounds)?;
        (faces, bounds, _) = create_brush_faces(ctx, &hull_brush, hull)?;
        if faces.is_empty() {
            ctx.warn(Warning::Brush { location, reason: "couldn't create expanded brush faces".to_string() });
            return Ok(None);
        }
    }

    Ok(Some((faces, bounds)))
}

/// Contents of a brush, from the texture of its first side.
fn brush_contents(ctx: &CompileContext, mapbrush: &MapBrush, location: BrushLocation) -> Result<Contents> {
    let first = mapbrush
        .faces
        .first()
        .ok_or_else(|| CompileError::invariant("brush contents", format!("brush without sides at {}", location)))?;
    let texinfo = ctx.texinfo(first.texinfo).ok_or_else(|| {
        CompileError::invariant("brush contents", format!("texinfo {} out of range at {}", first.texinfo, location))
    })?;
    Ok(ctx.game.contents_for_texture(&texinfo.name))
}

struct BrushLists {
    nonsolid: Vec<Brush>,
    solid: Vec<Brush>,
    bounds: Bounds,
}

fn load_source_entity(
    ctx: &mut CompileContext,
    lists: &mut BrushLists,
    source: &MapEntity,
    source_index: usize,
    is_world: bool,
    hull: usize,
) -> Result<usize> {
    let cflags = if source.is_detail() { ContentFlags::DETAIL } else { ContentFlags::empty() };
    let mut loaded = 0;

    for (brush_index, mapbrush) in source.brushes.iter().enumerate() {
        let location = BrushLocation { entity: source_index, brush: brush_index, line: mapbrush.line };
        if mapbrush.faces.is_empty() {
            ctx.warn(Warning::Brush { location, reason: "brush without sides".to_string() });
            continue;
        }
        let mut contents = brush_contents(ctx, mapbrush, location)?;

        // clip brushes are only collision, but still count for the model bounds
        if contents == Contents::Clip {
            if hull == 0 {
                if let Some((_, bounds)) = load_brush(ctx, mapbrush, location, hull)? {
                    lists.bounds.add_bounds(&bounds);
                }
                continue;
            }
            contents = Contents::Solid;
        }

        // hint brushes don't affect the collision hulls
        if contents == Contents::Hint {
            if hull != 0 {
                continue;
            }
            contents = Contents::Empty;
        }

        // entities never use water merging
        if !is_world {
            contents = Contents::Solid;
        }

        if hull != 0 {
            match contents {
                Contents::Solid => {}
                Contents::Sky => contents = Contents::Solid,
                _ => continue,
            }
        }

        let Some((faces, bounds)) = load_brush(ctx, mapbrush, location, hull)? else {
            continue;
        };

        lists.bounds.add_bounds(&bounds);
        let brush = Brush { faces, contents, cflags, bounds, location };
        if contents == Contents::Solid {
            lists.solid.push(brush);
        } else {
            lists.nonsolid.push(brush);
        }
        loaded += 1;
    }

    Ok(loaded)
}

/// Load every brush of an entity for one hull. The world also takes the
/// brushes of `func_group` and then `func_detail` entities.
///
/// The result holds the non-solid brushes and then the solid ones, each
/// group latest first, so later brushes take precedence in CSG.
pub fn load_entity(ctx: &mut CompileContext, map: &MapData, entity_index: usize, hull: usize) -> Result<EntityBrushes> {
    let entity = map
        .entities
        .get(entity_index)
        .ok_or_else(|| CompileError::invariant("load entity", format!("no entity {}", entity_index)))?;
    let is_world = entity_index == 0;

    let mut lists = BrushLists { nonsolid: Vec::new(), solid: Vec::new(), bounds: Bounds::empty() };
    let mut total = load_source_entity(ctx, &mut lists, entity, entity_index, is_world, hull)?;
    let mut detail_count = 0;

    if is_world {
        for (index, source) in map.entities.iter().enumerate().skip(1) {
            if source.is_group() {
                total += load_source_entity(ctx, &mut lists, source, index, true, hull)?;
            }
        }
        for (index, source) in map.entities.iter().enumerate().skip(1) {
            if source.is_detail() {
                detail_count += load_source_entity(ctx, &mut lists, source, index, true, hull)?;
            }
        }
        info!("{:8} brushes", total);
        if detail_count > 0 {
            info!("{:8} detail", detail_count);
        }
    } else {
        debug!("entity {} ({}): {} brushes", entity_index, entity.classname, total);
    }

    let BrushLists { nonsolid, solid, bounds } = lists;
    let brushes = nonsolid.into_iter().rev().chain(solid.into_iter().rev()).collect();
    Ok(EntityBrushes { brushes, bounds, detail_count })
}
