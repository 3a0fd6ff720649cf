//! Flatten finished trees into the arrays of the output BSP.

use std::collections::HashMap;

use cgmath::InnerSpace;
use log::info;

use crate::bounds::Bounds;
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::game::{Contents, GameRules};
use crate::map::TexFlags;
use crate::math::{snap_to_integer, PlaneType, Vec3, POINT_EPSILON, SIDESPACE};
use crate::plane::{PlaneRegistry, PlaneSide};
use crate::tree::{BspTree, NodeFace, NodeId, NodeKind};
use crate::winding::MAXEDGES;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DPlane {
    pub normal: Vec3,
    pub dist: f64,
    pub plane_type: PlaneType,
}

/// A draw node. Children are node indices, or `-(leaf + 1)` for leaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DNode {
    pub planenum: usize,
    pub children: [i32; 2],
    pub bounds: Bounds,
    pub first_face: usize,
    pub num_faces: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DLeaf {
    /// Game native content value.
    pub contents: i32,
    pub bounds: Bounds,
    pub first_marksurface: usize,
    pub num_marksurfaces: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DFace {
    pub planenum: usize,
    pub side: PlaneSide,
    pub first_edge: usize,
    pub num_edges: usize,
    pub texinfo: usize,
}

/// A collision node. Children are clip node indices, or native contents
/// (always negative) for leaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DClipNode {
    pub planenum: usize,
    pub children: [i32; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct DModel {
    pub bounds: Bounds,
    /// Head node per hull. Hull 0 indexes `nodes`, the others `clipnodes`.
    pub headnode: Vec<i32>,
    pub visleafs: usize,
    pub first_face: usize,
    pub num_faces: usize,
}

/// The in-memory output of a compile, ready for serialisation.
#[derive(Clone, Debug, PartialEq)]
pub struct BspData {
    pub planes: Vec<DPlane>,
    pub nodes: Vec<DNode>,
    pub leafs: Vec<DLeaf>,
    pub faces: Vec<DFace>,
    pub marksurfaces: Vec<usize>,
    /// Vertex pairs. Edge 0 is unused because it can't be negated.
    pub edges: Vec<[u32; 2]>,
    /// Edge references, negative when the edge is walked backwards.
    pub surfedges: Vec<i32>,
    pub vertices: Vec<Vec3>,
    pub clipnodes: Vec<DClipNode>,
    pub models: Vec<DModel>,
}

impl BspData {
    pub fn new(game: &dyn GameRules) -> BspData {
        // leaf 0 is the shared solid leaf
        let solid = DLeaf {
            contents: game.native_contents(Contents::Solid),
            bounds: Bounds::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)),
            first_marksurface: 0,
            num_marksurfaces: 0,
        };
        BspData {
            planes: Vec::new(),
            nodes: Vec::new(),
            leafs: vec![solid],
            faces: Vec::new(),
            marksurfaces: Vec::new(),
            edges: vec![[0, 0]],
            surfedges: Vec::new(),
            vertices: Vec::new(),
            clipnodes: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Start a model with every head node unset.
    pub fn add_model(&mut self, hulls: usize) -> usize {
        self.models.push(DModel {
            bounds: Bounds::empty(),
            headnode: vec![0; hulls],
            visleafs: 0,
            first_face: 0,
            num_faces: 0,
        });
        self.models.len() - 1
    }

    fn find_or_add_plane(&mut self, plane: DPlane) -> usize {
        let existing = self.planes.iter().position(|p| {
            p.normal.dot(plane.normal) > 1.0 - 0.00001
                && (p.dist - plane.dist).abs() < 0.01
                && p.plane_type == plane.plane_type
        });
        existing.unwrap_or_else(|| {
            self.planes.push(plane);
            self.planes.len() - 1
        })
    }
}

/// Output plane of every registered plane used by a tree.
pub type PlaneMap = HashMap<usize, usize>;

/// Add the planes of a tree's decision nodes to the output, reusing
/// equivalent planes already written.
pub fn export_node_planes(bsp: &mut BspData, tree: &BspTree, planes: &PlaneRegistry) -> PlaneMap {
    let mut map = PlaneMap::new();
    for id in tree.decision_nodes() {
        let Some(planenum) = tree.node(id).planenum() else {
            continue;
        };
        map.entry(planenum).or_insert_with(|| {
            let plane = planes.get(planenum);
            bsp.find_or_add_plane(DPlane {
                normal: plane.normal,
                dist: plane.dist,
                plane_type: plane.plane_type,
            })
        });
    }
    map
}

fn output_plane(map: &PlaneMap, planenum: usize) -> Result<usize> {
    map.get(&planenum)
        .copied()
        .ok_or_else(|| CompileError::invariant("export", format!("plane {} was not exported", planenum)))
}

fn to_i32(value: usize, what: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| CompileError::limit(what, value, i32::MAX as usize))
}

/// Faces written for one model.
#[derive(Clone, Debug, Default)]
pub struct FaceExport {
    pub first_face: usize,
    /// Output face of every tree face, `None` for faces not drawn.
    pub output: Vec<Option<usize>>,
    /// First face and face count per tree node.
    node_ranges: HashMap<NodeId, (usize, usize)>,
}

#[derive(Clone, Copy, Debug)]
struct EdgeOwner {
    contents: Contents,
    shared: bool,
}

/// Vertex and edge sharing within one model.
struct EdgeBuilder<'a> {
    bsp: &'a mut BspData,
    vertex_hash: HashMap<[i64; 3], Vec<u32>>,
    first_edge: usize,
    owners: Vec<EdgeOwner>,
    /// Edges by their (first, second) vertex.
    by_vertices: HashMap<(u32, u32), Vec<usize>>,
}

impl<'a> EdgeBuilder<'a> {
    fn new(bsp: &'a mut BspData) -> EdgeBuilder<'a> {
        let first_edge = bsp.edges.len();
        EdgeBuilder {
            bsp,
            vertex_hash: HashMap::new(),
            first_edge,
            owners: Vec::new(),
            by_vertices: HashMap::new(),
        }
    }

    fn get_vertex(&mut self, point: &Vec3) -> Result<u32> {
        let vert = Vec3::new(snap_to_integer(point.x), snap_to_integer(point.y), snap_to_integer(point.z));
        let key = [vert.x.round() as i64, vert.y.round() as i64, vert.z.round() as i64];

        let bucket = self.vertex_hash.entry(key).or_default();
        for &index in bucket.iter() {
            let existing = self.bsp.vertices[index as usize];
            if (0..3).all(|i| (existing[i] - vert[i]).abs() < POINT_EPSILON) {
                return Ok(index);
            }
        }

        let index = u32::try_from(self.bsp.vertices.len())
            .map_err(|_| CompileError::limit("vertices", self.bsp.vertices.len(), u32::MAX as usize))?;
        self.bsp.vertices.push(vert);
        bucket.push(index);
        Ok(index)
    }

    /// Reuse an edge running the other way when its second face slot is
    /// free and the faces see the same contents. Four way edges are never made.
    fn get_edge(&mut self, p1: &Vec3, p2: &Vec3, contents: Contents) -> Result<i32> {
        let v1 = self.get_vertex(p1)?;
        let v2 = self.get_vertex(p2)?;

        if let Some(candidates) = self.by_vertices.get(&(v2, v1)) {
            for &local in candidates {
                let owner = &mut self.owners[local];
                if !owner.shared && owner.contents == contents {
                    owner.shared = true;
                    return Ok(-to_i32(self.first_edge + local, "edges")?);
                }
            }
        }

        let local = self.owners.len();
        self.owners.push(EdgeOwner { contents, shared: false });
        self.by_vertices.entry((v1, v2)).or_default().push(local);
        self.bsp.edges.push([v1, v2]);
        to_i32(self.first_edge + local, "edges")
    }

    fn emit_face(&mut self, node_face: &NodeFace, planenum: usize) -> Result<usize> {
        let face = &node_face.face;
        let points = face.winding.points();
        if points.len() > MAXEDGES {
            return Err(CompileError::limit("face edges", points.len(), MAXEDGES));
        }

        let first_edge = self.bsp.surfedges.len();
        for i in 0..points.len() {
            let edge = self.get_edge(&points[i], &points[(i + 1) % points.len()], face.contents[0])?;
            self.bsp.surfedges.push(edge);
        }

        self.bsp.faces.push(DFace {
            planenum,
            side: face.planeside,
            first_edge,
            num_edges: points.len(),
            texinfo: face.texinfo,
        });
        Ok(self.bsp.faces.len() - 1)
    }
}

/// Give every drawn face of a tree its edges and write the output faces,
/// node by node.
pub fn make_face_edges(
    ctx: &CompileContext,
    bsp: &mut BspData,
    tree: &BspTree,
    plane_map: &PlaneMap,
) -> Result<FaceExport> {
    info!("MakeFaceEdges");

    let mut export = FaceExport {
        first_face: bsp.faces.len(),
        output: vec![None; tree.faces.len()],
        node_ranges: HashMap::new(),
    };
    let mut builder = EdgeBuilder::new(bsp);

    for id in tree.decision_nodes() {
        let NodeKind::Decision { planenum, faces, .. } = &tree.node(id).kind else {
            continue;
        };
        let out_plane = output_plane(plane_map, *planenum)?;
        let first = builder.bsp.faces.len();
        for &index in faces {
            let node_face = &tree.faces[index];
            let flags = ctx.texinfo(node_face.face.texinfo).map_or(TexFlags::empty(), |t| t.flags);
            if node_face.removed || flags.intersects(TexFlags::SKIP | TexFlags::HINT) {
                continue;
            }
            export.output[index] = Some(builder.emit_face(node_face, out_plane)?);
        }
        export.node_ranges.insert(id, (first, builder.bsp.faces.len() - first));
    }

    info!("{:8} vertexes", builder.bsp.vertices.len());
    info!("{:8} edges", builder.bsp.edges.len() - builder.first_edge);
    Ok(export)
}

struct DrawExporter<'a> {
    game: &'static dyn GameRules,
    bsp: &'a mut BspData,
    tree: &'a BspTree,
    plane_map: &'a PlaneMap,
    faces: &'a FaceExport,
    leafs: usize,
}

impl<'a> DrawExporter<'a> {
    fn export_leaf(&mut self, id: NodeId) -> Result<i32> {
        let tree = self.tree;
        let node = tree.node(id);
        let contents = node.contents().unwrap_or(Contents::Solid);
        let first_marksurface = self.bsp.marksurfaces.len();
        for &index in node.markfaces() {
            if let Some(Some(face)) = self.faces.output.get(index) {
                self.bsp.marksurfaces.push(*face);
            }
        }
        self.bsp.leafs.push(DLeaf {
            contents: self.game.native_contents(contents),
            bounds: node.bounds,
            first_marksurface,
            num_marksurfaces: self.bsp.marksurfaces.len() - first_marksurface,
        });
        self.leafs += 1;
        Ok(-to_i32(self.bsp.leafs.len(), "leafs")?)
    }

    fn child_ref(&mut self, id: NodeId) -> Result<i32> {
        match self.tree.node(id).contents() {
            // every solid leaf shares leaf 0
            Some(Contents::Solid) => Ok(-1),
            Some(_) => self.export_leaf(id),
            None => self.export_node(id),
        }
    }

    fn export_node(&mut self, id: NodeId) -> Result<i32> {
        let tree = self.tree;
        let node = tree.node(id);
        let NodeKind::Decision { planenum, children, .. } = &node.kind else {
            return self.child_ref(id);
        };
        let (first_face, num_faces) = self.faces.node_ranges.get(&id).copied().unwrap_or((0, 0));
        let index = self.bsp.nodes.len();
        self.bsp.nodes.push(DNode {
            planenum: output_plane(self.plane_map, *planenum)?,
            children: [0, 0],
            bounds: node.bounds,
            first_face,
            num_faces,
        });
        let front = self.child_ref(children[0])?;
        let back = self.child_ref(children[1])?;
        self.bsp.nodes[index].children = [front, back];
        to_i32(index, "nodes")
    }
}

/// Write the draw nodes, leaves and mark surfaces of a hull 0 tree and fill
/// in the model.
pub fn export_draw_nodes(
    ctx: &CompileContext,
    bsp: &mut BspData,
    tree: &BspTree,
    model: usize,
    plane_map: &PlaneMap,
    faces: &FaceExport,
) -> Result<()> {
    let mut exporter = DrawExporter { game: ctx.game, bsp, tree, plane_map, faces, leafs: 0 };
    let head = exporter.export_node(tree.head)?;
    let visleafs = exporter.leafs;

    let num_faces = bsp.faces.len() - faces.first_face;
    let bounds = tree.node(tree.head).bounds.expand_by(-SIDESPACE);
    let out = bsp
        .models
        .get_mut(model)
        .ok_or_else(|| CompileError::invariant("export draw nodes", format!("no model {}", model)))?;
    out.headnode[0] = head;
    out.first_face = faces.first_face;
    out.num_faces = num_faces;
    out.visleafs = visleafs;
    out.bounds = bounds;
    Ok(())
}

fn export_clip_node(
    ctx: &CompileContext,
    bsp: &mut BspData,
    tree: &BspTree,
    plane_map: &PlaneMap,
    id: NodeId,
) -> Result<i32> {
    let node = tree.node(id);
    let NodeKind::Decision { planenum, children, .. } = &node.kind else {
        return Ok(ctx.game.native_contents(node.contents().unwrap_or(Contents::Solid)));
    };

    let index = bsp.clipnodes.len();
    if let Some(limit) = ctx.game.max_clipnodes() {
        if index >= limit {
            return Err(CompileError::limit("clipnodes", index + 1, limit));
        }
    }
    bsp.clipnodes.push(DClipNode { planenum: output_plane(plane_map, *planenum)?, children: [0, 0] });
    let front = export_clip_node(ctx, bsp, tree, plane_map, children[0])?;
    let back = export_clip_node(ctx, bsp, tree, plane_map, children[1])?;
    bsp.clipnodes[index].children = [front, back];
    to_i32(index, "clipnodes")
}

/// Write a clip hull tree and record its head in the model.
pub fn export_clip_nodes(
    ctx: &CompileContext,
    bsp: &mut BspData,
    tree: &BspTree,
    model: usize,
    hull: usize,
    plane_map: &PlaneMap,
) -> Result<()> {
    let head = export_clip_node(ctx, bsp, tree, plane_map, tree.head)?;
    let out = bsp
        .models
        .get_mut(model)
        .ok_or_else(|| CompileError::invariant("export clip nodes", format!("no model {}", model)))?;
    let slot = out
        .headnode
        .get_mut(hull)
        .ok_or_else(|| CompileError::invariant("export clip nodes", format!("no hull {}", hull)))?;
    *slot = head;
    Ok(())
}
