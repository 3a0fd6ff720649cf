//! Python bindings: build a map from plain tuples and compile it.

use std::collections::HashSet;
use std::path::PathBuf;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::compile::{compile, CompileOutput};
use crate::context::CompileOptions;
use crate::game::GameId;
use crate::map::{MapBrush, MapData, MapEntity, MapFace, TexFlags, TexInfo};
use crate::math::{Plane, Vec3};

#[pyclass]
#[derive(Clone)]
struct Texture {
    name: String,
    vecs: [[f64; 4]; 2],
    flags: HashSet<String>,
}

#[pymethods]
impl Texture {
    #[new]
    #[pyo3(signature = (name, vecs=None, flags=HashSet::new()))]
    fn new(name: String, vecs: Option<[[f64; 4]; 2]>, flags: HashSet<String>) -> Self {
        let vecs = vecs.unwrap_or([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]);
        Texture { name, vecs, flags }
    }

    /// Project along the world axis pair closest to `normal`.
    #[staticmethod]
    #[pyo3(signature = (
        name, normal, shift=(0.0, 0.0), rotate=0.0, scale=(1.0, 1.0), flags=HashSet::new(), oldaxis=false
    ))]
    fn quaked(
        name: String,
        normal: (f64, f64, f64),
        shift: (f64, f64),
        rotate: f64,
        scale: (f64, f64),
        flags: HashSet<String>,
        oldaxis: bool,
    ) -> Self {
        let (x, y, z) = normal;
        let tex_flags = TexFlags::from_names(flags.iter().map(String::as_str));
        let info = TexInfo::quaked(
            name.clone(),
            Vec3::new(x, y, z),
            [shift.0, shift.1],
            rotate,
            [scale.0, scale.1],
            tex_flags,
            oldaxis,
        );
        Texture { name, vecs: info.vecs, flags }
    }
}

impl From<&Texture> for TexInfo {
    fn from(texture: &Texture) -> Self {
        let flags = TexFlags::from_names(texture.flags.iter().map(String::as_str));
        TexInfo::new(texture.name.clone(), texture.vecs, flags)
    }
}

/// A brush side given by its outward normal and distance.
#[pyclass]
#[derive(Clone)]
struct Face {
    normal: (f64, f64, f64),
    dist: f64,
    texture: usize,
}

#[pymethods]
impl Face {
    #[new]
    fn new(normal: (f64, f64, f64), dist: f64, texture: usize) -> Self {
        Face { normal, dist, texture }
    }
}

#[pyclass]
#[derive(Clone)]
struct Brush {
    faces: Vec<Face>,
}

#[pymethods]
impl Brush {
    #[new]
    fn new(faces: Vec<PyRef<Face>>) -> Self {
        Brush { faces: faces.iter().map(|face| (**face).clone()).collect() }
    }

    /// An axis aligned box with every side using `texture`.
    #[staticmethod]
    fn from_box(mins: (f64, f64, f64), maxs: (f64, f64, f64), texture: usize) -> Self {
        let (x0, y0, z0) = mins;
        let (x1, y1, z1) = maxs;
        let faces = vec![
            Face::new((1.0, 0.0, 0.0), x1, texture),
            Face::new((-1.0, 0.0, 0.0), -x0, texture),
            Face::new((0.0, 1.0, 0.0), y1, texture),
            Face::new((0.0, -1.0, 0.0), -y0, texture),
            Face::new((0.0, 0.0, 1.0), z1, texture),
            Face::new((0.0, 0.0, -1.0), -z0, texture),
        ];
        Brush { faces }
    }
}

impl Brush {
    fn to_map_brush(&self, line: usize) -> MapBrush {
        let faces = self
            .faces
            .iter()
            .map(|face| {
                let (x, y, z) = face.normal;
                MapFace { plane: Plane::new(Vec3::new(x, y, z), face.dist), texinfo: face.texture, line }
            })
            .collect();
        MapBrush::new(faces, line)
    }
}

#[pyclass]
#[derive(Clone)]
struct Entity {
    classname: String,
    origin: Option<(f64, f64, f64)>,
    brushes: Vec<Brush>,
}

#[pymethods]
impl Entity {
    #[new]
    #[pyo3(signature = (classname, origin=None, brushes=Vec::new()))]
    fn new(classname: String, origin: Option<(f64, f64, f64)>, brushes: Vec<PyRef<Brush>>) -> Self {
        let brushes = brushes.iter().map(|brush| (**brush).clone()).collect();
        Entity { classname, origin, brushes }
    }
}

impl Entity {
    /// Brushes are numbered across the whole map in place of source lines.
    fn to_map_entity(&self, next_line: &mut usize) -> MapEntity {
        let mut entity = MapEntity::new(self.classname.clone());
        if let Some((x, y, z)) = self.origin {
            entity = entity.with_origin(Vec3::new(x, y, z));
        }
        let brushes = self
            .brushes
            .iter()
            .map(|brush| {
                *next_line += 1;
                brush.to_map_brush(*next_line)
            })
            .collect();
        entity.with_brushes(brushes)
    }
}

#[pyclass]
struct Model {
    #[pyo3(get)]
    pub mins: (f64, f64, f64),
    #[pyo3(get)]
    pub maxs: (f64, f64, f64),
    #[pyo3(get)]
    pub headnode: Vec<i32>,
    #[pyo3(get)]
    pub visleafs: usize,
    #[pyo3(get)]
    pub first_face: usize,
    #[pyo3(get)]
    pub num_faces: usize,
}

#[pyclass]
struct Bsp {
    #[pyo3(get)]
    pub planes: usize,
    #[pyo3(get)]
    pub nodes: usize,
    #[pyo3(get)]
    pub leafs: usize,
    #[pyo3(get)]
    pub faces: usize,
    #[pyo3(get)]
    pub clipnodes: usize,
    #[pyo3(get)]
    pub vertices: Vec<(f64, f64, f64)>,
    #[pyo3(get)]
    pub edges: Vec<(u32, u32)>,
    #[pyo3(get)]
    pub models: Vec<Py<Model>>,
    #[pyo3(get)]
    pub portal_file: Option<String>,
    #[pyo3(get)]
    pub leak_points: Option<Vec<(f64, f64, f64)>>,
    #[pyo3(get)]
    pub warnings: Vec<String>,
}

fn tuple(v: Vec3) -> (f64, f64, f64) {
    (v.x, v.y, v.z)
}

impl Bsp {
    fn new(py: Python<'_>, output: &CompileOutput) -> PyResult<Self> {
        let bsp = &output.bsp;
        let models = bsp
            .models
            .iter()
            .map(|model| {
                Py::new(
                    py,
                    Model {
                        mins: tuple(model.bounds.mins),
                        maxs: tuple(model.bounds.maxs),
                        headnode: model.headnode.clone(),
                        visleafs: model.visleafs,
                        first_face: model.first_face,
                        num_faces: model.num_faces,
                    },
                )
            })
            .collect::<PyResult<Vec<_>>>()?;

        Ok(Bsp {
            planes: bsp.planes.len(),
            nodes: bsp.nodes.len(),
            leafs: bsp.leafs.len(),
            faces: bsp.faces.len(),
            clipnodes: bsp.clipnodes.len(),
            vertices: bsp.vertices.iter().map(|v| tuple(*v)).collect(),
            edges: bsp.edges.iter().map(|e| (e[0], e[1])).collect(),
            models,
            portal_file: output.portal_file.clone(),
            leak_points: output.leak.as_ref().map(|leak| leak.points.iter().map(|p| tuple(*p)).collect()),
            warnings: output.diagnostics.warnings.iter().map(|w| w.to_string()).collect(),
        })
    }
}

/// Compile the entities into BSP lumps. The first entity is the world.
#[pyfunction]
#[pyo3(signature = (entities, textures, game="quake", nofill=false, noclip=false, output_base=None))]
fn compile_map(
    py: Python<'_>,
    entities: Vec<PyRef<Entity>>,
    textures: Vec<PyRef<Texture>>,
    game: &str,
    nofill: bool,
    noclip: bool,
    output_base: Option<PathBuf>,
) -> PyResult<Bsp> {
    let game = GameId::from_name(game).ok_or_else(|| PyValueError::new_err(format!("unknown game '{}'", game)))?;
    let options = CompileOptions { game, nofill, noclip, output_base, ..CompileOptions::default() };

    let mut line = 0;
    let entities = entities.iter().map(|entity| entity.to_map_entity(&mut line)).collect();
    let texinfo = textures.iter().map(|texture| TexInfo::from(&**texture)).collect();
    let map = MapData::new(entities, texinfo);

    let output = compile(&map, options).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Bsp::new(py, &output)
}

#[pymodule]
fn qbsp_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Texture>()?;
    m.add_class::<Face>()?;
    m.add_class::<Brush>()?;
    m.add_class::<Entity>()?;
    m.add_class::<Model>()?;
    m.add_class::<Bsp>()?;
    m.add_function(wrap_pyfunction!(compile_map, m)?)?;
    Ok(())
}
