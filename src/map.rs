//! The parsed map handed to the compiler.

use bitflags::bitflags;
use cgmath::InnerSpace;

use crate::bounds::Bounds;
use crate::math::{Plane, Vec3};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TexFlags(u32);

bitflags! {
    impl TexFlags : u32 {
        /// Sky or liquid surface. Never subdivided.
        const SPECIAL = 0x00000001;
        /// Not drawn. Never emitted as a face.
        const SKIP = 0x00000002;
        /// Visibility splitter. Never emitted as a face.
        const HINT = 0x00000004;
    }
}

static TEX_FLAG_NAMES: phf::Map<&'static str, u32> = phf::phf_map! {
    "SPECIAL" => 0x00000001,
    "SKIP" => 0x00000002,
    "HINT" => 0x00000004,
};

impl TexFlags {
    /// Parse flag names, ignoring case and unknown names.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> TexFlags {
        let mut flags = TexFlags::empty();
        for name in names {
            if let Some(bits) = TEX_FLAG_NAMES.get(name.to_ascii_uppercase().as_str()) {
                flags |= TexFlags::from_bits_truncate(*bits);
            }
        }
        flags
    }
}

/// Texture projection of a face: `s = vecs[0].xyz . p + vecs[0][3]`, same for `t`.
#[derive(Clone, Debug, PartialEq)]
pub struct TexInfo {
    pub name: String,
    pub vecs: [[f64; 4]; 2],
    pub flags: TexFlags,
}

impl TexInfo {
    pub fn new(name: impl Into<String>, vecs: [[f64; 4]; 2], flags: TexFlags) -> TexInfo {
        TexInfo { name: name.into(), vecs, flags }
    }

    /// A texture projected along the world axes at unit scale.
    pub fn axial(name: impl Into<String>, flags: TexFlags) -> TexInfo {
        TexInfo::new(name, [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], flags)
    }

    /// QuakeEd style projection: the world axis pair closest to `normal`,
    /// rotated by `rotate` degrees, then scaled and shifted. A zero scale
    /// means no scaling. `oldaxis` keeps the first best axis on ties.
    pub fn quaked(
        name: impl Into<String>,
        normal: Vec3,
        shift: [f64; 2],
        rotate: f64,
        scale: [f64; 2],
        flags: TexFlags,
        oldaxis: bool,
    ) -> TexInfo {
        let (s_axis, t_axis) = texture_axis_from_plane(normal, oldaxis);
        let mut axes = [s_axis, t_axis];

        let angle = rotate.to_radians();
        let (sinv, cosv) = angle.sin_cos();
        let major = |v: Vec3| if v.x != 0.0 { 0 } else if v.y != 0.0 { 1 } else { 2 };
        let sv = major(axes[0]);
        let tv = major(axes[1]);
        for axis in axes.iter_mut() {
            let ns = cosv * axis[sv] - sinv * axis[tv];
            let nt = sinv * axis[sv] + cosv * axis[tv];
            axis[sv] = ns;
            axis[tv] = nt;
        }

        let mut vecs = [[0.0; 4]; 2];
        for i in 0..2 {
            let scale = if scale[i] != 0.0 { scale[i] } else { 1.0 };
            for j in 0..3 {
                vecs[i][j] = axes[i][j] / scale;
            }
            vecs[i][3] = shift[i];
        }
        TexInfo::new(name, vecs, flags)
    }

    pub fn axis(&self, index: usize) -> Vec3 {
        let v = &self.vecs[index];
        Vec3::new(v[0], v[1], v[2])
    }
}

// normal, s axis, t axis
const BASE_AXES: [[[f64; 3]; 3]; 6] = [
    [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]],
    [[0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]],
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
    [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
    [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
    [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
];

/// The texture s and t axes for a face with this normal. Ties between two
/// base axes go to the later one unless `oldaxis` is set.
pub fn texture_axis_from_plane(normal: Vec3, oldaxis: bool) -> (Vec3, Vec3) {
    let mut best = 0.0;
    let mut best_axis = 0;
    for (i, base) in BASE_AXES.iter().enumerate() {
        let dot = normal.dot(Vec3::from(base[0]));
        if dot > best || (dot == best && !oldaxis) {
            best = dot;
            best_axis = i;
        }
    }
    let base = &BASE_AXES[best_axis];
    (Vec3::from(base[1]), Vec3::from(base[2]))
}

/// One brush side: a half-space whose normal points out of the brush.
#[derive(Clone, Debug, PartialEq)]
pub struct MapFace {
    pub plane: Plane,
    pub texinfo: usize,
    pub line: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapBrush {
    pub faces: Vec<MapFace>,
    pub line: usize,
}

impl MapBrush {
    pub fn new(faces: Vec<MapFace>, line: usize) -> MapBrush {
        MapBrush { faces, line }
    }

    /// An axis aligned box brush with every side using `texinfo`.
    pub fn from_box(bounds: &Bounds, texinfo: usize, line: usize) -> MapBrush {
        let mut faces = Vec::with_capacity(6);
        for axis in 0..3 {
            let mut normal = Vec3::new(0.0, 0.0, 0.0);
            normal[axis] = 1.0;
            faces.push(MapFace {
                plane: Plane::new(normal, bounds.maxs[axis]),
                texinfo,
                line,
            });
            faces.push(MapFace {
                plane: Plane::new(-normal, -bounds.mins[axis]),
                texinfo,
                line,
            });
        }
        MapBrush::new(faces, line)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapEntity {
    pub classname: String,
    pub origin: Option<Vec3>,
    pub brushes: Vec<MapBrush>,
}

impl MapEntity {
    pub fn new(classname: impl Into<String>) -> MapEntity {
        MapEntity { classname: classname.into(), origin: None, brushes: Vec::new() }
    }

    pub fn with_origin(mut self, origin: Vec3) -> MapEntity {
        self.origin = Some(origin);
        self
    }

    pub fn with_brushes(mut self, brushes: Vec<MapBrush>) -> MapEntity {
        self.brushes = brushes;
        self
    }

    /// Brushes of these entities are compiled as part of the world.
    pub fn merges_into_world(&self) -> bool {
        self.is_group() || self.is_detail()
    }

    pub fn is_group(&self) -> bool {
        self.classname.eq_ignore_ascii_case("func_group")
    }

    pub fn is_detail(&self) -> bool {
        self.classname.eq_ignore_ascii_case("func_detail")
    }
}

/// Every entity of the map, the world first, plus the shared texinfo table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapData {
    pub entities: Vec<MapEntity>,
    pub texinfo: Vec<TexInfo>,
}

impl MapData {
    pub fn new(entities: Vec<MapEntity>, texinfo: Vec<TexInfo>) -> MapData {
        MapData { entities, texinfo }
    }

    pub fn world(&self) -> Option<&MapEntity> {
        self.entities.first()
    }
}
