use std::collections::HashMap;

use cgmath::InnerSpace;

use crate::error::{CompileError, Result};
use crate::math::{Plane, PlaneType, Vec3, ON_EPSILON};

/// Which side of a registered plane a face or portal faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaneSide {
    Front = 0,
    Back = 1,
}

impl PlaneSide {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn flipped(self) -> PlaneSide {
        match self {
            PlaneSide::Front => PlaneSide::Back,
            PlaneSide::Back => PlaneSide::Front,
        }
    }

    pub fn from_index(index: usize) -> PlaneSide {
        if index == 0 { PlaneSide::Front } else { PlaneSide::Back }
    }
}

/// A registered plane with its cached axis type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapPlane {
    pub normal: Vec3,
    pub dist: f64,
    pub plane_type: PlaneType,
}

impl MapPlane {
    pub fn as_plane(&self) -> Plane {
        Plane::new(self.normal, self.dist)
    }

    /// Signed distance, using the axial shortcut where possible.
    pub fn distance_to(&self, point: &Vec3) -> f64 {
        match self.plane_type.axis() {
            Some(axis) => point[axis] * self.normal[axis] - self.dist,
            None => self.normal.dot(*point) - self.dist,
        }
    }
}

/// Result of a plane lookup: the canonical plane number and which way the
/// looked-up plane faces relative to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneRef {
    pub planenum: usize,
    pub side: PlaneSide,
}

/// Deduplicated plane table.
///
/// Planes are stored in pairs: the canonical plane at an even index, with its
/// dominant normal component positive, and its mirror at the next odd index.
/// Plane numbers handed out are always the canonical (even) index.
#[derive(Clone, Debug, Default)]
pub struct PlaneRegistry {
    planes: Vec<MapPlane>,
    /// Canonical plane numbers keyed by rounded `|dist|`.
    by_dist: HashMap<i64, Vec<usize>>,
}

fn dist_key(dist: f64) -> i64 {
    (dist.abs() + 0.5).floor() as i64
}

/// Canonicalise a plane's facing. Returns true when the plane was flipped.
fn normalize_plane(normal: &mut Vec3, dist: &mut f64) -> (PlaneType, bool) {
    for i in 0..3 {
        if normal[i] == 1.0 {
            normal[(i + 1) % 3] = 0.0;
            normal[(i + 2) % 3] = 0.0;
            return (PlaneType::from_normal(normal), false);
        }
        if normal[i] == -1.0 {
            normal[i] = 1.0;
            normal[(i + 1) % 3] = 0.0;
            normal[(i + 2) % 3] = 0.0;
            *dist = -*dist;
            return (PlaneType::from_normal(normal), true);
        }
    }

    let plane_type = PlaneType::from_normal(normal);
    if normal[plane_type.dominant_axis()] < 0.0 {
        *normal = -*normal;
        *dist = -*dist;
        return (plane_type, true);
    }
    (plane_type, false)
}

impl PlaneRegistry {
    pub fn new() -> PlaneRegistry {
        PlaneRegistry::default()
    }

    /// Number of stored planes, mirrors included.
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn get(&self, planenum: usize) -> &MapPlane {
        &self.planes[planenum]
    }

    /// The plane as seen from `side`: the stored mirror for the back side.
    pub fn oriented(&self, planenum: usize, side: PlaneSide) -> &MapPlane {
        match side {
            PlaneSide::Front => &self.planes[planenum & !1],
            PlaneSide::Back => &self.planes[planenum | 1],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapPlane> {
        self.planes.iter()
    }

    /// Canonical plane numbers in insertion order.
    pub fn canonical_planenums(&self) -> impl Iterator<Item = usize> {
        (0..self.planes.len()).step_by(2)
    }

    fn find(&self, plane: &Plane) -> Option<PlaneRef> {
        let key = dist_key(plane.dist);
        let mut best: Option<PlaneRef> = None;
        // equal planes can round to a neighbouring key
        for key in [key - 1, key, key + 1] {
            let Some(candidates) = self.by_dist.get(&key) else {
                continue;
            };
            for &planenum in candidates {
                let stored = self.planes[planenum].as_plane();
                let found = if stored.is_equal(plane) {
                    Some(PlaneSide::Front)
                } else if stored.is_inverse(plane) {
                    Some(PlaneSide::Back)
                } else {
                    None
                };
                if let Some(side) = found {
                    // lowest index wins so lookups don't depend on bin order
                    if best.map_or(true, |b| planenum < b.planenum) {
                        best = Some(PlaneRef { planenum, side });
                    }
                    break;
                }
            }
        }
        best
    }

    /// Returns the plane number of an equivalent registered plane, adding the
    /// plane and its mirror when there is none.
    pub fn add_or_find_plane(&mut self, plane: &Plane) -> Result<PlaneRef> {
        if let Some(found) = self.find(plane) {
            return Ok(found);
        }

        let length = plane.normal.magnitude();
        if length < 1.0 - ON_EPSILON || length > 1.0 + ON_EPSILON {
            return Err(CompileError::invariant(
                "add_or_find_plane",
                format!("invalid normal (vector length {:.4})", length),
            ));
        }

        let mut normal = plane.normal;
        let mut dist = plane.dist;
        let (plane_type, flipped) = normalize_plane(&mut normal, &mut dist);

        let planenum = self.planes.len();
        self.planes.push(MapPlane { normal, dist, plane_type });
        self.planes.push(MapPlane { normal: -normal, dist: -dist, plane_type });
        self.by_dist.entry(dist_key(dist)).or_default().push(planenum);

        let side = if flipped { PlaneSide::Back } else { PlaneSide::Front };
        Ok(PlaneRef { planenum, side })
    }
}
