use arrayvec::ArrayVec;
use cgmath::{InnerSpace, Zero};

use crate::bounds::Bounds;
use crate::error::{CompileError, Result};
use crate::export::BspData;
use crate::math::{Plane, Side, Vec3, ON_EPSILON};

/// Maximum points a winding may have.
pub const MAX_POINTS_ON_WINDING: usize = 96;
/// Maximum points on a face that ends up in the output.
pub const MAXEDGES: usize = 64;
/// Incident edges with normalized directions closer than this are colinear.
const COLINEAR_EPSILON: f64 = 0.999;

/// A convex polygon. The points run clockwise when seen from the front of
/// the polygon's plane.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Winding {
    points: ArrayVec<Vec3, MAX_POINTS_ON_WINDING>,
}

/// Signed distances and sides of every point of a winding against one plane.
struct SideInfo {
    dists: ArrayVec<f64, MAX_POINTS_ON_WINDING>,
    sides: ArrayVec<Side, MAX_POINTS_ON_WINDING>,
    counts: [usize; 3],
}

impl Winding {
    pub fn new() -> Winding {
        Winding { points: ArrayVec::new() }
    }

    pub fn from_points(points: &[Vec3]) -> Result<Winding> {
        let mut winding = Winding::new();
        for point in points {
            winding.push(*point)?;
        }
        Ok(winding)
    }

    /// Builds a square of half size `radius` on the plane, centred on the
    /// point of the plane closest to the origin.
    pub fn from_plane(plane: &Plane, radius: f64) -> Winding {
        // find the major axis
        let mut axis = 0;
        let mut max = plane.normal.x.abs();
        for i in 1..3 {
            if plane.normal[i].abs() > max {
                axis = i;
                max = plane.normal[i].abs();
            }
        }

        let mut up = match axis {
            2 => Vec3::unit_x(),
            _ => Vec3::unit_z(),
        };
        up = up - plane.normal * up.dot(plane.normal);
        up = up.normalize();

        let origin = plane.normal * plane.dist;
        let right = up.cross(plane.normal) * radius;
        let up = up * radius;

        let mut winding = Winding::new();
        winding.points.push(origin - right + up);
        winding.points.push(origin + right + up);
        winding.points.push(origin + right - up);
        winding.points.push(origin - right - up);
        winding
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn push(&mut self, point: Vec3) -> Result<()> {
        self.points
            .try_push(point)
            .map_err(|_| {
                CompileError::limit("points on winding", MAX_POINTS_ON_WINDING + 1, MAX_POINTS_ON_WINDING)
            })
    }

    pub fn remove(&mut self, index: usize) -> Vec3 {
        self.points.remove(index)
    }

    /// Iterate over the edges as point pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// True when `point`, lying on the plane with `normal`, is inside the
    /// polygon or on its border. Either point order is accepted.
    pub fn contains_point(&self, normal: &Vec3, point: &Vec3) -> bool {
        let mut inside = false;
        let mut outside = false;
        for (p1, p2) in self.edges() {
            let edge = p2 - p1;
            let length = edge.magnitude();
            if length < ON_EPSILON {
                continue;
            }
            // distance from the edge line, signed by the point order
            let dist = edge.cross(*point - p1).dot(*normal) / length;
            if dist > ON_EPSILON {
                inside = true;
            } else if dist < -ON_EPSILON {
                outside = true;
            }
            if inside && outside {
                return false;
            }
        }
        true
    }

    /// Reverse the point order, which flips the facing of the winding.
    pub fn reverse(&mut self) {
        self.points.reverse()
    }

    fn calc_sides(&self, plane: &Plane, epsilon: f64) -> SideInfo {
        let mut info = SideInfo {
            dists: ArrayVec::new(),
            sides: ArrayVec::new(),
            counts: [0; 3],
        };
        for point in &self.points {
            let dist = plane.distance_to(point);
            let side = if dist > epsilon {
                Side::Front
            } else if dist < -epsilon {
                Side::Back
            } else {
                Side::On
            };
            info.dists.push(dist);
            info.sides.push(side);
            info.counts[side as usize] += 1;
        }
        info
    }

    /// Classify the whole winding: `On` means it crosses or lies in the plane.
    pub fn side_of(&self, plane: &Plane, epsilon: f64) -> Side {
        let info = self.calc_sides(plane, epsilon);
        let front = info.counts[Side::Front as usize];
        let back = info.counts[Side::Back as usize];
        match (front > 0, back > 0) {
            (true, false) => Side::Front,
            (false, true) => Side::Back,
            _ => Side::On,
        }
    }

    /// Split the winding by a plane, returning the `(front, back)` pieces.
    ///
    /// A winding entirely on one side is handed back unchanged on that side.
    /// A winding lying in the plane goes to the front when `keepon` is set and
    /// to the back otherwise.
    pub fn clip(self, plane: &Plane, epsilon: f64, keepon: bool) -> Result<(Option<Winding>, Option<Winding>)> {
        let info = self.calc_sides(plane, epsilon);
        let front_count = info.counts[Side::Front as usize];
        let back_count = info.counts[Side::Back as usize];

        if keepon && front_count == 0 && back_count == 0 {
            return Ok((Some(self), None));
        }
        if front_count == 0 {
            return Ok((None, Some(self)));
        }
        if back_count == 0 {
            return Ok((Some(self), None));
        }

        let mut front = Winding::new();
        let mut back = Winding::new();
        let n = self.points.len();

        for i in 0..n {
            let p1 = self.points[i];
            match info.sides[i] {
                Side::On => {
                    front.push(p1)?;
                    back.push(p1)?;
                    continue;
                }
                Side::Front => front.push(p1)?,
                Side::Back => back.push(p1)?,
            }

            let next = (i + 1) % n;
            if info.sides[next] == Side::On || info.sides[next] == info.sides[i] {
                continue;
            }

            // generate a split point
            let p2 = self.points[next];
            let dot = info.dists[i] / (info.dists[i] - info.dists[next]);
            let mut mid = Vec3::zero();
            for j in 0..3 {
                // avoid round off error when possible
                mid[j] = if plane.normal[j] == 1.0 {
                    plane.dist
                } else if plane.normal[j] == -1.0 {
                    -plane.dist
                } else {
                    p1[j] + dot * (p2[j] - p1[j])
                };
            }
            front.push(mid)?;
            back.push(mid)?;
        }

        Ok((Some(front), Some(back)))
    }

    /// Keep only the part in front of the plane.
    pub fn clip_front(self, plane: &Plane, keepon: bool) -> Result<Option<Winding>> {
        Ok(self.clip(plane, ON_EPSILON, keepon)?.0)
    }

    /// Keep only the part behind the plane.
    pub fn clip_back(self, plane: &Plane, keepon: bool) -> Result<Option<Winding>> {
        self.clip_front(&plane.flipped(), keepon)
    }

    /// Area, fan-triangulated from the first point.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let p0 = self.points[0];
        (1..n - 1)
            .map(|i| (self.points[i] - p0).cross(self.points[i + 1] - p0).magnitude() * 0.5)
            .sum()
    }

    /// Average of the points.
    pub fn center(&self) -> Vec3 {
        if self.points.is_empty() {
            return Vec3::zero();
        }
        let sum = self.points.iter().fold(Vec3::zero(), |acc, p| acc + p);
        sum / self.points.len() as f64
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    /// The plane the winding lies on, facing the side the points run clockwise from.
    pub fn plane(&self) -> Plane {
        let center = self.center();
        let n = self.points.len();
        let mut normal = Vec3::zero();
        for i in 0..n {
            let a = self.points[i] - center;
            let b = self.points[(i + 1) % n] - center;
            normal += a.cross(b);
        }
        // clockwise order, so the accumulated normal points backwards
        normal = -normal;
        let length = normal.magnitude();
        if length > 0.0 {
            normal /= length;
        }
        Plane::new(normal, normal.dot(center))
    }

    /// Drop points whose two incident edges point the same way, and
    /// duplicated points. Repeats until nothing more can be removed.
    pub fn remove_colinear(&mut self) {
        loop {
            let n = self.points.len();
            if n <= 3 {
                return;
            }
            let colinear = (0..n).find(|&i| {
                let prev = self.points[(i + n - 1) % n];
                let point = self.points[i];
                let next = self.points[(i + 1) % n];
                let v1 = point - prev;
                let v2 = next - point;
                if v1.magnitude() < ON_EPSILON || v2.magnitude() < ON_EPSILON {
                    return true;
                }
                v1.normalize().dot(v2.normalize()) > COLINEAR_EPSILON
            });
            match colinear {
                Some(i) => {
                    self.points.remove(i);
                }
                None => return,
            }
        }
    }

    /// Validate the winding: enough points, non-zero area, every point in
    /// range and on the plane, no degenerate edges, and convex.
    pub fn check(&self, bogus_range: f64) -> Result<()> {
        const CONTEXT: &str = "winding check";

        let n = self.points.len();
        if n < 3 {
            return Err(CompileError::invariant(CONTEXT, format!("{} points", n)));
        }

        let area = self.area();
        if area < ON_EPSILON {
            return Err(CompileError::invariant(CONTEXT, format!("{} area", area)));
        }

        let plane = self.plane();

        for i in 0..n {
            let p1 = self.points[i];
            for j in 0..3 {
                if p1[j] > bogus_range || p1[j] < -bogus_range {
                    return Err(CompileError::invariant(CONTEXT, format!("coordinate out of range ({})", p1[j])));
                }
            }

            let dist = plane.distance_to(&p1);
            if dist < -ON_EPSILON || dist > ON_EPSILON {
                return Err(CompileError::invariant(CONTEXT, format!("point off plane by {}", dist)));
            }

            let p2 = self.points[(i + 1) % n];
            let edge = p2 - p1;
            if edge.magnitude() < ON_EPSILON {
                return Err(CompileError::invariant(CONTEXT, "degenerate edge"));
            }

            let edge_normal = plane.normal.cross(edge).normalize();
            let edge_dist = p1.dot(edge_normal) + ON_EPSILON;

            // all other points must be on front side
            for (j, point) in self.points.iter().enumerate() {
                if j == i {
                    continue;
                }
                let d = point.dot(edge_normal);
                if d > edge_dist {
                    return Err(CompileError::invariant(
                        CONTEXT,
                        format!("non-convex (error size {})", d - edge_dist),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Rebuild a face's winding from the exported edge and vertex arrays.
    pub fn from_face(bsp: &BspData, face_index: usize) -> Result<Winding> {
        let face = bsp.faces.get(face_index).ok_or_else(|| {
            CompileError::invariant("winding from face", format!("no face {}", face_index))
        })?;
        let mut winding = Winding::new();
        for i in 0..face.num_edges {
            let surfedge = bsp.surfedges.get(face.first_edge + i).copied().ok_or_else(|| {
                CompileError::invariant("winding from face", format!("face {} surfedge out of range", face_index))
            })?;
            let edge = bsp.edges.get(surfedge.unsigned_abs() as usize).ok_or_else(|| {
                CompileError::invariant("winding from face", format!("face {} edge out of range", face_index))
            })?;
            let vertex = if surfedge >= 0 { edge[0] } else { edge[1] };
            let point = bsp.vertices.get(vertex as usize).ok_or_else(|| {
                CompileError::invariant("winding from face", format!("face {} vertex out of range", face_index))
            })?;
            winding.push(*point)?;
        }
        Ok(winding)
    }
}
