use cgmath::{InnerSpace, Vector3};

pub type Vec3 = Vector3<f64>;

// Magic numbers for numerical precision.

/// Two normals are the same if every component is within this distance.
pub const NORMAL_EPSILON: f64 = 0.000001;
/// Edges shorter than this (as a cross product length) are parallel to an axis.
pub const ANGLE_EPSILON: f64 = 0.000001;
/// Two plane distances are the same if within this distance.
pub const DIST_EPSILON: f64 = 0.0001;
/// Coordinates this close to an integer are snapped onto it.
pub const ZERO_EPSILON: f64 = 0.0001;
/// Two output vertices are the same if every component is within this distance.
pub const POINT_EPSILON: f64 = 0.0001;
/// Thickness of a plane for the front/back/on test.
pub const ON_EPSILON: f64 = 0.0001;
/// Two points are the same if every component is within this distance.
pub const EQUAL_EPSILON: f64 = 0.0001;
/// Slack allowed at a merged edge before the result counts as concave.
pub const CONTINUOUS_EPSILON: f64 = 0.0005;

/// No map coordinate may exceed this magnitude.
pub const BOGUS_RANGE: f64 = 18000.0;
/// Half size of the square built by `Winding::from_plane`. Covers the whole
/// legal coordinate range from any point inside it.
pub const BASE_WINDING_RADIUS: f64 = BOGUS_RANGE * 4.0;
/// Padding around a model's bounds so no leaf has a null volume.
pub const SIDESPACE: f64 = 24.0;
/// Sentinel used to seed min/max searches.
pub const VECT_MAX: f64 = f64::MAX;

/// Classification of a point or polygon against a plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    On,
}

/// Axis classification of a plane, used for the axial distance shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaneType {
    X,
    Y,
    Z,
    AnyX,
    AnyY,
    AnyZ,
}

impl PlaneType {
    /// The axis for exactly axial planes.
    pub fn axis(self) -> Option<usize> {
        match self {
            PlaneType::X => Some(0),
            PlaneType::Y => Some(1),
            PlaneType::Z => Some(2),
            _ => None,
        }
    }

    pub fn is_axial(self) -> bool {
        self.axis().is_some()
    }

    /// The dominant axis of the normal.
    pub fn dominant_axis(self) -> usize {
        match self {
            PlaneType::X | PlaneType::AnyX => 0,
            PlaneType::Y | PlaneType::AnyY => 1,
            PlaneType::Z | PlaneType::AnyZ => 2,
        }
    }

    /// Value written to the exported plane table.
    pub fn index(self) -> i32 {
        match self {
            PlaneType::X => 0,
            PlaneType::Y => 1,
            PlaneType::Z => 2,
            PlaneType::AnyX => 3,
            PlaneType::AnyY => 4,
            PlaneType::AnyZ => 5,
        }
    }

    /// Derives the type from a normal without changing the normal.
    pub fn from_normal(normal: &Vec3) -> PlaneType {
        if normal.x == 1.0 || normal.x == -1.0 {
            return PlaneType::X;
        }
        if normal.y == 1.0 || normal.y == -1.0 {
            return PlaneType::Y;
        }
        if normal.z == 1.0 || normal.z == -1.0 {
            return PlaneType::Z;
        }
        let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        if ax >= ay && ax >= az {
            PlaneType::AnyX
        } else if ay >= ax && ay >= az {
            PlaneType::AnyY
        } else {
            PlaneType::AnyZ
        }
    }
}

/// A signed half-space: points with `normal . p - dist > 0` are in front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub dist: f64,
}

impl Plane {
    pub fn new(normal: Vec3, dist: f64) -> Plane {
        Plane { normal, dist }
    }

    /// Builds the plane through three points, with the normal following
    /// quake's clockwise winding order.
    pub fn from_points(p0: &Vec3, p1: &Vec3, p2: &Vec3) -> Plane {
        let normal = (p0 - p1).cross(p2 - p1).normalize();
        Plane { normal, dist: normal.dot(*p0) }
    }

    /// Calculate the signed distance (in the direction of the normal) between a point and the plane.
    pub fn distance_to(&self, point: &Vec3) -> f64 {
        self.normal.dot(*point) - self.dist
    }

    pub fn flipped(&self) -> Plane {
        Plane { normal: -self.normal, dist: -self.dist }
    }

    pub fn plane_type(&self) -> PlaneType {
        PlaneType::from_normal(&self.normal)
    }

    pub fn is_equal(&self, other: &Plane) -> bool {
        (self.normal.x - other.normal.x).abs() < NORMAL_EPSILON
            && (self.normal.y - other.normal.y).abs() < NORMAL_EPSILON
            && (self.normal.z - other.normal.z).abs() < NORMAL_EPSILON
            && (self.dist - other.dist).abs() < DIST_EPSILON
    }

    pub fn is_inverse(&self, other: &Plane) -> bool {
        (self.normal.x + other.normal.x).abs() < NORMAL_EPSILON
            && (self.normal.y + other.normal.y).abs() < NORMAL_EPSILON
            && (self.normal.z + other.normal.z).abs() < NORMAL_EPSILON
            && (self.dist + other.dist).abs() < DIST_EPSILON
    }
}

/// Compare two points using `EQUAL_EPSILON` on every component.
pub fn points_are_same(p: &Vec3, q: &Vec3) -> bool {
    (0..3).all(|i| (p[i] - q[i]).abs() <= EQUAL_EPSILON)
}

/// Snap a coordinate onto the nearest integer if it's within `ZERO_EPSILON` of it.
pub fn snap_to_integer(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < ZERO_EPSILON {
        r
    } else {
        v
    }
}

pub fn snap_point(p: &Vec3) -> Vec3 {
    Vec3::new(snap_to_integer(p.x), snap_to_integer(p.y), snap_to_integer(p.z))
}

/// Find the intersection of the segment `point1`..`point2` with the plane,
/// given both signed distances.
pub fn segment_plane_intersection(point1: &Vec3, point2: &Vec3, dist1: f64, dist2: f64) -> Vec3 {
    point1 + (point2 - point1) * (dist1 / (dist1 - dist2))
}
