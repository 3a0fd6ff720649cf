use std::ops::{Index, IndexMut};

use crate::math::{Plane, Vec3, NORMAL_EPSILON, VECT_MAX};

/// An axis-aligned bounding box. An empty box has `mins > maxs`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    pub fn empty() -> Bounds {
        Bounds {
            mins: Vec3::new(VECT_MAX, VECT_MAX, VECT_MAX),
            maxs: Vec3::new(-VECT_MAX, -VECT_MAX, -VECT_MAX),
        }
    }

    pub fn new(mins: Vec3, maxs: Vec3) -> Bounds {
        Bounds { mins, maxs }
    }

    pub fn from_points(points: &[Vec3]) -> Bounds {
        let mut bounds = Bounds::empty();
        bounds.add_points(points);
        bounds
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.mins[i] <= self.maxs[i])
    }

    // Returns the midpoint between the min and max points.
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn add_point(&mut self, point: &Vec3) {
        for i in 0..3 {
            self.mins[i] = self.mins[i].min(point[i]);
            self.maxs[i] = self.maxs[i].max(point[i]);
        }
    }

    pub fn add_points(&mut self, points: &[Vec3]) {
        for point in points {
            self.add_point(point);
        }
    }

    pub fn add_bounds(&mut self, other: &Bounds) {
        if other.is_valid() {
            self.add_point(&other.mins);
            self.add_point(&other.maxs);
        }
    }

    pub fn expand_by(&self, w: f64) -> Bounds {
        Bounds::new(
            self.mins - Vec3::new(w, w, w),
            self.maxs + Vec3::new(w, w, w),
        )
    }

    /// Touching boxes count as intersecting.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.mins.x <= other.maxs.x && self.maxs.x >= other.mins.x &&
        self.mins.y <= other.maxs.y && self.maxs.y >= other.mins.y &&
        self.mins.z <= other.maxs.z && self.maxs.z >= other.mins.z
    }

    pub fn contains_point(&self, point: &Vec3, epsilon: f64) -> bool {
        (0..3).all(|i| point[i] >= self.mins[i] - epsilon && point[i] <= self.maxs[i] + epsilon)
    }

    /// Split the box by a plane into `(front, back)` boxes that each fully
    /// contain the part of this box on their side. For sloped planes the two
    /// results overlap.
    pub fn divide(&self, split: &Plane) -> (Bounds, Bounds) {
        let mut front = *self;
        let mut back = *self;

        if let Some(axis) = split.plane_type().axis() {
            let dist = split.dist * split.normal[axis];
            if split.normal[axis] > 0.0 {
                front.mins[axis] = dist;
                back.maxs[axis] = dist;
            } else {
                front.maxs[axis] = dist;
                back.mins[axis] = dist;
            }
            return (front, back);
        }

        // make proper sloping cuts
        for a in 0..3 {
            // parallel, no intersection
            if split.normal[a].abs() < NORMAL_EPSILON {
                continue;
            }
            let b = (a + 1) % 3;
            let c = (a + 2) % 3;

            let mut split_mins = self.maxs[a];
            let mut split_maxs = self.mins[a];
            let mut corner = Vec3::new(0.0, 0.0, 0.0);
            for i in 0..2 {
                corner[b] = self[i][b];
                for j in 0..2 {
                    corner[c] = self[j][c];

                    corner[a] = self.mins[a];
                    let dist1 = split.distance_to(&corner);
                    corner[a] = self.maxs[a];
                    let dist2 = split.distance_to(&corner);

                    let mid = self.mins[a] + (self.maxs[a] - self.mins[a]) * (dist1 / (dist1 - dist2));
                    split_mins = mid.min(split_mins).max(self.mins[a]);
                    split_maxs = mid.max(split_maxs).min(self.maxs[a]);
                }
            }
            if split.normal[a] > 0.0 {
                front.mins[a] = split_mins;
                back.maxs[a] = split_maxs;
            } else {
                back.mins[a] = split_mins;
                front.maxs[a] = split_maxs;
            }
        }
        (front, back)
    }
}

impl Index<usize> for Bounds {
    type Output = Vec3;
    fn index(&self, index: usize) -> &Vec3 {
        match index {
            0 => &self.mins,
            1 => &self.maxs,
            _ => panic!("Index out of bounds")
        }
    }
}

impl IndexMut<usize> for Bounds {
    fn index_mut(&mut self, index: usize) -> &mut Vec3 {
        match index {
            0 => &mut self.mins,
            1 => &mut self.maxs,
            _ => panic!("Index out of bounds")
        }
    }
}
