use cgmath::InnerSpace;

use crate::error::{BrushLocation, CompileError, Diagnostics, Result, Warning};
use crate::game::{ContentFlags, Contents};
use crate::math::{Plane, Side, BOGUS_RANGE, ON_EPSILON};
use crate::plane::{PlaneRegistry, PlaneSide};
use crate::sphere::Sphere;
use crate::winding::{Winding, MAXEDGES};

/// A polygon on a registered plane, as it moves from brushes through CSG
/// and into the BSP tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub planenum: usize,
    /// Which side of the plane the face looks at.
    pub planeside: PlaneSide,
    pub texinfo: usize,
    /// Contents in front of and behind the face.
    pub contents: [Contents; 2],
    pub cflags: [ContentFlags; 2],
    /// The face stored on a tree node that this fragment was copied to.
    pub original: Option<usize>,
    pub winding: Winding,
    pub sphere: Sphere,
}

impl Face {
    pub fn new(planenum: usize, planeside: PlaneSide, texinfo: usize, winding: Winding) -> Face {
        let sphere = Sphere::from_points(winding.points());
        Face {
            planenum,
            planeside,
            texinfo,
            contents: [Contents::Empty, Contents::Empty],
            cflags: [ContentFlags::empty(), ContentFlags::empty()],
            original: None,
            winding,
            sphere,
        }
    }

    /// Copy everything except the points.
    pub fn with_winding(&self, winding: Winding) -> Face {
        let sphere = Sphere::from_points(winding.points());
        Face {
            planenum: self.planenum,
            planeside: self.planeside,
            texinfo: self.texinfo,
            contents: self.contents,
            cflags: self.cflags,
            original: self.original,
            winding,
            sphere,
        }
    }

    pub fn update_sphere(&mut self) {
        self.sphere = Sphere::from_points(self.winding.points());
    }

    /// The same polygon seen from behind, with the contents swapped.
    pub fn mirrored(&self) -> Face {
        let mut winding = self.winding.clone();
        winding.reverse();
        let mut face = self.with_winding(winding);
        face.planeside = self.planeside.flipped();
        face.contents = [self.contents[1], self.contents[0]];
        face.cflags = [self.cflags[1], self.cflags[0]];
        face
    }

    /// Quick classification against a plane using the bounding sphere.
    /// Returns `On` when the face has to be tested point by point.
    pub fn sphere_side(&self, plane: &Plane) -> Side {
        let dist = plane.distance_to(&self.sphere.origin);
        if dist > self.sphere.radius + ON_EPSILON {
            Side::Front
        } else if dist < -self.sphere.radius - ON_EPSILON {
            Side::Back
        } else {
            Side::On
        }
    }

    /// Split by a plane into the `(front, back)` pieces. A face that isn't
    /// crossed comes back whole on its side.
    pub fn split(self, plane: &Plane) -> Result<(Option<Face>, Option<Face>)> {
        let (front, back) = self.winding.clone().clip(plane, ON_EPSILON, false)?;
        match (front, back) {
            (Some(_), None) => Ok((Some(self), None)),
            (None, Some(_)) => Ok((None, Some(self))),
            (Some(front), Some(back)) => {
                if front.len() > MAXEDGES || back.len() > MAXEDGES {
                    return Err(CompileError::limit("points on split face", front.len().max(back.len()), MAXEDGES));
                }
                Ok((Some(self.with_winding(front)), Some(self.with_winding(back))))
            }
            (None, None) => Ok((None, None)),
        }
    }
}

/// Validate a freshly built brush face. Bad range or a non-convex polygon is
/// fatal. A point off the plane is only reported, and a degenerate edge is
/// healed by dropping its first point.
pub fn check_face(
    face: &mut Face,
    planes: &PlaneRegistry,
    location: BrushLocation,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    const CONTEXT: &str = "check face";

    let plane = planes.get(face.planenum).as_plane();
    let facenormal = planes.oriented(face.planenum, face.planeside).normal;

    'restart: loop {
        let n = face.winding.len();
        if n < 3 {
            return Err(CompileError::invariant(CONTEXT, format!("too few points ({}) at {}", n, location)));
        }

        for i in 0..n {
            let p1 = face.winding.points()[i];
            let p2 = face.winding.points()[(i + 1) % n];

            for j in 0..3 {
                if p1[j] > BOGUS_RANGE || p1[j] < -BOGUS_RANGE {
                    return Err(CompileError::invariant(
                        CONTEXT,
                        format!("coordinate out of range ({}) at {}", p1[j], location),
                    ));
                }
            }

            let dist = plane.distance_to(&p1);
            if dist < -ON_EPSILON || dist > ON_EPSILON {
                diagnostics.push(Warning::Brush {
                    location,
                    reason: format!("point ({:.3} {:.3} {:.3}) off plane by {:.4}", p1.x, p1.y, p1.z, dist),
                });
            }

            let edge = p2 - p1;
            let length = edge.magnitude();
            if length < ON_EPSILON {
                diagnostics.push(Warning::Brush {
                    location,
                    reason: format!(
                        "healing degenerate edge ({:.4}) at ({:.3} {:.3} {:.3})",
                        length, p1.x, p1.y, p1.z
                    ),
                });
                face.winding.remove(i);
                continue 'restart;
            }

            let edge_normal = facenormal.cross(edge).normalize();
            let edge_dist = p1.dot(edge_normal) + ON_EPSILON;

            // all other points must be on front side
            for (j, point) in face.winding.points().iter().enumerate() {
                if j == i {
                    continue;
                }
                let d = point.dot(edge_normal);
                if d > edge_dist {
                    return Err(CompileError::invariant(
                        CONTEXT,
                        format!("found a non-convex face (error size {}) at {}", d - edge_dist, location),
                    ));
                }
            }
        }

        face.update_sphere();
        return Ok(());
    }
}
