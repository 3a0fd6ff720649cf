//! Coalesce coplanar faces that share an edge into larger convex faces.

use cgmath::InnerSpace;
use log::info;

use crate::csg::Surface;
use crate::error::{Diagnostics, Warning};
use crate::face::Face;
use crate::math::{Vec3, CONTINUOUS_EPSILON, EQUAL_EPSILON};
use crate::plane::PlaneRegistry;
use crate::winding::{Winding, MAXEDGES};

fn edges_match(p1: &Vec3, p2: &Vec3, p3: &Vec3, p4: &Vec3) -> bool {
    (0..3).all(|k| (p1[k] - p4[k]).abs() <= EQUAL_EPSILON && (p2[k] - p3[k]).abs() <= EQUAL_EPSILON)
}

/// Merge two faces that share an edge, if the result is still convex.
///
/// Both faces must be on the same side of the same plane with the same
/// texture and contents. Points left colinear by the merge are dropped.
pub fn try_merge(f1: &Face, f2: &Face, planes: &PlaneRegistry, diagnostics: &mut Diagnostics) -> Option<Face> {
    if f1.planenum != f2.planenum
        || f1.planeside != f2.planeside
        || f1.texinfo != f2.texinfo
        || f1.contents != f2.contents
        || f1.cflags != f2.cflags
    {
        return None;
    }

    let w1 = f1.winding.points();
    let w2 = f2.winding.points();
    let (n1, n2) = (w1.len(), w2.len());

    // find a common edge, running the opposite way on the second face
    let (i, j) = (0..n1).find_map(|i| {
        let p1 = &w1[i];
        let p2 = &w1[(i + 1) % n1];
        (0..n2)
            .find(|&j| edges_match(p1, p2, &w2[j], &w2[(j + 1) % n2]))
            .map(|j| (i, j))
    })?;

    let p1 = w1[i];
    let p2 = w1[(i + 1) % n1];
    let plane_normal = planes.oriented(f1.planenum, f1.planeside).normal;

    // check slope of connected lines, if colinear the point can be removed
    let back = w1[(i + n1 - 1) % n1];
    let normal = plane_normal.cross(p1 - back).normalize();
    let dot = (w2[(j + 2) % n2] - p1).dot(normal);
    if dot > CONTINUOUS_EPSILON {
        return None;
    }
    let keep1 = dot < -CONTINUOUS_EPSILON;

    let back = w1[(i + 2) % n1];
    let normal = plane_normal.cross(back - p2).normalize();
    let dot = (w2[(j + n2 - 1) % n2] - p2).dot(normal);
    if dot > CONTINUOUS_EPSILON {
        return None;
    }
    let keep2 = dot < -CONTINUOUS_EPSILON;

    if n1 + n2 > MAXEDGES {
        diagnostics.push(Warning::TooManyMergePoints);
        return None;
    }

    let mut points = Vec::with_capacity(n1 + n2);
    let mut k = if keep2 { (i + 1) % n1 } else { (i + 2) % n1 };
    while k != i {
        points.push(w1[k]);
        k = (k + 1) % n1;
    }
    let mut l = if keep1 { (j + 1) % n2 } else { (j + 2) % n2 };
    while l != j {
        points.push(w2[l]);
        l = (l + 1) % n2;
    }

    let winding = Winding::from_points(&points).ok()?;
    Some(f1.with_winding(winding))
}

/// Add a face to a list of coplanar faces, merging it with whatever it can.
/// Every successful merge restarts the scan with the grown face.
pub fn merge_face_to_list(face: Face, list: &mut Vec<Face>, planes: &PlaneRegistry, diagnostics: &mut Diagnostics) {
    let mut face = face;
    let mut i = 0;
    while i < list.len() {
        match try_merge(&face, &list[i], planes, diagnostics) {
            Some(merged) => {
                list.remove(i);
                face = merged;
                i = 0;
            }
            None => i += 1,
        }
    }
    list.push(face);
}

/// Merge the faces of one surface among themselves.
pub fn merge_plane_faces(surface: &mut Surface, planes: &PlaneRegistry, diagnostics: &mut Diagnostics) {
    let faces = std::mem::take(&mut surface.faces);
    let mut merged = Vec::with_capacity(faces.len());
    for face in faces {
        merge_face_to_list(face, &mut merged, planes, diagnostics);
    }
    surface.faces = merged;
}

pub fn merge_all(surfaces: &mut [Surface], planes: &PlaneRegistry, diagnostics: &mut Diagnostics) {
    info!("MergeAll");

    let mut merge_faces = 0;
    for surface in surfaces.iter_mut() {
        merge_plane_faces(surface, planes, diagnostics);
        merge_faces += surface.faces.len();
    }

    info!("{:8} mergefaces", merge_faces);
}
