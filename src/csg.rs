//! Clip brushes against each other so only the visible skin remains.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::bounds::Bounds;
use crate::brush::Brush;
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::face::Face;
use crate::game::{ContentFlags, Contents};
use crate::merge::merge_face_to_list;
use crate::plane::{PlaneRegistry, PlaneSide};

/// Every face on one plane, both facings.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub planenum: usize,
    pub faces: Vec<Face>,
    pub bounds: Bounds,
    /// Already used as a splitting node.
    pub onnode: bool,
    /// Split chosen among detail faces.
    pub detail_separator: bool,
}

impl Surface {
    pub fn new(planenum: usize, faces: Vec<Face>) -> Result<Surface> {
        let mut surface = Surface {
            planenum,
            faces,
            bounds: Bounds::empty(),
            onnode: false,
            detail_separator: false,
        };
        surface.calc_info()?;
        Ok(surface)
    }

    /// Recompute the bounding box.
    pub fn calc_info(&mut self) -> Result<()> {
        let mut bounds = Bounds::empty();
        for face in &self.faces {
            if face.contents.iter().any(|c| matches!(c, Contents::Clip | Contents::Hint)) {
                return Err(CompileError::invariant(
                    "surface info",
                    format!("bad contents {:?} in face on plane {}", face.contents, self.planenum),
                ));
            }
            bounds.add_points(face.winding.points());
        }
        self.bounds = bounds;
        Ok(())
    }
}

/// Group faces by plane into surfaces, in plane number order.
pub fn build_surfaces(plane_faces: BTreeMap<usize, Vec<Face>>) -> Result<Vec<Surface>> {
    plane_faces
        .into_iter()
        .filter(|(_, faces)| !faces.is_empty())
        .map(|(planenum, faces)| Surface::new(planenum, faces))
        .collect()
}

/// Move the parts of `inside` that are on the outer side of one plane of
/// another brush to `outside`.
///
/// Faces exactly on the plane stay inside when they face the other way, or
/// when `precedence` says the clipping brush overdraws them.
fn clip_inside(
    planes: &PlaneRegistry,
    inside: &mut Vec<Face>,
    outside: &mut Vec<Face>,
    splitplane: usize,
    frontside: PlaneSide,
    precedence: bool,
) -> Result<()> {
    let split = planes.get(splitplane).as_plane();
    let faces = std::mem::take(inside);

    for face in faces {
        let mut frags: [Option<Face>; 2] = [None, None];
        if face.planenum == splitplane {
            // always clip off opposite facing
            if frontside != face.planeside || precedence {
                frags[frontside.flipped().index()] = Some(face);
            } else {
                frags[frontside.index()] = Some(face);
            }
        } else {
            let (front, back) = face.split(&split)?;
            frags = [front, back];
        }

        let [front, back] = frags;
        let (out, keep) = match frontside {
            PlaneSide::Front => (front, back),
            PlaneSide::Back => (back, front),
        };
        if let Some(face) = out {
            outside.push(face);
        }
        if let Some(face) = keep {
            inside.push(face);
        }
    }
    Ok(())
}

/// Copies of a brush's faces, looking out of the brush into empty space.
fn copy_faces_to_outside(brush: &Brush) -> Vec<Face> {
    brush
        .faces
        .iter()
        .map(|face| {
            let mut face = face.clone();
            face.contents = [Contents::Empty, brush.contents];
            face.cflags = [ContentFlags::empty(), brush.cflags];
            face
        })
        .collect()
}

/// Returns the surfaces holding every face of the brushes that is visible
/// from some other contents.
///
/// Later brushes in the list overdraw earlier ones on shared planes.
pub fn csg_faces(ctx: &mut CompileContext, brushes: &[Brush]) -> Result<Vec<Surface>> {
    info!("CSGFaces");

    let mut plane_faces: BTreeMap<usize, Vec<Face>> = BTreeMap::new();
    let mut brush_faces = 0;
    let mut csg_face_count = 0;

    for (i, b1) in brushes.iter().enumerate() {
        let mut outside = copy_faces_to_outside(b1);
        brush_faces += outside.len();
        let mut overwrite = false;

        for (j, b2) in brushes.iter().enumerate() {
            if !b1.bounds.intersects(&b2.bounds) {
                continue;
            }
            // brushes after this one overdraw it
            if i == j {
                overwrite = true;
                continue;
            }

            let mut inside = std::mem::take(&mut outside);
            for face in &b2.faces {
                clip_inside(&ctx.planes, &mut inside, &mut outside, face.planenum, face.planeside, overwrite)?;
            }

            // faces continued in another brush are dropped, unless the other
            // brush can be seen into
            if let Some(contents) = ctx.game.inside_face_contents(b1.contents, b2.contents) {
                for mut face in inside {
                    face.contents[0] = contents;
                    outside.push(face);
                }
            }
        }

        // everything left outside is a real surface face
        let mirror = b1.contents != Contents::Solid;
        for face in outside {
            csg_face_count += 1;
            let list = plane_faces.entry(face.planenum).or_default();
            if mirror {
                // visible from inside as well
                merge_face_to_list(face.mirrored(), list, &ctx.planes, &mut ctx.diagnostics);
            }
            merge_face_to_list(face, list, &ctx.planes, &mut ctx.diagnostics);
        }
        debug!("brush {} ({:?}) done", b1.location, b1.contents);
    }

    let surfaces = build_surfaces(plane_faces)?;
    let merged_faces: usize = surfaces.iter().map(|s| s.faces.len()).sum();

    info!("{:8} brushfaces", brush_faces);
    info!("{:8} csgfaces", csg_face_count);
    info!("{:8} mergedfaces", merged_faces);

    Ok(surfaces)
}
