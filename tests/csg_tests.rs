mod common;

use common::*;
use qbsp_core::brush::load_entity;
use qbsp_core::csg::{csg_faces, Surface};
use qbsp_core::game::Contents;
use qbsp_core::map::{MapBrush, MapData, MapEntity};
use qbsp_core::math::{Plane, Vec3, BOGUS_RANGE};
use qbsp_core::CompileContext;

fn world_surfaces(ctx: &mut CompileContext, brushes: Vec<MapBrush>) -> Vec<Surface> {
    let map = MapData::new(vec![MapEntity::new("worldspawn").with_brushes(brushes)], textures());
    let loaded = load_entity(ctx, &map, 0, 0).unwrap();
    csg_faces(ctx, &loaded.brushes).unwrap()
}

fn planenum(ctx: &mut CompileContext, normal: Vec3, dist: f64) -> usize {
    ctx.planes.add_or_find_plane(&Plane::new(normal, dist)).unwrap().planenum
}

fn area_where(surfaces: &[Surface], planenum: usize, keep: impl Fn(&qbsp_core::face::Face) -> bool) -> f64 {
    surfaces
        .iter()
        .filter(|s| s.planenum == planenum)
        .flat_map(|s| s.faces.iter())
        .filter(|f| keep(f))
        .map(|f| f.winding.area())
        .sum()
}

#[test]
fn single_cube_keeps_its_six_faces_test() {
    // Arrange
    let mut ctx = context();

    // Act
    let surfaces = world_surfaces(&mut ctx, vec![box_brush([0.0; 3], [64.0; 3], WALL)]);

    // Assert
    assert_eq!(surfaces.len(), 6);
    for surface in &surfaces {
        assert_eq!(surface.faces.len(), 1);
        let face = &surface.faces[0];
        assert_eq!(face.winding.len(), 4);
        assert_near(face.winding.area(), 64.0 * 64.0);
        assert_eq!(face.contents, [Contents::Empty, Contents::Solid]);
        assert!(face.winding.check(BOGUS_RANGE).is_ok());
    }
    // surfaces come out in plane order
    let numbers: Vec<usize> = surfaces.iter().map(|s| s.planenum).collect();
    let mut sorted = numbers.clone();
    sorted.sort();
    assert_eq!(numbers, sorted);
}

#[test]
fn touching_cubes_lose_the_shared_face_test() {
    let mut ctx = context();

    let surfaces = world_surfaces(
        &mut ctx,
        vec![
            box_brush([0.0, 0.0, 0.0], [64.0, 64.0, 64.0], WALL),
            box_brush([64.0, 0.0, 0.0], [128.0, 64.0, 64.0], WALL),
        ],
    );

    let shared = planenum(&mut ctx, Vec3::unit_x(), 64.0);
    assert!(surfaces.iter().all(|s| s.planenum != shared));
    let total: f64 = surfaces.iter().flat_map(|s| s.faces.iter()).map(|f| f.winding.area()).sum();
    assert_near(total, 2.0 * 64.0 * 64.0 + 4.0 * 128.0 * 64.0);
}

#[test]
fn solid_inside_water_keeps_its_boundary_test() {
    // Arrange: a solid cube overlapping a water cube
    let mut ctx = context();

    // Act
    let surfaces = world_surfaces(
        &mut ctx,
        vec![
            box_brush([0.0; 3], [64.0; 3], WALL),
            box_brush([32.0; 3], [96.0; 3], WATER),
        ],
    );

    // Assert: the part of the solid's +x face inside the water looks into water
    let solid_face = planenum(&mut ctx, Vec3::unit_x(), 64.0);
    let in_water = area_where(&surfaces, solid_face, |f| f.contents[0] == Contents::Water);
    let in_air = area_where(&surfaces, solid_face, |f| f.contents[0] == Contents::Empty);
    assert_near(in_water, 32.0 * 32.0);
    assert_near(in_air, 64.0 * 64.0 - 32.0 * 32.0);

    // the water's -x face is gone where it runs through the solid, both facings
    let water_face = planenum(&mut ctx, Vec3::unit_x(), 32.0);
    let visible = area_where(&surfaces, water_face, |_| true);
    assert_near(visible, 2.0 * (64.0 * 64.0 - 32.0 * 32.0));
}

#[test]
fn water_faces_are_mirrored_test() {
    let mut ctx = context();

    let surfaces = world_surfaces(&mut ctx, vec![box_brush([0.0; 3], [64.0; 3], WATER)]);

    assert_eq!(surfaces.len(), 6);
    for surface in &surfaces {
        assert_eq!(surface.faces.len(), 2);
        let front = surface.faces.iter().find(|f| f.contents == [Contents::Empty, Contents::Water]).unwrap();
        let back = surface.faces.iter().find(|f| f.contents == [Contents::Water, Contents::Empty]).unwrap();
        assert_eq!(front.planeside, back.planeside.flipped());
    }
}

#[test]
fn planeside_matches_winding_test() {
    let mut ctx = context();

    let surfaces = world_surfaces(&mut ctx, vec![box_brush([-32.0; 3], [32.0; 3], WALL)]);

    for surface in &surfaces {
        for face in &surface.faces {
            let plane = ctx.planes.oriented(face.planenum, face.planeside);
            let normal = face.winding.plane().normal;
            assert_near(normal.x, plane.normal.x);
            assert_near(normal.y, plane.normal.y);
            assert_near(normal.z, plane.normal.z);
            // faces look out of the brush
            let outward = face.winding.center() + plane.normal;
            assert!(outward.x.abs().max(outward.y.abs()).max(outward.z.abs()) > 32.0);
        }
    }
}
