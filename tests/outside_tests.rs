mod common;

use cgmath::InnerSpace;
use common::*;
use qbsp_core::brush::load_entity;
use qbsp_core::bsp::{gather_node_faces, solid_bsp};
use qbsp_core::csg::csg_faces;
use qbsp_core::error::Warning;
use qbsp_core::game::Contents;
use qbsp_core::map::MapData;
use qbsp_core::outside::{fill_outside, FillOutcome};
use qbsp_core::portals::portalize;
use qbsp_core::{CompileContext, CompileOptions};

fn fill(ctx: &mut CompileContext, map: &MapData, hull: usize) -> (qbsp_core::tree::BspTree, FillOutcome) {
    let loaded = load_entity(ctx, map, 0, hull).unwrap();
    let surfaces = csg_faces(ctx, &loaded.brushes).unwrap();
    let mut tree = solid_bsp(ctx, &loaded.bounds, surfaces, true, hull).unwrap();
    let graph = portalize(ctx, &mut tree, hull).unwrap();
    let outcome = fill_outside(ctx, &mut tree, &graph, map, hull).unwrap();
    (tree, outcome)
}

#[test]
fn sealed_room_fills_test() {
    // Arrange
    let mut ctx = context();
    let map = sealed_room();

    // Act
    let (tree, outcome) = fill(&mut ctx, &map, 0);

    // Assert
    let FillOutcome::Filled { outleafs } = outcome else {
        panic!("expected a fill, got {:?}", outcome);
    };
    assert!(outleafs > 0);
    assert_eq!(ctx.diagnostics.leaks().count(), 0);

    let inside = tree.point_in_leaf(&vec3(16.0, 16.0, 16.0), &ctx.planes);
    assert_eq!(tree.node(inside).contents(), Some(Contents::Empty));
    assert_eq!(tree.node(inside).occupied(), Some(1));

    let void = tree.point_in_leaf(&vec3(150.0, 0.0, 0.0), &ctx.planes);
    assert_eq!(tree.node(void).contents(), Some(Contents::Solid));
}

#[test]
fn occupied_leaves_are_never_solid_test() {
    let mut ctx = context();
    let map = sealed_room();

    let (tree, _) = fill(&mut ctx, &map, 0);

    for id in tree.leaves() {
        let node = tree.node(id);
        if node.occupied().is_some() {
            assert_ne!(node.contents(), Some(Contents::Solid));
        }
    }
}

#[test]
fn fill_removes_outer_faces_test() {
    // Arrange
    let mut ctx = context();
    let map = sealed_room();
    let (tree, _) = fill(&mut ctx, &map, 0);

    // Act
    let removed = tree.faces.iter().filter(|f| f.removed).count();
    let surfaces = gather_node_faces(&tree).unwrap();
    let kept: usize = surfaces.iter().map(|s| s.faces.len()).sum();

    // Assert: only the inward faces of the walls survive
    assert!(removed > 0);
    assert_eq!(kept + removed, tree.faces.len());
    for surface in &surfaces {
        for face in &surface.faces {
            let plane = ctx.planes.oriented(face.planenum, face.planeside);
            // inner wall faces look toward the room centre
            assert!(plane.distance_to(&vec3(0.0, 0.0, 0.0)) > 0.0);
        }
    }
}

#[test]
fn second_pass_tree_test() {
    let mut ctx = context();
    let map = sealed_room();
    let (tree, _) = fill(&mut ctx, &map, 0);
    let bounds = tree.node(tree.head).bounds.expand_by(-24.0);

    let surfaces = gather_node_faces(&tree).unwrap();
    let rebuilt = solid_bsp(&mut ctx, &bounds, surfaces, false, 0).unwrap();

    assert!(rebuilt.faces.len() < tree.faces.len());
    assert_eq!(rebuilt.count_leaves(Contents::Empty), 1);
    let inside = rebuilt.point_in_leaf(&vec3(16.0, 16.0, 16.0), &ctx.planes);
    assert_eq!(rebuilt.node(inside).contents(), Some(Contents::Empty));
}

#[test]
fn leaky_room_leaks_test() {
    // Arrange
    let mut ctx = context();
    let map = leaky_room();

    // Act
    let (tree, outcome) = fill(&mut ctx, &map, 0);

    // Assert
    let FillOutcome::Leaked { entity, trail } = outcome else {
        panic!("expected a leak, got {:?}", outcome);
    };
    assert_eq!(entity, 1);
    let trail = trail.unwrap();
    assert_eq!(trail.points[0], vec3(16.0, 16.0, 16.0));
    for pair in trail.points.windows(2) {
        assert!((pair[1] - pair[0]).magnitude() <= 2.0 + 0.001);
    }
    // the trail ends on the boundary of the padded world
    let last = trail.points.last().unwrap();
    let head = tree.node(tree.head).bounds;
    let on_boundary = (0..3).any(|axis| {
        (last[axis] - head.mins[axis]).abs() < 0.001 || (last[axis] - head.maxs[axis]).abs() < 0.001
    });
    assert!(on_boundary);

    assert_eq!(ctx.diagnostics.leaks().count(), 1);
    assert!(trail.por.is_none());
    assert_eq!(trail.pts_text().lines().count(), trail.points.len());
}

#[test]
fn leak_leaves_tree_unfilled_test() {
    let mut ctx = context();
    let map = leaky_room();

    let (tree, _) = fill(&mut ctx, &map, 0);

    assert!(tree.faces.iter().all(|f| !f.removed));
    let void = tree.point_in_leaf(&vec3(0.0, 0.0, 150.0), &ctx.planes);
    assert_eq!(tree.node(void).contents(), Some(Contents::Empty));
}

#[test]
fn clip_hull_leak_has_no_trail_test() {
    let mut ctx = context();
    let map = leaky_room();

    let (_, outcome) = fill(&mut ctx, &map, 1);

    assert_eq!(outcome, FillOutcome::Leaked { entity: 1, trail: None });
    assert!(matches!(ctx.diagnostics.leaks().next(), Some(Warning::Leak { hull: 1, trail_points: 0, .. })));
}

#[test]
fn bsp_leak_writes_portal_dump_test() {
    let options = CompileOptions { bsp_leak: true, ..CompileOptions::default() };
    let mut ctx = CompileContext::new(options, textures());
    let map = leaky_room();

    let (_, outcome) = fill(&mut ctx, &map, 0);

    let FillOutcome::Leaked { trail: Some(trail), .. } = outcome else {
        panic!("expected a leak trail");
    };
    let por = trail.por.unwrap();
    let lines: Vec<&str> = por.lines().collect();
    let path_len: usize = lines[0].parse().unwrap();
    assert!(path_len > 0);
    assert_eq!(lines[1], "16.000000 16.000000 16.000000");
}

#[test]
fn old_leak_keeps_every_portal_test() {
    let options = CompileOptions { old_leak: true, ..CompileOptions::default() };
    let mut old_ctx = CompileContext::new(options, textures());
    let mut new_ctx = context();
    let map = leaky_room();

    let (_, old) = fill(&mut old_ctx, &map, 0);
    let (_, new) = fill(&mut new_ctx, &map, 0);

    let (FillOutcome::Leaked { trail: Some(old), .. }, FillOutcome::Leaked { trail: Some(new), .. }) = (old, new) else {
        panic!("expected two leak trails");
    };
    assert!(new.points.len() <= old.points.len());
    assert_eq!(old.points[0], new.points[0]);
}

#[test]
fn no_occupants_skips_fill_test() {
    // Arrange: the room with nobody inside
    let mut ctx = context();
    let mut map = sealed_room();
    map.entities.truncate(1);

    // Act
    let (tree, outcome) = fill(&mut ctx, &map, 0);

    // Assert
    assert_eq!(outcome, FillOutcome::NoOccupants);
    assert!(ctx.diagnostics.warnings.iter().any(|w| matches!(w, Warning::NoFilling { hull: 0 })));
    assert!(tree.faces.iter().all(|f| !f.removed));
}

#[test]
fn entity_in_solid_is_not_an_occupant_test() {
    let mut ctx = context();
    let mut map = sealed_room();
    // inside the floor brush
    map.entities[1].origin = Some(vec3(0.0, 0.0, -136.0));

    let (_, outcome) = fill(&mut ctx, &map, 0);

    assert_eq!(outcome, FillOutcome::NoOccupants);
}
