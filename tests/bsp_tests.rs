mod common;

use common::*;
use qbsp_core::bounds::Bounds;
use qbsp_core::brush::load_entity;
use qbsp_core::bsp::{gather_node_faces, solid_bsp};
use qbsp_core::csg::csg_faces;
use qbsp_core::game::Contents;
use qbsp_core::map::{MapData, MapEntity};
use qbsp_core::tree::{BspTree, NodeKind};
use qbsp_core::CompileContext;

fn build(ctx: &mut CompileContext, map: &MapData, hull: usize, midsplit: bool) -> BspTree {
    let loaded = load_entity(ctx, map, 0, hull).unwrap();
    let surfaces = csg_faces(ctx, &loaded.brushes).unwrap();
    solid_bsp(ctx, &loaded.bounds, surfaces, midsplit, hull).unwrap()
}

#[test]
fn single_cube_tree_test() {
    // Arrange
    let mut ctx = context();
    let map = single_cube(64.0);

    // Act
    let tree = build(&mut ctx, &map, 0, false);

    // Assert: one split per side, six empty leaves around one solid one
    assert_eq!(tree.decision_nodes().len(), 6);
    assert_eq!(tree.leaves().len(), 7);
    assert_eq!(tree.count_leaves(Contents::Empty), 6);
    assert_eq!(tree.count_leaves(Contents::Solid), 1);
    assert!(ctx.diagnostics.is_empty());
}

#[test]
fn single_cube_midsplit_tree_test() {
    let mut ctx = context();
    let map = single_cube(64.0);

    let tree = build(&mut ctx, &map, 0, true);

    assert_eq!(tree.leaves().len(), 7);
    assert_eq!(tree.count_leaves(Contents::Solid), 1);
}

#[test]
fn point_in_leaf_test() {
    let mut ctx = context();
    let map = single_cube(64.0);
    let tree = build(&mut ctx, &map, 0, false);

    let inside = tree.point_in_leaf(&vec3(32.0, 32.0, 32.0), &ctx.planes);
    let outside = tree.point_in_leaf(&vec3(100.0, 32.0, 32.0), &ctx.planes);

    assert_eq!(tree.node(inside).contents(), Some(Contents::Solid));
    assert_eq!(tree.node(outside).contents(), Some(Contents::Empty));
}

#[test]
fn clip_hull_cube_tree_test() {
    let mut ctx = context();
    let map = single_cube(64.0);

    let tree = build(&mut ctx, &map, 1, true);

    assert_eq!(tree.leaves().len(), 7);
    let inside = tree.point_in_leaf(&vec3(-8.0, -8.0, -16.0), &ctx.planes);
    assert_eq!(tree.node(inside).contents(), Some(Contents::Solid));
}

#[test]
fn node_bounds_are_padded_test() {
    let mut ctx = context();
    let map = single_cube(64.0);

    let tree = build(&mut ctx, &map, 0, false);

    let head = tree.node(tree.head);
    for axis in 0..3 {
        assert_near(head.bounds.mins[axis], -24.0);
        assert_near(head.bounds.maxs[axis], 88.0);
    }
}

#[test]
fn water_cube_tree_test() {
    let mut ctx = context();
    let map = MapData::new(
        vec![MapEntity::new("worldspawn").with_brushes(vec![box_brush([0.0; 3], [64.0; 3], WATER)])],
        textures(),
    );

    let tree = build(&mut ctx, &map, 0, false);

    assert_eq!(tree.count_leaves(Contents::Water), 1);
    assert_eq!(tree.count_leaves(Contents::Empty), 6);
    assert_eq!(tree.count_leaves(Contents::Solid), 0);
}

#[test]
fn gather_node_faces_test() {
    let mut ctx = context();
    let map = single_cube(64.0);
    let tree = build(&mut ctx, &map, 0, false);

    let surfaces = gather_node_faces(&tree).unwrap();

    assert_eq!(surfaces.len(), 6);
    for surface in &surfaces {
        assert_eq!(surface.faces.len(), 1);
        assert!(!surface.onnode);
        assert!(surface.faces[0].original.is_none());
    }
}

#[test]
fn empty_entity_tree_test() {
    let mut ctx = context();
    let bounds = Bounds::new(vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 0.0));

    let tree = solid_bsp(&mut ctx, &bounds, Vec::new(), false, 0).unwrap();

    assert_eq!(tree.decision_nodes().len(), 1);
    assert_eq!(tree.count_leaves(Contents::Empty), 2);
    assert_eq!(tree.count_leaves(Contents::Solid), 0);
}

#[test]
fn large_faces_are_subdivided_test() {
    // Arrange: a 512 unit slab, beyond the 240 unit subdivision size
    let mut ctx = context();
    let map = MapData::new(
        vec![MapEntity::new("worldspawn").with_brushes(vec![box_brush(
            [-256.0, -256.0, 0.0],
            [256.0, 256.0, 16.0],
            WALL,
        )])],
        textures(),
    );

    // Act
    let tree = build(&mut ctx, &map, 0, false);

    // Assert
    assert!(tree.faces.len() > 6);
    for node_face in &tree.faces {
        let size = node_face.face.winding.bounds().size();
        assert!(size.x <= 240.0 + 0.001 && size.y <= 240.0 + 0.001);
    }
}

#[test]
fn detail_brushes_make_separators_test() {
    let mut ctx = context();
    let world = MapEntity::new("worldspawn").with_brushes(vec![box_brush([0.0; 3], [64.0; 3], WALL)]);
    let detail = MapEntity::new("func_detail").with_brushes(vec![box_brush([128.0; 3], [160.0; 3], WALL)]);
    let map = MapData::new(vec![world, detail], textures());

    let tree = build(&mut ctx, &map, 0, false);

    let separators: Vec<_> = tree
        .decision_nodes()
        .into_iter()
        .filter(|&id| matches!(tree.node(id).kind, NodeKind::Decision { detail_separator: true, .. }))
        .collect();
    assert!(!separators.is_empty());
    let structural = tree.point_in_leaf(&vec3(32.0, 32.0, 32.0), &ctx.planes);
    let detail = tree.point_in_leaf(&vec3(144.0, 144.0, 144.0), &ctx.planes);
    assert_eq!(tree.node(structural).contents(), Some(Contents::Solid));
    assert_eq!(tree.node(detail).contents(), Some(Contents::Solid));
}
