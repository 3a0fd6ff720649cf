mod common;

use cgmath::InnerSpace;
use common::*;
use qbsp_core::plane::PlaneSide;
use qbsp_core::winding::Winding;
use qbsp_core::{compile, BspData, CompileOptions};

fn sealed_room_bsp() -> BspData {
    compile(&sealed_room(), CompileOptions::default()).unwrap().bsp
}

#[test]
fn edge_zero_is_reserved_test() {
    let bsp = sealed_room_bsp();

    assert_eq!(bsp.edges[0], [0, 0]);
    assert!(bsp.surfedges.iter().all(|&e| e != 0));
}

#[test]
fn leaf_zero_is_shared_solid_test() {
    let bsp = sealed_room_bsp();

    assert_eq!(bsp.leafs[0].contents, -2);
    assert_eq!(bsp.leafs[0].num_marksurfaces, 0);
}

#[test]
fn sealed_room_has_one_visible_leaf_test() {
    // Arrange
    let bsp = sealed_room_bsp();

    // Act
    let world = &bsp.models[0];

    // Assert: the fill leaves only the inside of the room
    assert_eq!(world.visleafs, 1);
    assert_eq!(bsp.leafs.len(), 2);
    assert_eq!(bsp.leafs[1].contents, -1);
    assert_eq!(bsp.leafs[1].num_marksurfaces, bsp.faces.len());
}

#[test]
fn faces_rebuild_from_edges_test() {
    let bsp = sealed_room_bsp();

    let mut area = 0.0;
    for (i, face) in bsp.faces.iter().enumerate() {
        let winding = Winding::from_face(&bsp, i).unwrap();
        assert_eq!(winding.len(), face.num_edges);

        let plane = &bsp.planes[face.planenum];
        for point in winding.points() {
            assert!((plane.normal.dot(*point) - plane.dist).abs() < 0.01);
        }
        let facing = winding.plane().normal.dot(plane.normal);
        match face.side {
            PlaneSide::Front => assert_near(facing, 1.0),
            PlaneSide::Back => assert_near(facing, -1.0),
        }
        area += winding.area();
    }

    // the six inner walls of the room
    assert_near(area, 6.0 * 256.0 * 256.0);
}

#[test]
fn edges_are_shared_at_most_once_test() {
    let bsp = sealed_room_bsp();

    let mut uses = vec![(0usize, 0usize); bsp.edges.len()];
    for &surfedge in &bsp.surfedges {
        let edge = surfedge.unsigned_abs() as usize;
        if surfedge > 0 {
            uses[edge].0 += 1;
        } else {
            uses[edge].1 += 1;
        }
    }
    for (forward, backward) in uses.into_iter().skip(1) {
        assert_eq!(forward, 1);
        assert!(backward <= 1);
    }
}

#[test]
fn node_children_are_valid_test() {
    let bsp = sealed_room_bsp();

    for node in &bsp.nodes {
        assert!(node.planenum < bsp.planes.len());
        for &child in &node.children {
            if child >= 0 {
                assert!((child as usize) < bsp.nodes.len());
            } else {
                assert!(((-child - 1) as usize) < bsp.leafs.len());
            }
        }
        assert!(node.first_face + node.num_faces <= bsp.faces.len());
    }
}

#[test]
fn clip_nodes_are_valid_test() {
    let bsp = sealed_room_bsp();

    assert!(!bsp.clipnodes.is_empty());
    for node in &bsp.clipnodes {
        for &child in &node.children {
            if child >= 0 {
                assert!((child as usize) < bsp.clipnodes.len());
            } else {
                assert!(child == -1 || child == -2);
            }
        }
    }
}

#[test]
fn head_nodes_per_hull_test() {
    let bsp = sealed_room_bsp();

    let world = &bsp.models[0];
    assert_eq!(world.headnode.len(), 3);
    assert_eq!(world.headnode[0], 0);
    assert_eq!(world.headnode[1], 0);
    assert!(world.headnode[2] > 0);
}

#[test]
fn world_bounds_test() {
    let bsp = sealed_room_bsp();

    let bounds = bsp.models[0].bounds;
    for axis in 0..3 {
        assert_near(bounds.mins[axis], -144.0);
        assert_near(bounds.maxs[axis], 144.0);
    }
}

#[test]
fn output_planes_are_shared_test() {
    let bsp = sealed_room_bsp();

    for (i, a) in bsp.planes.iter().enumerate() {
        for b in &bsp.planes[i + 1..] {
            let same = a.normal.dot(b.normal) > 0.99999 && (a.dist - b.dist).abs() < 0.01;
            assert!(!same);
        }
    }
}
