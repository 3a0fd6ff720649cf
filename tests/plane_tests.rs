mod common;

use cgmath::InnerSpace;
use common::vec3;
use qbsp_core::error::CompileError;
use qbsp_core::math::{Plane, PlaneType, Vec3};
use qbsp_core::plane::{PlaneRegistry, PlaneSide};

fn sample_planes() -> Vec<Plane> {
    vec![
        Plane::new(Vec3::unit_x(), 64.0),
        Plane::new(-Vec3::unit_x(), 0.0),
        Plane::new(Vec3::unit_z(), 128.0),
        Plane::new(vec3(1.0, 1.0, 0.0).normalize(), 32.0),
        Plane::new(-Vec3::unit_x(), -64.0),
        Plane::new(vec3(-1.0, -1.0, 0.0).normalize(), -32.0),
        Plane::new(Vec3::unit_y(), 2000.5),
    ]
}

#[test]
fn add_or_find_plane_is_deterministic_test() {
    // Arrange
    let mut registry1 = PlaneRegistry::new();
    let mut registry2 = PlaneRegistry::new();

    // Act
    let refs1: Vec<_> = sample_planes().iter().map(|p| registry1.add_or_find_plane(p).unwrap()).collect();
    let refs2: Vec<_> = sample_planes().iter().map(|p| registry2.add_or_find_plane(p).unwrap()).collect();

    // Assert
    assert_eq!(refs1, refs2);
    assert_eq!(registry1.len(), registry2.len());
}

#[test]
fn inverse_plane_shares_number_test() {
    let mut registry = PlaneRegistry::new();

    let front = registry.add_or_find_plane(&Plane::new(Vec3::unit_x(), 64.0)).unwrap();
    let back = registry.add_or_find_plane(&Plane::new(-Vec3::unit_x(), -64.0)).unwrap();

    assert_eq!(front.planenum, back.planenum);
    assert_eq!(front.side, PlaneSide::Front);
    assert_eq!(back.side, PlaneSide::Back);
    assert_eq!(registry.len(), 2);
}

#[test]
fn planes_are_stored_canonical_test() {
    let mut registry = PlaneRegistry::new();

    let found = registry.add_or_find_plane(&Plane::new(-Vec3::unit_z(), 10.0)).unwrap();

    assert_eq!(found.planenum % 2, 0);
    assert_eq!(found.side, PlaneSide::Back);
    let stored = registry.get(found.planenum);
    assert_eq!(stored.normal, Vec3::unit_z());
    assert_eq!(stored.dist, -10.0);
    assert_eq!(stored.plane_type, PlaneType::Z);

    let mirror = registry.oriented(found.planenum, PlaneSide::Back);
    assert_eq!(mirror.normal, -Vec3::unit_z());
    assert_eq!(mirror.dist, 10.0);
}

#[test]
fn nearly_equal_planes_are_merged_test() {
    let mut registry = PlaneRegistry::new();

    let a = registry.add_or_find_plane(&Plane::new(Vec3::unit_y(), 100.0)).unwrap();
    let b = registry.add_or_find_plane(&Plane::new(Vec3::unit_y(), 100.00001)).unwrap();
    let c = registry.add_or_find_plane(&Plane::new(Vec3::unit_y(), 100.01)).unwrap();

    assert_eq!(a, b);
    assert_ne!(a.planenum, c.planenum);
}

#[test]
fn nearly_equal_planes_across_rounding_boundary_test() {
    let mut registry = PlaneRegistry::new();

    // these round to different integer distances
    let a = registry.add_or_find_plane(&Plane::new(Vec3::unit_z(), 7.49999)).unwrap();
    let b = registry.add_or_find_plane(&Plane::new(Vec3::unit_z(), 7.50001)).unwrap();
    let c = registry.add_or_find_plane(&Plane::new(-Vec3::unit_z(), -7.50001)).unwrap();

    assert_eq!(a, b);
    assert_eq!(c.planenum, a.planenum);
    assert_eq!(c.side, PlaneSide::Back);
    assert_eq!(registry.len(), 2);
}

#[test]
fn invalid_normal_is_rejected_test() {
    let mut registry = PlaneRegistry::new();

    let result = registry.add_or_find_plane(&Plane::new(vec3(1.0, 1.0, 0.0), 0.0));

    assert!(matches!(result, Err(CompileError::InvariantViolation { .. })));
    assert!(registry.is_empty());
}

#[test]
fn canonical_planenums_test() {
    let mut registry = PlaneRegistry::new();
    for plane in sample_planes() {
        registry.add_or_find_plane(&plane).unwrap();
    }

    let numbers: Vec<usize> = registry.canonical_planenums().collect();

    // x=64, x=0, z=128, the diagonal and y=2000.5
    assert_eq!(numbers, vec![0, 2, 4, 6, 8]);
}
