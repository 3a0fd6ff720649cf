mod common;

use common::vec3;
use qbsp_core::bounds::Bounds;
use qbsp_core::math::{Plane, Vec3};
use cgmath::InnerSpace;

#[test]
fn bounds_empty_test() {
    let bounds = Bounds::empty();
    assert_eq!(bounds.is_valid(), false);
}

#[test]
fn bounds_from_points_test() {
    let points = vec![
        vec3(1.0, 2.0, 3.0),
        vec3(4.0, 5.0, 6.0),
        vec3(7.0, 8.0, 9.0)
    ];
    let bounds = Bounds::from_points(&points);
    assert_eq!(bounds.mins, vec3(1.0, 2.0, 3.0));
    assert_eq!(bounds.maxs, vec3(7.0, 8.0, 9.0));
    assert_eq!(bounds.is_valid(), true);
}

#[test]
fn bounds_center_and_size_test() {
    let bounds = Bounds::new(vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0));
    assert_eq!(bounds.center(), vec3(2.5, 3.5, 4.5));
    assert_eq!(bounds.size(), vec3(3.0, 3.0, 3.0));
}

#[test]
fn bounds_expand_by_test() {
    let bounds = Bounds::new(vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0));
    let expanded = bounds.expand_by(1.0);
    assert_eq!(expanded.mins, vec3(0.0, 1.0, 2.0));
    assert_eq!(expanded.maxs, vec3(5.0, 6.0, 7.0));
}

#[test]
fn bounds_add_bounds_ignores_empty_test() {
    let mut bounds = Bounds::new(vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 1.0));
    bounds.add_bounds(&Bounds::empty());
    assert_eq!(bounds, Bounds::new(vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 1.0)));
}

#[test]
fn bounds_index_test() {
    let bounds = Bounds::new(vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0));
    assert_eq!(bounds[0], vec3(1.0, 2.0, 3.0));
    assert_eq!(bounds[1], vec3(4.0, 5.0, 6.0));
}

#[test]
fn bounds_intersect_disjoint_test() {
    let bounds1 = Bounds::new(vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0));
    let bounds2 = Bounds::new(vec3(5.0, 6.0, 7.0), vec3(8.0, 9.0, 10.0));
    assert_eq!(bounds1.intersects(&bounds2), false);
}

#[test]
fn bounds_intersect_contained_test() {
    let bounds1 = Bounds::new(vec3(1.0, 2.0, 3.0), vec3(4.0, 5.0, 6.0));
    let bounds2 = Bounds::new(vec3(2.0, 3.0, 4.0), vec3(3.0, 4.0, 5.0));
    assert_eq!(bounds1.intersects(&bounds2), true);
}

#[test]
fn bounds_intersect_touching_test() {
    let bounds1 = Bounds::new(vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 1.0));
    let bounds2 = Bounds::new(vec3(1.0, 0.0, 0.0), vec3(2.0, 1.0, 1.0));
    assert_eq!(bounds1.intersects(&bounds2), true);
}

#[test]
fn bounds_divide_axial_test() {
    let bounds = Bounds::new(vec3(0.0, 0.0, 0.0), vec3(64.0, 64.0, 64.0));

    let (front, back) = bounds.divide(&Plane::new(Vec3::unit_x(), 16.0));
    assert_eq!(front, Bounds::new(vec3(16.0, 0.0, 0.0), vec3(64.0, 64.0, 64.0)));
    assert_eq!(back, Bounds::new(vec3(0.0, 0.0, 0.0), vec3(16.0, 64.0, 64.0)));

    // a negative normal puts the low side in front
    let (front, back) = bounds.divide(&Plane::new(-Vec3::unit_z(), -16.0));
    assert_eq!(front, Bounds::new(vec3(0.0, 0.0, 0.0), vec3(64.0, 64.0, 16.0)));
    assert_eq!(back, Bounds::new(vec3(0.0, 0.0, 16.0), vec3(64.0, 64.0, 64.0)));
}

#[test]
fn bounds_divide_sloped_test() {
    // Arrange: a 45 degree plane through the diagonal of the xy square
    let bounds = Bounds::new(vec3(0.0, 0.0, 0.0), vec3(64.0, 64.0, 64.0));
    let normal = vec3(1.0, 1.0, 0.0).normalize();
    let plane = Plane::new(normal, normal.dot(vec3(32.0, 32.0, 0.0)));

    // Act
    let (front, back) = bounds.divide(&plane);

    // Assert: both halves still cover the whole square in x and y, z untouched
    for half in [front, back] {
        assert_eq!(half.mins.z, 0.0);
        assert_eq!(half.maxs.z, 64.0);
        assert!(half.mins.x >= 0.0 && half.maxs.x <= 64.0);
        assert!(half.mins.y >= 0.0 && half.maxs.y <= 64.0);
    }
    assert!(front.contains_point(&vec3(60.0, 60.0, 10.0), 0.0));
    assert!(back.contains_point(&vec3(4.0, 4.0, 10.0), 0.0));
}
