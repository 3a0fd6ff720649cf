mod common;

use common::{assert_near, vec3};
use qbsp_core::sphere::Sphere;

#[test]
fn sphere_default_test() {
    let sphere = Sphere::default();
    assert_eq!(sphere.origin, vec3(0.0, 0.0, 0.0));
    assert_eq!(sphere.radius, 0.0);
}

#[test]
fn sphere_new_test() {
    let origin = vec3(1.0, 2.0, 3.0);
    let sphere = Sphere::new(origin, 4.0);
    assert_eq!(sphere.origin, origin);
    assert_eq!(sphere.radius, 4.0);
}

#[test]
fn sphere_from_points_test() {
    let points = vec![
        vec3(1.0, 2.0, 3.0),
        vec3(4.0, 5.0, 6.0),
        vec3(7.0, 8.0, 9.0)
    ];
    let sphere = Sphere::from_points(&points);
    assert_eq!(sphere.origin, vec3(4.0, 5.0, 6.0));
    // (4,5,6) -> (7,8,9) = sqrt(27)
    assert_near(sphere.radius, 27.0_f64.sqrt());
}

#[test]
fn sphere_from_no_points_test() {
    assert_eq!(Sphere::from_points(&[]), Sphere::default());
}
