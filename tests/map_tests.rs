mod common;

use cgmath::InnerSpace;
use common::*;
use qbsp_core::game::{Contents, GameId};
use qbsp_core::map::{texture_axis_from_plane, MapEntity, TexFlags, TexInfo};

#[test]
fn floor_texture_axes_test() {
    let (s, t) = texture_axis_from_plane(vec3(0.0, 0.0, 1.0), false);

    assert_eq!(s, vec3(1.0, 0.0, 0.0));
    assert_eq!(t, vec3(0.0, -1.0, 0.0));
}

#[test]
fn wall_texture_axes_test() {
    let (s, t) = texture_axis_from_plane(vec3(-1.0, 0.0, 0.0), false);

    assert_eq!(s, vec3(0.0, 1.0, 0.0));
    assert_eq!(t, vec3(0.0, 0.0, -1.0));
}

#[test]
fn oldaxis_breaks_ties_toward_first_axis_test() {
    // Arrange: halfway between the floor and the +x wall
    let normal = vec3(1.0, 0.0, 1.0).normalize();

    // Act
    let (new_s, _) = texture_axis_from_plane(normal, false);
    let (old_s, old_t) = texture_axis_from_plane(normal, true);

    // Assert
    assert_eq!(new_s, vec3(0.0, 1.0, 0.0));
    assert_eq!(old_s, vec3(1.0, 0.0, 0.0));
    assert_eq!(old_t, vec3(0.0, -1.0, 0.0));
}

#[test]
fn quaked_scale_and_shift_test() {
    let info = TexInfo::quaked("wall", vec3(0.0, 0.0, 1.0), [8.0, 4.0], 0.0, [2.0, 0.0], TexFlags::empty(), false);

    assert_eq!(info.vecs[0], [0.5, 0.0, 0.0, 8.0]);
    // zero scale is treated as one
    assert_eq!(info.vecs[1], [0.0, -1.0, 0.0, 4.0]);
}

#[test]
fn quaked_rotation_test() {
    let info = TexInfo::quaked("wall", vec3(0.0, 0.0, 1.0), [0.0, 0.0], 90.0, [1.0, 1.0], TexFlags::empty(), false);

    let s = info.axis(0);
    let t = info.axis(1);
    assert_near(s.x, 0.0);
    assert_near(s.y, 1.0);
    assert_near(t.x, 1.0);
    assert_near(t.y, 0.0);
}

#[test]
fn tex_flags_from_names_test() {
    let flags = TexFlags::from_names(["skip", "Hint", "unknown"]);

    assert_eq!(flags, TexFlags::SKIP | TexFlags::HINT);
    assert_eq!(TexFlags::from_names(Vec::<&str>::new()), TexFlags::empty());
}

#[test]
fn game_from_name_test() {
    assert_eq!(GameId::from_name("quake"), Some(GameId::Quake));
    assert_eq!(GameId::from_name("HEXEN2"), Some(GameId::Hexen2));
    assert_eq!(GameId::from_name("doom"), None);
}

#[test]
fn texture_contents_test() {
    let quake = GameId::Quake.rules();

    assert_eq!(quake.contents_for_texture("*water1"), Contents::Water);
    assert_eq!(quake.contents_for_texture("*lava1"), Contents::Lava);
    assert_eq!(quake.contents_for_texture("sky1"), Contents::Sky);
    assert_eq!(quake.contents_for_texture("clip"), Contents::Clip);
    assert_eq!(quake.contents_for_texture("wall"), Contents::Solid);
}

#[test]
fn box_brush_faces_point_outward_test() {
    let brush = box_brush([0.0; 3], [64.0; 3], WALL);

    let center = vec3(32.0, 32.0, 32.0);
    assert_eq!(brush.faces.len(), 6);
    for face in &brush.faces {
        assert_near(face.plane.distance_to(&center), -32.0);
    }
}

#[test]
fn merging_entities_test() {
    assert!(MapEntity::new("func_group").merges_into_world());
    assert!(MapEntity::new("FUNC_DETAIL").merges_into_world());
    assert!(!MapEntity::new("func_door").merges_into_world());
}
