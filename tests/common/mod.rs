#![allow(dead_code)]

use qbsp_core::bounds::Bounds;
use qbsp_core::context::{CompileContext, CompileOptions};
use qbsp_core::map::{MapBrush, MapData, MapEntity, TexFlags, TexInfo};
use qbsp_core::math::Vec3;

pub const WALL: usize = 0;
pub const WATER: usize = 1;
pub const SKY: usize = 2;
pub const CLIP: usize = 3;
pub const SKIP: usize = 4;

pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

pub fn textures() -> Vec<TexInfo> {
    vec![
        TexInfo::axial("wall", TexFlags::empty()),
        TexInfo::axial("*water1", TexFlags::SPECIAL),
        TexInfo::axial("sky1", TexFlags::SPECIAL),
        TexInfo::axial("clip", TexFlags::empty()),
        TexInfo::axial("skip", TexFlags::SKIP),
    ]
}

pub fn context() -> CompileContext {
    CompileContext::new(CompileOptions::default(), textures())
}

pub fn box_brush(mins: [f64; 3], maxs: [f64; 3], texinfo: usize) -> MapBrush {
    let bounds = Bounds::new(vec3(mins[0], mins[1], mins[2]), vec3(maxs[0], maxs[1], maxs[2]));
    MapBrush::from_box(&bounds, texinfo, 0)
}

/// The six walls of a closed room whose inside spans `-size..size` on
/// every axis.
pub fn room_brushes(size: f64, thickness: f64) -> Vec<MapBrush> {
    let outer = size + thickness;
    vec![
        box_brush([-outer, -outer, -outer], [outer, outer, -size], WALL),
        box_brush([-outer, -outer, size], [outer, outer, outer], WALL),
        box_brush([-outer, -outer, -size], [-size, outer, size], WALL),
        box_brush([size, -outer, -size], [outer, outer, size], WALL),
        box_brush([-size, -outer, -size], [size, -size, size], WALL),
        box_brush([-size, size, -size], [size, outer, size], WALL),
    ]
}

pub fn player_start(origin: Vec3) -> MapEntity {
    MapEntity::new("info_player_start").with_origin(origin)
}

/// A sealed 256 unit room with the player standing inside.
pub fn sealed_room() -> MapData {
    let world = MapEntity::new("worldspawn").with_brushes(room_brushes(128.0, 16.0));
    MapData::new(vec![world, player_start(vec3(16.0, 16.0, 16.0))], textures())
}

/// The sealed room with its +x wall missing.
pub fn leaky_room() -> MapData {
    let mut brushes = room_brushes(128.0, 16.0);
    brushes.remove(3);
    let world = MapEntity::new("worldspawn").with_brushes(brushes);
    MapData::new(vec![world, player_start(vec3(16.0, 16.0, 16.0))], textures())
}

pub fn single_cube(size: f64) -> MapData {
    let world = MapEntity::new("worldspawn").with_brushes(vec![box_brush([0.0; 3], [size; 3], WALL)]);
    MapData::new(vec![world], textures())
}

pub fn assert_near(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 0.001, "expected {}, got {}", expected, actual);
}

/// Parse the coordinates of every `( x y z )` group on a portal line.
pub fn parse_portal_points(line: &str) -> Vec<Vec3> {
    line.split('(')
        .skip(1)
        .map(|group| {
            let coords: Vec<f64> = group
                .trim_end()
                .trim_end_matches(')')
                .split_whitespace()
                .map(|v| v.parse().unwrap())
                .collect();
            vec3(coords[0], coords[1], coords[2])
        })
        .collect()
}
