//! Per-game content rules and collision hull sizes.

use bitflags::bitflags;

use crate::math::Vec3;

/// Contents of a brush volume or a BSP leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Contents {
    Empty,
    Solid,
    Water,
    Slime,
    Lava,
    Sky,
    /// Collision-only brush. Never reaches a leaf.
    Clip,
    /// Visibility splitting brush. Never reaches a leaf.
    Hint,
}

impl Contents {
    pub fn is_liquid(self) -> bool {
        matches!(self, Contents::Water | Contents::Slime | Contents::Lava)
    }

    /// Volumes that can be seen into from empty space.
    pub fn is_visible_volume(self) -> bool {
        self.is_liquid() || self == Contents::Sky
    }

    /// Quake 1 style content code.
    pub fn q1_value(self) -> i32 {
        match self {
            Contents::Empty => -1,
            Contents::Solid => -2,
            Contents::Water => -3,
            Contents::Slime => -4,
            Contents::Lava => -5,
            Contents::Sky => -6,
            Contents::Clip => -7,
            Contents::Hint => -8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContentFlags(u32);

bitflags! {
    impl ContentFlags : u32 {
        /// Brush came from a func_detail entity.
        const DETAIL = 0x00000001;
    }
}

/// Half extents of a collision hull, as the box offsets added to a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HullSize {
    pub mins: [f64; 3],
    pub maxs: [f64; 3],
}

impl HullSize {
    pub const fn new(mins: [f64; 3], maxs: [f64; 3]) -> HullSize {
        HullSize { mins, maxs }
    }

    pub fn is_point(&self) -> bool {
        self.mins == [0.0; 3] && self.maxs == [0.0; 3]
    }

    pub fn mins_vec(&self) -> Vec3 {
        Vec3::new(self.mins[0], self.mins[1], self.mins[2])
    }

    pub fn maxs_vec(&self) -> Vec3 {
        Vec3::new(self.maxs[0], self.maxs[1], self.maxs[2])
    }
}

const POINT_HULL: HullSize = HullSize::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);

const QUAKE_HULLS: [HullSize; 3] = [
    POINT_HULL,
    HullSize::new([-16.0, -16.0, -32.0], [16.0, 16.0, 24.0]),
    HullSize::new([-32.0, -32.0, -64.0], [32.0, 32.0, 24.0]),
];

const HEXEN2_HULLS: [HullSize; 6] = [
    POINT_HULL,
    HullSize::new([-16.0, -16.0, -32.0], [16.0, 16.0, 24.0]),
    HullSize::new([-24.0, -24.0, -20.0], [24.0, 24.0, 20.0]),
    HullSize::new([-16.0, -16.0, -12.0], [16.0, 16.0, 16.0]),
    HullSize::new([-8.0, -8.0, -8.0], [8.0, 8.0, 8.0]),
    HullSize::new([-48.0, -48.0, -50.0], [48.0, 48.0, 50.0]),
];

const HALFLIFE_HULLS: [HullSize; 4] = [
    POINT_HULL,
    HullSize::new([-16.0, -16.0, -36.0], [16.0, 16.0, 36.0]),
    HullSize::new([-32.0, -32.0, -32.0], [32.0, 32.0, 32.0]),
    HullSize::new([-16.0, -16.0, -18.0], [16.0, 16.0, 18.0]),
];

const QUAKE2_HULLS: [HullSize; 1] = [POINT_HULL];

/// Quake 2 content bits.
const Q2_CONTENTS_SOLID: i32 = 1;
const Q2_CONTENTS_LAVA: i32 = 8;
const Q2_CONTENTS_SLIME: i32 = 16;
const Q2_CONTENTS_WATER: i32 = 32;
const Q2_CONTENTS_PLAYERCLIP: i32 = 0x10000;

/// Maximum clip nodes addressable by the Q1-family formats.
pub const MAX_BSP_CLIPNODES: usize = 0xfff0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameId {
    Quake,
    Hexen2,
    HalfLife,
    Quake2,
}

static GAME_NAMES: phf::Map<&'static str, GameId> = phf::phf_map! {
    "quake" => GameId::Quake,
    "q1" => GameId::Quake,
    "hexen2" => GameId::Hexen2,
    "h2" => GameId::Hexen2,
    "halflife" => GameId::HalfLife,
    "hl" => GameId::HalfLife,
    "quake2" => GameId::Quake2,
    "q2" => GameId::Quake2,
};

impl GameId {
    /// Look a game up by its command-line style name.
    pub fn from_name(name: &str) -> Option<GameId> {
        GAME_NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn rules(self) -> &'static dyn GameRules {
        match self {
            GameId::Quake => &Quake,
            GameId::Hexen2 => &Hexen2,
            GameId::HalfLife => &HalfLife,
            GameId::Quake2 => &Quake2,
        }
    }
}

fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len() && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Texture naming shared by the Quake 1 family. `liquid_prefix` starts a liquid texture name.
fn q1_contents_for_texture(name: &str, liquid_prefix: char) -> Contents {
    if name.eq_ignore_ascii_case("hint") || name.eq_ignore_ascii_case("hintskip") {
        return Contents::Hint;
    }
    if name.eq_ignore_ascii_case("clip") {
        return Contents::Clip;
    }
    if let Some(rest) = name.strip_prefix(liquid_prefix) {
        if has_prefix_ignore_case(rest, "lava") {
            return Contents::Lava;
        }
        if has_prefix_ignore_case(rest, "slime") {
            return Contents::Slime;
        }
        return Contents::Water;
    }
    if has_prefix_ignore_case(name, "sky") {
        return Contents::Sky;
    }
    Contents::Solid
}

/// Game specific rules queried by the compiler.
pub trait GameRules: Sync {
    fn id(&self) -> GameId;

    /// Collision hulls, hull 0 being the point hull used for drawing.
    fn hulls(&self) -> &'static [HullSize];

    /// Contents of a brush whose first face uses this texture.
    fn contents_for_texture(&self, name: &str) -> Contents;

    /// Higher priority contents win when a leaf sees faces of several contents.
    fn contents_priority(&self, contents: Contents) -> i32 {
        match contents {
            Contents::Solid => 6,
            Contents::Sky => 5,
            Contents::Lava => 4,
            Contents::Slime => 3,
            Contents::Water => 2,
            Contents::Clip | Contents::Hint => 1,
            Contents::Empty => 0,
        }
    }

    /// Contents given to a fragment of a `brush` face found inside `other`,
    /// or `None` to discard it.
    fn inside_face_contents(&self, brush: Contents, other: Contents) -> Option<Contents> {
        if brush == Contents::Solid && other.is_visible_volume() {
            Some(other)
        } else {
            None
        }
    }

    /// Content value written to the output leaves.
    fn native_contents(&self, contents: Contents) -> i32 {
        contents.q1_value()
    }

    /// Clip node ceiling, or `None` when the format has no clip hulls.
    fn max_clipnodes(&self) -> Option<usize> {
        Some(MAX_BSP_CLIPNODES)
    }
}

pub struct Quake;

impl GameRules for Quake {
    fn id(&self) -> GameId {
        GameId::Quake
    }

    fn hulls(&self) -> &'static [HullSize] {
        &QUAKE_HULLS
    }

    fn contents_for_texture(&self, name: &str) -> Contents {
        q1_contents_for_texture(name, '*')
    }
}

pub struct Hexen2;

impl GameRules for Hexen2 {
    fn id(&self) -> GameId {
        GameId::Hexen2
    }

    fn hulls(&self) -> &'static [HullSize] {
        &HEXEN2_HULLS
    }

    fn contents_for_texture(&self, name: &str) -> Contents {
        q1_contents_for_texture(name, '*')
    }
}

pub struct HalfLife;

impl GameRules for HalfLife {
    fn id(&self) -> GameId {
        GameId::HalfLife
    }

    fn hulls(&self) -> &'static [HullSize] {
        &HALFLIFE_HULLS
    }

    fn contents_for_texture(&self, name: &str) -> Contents {
        q1_contents_for_texture(name, '!')
    }
}

pub struct Quake2;

impl GameRules for Quake2 {
    fn id(&self) -> GameId {
        GameId::Quake2
    }

    fn hulls(&self) -> &'static [HullSize] {
        &QUAKE2_HULLS
    }

    fn contents_for_texture(&self, name: &str) -> Contents {
        // textures live in directories, "e1u1/water1" and friends
        let base = name.rsplit('/').next().unwrap_or(name);
        if base.eq_ignore_ascii_case("clip") {
            return Contents::Clip;
        }
        if base.eq_ignore_ascii_case("hint") {
            return Contents::Hint;
        }
        if has_prefix_ignore_case(base, "sky") {
            return Contents::Sky;
        }
        if has_prefix_ignore_case(base, "lava") {
            return Contents::Lava;
        }
        if has_prefix_ignore_case(base, "slime") {
            return Contents::Slime;
        }
        if has_prefix_ignore_case(base, "water") || base.starts_with('*') {
            return Contents::Water;
        }
        Contents::Solid
    }

    fn native_contents(&self, contents: Contents) -> i32 {
        match contents {
            Contents::Empty | Contents::Hint => 0,
            Contents::Solid | Contents::Sky => Q2_CONTENTS_SOLID,
            Contents::Water => Q2_CONTENTS_WATER,
            Contents::Slime => Q2_CONTENTS_SLIME,
            Contents::Lava => Q2_CONTENTS_LAVA,
            Contents::Clip => Q2_CONTENTS_PLAYERCLIP,
        }
    }

    fn max_clipnodes(&self) -> Option<usize> {
        None
    }
}
