//! BSP construction core of a Quake-family map compiler: brush expansion,
//! CSG, face merging, solid BSP building, portals, outside filling and leak
//! tracing, down to the in-memory BSP lumps.

pub mod math;
pub mod bounds;
pub mod sphere;
pub mod winding;
pub mod plane;
pub mod game;
pub mod map;
pub mod context;
pub mod error;
pub mod face;
pub mod brush;
pub mod csg;
pub mod merge;
pub mod tree;
pub mod bsp;
pub mod portals;
pub mod prtfile;
pub mod outside;
pub mod export;
pub mod compile;

#[cfg(feature = "python")]
mod python;

pub use compile::{compile, CompileOutput};
pub use context::{CompileContext, CompileOptions};
pub use error::{CompileError, Diagnostics, Result, Warning};
pub use export::BspData;
pub use map::{MapBrush, MapData, MapEntity, MapFace, TexFlags, TexInfo};
