use std::path::PathBuf;

use crate::error::{Diagnostics, Warning};
use crate::game::{GameId, GameRules};
use crate::map::TexInfo;
use crate::plane::PlaneRegistry;

/// Options that change how the core compiles a map.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileOptions {
    pub game: GameId,
    /// Skip the outside fill. Leaks are tolerated silently.
    pub nofill: bool,
    /// Only build hull 0.
    pub noclip: bool,
    /// Passed through for the downstream T-junction fixer.
    pub tjunc: bool,
    /// Legacy texture axis selection, passed through to the texture projector.
    pub oldaxis: bool,
    /// Faces longer than this along a texture axis are cut in hull 0.
    pub subdivide: f64,
    /// Spacing between leak trail points.
    pub leak_dist: f64,
    /// Use the split-minimising heuristic on the first world pass as well.
    pub force_good_tree: bool,
    /// Portals between empty space and liquids are visible.
    pub transwater: bool,
    /// Portals between empty space and sky are visible.
    pub transsky: bool,
    /// Produce a `.por` leak diagnostic.
    pub bsp_leak: bool,
    /// Keep every portal centre in the leak trail instead of simplifying.
    pub old_leak: bool,
    /// When set, `compile` writes its text files next to this stem.
    pub output_base: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            game: GameId::Quake,
            nofill: false,
            noclip: false,
            tjunc: true,
            oldaxis: false,
            subdivide: 240.0,
            leak_dist: 2.0,
            force_good_tree: false,
            transwater: true,
            transsky: false,
            bsp_leak: false,
            old_leak: false,
            output_base: None,
        }
    }
}

/// State shared by every stage of one compile.
pub struct CompileContext {
    pub options: CompileOptions,
    pub game: &'static dyn GameRules,
    pub planes: PlaneRegistry,
    pub texinfo: Vec<TexInfo>,
    pub diagnostics: Diagnostics,
}

impl CompileContext {
    pub fn new(options: CompileOptions, texinfo: Vec<TexInfo>) -> CompileContext {
        let game = options.game.rules();
        CompileContext {
            options,
            game,
            planes: PlaneRegistry::new(),
            texinfo,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn warn(&mut self, warning: Warning) {
        self.diagnostics.push(warning);
    }

    pub fn texinfo(&self, index: usize) -> Option<&TexInfo> {
        self.texinfo.get(index)
    }
}
