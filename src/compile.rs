//! The compile driver: every hull of every brush entity, world first.

use std::fs;
use std::path::{Path, PathBuf};

use cgmath::Zero;
use log::{debug, info};

use crate::bounds::Bounds;
use crate::brush::load_entity;
use crate::bsp::{gather_node_faces, solid_bsp};
use crate::context::{CompileContext, CompileOptions};
use crate::csg::csg_faces;
use crate::error::{CompileError, Diagnostics, Result};
use crate::export::{export_clip_nodes, export_draw_nodes, export_node_planes, make_face_edges, BspData};
use crate::map::MapData;
use crate::math::Vec3;
use crate::merge::merge_all;
use crate::outside::{fill_outside, FillOutcome, LeakTrail};
use crate::plane::PlaneRegistry;
use crate::portals::portalize;
use crate::prtfile::portal_file;

/// Everything a compile produces.
#[derive(Clone, Debug)]
pub struct CompileOutput {
    pub bsp: BspData,
    /// The plane registry the trees were built with.
    pub planes: PlaneRegistry,
    /// Portal file text for the vis stage.
    pub portal_file: Option<String>,
    /// Hull 0 leak trail, when the world leaks.
    pub leak: Option<LeakTrail>,
    pub diagnostics: Diagnostics,
    /// Whether the T-junction fixer should run on the result.
    pub tjunc: bool,
}

impl CompileOutput {
    pub fn leaked(&self) -> bool {
        self.leak.is_some()
    }

    /// Write the `.prt`, `.pts` and `.por` files next to `base`. Returns
    /// the paths written.
    pub fn write_files(&self, base: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if let Some(text) = &self.portal_file {
            files.push((base.with_extension("prt"), text.clone()));
        }
        if let Some(leak) = &self.leak {
            files.push((base.with_extension("pts"), leak.pts_text()));
            if let Some(por) = &leak.por {
                files.push((base.with_extension("por"), por.clone()));
            }
        }

        let mut written = Vec::with_capacity(files.len());
        for (path, text) in files {
            fs::write(&path, text).map_err(|source| CompileError::Io { path: path.clone(), source })?;
            info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Text outputs carried between entities and hulls.
#[derive(Default)]
struct Products {
    portal_file: Option<String>,
    leak: Option<LeakTrail>,
}

struct Compiler<'a> {
    ctx: CompileContext,
    map: &'a MapData,
    bsp: BspData,
    products: Products,
}

impl<'a> Compiler<'a> {
    fn process_entity(&mut self, entity: usize, model: usize, hull: usize) -> Result<()> {
        let is_world = entity == 0;
        let ctx = &mut self.ctx;

        let loaded = load_entity(ctx, self.map, entity, hull)?;
        if loaded.brushes.is_empty() && (is_world || hull != 0) {
            return Err(CompileError::invariant(
                "process entity",
                format!("entity {} has no valid brushes in hull {}", entity, hull),
            ));
        }
        let bounds = if loaded.bounds.is_valid() {
            loaded.bounds
        } else {
            Bounds::new(Vec3::zero(), Vec3::zero())
        };

        // a perfect skin of the model with no hidden faces
        let surfaces = csg_faces(ctx, &loaded.brushes)?;

        if hull != 0 {
            let mut tree = solid_bsp(ctx, &bounds, surfaces, true, hull)?;
            if is_world && !ctx.options.nofill {
                let graph = portalize(ctx, &mut tree, hull)?;
                if fill_outside(ctx, &mut tree, &graph, self.map, hull)?.filled() {
                    let surfaces = gather_node_faces(&tree)?;
                    tree = solid_bsp(ctx, &bounds, surfaces, false, hull)?;
                }
            }
            let plane_map = export_node_planes(&mut self.bsp, &tree, &ctx.planes);
            return export_clip_nodes(ctx, &mut self.bsp, &tree, model, hull, &plane_map);
        }

        // bmodels get a good tree straight away, the world is rebuilt after
        // the fill anyway
        let midsplit = is_world && !ctx.options.force_good_tree;
        let mut tree = solid_bsp(ctx, &bounds, surfaces, midsplit, hull)?;

        if is_world {
            let graph = portalize(ctx, &mut tree, hull)?;
            self.products.portal_file = Some(portal_file(&tree, &graph, &ctx.planes)?);

            if !ctx.options.nofill {
                match fill_outside(ctx, &mut tree, &graph, self.map, hull)? {
                    FillOutcome::Filled { .. } => {
                        let mut surfaces = gather_node_faces(&tree)?;
                        merge_all(&mut surfaces, &ctx.planes, &mut ctx.diagnostics);
                        tree = solid_bsp(ctx, &bounds, surfaces, false, hull)?;

                        // the real portals for vis
                        let graph = portalize(ctx, &mut tree, hull)?;
                        self.products.portal_file = Some(portal_file(&tree, &graph, &ctx.planes)?);
                    }
                    FillOutcome::Leaked { trail, .. } => self.products.leak = trail,
                    FillOutcome::NoOccupants => {}
                }
            }
        }

        let plane_map = export_node_planes(&mut self.bsp, &tree, &ctx.planes);
        let faces = make_face_edges(ctx, &mut self.bsp, &tree, &plane_map)?;
        export_draw_nodes(ctx, &mut self.bsp, &tree, model, &plane_map, &faces)
    }
}

/// Compile a map: CSG, BSP, portals and outside fill for every hull of the
/// world and of every brush entity.
///
/// Leaks are not errors. The output then carries the first pass tree, its
/// portal file and the leak trail.
pub fn compile(map: &MapData, options: CompileOptions) -> Result<CompileOutput> {
    let ctx = CompileContext::new(options, map.texinfo.clone());
    let mut bsp = BspData::new(ctx.game);

    // the world, then every entity with brushes of its own
    let entities: Vec<usize> = map
        .entities
        .iter()
        .enumerate()
        .filter(|(index, entity)| *index == 0 || (!entity.brushes.is_empty() && !entity.merges_into_world()))
        .map(|(index, _)| index)
        .collect();
    if entities.is_empty() {
        return Err(CompileError::invariant("compile", "map has no world entity"));
    }

    let total_hulls = ctx.game.hulls().len();
    for _ in &entities {
        bsp.add_model(total_hulls);
    }
    let hulls = if ctx.options.noclip { 1 } else { total_hulls };

    let mut compiler = Compiler { ctx, map, bsp, products: Products::default() };
    for hull in 0..hulls {
        info!("Processing hull {}...", hull);
        for (model, &entity) in entities.iter().enumerate() {
            if entity != 0 && hull == 0 {
                info!("MODEL: *{}", model);
            }
            debug!("entity {} as model {} in hull {}", entity, model, hull);
            compiler.process_entity(entity, model, hull)?;
        }
    }

    let Compiler { ctx, bsp, products, .. } = compiler;
    ctx.diagnostics.log_summary();

    let output = CompileOutput {
        bsp,
        planes: ctx.planes,
        portal_file: products.portal_file,
        leak: products.leak,
        diagnostics: ctx.diagnostics,
        tjunc: ctx.options.tjunc,
    };
    if let Some(base) = &ctx.options.output_base {
        output.write_files(base)?;
    }
    Ok(output)
}
