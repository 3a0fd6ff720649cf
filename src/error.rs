//! Error and warning types

use std::fmt;
use std::path::PathBuf;

use log::{info, warn};
use thiserror::Error;

use crate::game::Contents;
use crate::math::Vec3;

/// A condition that stops the compile.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Geometry or output exceeds a hard format limit.
    #[error("{what}: {count} exceeds the limit of {limit}")]
    FormatLimit {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    /// An internal consistency check failed, usually from broken input geometry.
    #[error("{context}: {message}")]
    InvariantViolation {
        context: &'static str,
        message: String,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn invariant(context: &'static str, message: impl Into<String>) -> CompileError {
        CompileError::InvariantViolation { context, message: message.into() }
    }

    pub fn limit(what: &'static str, count: usize, limit: usize) -> CompileError {
        CompileError::FormatLimit { what, count, limit }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Where a brush came from in the source map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrushLocation {
    pub entity: usize,
    pub brush: usize,
    pub line: usize,
}

impl fmt::Display for BrushLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {}, brush {} (line {})", self.entity, self.brush, self.line)
    }
}

/// A recoverable problem. The compile carries on and the warning is reported at the end.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    Brush {
        location: BrushLocation,
        reason: String,
    },
    Leak {
        hull: usize,
        entity: usize,
        origin: Vec3,
        trail_points: usize,
    },
    NoFilling {
        hull: usize,
    },
    MixedContents {
        point: Vec3,
        chosen: Contents,
    },
    PortalClippedAway {
        node: usize,
    },
    TooManyMergePoints,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Brush { location, reason } => write!(f, "{}: {}", location, reason),
            Warning::Leak { hull, entity, origin, trail_points } => write!(
                f,
                "Hull {}: entity {} ({:.1} {:.1} {:.1}) is outside the world, leak trail has {} points",
                hull, entity, origin.x, origin.y, origin.z, trail_points
            ),
            Warning::NoFilling { hull } => {
                write!(f, "No entities in empty space, no filling performed for hull {}", hull)
            }
            Warning::MixedContents { point, chosen } => write!(
                f,
                "Mixed face contents in leafnode near ({:.2} {:.2} {:.2}), using {:?}",
                point.x, point.y, point.z, chosen
            ),
            Warning::PortalClippedAway { node } => {
                write!(f, "New portal for node {} was clipped away", node)
            }
            Warning::TooManyMergePoints => write!(f, "Too many points on merged face, merge skipped"),
        }
    }
}

/// Collects warnings over a whole compile.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn leaks(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(|w| matches!(w, Warning::Leak { .. }))
    }

    pub fn brush_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(|w| matches!(w, Warning::Brush { .. }))
    }

    /// Print every collected warning once.
    pub fn log_summary(&self) {
        if self.warnings.is_empty() {
            info!("No warnings");
            return;
        }
        info!("{} warning(s):", self.warnings.len());
        for warning in &self.warnings {
            info!("  {}", warning);
        }
    }
}
