//! Route geometry post-processing
//!
//! Reduces each routed polyline according to the job's geometry policy:
//! keep it, collapse it to the straight segment between its endpoints,
//! thin it with Douglas-Peucker, or drop it entirely (properties-only
//! features).
//!
//! Coordinates are `[lon, lat]` pairs in degrees throughout; simplification
//! tolerance is a perpendicular distance in the same degree units.

mod simplify;

use serde::{Deserialize, Serialize};

pub use simplify::douglas_peucker;

/// A polyline vertex as `[lon, lat]`
pub type Position = [f64; 2];

/// Geometry policy as submitted with a routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeometryPolicy {
    /// Write geometry into output features at all
    pub export_geometry: bool,
    /// Replace each route with its endpoint segment
    pub straight_line: bool,
    /// Thin each route with Douglas-Peucker
    pub simplify: bool,
    /// Perpendicular-distance threshold in degrees
    pub simplify_tolerance: Option<f64>,
}

impl Default for GeometryPolicy {
    fn default() -> Self {
        Self {
            export_geometry: true,
            straight_line: false,
            simplify: false,
            simplify_tolerance: None,
        }
    }
}

/// Resolved post-processing mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryMode {
    /// No geometry in the output
    Omit,
    /// Two-point segment from first to last vertex
    StraightLine,
    /// Douglas-Peucker with the given tolerance in degrees
    Simplify(f64),
    /// Full routed polyline, untouched
    Full,
}

impl GeometryMode {
    /// Resolve a submitted policy
    ///
    /// Straight-line wins when both reductions are requested; a missing,
    /// zero, or negative tolerance makes simplification the identity.
    pub fn from_policy(policy: &GeometryPolicy) -> Self {
        if !policy.export_geometry {
            Self::Omit
        } else if policy.straight_line {
            Self::StraightLine
        } else if policy.simplify {
            match policy.simplify_tolerance {
                Some(tolerance) if tolerance > 0.0 => Self::Simplify(tolerance),
                _ => Self::Full,
            }
        } else {
            Self::Full
        }
    }

    /// Apply the mode to a routed line
    ///
    /// Returns `None` under [`GeometryMode::Omit`]; otherwise the processed
    /// line. Vertex order is never changed.
    pub fn apply(&self, line: Vec<Position>) -> Option<Vec<Position>> {
        match self {
            Self::Omit => None,
            Self::Full => Some(line),
            Self::StraightLine => {
                if line.len() < 2 {
                    Some(line)
                } else {
                    Some(vec![line[0], line[line.len() - 1]])
                }
            }
            Self::Simplify(tolerance) => Some(douglas_peucker(line, *tolerance)),
        }
    }
}
