//! Forward transformation to WGS84
//!
//! Every incoming coordinate pair traverses the transform, including pairs
//! already in EPSG:4326 - a uniform pipeline beats a special case that only
//! saves one multiplication.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use proj4rs::Proj;

use crate::catalog::CrsDescriptor;
use crate::error::{ProjError, Result};

const WGS84_DEF: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Slack for floating-point drift at the envelope boundary
const ENVELOPE_EPS: f64 = 1e-9;

/// Transformer from catalog reference systems to WGS84 geographic
///
/// Compiled projections are cached by identifier. The cache lives for the
/// process; the catalog is static, so entries never go stale.
pub struct ProjTransformer {
    wgs84: Proj,
    cache: RwLock<HashMap<String, Arc<Proj>>>,
}

impl ProjTransformer {
    /// Create a transformer
    pub fn new() -> Self {
        // The WGS84 definition is a compile-time constant; if it failed to
        // parse nothing else in this crate could work either.
        let wgs84 = Proj::from_proj_string(WGS84_DEF)
            .unwrap_or_else(|e| panic!("builtin WGS84 definition rejected: {e}"));
        Self {
            wgs84,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Compile and cache a reference system's projection
    ///
    /// Called once per job before any row is processed, so a bad definition
    /// fails the job up front instead of failing every row.
    pub fn prepare(&self, crs: &CrsDescriptor) -> Result<()> {
        self.compiled(crs).map(|_| ())
    }

    /// Transform a planar `(x, y)` in the given reference system to
    /// WGS84 `(lon, lat)` degrees
    ///
    /// Rejects non-finite input, non-finite output, and output beyond the
    /// global WGS84 envelope.
    pub fn to_wgs84(&self, x: f64, y: f64, crs: &CrsDescriptor) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjError::OutOfRange { lon: x, lat: y });
        }

        let source = self.compiled(crs)?;

        // proj4rs speaks radians for geographic systems
        let mut point = if source.is_latlong() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&source, &self.wgs84, &mut point)
            .map_err(|e| ProjError::Transform(e.to_string()))?;

        let (lon, lat) = (point.0.to_degrees(), point.1.to_degrees());

        // The radian/degree round trip can overshoot the envelope by a few
        // ulps for points exactly on it; tolerate that and clamp back.
        if !lon.is_finite()
            || !lat.is_finite()
            || lon.abs() > 180.0 + ENVELOPE_EPS
            || lat.abs() > 90.0 + ENVELOPE_EPS
        {
            return Err(ProjError::OutOfRange { lon, lat });
        }

        Ok((lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)))
    }

    /// Number of compiled projections currently cached
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    fn compiled(&self, crs: &CrsDescriptor) -> Result<Arc<Proj>> {
        if let Some(proj) = self.cache.read().get(crs.code) {
            return Ok(Arc::clone(proj));
        }

        let proj = Arc::new(
            Proj::from_proj_string(crs.proj4).map_err(|e| ProjError::compile(crs.code, e))?,
        );

        self.cache
            .write()
            .entry(crs.code.to_string())
            .or_insert_with(|| Arc::clone(&proj));

        Ok(proj)
    }
}

impl Default for ProjTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "transformer_test.rs"]
mod transformer_test;
