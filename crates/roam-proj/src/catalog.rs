//! Static catalog of coordinate reference systems
//!
//! The catalog ships the reference systems the batch pipeline encounters in
//! practice: global geographic, Web Mercator, and the common European
//! national grids. Loaded once at startup, read-only afterwards.

use serde::Serialize;

/// An immutable coordinate reference descriptor
#[derive(Debug, Clone, Serialize)]
pub struct CrsDescriptor {
    /// Identifier, e.g. "EPSG:4326"
    pub code: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Region of applicability
    pub region: &'static str,
    /// Geodetic datum
    pub datum: &'static str,
    /// proj4-style definition string
    pub proj4: &'static str,
}

/// Process-wide catalog of reference descriptors
#[derive(Debug)]
pub struct CrsCatalog {
    entries: Vec<CrsDescriptor>,
}

impl CrsCatalog {
    /// Build the built-in catalog
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.to_vec(),
        }
    }

    /// Look up a descriptor by identifier (case-insensitive)
    pub fn get(&self, code: &str) -> Option<&CrsDescriptor> {
        self.entries
            .iter()
            .find(|d| d.code.eq_ignore_ascii_case(code))
    }

    /// All descriptors
    pub fn all(&self) -> &[CrsDescriptor] {
        &self.entries
    }

    /// Descriptors matching an optional region and an optional
    /// case-insensitive substring search over code and name
    pub fn filter(&self, region: Option<&str>, search: Option<&str>) -> Vec<&CrsDescriptor> {
        let search_lower = search.map(str::to_ascii_lowercase);
        self.entries
            .iter()
            .filter(|d| match region {
                Some(r) => d.region.eq_ignore_ascii_case(r),
                None => true,
            })
            .filter(|d| match &search_lower {
                Some(s) => {
                    d.code.to_ascii_lowercase().contains(s)
                        || d.name.to_ascii_lowercase().contains(s)
                }
                None => true,
            })
            .collect()
    }

    /// Number of catalog entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CrsCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN: &[CrsDescriptor] = &[
    CrsDescriptor {
        code: "EPSG:4326",
        name: "WGS 84",
        region: "Global",
        datum: "WGS84",
        proj4: "+proj=longlat +datum=WGS84 +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:3857",
        name: "WGS 84 / Pseudo-Mercator",
        region: "Global",
        datum: "WGS84",
        proj4: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:4258",
        name: "ETRS89",
        region: "Europe",
        datum: "ETRS89",
        proj4: "+proj=longlat +ellps=GRS80 +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:25832",
        name: "ETRS89 / UTM zone 32N",
        region: "Europe",
        datum: "ETRS89",
        proj4: "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:25833",
        name: "ETRS89 / UTM zone 33N",
        region: "Europe",
        datum: "ETRS89",
        proj4: "+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:32632",
        name: "WGS 84 / UTM zone 32N",
        region: "Global",
        datum: "WGS84",
        proj4: "+proj=utm +zone=32 +datum=WGS84 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:32633",
        name: "WGS 84 / UTM zone 33N",
        region: "Global",
        datum: "WGS84",
        proj4: "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:2154",
        name: "RGF93 / Lambert-93",
        region: "France",
        datum: "RGF93",
        proj4: "+proj=lcc +lat_1=49 +lat_2=44 +lat_0=46.5 +lon_0=3 +x_0=700000 +y_0=6600000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:27700",
        name: "OSGB36 / British National Grid",
        region: "United Kingdom",
        datum: "OSGB36",
        proj4: "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:28992",
        name: "Amersfoort / RD New",
        region: "Netherlands",
        datum: "Amersfoort",
        proj4: "+proj=sterea +lat_0=52.15616055555555 +lon_0=5.38763888888889 +k=0.9999079 +x_0=155000 +y_0=463000 +ellps=bessel +towgs84=565.417,50.3319,465.552,-0.398957,0.343988,-1.8774,4.0725 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:31370",
        name: "Belge 1972 / Belgian Lambert 72",
        region: "Belgium",
        datum: "Belge 1972",
        proj4: "+proj=lcc +lat_1=51.16666723333333 +lat_2=49.8333339 +lat_0=90 +lon_0=4.367486666666666 +x_0=150000.013 +y_0=5400088.438 +ellps=intl +towgs84=-106.869,52.2978,-103.724,0.3366,-0.457,1.8422,-1.2747 +units=m +no_defs",
    },
    CrsDescriptor {
        code: "EPSG:21781",
        name: "CH1903 / LV03",
        region: "Switzerland",
        datum: "CH1903",
        proj4: "+proj=somerc +lat_0=46.95240555555556 +lon_0=7.439583333333333 +k_0=1 +x_0=600000 +y_0=200000 +ellps=bessel +towgs84=674.374,15.056,405.346,0,0,0,0 +units=m +no_defs",
    },
];

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;
