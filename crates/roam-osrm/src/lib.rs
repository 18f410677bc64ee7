//! OSRM routing daemon client
//!
//! One job: ask the external routing daemon for a driving route between two
//! WGS84 points and hand back `(distance, duration, line)` or a discriminated
//! failure reason. The client never retries and never post-processes the
//! line - both are caller concerns.
//!
//! # Protocol
//!
//! ```text
//! GET {base}/route/v1/driving/{oLon},{oLat};{dLon},{dLat}?overview=full&geometries=geojson
//! -> {"code": "Ok", "routes": [{"distance": ..., "duration": ..., "geometry": {...}}]}
//! ```
//!
//! Success iff `code == "Ok"` and the first route carries a line of at least
//! two positions.

mod client;
mod error;

pub use client::{Route, RouteOutcome, RouteRequest, RoutingClient};
pub use error::{OsrmError, RouteFailure};
