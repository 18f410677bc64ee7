//! The routing client and its K-window batch helper

use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{OsrmError, RouteFailure};

/// One route query in WGS84 `(lon, lat)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Origin point
    pub origin: (f64, f64),
    /// Destination point
    pub destination: (f64, f64),
}

/// A successfully computed route
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Road distance in metres
    pub distance: f64,
    /// Travel time in seconds
    pub duration: f64,
    /// Road polyline as `[lon, lat]` positions, at least two
    pub line: Vec<[f64; 2]>,
}

/// Per-request outcome
pub type RouteOutcome = Result<Route, RouteFailure>;

/// Client for an OSRM-compatible routing daemon
///
/// Cheap to clone; the underlying connection pool is shared. Built once at
/// startup and reused by every dispatcher.
#[derive(Debug, Clone)]
pub struct RoutingClient {
    http: reqwest::Client,
    base_url: String,
    request_delay: Duration,
}

impl RoutingClient {
    /// Create a client against `base_url`
    ///
    /// `timeout` bounds each request end to end; `request_delay` staggers
    /// request launch inside a window (zero disables staggering).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        request_delay: Duration,
    ) -> Result<Self, OsrmError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("roam/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| OsrmError::Init(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_delay,
        })
    }

    /// The daemon base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Compute a single route
    ///
    /// Cancellation aborts the in-flight request and yields
    /// [`RouteFailure::Cancelled`].
    pub async fn calculate(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> RouteOutcome {
        if cancel.is_cancelled() {
            return Err(RouteFailure::Cancelled);
        }

        let url = self.route_url(request);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RouteFailure::Cancelled),
            result = self.http.get(&url).send() => {
                result.map_err(classify_transport_error)?
            }
        };

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(RouteFailure::Cancelled),
            result = response.bytes() => {
                result.map_err(classify_transport_error)?
            }
        };

        parse_response(&body)
    }

    /// Fire a window of requests concurrently, await them all, and return
    /// the outcomes in submission order
    ///
    /// This is the K-window: all requests fly at once, one row's failure
    /// never aborts its peers, and the window only completes when every
    /// request has settled.
    pub async fn calculate_window(
        &self,
        requests: &[RouteRequest],
        cancel: &CancellationToken,
    ) -> Vec<RouteOutcome> {
        let futures = requests.iter().enumerate().map(|(position, request)| {
            let stagger = self.request_delay * position as u32;
            async move {
                if !stagger.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RouteFailure::Cancelled),
                        _ = tokio::time::sleep(stagger) => {}
                    }
                }
                self.calculate(request, cancel).await
            }
        });

        // join_all returns results in input order regardless of completion
        // order, which gives the sink its submission-order guarantee.
        futures::future::join_all(futures).await
    }

    fn route_url(&self, request: &RouteRequest) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url,
            request.origin.0,
            request.origin.1,
            request.destination.0,
            request.destination.1,
        )
    }
}

/// Wire shape of the daemon's response
#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

fn classify_transport_error(error: reqwest::Error) -> RouteFailure {
    if error.is_timeout() {
        RouteFailure::Timeout
    } else if error.is_decode() {
        RouteFailure::MalformedResponse
    } else {
        // Connect, DNS, reset: the daemon is not answering
        RouteFailure::Unreachable
    }
}

fn parse_response(body: &[u8]) -> RouteOutcome {
    let response: OsrmResponse =
        serde_json::from_slice(body).map_err(|_| RouteFailure::MalformedResponse)?;

    if response.code != "Ok" {
        tracing::debug!(
            code = %response.code,
            message = response.message.as_deref().unwrap_or(""),
            "daemon returned non-Ok code"
        );
        return Err(match response.code.as_str() {
            "InvalidQuery" | "InvalidValue" | "InvalidOptions" | "InvalidUrl" => {
                RouteFailure::InvalidRequest
            }
            _ => RouteFailure::NoRoute,
        });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RouteFailure::MalformedResponse)?;

    if route.geometry.coordinates.len() < 2 {
        return Err(RouteFailure::MalformedResponse);
    }
    if route.distance < 0.0 || route.duration < 0.0 {
        return Err(RouteFailure::MalformedResponse);
    }
    if route
        .geometry
        .coordinates
        .iter()
        .any(|[lon, lat]| !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0)
    {
        return Err(RouteFailure::MalformedResponse);
    }

    Ok(Route {
        distance: route.distance,
        duration: route.duration,
        line: route.geometry.coordinates,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
