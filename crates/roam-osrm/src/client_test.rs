//! Routing client tests against an in-process mock daemon

use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use super::*;

/// Bind a mock daemon on a random port, return its base URL
async fn spawn_daemon(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn ok_body(distance: f64, duration: f64) -> String {
    format!(
        r#"{{"code":"Ok","routes":[{{"distance":{distance},"duration":{duration},"geometry":{{"type":"LineString","coordinates":[[2.35,48.85],[2.32,48.86],[2.29,48.87]]}}}}]}}"#
    )
}

fn client(base_url: &str) -> RoutingClient {
    RoutingClient::new(base_url, Duration::from_secs(5), Duration::ZERO).unwrap()
}

fn request() -> RouteRequest {
    RouteRequest {
        origin: (2.35, 48.85),
        destination: (2.29, 48.87),
    }
}

#[tokio::test]
async fn test_successful_route() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async { ok_body(1234.5, 300.0) }),
    );
    let base = spawn_daemon(router).await;

    let route = client(&base)
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(route.distance, 1234.5);
    assert_eq!(route.duration, 300.0);
    assert_eq!(route.line.len(), 3);
    assert_eq!(route.line[0], [2.35, 48.85]);
}

#[tokio::test]
async fn test_no_route_code() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async { r#"{"code":"NoRoute","routes":[],"message":"Impossible route"}"# }),
    );
    let base = spawn_daemon(router).await;

    let err = client(&base)
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::NoRoute);
    assert_eq!(err.reason(), "no_route");
}

#[tokio::test]
async fn test_invalid_query_code() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async { r#"{"code":"InvalidQuery","routes":[]}"# }),
    );
    let base = spawn_daemon(router).await;

    let err = client(&base)
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::InvalidRequest);
}

#[tokio::test]
async fn test_garbage_body() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async { "<html>not json</html>" }),
    );
    let base = spawn_daemon(router).await;

    let err = client(&base)
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::MalformedResponse);
}

#[tokio::test]
async fn test_ok_without_routes_is_malformed() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async { r#"{"code":"Ok","routes":[]}"# }),
    );
    let base = spawn_daemon(router).await;

    let err = client(&base)
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::MalformedResponse);
}

#[tokio::test]
async fn test_single_point_line_is_malformed() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async {
            r#"{"code":"Ok","routes":[{"distance":1.0,"duration":1.0,"geometry":{"coordinates":[[2.0,48.0]]}}]}"#
        }),
    );
    let base = spawn_daemon(router).await;

    let err = client(&base)
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::MalformedResponse);
}

#[tokio::test]
async fn test_unreachable_daemon() {
    // Bind a port, learn it, then free it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::Unreachable);
}

#[tokio::test]
async fn test_timeout() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            ok_body(1.0, 1.0)
        }),
    );
    let base = spawn_daemon(router).await;

    let client = RoutingClient::new(&base, Duration::from_millis(100), Duration::ZERO).unwrap();
    let err = client
        .calculate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, RouteFailure::Timeout);
}

#[tokio::test]
async fn test_pre_cancelled_skips_network() {
    // No daemon at all - a cancelled token must short-circuit
    let client = client("http://127.0.0.1:1");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.calculate(&request(), &cancel).await.unwrap_err();
    assert_eq!(err, RouteFailure::Cancelled);
}

#[tokio::test]
async fn test_cancellation_aborts_inflight() {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            ok_body(1.0, 1.0)
        }),
    );
    let base = spawn_daemon(router).await;

    let client = client(&base);
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.calculate(&request(), &cancel).await.unwrap_err();
    assert_eq!(err, RouteFailure::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_window_preserves_submission_order() {
    // The mock derives the distance from the origin longitude, so each
    // outcome identifies its request.
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|Path(coords): Path<String>| async move {
            let lon: f64 = coords.split(',').next().unwrap().parse().unwrap();
            if lon >= 99.0 {
                r#"{"code":"NoRoute","routes":[]}"#.to_string()
            } else {
                ok_body(lon * 1000.0, 60.0)
            }
        }),
    );
    let base = spawn_daemon(router).await;

    let requests: Vec<RouteRequest> = [1.0, 2.0, 99.0, 3.0, 4.0]
        .into_iter()
        .map(|lon| RouteRequest {
            origin: (lon, 48.0),
            destination: (lon + 0.1, 48.1),
        })
        .collect();

    let outcomes = client(&base)
        .calculate_window(&requests, &CancellationToken::new())
        .await;

    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes[0].as_ref().unwrap().distance, 1000.0);
    assert_eq!(outcomes[1].as_ref().unwrap().distance, 2000.0);
    assert_eq!(outcomes[2], Err(RouteFailure::NoRoute));
    assert_eq!(outcomes[3].as_ref().unwrap().distance, 3000.0);
    assert_eq!(outcomes[4].as_ref().unwrap().distance, 4000.0);
}

#[tokio::test]
async fn test_empty_window() {
    let client = client("http://127.0.0.1:1");
    let outcomes = client
        .calculate_window(&[], &CancellationToken::new())
        .await;
    assert!(outcomes.is_empty());
}
