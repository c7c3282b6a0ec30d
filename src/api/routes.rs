//! API Routes
//!
//! Configures the Axum router with all transit endpoints.

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    agencies_handler, agency_handler, availability_handler, health_handler, hits_handler,
    predictions_handler, route_handler, routes_handler, schedules_handler, stop_handler,
    stops_handler, times_handler, AppState,
};
use crate::stats::track_requests;

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Request statistics: every request is counted and timed
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/agencies", get(agencies_handler))
        .route("/agencies/:agency", get(agency_handler))
        .route("/agencies/:agency/routes", get(routes_handler))
        .route(
            "/agencies/:agency/routes/availability",
            get(availability_handler),
        )
        .route("/agencies/:agency/routes/:route", get(route_handler))
        .route("/agencies/:agency/routes/:route/stops", get(stops_handler))
        .route(
            "/agencies/:agency/routes/:route/stops/:stop",
            get(stop_handler),
        )
        .route(
            "/agencies/:agency/routes/:route/stops/:stop/predictions",
            get(predictions_handler),
        )
        .route(
            "/agencies/:agency/routes/:route/schedules",
            get(schedules_handler),
        )
        .route("/stats/hits", get(hits_handler))
        .route("/stats/times", get(times_handler));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(
            state.stats.clone(),
            track_requests,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::tests::test_state;
    use crate::transit::FakeUpstream;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(test_state(Arc::new(FakeUpstream::default())))
    }

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of(create_test_app(), "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_availability_not_captured_as_route() {
        let status = status_of(
            create_test_app(),
            "/api/agencies/sf-muni/routes/availability?time=12",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_not_found() {
        let status = status_of(create_test_app(), "/api/agencies/sf-muni/routes/F").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let status = status_of(create_test_app(), "/api/agencies/unknown/routes").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
