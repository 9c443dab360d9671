//! Route table and middleware stack.

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa_swagger_ui::{Config, SwaggerUi};
use uuid::Uuid;

use crate::handlers::{documents, highlights, lenses, projects, system};
use crate::openapi::openapi_yaml;
use crate::state::AppState;

/// Time-ordered request ids for `x-request-id`.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Router settings that don't live in [`AppState`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub allowed_origins: Vec<HeaderValue>,
    pub max_upload_bytes: usize,
}

pub fn build_router(state: AppState, config: RouterConfig) -> Router {
    let api = Router::new()
        .route(
            "/api/v1/lenses",
            get(lenses::list_lenses).post(lenses::create_lens),
        )
        .route(
            "/api/v1/lenses/:id",
            get(lenses::get_lens)
                .patch(lenses::update_lens)
                .delete(lenses::delete_lens),
        )
        .route(
            "/api/v1/lenses/:id/colors",
            axum::routing::post(lenses::add_lens_color),
        )
        .route(
            "/api/v1/lenses/:id/colors/:color_id",
            axum::routing::patch(lenses::update_lens_color).delete(lenses::delete_lens_color),
        )
        .route(
            "/api/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/v1/projects/:id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/api/v1/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/api/v1/documents/:id",
            get(documents::get_document)
                .patch(documents::update_document)
                .delete(documents::delete_document),
        )
        .route(
            "/api/v1/documents/:id/pdf",
            get(documents::download_pdf).put(documents::upload_pdf),
        )
        .route(
            "/api/v1/documents/:id/highlights",
            get(highlights::list_highlights).post(highlights::create_highlight),
        )
        .route(
            "/api/v1/documents/:id/highlights/:highlight_id",
            axum::routing::patch(highlights::update_highlight)
                .delete(highlights::delete_highlight),
        )
        .route("/api/v1/legacy-colors", get(system::list_legacy_colors))
        .route("/api/v1/rate-limit/status", get(system::rate_limit_status))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(system::health_check))
        .route("/openapi.yaml", get(serve_openapi))
        .merge(
            SwaggerUi::new("/docs").config(
                Config::new(["/openapi.yaml"])
                    .try_it_out_enabled(true)
                    .display_request_duration(true),
            ),
        )
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(cors_layer(config.allowed_origins))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .with_state(state)
}

/// CORS restricted to an explicit origin allow-list.
fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            warn!(subsystem = "api", component = "rate_limit", "Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests. Please wait before retrying.",
                    "kind": "rate_limit_exceeded",
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn serve_openapi() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], openapi_yaml())
}
