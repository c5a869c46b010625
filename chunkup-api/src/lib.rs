use std::{sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, MatchedPath},
    http::Request,
    response::{Redirect, Response},
    routing::get,
    Json, Router,
};
use chunkup_core::runtime::Runtime;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{info_span, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_scalar::{Scalar, Servable};

mod info;
mod upload;

pub use upload::CompleteUploadRequest;

const CHUNKUP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(OpenApi)]
#[openapi()]
struct ApiDoc;

fn set_api_docs_info(mut openapi: utoipa::openapi::OpenApi) -> utoipa::openapi::OpenApi {
    openapi.info.title = "Chunkup API".to_string();
    openapi.info.version = CHUNKUP_VERSION.to_string();
    openapi.info.description = Some("Chunked file upload and reassembly".to_string());

    openapi
}

/// Builds the full application router around a shared [`Runtime`].
pub fn setup_router(runtime: Arc<Runtime>) -> Router {
    let (router, api_docs) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(upload::upload_chunk))
        .routes(routes!(upload::completed_chunks))
        .routes(routes!(info::service_info))
        .split_for_parts();
    let api_docs = set_api_docs_info(api_docs);
    let openapi_json = api_docs.clone();

    let router = router
        .merge(Scalar::with_url("/scalar/", api_docs))
        .route("/scalar", get(|| async { Redirect::to("/scalar/") }))
        .route(
            "/api/openapi.json",
            get(move || {
                let openapi_json = openapi_json.clone();
                async move { Json(openapi_json) }
            }),
        )
        // Chunk payloads beyond the cap are truncated by the store, not refused here.
        .layer(DefaultBodyLimit::disable())
        .with_state(runtime);

    with_trace_layer(router)
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn setup_tracing(log_level: &str) {
    let level = log_level.to_ascii_lowercase();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level.
                format!(
                    "{}={level},chunkup_core={level},tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn with_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let matched_path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);

                info_span!(
                    "http_request",
                    method = ?request.method(),
                    matched_path,
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {
                tracing::info!("Request Received.");
            })
            .on_response(|response: &Response, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    "Response Completed. Duration: {:?}",
                    latency
                );
            })
            .on_failure(
                |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    tracing::error!("Request failed: {}", error)
                },
            ),
    )
}
