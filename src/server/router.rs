//! Router for everything that is not a media stream.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use super::ServerContext;
use crate::streaming::CATALOG_PATH;

/// `GET /library.json` plus static files from the serve root.
pub fn build_router(ctx: ServerContext) -> Router {
    let static_files = ServeDir::new(&ctx.media.serve_root);

    Router::new()
        .route(CATALOG_PATH, get(catalog))
        .fallback_service(static_files)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCEPT_RANGES,
            HeaderValue::from_static("bytes"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn catalog(State(ctx): State<ServerContext>) -> Response {
    Json(ctx.snapshot.as_ref()).into_response()
}
