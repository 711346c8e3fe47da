use axum::Router;
use axum::response::IntoResponse;
use axum::routing::get;
use http::StatusCode;

use super::AppState;

pub(super) fn router() -> Router<AppState> {
	Router::new().route("/health", get(handler))
}

async fn handler() -> impl IntoResponse {
	StatusCode::OK
}
