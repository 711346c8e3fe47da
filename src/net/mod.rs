mod gql;
mod health;
pub(crate) mod signals;

use std::time::Duration;

use anyhow::{Context, Result};
use async_graphql::dynamic::Schema;
use axum::Router;
use http::HeaderValue;
use http::header::SERVER;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::cli::CF;
use crate::cnf::SERVER_NAME;

const TARGET: &str = "parsegql::net";

/// The state shared by every route.
#[derive(Clone)]
pub(crate) struct AppState {
	pub(crate) schema: Schema,
	pub(crate) request_timeout: Option<Duration>,
	pub(crate) graphiql: bool,
}

pub(crate) fn router(state: AppState) -> Router {
	Router::new()
		.merge(health::router())
		.merge(gql::router())
		.layer(TraceLayer::new_for_http())
		.layer(SetResponseHeaderLayer::if_not_present(SERVER, HeaderValue::from_static(SERVER_NAME)))
		.with_state(state)
}

pub async fn init(schema: Schema) -> Result<()> {
	// Get local copy of options
	let opt = CF.get().context("The server configuration has not been initialised")?;
	let state = AppState {
		schema,
		request_timeout: opt.request_timeout,
		graphiql: opt.graphiql,
	};
	let listener = TcpListener::bind(opt.bind)
		.await
		.with_context(|| format!("Unable to bind to {}", opt.bind))?;
	info!(target: TARGET, "Started web server on {}", opt.bind);
	axum::serve(listener, router(state)).with_graceful_shutdown(signals::shutdown()).await?;
	info!(target: TARGET, "Web server stopped. Bye!");
	Ok(())
}
