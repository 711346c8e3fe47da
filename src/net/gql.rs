use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{BatchRequest, BatchResponse, Number, Request, Response, Value};
use async_graphql_axum::{GraphQLBatchRequest, GraphQLResponse};
use axum::Router;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use futures::future::join_all;
use http::{HeaderMap, HeaderName};
use parsegql_core::cnf::SESSION_HEADER;
use parsegql_core::gql::{QueryCounter, RequestContext};
use tokio_util::sync::CancellationToken;

use super::AppState;
use crate::cnf::{GRAPHQL_PATH, QUERIES_EXTENSION};
use crate::err::Error;

const TARGET: &str = "parsegql::net::gql";

pub(super) fn router() -> Router<AppState> {
	Router::new().route(GRAPHQL_PATH, get(graphiql).post(handler))
}

async fn graphiql(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
	if !state.graphiql {
		return Err(Error::NotFound(GRAPHQL_PATH.to_string()));
	}
	Ok(Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish()))
}

fn session(headers: &HeaderMap) -> Result<Option<String>, Error> {
	match headers.get(SESSION_HEADER) {
		None => Ok(None),
		Some(v) => match v.to_str() {
			Ok(token) => Ok(Some(token.to_string())),
			Err(e) => Err(Error::InvalidHeader(
				HeaderName::from_static("x-parse-session-token"),
				e.to_string(),
			)),
		},
	}
}

async fn handler(
	State(state): State<AppState>,
	headers: HeaderMap,
	req: GraphQLBatchRequest,
) -> Result<GraphQLResponse, Error> {
	let mut rc = RequestContext::new();
	if let Some(token) = session(&headers)? {
		rc = rc.with_session(token);
	}
	// Pending remote calls are abandoned once the client goes away
	let cancel = CancellationToken::new();
	let _guard = cancel.clone().drop_guard();
	if let Some(timeout) = state.request_timeout {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			tokio::select! {
				_ = tokio::time::sleep(timeout) => {
					debug!(target: TARGET, ?timeout, "Request timed out, cancelling remote calls");
					cancel.cancel();
				}
				_ = cancel.cancelled() => {}
			}
		});
	}
	let rc = rc.with_cancellation(cancel.clone());
	let res = match req.into_inner() {
		BatchRequest::Single(req) => BatchResponse::Single(execute(&state, req, rc).await),
		BatchRequest::Batch(reqs) => BatchResponse::Batch(
			join_all(reqs.into_iter().map(|req| execute(&state, req, rc.clone()))).await,
		),
	};
	Ok(GraphQLResponse::from(res))
}

async fn execute(state: &AppState, req: Request, rc: RequestContext) -> Response {
	let counter = Arc::new(QueryCounter::new());
	let req = req.data(rc.with_counter(counter.clone()));
	let mut res = state.schema.execute(req).await;
	let queries = counter.get();
	debug!(target: TARGET, queries, errors = res.errors.len(), "Executed GraphQL request");
	res.extensions.insert(QUERIES_EXTENSION.to_string(), Value::Number(Number::from(queries)));
	res
}
