use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_graphql::dynamic::ResolverContext;
use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::{Name, Value as GqlValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{GqlError, internal_error};
use crate::err::Error;

const TARGET: &str = "parsegql::core::gql::utils";

/// Counts the remote calls made while serving one request.
#[derive(Debug, Default)]
pub struct QueryCounter(AtomicUsize);

impl QueryCounter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn increment(&self) {
		self.0.fetch_add(1, Ordering::Relaxed);
	}

	pub fn get(&self) -> usize {
		self.0.load(Ordering::Relaxed)
	}
}

/// Request scoped data made available to every resolver.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
	session: Option<String>,
	cancel: Option<CancellationToken>,
	counter: Option<Arc<QueryCounter>>,
}

impl RequestContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Scopes `me` to the given session token.
	pub fn with_session(mut self, token: impl Into<String>) -> Self {
		self.session = Some(token.into());
		self
	}

	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);
		self
	}

	pub fn with_counter(mut self, counter: Arc<QueryCounter>) -> Self {
		self.counter = Some(counter);
		self
	}

	pub fn session(&self) -> Option<&str> {
		self.session.as_deref()
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
	}

	/// Runs one remote call, aborting it if the request is cancelled.
	pub async fn remote<T>(
		&self,
		call: impl Future<Output = Result<T, Error>>,
	) -> Result<T, GqlError> {
		if self.is_cancelled() {
			return Err(GqlError::Cancelled);
		}
		if let Some(counter) = &self.counter {
			counter.increment();
		}
		match &self.cancel {
			None => Ok(call.await?),
			Some(token) => tokio::select! {
				biased;
				_ = token.cancelled() => {
					debug!(target: TARGET, "Remote call aborted by cancellation");
					Err(GqlError::Cancelled)
				}
				res = call => Ok(res?),
			},
		}
	}
}

pub(crate) fn request_context(ctx: &ResolverContext) -> RequestContext {
	ctx.data_opt::<RequestContext>().cloned().unwrap_or_default()
}

pub(crate) fn gql_to_json(v: GqlValue) -> Result<Value, GqlError> {
	v.into_json().map_err(|e| internal_error(format!("unable to convert argument: {e}")))
}

pub(crate) fn json_to_gql(v: Value) -> Result<GqlValue, GqlError> {
	GqlValue::from_json(v).map_err(|e| internal_error(format!("unable to convert value: {e}")))
}

pub(crate) fn args_to_json(
	args: &IndexMap<Name, GqlValue>,
) -> Result<Vec<(String, Value)>, GqlError> {
	args.iter().map(|(k, v)| Ok((k.to_string(), gql_to_json(v.clone())?))).collect()
}
