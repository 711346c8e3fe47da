//! The capability the engine needs from a remote object store.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::catalog::{ClassSchema, FunctionDescriptor, Row};
use crate::err::Error;

mod http;
mod iter;
mod mem;

pub use http::HttpStore;
pub use iter::QueryIter;
pub use mem::{FunctionHandler, MemoryStore};

/// A filtered, ordered and paginated class query.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QuerySpec {
	/// Equality constraints or an explicit predicate, sent as the `where` clause
	pub filter: Row,
	pub limit: usize,
	/// Comma separated keys, `-` prefixed for descending order
	pub order: String,
	pub skip: usize,
	/// Restricts the returned keys
	pub keys: Option<String>,
	/// Pointer fields the store should expand inline
	pub include: Option<String>,
}

impl QuerySpec {
	pub fn new(limit: usize) -> Self {
		Self {
			limit,
			..Default::default()
		}
	}
}

/// Details of a user account to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewUser {
	pub username: String,
	pub password: String,
	pub email: String,
}

/// Login credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

/// A client of the remote object store.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait Store: Debug + Send + Sync {
	/// Fetches every class schema
	async fn fetch_schema(&self) -> Result<Vec<ClassSchema>, Error>;

	/// Fetches the list of server side functions
	async fn fetch_functions(&self) -> Result<Vec<FunctionDescriptor>, Error>;

	/// Fetches one row by identifier, failing with [`Error::NotFound`]
	async fn get_row(&self, class: &str, id: &str) -> Result<Row, Error>;

	/// Runs a query, returning rows in store order
	async fn query_rows(&self, class: &str, spec: &QuerySpec) -> Result<Vec<Row>, Error>;

	/// Calls a function, returning the raw response envelope
	async fn invoke_function(&self, name: &str, argument: Option<&Row>) -> Result<Bytes, Error>;

	async fn create_user(&self, user: &NewUser) -> Result<Row, Error>;

	async fn log_in(&self, credentials: &Credentials) -> Result<Row, Error>;

	/// Fetches the user owning the session this client is scoped to
	async fn current_user(&self) -> Result<Row, Error>;

	/// Returns a client with the same surface, bound to a session token
	fn with_session(&self, token: &str) -> Arc<dyn Store>;
}
