use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use parsegql_core::remote::{HttpStore, Store};

use crate::cli::validator::{duration, endpoint_valid};
use crate::cnf::DEFAULT_ENDPOINT;

const TARGET: &str = "parsegql::cli";

#[derive(Args, Debug)]
pub(crate) struct StoreConnectionArguments {
	#[arg(help = "The Parse server endpoint to connect to")]
	#[arg(env = "PARSE_SERVER_URL", short = 'e', long = "endpoint")]
	#[arg(default_value = DEFAULT_ENDPOINT)]
	#[arg(value_parser = endpoint_valid)]
	pub(crate) endpoint: String,
	#[arg(help = "The application id of the Parse application")]
	#[arg(env = "PARSE_APPLICATION_ID", long = "app-id")]
	pub(crate) application_id: String,
	#[arg(help = "The REST API key used to serve requests")]
	#[arg(env = "PARSE_REST_API_KEY", long = "rest-api-key")]
	pub(crate) rest_api_key: Option<String>,
	#[arg(help = "The master key used to read the class schemas and cloud functions")]
	#[arg(env = "PARSE_MASTER_KEY", long = "master-key", hide_env_values = true)]
	pub(crate) master_key: Option<String>,
	#[arg(help = "The maximum duration of a single request to the Parse server")]
	#[arg(env = "PARSEGQL_REMOTE_TIMEOUT", long = "remote-timeout")]
	#[arg(value_parser = duration)]
	pub(crate) remote_timeout: Option<Duration>,
}

impl StoreConnectionArguments {
	fn base(&self) -> Result<HttpStore> {
		let store = HttpStore::new(&self.endpoint, &self.application_id)?;
		Ok(match self.remote_timeout {
			Some(timeout) => store.with_timeout(timeout)?,
			None => store,
		})
	}

	/// The client which serves GraphQL requests, authenticated with the REST API key.
	pub(crate) fn client(&self) -> Result<Arc<dyn Store>> {
		let store = match &self.rest_api_key {
			Some(key) => self.base()?.with_rest_api_key(key),
			None => self.base()?,
		};
		Ok(Arc::new(store))
	}

	/// The client which reads the class schemas and functions. Falls back to
	/// the request client when no master key is configured.
	pub(crate) fn admin(&self) -> Result<Arc<dyn Store>> {
		match &self.master_key {
			Some(key) => Ok(Arc::new(self.base()?.with_master_key(key))),
			None => {
				warn!(target: TARGET, "No master key configured, the schema endpoints may reject the request");
				self.client()
			}
		}
	}
}
