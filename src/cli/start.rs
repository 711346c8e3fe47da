use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Args;
use parsegql_core::gql::load_schema;

use super::abstraction::StoreConnectionArguments;
use super::config::{CF, Config};
use super::validator::duration;
use crate::cnf::{DEFAULT_BIND, PKG_NAME, PKG_VERSION};
use crate::net;

const TARGET: &str = "parsegql::cli::start";

#[derive(Args, Debug)]
pub struct StartCommandArguments {
	#[command(flatten)]
	conn: StoreConnectionArguments,
	#[arg(help = "The hostname or IP address to listen for connections on")]
	#[arg(env = "PARSEGQL_BIND", short = 'b', long = "bind")]
	#[arg(default_value = DEFAULT_BIND)]
	listen_address: SocketAddr,
	#[arg(help = "The maximum duration of a GraphQL request, after which pending remote calls are cancelled")]
	#[arg(env = "PARSEGQL_REQUEST_TIMEOUT", long = "request-timeout")]
	#[arg(value_parser = duration)]
	request_timeout: Option<Duration>,
	#[arg(help = "Whether to serve the GraphiQL IDE on GET requests to the GraphQL endpoint")]
	#[arg(env = "PARSEGQL_GRAPHIQL", long = "graphiql")]
	#[arg(default_value_t = false)]
	graphiql: bool,
}

pub async fn init(
	StartCommandArguments {
		conn,
		listen_address,
		request_timeout,
		graphiql,
	}: StartCommandArguments,
) -> Result<()> {
	info!(target: TARGET, "Running {PKG_NAME} {PKG_VERSION} against {}", conn.endpoint);
	// Store the server configuration
	CF.set(Config {
		bind: listen_address,
		request_timeout,
		graphiql,
	})
	.map_err(|_| anyhow!("The server configuration was already set"))?;
	// Read the class schemas and functions with the admin client
	let admin = conn.admin()?;
	let schema = load_schema(admin.as_ref(), conn.client()?).await?;
	// Start the web server
	net::init(schema).await
}
