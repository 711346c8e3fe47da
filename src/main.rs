//! This binary is the command-line interface and web server for parsegql.
//!
//! It exposes the classes and cloud functions of a Parse-compatible object
//! store as a GraphQL API. The engine lives in `parsegql-core`; this crate
//! adds the command line, the HTTP transport and telemetry.

#[macro_use]
extern crate tracing;

mod cli;
mod cnf;
mod err;
mod net;
mod telemetry;

use std::process::ExitCode;

fn main() -> ExitCode {
	let runtime = match tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.thread_name("parsegql-worker")
		.build()
	{
		Ok(runtime) => runtime,
		Err(e) => {
			eprintln!("Unable to start the async runtime: {e}");
			return ExitCode::FAILURE;
		}
	};
	runtime.block_on(cli::init())
}
