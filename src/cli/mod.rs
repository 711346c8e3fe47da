mod abstraction;
pub(crate) mod config;
mod export;
mod schema;
mod start;
pub(crate) mod validator;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
pub use config::CF;
use export::ExportCommandArguments;
use schema::SchemaCommandArguments;
use start::StartCommandArguments;
use tracing_subscriber::EnvFilter;

use crate::cnf::PKG_VERSION;
use crate::telemetry;

const INFO: &str = "
To get started using parsegql, point it at a Parse server and start the gateway:

  parsegql start --endpoint https://api.parse.com --app-id <id> --rest-api-key <key> --master-key <key>

Then send GraphQL requests to http://localhost:8080/graphql.
";

#[derive(Parser, Debug)]
#[command(name = "parsegql command-line interface and server", bin_name = "parsegql")]
#[command(version = PKG_VERSION, about = INFO)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[arg(help = "The logging level for the command-line tool")]
	#[arg(env = "PARSEGQL_LOG", long = "log", global = true)]
	#[arg(default_value = "info")]
	#[arg(value_parser = validator::log_valid)]
	log: String,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	#[command(about = "Start the GraphQL gateway")]
	Start(StartCommandArguments),
	#[command(about = "Print the GraphQL schema generated from the Parse server")]
	Schema(SchemaCommandArguments),
	#[command(about = "Export every row of a class as one JSON object per line")]
	Export(ExportCommandArguments),
}

pub async fn init() -> ExitCode {
	let args = Cli::parse();
	// A RUST_LOG filter takes precedence over the --log level
	let telemetry = match EnvFilter::try_from_default_env() {
		Ok(filter) => telemetry::builder().with_filter(filter),
		Err(_) => telemetry::builder().with_log_level(&args.log),
	};
	if let Err(e) = telemetry.init() {
		eprintln!("Unable to initialise logging: {e}");
		return ExitCode::FAILURE;
	}
	let output = match args.command {
		Commands::Start(args) => start::init(args).await,
		Commands::Schema(args) => schema::init(args).await,
		Commands::Export(args) => export::init(args).await,
	};
	if let Err(e) = output {
		error!("{e:#}");
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}
