use std::io::Write;
use std::pin::pin;

use anyhow::Result;
use clap::Args;
use futures::TryStreamExt;
use parsegql_core::cnf::BULK_BATCH_SIZE;
use parsegql_core::remote::QueryIter;

use super::abstraction::StoreConnectionArguments;

const TARGET: &str = "parsegql::cli::export";

#[derive(Args, Debug)]
pub struct ExportCommandArguments {
	#[arg(help = "The class to export")]
	#[arg(index = 1)]
	class: String,
	#[arg(help = "The number of rows fetched per request")]
	#[arg(env = "PARSEGQL_BULK_BATCH_SIZE", long = "batch-size")]
	batch_size: Option<usize>,
	#[command(flatten)]
	conn: StoreConnectionArguments,
}

pub async fn init(
	ExportCommandArguments {
		class,
		batch_size,
		conn,
	}: ExportCommandArguments,
) -> Result<()> {
	let iter = QueryIter::new(conn.admin()?, &class)
		.with_batch_size(batch_size.unwrap_or(*BULK_BATCH_SIZE));
	let mut batches = pin!(iter.into_stream());
	let mut total = 0;
	while let Some(batch) = batches.try_next().await? {
		let mut out = std::io::stdout().lock();
		for row in &batch {
			serde_json::to_writer(&mut out, row)?;
			writeln!(out)?;
		}
		out.flush()?;
		total += batch.len();
		debug!(target: TARGET, %class, total, "Exported batch");
	}
	info!(target: TARGET, %class, total, "The class was exported successfully");
	Ok(())
}
