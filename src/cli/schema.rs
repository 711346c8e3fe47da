use anyhow::Result;
use clap::Args;
use parsegql_core::gql::load_schema;

use super::abstraction::StoreConnectionArguments;

#[derive(Args, Debug)]
pub struct SchemaCommandArguments {
	#[command(flatten)]
	conn: StoreConnectionArguments,
}

pub async fn init(
	SchemaCommandArguments {
		conn,
	}: SchemaCommandArguments,
) -> Result<()> {
	let admin = conn.admin()?;
	let schema = load_schema(admin.as_ref(), conn.client()?).await?;
	println!("{}", schema.sdl());
	Ok(())
}
