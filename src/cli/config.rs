use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

pub static CF: OnceLock<Config> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct Config {
	pub bind: SocketAddr,
	pub request_timeout: Option<Duration>,
	pub graphiql: bool,
}
