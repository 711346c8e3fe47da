use anyhow::Result;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Default, Debug)]
pub struct Builder {
	log_level: Option<String>,
	filter: Option<EnvFilter>,
}

pub fn builder() -> Builder {
	Builder::default()
}

impl Builder {
	/// Set the log level on the builder
	pub fn with_log_level(mut self, log_level: &str) -> Self {
		self.log_level = Some(log_level.to_string());
		self
	}

	/// Set the filter on the builder
	pub fn with_filter(mut self, filter: EnvFilter) -> Self {
		self.filter = Some(filter);
		self
	}

	/// Build a tracing dispatcher with a compact fmt layer writing to stderr
	pub fn build(self) -> Result<Box<dyn Subscriber + Send + Sync + 'static>> {
		let filter = match (self.filter, self.log_level) {
			(Some(filter), _) => filter,
			(None, Some(level)) => filter_from_value(&level)?,
			(None, None) => filter_from_value("info")?,
		};
		let registry = tracing_subscriber::registry().with(
			tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_target(true)
				.with_span_events(FmtSpan::NONE)
				.with_writer(std::io::stderr)
				.with_filter(filter),
		);
		Ok(Box::new(registry))
	}

	/// Install the subscriber globally
	pub fn init(self) -> Result<()> {
		self.build()?.try_init()?;
		Ok(())
	}
}

/// Create an EnvFilter from a log level or a list of filter directives
pub fn filter_from_value(v: &str) -> Result<EnvFilter, ParseError> {
	match v {
		// Don't show any logs at all
		"none" => EnvFilter::builder().parse("off"),
		// Otherwise, let's show everything including dependencies
		"full" => EnvFilter::builder().parse("trace"),
		// Otherwise, let's only show errors
		"error" => EnvFilter::builder().parse("error"),
		// Specify the log level for each code area
		"warn" | "info" | "debug" | "trace" => EnvFilter::builder().parse(format!(
			"error,parsegql={v},parsegql_core={v},tower_http={v}"
		)),
		// Let's try to parse the custom log level
		_ => EnvFilter::builder().parse(v),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("none", "off")]
	#[case("full", "trace")]
	#[case("error", "error")]
	#[case("debug", "error,parsegql=debug,parsegql_core=debug,tower_http=debug")]
	#[case("parsegql::core::gql=trace", "parsegql::core::gql=trace")]
	fn log_levels_become_filters(#[case] level: &str, #[case] expected: &str) {
		let filter = filter_from_value(level).unwrap();
		let expected = EnvFilter::builder().parse(expected).unwrap();
		assert_eq!(filter.to_string(), expected.to_string());
	}

	#[test]
	fn invalid_filters_are_rejected() {
		assert!(filter_from_value("parsegql=loud").is_err());
	}

	#[test]
	fn builder_uses_log_level() {
		assert!(builder().with_log_level("trace").build().is_ok());
		assert!(builder().with_log_level("parsegql=loud").build().is_err());
	}
}
