use std::time::Duration;

use url::Url;

use crate::telemetry::filter_from_value;

pub(crate) fn endpoint_valid(v: &str) -> Result<String, String> {
	match Url::parse(v) {
		Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {
			Ok(v.to_string())
		}
		_ => Err(String::from("Provide a valid http:// or https:// Parse server endpoint")),
	}
}

pub(crate) fn log_valid(v: &str) -> Result<String, String> {
	match filter_from_value(v) {
		Ok(_) => Ok(v.to_string()),
		Err(e) => Err(format!("Provide a valid log filter configuration string: {e}")),
	}
}

/// Parses durations such as `500ms`, `30s`, `5m` or `1h 30m`. A bare number
/// is a number of seconds.
pub(crate) fn duration(v: &str) -> Result<Duration, String> {
	let v = v.trim();
	if let Ok(secs) = v.parse::<u64>() {
		return Ok(Duration::from_secs(secs));
	}
	humantime::parse_duration(v).map_err(|e| format!("invalid duration: {e}"))
}
