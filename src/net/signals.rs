use std::io;

const TARGET: &str = "parsegql::net::signals";

/// Resolves once a shutdown signal is received, starting a graceful shutdown.
pub(super) async fn shutdown() {
	match listen().await {
		Ok(signal) => {
			info!(target: TARGET, "{signal} received. Waiting for in-flight requests to complete...");
		}
		Err(e) => {
			error!(target: TARGET, "Failed to listen to shutdown signals: {e}");
			// Keep serving, the process can still be killed
			std::future::pending::<()>().await;
		}
	}
}

#[cfg(unix)]
pub async fn listen() -> Result<String, io::Error> {
	// Import the OS signals
	use tokio::signal::unix::{SignalKind, signal};
	// Get the operating system signal types
	let mut sighup = signal(SignalKind::hangup())?;
	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigquit = signal(SignalKind::quit())?;
	let mut sigterm = signal(SignalKind::terminate())?;
	// Listen and wait for the system signals
	tokio::select! {
		// Wait for a SIGHUP signal
		_ = sighup.recv() => {
			Ok(String::from("SIGHUP"))
		}
		// Wait for a SIGINT signal
		_ = sigint.recv() => {
			Ok(String::from("SIGINT"))
		}
		// Wait for a SIGQUIT signal
		_ = sigquit.recv() => {
			Ok(String::from("SIGQUIT"))
		}
		// Wait for a SIGTERM signal
		_ = sigterm.recv() => {
			Ok(String::from("SIGTERM"))
		}
	}
}

#[cfg(not(unix))]
pub async fn listen() -> Result<String, io::Error> {
	tokio::signal::ctrl_c().await?;
	Ok(String::from("CTRL-C"))
}
