use thiserror::Error;

/// Store code reported when an object does not exist or is not readable. The
/// login endpoint reuses it for rejected credentials.
pub const OBJECT_NOT_FOUND: i64 = 101;

/// An error originating from the remote object store or its client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The store answered with an error envelope
	#[error("The remote store returned error {code}: {message}")]
	Remote {
		code: i64,
		message: String,
	},

	/// The requested row does not exist
	#[error("The requested object was not found")]
	NotFound,

	/// The credentials or session token were rejected
	#[error("The remote store rejected the request credentials")]
	Unauthorized,

	/// The store could not be reached
	#[error("The remote store is unavailable: {0}")]
	Unavailable(#[from] reqwest::Error),

	/// The store replied with a status that has no defined meaning
	#[error("The remote store replied with unexpected status {status}: {body}")]
	UnexpectedStatus {
		status: u16,
		body: String,
	},

	/// A payload could not be encoded or decoded
	#[error("Unable to process a remote store payload: {0}")]
	Json(#[from] serde_json::Error),

	/// The configured endpoint is not a valid base url
	#[error("Invalid remote store url: {0}")]
	Url(#[from] url::ParseError),
}

impl Error {
	/// Builds the error matching a store error envelope.
	pub fn remote(code: i64, message: impl Into<String>) -> Self {
		Error::Remote {
			code,
			message: message.into(),
		}
	}

	/// Treats the store's object-not-found code as a missing row. Only
	/// meaningful for row lookups, as other endpoints reuse the code.
	pub fn into_not_found(self) -> Self {
		match self {
			Error::Remote {
				code: OBJECT_NOT_FOUND,
				..
			} => Error::NotFound,
			e => e,
		}
	}
}
