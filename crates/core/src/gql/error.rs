use async_graphql::ErrorExtensions;
use thiserror::Error;

use crate::err::Error;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Class `{class}` already has a field named `{field}`")]
	DecorationConflict {
		class: String,
		field: String,
	},
	#[error("The registry has already been decorated")]
	AlreadyDecorated,
	#[error("Unknown class `{0}`")]
	UnknownClass(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Remote store error: {0}")]
	Remote(#[from] Error),
	#[error("The request was cancelled")]
	Cancelled,
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
}

impl GqlError {
	/// A stable code reported in the `code` extension of GraphQL errors.
	pub fn code(&self) -> &'static str {
		match self {
			GqlError::DecorationConflict {
				..
			} => "DECORATION_CONFLICT",
			GqlError::AlreadyDecorated => "ALREADY_DECORATED",
			GqlError::UnknownClass(_) => "UNKNOWN_CLASS",
			GqlError::InvalidArgument(_) => "INVALID_ARGUMENT",
			GqlError::Remote(Error::Unavailable(_)) => "REMOTE_UNAVAILABLE",
			GqlError::Remote(Error::Unauthorized) => "UNAUTHORIZED",
			GqlError::Remote(Error::NotFound) => "NOT_FOUND",
			GqlError::Remote(_) => "REMOTE_ERROR",
			GqlError::Cancelled => "CANCELLED",
			GqlError::SchemaError(_) => "SCHEMA_ERROR",
			GqlError::InternalError(_) => "INTERNAL_ERROR",
		}
	}
}

impl ErrorExtensions for GqlError {
	fn extend(&self) -> async_graphql::Error {
		async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
			e.set("code", self.code());
			if let GqlError::Remote(Error::Remote {
				code,
				..
			}) = self
			{
				e.set("remoteCode", *code);
			}
		})
	}
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn invalid_argument(msg: impl Into<String>) -> GqlError {
	GqlError::InvalidArgument(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}
