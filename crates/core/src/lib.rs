//! # Parsegql Core
//!
//! This crate is the engine of parsegql. It turns the class schema of a
//! Parse-compatible remote object store into a dynamic GraphQL schema, and
//! resolves pointer, reverse pointer and cloud function fields against the
//! store at request time.
//!
//! The binary in the workspace root only adds transport, configuration and
//! telemetry on top of this crate.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod catalog;
pub mod cnf;
pub mod err;
pub mod gql;
pub mod remote;
