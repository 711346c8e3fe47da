//! GraphQL support for a remote object store.
//!
//! This module generates a dynamic GraphQL schema from the class schemas and
//! cloud functions of a Parse-compatible store. The schema is built once at
//! startup, after the store's classes have been decorated.
//!
//! ## Architecture
//!
//! - **Decoration** ([`decorate`]) -- adds reverse pointer fields and hook function fields to the
//!   raw class schemas, and separates out global functions.
//! - **Bound instances** ([`instance`]) -- a row bound to its class, resolving scalar, pointer,
//!   reverse pointer and hook function fields against the store.
//! - **Queries** ([`query`]) -- turns field arguments into a store query.
//! - **Functions** ([`functions`]) -- invokes cloud functions and reshapes their results.
//! - **Authentication** (`auth`) -- `signUp`, `logIn` and `me`.
//! - **Schema generation** ([`schema`]) -- assembles the `async_graphql::dynamic::Schema`, with
//!   one object type and root query per class (`tables`).
//! - **Error handling** ([`error`]) -- domain error type ([`GqlError`]) with helper constructors.
//! - **Utilities** (`utils`) -- the per-request context and value conversion.

mod auth;
pub mod decorate;
pub mod error;
pub mod functions;
pub mod instance;
pub mod query;
pub mod schema;
mod tables;
mod utils;

pub use auth::{log_in, me, sign_up};
pub use decorate::decorate;
pub use error::GqlError;
pub use instance::{BoundInstance, Resolved};
pub use query::{Arguments, query};
pub use schema::{generate_schema, load_registry, load_schema};
pub use utils::{QueryCounter, RequestContext};
