use std::sync::Arc;

use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{Field, InputValue, TypeRef};
use async_graphql::{Name, Value as GqlValue};
use serde_json::Value;

use super::error::{GqlError, invalid_argument};
use super::instance::BoundInstance;
use super::schema::ANY_SCALAR;
use super::utils::{RequestContext, args_to_json};
use crate::catalog::{ClassSchema, FieldKind, Registry};
use crate::cnf::DEFAULT_LIMIT;
use crate::remote::{QuerySpec, Store};

const TARGET: &str = "parsegql::core::gql::query";

/// Argument names with a fixed meaning on class queries.
pub const RESERVED_ARGUMENTS: [&str; 6] = ["where", "order", "limit", "skip", "keys", "include"];

pub fn is_reserved(name: &str) -> bool {
	RESERVED_ARGUMENTS.contains(&name)
}

/// The arguments of one field, in the order they were given.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments(IndexMap<String, Value>);

impl Arguments {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
		self.0.insert(name.into(), value);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Reads an argument, treating an explicit `null` as absent.
	pub fn get_non_null(&self, name: &str) -> Option<&Value> {
		self.get(name).filter(|v| !v.is_null())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.0.iter()
	}

	pub fn from_gql(args: &IndexMap<Name, GqlValue>) -> Result<Self, GqlError> {
		Ok(args_to_json(args)?.into_iter().collect())
	}
}

impl FromIterator<(String, Value)> for Arguments {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

fn count_argument(args: &Arguments, name: &str) -> Result<Option<usize>, GqlError> {
	match args.get_non_null(name) {
		None => Ok(None),
		Some(v) => v
			.as_u64()
			.and_then(|n| usize::try_from(n).ok())
			.map(Some)
			.ok_or_else(|| invalid_argument(format!("'{name}' argument should be an integer"))),
	}
}

fn string_argument(args: &Arguments, name: &str) -> Result<Option<String>, GqlError> {
	match args.get_non_null(name) {
		None => Ok(None),
		Some(Value::String(s)) => Ok(Some(s.clone())),
		Some(_) => Err(invalid_argument(format!("'{name}' argument should be a string"))),
	}
}

impl TryFrom<&Arguments> for QuerySpec {
	type Error = GqlError;

	/// Non-reserved arguments become equality constraints, unless an
	/// explicit `where` is given, which then replaces them entirely.
	fn try_from(args: &Arguments) -> Result<Self, Self::Error> {
		let filter = match args.get_non_null("where") {
			Some(Value::Object(predicate)) => predicate.clone(),
			Some(_) => return Err(invalid_argument("explicit where fields must be maps")),
			None => args
				.iter()
				.filter(|(name, _)| !is_reserved(name))
				.map(|(name, value)| (name.clone(), value.clone()))
				.collect(),
		};
		Ok(QuerySpec {
			filter,
			limit: count_argument(args, "limit")?.unwrap_or(*DEFAULT_LIMIT),
			order: string_argument(args, "order")?.unwrap_or_default(),
			skip: count_argument(args, "skip")?.unwrap_or_default(),
			keys: string_argument(args, "keys")?,
			include: string_argument(args, "include")?,
		})
	}
}

/// Queries a class, binding every returned row in store order.
pub async fn query(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	class: &str,
	args: &Arguments,
	rc: &RequestContext,
) -> Result<Vec<BoundInstance>, GqlError> {
	let spec = QuerySpec::try_from(args)?;
	fetch(store, registry, class, &spec, rc).await
}

pub(crate) async fn fetch(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	class: &str,
	spec: &QuerySpec,
	rc: &RequestContext,
) -> Result<Vec<BoundInstance>, GqlError> {
	if !registry.contains(class) {
		return Err(GqlError::UnknownClass(class.to_string()));
	}
	trace!(target: TARGET, class, ?spec, "Running class query");
	let rows = rc.remote(store.query_rows(class, spec)).await?;
	trace!(target: TARGET, class, count = rows.len(), "Class query returned");
	Ok(rows
		.into_iter()
		.map(|row| BoundInstance::bind(class, registry.clone(), store.clone(), row))
		.collect())
}

/// Declares the query arguments of `class` on a field.
pub(crate) fn query_arguments(field: Field, class: &ClassSchema) -> Field {
	let field = field
		.argument(InputValue::new("where", TypeRef::named(ANY_SCALAR)))
		.argument(InputValue::new("order", TypeRef::named(TypeRef::STRING)))
		.argument(InputValue::new("limit", TypeRef::named(TypeRef::INT)))
		.argument(InputValue::new("skip", TypeRef::named(TypeRef::INT)))
		.argument(InputValue::new("keys", TypeRef::named(TypeRef::STRING)))
		.argument(InputValue::new("include", TypeRef::named(TypeRef::STRING)));
	class
		.fields
		.iter()
		.filter(|(name, fd)| {
			!is_reserved(name)
				&& matches!(
					fd.kind,
					FieldKind::Scalar(_)
						| FieldKind::Pointer {
							..
						}
				)
		})
		.fold(field, |field, (name, _)| {
			field.argument(InputValue::new(name, TypeRef::named(ANY_SCALAR)))
		})
}
