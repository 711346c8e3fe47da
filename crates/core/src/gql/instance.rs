use std::sync::Arc;

use serde_json::{Value, json};

use super::error::{GqlError, invalid_argument};
use super::functions::{self, FunctionOutput};
use super::query::{self, Arguments};
use super::utils::RequestContext;
use crate::catalog::{ClassSchema, FieldKind, Registry, Row};
use crate::err::Error;
use crate::remote::{QuerySpec, Store};

const TARGET: &str = "parsegql::core::gql::instance";

/// The identifier field present on every row.
pub const OBJECT_ID: &str = "objectId";

/// The outcome of resolving one field.
#[derive(Debug)]
pub enum Resolved {
	Null,
	Value(Value),
	Instance(BoundInstance),
	Instances(Vec<BoundInstance>),
	Function(FunctionOutput),
}

/// One row of a class, able to resolve its own fields.
///
/// Instances are created per request and never mutated, so fields of the
/// same instance can be resolved concurrently.
#[derive(Clone, Debug)]
pub struct BoundInstance {
	class: String,
	registry: Arc<Registry>,
	store: Arc<dyn Store>,
	row: Row,
}

impl BoundInstance {
	/// Binds a row to a class, failing if the class is unknown.
	pub fn new(
		class: impl Into<String>,
		registry: Arc<Registry>,
		store: Arc<dyn Store>,
		row: Row,
	) -> Result<Self, GqlError> {
		let class = class.into();
		if !registry.contains(&class) {
			return Err(GqlError::UnknownClass(class));
		}
		Ok(Self::bind(class, registry, store, row))
	}

	pub(crate) fn bind(
		class: impl Into<String>,
		registry: Arc<Registry>,
		store: Arc<dyn Store>,
		row: Row,
	) -> Self {
		Self {
			class: class.into(),
			registry,
			store,
			row,
		}
	}

	/// Fetches a row by identifier, resolving to `None` when it does not exist.
	pub async fn fetch(
		store: &Arc<dyn Store>,
		registry: &Arc<Registry>,
		class: &str,
		id: &str,
		rc: &RequestContext,
	) -> Result<Option<Self>, GqlError> {
		if !registry.contains(class) {
			return Err(GqlError::UnknownClass(class.to_string()));
		}
		trace!(target: TARGET, class, id, "Fetching row");
		match rc.remote(store.get_row(class, id)).await {
			Ok(row) => Ok(Some(Self::bind(class, registry.clone(), store.clone(), row))),
			Err(GqlError::Remote(Error::NotFound)) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub fn class_name(&self) -> &str {
		&self.class
	}

	pub fn row(&self) -> &Row {
		&self.row
	}

	pub fn object_id(&self) -> Option<&str> {
		self.row.get(OBJECT_ID).and_then(Value::as_str)
	}

	fn schema(&self) -> Result<&ClassSchema, GqlError> {
		self.registry.class(&self.class).ok_or_else(|| GqlError::UnknownClass(self.class.clone()))
	}

	/// Resolves a field by its kind.
	pub async fn resolve_field(
		&self,
		field: &str,
		args: &Arguments,
		rc: &RequestContext,
	) -> Result<Resolved, GqlError> {
		if rc.is_cancelled() {
			return Err(GqlError::Cancelled);
		}
		let schema = self.schema()?;
		let Some(fd) = schema.field(field) else {
			return match field {
				OBJECT_ID => Ok(self.scalar(field)),
				_ => Err(invalid_argument(format!(
					"class `{}` has no field `{field}`",
					self.class
				))),
			};
		};
		match &fd.kind {
			FieldKind::Scalar(_) => Ok(self.scalar(field)),
			FieldKind::Pointer {
				target,
			} => self.resolve_pointer(field, target, rc).await,
			FieldKind::ReversePointer {
				target,
				via,
			} => self.resolve_reverse_pointer(target, via, args, rc).await,
			FieldKind::HookFunction {
				function,
			} => self.resolve_hook(function, args, rc).await,
		}
	}

	fn scalar(&self, field: &str) -> Resolved {
		match self.row.get(field) {
			None | Some(Value::Null) => Resolved::Null,
			Some(v) => Resolved::Value(v.clone()),
		}
	}

	async fn resolve_pointer(
		&self,
		field: &str,
		target: &str,
		rc: &RequestContext,
	) -> Result<Resolved, GqlError> {
		let Some(Value::Object(pointer)) = self.row.get(field) else {
			return Ok(Resolved::Null);
		};
		// Rows expanded through `include` are bound without a round trip
		if pointer.get("__type") == Some(&json!("Object")) {
			return Ok(Resolved::Instance(BoundInstance::new(
				target,
				self.registry.clone(),
				self.store.clone(),
				pointer.clone(),
			)?));
		}
		let Some(id) = pointer.get(OBJECT_ID).and_then(Value::as_str) else {
			return Ok(Resolved::Null);
		};
		Ok(match Self::fetch(&self.store, &self.registry, target, id, rc).await? {
			Some(instance) => Resolved::Instance(instance),
			None => Resolved::Null,
		})
	}

	async fn resolve_reverse_pointer(
		&self,
		target: &str,
		via: &str,
		args: &Arguments,
		rc: &RequestContext,
	) -> Result<Resolved, GqlError> {
		let mut spec = QuerySpec::try_from(args)?;
		let Some(id) = self.object_id() else {
			return Ok(Resolved::Instances(Vec::new()));
		};
		spec.filter.insert(
			via.to_string(),
			json!({
				"__type": "Pointer",
				"className": self.class,
				"objectId": id,
			}),
		);
		let rows = query::fetch(&self.store, &self.registry, target, &spec, rc).await?;
		Ok(Resolved::Instances(rows))
	}

	async fn resolve_hook(
		&self,
		function: &str,
		args: &Arguments,
		rc: &RequestContext,
	) -> Result<Resolved, GqlError> {
		if !args.is_empty() {
			return Err(GqlError::InvalidArgument(format!(
				"function field `{function}` does not accept arguments"
			)));
		}
		let out =
			functions::invoke(&self.store, &self.registry, function, Some(&self.row), rc).await?;
		Ok(Resolved::Function(out))
	}
}
