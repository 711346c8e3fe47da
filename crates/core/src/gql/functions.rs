use std::sync::Arc;

use async_graphql::ErrorExtensions;
use async_graphql::dynamic::{Field, FieldFuture, InputValue, Object, TypeRef};
use serde::Deserialize;
use serde_json::Value;

use super::error::{GqlError, invalid_argument};
use super::instance::BoundInstance;
use super::query::Arguments;
use super::schema::{ANY_SCALAR, FUNCTION_RESULT, RootNames, function_to_field_value};
use super::utils::{RequestContext, request_context};
use crate::catalog::{Registry, Row};
use crate::err::Error;
use crate::remote::Store;

const TARGET: &str = "parsegql::core::gql::functions";

/// The result of a remote function call.
#[derive(Debug)]
pub enum FunctionOutput {
	/// A non-list result, returned unchanged
	Value(Value),
	/// A list result, with classifiable elements bound to their class
	List(Vec<FunctionItem>),
}

#[derive(Debug)]
pub enum FunctionItem {
	Instance(BoundInstance),
	Raw(Value),
}

#[derive(Deserialize)]
struct Envelope {
	#[serde(default)]
	result: Value,
}

/// Calls a remote function and reshapes its result.
pub async fn invoke(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	name: &str,
	argument: Option<&Row>,
	rc: &RequestContext,
) -> Result<FunctionOutput, GqlError> {
	trace!(target: TARGET, name, "Invoking function");
	let body = rc.remote(store.invoke_function(name, argument)).await?;
	let envelope: Envelope =
		serde_json::from_slice(&body).map_err(|e| GqlError::Remote(Error::Json(e)))?;
	Ok(reshape(store, registry, envelope.result))
}

/// Binds list elements that name a known class in their `className`.
pub fn reshape(store: &Arc<dyn Store>, registry: &Arc<Registry>, result: Value) -> FunctionOutput {
	let Value::Array(items) = result else {
		return FunctionOutput::Value(result);
	};
	let items = items
		.into_iter()
		.map(|item| match item {
			Value::Object(row) => {
				match row.get("className").and_then(Value::as_str).filter(|c| registry.contains(c))
				{
					Some(class) => {
						let class = class.to_string();
						FunctionItem::Instance(BoundInstance::bind(
							class,
							registry.clone(),
							store.clone(),
							row,
						))
					}
					None => FunctionItem::Raw(Value::Object(row)),
				}
			}
			other => FunctionItem::Raw(other),
		})
		.collect();
	FunctionOutput::List(items)
}

/// Adds a root field for every function not attributable to a class.
pub(crate) fn process_fns(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	mut query: Object,
	names: &mut RootNames,
) -> Result<Object, GqlError> {
	for function in registry.globals() {
		let name = function.function_name.clone();
		names.claim(&name)?;
		trace!(target: TARGET, %name, "Adding global function");
		let store = store.clone();
		let registry = registry.clone();
		let fn_name = name.clone();
		query = query.field(
			Field::new(name.clone(), TypeRef::named_list(FUNCTION_RESULT), move |ctx| {
				let store = store.clone();
				let registry = registry.clone();
				let fn_name = fn_name.clone();
				FieldFuture::new(async move {
					let rc = request_context(&ctx);
					let args = Arguments::from_gql(ctx.args.as_index_map()).map_err(|e| e.extend())?;
					let params = match args.get_non_null("params") {
						None => None,
						Some(Value::Object(o)) => Some(o.clone()),
						Some(_) => {
							return Err(invalid_argument("'params' argument should be an object")
								.extend());
						}
					};
					let out = invoke(&store, &registry, &fn_name, params.as_ref(), &rc)
						.await
						.map_err(|e| e.extend())?;
					function_to_field_value(out).map_err(|e| e.extend())
				})
			})
			.description(format!("Calls the remote function `{name}`"))
			.argument(InputValue::new("params", TypeRef::named(ANY_SCALAR))),
		);
	}
	Ok(query)
}
