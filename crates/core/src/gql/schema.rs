use std::collections::BTreeSet;
use std::sync::Arc;

use async_graphql::dynamic::{
	Field, FieldFuture, FieldValue, Object, Scalar, Schema, Type, TypeRef, Union,
};
use serde_json::Value;

use super::auth::process_auth;
use super::decorate::decorate;
use super::error::{GqlError, internal_error, schema_error};
use super::functions::{FunctionItem, FunctionOutput, process_fns};
use super::instance::Resolved;
use super::tables::process_classes;
use super::utils::json_to_gql;
use crate::catalog::Registry;
use crate::remote::Store;

const TARGET: &str = "parsegql::core::gql::schema";

/// The scalar carrying opaque JSON values.
pub const ANY_SCALAR: &str = "Any";
/// The object wrapping function results that are not rows of a class.
pub const RAW_VALUE: &str = "RawValue";
/// The union of every class and [`RAW_VALUE`].
pub const FUNCTION_RESULT: &str = "FunctionResult";

const RESERVED_TYPES: [&str; 10] = [
	"Query",
	"Mutation",
	ANY_SCALAR,
	RAW_VALUE,
	FUNCTION_RESULT,
	TypeRef::STRING,
	TypeRef::INT,
	TypeRef::FLOAT,
	TypeRef::BOOLEAN,
	TypeRef::ID,
];

/// A function result element without a class.
pub(crate) struct RawValue(Value);

/// Tracks the field names of a root object.
#[derive(Debug, Default)]
pub(crate) struct RootNames {
	root: &'static str,
	names: BTreeSet<String>,
}

impl RootNames {
	fn new(root: &'static str) -> Self {
		Self {
			root,
			names: BTreeSet::new(),
		}
	}

	pub(crate) fn claim(&mut self, name: &str) -> Result<(), GqlError> {
		if self.names.insert(name.to_string()) {
			Ok(())
		} else {
			Err(schema_error(format!("field `{name}` is defined twice on `{}`", self.root)))
		}
	}
}

/// Fetches the class schemas and functions of a store and decorates them.
pub async fn load_registry(admin: &dyn Store) -> Result<Registry, GqlError> {
	let classes = admin.fetch_schema().await?;
	let functions = admin.fetch_functions().await?;
	info!(target: TARGET, classes = classes.len(), functions = functions.len(), "Loaded remote schema");
	decorate(&Registry::new(classes), &functions)
}

/// Loads the registry through `admin` and generates a schema whose resolvers
/// use `store`.
pub async fn load_schema(admin: &dyn Store, store: Arc<dyn Store>) -> Result<Schema, GqlError> {
	let registry = Arc::new(load_registry(admin).await?);
	generate_schema(store, registry)
}

/// Builds the GraphQL schema of a decorated registry. Resolvers use `store`
/// for every remote call.
pub fn generate_schema(store: Arc<dyn Store>, registry: Arc<Registry>) -> Result<Schema, GqlError> {
	if !registry.is_decorated() {
		return Err(schema_error("the registry must be decorated before generating a schema"));
	}
	if let Some(class) = registry.classes().find(|c| RESERVED_TYPES.contains(&c.class_name.as_str()))
	{
		return Err(schema_error(format!("class `{}` clashes with a built-in type", class.class_name)));
	}

	let mut query_names = RootNames::new("Query");
	let mut mutation_names = RootNames::new("Mutation");
	let mut types: Vec<Type> = Vec::new();

	trace!(target: TARGET, classes = registry.len(), globals = registry.globals().len(), "Generating schema");

	let query = process_classes(&store, &registry, Object::new("Query"), &mut types, &mut query_names)?;
	let (query, mutation) = process_auth(
		&store,
		&registry,
		query,
		Object::new("Mutation"),
		&mut query_names,
		&mut mutation_names,
	)?;
	let query = process_fns(&store, &registry, query, &mut query_names)?;

	let raw_value = Object::new(RAW_VALUE)
		.description("A function result element which is not a row of a known class")
		.field(Field::new("value", TypeRef::named(ANY_SCALAR), |ctx| {
			FieldFuture::new(async move {
				let RawValue(v) = ctx
					.parent_value
					.downcast_ref::<RawValue>()
					.ok_or_else(|| internal_error("failed to downcast"))?;
				match v {
					Value::Null => Ok(None),
					v => Ok(Some(FieldValue::value(json_to_gql(v.clone())?))),
				}
			})
		}));
	let function_result = registry
		.classes()
		.fold(Union::new(FUNCTION_RESULT), |u, c| u.possible_type(&c.class_name))
		.possible_type(RAW_VALUE)
		.description("An element of a function result");

	let mut schema = Schema::build("Query", Some("Mutation"), None)
		.register(query)
		.register(mutation)
		.register(raw_value)
		.register(function_result)
		.register(
			Scalar::new(ANY_SCALAR).description("An arbitrary JSON value stored in the remote store"),
		);
	for ty in types {
		schema = schema.register(ty);
	}

	schema.finish().map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}

/// Converts a resolved field into the value handed to the engine.
pub(crate) fn resolved_to_field_value(
	resolved: Resolved,
) -> Result<Option<FieldValue<'static>>, GqlError> {
	Ok(match resolved {
		Resolved::Null | Resolved::Value(Value::Null) => None,
		Resolved::Value(v) => Some(FieldValue::value(json_to_gql(v)?)),
		Resolved::Instance(i) => Some(FieldValue::owned_any(i)),
		Resolved::Instances(v) => Some(FieldValue::list(v.into_iter().map(FieldValue::owned_any))),
		Resolved::Function(out) => return function_to_field_value(out),
	})
}

/// Function results are typed as lists of [`FUNCTION_RESULT`]. A non-list
/// result becomes a single element list.
pub(crate) fn function_to_field_value(
	out: FunctionOutput,
) -> Result<Option<FieldValue<'static>>, GqlError> {
	fn raw(v: Value) -> FieldValue<'static> {
		FieldValue::owned_any(RawValue(v)).with_type(RAW_VALUE)
	}
	Ok(match out {
		FunctionOutput::Value(Value::Null) => None,
		FunctionOutput::Value(v) => Some(FieldValue::list([raw(v)])),
		FunctionOutput::List(items) => Some(FieldValue::list(items.into_iter().map(|i| match i {
			FunctionItem::Instance(instance) => {
				let class = instance.class_name().to_string();
				FieldValue::owned_any(instance).with_type(class)
			}
			FunctionItem::Raw(v) => raw(v),
		}))),
	})
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use async_graphql::Request;
	use serde_json::json;
	use test_log::test;

	use super::*;
	use crate::catalog::{ClassSchema, FieldDescriptor, Row};
	use crate::gql::{QueryCounter, RequestContext};
	use crate::remote::MemoryStore;

	fn row(v: Value) -> Row {
		match v {
			Value::Object(o) => o,
			_ => unreachable!(),
		}
	}

	fn pointer(class: &str, id: &str) -> Value {
		json!({"__type": "Pointer", "className": class, "objectId": id})
	}

	fn store() -> MemoryStore {
		MemoryStore::new()
			.with_class(
				ClassSchema::new("Dog")
					.with_field("objectId", FieldDescriptor::scalar("String"))
					.with_field("name", FieldDescriptor::scalar("String"))
					.with_field("age", FieldDescriptor::scalar("Number"))
					.with_field("owner", FieldDescriptor::pointer("_User")),
			)
			.with_class(
				ClassSchema::new("_User")
					.with_field("objectId", FieldDescriptor::scalar("String"))
					.with_field("username", FieldDescriptor::scalar("String")),
			)
			.with_rows(
				"Dog",
				[
					row(json!({"objectId": "d1", "name": "Rex", "age": 3, "owner": pointer("_User", "u1")})),
					row(json!({"objectId": "d2", "name": "Fido", "age": 5, "owner": pointer("_User", "u2")})),
					row(json!({"objectId": "d3", "name": "Spot", "age": 1, "owner": pointer("_User", "u1")})),
				],
			)
			.with_rows(
				"_User",
				[
					row(json!({"objectId": "u1", "username": "alice"})),
					row(json!({"objectId": "u2", "username": "bob"})),
				],
			)
			.with_function("Dog_greeting", |arg| {
				let name = arg.and_then(|r| r.get("name")).and_then(Value::as_str).unwrap_or("?");
				json!(format!("Woof, I am {name}"))
			})
			.with_function("adopt", |_| {
				json!([{"className": "Dog", "objectId": "d9", "name": "Newbie"}, {"note": "pending"}])
			})
			.with_function("nothing", |_| Value::Null)
	}

	async fn schema(mem: &MemoryStore) -> Schema {
		let registry = Arc::new(load_registry(mem).await.unwrap());
		generate_schema(Arc::new(mem.clone()), registry).unwrap()
	}

	async fn execute(schema: &Schema, query: &str) -> Value {
		let res = schema.execute(Request::new(query)).await;
		serde_json::to_value(&res).unwrap()
	}

	#[test(tokio::test)]
	async fn class_query_with_pointer_and_reverse_pointer() {
		let mem = store();
		let schema = schema(&mem).await;
		let res = execute(
			&schema,
			r#"{
				Dog(order: "age") {
					name
					owner { username Dog_owner(order: "-age") { name } }
				}
			}"#,
		)
		.await;
		assert_eq!(
			res["data"],
			json!({
				"Dog": [
					{ "name": "Spot", "owner": { "username": "alice", "Dog_owner": [{ "name": "Rex" }, { "name": "Spot" }] } },
					{ "name": "Rex", "owner": { "username": "alice", "Dog_owner": [{ "name": "Rex" }, { "name": "Spot" }] } },
					{ "name": "Fido", "owner": { "username": "bob", "Dog_owner": [{ "name": "Fido" }] } },
				]
			})
		);
		assert!(res.get("errors").is_none());
	}

	#[test(tokio::test)]
	async fn equality_arguments_and_where() {
		let mem = store();
		let schema = schema(&mem).await;
		let res = execute(&schema, r#"{ Dog(name: "Fido") { objectId } }"#).await;
		assert_eq!(res["data"], json!({ "Dog": [{ "objectId": "d2" }] }));
		let res = execute(&schema, r#"{ Dog(where: { name: "Rex" }, name: "Fido") { objectId } }"#).await;
		assert_eq!(res["data"], json!({ "Dog": [{ "objectId": "d1" }] }));
		let res = execute(&schema, r#"{ Dog(limit: 1, skip: 1, order: "name") { name } }"#).await;
		assert_eq!(res["data"], json!({ "Dog": [{ "name": "Rex" }] }));
	}

	#[test(tokio::test)]
	async fn get_by_id() {
		let mem = store();
		let schema = schema(&mem).await;
		let res = execute(&schema, r#"{ a: _get_Dog(id: "d1") { name } b: _get_Dog(id: "nope") { name } }"#).await;
		assert_eq!(res["data"], json!({ "a": { "name": "Rex" }, "b": null }));
	}

	#[test(tokio::test)]
	async fn field_errors_leave_siblings_intact() {
		let mem = store();
		let schema = schema(&mem).await;
		let res = execute(
			&schema,
			r#"{ ok: Dog(name: "Rex") { name } bad: Dog(where: "name") { name } }"#,
		)
		.await;
		assert_eq!(res["data"]["ok"], json!([{ "name": "Rex" }]));
		let errors = res["errors"].as_array().unwrap();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0]["path"], json!(["bad"]));
		assert_eq!(errors[0]["extensions"]["code"], json!("INVALID_ARGUMENT"));
	}

	#[test(tokio::test)]
	async fn hook_and_global_functions() {
		let mem = store();
		let schema = schema(&mem).await;
		let res = execute(
			&schema,
			r#"{
				_get_Dog(id: "d1") { greeting { ... on RawValue { value } } }
				adopt {
					__typename
					... on Dog { name }
					... on RawValue { value }
				}
				nothing { __typename }
			}"#,
		)
		.await;
		assert!(res.get("errors").is_none(), "{res}");
		assert_eq!(
			res["data"],
			json!({
				"_get_Dog": { "greeting": [{ "value": "Woof, I am Rex" }] },
				"adopt": [
					{ "__typename": "Dog", "name": "Newbie" },
					{ "__typename": "RawValue", "value": { "note": "pending" } },
				],
				"nothing": null,
			})
		);
	}

	#[test(tokio::test)]
	async fn auth_flow_through_the_schema() {
		let mem = store();
		let schema = schema(&mem).await;
		let res = execute(
			&schema,
			r#"mutation { signUp(username: "carol", password: "pw", email: "c@example.com") { username } }"#,
		)
		.await;
		assert_eq!(res["data"]["signUp"]["username"], json!("carol"));

		let res = execute(&schema, r#"mutation { logIn(username: "carol") { username } }"#).await;
		assert_eq!(res["data"]["logIn"], Value::Null);
		assert_eq!(res["errors"][0]["message"], json!("Invalid argument: 'password' field is required."));

		let res =
			execute(&schema, r#"mutation { logIn(username: "carol", password: "pw") { username } }"#)
				.await;
		assert_eq!(res["data"]["logIn"]["username"], json!("carol"));

		let token = {
			use crate::remote::{Credentials, Store};
			let row = mem
				.log_in(&Credentials {
					username: "carol".into(),
					password: "pw".into(),
				})
				.await
				.unwrap();
			row["sessionToken"].as_str().unwrap().to_string()
		};
		let res = schema
			.execute(Request::new("{ me { username } }").data(RequestContext::new().with_session(token)))
			.await;
		let res = serde_json::to_value(&res).unwrap();
		assert_eq!(res["data"], json!({ "me": { "username": "carol" } }));
	}

	#[test(tokio::test)]
	async fn remote_calls_are_counted_per_request() {
		let mem = store();
		let schema = schema(&mem).await;
		let counter = Arc::new(QueryCounter::new());
		let res = schema
			.execute(
				Request::new(r#"{ Dog(name: "Rex") { name owner { username } } }"#)
					.data(RequestContext::new().with_counter(counter.clone())),
			)
			.await;
		assert!(res.errors.is_empty());
		// One class query plus one pointer fetch
		assert_eq!(counter.get(), 2);
	}

	#[test]
	fn built_in_type_names_are_rejected() {
		let registry = Arc::new(
			decorate(&Registry::new([ClassSchema::new("Query")]), &[]).unwrap(),
		);
		let err = generate_schema(Arc::new(MemoryStore::new()), registry).unwrap_err();
		assert!(matches!(err, GqlError::SchemaError(_)));
	}

	#[test]
	fn undecorated_registries_are_rejected() {
		let registry = Arc::new(Registry::new([ClassSchema::new("Dog")]));
		assert!(generate_schema(Arc::new(MemoryStore::new()), registry).is_err());
	}

	#[test]
	fn root_field_collisions_are_rejected() {
		// A global function named like a class query
		let registry = Arc::new(
			decorate(
				&Registry::new([ClassSchema::new("Dog")]),
				&[crate::catalog::FunctionDescriptor::new("Dog")],
			)
			.unwrap(),
		);
		let err = generate_schema(Arc::new(MemoryStore::new()), registry).unwrap_err();
		assert!(matches!(err, GqlError::SchemaError(m) if m.contains("`Dog`")));
	}

	#[test(tokio::test)]
	async fn sdl_lists_generated_types() {
		let mem = store();
		let sdl = schema(&mem).await.sdl();
		assert!(sdl.contains("type Dog"));
		assert!(sdl.contains("Dog_owner("));
		assert!(sdl.contains("union FunctionResult"));
		assert!(sdl.contains("scalar Any"));
		assert!(sdl.contains("signUp("));
	}
}
