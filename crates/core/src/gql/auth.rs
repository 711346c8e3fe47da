use std::sync::Arc;

use async_graphql::ErrorExtensions;
use async_graphql::dynamic::{Field, FieldFuture, InputValue, Object, TypeRef};
use serde_json::Value;

use super::error::{GqlError, invalid_argument};
use super::instance::{BoundInstance, Resolved};
use super::query::Arguments;
use super::schema::{ANY_SCALAR, RootNames, resolved_to_field_value};
use super::utils::{RequestContext, request_context};
use crate::catalog::{Registry, Row};
use crate::cnf::USER_CLASS;
use crate::remote::{Credentials, NewUser, Store};

const TARGET: &str = "parsegql::core::gql::auth";

fn required_string(args: &Arguments, name: &str) -> Result<String, GqlError> {
	match args.get(name) {
		None | Some(Value::Null) => Err(invalid_argument(format!("'{name}' field is required."))),
		Some(Value::String(s)) => Ok(s.clone()),
		Some(_) => Err(invalid_argument(format!("'{name}' field must be a string."))),
	}
}

fn user_result(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	row: Row,
) -> Result<Resolved, GqlError> {
	if registry.contains(USER_CLASS) {
		Ok(Resolved::Instance(BoundInstance::new(USER_CLASS, registry.clone(), store.clone(), row)?))
	} else {
		Ok(Resolved::Value(Value::Object(row)))
	}
}

/// Creates a user from the `username`, `password` and `email` arguments.
pub async fn sign_up(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	args: &Arguments,
	rc: &RequestContext,
) -> Result<Resolved, GqlError> {
	let user = NewUser {
		username: required_string(args, "username")?,
		password: required_string(args, "password")?,
		email: required_string(args, "email")?,
	};
	debug!(target: TARGET, username = %user.username, "Signing up");
	let row = rc.remote(store.create_user(&user)).await?;
	user_result(store, registry, row)
}

pub async fn log_in(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	args: &Arguments,
	rc: &RequestContext,
) -> Result<Resolved, GqlError> {
	let credentials = Credentials {
		username: required_string(args, "username")?,
		password: required_string(args, "password")?,
	};
	debug!(target: TARGET, username = %credentials.username, "Logging in");
	let row = rc.remote(store.log_in(&credentials)).await?;
	user_result(store, registry, row)
}

/// Fetches the user of the request's session. Without a session the
/// unscoped client is asked, which the store normally rejects.
pub async fn me(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	rc: &RequestContext,
) -> Result<Resolved, GqlError> {
	let scoped = match rc.session() {
		Some(token) => store.with_session(token),
		None => store.clone(),
	};
	let row = rc.remote(scoped.current_user()).await?;
	user_result(&scoped, registry, row)
}

/// Adds `me` to the query root and `signUp` / `logIn` to the mutation root.
pub(crate) fn process_auth(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	query: Object,
	mutation: Object,
	names: &mut RootNames,
	mutation_names: &mut RootNames,
) -> Result<(Object, Object), GqlError> {
	let user_type = if registry.contains(USER_CLASS) {
		USER_CLASS
	} else {
		ANY_SCALAR
	};

	names.claim("me")?;
	let (store1, registry1) = (store.clone(), registry.clone());
	let query = query.field(
		Field::new("me", TypeRef::named(user_type), move |ctx| {
			let store = store1.clone();
			let registry = registry1.clone();
			FieldFuture::new(async move {
				let rc = request_context(&ctx);
				let out = me(&store, &registry, &rc).await.map_err(|e| e.extend())?;
				resolved_to_field_value(out).map_err(|e| e.extend())
			})
		})
		.description("The user owning the session token of the request"),
	);

	mutation_names.claim("signUp")?;
	let (store2, registry2) = (store.clone(), registry.clone());
	let mutation = mutation.field(
		Field::new("signUp", TypeRef::named(user_type), move |ctx| {
			let store = store2.clone();
			let registry = registry2.clone();
			FieldFuture::new(async move {
				let rc = request_context(&ctx);
				let args = Arguments::from_gql(ctx.args.as_index_map()).map_err(|e| e.extend())?;
				let out = sign_up(&store, &registry, &args, &rc).await.map_err(|e| e.extend())?;
				resolved_to_field_value(out).map_err(|e| e.extend())
			})
		})
		.description("Creates a user and starts a session")
		.argument(InputValue::new("username", TypeRef::named(TypeRef::STRING)))
		.argument(InputValue::new("password", TypeRef::named(TypeRef::STRING)))
		.argument(InputValue::new("email", TypeRef::named(TypeRef::STRING))),
	);

	mutation_names.claim("logIn")?;
	let (store3, registry3) = (store.clone(), registry.clone());
	let mutation = mutation.field(
		Field::new("logIn", TypeRef::named(user_type), move |ctx| {
			let store = store3.clone();
			let registry = registry3.clone();
			FieldFuture::new(async move {
				let rc = request_context(&ctx);
				let args = Arguments::from_gql(ctx.args.as_index_map()).map_err(|e| e.extend())?;
				let out = log_in(&store, &registry, &args, &rc).await.map_err(|e| e.extend())?;
				resolved_to_field_value(out).map_err(|e| e.extend())
			})
		})
		.description("Starts a session for an existing user")
		.argument(InputValue::new("username", TypeRef::named(TypeRef::STRING)))
		.argument(InputValue::new("password", TypeRef::named(TypeRef::STRING))),
	);

	Ok((query, mutation))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;

	use super::*;
	use crate::catalog::{ClassSchema, FieldDescriptor};
	use crate::gql::decorate;
	use crate::remote::MemoryStore;

	fn setup(with_user_class: bool) -> (MemoryStore, Arc<dyn Store>, Arc<Registry>) {
		let mut classes = vec![ClassSchema::new("Dog")];
		if with_user_class {
			classes.push(
				ClassSchema::new(USER_CLASS).with_field("username", FieldDescriptor::scalar("String")),
			);
		}
		let mem = MemoryStore::new();
		let registry = Arc::new(decorate(&Registry::new(classes), &[]).unwrap());
		(mem.clone(), Arc::new(mem), registry)
	}

	fn sign_up_args() -> Arguments {
		Arguments::new()
			.with("username", json!("alice"))
			.with("password", json!("pw"))
			.with("email", json!("alice@example.com"))
	}

	#[rstest]
	#[case("username", None, "'username' field is required.")]
	#[case("password", Some(Value::Null), "'password' field is required.")]
	#[case("email", Some(json!(5)), "'email' field must be a string.")]
	#[case("username", Some(json!(["alice"])), "'username' field must be a string.")]
	#[tokio::test]
	async fn sign_up_validates_arguments(
		#[case] name: &str,
		#[case] value: Option<Value>,
		#[case] message: &str,
	) {
		let (mem, store, registry) = setup(true);
		let args: Arguments = sign_up_args()
			.iter()
			.filter(|(k, _)| k.as_str() != name)
			.map(|(k, v)| (k.clone(), v.clone()))
			.chain(value.map(|v| (name.to_string(), v)))
			.collect();
		match sign_up(&store, &registry, &args, &RequestContext::new()).await {
			Err(GqlError::InvalidArgument(msg)) => assert_eq!(msg, message),
			other => panic!("unexpected result: {other:?}"),
		}
		assert_eq!(mem.calls(), 0);
	}

	#[tokio::test]
	async fn sign_up_then_me() {
		let (_, store, registry) = setup(true);
		let rc = RequestContext::new();
		let token = match sign_up(&store, &registry, &sign_up_args(), &rc).await.unwrap() {
			Resolved::Instance(user) => {
				assert_eq!(user.class_name(), USER_CLASS);
				user.row()["sessionToken"].as_str().unwrap().to_string()
			}
			other => panic!("unexpected result: {other:?}"),
		};
		let rc = RequestContext::new().with_session(token);
		match me(&store, &registry, &rc).await.unwrap() {
			Resolved::Instance(user) => assert_eq!(user.row()["username"], json!("alice")),
			other => panic!("unexpected result: {other:?}"),
		}
		assert!(me(&store, &registry, &RequestContext::new()).await.is_err());
	}

	#[tokio::test]
	async fn log_in_without_user_class_returns_raw_rows() {
		let (_, store, registry) = setup(false);
		let rc = RequestContext::new();
		sign_up(&store, &registry, &sign_up_args(), &rc).await.unwrap();
		let args =
			Arguments::new().with("username", json!("alice")).with("password", json!("pw"));
		match log_in(&store, &registry, &args, &rc).await.unwrap() {
			Resolved::Value(Value::Object(row)) => {
				assert_eq!(row["username"], json!("alice"));
				assert!(row.contains_key("sessionToken"));
			}
			other => panic!("unexpected result: {other:?}"),
		}
		let args = Arguments::new().with("username", json!("alice"));
		assert!(matches!(
			log_in(&store, &registry, &args, &rc).await,
			Err(GqlError::InvalidArgument(m)) if m == "'password' field is required."
		));
	}
}
