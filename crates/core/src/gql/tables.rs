use std::sync::Arc;

use async_graphql::{ErrorExtensions, Value as GqlValue};
use async_graphql::dynamic::{
	Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Type, TypeRef,
};

use super::error::{GqlError, internal_error};
use super::instance::{BoundInstance, OBJECT_ID};
use super::query::{self, Arguments, query_arguments};
use super::schema::{ANY_SCALAR, FUNCTION_RESULT, RootNames, resolved_to_field_value};
use super::utils::request_context;
use crate::catalog::{FieldKind, Registry};
use crate::remote::Store;

const TARGET: &str = "parsegql::core::gql::tables";

macro_rules! id_input {
	() => {
		InputValue::new("id", TypeRef::named_nn(TypeRef::ID))
	};
}

fn kind_to_type(kind: &FieldKind) -> TypeRef {
	match kind {
		FieldKind::Scalar(ty) => match ty.as_str() {
			"String" => TypeRef::named(TypeRef::STRING),
			"Boolean" => TypeRef::named(TypeRef::BOOLEAN),
			_ => TypeRef::named(ANY_SCALAR),
		},
		FieldKind::Pointer {
			target,
		} => TypeRef::named(target),
		FieldKind::ReversePointer {
			target,
			..
		} => TypeRef::named_nn_list(target),
		FieldKind::HookFunction {
			..
		} => TypeRef::named_list(FUNCTION_RESULT),
	}
}

fn describe(class: &str, name: &str, kind: &FieldKind) -> String {
	match kind {
		FieldKind::Scalar(ty) => format!("Field `{name}` of type `{ty}`"),
		FieldKind::Pointer {
			target,
		} => format!("Pointer to a `{target}`"),
		FieldKind::ReversePointer {
			target,
			via,
		} => format!("The `{target}` rows whose `{via}` points to this `{class}`"),
		FieldKind::HookFunction {
			function,
		} => format!("Result of the remote function `{function}` called with this row"),
	}
}

/// Adds one object type per class, a list query and a `_get_` lookup.
pub(crate) fn process_classes(
	store: &Arc<dyn Store>,
	registry: &Arc<Registry>,
	mut root: Object,
	types: &mut Vec<Type>,
	names: &mut RootNames,
) -> Result<Object, GqlError> {
	for class in registry.classes() {
		trace!(target: TARGET, class = %class.class_name, "Adding class");
		let class_name = class.class_name.clone();

		names.claim(&class_name)?;
		let (store1, registry1, class1) = (store.clone(), registry.clone(), class_name.clone());
		root = root.field(query_arguments(
			Field::new(&class_name, TypeRef::named_nn_list(&class_name), move |ctx| {
				let store = store1.clone();
				let registry = registry1.clone();
				let class = class1.clone();
				FieldFuture::new(async move {
					let rc = request_context(&ctx);
					let args =
						Arguments::from_gql(ctx.args.as_index_map()).map_err(|e| e.extend())?;
					trace!(target: TARGET, %class, ?args, "Received class query");
					let rows =
						query::query(&store, &registry, &class, &args, &rc)
							.await
							.map_err(|e| e.extend())?;
					Ok(Some(FieldValue::list(rows.into_iter().map(FieldValue::owned_any))))
				})
			})
			.description(format!(
				"Generated from class `{class_name}`\nallows querying a class with filters"
			)),
			class,
		));

		let get_name = format!("_get_{class_name}");
		names.claim(&get_name)?;
		let (store2, registry2, class2) = (store.clone(), registry.clone(), class_name.clone());
		root = root.field(
			Field::new(get_name, TypeRef::named(&class_name), move |ctx| {
				let store = store2.clone();
				let registry = registry2.clone();
				let class = class2.clone();
				FieldFuture::new(async move {
					let rc = request_context(&ctx);
					let id = match ctx.args.as_index_map().get("id") {
						Some(GqlValue::String(id)) => id.clone(),
						_ => {
							return Err(internal_error(
								"Schema validation failed: No id found in _get_",
							)
							.extend());
						}
					};
					let instance = BoundInstance::fetch(&store, &registry, &class, &id, &rc)
						.await
						.map_err(|e| e.extend())?;
					Ok(instance.map(FieldValue::owned_any))
				})
			})
			.description(format!(
				"Generated from class `{class_name}`\nallows querying a single row by objectId"
			))
			.argument(id_input!()),
		);

		let mut class_ty_obj = Object::new(&class_name)
			.description(format!("Generated from class `{class_name}`"));
		if class.field(OBJECT_ID).is_none() {
			class_ty_obj = class_ty_obj.field(Field::new(
				OBJECT_ID,
				TypeRef::named(TypeRef::ID),
				make_class_field_resolver(OBJECT_ID),
			));
		}
		for (fd_name, fd) in &class.fields {
			let field = Field::new(fd_name, kind_to_type(&fd.kind), make_class_field_resolver(fd_name))
				.description(describe(&class_name, fd_name, &fd.kind));
			let field = match &fd.kind {
				FieldKind::ReversePointer {
					target,
					..
				} => {
					let target = registry
						.class(target)
						.ok_or_else(|| GqlError::UnknownClass(target.clone()))?;
					query_arguments(field, target)
				}
				_ => field,
			};
			class_ty_obj = class_ty_obj.field(field);
		}
		types.push(Type::Object(class_ty_obj));
	}
	Ok(root)
}

fn make_class_field_resolver(
	fd_name: impl Into<String>,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	let fd_name = fd_name.into();
	move |ctx: ResolverContext| {
		let fd_name = fd_name.clone();
		FieldFuture::new(async move {
			let instance = ctx
				.parent_value
				.downcast_ref::<BoundInstance>()
				.ok_or_else(|| internal_error("failed to downcast").extend())?;
			let rc = request_context(&ctx);
			let args = Arguments::from_gql(ctx.args.as_index_map()).map_err(|e| e.extend())?;
			let resolved =
				instance.resolve_field(&fd_name, &args, &rc).await.map_err(|e| e.extend())?;
			resolved_to_field_value(resolved).map_err(|e| e.extend())
		})
	}
}
