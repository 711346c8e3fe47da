//! Augments a raw registry with reverse pointer and hook function fields.
//!
//! Classes and their fields are visited in lexicographic order, reverse
//! pointers before functions, and functions sorted by name. The first
//! synthesized field to claim a name wins and any later claim fails the
//! whole decoration, so the outcome only depends on the input.

use std::collections::btree_map::Entry;

use super::error::GqlError;
use crate::catalog::{
	ClassSchema, FieldDescriptor, FieldKind, FunctionDescriptor, FunctionTarget, Registry,
};
use crate::cnf::FUNCTION_SEPARATOR;

const TARGET: &str = "parsegql::core::gql::decorate";

/// The name of the field listing the `owner` rows pointing through `field`.
pub fn reverse_field_name(owner: &str, field: &str) -> String {
	format!("{owner}{FUNCTION_SEPARATOR}{field}")
}

fn insert_field(schema: &mut ClassSchema, name: String, kind: FieldKind) -> Result<(), GqlError> {
	match schema.fields.entry(name) {
		Entry::Occupied(e) => Err(GqlError::DecorationConflict {
			class: schema.class_name.clone(),
			field: e.key().clone(),
		}),
		Entry::Vacant(e) => {
			trace!(target: TARGET, class = %schema.class_name, field = %e.key(), %kind, "Synthesized field");
			e.insert(FieldDescriptor::new(kind));
			Ok(())
		}
	}
}

/// Returns a new registry with the synthesized fields, leaving `raw` untouched.
pub fn decorate(raw: &Registry, functions: &[FunctionDescriptor]) -> Result<Registry, GqlError> {
	if raw.is_decorated()
		|| raw.classes().flat_map(|c| c.fields.values()).any(|fd| fd.kind.is_synthesized())
	{
		return Err(GqlError::AlreadyDecorated);
	}
	let mut classes = raw.class_map().clone();
	for class in raw.classes() {
		for (name, fd) in &class.fields {
			let FieldKind::Pointer {
				target,
			} = &fd.kind
			else {
				continue;
			};
			let target_schema =
				classes.get_mut(target).ok_or_else(|| GqlError::UnknownClass(target.clone()))?;
			insert_field(
				target_schema,
				reverse_field_name(&class.class_name, name),
				FieldKind::ReversePointer {
					target: class.class_name.clone(),
					via: name.clone(),
				},
			)?;
		}
	}
	let mut functions: Vec<&FunctionDescriptor> = functions.iter().collect();
	functions.sort_by(|a, b| a.function_name.cmp(&b.function_name));
	let mut globals = Vec::new();
	for function in functions {
		match function.target(raw.class_map()) {
			FunctionTarget::Class {
				owner,
				local,
			} => {
				let schema =
					classes.get_mut(owner).ok_or_else(|| GqlError::UnknownClass(owner.to_string()))?;
				insert_field(
					schema,
					local.to_string(),
					FieldKind::HookFunction {
						function: function.function_name.clone(),
					},
				)?;
			}
			FunctionTarget::Global => {
				trace!(target: TARGET, function = %function.function_name, "Registered global function");
				globals.push(function.clone());
			}
		}
	}
	debug!(target: TARGET, classes = classes.len(), globals = globals.len(), "Decorated registry");
	Ok(Registry::decorated(classes, globals))
}
