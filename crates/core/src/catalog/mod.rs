//! Class and function descriptors as reported by the remote store.
//!
//! A [`Registry`] is built once from the store's schema endpoint and never
//! mutated afterwards. Decoration (see [`crate::gql::decorate`]) produces a
//! new registry value carrying the synthesized fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cnf::FUNCTION_SEPARATOR;

/// A single row as stored remotely.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The kind of a class field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
	/// A store-native value, returned verbatim. Holds the store type name.
	Scalar(String),
	/// A reference to one row of `target`.
	Pointer {
		target: String,
	},
	/// The rows of `target` whose `via` pointer references the owning row.
	ReversePointer {
		target: String,
		via: String,
	},
	/// A value computed by calling the remote `function` with the owning row.
	HookFunction {
		function: String,
	},
}

impl FieldKind {
	/// Returns true for kinds which are added by decoration.
	pub fn is_synthesized(&self) -> bool {
		matches!(self, Self::ReversePointer { .. } | Self::HookFunction { .. })
	}

	/// The class this field refers to, if any.
	pub fn target_class(&self) -> Option<&str> {
		match self {
			Self::Pointer {
				target,
			}
			| Self::ReversePointer {
				target,
				..
			} => Some(target),
			_ => None,
		}
	}
}

impl fmt::Display for FieldKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Scalar(ty) => write!(f, "{ty}"),
			Self::Pointer {
				target,
			} => write!(f, "Pointer<{target}>"),
			Self::ReversePointer {
				target,
				via,
			} => write!(f, "ReversePointer<{target}.{via}>"),
			Self::HookFunction {
				function,
			} => write!(f, "HookFunction<{function}>"),
		}
	}
}

/// The wire shape of a field, `{ "type": "Pointer", "targetClass": "Dog" }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireField {
	#[serde(rename = "type")]
	ty: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	target_class: Option<String>,
}

/// Describes one field of a class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireField", into = "WireField")]
pub struct FieldDescriptor {
	pub kind: FieldKind,
}

impl FieldDescriptor {
	pub fn new(kind: FieldKind) -> Self {
		Self {
			kind,
		}
	}

	pub fn scalar(ty: impl Into<String>) -> Self {
		Self::new(FieldKind::Scalar(ty.into()))
	}

	pub fn pointer(target: impl Into<String>) -> Self {
		Self::new(FieldKind::Pointer {
			target: target.into(),
		})
	}
}

impl TryFrom<WireField> for FieldDescriptor {
	type Error = String;
	fn try_from(wire: WireField) -> Result<Self, Self::Error> {
		match (wire.ty.as_str(), wire.target_class) {
			("Pointer", Some(target)) => Ok(Self::pointer(target)),
			("Pointer", None) => Err("pointer field without a targetClass".to_string()),
			(_, _) => Ok(Self::scalar(wire.ty)),
		}
	}
}

impl From<FieldDescriptor> for WireField {
	fn from(fd: FieldDescriptor) -> Self {
		match fd.kind {
			FieldKind::Scalar(ty) => WireField {
				ty,
				target_class: None,
			},
			FieldKind::Pointer {
				target,
			} => WireField {
				ty: "Pointer".to_string(),
				target_class: Some(target),
			},
			FieldKind::ReversePointer {
				target,
				..
			} => WireField {
				ty: "ReversePointer".to_string(),
				target_class: Some(target),
			},
			FieldKind::HookFunction {
				..
			} => WireField {
				ty: "HookFunction".to_string(),
				target_class: None,
			},
		}
	}
}

/// A named set of field descriptors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
	pub class_name: String,
	#[serde(default)]
	pub fields: BTreeMap<String, FieldDescriptor>,
}

impl ClassSchema {
	pub fn new(class_name: impl Into<String>) -> Self {
		Self {
			class_name: class_name.into(),
			fields: BTreeMap::new(),
		}
	}

	pub fn with_field(mut self, name: impl Into<String>, fd: FieldDescriptor) -> Self {
		self.fields.insert(name.into(), fd);
		self
	}

	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.get(name)
	}
}

/// A remote function, as listed by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
	pub function_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Where a function is exposed once the registry is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionTarget<'a> {
	/// A field named `local` on class `owner`.
	Class {
		owner: &'a str,
		local: &'a str,
	},
	/// A root field named after the full function name.
	Global,
}

impl FunctionDescriptor {
	pub fn new(function_name: impl Into<String>) -> Self {
		Self {
			function_name: function_name.into(),
			url: None,
		}
	}

	/// Splits the name on the first separator. The function belongs to a
	/// class only when the prefix names a known class and the suffix is not
	/// empty.
	pub fn target<'a>(&'a self, classes: &BTreeMap<String, ClassSchema>) -> FunctionTarget<'a> {
		match self.function_name.split_once(FUNCTION_SEPARATOR) {
			Some((owner, local)) if !local.is_empty() && classes.contains_key(owner) => {
				FunctionTarget::Class {
					owner,
					local,
				}
			}
			_ => FunctionTarget::Global,
		}
	}
}

/// The class schemas of a store, keyed by class name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
	classes: BTreeMap<String, ClassSchema>,
	globals: Vec<FunctionDescriptor>,
	decorated: bool,
}

impl Registry {
	/// Builds an undecorated registry from the classes of a store.
	pub fn new(classes: impl IntoIterator<Item = ClassSchema>) -> Self {
		Self {
			classes: classes.into_iter().map(|c| (c.class_name.clone(), c)).collect(),
			globals: Vec::new(),
			decorated: false,
		}
	}

	pub(crate) fn decorated(
		classes: BTreeMap<String, ClassSchema>,
		globals: Vec<FunctionDescriptor>,
	) -> Self {
		Self {
			classes,
			globals,
			decorated: true,
		}
	}

	pub fn is_decorated(&self) -> bool {
		self.decorated
	}

	pub fn class(&self, name: &str) -> Option<&ClassSchema> {
		self.classes.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.classes.contains_key(name)
	}

	/// Iterates the classes in lexicographic order.
	pub fn classes(&self) -> impl Iterator<Item = &ClassSchema> {
		self.classes.values()
	}

	pub(crate) fn class_map(&self) -> &BTreeMap<String, ClassSchema> {
		&self.classes
	}

	/// Functions not attributable to any class.
	pub fn globals(&self) -> &[FunctionDescriptor] {
		&self.globals
	}

	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}
}
