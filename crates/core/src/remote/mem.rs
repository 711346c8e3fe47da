//! An in-process [`Store`].
//!
//! Supports equality filters (including pointer equality), ordering on
//! comma separated keys, skip, limit, users with session tokens, and
//! functions backed by closures. Every call is counted.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use super::{Credentials, NewUser, QuerySpec, Store};
use crate::catalog::{ClassSchema, FunctionDescriptor, Row};
use crate::err::{Error, OBJECT_NOT_FOUND};

/// Computes the `result` of a function from its argument.
pub type FunctionHandler = Arc<dyn Fn(Option<&Row>) -> Value + Send + Sync>;

#[derive(Clone, Default)]
struct Data {
	classes: BTreeMap<String, ClassSchema>,
	rows: BTreeMap<String, Vec<Row>>,
	functions: BTreeMap<String, FunctionHandler>,
}

#[derive(Default)]
struct Users {
	accounts: Vec<(Row, String)>,
	sessions: BTreeMap<String, String>,
}

/// A store held in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
	data: Arc<Data>,
	users: Arc<RwLock<Users>>,
	session: Option<String>,
	calls: Arc<AtomicUsize>,
}

impl fmt::Debug for MemoryStore {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("MemoryStore")
			.field("classes", &self.data.classes.keys().collect::<Vec<_>>())
			.field("functions", &self.data.functions.keys().collect::<Vec<_>>())
			.field("session", &self.session)
			.finish()
	}
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_class(mut self, class: ClassSchema) -> Self {
		let data = Arc::make_mut(&mut self.data);
		data.rows.entry(class.class_name.clone()).or_default();
		data.classes.insert(class.class_name.clone(), class);
		self
	}

	/// Appends rows to a class. Rows are expected to carry an `objectId`.
	pub fn with_rows(mut self, class: &str, rows: impl IntoIterator<Item = Row>) -> Self {
		Arc::make_mut(&mut self.data).rows.entry(class.to_string()).or_default().extend(rows);
		self
	}

	pub fn with_function(
		mut self,
		name: &str,
		handler: impl Fn(Option<&Row>) -> Value + Send + Sync + 'static,
	) -> Self {
		Arc::make_mut(&mut self.data).functions.insert(name.to_string(), Arc::new(handler));
		self
	}

	/// The number of calls made against this store and its scoped clones.
	pub fn calls(&self) -> usize {
		self.calls.load(AtomicOrdering::SeqCst)
	}

	fn count(&self) {
		self.calls.fetch_add(1, AtomicOrdering::SeqCst);
	}
}

fn satisfies(row: &Row, filter: &Row) -> bool {
	filter.iter().all(|(key, expected)| {
		let actual = row.get(key).unwrap_or(&Value::Null);
		match expected {
			Value::Object(o) if o.get("__type") == Some(&json!("Pointer")) => {
				actual.get("objectId") == o.get("objectId")
					&& actual.get("className") == o.get("className")
			}
			expected => actual == expected,
		}
	})
}

fn compare(a: &Value, b: &Value) -> Ordering {
	match (a, b) {
		(Value::Number(a), Value::Number(b)) => {
			let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
			a.partial_cmp(&b).unwrap_or(Ordering::Equal)
		}
		(Value::String(a), Value::String(b)) => a.cmp(b),
		(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
		(Value::Null, Value::Null) => Ordering::Equal,
		(Value::Null, _) => Ordering::Less,
		(_, Value::Null) => Ordering::Greater,
		_ => Ordering::Equal,
	}
}

fn sort(rows: &mut [Row], order: &str) {
	let keys: Vec<(&str, bool)> = order
		.split(',')
		.map(str::trim)
		.filter(|k| !k.is_empty())
		.map(|k| match k.strip_prefix('-') {
			Some(k) => (k, true),
			None => (k, false),
		})
		.collect();
	if keys.is_empty() {
		return;
	}
	rows.sort_by(|a, b| {
		for (key, desc) in &keys {
			let (x, y) = (a.get(*key).unwrap_or(&Value::Null), b.get(*key).unwrap_or(&Value::Null));
			let ord = compare(x, y);
			let ord = if *desc {
				ord.reverse()
			} else {
				ord
			};
			if ord != Ordering::Equal {
				return ord;
			}
		}
		Ordering::Equal
	});
}

#[async_trait]
impl Store for MemoryStore {
	async fn fetch_schema(&self) -> Result<Vec<ClassSchema>, Error> {
		self.count();
		Ok(self.data.classes.values().cloned().collect())
	}

	async fn fetch_functions(&self) -> Result<Vec<FunctionDescriptor>, Error> {
		self.count();
		Ok(self.data.functions.keys().map(FunctionDescriptor::new).collect())
	}

	async fn get_row(&self, class: &str, id: &str) -> Result<Row, Error> {
		self.count();
		self.data
			.rows
			.get(class)
			.and_then(|rows| rows.iter().find(|r| r.get("objectId") == Some(&json!(id))))
			.cloned()
			.ok_or(Error::NotFound)
	}

	async fn query_rows(&self, class: &str, spec: &QuerySpec) -> Result<Vec<Row>, Error> {
		self.count();
		let Some(rows) = self.data.rows.get(class) else {
			return Ok(Vec::new());
		};
		let mut rows: Vec<Row> = rows.iter().filter(|r| satisfies(r, &spec.filter)).cloned().collect();
		sort(&mut rows, &spec.order);
		Ok(rows.into_iter().skip(spec.skip).take(spec.limit).collect())
	}

	async fn invoke_function(&self, name: &str, argument: Option<&Row>) -> Result<Bytes, Error> {
		self.count();
		let handler = self
			.data
			.functions
			.get(name)
			.ok_or_else(|| Error::remote(141, format!("Invalid function: \"{name}\"")))?;
		let envelope = json!({ "result": handler(argument) });
		Ok(Bytes::from(serde_json::to_vec(&envelope)?))
	}

	async fn create_user(&self, user: &NewUser) -> Result<Row, Error> {
		self.count();
		let mut users = self.users.write().await;
		if users.accounts.iter().any(|(r, _)| r.get("username") == Some(&json!(user.username))) {
			return Err(Error::remote(202, "Account already exists for this username."));
		}
		let id = format!("user{}", users.accounts.len() + 1);
		let token = format!("r:{id}");
		let mut row = Row::new();
		row.insert("objectId".into(), json!(id));
		row.insert("username".into(), json!(user.username));
		row.insert("email".into(), json!(user.email));
		users.accounts.push((row.clone(), user.password.clone()));
		users.sessions.insert(token.clone(), id);
		row.insert("sessionToken".into(), json!(token));
		Ok(row)
	}

	async fn log_in(&self, credentials: &Credentials) -> Result<Row, Error> {
		self.count();
		let mut users = self.users.write().await;
		let mut row = users
			.accounts
			.iter()
			.find(|(r, pw)| {
				r.get("username") == Some(&json!(credentials.username))
					&& *pw == credentials.password
			})
			.map(|(r, _)| r.clone())
			.ok_or_else(|| Error::remote(OBJECT_NOT_FOUND, "Invalid username/password."))?;
		let id = row.get("objectId").and_then(Value::as_str).unwrap_or_default().to_string();
		let token = format!("r:{id}:{}", users.sessions.len() + 1);
		users.sessions.insert(token.clone(), id);
		row.insert("sessionToken".into(), json!(token));
		Ok(row)
	}

	async fn current_user(&self) -> Result<Row, Error> {
		self.count();
		let users = self.users.read().await;
		let id = self
			.session
			.as_ref()
			.and_then(|token| users.sessions.get(token))
			.ok_or_else(|| Error::remote(209, "Invalid session token"))?;
		users
			.accounts
			.iter()
			.find(|(r, _)| r.get("objectId") == Some(&json!(id)))
			.map(|(r, _)| r.clone())
			.ok_or(Error::NotFound)
	}

	fn with_session(&self, token: &str) -> Arc<dyn Store> {
		let mut scoped = self.clone();
		scoped.session = Some(token.to_string());
		Arc::new(scoped)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(v: Value) -> Row {
		match v {
			Value::Object(o) => o,
			_ => unreachable!(),
		}
	}

	fn store() -> MemoryStore {
		MemoryStore::new().with_class(ClassSchema::new("Task")).with_rows(
			"Task",
			[
				row(json!({"objectId": "a", "score": 3, "status": "done"})),
				row(json!({"objectId": "b", "score": 1, "status": "open"})),
				row(json!({"objectId": "c", "score": 2, "status": "done"})),
				row(json!({"objectId": "d", "owner": {"__type": "Pointer", "className": "_User", "objectId": "u1"}})),
			],
		)
	}

	#[tokio::test]
	async fn filters_orders_and_paginates() {
		let store = store();
		let mut spec = QuerySpec::new(10);
		spec.filter.insert("status".into(), json!("done"));
		spec.order = "-score".into();
		let ids: Vec<_> = store
			.query_rows("Task", &spec)
			.await
			.unwrap()
			.into_iter()
			.map(|r| r["objectId"].clone())
			.collect();
		assert_eq!(ids, vec![json!("a"), json!("c")]);

		let mut spec = QuerySpec::new(1);
		spec.order = "score".into();
		spec.skip = 1;
		let rows = store.query_rows("Task", &spec).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["objectId"], json!("b"));
		assert_eq!(store.calls(), 2);
	}

	#[tokio::test]
	async fn pointer_equality() {
		let mut spec = QuerySpec::new(10);
		spec.filter.insert(
			"owner".into(),
			json!({"__type": "Pointer", "className": "_User", "objectId": "u1"}),
		);
		let rows = store().query_rows("Task", &spec).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["objectId"], json!("d"));
	}

	#[tokio::test]
	async fn sessions() {
		let store = MemoryStore::new();
		let user = store
			.create_user(&NewUser {
				username: "alice".into(),
				password: "pw".into(),
				email: "a@example.com".into(),
			})
			.await
			.unwrap();
		let token = user["sessionToken"].as_str().unwrap();
		let me = store.with_session(token).current_user().await.unwrap();
		assert_eq!(me["username"], json!("alice"));
		assert!(store.current_user().await.is_err());
		let bad = Credentials {
			username: "alice".into(),
			password: "nope".into(),
		};
		assert!(store.log_in(&bad).await.is_err());
	}
}
