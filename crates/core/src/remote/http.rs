//! A [`Store`] speaking the Parse REST API.
//!
//! Every request carries the application id and either the REST API key or
//! the master key. Session scoped clients add the session token header.
//! Error envelopes of the form `{ "code": 101, "error": "..." }` are mapped
//! onto [`Error`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{Credentials, NewUser, QuerySpec, Store};
use crate::catalog::{ClassSchema, FunctionDescriptor, Row};
use crate::cnf::{REMOTE_TIMEOUT_SECS, SESSION_HEADER};
use crate::err::Error;

const TARGET: &str = "parsegql::core::remote::http";

const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";
const MASTER_KEY_HEADER: &str = "X-Parse-Master-Key";

#[derive(Deserialize)]
struct Results<T> {
	results: Vec<T>,
}

/// The function list, either wrapped in `results` or as a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum FunctionList {
	Wrapped(Results<FunctionDescriptor>),
	Bare(Vec<FunctionDescriptor>),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
	code: i64,
	error: String,
}

/// A client of a Parse compatible server.
#[derive(Clone, Debug)]
pub struct HttpStore {
	base: Url,
	application_id: String,
	rest_api_key: Option<String>,
	master_key: Option<String>,
	session: Option<String>,
	client: reqwest::Client,
}

impl HttpStore {
	/// Creates a client for the server at `endpoint`, for example
	/// `https://api.parse.com` or `http://localhost:1337/parse`.
	pub fn new(endpoint: &str, application_id: impl Into<String>) -> Result<Self, Error> {
		let mut base = Url::parse(endpoint)?;
		if base.cannot_be_a_base() {
			return Err(Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
		}
		base.set_query(None);
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(*REMOTE_TIMEOUT_SECS))
			.build()?;
		Ok(Self {
			base,
			application_id: application_id.into(),
			rest_api_key: None,
			master_key: None,
			session: None,
			client,
		})
	}

	pub fn with_rest_api_key(mut self, key: impl Into<String>) -> Self {
		self.rest_api_key = Some(key.into());
		self
	}

	/// Authenticates every request with the master key instead of the REST API key.
	pub fn with_master_key(mut self, key: impl Into<String>) -> Self {
		self.master_key = Some(key.into());
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
		self.client = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(self)
	}

	fn url(&self, segments: &[&str]) -> Result<Url, Error> {
		let mut url = self.base.clone();
		url.path_segments_mut()
			.map_err(|_| Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
			.pop_if_empty()
			.push("1")
			.extend(segments);
		Ok(url)
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		let mut req =
			self.client.request(method, url).header(APPLICATION_ID_HEADER, &self.application_id);
		if let Some(key) = &self.master_key {
			req = req.header(MASTER_KEY_HEADER, key);
		} else if let Some(key) = &self.rest_api_key {
			req = req.header(REST_API_KEY_HEADER, key);
		}
		if let Some(token) = &self.session {
			req = req.header(SESSION_HEADER, token);
		}
		req
	}

	async fn send(&self, req: RequestBuilder) -> Result<Bytes, Error> {
		read(req.send().await?).await
	}

	async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Error> {
		let body = self.send(req).await?;
		Ok(serde_json::from_slice(&body)?)
	}
}

async fn read(response: Response) -> Result<Bytes, Error> {
	let status = response.status();
	let body = response.bytes().await?;
	match status.as_u16() {
		200 | 201 => Ok(body),
		401 | 403 => Err(Error::Unauthorized),
		code => match serde_json::from_slice::<ErrorEnvelope>(&body) {
			Ok(envelope) => Err(Error::remote(envelope.code, envelope.error)),
			Err(_) if code == 404 => Err(Error::NotFound),
			Err(_) => Err(Error::UnexpectedStatus {
				status: code,
				body: String::from_utf8_lossy(&body).into_owned(),
			}),
		},
	}
}

#[async_trait]
impl Store for HttpStore {
	async fn fetch_schema(&self) -> Result<Vec<ClassSchema>, Error> {
		debug!(target: TARGET, "Fetching class schemas");
		let url = self.url(&["schemas"])?;
		let res: Results<ClassSchema> = self.send_json(self.request(Method::GET, url)).await?;
		Ok(res.results)
	}

	async fn fetch_functions(&self) -> Result<Vec<FunctionDescriptor>, Error> {
		debug!(target: TARGET, "Fetching function list");
		let url = self.url(&["hooks", "functions"])?;
		Ok(match self.send_json(self.request(Method::GET, url)).await? {
			FunctionList::Wrapped(res) => res.results,
			FunctionList::Bare(fns) => fns,
		})
	}

	async fn get_row(&self, class: &str, id: &str) -> Result<Row, Error> {
		trace!(target: TARGET, class, id, "Fetching row");
		let url = self.url(&["classes", class, id])?;
		self.send_json(self.request(Method::GET, url)).await.map_err(Error::into_not_found)
	}

	async fn query_rows(&self, class: &str, spec: &QuerySpec) -> Result<Vec<Row>, Error> {
		let mut url = self.url(&["classes", class])?;
		{
			let mut query = url.query_pairs_mut();
			if !spec.filter.is_empty() {
				query.append_pair("where", &serde_json::to_string(&spec.filter)?);
			}
			query.append_pair("limit", &spec.limit.to_string());
			if !spec.order.is_empty() {
				query.append_pair("order", &spec.order);
			}
			if spec.skip > 0 {
				query.append_pair("skip", &spec.skip.to_string());
			}
			if let Some(keys) = &spec.keys {
				query.append_pair("keys", keys);
			}
			if let Some(include) = &spec.include {
				query.append_pair("include", include);
			}
		}
		trace!(target: TARGET, class, query = url.query(), "Querying rows");
		let res: Results<Row> = self.send_json(self.request(Method::GET, url)).await?;
		Ok(res.results)
	}

	async fn invoke_function(&self, name: &str, argument: Option<&Row>) -> Result<Bytes, Error> {
		trace!(target: TARGET, name, "Invoking function");
		let url = self.url(&["functions", name])?;
		let empty = Row::new();
		let body = argument.unwrap_or(&empty);
		self.send(self.request(Method::POST, url).json(body)).await
	}

	async fn create_user(&self, user: &NewUser) -> Result<Row, Error> {
		debug!(target: TARGET, username = %user.username, "Creating user");
		let url = self.url(&["users"])?;
		let mut row: Row = self.send_json(self.request(Method::POST, url).json(user)).await?;
		// The store only echoes the generated fields
		row.entry("username").or_insert_with(|| user.username.clone().into());
		row.entry("email").or_insert_with(|| user.email.clone().into());
		Ok(row)
	}

	async fn log_in(&self, credentials: &Credentials) -> Result<Row, Error> {
		debug!(target: TARGET, username = %credentials.username, "Logging in");
		let mut url = self.url(&["login"])?;
		url.query_pairs_mut()
			.append_pair("username", &credentials.username)
			.append_pair("password", &credentials.password);
		self.send_json(self.request(Method::GET, url)).await
	}

	async fn current_user(&self) -> Result<Row, Error> {
		let url = self.url(&["users", "me"])?;
		self.send_json(self.request(Method::GET, url)).await
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
	use serde_json::json;
	use wiremock::matchers::{body_json, header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn store(server: &MockServer) -> HttpStore {
		HttpStore::new(&server.uri(), "app").unwrap().with_rest_api_key("rest")
	}

	#[test]
	fn url_keeps_the_mount_path() {
		let store = HttpStore::new("http://localhost:1337/parse/", "app").unwrap();
		assert_eq!(
			store.url(&["classes", "Dog", "abc"]).unwrap().as_str(),
			"http://localhost:1337/parse/1/classes/Dog/abc"
		);
		let store = HttpStore::new("http://localhost:1337", "app").unwrap();
		assert_eq!(store.url(&["schemas"]).unwrap().as_str(), "http://localhost:1337/1/schemas");
	}

	#[test]
	fn rejects_non_base_endpoints() {
		assert!(HttpStore::new("mailto:someone@example.com", "app").is_err());
		assert!(HttpStore::new("not a url", "app").is_err());
	}

	#[tokio::test]
	async fn get_row_sends_credentials() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/classes/Dog/abc"))
			.and(header("X-Parse-Application-Id", "app"))
			.and(header("X-Parse-REST-API-Key", "rest"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({"objectId": "abc", "name": "Rex"})),
			)
			.expect(1)
			.mount(&server)
			.await;

		let row = store(&server).get_row("Dog", "abc").await.unwrap();
		assert_eq!(row.get("name"), Some(&json!("Rex")));
	}

	#[tokio::test]
	async fn master_key_replaces_rest_key() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/schemas"))
			.and(header("X-Parse-Master-Key", "master"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"results": [
					{ "className": "Dog", "fields": { "owner": { "type": "Pointer", "targetClass": "_User" } } },
					{ "className": "_User", "fields": { "username": { "type": "String" } } },
				]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let classes = store(&server).with_master_key("master").fetch_schema().await.unwrap();
		assert_eq!(classes.len(), 2);
		assert_eq!(classes[0].class_name, "Dog");
		assert_eq!(classes[0].field("owner").and_then(|f| f.kind.target_class()), Some("_User"));
	}

	#[tokio::test]
	async fn missing_object_is_not_found() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/classes/Dog/missing"))
			.respond_with(
				ResponseTemplate::new(404)
					.set_body_json(json!({"code": 101, "error": "Object not found."})),
			)
			.mount(&server)
			.await;

		let err = store(&server).get_row("Dog", "missing").await.unwrap_err();
		assert!(matches!(err, Error::NotFound), "{err:?}");
	}

	#[tokio::test]
	async fn error_envelope_is_reported() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/classes/Dog"))
			.respond_with(
				ResponseTemplate::new(400)
					.set_body_json(json!({"code": 102, "error": "Invalid key name"})),
			)
			.mount(&server)
			.await;

		let err = store(&server).query_rows("Dog", &QuerySpec::new(5)).await.unwrap_err();
		match err {
			Error::Remote {
				code,
				message,
			} => {
				assert_eq!(code, 102);
				assert_eq!(message, "Invalid key name");
			}
			err => panic!("unexpected error: {err:?}"),
		}
	}

	#[tokio::test]
	async fn rejected_credentials() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/users/me"))
			.respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
			.mount(&server)
			.await;

		let err = store(&server).current_user().await.unwrap_err();
		assert!(matches!(err, Error::Unauthorized), "{err:?}");
	}

	#[tokio::test]
	async fn query_rows_encodes_the_spec() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/classes/Task"))
			.and(query_param("where", r#"{"status":"done"}"#))
			.and(query_param("limit", "10"))
			.and(query_param("order", "-createdAt"))
			.and(query_param("skip", "20"))
			.and(query_param("include", "owner"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"results": [ { "objectId": "a" }, { "objectId": "b" } ]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let mut spec = QuerySpec::new(10);
		spec.filter.insert("status".into(), json!("done"));
		spec.order = "-createdAt".into();
		spec.skip = 20;
		spec.include = Some("owner".into());
		let rows = store(&server).query_rows("Task", &spec).await.unwrap();
		let ids: Vec<_> = rows.iter().map(|r| r["objectId"].clone()).collect();
		assert_eq!(ids, vec![json!("a"), json!("b")]);
	}

	#[tokio::test]
	async fn invoke_function_posts_the_argument() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/1/functions/hello"))
			.and(body_json(json!({"name": "Rex"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "Hi Rex"})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/1/functions/ping"))
			.and(body_json(json!({})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "pong"})))
			.expect(1)
			.mount(&server)
			.await;

		let store = store(&server);
		let mut arg = Row::new();
		arg.insert("name".into(), json!("Rex"));
		let body = store.invoke_function("hello", Some(&arg)).await.unwrap();
		assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), json!({"result": "Hi Rex"}));
		let body = store.invoke_function("ping", None).await.unwrap();
		assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), json!({"result": "pong"}));
	}

	#[tokio::test]
	async fn session_scoped_client_sends_token() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/users/me"))
			.and(header("X-Parse-Session-Token", "r:123"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(json!({"objectId": "u1", "username": "alice"})),
			)
			.expect(1)
			.mount(&server)
			.await;

		let scoped = store(&server).with_session("r:123");
		let row = scoped.current_user().await.unwrap();
		assert_eq!(row.get("username"), Some(&json!("alice")));
	}

	#[tokio::test]
	async fn sign_up_and_log_in() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/1/users"))
			.and(body_json(json!({"username": "alice", "password": "pw", "email": "a@example.com"})))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({
				"objectId": "u1",
				"createdAt": "2024-01-01T00:00:00.000Z",
				"sessionToken": "r:abc",
			})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/1/login"))
			.and(query_param("username", "alice"))
			.and(query_param("password", "pw"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"objectId": "u1",
				"username": "alice",
				"sessionToken": "r:def",
			})))
			.expect(1)
			.mount(&server)
			.await;

		let store = store(&server);
		let user = store
			.create_user(&NewUser {
				username: "alice".into(),
				password: "pw".into(),
				email: "a@example.com".into(),
			})
			.await
			.unwrap();
		assert_eq!(user.get("username"), Some(&json!("alice")));
		assert_eq!(user.get("email"), Some(&json!("a@example.com")));
		assert_eq!(user.get("sessionToken"), Some(&json!("r:abc")));

		let user = store
			.log_in(&Credentials {
				username: "alice".into(),
				password: "pw".into(),
			})
			.await
			.unwrap();
		assert_eq!(user.get("sessionToken"), Some(&json!("r:def")));
	}

	#[tokio::test]
	async fn fetch_functions_lists_hooks() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/hooks/functions"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([
				{ "functionName": "Dog_bark", "url": "https://hooks.example.com/bark" },
				{ "functionName": "hello" },
			])))
			.mount(&server)
			.await;

		let fns = store(&server).fetch_functions().await.unwrap();
		assert_eq!(fns[0].function_name, "Dog_bark");
		assert_eq!(fns[0].url.as_deref(), Some("https://hooks.example.com/bark"));
		assert_eq!(fns[1], FunctionDescriptor::new("hello"));
	}

	#[tokio::test]
	async fn fetch_functions_reads_results_envelope() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/hooks/functions"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"results": [
					{ "functionName": "Dog_bark", "url": "https://hooks.example.com/bark" },
				]
			})))
			.mount(&server)
			.await;

		let fns = store(&server).fetch_functions().await.unwrap();
		assert_eq!(fns.len(), 1);
		assert_eq!(fns[0].function_name, "Dog_bark");
	}

	#[tokio::test]
	async fn failed_log_in_keeps_the_store_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/1/login"))
			.respond_with(
				ResponseTemplate::new(404)
					.set_body_json(json!({"code": 101, "error": "Invalid username/password."})),
			)
			.mount(&server)
			.await;

		let err = store(&server)
			.log_in(&Credentials {
				username: "alice".into(),
				password: "nope".into(),
			})
			.await
			.unwrap_err();
		assert!(
			matches!(&err, Error::Remote { code: 101, message } if message == "Invalid username/password."),
			"{err:?}"
		);
	}
}
