/// The publicly visible name of the server
pub const PKG_NAME: &str = "parsegql";

/// The version of the server
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The value of the `Server` header on every response
pub const SERVER_NAME: &str = concat!("parsegql/", env!("CARGO_PKG_VERSION"));

/// The path serving GraphQL requests and the GraphiQL IDE
pub const GRAPHQL_PATH: &str = "/graphql";

/// The name of the response extension carrying the number of remote calls
pub const QUERIES_EXTENSION: &str = "queries";

/// The default address the server listens on
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// The default Parse server endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.parse.com";
