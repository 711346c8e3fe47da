use std::sync::LazyLock;

/// The number of rows returned by a class query when no `limit` is given.
pub static DEFAULT_LIMIT: LazyLock<usize> = lazy_env_parse!("PARSEGQL_DEFAULT_LIMIT", usize, 5);

/// The number of rows fetched per batch when scanning a whole class.
pub static BULK_BATCH_SIZE: LazyLock<usize> =
	lazy_env_parse!("PARSEGQL_BULK_BATCH_SIZE", usize, 1000);

/// Timeout in seconds applied to every request made to the remote store.
pub static REMOTE_TIMEOUT_SECS: LazyLock<u64> =
	lazy_env_parse!("PARSEGQL_REMOTE_TIMEOUT_SECS", u64, 30);

/// The separator between an owning class and the local name of a function.
pub const FUNCTION_SEPARATOR: char = '_';

/// The request header carrying a user session token.
pub const SESSION_HEADER: &str = "X-Parse-Session-Token";

/// The class holding user accounts in the remote store.
pub const USER_CLASS: &str = "_User";

/// The field used to order rows during bulk iteration.
pub const CREATION_ORDER: &str = "createdAt";
