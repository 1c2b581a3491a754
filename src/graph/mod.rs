//! Graph database driver abstraction.
//!
//! The migration runner only needs a very small surface from the database:
//! open a session, run a parameterized query, read back the records, and
//! close the session again. Anything implementing [`GraphConnection`] can be
//! handed to the [`Migrator`](crate::migration::Migrator).
//!
//! Two drivers ship with the crate:
//!
//! - [`HttpGraph`] talks to a Neo4j server through its HTTP transactional API
//! - [`MemoryGraph`] keeps migration markers in process and is used by tests

mod http;
mod memory;

pub use http::HttpGraph;
pub use memory::MemoryGraph;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Named query parameters (`$appName`, `$migration`, ...).
pub type Params = Map<String, Value>;

/// A single result row, keyed by column name.
pub type Record = Map<String, Value>;

/// Error types for graph driver operations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Query failed ({code}): {message}")]
    QueryFailed { code: String, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Records returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub records: Vec<Record>,
}

/// A configured database driver able to hand out sessions.
#[async_trait]
pub trait GraphConnection: Send + Sync {
    /// Open a new session.
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError>;
}

/// A short-lived unit of work against the database.
#[async_trait]
pub trait GraphSession: Send {
    /// Run a query with named parameters.
    async fn run(&mut self, query: &str, params: Params) -> Result<QueryResult, GraphError>;

    /// Release the session.
    async fn close(self: Box<Self>);
}

/// Run one query in its own session.
///
/// The session is closed whether the query succeeds or fails.
pub async fn run_query(
    connection: &dyn GraphConnection,
    query: &str,
    params: Params,
) -> Result<QueryResult, GraphError> {
    let mut session = connection.session().await?;
    let result = session.run(query, params).await;
    session.close().await;
    result
}

/// Build a parameter map from name/value pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
