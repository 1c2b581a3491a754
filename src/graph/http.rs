//! Neo4j HTTP transactional API driver.

use super::{GraphConnection, GraphError, GraphSession, Params, QueryResult, Record};
use crate::config::ConnectionSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Driver that sends each query to `{url}/db/{database}/tx/commit`.
///
/// Every query is committed on its own, so a session carries no server-side
/// state and closing it only drops the local handle.
#[derive(Debug, Clone)]
pub struct HttpGraph {
    client: Client,
    endpoint: String,
    user: Option<String>,
    password: Option<String>,
}

impl HttpGraph {
    /// Create a driver from connection settings.
    pub fn new(settings: &ConnectionSettings) -> Result<Self, GraphError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: commit_endpoint(&settings.url, &settings.database),
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }

    /// The auto-commit endpoint queries are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphConnection for HttpGraph {
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        Ok(Box::new(HttpSession {
            graph: self.clone(),
        }))
    }
}

struct HttpSession {
    graph: HttpGraph,
}

#[async_trait]
impl GraphSession for HttpSession {
    async fn run(&mut self, query: &str, params: Params) -> Result<QueryResult, GraphError> {
        debug!(endpoint = %self.graph.endpoint, query, "Running query");

        let body = TxRequest {
            statements: vec![Statement {
                statement: query,
                parameters: params,
            }],
        };

        let mut request = self.graph.client.post(&self.graph.endpoint).json(&body);
        if let Some(user) = &self.graph.user {
            request = request.basic_auth(user, self.graph.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed: TxResponse = serde_json::from_str(&text).map_err(|_| {
            GraphError::UnexpectedResponse(format!("HTTP {}: {}", status, text))
        })?;

        if !status.is_success() && parsed.errors.is_empty() {
            return Err(GraphError::UnexpectedResponse(format!("HTTP {}", status)));
        }

        parsed.into_result()
    }

    async fn close(self: Box<Self>) {}
}

fn commit_endpoint(url: &str, database: &str) -> String {
    format!("{}/db/{}/tx/commit", url.trim_end_matches('/'), database)
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Params,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl TxResponse {
    fn into_result(self) -> Result<QueryResult, GraphError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(GraphError::QueryFailed {
                code: err.code,
                message: err.message,
            });
        }

        let records = match self.results.into_iter().next() {
            Some(result) => result
                .data
                .into_iter()
                .map(|row| zip_row(&result.columns, row.row))
                .collect(),
            None => Vec::new(),
        };

        Ok(QueryResult { records })
    }
}

fn zip_row(columns: &[String], row: Vec<Value>) -> Record {
    columns.iter().cloned().zip(row).collect()
}
