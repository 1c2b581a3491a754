//! In-process graph used by tests.

use super::{GraphConnection, GraphError, GraphSession, Params, QueryResult, Record};
use crate::status::{DELETE_MARKER, INSERT_MARKER, SELECT_STATUS};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    /// app -> marker records, in insertion order
    markers: HashMap<String, Vec<Record>>,
    statements: Vec<String>,
    fail_patterns: Vec<String>,
    open_sessions: usize,
}

/// A graph that understands the migration marker queries and records every
/// other statement it is asked to run.
///
/// Clones share the same state, so a test can keep a handle while the
/// migrator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-query.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every statement containing `pattern` fail.
    pub fn fail_on(&self, pattern: &str) {
        self.lock().fail_patterns.push(pattern.to_string());
    }

    /// Insert a marker directly, bypassing the status store.
    pub fn insert_marker(&self, app: &str, migration: &str) {
        let record = marker_record(app, migration, None);
        self.lock()
            .markers
            .entry(app.to_string())
            .or_default()
            .push(record);
    }

    /// Marker identifiers for an app, in insertion order.
    pub fn markers(&self, app: &str) -> Vec<String> {
        self.lock()
            .markers
            .get(app)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r.get("migration").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Statements run that were not marker queries.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Number of sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }
}

#[async_trait]
impl GraphConnection for MemoryGraph {
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        self.lock().open_sessions += 1;
        Ok(Box::new(MemorySession {
            graph: self.clone(),
        }))
    }
}

struct MemorySession {
    graph: MemoryGraph,
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn run(&mut self, query: &str, params: Params) -> Result<QueryResult, GraphError> {
        let mut state = self.graph.lock();

        if let Some(pattern) = state.fail_patterns.iter().find(|p| query.contains(p.as_str())) {
            return Err(GraphError::QueryFailed {
                code: "Memory.InjectedFailure".to_string(),
                message: format!("statement matched failure pattern '{}'", pattern),
            });
        }

        let app = param_str(&params, "appName");
        let migration = param_str(&params, "migration");

        match query {
            SELECT_STATUS => {
                let records = state.markers.get(&app).cloned().unwrap_or_default();
                Ok(QueryResult { records })
            }
            INSERT_MARKER => {
                let created_at = params.get("createdAt").and_then(Value::as_str);
                let record = marker_record(&app, &migration, created_at);
                state.markers.entry(app).or_default().push(record);
                Ok(QueryResult::default())
            }
            DELETE_MARKER => {
                if let Some(records) = state.markers.get_mut(&app) {
                    records.retain(|r| r.get("migration").and_then(Value::as_str) != Some(migration.as_str()));
                }
                Ok(QueryResult::default())
            }
            _ => {
                state.statements.push(query.to_string());
                Ok(QueryResult::default())
            }
        }
    }

    async fn close(self: Box<Self>) {
        let mut state = self.graph.lock();
        state.open_sessions = state.open_sessions.saturating_sub(1);
    }
}

fn param_str(params: &Params, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn marker_record(app: &str, migration: &str, created_at: Option<&str>) -> Record {
    let mut record = Record::new();
    record.insert("app".to_string(), Value::from(app));
    record.insert("migration".to_string(), Value::from(migration));
    record.insert(
        "createdAt".to_string(),
        created_at.map(Value::from).unwrap_or(Value::Null),
    );
    record
}
