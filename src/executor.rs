use crate::backend::{DriverCatalog, Query, QueryResult, Session};
use crate::cache::{CacheStats, QueryCache};
use crate::connection::ConnectionManager;
use crate::error::DashError;
use crate::output::Notifier;
use crate::verbose::Timer;
use std::sync::Arc;
use tracing::debug;

/// Answer to a run without a query; a liveness probe for the executor itself.
pub const PROBE_SENTINEL: &str = "HI";

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    Sentinel(&'static str),
    Rows(Arc<QueryResult>),
}

impl RunOutput {
    /// The tabular result, or `None` for the sentinel.
    pub fn rows(&self) -> Option<&Arc<QueryResult>> {
        match self {
            RunOutput::Rows(r) => Some(r),
            RunOutput::Sentinel(_) => None,
        }
    }
}

/// Runs queries over the managed connection, memoizing results per query.
pub struct QueryExecutor<C: DriverCatalog> {
    connections: ConnectionManager<C>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    query_timeout_secs: Option<u64>,
    invalidate_on_write: bool,
}

impl<C: DriverCatalog> QueryExecutor<C> {
    pub fn new(
        connections: ConnectionManager<C>,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            connections,
            cache,
            notifier,
            query_timeout_secs: None,
            invalidate_on_write: false,
        }
    }

    pub fn with_query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = Some(secs);
        self
    }

    /// Clear the whole cache after every successful write.
    pub fn with_invalidate_on_write(mut self, enabled: bool) -> Self {
        self.invalidate_on_write = enabled;
        self
    }

    /// Where user-visible messages go.
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn connections(&self) -> &ConnectionManager<C> {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionManager<C> {
        &mut self.connections
    }

    /// Run `query`, degrading every failure to an empty result.
    ///
    /// `None` returns the probe sentinel without touching the connection.
    /// Execution errors are reported once through the notifier; a missing
    /// connection was already reported when resolution failed.
    pub fn run(&mut self, query: Option<&Query>) -> RunOutput {
        let Some(query) = query else {
            return RunOutput::Sentinel(PROBE_SENTINEL);
        };
        match self.try_run(query) {
            Ok(result) => RunOutput::Rows(result),
            Err(DashError::Connection { .. }) => RunOutput::Rows(Arc::new(QueryResult::empty())),
            Err(e) => {
                self.notifier
                    .error(&format!("Query execution failed: {}", error_detail(&e)));
                RunOutput::Rows(Arc::new(QueryResult::empty()))
            }
        }
    }

    /// Shorthand for `run(Some(query))` when only rows are wanted.
    pub fn rows(&mut self, query: &Query) -> Arc<QueryResult> {
        match self.run(Some(query)) {
            RunOutput::Rows(r) => r,
            RunOutput::Sentinel(_) => Arc::new(QueryResult::empty()),
        }
    }

    /// Run `query`, keeping "no connection", "query failed" and "no rows"
    /// apart. Nothing is reported through the notifier here.
    pub fn try_run(&mut self, query: &Query) -> Result<Arc<QueryResult>, DashError> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            debug!(rows = hit.rows.len(), "cache hit");
            return Ok(hit);
        }

        let result = Arc::new(self.execute_uncached(query)?);
        self.cache.put(key, Arc::clone(&result));
        Ok(result)
    }

    /// Run a mutating statement. Never cached. Cached reads are left alone
    /// unless invalidate-on-write is enabled.
    pub fn execute(&mut self, statement: &Query) -> Result<(), DashError> {
        self.execute_uncached(statement)?;
        if self.invalidate_on_write {
            debug!(entries = self.cache.len(), "write succeeded, clearing cache");
            self.cache.invalidate_all();
        }
        Ok(())
    }

    /// Drop the cached result for one query. Returns whether it was cached.
    pub fn invalidate(&mut self, query: &Query) -> bool {
        self.cache.invalidate(&query.cache_key())
    }

    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Teardown: drop the cache and close the connection.
    pub fn close(&mut self) {
        self.cache.invalidate_all();
        self.connections.close();
    }

    fn execute_uncached(&mut self, query: &Query) -> Result<QueryResult, DashError> {
        let timeout = self.query_timeout_secs;
        let Some(session) = self.connections.get_connection() else {
            return Err(DashError::Connection {
                message: self.connections.unavailable_reason().to_string(),
            });
        };

        let timer = Timer::start();
        let result = session.execute(query, timeout)?;
        debug!(
            rows = result.rows.len(),
            elapsed_ms = timer.elapsed_ms() as u64,
            "query executed"
        );
        Ok(result)
    }
}

fn error_detail(err: &DashError) -> String {
    match err {
        DashError::Query { message } | DashError::Connection { message } => message.clone(),
        other => other.to_string(),
    }
}
