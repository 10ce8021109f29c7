use crate::backend::{DriverCatalog, Query, Session};
use crate::config::{ConnectionTarget, DriverPolicy};
use crate::error::DashError;
use crate::output::Notifier;
use crate::verbose::Timer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Round-trip used to confirm a freshly opened connection is usable.
pub const LIVENESS_QUERY: &str = "SELECT @@VERSION";

/// Reason given once the manager was closed.
pub const CLOSED: &str = "connection closed";

/// Reason given for queries after resolution failed; the failure details were
/// already reported.
pub const UNAVAILABLE: &str = "no database connection (see the connection error above)";

/// An installed driver eligible for connection attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCandidate {
    pub name: String,
    pub preferred: bool,
}

/// Keep only drivers whose description names the target database family.
pub fn filter_family(drivers: Vec<String>, family: &str) -> Vec<String> {
    drivers.into_iter().filter(|d| d.contains(family)).collect()
}

/// Stable ordering: drivers carrying the preferred marker first, relative
/// order otherwise unchanged.
pub fn order_by_preference(drivers: Vec<String>, marker: &str) -> Vec<DriverCandidate> {
    let mut candidates: Vec<DriverCandidate> = drivers
        .into_iter()
        .map(|name| DriverCandidate {
            preferred: name.contains(marker),
            name,
        })
        .collect();
    candidates.sort_by_key(|c| !c.preferred);
    candidates
}

enum ConnectionState<S> {
    Unresolved,
    Open { driver: String, session: S },
    Unavailable { message: String },
    Closed,
}

/// Owns the single database connection for the lifetime of the service.
///
/// The first call to [`get_connection`](Self::get_connection) resolves a
/// connection; its outcome, success or failure, is kept until
/// [`close`](Self::close). There is no reconnect and no health check on reuse.
pub struct ConnectionManager<C: DriverCatalog> {
    catalog: C,
    target: ConnectionTarget,
    policy: DriverPolicy,
    notifier: Arc<dyn Notifier>,
    state: ConnectionState<C::Session>,
}

impl<C: DriverCatalog> ConnectionManager<C> {
    pub fn new(
        catalog: C,
        target: ConnectionTarget,
        policy: DriverPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            target,
            policy,
            notifier,
            state: ConnectionState::Unresolved,
        }
    }

    /// Matching drivers in the order connection attempts will try them.
    pub fn candidates(&self) -> Result<Vec<DriverCandidate>, DashError> {
        let installed = self.catalog.drivers()?;
        Ok(order_by_preference(
            filter_family(installed, &self.policy.family),
            &self.policy.preferred_marker,
        ))
    }

    /// The live connection, resolving it on first use. `None` when no driver
    /// could connect or the manager was closed.
    pub fn get_connection(&mut self) -> Option<&mut C::Session> {
        if matches!(self.state, ConnectionState::Unresolved) {
            self.state = self.resolve();
        }
        match &mut self.state {
            ConnectionState::Open { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Why no connection is available, once resolution has failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Unavailable { message } => Some(message),
            ConnectionState::Closed => Some(CLOSED),
            _ => None,
        }
    }

    /// Short reason for a missing connection, for errors raised after the
    /// failure itself was already reported through the notifier.
    pub fn unavailable_reason(&self) -> &'static str {
        match &self.state {
            ConnectionState::Closed => CLOSED,
            _ => UNAVAILABLE,
        }
    }

    /// Name of the driver the open connection was made with.
    pub fn driver(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Open { driver, .. } => Some(driver),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Open { .. })
    }

    /// Drop the connection. Later calls get no connection.
    pub fn close(&mut self) {
        if let ConnectionState::Open { driver, .. } = &self.state {
            info!(driver = %driver, "closing database connection");
        }
        self.state = ConnectionState::Closed;
    }

    fn resolve(&self) -> ConnectionState<C::Session> {
        let timer = Timer::start();
        match self.try_candidates() {
            Ok((driver, session)) => {
                info!(
                    driver = %driver,
                    server = %self.target.server,
                    elapsed_ms = timer.elapsed_ms() as u64,
                    "connected"
                );
                ConnectionState::Open { driver, session }
            }
            Err(message) => {
                debug!(error = %message, "no usable driver");
                self.notifier.error(&message);
                ConnectionState::Unavailable { message }
            }
        }
    }

    fn try_candidates(&self) -> Result<(String, C::Session), String> {
        let installed = self
            .catalog
            .drivers()
            .map_err(|e| format!("Database connection failed: {}", e))?;
        for driver in &installed {
            debug!(driver = %driver, "found driver");
        }

        let matching = filter_family(installed.clone(), &self.policy.family);
        if matching.is_empty() {
            return Err(format!(
                "No {} ODBC drivers found. Available drivers: {:?}",
                self.policy.family, installed
            ));
        }

        let candidates = order_by_preference(matching, &self.policy.preferred_marker);
        for candidate in &candidates {
            match self.open_and_probe(&candidate.name) {
                Ok(session) => return Ok((candidate.name.clone(), session)),
                Err(e) => warn!(driver = %candidate.name, error = %e, "driver failed"),
            }
        }

        let tried: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        Err(format!(
            "Database connection failed with all available drivers: {:?}",
            tried
        ))
    }

    fn open_and_probe(&self, driver: &str) -> Result<C::Session, DashError> {
        let mut session = self.catalog.open(driver, &self.target)?;
        let version = session.execute(&Query::new(LIVENESS_QUERY), None)?;
        if let Some(v) = version.rows.first().and_then(|r| r.first()) {
            debug!(driver = %driver, version = ?v, "liveness probe ok");
        }
        Ok(session)
    }
}
