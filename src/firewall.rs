//! Request pipeline: validate, limit, execute through a caller-supplied
//! executor, then mask.

use std::fmt::Display;

use tracing::{debug, error};

use crate::error::FirewallError;
use crate::policy::Policy;
use crate::results::{ensure_limit, mask_rows, Row};
use crate::validator::validate;

/// Runs SQL against the protected database.
///
/// Connection pooling, timeouts and cancellation belong to the implementor.
pub trait QueryExecutor {
    /// Database error type. Its text is logged and never returned to callers.
    type Error: Display;

    /// Execute `sql` and return every row it produced.
    fn query(&self, sql: &str) -> Result<Vec<Row>, Self::Error>;
}

/// SQL that passed validation and carries a server-side row cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    /// SQL to send to the database.
    pub sql: String,
    /// Bare lowercase names of the referenced tables, used for masking.
    pub tables: Vec<String>,
}

/// A policy bound to the validate → limit → mask pipeline.
#[derive(Debug, Clone)]
pub struct QueryFirewall {
    policy: Policy,
}

impl QueryFirewall {
    /// Create a firewall enforcing `policy`.
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// The enforced policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Validate `sql` and apply the row cap.
    pub fn prepare(&self, sql: &str) -> Result<PreparedQuery, FirewallError> {
        let validated = validate(sql, &self.policy)?;
        Ok(PreparedQuery {
            sql: ensure_limit(sql, &self.policy),
            tables: validated.tables,
        })
    }

    /// Mask blocked values in rows fetched for `prepared`.
    pub fn mask(&self, rows: &mut [Row], prepared: &PreparedQuery) {
        mask_rows(rows, &prepared.tables, &self.policy);
    }

    /// Prepare `sql`, run it through `executor`, and mask the rows.
    pub fn execute<E: QueryExecutor>(
        &self,
        sql: &str,
        executor: &E,
    ) -> Result<Vec<Row>, FirewallError> {
        let prepared = self.prepare(sql)?;
        let mut rows = executor.query(&prepared.sql).map_err(|err| {
            error!(
                dialect = %self.policy.dialect(),
                sql = %prepared.sql,
                "query execution failed: {err}"
            );
            FirewallError::ExecutionFailed
        })?;
        self.mask(&mut rows, &prepared);
        debug!(rows = rows.len(), tables = ?prepared.tables, "query executed");
        Ok(rows)
    }
}
