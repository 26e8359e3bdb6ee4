use thiserror::Error;

/// Message returned to callers in place of database error text.
pub const EXECUTION_FAILED_MESSAGE: &str =
    "Query execution failed. The database error has been logged for audit.";

/// Every way a submitted query can be refused or fail.
///
/// All variants except [`FirewallError::ExecutionFailed`] are produced by static analysis
/// before any SQL reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirewallError {
    /// The SQL text does not parse under the policy's dialect.
    #[error("Invalid SQL syntax: {0}")]
    InvalidSyntax(String),
    /// The SQL text holds zero or several statements.
    #[error("Exactly one SQL statement is allowed, found {0}")]
    MultipleStatements(usize),
    /// The statement is not a SELECT.
    #[error("Only SELECT statements are allowed, found {0}")]
    NonSelectStatement(String),
    /// The SELECT is chained with UNION, INTERSECT or EXCEPT.
    #[error("Set operations are not allowed: {0}")]
    SetOperationNotAllowed(String),
    /// The SELECT writes its result into a target (`SELECT ... INTO`).
    #[error("SELECT ... INTO is not allowed")]
    SelectIntoNotAllowed,
    /// A relation or function is qualified by a blocked schema.
    #[error("Access to schema '{0}' is not allowed")]
    BlockedSchemaAccess(String),
    /// A relation is addressed through a linked (remote) server.
    #[error("Linked server access is not allowed: {0}")]
    LinkedServerAccess(String),
    /// A blocked function is called.
    #[error("Function '{0}' is not allowed")]
    DangerousFunctionUse(String),
    /// A `FOR XML` or `FOR JSON` clause is present.
    #[error("FOR XML / FOR JSON clauses are not allowed")]
    ForXmlJsonNotAllowed,
    /// A blocked column is referenced, named as `table.column`.
    #[error("Access to column '{0}' is not allowed")]
    BlockedColumnAccess(String),
    /// The declared row limit is above the policy maximum or cannot be bounded.
    #[error("Result limit {requested} exceeds the maximum of {max} rows")]
    ResultLimitExceeded {
        /// Declared limit as written in the query.
        requested: String,
        /// Policy maximum.
        max: u64,
    },
    /// The database rejected a query that passed validation.
    #[error("{EXECUTION_FAILED_MESSAGE}")]
    ExecutionFailed,
}

impl FirewallError {
    /// Stable taxonomy name of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            FirewallError::InvalidSyntax(_) => "InvalidSyntax",
            FirewallError::MultipleStatements(_) => "MultipleStatements",
            FirewallError::NonSelectStatement(_) => "NonSelectStatement",
            FirewallError::SetOperationNotAllowed(_) => "SetOperationNotAllowed",
            FirewallError::SelectIntoNotAllowed => "SelectIntoNotAllowed",
            FirewallError::BlockedSchemaAccess(_) => "BlockedSchemaAccess",
            FirewallError::LinkedServerAccess(_) => "LinkedServerAccess",
            FirewallError::DangerousFunctionUse(_) => "DangerousFunctionUse",
            FirewallError::ForXmlJsonNotAllowed => "ForXmlJsonNotAllowed",
            FirewallError::BlockedColumnAccess(_) => "BlockedColumnAccess",
            FirewallError::ResultLimitExceeded { .. } => "ResultLimitExceeded",
            FirewallError::ExecutionFailed => "ExecutionFailed",
        }
    }

    /// True when the error was raised by static analysis, before execution.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, FirewallError::ExecutionFailed)
    }
}

/// Failure to build a [`crate::policy::Policy`] from configuration.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy document is not valid JSON for the policy shape.
    #[error("Invalid policy JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The policy document is well-formed but unusable.
    #[error("Invalid policy: {0}")]
    Invalid(String),
}
