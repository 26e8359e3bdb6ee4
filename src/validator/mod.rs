//! Static validation of submitted SQL against a [`Policy`].
//!
//! [`validate`] applies the checks in a fixed order and stops at the first
//! failure: syntax, statement count, statement type, set operations,
//! `SELECT ... INTO`, blocked schemas and linked servers, dangerous
//! functions, `FOR XML` / `FOR JSON`, blocked columns, and declared row caps.

/// Structural checks run through the shared walker.
pub mod checks;
/// Alias map, table list, column list, and blocked-column resolution.
pub mod columns;
/// Declared row caps (`LIMIT`, `TOP`, `FETCH`).
pub mod limits;
/// The single AST traversal every check is built on.
pub mod walker;

use std::fmt::Display;
use std::ops::ControlFlow;

use sqlparser::ast::{Query, Select, SetExpr, Statement};
use tracing::debug;

use crate::error::FirewallError;
use crate::parser::sql_parser::parse_statements;
use crate::policy::Policy;
use checks::{DangerousFunctionCheck, ForXmlJsonCheck, SchemaAccessCheck};
use walker::{walk, NodeVisitor};

/// A query that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    /// The parsed statement.
    pub statement: Statement,
    /// Bare lowercase names of the tables the statement references.
    pub tables: Vec<String>,
}

/// Validate `sql` under `policy`.
pub fn validate(sql: &str, policy: &Policy) -> Result<ValidatedQuery, FirewallError> {
    let result = run_checks(sql, policy);
    if let Err(err) = &result {
        debug!(kind = err.kind(), dialect = %policy.dialect(), "query rejected: {err}");
    }
    result
}

fn run_checks(sql: &str, policy: &Policy) -> Result<ValidatedQuery, FirewallError> {
    let mut statements =
        parse_statements(sql, policy.dialect()).map_err(FirewallError::InvalidSyntax)?;
    if statements.len() != 1 {
        return Err(FirewallError::MultipleStatements(statements.len()));
    }
    let statement = statements.remove(0);

    let query = top_level_query(&statement)?;
    let select = top_level_select(query)?;
    if select.into.is_some() {
        return Err(FirewallError::SelectIntoNotAllowed);
    }

    run_check(&statement, SchemaAccessCheck::new(policy))?;
    run_check(&statement, DangerousFunctionCheck::new(policy))?;
    if policy.check_xml_json() {
        run_check(&statement, ForXmlJsonCheck)?;
    }

    let tables = columns::check_columns(&statement, policy)?;
    limits::check_declared_limits(query, policy)?;

    Ok(ValidatedQuery { statement, tables })
}

fn run_check<V>(statement: &Statement, mut check: V) -> Result<(), FirewallError>
where
    V: NodeVisitor<Break = FirewallError>,
{
    match walk(statement, &mut check) {
        ControlFlow::Break(err) => Err(err),
        ControlFlow::Continue(()) => Ok(()),
    }
}

fn leading_keyword(node: &impl Display) -> String {
    node.to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

fn top_level_query(statement: &Statement) -> Result<&Query, FirewallError> {
    match statement {
        Statement::Query(query) => Ok(query),
        other => Err(FirewallError::NonSelectStatement(leading_keyword(other))),
    }
}

/// The SELECT at the top of a query, looking through parentheses.
fn top_level_select(query: &Query) -> Result<&Select, FirewallError> {
    match query.body.as_ref() {
        SetExpr::Select(select) => Ok(select),
        SetExpr::Query(inner) => top_level_select(inner),
        SetExpr::SetOperation { op, .. } => {
            Err(FirewallError::SetOperationNotAllowed(op.to_string()))
        }
        other => Err(FirewallError::NonSelectStatement(leading_keyword(other))),
    }
}
