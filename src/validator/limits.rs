use sqlparser::ast::{Expr, Fetch, LimitClause, Query, SetExpr, Top, TopQuantity};

use crate::error::FirewallError;
use crate::parser::expr::extract_unsigned_value;
use crate::policy::Policy;

/// A row cap written in the query itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredLimit {
    /// A literal row count.
    Rows(u64),
    /// A cap that cannot be evaluated statically (`TOP 10 PERCENT`, `LIMIT $1`, ...).
    Unbounded(String),
}

impl DeclaredLimit {
    fn from_expr(expr: &Expr) -> Self {
        match extract_unsigned_value(expr) {
            Some(rows) => DeclaredLimit::Rows(rows),
            None => DeclaredLimit::Unbounded(expr.to_string()),
        }
    }
}

fn top_limit(top: &Top) -> Option<DeclaredLimit> {
    if top.percent {
        return Some(DeclaredLimit::Unbounded(top.to_string()));
    }
    Some(match top.quantity.as_ref()? {
        TopQuantity::Constant(rows) => DeclaredLimit::Rows(*rows),
        TopQuantity::Expr(expr) => DeclaredLimit::from_expr(expr),
    })
}

fn fetch_limit(fetch: &Fetch) -> DeclaredLimit {
    if fetch.percent {
        return DeclaredLimit::Unbounded(fetch.to_string());
    }
    match &fetch.quantity {
        Some(expr) => DeclaredLimit::from_expr(expr),
        // `FETCH FIRST ROW ONLY`
        None => DeclaredLimit::Rows(1),
    }
}

/// Row caps declared at the top level of a query.
///
/// Looks at `LIMIT`, `FETCH FIRST|NEXT`, and the `TOP` of the outermost
/// SELECT, following parenthesized queries inward. Caps inside subqueries do
/// not bound the result and are ignored.
pub fn declared_limits(query: &Query) -> Vec<DeclaredLimit> {
    let mut limits = Vec::new();

    if let Some(LimitClause::LimitOffset {
        limit: Some(limit), ..
    }
    | LimitClause::OffsetCommaLimit { limit, .. }) = &query.limit_clause
    {
        limits.push(DeclaredLimit::from_expr(limit));
    }
    if let Some(fetch) = &query.fetch {
        limits.push(fetch_limit(fetch));
    }

    match query.body.as_ref() {
        SetExpr::Select(select) => limits.extend(select.top.as_ref().and_then(top_limit)),
        SetExpr::Query(inner) => limits.extend(declared_limits(inner)),
        _ => {}
    }
    limits
}

/// Whether the top level of a query declares any row cap.
pub fn has_declared_limit(query: &Query) -> bool {
    !declared_limits(query).is_empty()
}

/// Whether the top level of a query has an OFFSET clause.
pub fn has_offset(query: &Query) -> bool {
    let direct = matches!(
        &query.limit_clause,
        Some(LimitClause::LimitOffset {
            offset: Some(_),
            ..
        } | LimitClause::OffsetCommaLimit { .. })
    );
    direct || matches!(query.body.as_ref(), SetExpr::Query(inner) if has_offset(inner))
}

/// Whether the top level of a query has an ORDER BY clause.
pub fn has_order_by(query: &Query) -> bool {
    query.order_by.is_some()
        || matches!(query.body.as_ref(), SetExpr::Query(inner) if has_order_by(inner))
}

/// Reject declared caps above the policy maximum, or caps that cannot be bounded.
pub fn check_declared_limits(query: &Query, policy: &Policy) -> Result<(), FirewallError> {
    let max = policy.max_results();
    for limit in declared_limits(query) {
        match limit {
            DeclaredLimit::Rows(rows) if rows <= max => {}
            DeclaredLimit::Rows(rows) => {
                return Err(FirewallError::ResultLimitExceeded {
                    requested: rows.to_string(),
                    max,
                })
            }
            DeclaredLimit::Unbounded(requested) => {
                return Err(FirewallError::ResultLimitExceeded { requested, max })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sql_parser::parse_statements;
    use crate::policy::Dialect;
    use sqlparser::ast::Statement;

    fn parse_query(sql: &str, dialect: Dialect) -> Query {
        let stmt = parse_statements(sql, dialect)
            .expect("query should parse")
            .remove(0);
        let Statement::Query(query) = stmt else {
            panic!("expected a query");
        };
        *query
    }

    #[test]
    fn declared_limits_reads_limit_top_and_fetch() {
        assert_eq!(
            declared_limits(&parse_query("SELECT id FROM swaps LIMIT 5", Dialect::PostgreSql)),
            vec![DeclaredLimit::Rows(5)]
        );
        assert_eq!(
            declared_limits(&parse_query("SELECT TOP 100 id FROM wallet", Dialect::MsSql)),
            vec![DeclaredLimit::Rows(100)]
        );
        assert_eq!(
            declared_limits(&parse_query("SELECT TOP (250) id FROM wallet", Dialect::MsSql)),
            vec![DeclaredLimit::Rows(250)]
        );
        assert_eq!(
            declared_limits(&parse_query(
                "SELECT id FROM wallet ORDER BY id OFFSET 0 ROWS FETCH NEXT 20 ROWS ONLY",
                Dialect::MsSql
            )),
            vec![DeclaredLimit::Rows(20)]
        );
        assert!(declared_limits(&parse_query("SELECT id FROM swaps", Dialect::PostgreSql)).is_empty());
    }

    #[test]
    fn declared_limits_ignore_subquery_caps() {
        let query = parse_query(
            "SELECT id FROM swaps WHERE id IN (SELECT id FROM chainswaps LIMIT 5)",
            Dialect::PostgreSql,
        );
        assert!(declared_limits(&query).is_empty());
        assert!(!has_declared_limit(&query));
    }

    #[test]
    fn percent_and_parameter_caps_are_unbounded() {
        let policy = Policy::mssql_debug();
        let err = check_declared_limits(
            &parse_query("SELECT TOP 10 PERCENT id FROM wallet", Dialect::MsSql),
            &policy,
        )
        .expect_err("percent caps cannot be bounded");
        assert_eq!(err.kind(), "ResultLimitExceeded");

        let policy = Policy::postgres_secondary();
        let err = check_declared_limits(
            &parse_query("SELECT id FROM swaps LIMIT $1", Dialect::PostgreSql),
            &policy,
        )
        .expect_err("placeholder caps cannot be bounded");
        assert_eq!(
            err,
            FirewallError::ResultLimitExceeded {
                requested: "$1".to_string(),
                max: 10_000,
            }
        );
    }

    #[test]
    fn check_declared_limits_enforces_policy_maximum() {
        let policy = Policy::mssql_debug();
        assert_eq!(
            check_declared_limits(
                &parse_query("SELECT TOP 50000 * FROM wallet", Dialect::MsSql),
                &policy
            ),
            Err(FirewallError::ResultLimitExceeded {
                requested: "50000".to_string(),
                max: 10_000,
            })
        );
        assert_eq!(
            check_declared_limits(
                &parse_query("SELECT TOP 10000 * FROM wallet", Dialect::MsSql),
                &policy
            ),
            Ok(())
        );
    }

    #[test]
    fn order_by_and_offset_are_detected_at_top_level_only() {
        let query = parse_query(
            "SELECT id FROM wallet ORDER BY id OFFSET 10 ROWS",
            Dialect::MsSql,
        );
        assert!(has_order_by(&query));
        assert!(has_offset(&query));

        let query = parse_query(
            "SELECT id, row_number() OVER (ORDER BY id) FROM wallet",
            Dialect::MsSql,
        );
        assert!(!has_order_by(&query));
        assert!(!has_offset(&query));
    }
}
