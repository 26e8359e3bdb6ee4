use std::ops::ControlFlow;

use sqlparser::ast::{Expr, Query, Statement, TableFactor, Visit, Visitor};

/// Per-check callbacks invoked by [`walk`].
///
/// Every method defaults to continuing, so a check only overrides the node
/// kinds it cares about. Returning `ControlFlow::Break` stops the walk.
pub trait NodeVisitor {
    /// Value carried out of the walk when a check stops it.
    type Break;

    /// Called for the top-level query and every nested query: subqueries,
    /// derived tables, and CTE bodies.
    fn visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }

    /// Called for every FROM item and JOIN relation, including table-valued
    /// functions and derived tables.
    fn visit_table_factor(&mut self, _factor: &TableFactor) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }

    /// Called for every expression node: projections, JOIN ... ON, WHERE,
    /// HAVING, GROUP BY, ORDER BY, function arguments, IN lists, window
    /// PARTITION BY / ORDER BY, and the operands of each of those.
    fn visit_expr(&mut self, _expr: &Expr) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }
}

struct Walker<'v, V>(&'v mut V);

impl<V: NodeVisitor> Visitor for Walker<'_, V> {
    type Break = V::Break;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.0.visit_query(query)
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        self.0.visit_table_factor(factor)
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        self.0.visit_expr(expr)
    }
}

/// Walk every node reachable from `statement` in pre-order.
///
/// This is the only tree traversal in the crate; each check is a
/// [`NodeVisitor`] passed to it.
pub fn walk<V: NodeVisitor>(statement: &Statement, visitor: &mut V) -> ControlFlow<V::Break> {
    statement.visit(&mut Walker(visitor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::expr::column_reference;
    use crate::parser::names::{normalized_function_name, object_relation_name};
    use crate::parser::sql_parser::parse_statements;
    use crate::policy::Dialect;
    use std::convert::Infallible;

    #[derive(Default)]
    struct Recorder {
        queries: usize,
        relations: Vec<String>,
        functions: Vec<String>,
        columns: Vec<String>,
    }

    impl NodeVisitor for Recorder {
        type Break = Infallible;

        fn visit_query(&mut self, _query: &Query) -> ControlFlow<Infallible> {
            self.queries += 1;
            ControlFlow::Continue(())
        }

        fn visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Infallible> {
            if let TableFactor::Table { name, .. } = factor {
                self.relations.push(object_relation_name(name));
            }
            ControlFlow::Continue(())
        }

        fn visit_expr(&mut self, expr: &Expr) -> ControlFlow<Infallible> {
            if let Expr::Function(func) = expr {
                self.functions.push(normalized_function_name(func));
            }
            if let Some(col) = column_reference(expr) {
                self.columns.push(col.column);
            }
            ControlFlow::Continue(())
        }
    }

    fn record(sql: &str) -> Recorder {
        let stmts = parse_statements(sql, Dialect::PostgreSql).expect("query should parse");
        let mut recorder = Recorder::default();
        let _ = walk(&stmts[0], &mut recorder);
        recorder
    }

    #[test]
    fn walk_reaches_ctes_subqueries_and_joins() {
        let recorder = record(
            "WITH recent AS (SELECT id FROM swaps WHERE id IN (SELECT id FROM chainswaps)) \
             SELECT r.id FROM recent r JOIN referrals f ON f.id = r.id",
        );
        assert_eq!(recorder.queries, 3);
        assert_eq!(
            recorder.relations,
            vec!["swaps", "chainswaps", "recent", "referrals"]
        );
    }

    #[test]
    fn walk_reaches_window_specs_and_function_arguments() {
        let recorder = record(
            "SELECT row_number() OVER (PARTITION BY lower(status) ORDER BY abs(fee)) FROM swaps \
             GROUP BY coalesce(pair, 'x') HAVING max(amount) > 1 ORDER BY upper(id)",
        );
        for expected in ["row_number", "lower", "abs", "coalesce", "max", "upper"] {
            assert!(
                recorder.functions.iter().any(|f| f == expected),
                "missing {expected} in {:?}",
                recorder.functions
            );
        }
        for expected in ["status", "fee", "pair", "amount", "id"] {
            assert!(recorder.columns.iter().any(|c| c == expected));
        }
    }

    #[test]
    fn walk_stops_at_first_break() {
        struct StopAtFirstFunction(usize);

        impl NodeVisitor for StopAtFirstFunction {
            type Break = String;

            fn visit_expr(&mut self, expr: &Expr) -> ControlFlow<String> {
                self.0 += 1;
                match expr {
                    Expr::Function(func) => ControlFlow::Break(normalized_function_name(func)),
                    _ => ControlFlow::Continue(()),
                }
            }
        }

        let stmts = parse_statements("SELECT a, pg_sleep(1), lower(b)", Dialect::PostgreSql)
            .expect("query should parse");
        let mut visitor = StopAtFirstFunction(0);
        assert_eq!(
            walk(&stmts[0], &mut visitor),
            ControlFlow::Break("pg_sleep".to_string())
        );
        assert_eq!(visitor.0, 2);
    }
}
