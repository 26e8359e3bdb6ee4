use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::ops::ControlFlow;

use sqlparser::ast::{Expr, Statement, TableFactor};

use crate::error::FirewallError;
use crate::parser::expr::{column_reference, ColumnRef};
use crate::parser::names::object_relation_name;
use crate::policy::Policy;
use crate::validator::walker::{walk, NodeVisitor};

/// Alias or table name → every bare table name it is bound to, built from the
/// FROM items of one statement.
///
/// The map is not scoped: an alias reused in a subquery or CTE keeps all of its
/// bindings, and a qualified column is checked against each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap(HashMap<String, BTreeSet<String>>);

impl AliasMap {
    fn bind(&mut self, name: &str, table: &str) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .insert(table.to_string());
    }

    /// Resolve a column qualifier to the tables it may name.
    ///
    /// Unknown qualifiers resolve to themselves.
    pub fn resolve(&self, qualifier: &str) -> Vec<String> {
        let qualifier = qualifier.to_ascii_lowercase();
        match self.0.get(&qualifier) {
            Some(tables) => tables.iter().cloned().collect(),
            None => vec![qualifier],
        }
    }
}

/// Tables and aliases referenced by a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    /// Bare lowercase table names in first-seen order, without duplicates.
    pub tables: Vec<String>,
    /// Alias map covering every table and alias seen.
    pub aliases: AliasMap,
}

impl NodeVisitor for Relations {
    type Break = Infallible;

    fn visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Infallible> {
        // Table-valued function calls carry `args` and are not tables.
        if let TableFactor::Table {
            name,
            alias,
            args: None,
            ..
        } = factor
        {
            let table = object_relation_name(name);
            if let Some(alias) = alias {
                self.aliases.bind(&alias.name.value, &table);
            }
            self.aliases.bind(&table, &table);
            if !self.tables.contains(&table) {
                self.tables.push(table);
            }
        }
        ControlFlow::Continue(())
    }
}

#[derive(Debug, Default)]
struct ColumnList(Vec<ColumnRef>);

impl NodeVisitor for ColumnList {
    type Break = Infallible;

    fn visit_expr(&mut self, expr: &Expr) -> ControlFlow<Infallible> {
        if let Some(column) = column_reference(expr) {
            if !self.0.contains(&column) {
                self.0.push(column);
            }
        }
        ControlFlow::Continue(())
    }
}

/// Collect the tables and aliases a statement references, at any depth.
pub fn relations(statement: &Statement) -> Relations {
    let mut relations = Relations::default();
    let _ = walk(statement, &mut relations);
    relations
}

/// Collect every column reference in a statement, at any depth.
///
/// Wildcards are not column references and never appear here.
pub fn column_references(statement: &Statement) -> Vec<ColumnRef> {
    let mut columns = ColumnList::default();
    let _ = walk(statement, &mut columns);
    columns.0
}

/// Reject references to blocked columns and return the referenced tables.
///
/// Qualified columns resolve through the alias map and are checked against
/// every table the qualifier is bound to anywhere in the statement. An
/// unqualified column is attributed to the only table when there is exactly
/// one; with several tables it is ambiguous and is checked against every
/// table's blocklist, so a blocked name on any of them rejects the query even
/// when the column actually comes from a table where it is allowed.
pub fn check_columns(statement: &Statement, policy: &Policy) -> Result<Vec<String>, FirewallError> {
    let Relations { tables, aliases } = relations(statement);

    for column in column_references(statement) {
        let candidates = match &column.qualifier {
            Some(qualifier) => aliases.resolve(qualifier),
            None => tables.clone(),
        };
        if let Some(table) = candidates
            .iter()
            .find(|table| policy.is_blocked_column(table, &column.column))
        {
            return Err(FirewallError::BlockedColumnAccess(format!(
                "{table}.{}",
                column.column
            )));
        }
    }

    Ok(tables)
}
