use std::ops::ControlFlow;

use sqlparser::ast::{Expr, ForClause, ObjectName, Query, TableFactor};

use crate::error::FirewallError;
use crate::parser::names::{normalized_function_name, object_name_parts, object_relation_name};
use crate::policy::Policy;
use crate::validator::walker::NodeVisitor;

/// Number of name parts in `server.database.schema.table`.
const LINKED_SERVER_NAME_PARTS: usize = 4;

/// Rejects relations and functions qualified by a blocked schema, and
/// linked-server relations when the policy checks for them.
pub struct SchemaAccessCheck<'p> {
    policy: &'p Policy,
}

impl<'p> SchemaAccessCheck<'p> {
    /// Create the check for `policy`.
    pub fn new(policy: &'p Policy) -> Self {
        Self { policy }
    }

    fn check_qualifiers(&self, parts: &[String]) -> ControlFlow<FirewallError> {
        let Some((_, qualifiers)) = parts.split_last() else {
            return ControlFlow::Continue(());
        };
        if let Some(schema) = qualifiers.iter().find(|q| self.policy.is_blocked_schema(q)) {
            return ControlFlow::Break(FirewallError::BlockedSchemaAccess(schema.clone()));
        }

        // A quoted identifier such as "sys.tables" is a single part with a dot in it.
        let full_name = parts.join(".");
        if let Some(schema) = self
            .policy
            .blocked_schemas()
            .find(|schema| full_name.starts_with(&format!("{schema}.")))
        {
            return ControlFlow::Break(FirewallError::BlockedSchemaAccess(schema.to_string()));
        }
        ControlFlow::Continue(())
    }

    fn check_relation(&self, name: &ObjectName) -> ControlFlow<FirewallError> {
        let parts = object_name_parts(name);
        self.check_qualifiers(&parts)?;

        if let [relation] = parts.as_slice() {
            if self.policy.blocked_table_prefix(relation).is_some() {
                return ControlFlow::Break(FirewallError::BlockedSchemaAccess(relation.clone()));
            }
        }

        if self.policy.check_linked_servers() && parts.len() >= LINKED_SERVER_NAME_PARTS {
            return ControlFlow::Break(FirewallError::LinkedServerAccess(parts.join(".")));
        }
        ControlFlow::Continue(())
    }
}

impl NodeVisitor for SchemaAccessCheck<'_> {
    type Break = FirewallError;

    fn visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<FirewallError> {
        match factor {
            TableFactor::Table { name, .. } => self.check_relation(name),
            TableFactor::Function { name, .. } => self.check_qualifiers(&object_name_parts(name)),
            _ => ControlFlow::Continue(()),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) -> ControlFlow<FirewallError> {
        match expr {
            Expr::Function(func) => self.check_qualifiers(&object_name_parts(&func.name)),
            _ => ControlFlow::Continue(()),
        }
    }
}

/// Rejects any call to a function the policy marks as dangerous.
pub struct DangerousFunctionCheck<'p> {
    policy: &'p Policy,
}

impl<'p> DangerousFunctionCheck<'p> {
    /// Create the check for `policy`.
    pub fn new(policy: &'p Policy) -> Self {
        Self { policy }
    }

    fn check_name(&self, name: String) -> ControlFlow<FirewallError> {
        if self.policy.is_dangerous_function(&name) {
            ControlFlow::Break(FirewallError::DangerousFunctionUse(name))
        } else {
            ControlFlow::Continue(())
        }
    }
}

impl NodeVisitor for DangerousFunctionCheck<'_> {
    type Break = FirewallError;

    fn visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<FirewallError> {
        match factor {
            // `FROM openquery(srv, '...')` parses as a relation with arguments.
            TableFactor::Table {
                name,
                args: Some(_),
                ..
            }
            | TableFactor::Function { name, .. } => self.check_name(object_relation_name(name)),
            _ => ControlFlow::Continue(()),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) -> ControlFlow<FirewallError> {
        match expr {
            Expr::Function(func) => self.check_name(normalized_function_name(func)),
            _ => ControlFlow::Continue(()),
        }
    }
}

/// Rejects `FOR XML` and `FOR JSON` at any query level.
#[derive(Debug, Default)]
pub struct ForXmlJsonCheck;

impl NodeVisitor for ForXmlJsonCheck {
    type Break = FirewallError;

    fn visit_query(&mut self, query: &Query) -> ControlFlow<FirewallError> {
        match query.for_clause {
            Some(ForClause::Xml { .. } | ForClause::Json { .. }) => {
                ControlFlow::Break(FirewallError::ForXmlJsonNotAllowed)
            }
            _ => ControlFlow::Continue(()),
        }
    }
}
