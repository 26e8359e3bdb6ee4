use sqlparser::ast::{Expr, UnaryOperator, Value};

/// A column reference found in an expression, with its optional table qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Lowercase table name or alias written before the column, if any.
    pub qualifier: Option<String>,
    /// Lowercase column name.
    pub column: String,
}

/// Extract a column reference from an expression node.
///
/// Supports plain identifiers (`preimage`) and qualified identifiers
/// (`s.preimage`, `public.swaps.preimage`). For qualified identifiers the
/// qualifier is the part directly before the column.
pub fn column_reference(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::Identifier(ident) => Some(ColumnRef {
            qualifier: None,
            column: ident.value.to_ascii_lowercase(),
        }),
        Expr::CompoundIdentifier(parts) => {
            let (column, rest) = parts.split_last()?;
            Some(ColumnRef {
                qualifier: rest.last().map(|q| q.value.to_ascii_lowercase()),
                column: column.value.to_ascii_lowercase(),
            })
        }
        _ => None,
    }
}

/// Extract a non-negative integer literal, looking through parentheses and unary plus.
pub fn extract_unsigned_value(expr: &Expr) -> Option<u64> {
    match expr {
        Expr::Value(v) => match &v.value {
            Value::Number(n, _) => n.parse().ok(),
            _ => None,
        },
        Expr::Nested(inner)
        | Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr: inner,
        } => extract_unsigned_value(inner),
        _ => None,
    }
}
