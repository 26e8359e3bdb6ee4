use sqlparser::ast::Statement;
use sqlparser::tokenizer::{Location, Token};
use tracing::debug;

use crate::parser::sql_parser::{parse_statements, tokenize};
use crate::policy::{Dialect, Policy};
use crate::validator::limits::{has_declared_limit, has_offset, has_order_by};

/// What the limiter needs to know about the top-level query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LimitShape {
    has_row_cap: bool,
    has_order_by: bool,
    has_offset: bool,
}

impl LimitShape {
    fn from_ast(sql: &str, dialect: Dialect) -> Option<Self> {
        let statements = parse_statements(sql, dialect).ok()?;
        let [Statement::Query(query)] = statements.as_slice() else {
            return None;
        };
        Some(Self {
            has_row_cap: has_declared_limit(query),
            has_order_by: has_order_by(query),
            has_offset: has_offset(query),
        })
    }

    /// Keyword search over the lowercased, whitespace-normalized text.
    fn from_text(sql: &str, dialect: Dialect) -> Self {
        let lowered = sql.to_ascii_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter(|word| !word.is_empty())
            .collect();
        let has_word = |needle: &str| words.iter().any(|word| *word == needle);
        let has_pair = |first: &str, seconds: &[&str]| {
            words
                .windows(2)
                .any(|pair| pair[0] == first && seconds.contains(&pair[1]))
        };

        let has_row_cap = match dialect {
            Dialect::PostgreSql => has_word("limit"),
            Dialect::MsSql => {
                has_word("top") || has_word("limit") || has_pair("fetch", &["next", "first"])
            }
        };
        Self {
            has_row_cap,
            has_order_by: has_pair("order", &["by"]),
            has_offset: has_word("offset"),
        }
    }
}

/// Byte offset of a 1-based tokenizer location.
fn byte_offset(sql: &str, location: Location) -> Option<usize> {
    let line = usize::try_from(location.line).ok()?.checked_sub(1)?;
    let column = usize::try_from(location.column).ok()?.checked_sub(1)?;
    let line_start: usize = sql.split_inclusive('\n').take(line).map(str::len).sum();
    let rest = sql.get(line_start..)?;
    match rest.char_indices().nth(column) {
        Some((offset, _)) => Some(line_start + offset),
        None => (column == rest.chars().count()).then_some(sql.len()),
    }
}

/// The SQL up to the end of its last token that is not whitespace, a comment,
/// or a statement terminator.
fn statement_body(sql: &str, dialect: Dialect) -> Option<&str> {
    let tokens = tokenize(sql, dialect).ok()?;
    let last = tokens.iter().rev().find(|token| {
        !matches!(
            token.token,
            Token::Whitespace(_) | Token::SemiColon | Token::EOF
        )
    })?;
    sql.get(..byte_offset(sql, last.span.end)?)
}

/// Remove trailing whitespace and statement terminators.
fn strip_terminators(sql: &str) -> &str {
    sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Guarantee a server-side row cap of `policy.max_results()` rows.
///
/// SQL that already declares a cap at its top level is returned unchanged,
/// which makes the rewrite idempotent. When the SQL does not parse the
/// decision falls back to a keyword search over its text.
///
/// The cap is appended after the last real token, so trailing comments and
/// terminators are dropped and cannot swallow it. SQL that does not even
/// tokenize gets the cap on a new line.
pub fn ensure_limit(sql: &str, policy: &Policy) -> String {
    let dialect = policy.dialect();
    let shape =
        LimitShape::from_ast(sql, dialect).unwrap_or_else(|| LimitShape::from_text(sql, dialect));
    if shape.has_row_cap {
        return sql.to_string();
    }

    let (base, separator) = match statement_body(sql, dialect) {
        Some(body) => (body, " "),
        None => (strip_terminators(sql), "\n"),
    };
    let max = policy.max_results();
    let mut clauses = Vec::new();
    match dialect {
        Dialect::PostgreSql => clauses.push(format!("LIMIT {max}")),
        Dialect::MsSql => {
            // OFFSET ... FETCH requires an ORDER BY; FETCH extends an existing OFFSET.
            if !shape.has_order_by {
                clauses.push("ORDER BY (SELECT NULL)".to_string());
            }
            if !shape.has_offset {
                clauses.push("OFFSET 0 ROWS".to_string());
            }
            clauses.push(format!("FETCH NEXT {max} ROWS ONLY"));
        }
    }
    let limited = format!("{base}{separator}{}", clauses.join(" "));
    debug!(dialect = %dialect, max, "row cap appended");
    limited
}
