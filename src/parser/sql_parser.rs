use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect as SqlDialect, MsSqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{TokenWithSpan, Tokenizer};

use crate::policy::Dialect;

fn sql_dialect(dialect: Dialect) -> Box<dyn SqlDialect> {
    match dialect {
        Dialect::MsSql => Box::new(MsSqlDialect {}),
        Dialect::PostgreSql => Box::new(PostgreSqlDialect {}),
    }
}

/// Parse SQL text into statements under the given dialect.
pub fn parse_statements(sql: &str, dialect: Dialect) -> Result<Vec<Statement>, String> {
    Parser::parse_sql(sql_dialect(dialect).as_ref(), sql).map_err(|e| e.to_string())
}

/// Tokenize SQL text under the given dialect, keeping whitespace and comments.
pub fn tokenize(sql: &str, dialect: Dialect) -> Result<Vec<TokenWithSpan>, String> {
    Tokenizer::new(sql_dialect(dialect).as_ref(), sql)
        .tokenize_with_location()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_statements_counts_every_top_level_statement() {
        let stmts = parse_statements("SELECT 1; SELECT 2", Dialect::PostgreSql).unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn mssql_dialect_accepts_top_and_brackets() {
        let stmts =
            parse_statements("SELECT TOP 10 [id] FROM [dbo].[wallet]", Dialect::MsSql).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn tokenize_keeps_comments_as_whitespace() {
        use sqlparser::tokenizer::{Token, Whitespace};

        let tokens = tokenize("SELECT 1 -- note", Dialect::PostgreSql).unwrap();
        assert!(tokens.iter().any(|t| matches!(
            t.token,
            Token::Whitespace(Whitespace::SingleLineComment { .. })
        )));
    }

    #[test]
    fn parse_errors_are_reported_as_text() {
        let err = parse_statements("SELEC id FROM", Dialect::PostgreSql).unwrap_err();
        assert!(!err.is_empty());
    }
}
