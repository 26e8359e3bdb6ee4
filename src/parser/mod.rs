/// Column references and literal extraction from SQL expressions.
pub mod expr;
/// Identifier and relation-name normalization (qualified names, quoted identifiers).
pub mod names;
/// Dialect-aware wrapper around `sqlparser`.
pub mod sql_parser;
