use sqlparser::ast::{Function, ObjectName};

/// Return the identifier without surrounding quotes.
///
/// Handles ANSI double quotes, MSSQL brackets, and backticks.
pub fn unquote_identifier(ident: &str) -> &str {
    for (open, close) in [('"', '"'), ('[', ']'), ('`', '`')] {
        if let Some(inner) = ident.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
            return inner;
        }
    }
    ident
}

/// Normalize an identifier for case-insensitive matching.
///
/// Trims whitespace, removes surrounding quotes on a single identifier,
/// and lowercases the result.
pub fn normalize_identifier(ident: &str) -> String {
    unquote_identifier(ident.trim()).to_ascii_lowercase()
}

/// Split a dotted name into its parts, ignoring dots inside quoted identifiers.
///
/// `"my.schema"."table.name"` splits into two parts, not four.
pub fn split_name_parts(name: &str) -> Vec<&str> {
    let mut closing: Option<char> = None;
    let mut start = 0usize;
    let mut parts = Vec::new();

    for (idx, ch) in name.char_indices() {
        match (closing, ch) {
            (Some(close), c) if c == close => closing = None,
            (Some(_), _) => {}
            (None, '"') => closing = Some('"'),
            (None, '`') => closing = Some('`'),
            (None, '[') => closing = Some(']'),
            (None, '.') => {
                parts.push(name[start..idx].trim());
                start = idx + 1;
            }
            (None, _) => {}
        }
    }
    parts.push(name[start..].trim());
    parts
}

/// Normalize a possibly qualified relation name to its bare lowercase relation.
///
/// Examples:
/// - `"public.swaps"` -> `"swaps"`
/// - `"[dbo].[Wallet]"` -> `"wallet"`
/// - `"\"ReverseSwaps\""` -> `"reverseswaps"`
pub fn normalize_relation_name(name: &str) -> String {
    split_name_parts(name.trim())
        .last()
        .map(|relation| normalize_identifier(relation))
        .unwrap_or_default()
}

/// Normalized parts of an AST object name, outermost qualifier first.
pub fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0
        .iter()
        .map(|part| normalize_identifier(&part.to_string()))
        .collect()
}

/// Terminal (unqualified) lowercase name of an AST object name.
pub fn object_relation_name(name: &ObjectName) -> String {
    object_name_parts(name).pop().unwrap_or_default()
}

/// Lowercase function name without any schema qualifier.
pub fn normalized_function_name(func: &Function) -> String {
    object_relation_name(&func.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_parts_handles_quoted_dots() {
        assert_eq!(
            split_name_parts(r#""my.schema"."table.name""#),
            vec![r#""my.schema""#, r#""table.name""#]
        );
        assert_eq!(
            split_name_parts("[srv.one].db.dbo.t"),
            vec!["[srv.one]", "db", "dbo", "t"]
        );
    }

    #[test]
    fn normalize_identifier_strips_every_quote_style() {
        assert_eq!(normalize_identifier(r#""Swaps""#), "swaps");
        assert_eq!(normalize_identifier("[Wallet]"), "wallet");
        assert_eq!(normalize_identifier("`Referrals`"), "referrals");
        assert_eq!(normalize_identifier("  plain "), "plain");
    }

    #[test]
    fn normalize_relation_name_handles_schema_quotes_and_case() {
        assert_eq!(normalize_relation_name("public.swaps"), "swaps");
        assert_eq!(normalize_relation_name("[dbo].[Wallet]"), "wallet");
        assert_eq!(normalize_relation_name(r#""ReverseSwaps""#), "reverseswaps");
        assert_eq!(normalize_relation_name("chainswaps"), "chainswaps");
    }
}
