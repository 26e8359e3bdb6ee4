//! Per-database security policy: what a submitted query may never touch.
//!
//! A [`Policy`] is built once per protected database, either from one of the
//! built-in [`presets`] or from a JSON document, and then shared read-only.

/// Built-in policies expressed as static data records.
pub mod presets;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::parser::names::normalize_identifier;

/// SQL engine family a policy protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// Microsoft SQL Server (`TOP n`, `OFFSET ... FETCH` pagination).
    #[serde(rename = "mssql")]
    MsSql,
    /// PostgreSQL (`LIMIT n`).
    #[serde(rename = "postgresql")]
    PostgreSql,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MsSql => write!(f, "mssql"),
            Dialect::PostgreSql => write!(f, "postgresql"),
        }
    }
}

/// Immutable security policy for one protected database.
///
/// Every name is stored lowercase; lookups lowercase their input, so matching
/// is case-insensitive throughout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    dialect: Dialect,
    blocked_schemas: BTreeSet<String>,
    blocked_columns: BTreeMap<String, BTreeSet<String>>,
    dangerous_functions: BTreeSet<String>,
    max_results: u64,
    check_xml_json: bool,
    check_linked_servers: bool,
    blocked_table_prefixes: Vec<String>,
}

/// JSON shape accepted by [`Policy::from_json`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyDocument {
    dialect: Dialect,
    #[serde(default)]
    blocked_schemas: Vec<String>,
    #[serde(default)]
    blocked_columns: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    dangerous_functions: Vec<String>,
    max_results: u64,
    #[serde(default)]
    check_xml_json: bool,
    #[serde(default)]
    check_linked_servers: bool,
    #[serde(default)]
    blocked_table_prefixes: Vec<String>,
}

fn normalized_set<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    names
        .into_iter()
        .map(normalize_identifier)
        .filter(|name| !name.is_empty())
        .collect()
}

impl Policy {
    /// Load a policy from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(json)?;
        if document.max_results == 0 {
            return Err(PolicyError::Invalid(
                "max_results must be greater than zero".to_string(),
            ));
        }

        let mut blocked_columns: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (table, columns) in &document.blocked_columns {
            blocked_columns
                .entry(normalize_identifier(table))
                .or_default()
                .extend(normalized_set(columns.iter().map(String::as_str)));
        }

        Ok(Self {
            dialect: document.dialect,
            blocked_schemas: normalized_set(document.blocked_schemas.iter().map(String::as_str)),
            blocked_columns,
            dangerous_functions: normalized_set(
                document.dangerous_functions.iter().map(String::as_str),
            ),
            max_results: document.max_results,
            check_xml_json: document.check_xml_json,
            check_linked_servers: document.check_linked_servers,
            blocked_table_prefixes: normalized_set(
                document.blocked_table_prefixes.iter().map(String::as_str),
            )
            .into_iter()
            .collect(),
        })
    }

    /// Serialize the policy into the JSON shape accepted by [`Policy::from_json`].
    pub fn to_json_pretty(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in MSSQL debug-endpoint policy.
    pub fn mssql_debug() -> Self {
        Self::from(&presets::MSSQL_DEBUG)
    }

    /// Built-in PostgreSQL secondary-system policy.
    pub fn postgres_secondary() -> Self {
        Self::from(&presets::POSTGRES_SECONDARY)
    }

    /// Dialect queries are parsed and limited with.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Maximum number of rows a query may return.
    pub fn max_results(&self) -> u64 {
        self.max_results
    }

    /// Whether `FOR XML` / `FOR JSON` output clauses are rejected.
    pub fn check_xml_json(&self) -> bool {
        self.check_xml_json
    }

    /// Whether four-part linked-server names are rejected.
    pub fn check_linked_servers(&self) -> bool {
        self.check_linked_servers
    }

    /// Whether `schema` is a blocked schema (or database) name.
    pub fn is_blocked_schema(&self, schema: &str) -> bool {
        self.blocked_schemas.contains(&normalize_identifier(schema))
    }

    /// Blocked schema names.
    pub fn blocked_schemas(&self) -> impl Iterator<Item = &str> {
        self.blocked_schemas.iter().map(String::as_str)
    }

    /// Whether `function` (unqualified) is a dangerous function.
    pub fn is_dangerous_function(&self, function: &str) -> bool {
        self.dangerous_functions
            .contains(&normalize_identifier(function))
    }

    /// Blocked columns of `table`, if the table has any.
    pub fn blocked_columns_for(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.blocked_columns.get(&normalize_identifier(table))
    }

    /// Whether `table.column` is blocked.
    pub fn is_blocked_column(&self, table: &str, column: &str) -> bool {
        self.blocked_columns_for(table)
            .is_some_and(|columns| columns.contains(&normalize_identifier(column)))
    }

    /// Blocked prefix matched by an unqualified relation name, if any.
    pub fn blocked_table_prefix(&self, relation: &str) -> Option<&str> {
        let relation = normalize_identifier(relation);
        self.blocked_table_prefixes
            .iter()
            .find(|prefix| relation.starts_with(prefix.as_str()))
            .map(String::as_str)
    }
}

impl From<&presets::PresetData> for Policy {
    fn from(preset: &presets::PresetData) -> Self {
        Self {
            dialect: preset.dialect,
            blocked_schemas: normalized_set(preset.blocked_schemas.iter().copied()),
            blocked_columns: preset
                .blocked_columns
                .iter()
                .map(|(table, columns)| {
                    (
                        normalize_identifier(table),
                        normalized_set(columns.iter().copied()),
                    )
                })
                .collect(),
            dangerous_functions: normalized_set(preset.dangerous_functions.iter().copied()),
            max_results: preset.max_results,
            check_xml_json: preset.check_xml_json,
            check_linked_servers: preset.check_linked_servers,
            blocked_table_prefixes: normalized_set(preset.blocked_table_prefixes.iter().copied())
                .into_iter()
                .collect(),
        }
    }
}
