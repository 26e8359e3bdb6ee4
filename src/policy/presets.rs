use super::Dialect;

/// A policy written down as plain data.
///
/// Onboarding another protected database means adding one of these records
/// (or shipping an equivalent JSON document), not new validation logic.
#[derive(Debug, Clone, Copy)]
pub struct PresetData {
    /// Preset identifier used by the CLI.
    pub name: &'static str,
    /// Dialect of the protected database.
    pub dialect: Dialect,
    /// Schema and database names that may never be referenced.
    pub blocked_schemas: &'static [&'static str],
    /// Table name with the columns of that table that may never be read.
    pub blocked_columns: &'static [(&'static str, &'static [&'static str])],
    /// Functions that may never be called.
    pub dangerous_functions: &'static [&'static str],
    /// Row cap enforced on every query.
    pub max_results: u64,
    /// Reject `FOR XML` / `FOR JSON`.
    pub check_xml_json: bool,
    /// Reject four-part linked-server names.
    pub check_linked_servers: bool,
    /// Prefixes of unqualified relation names resolved into a blocked schema.
    pub blocked_table_prefixes: &'static [&'static str],
}

/// Debug endpoint over the MSSQL wallet database.
pub const MSSQL_DEBUG: PresetData = PresetData {
    name: "mssql-debug",
    dialect: Dialect::MsSql,
    blocked_schemas: &["sys", "information_schema", "master", "msdb", "tempdb"],
    blocked_columns: &[
        ("wallet", &["signature", "addressOwnershipProof"]),
        ("lightning_wallet", &["adminKey", "invoiceKey"]),
        (
            "user_boltcard",
            &["k0", "k1", "k2", "prevK0", "prevK1", "prevK2", "otp", "uid"],
        ),
        ("wallet_provider", &["apiKey", "apiSecret"]),
        ("transaction_lightning", &["secret", "paymentRequest"]),
        ("payment_request", &["paymentRequest"]),
    ],
    dangerous_functions: &["openrowset", "openquery", "opendatasource", "openxml"],
    max_results: 10_000,
    check_xml_json: true,
    check_linked_servers: true,
    blocked_table_prefixes: &[],
};

/// Secondary PostgreSQL swap system.
pub const POSTGRES_SECONDARY: PresetData = PresetData {
    name: "postgres-secondary",
    dialect: Dialect::PostgreSql,
    blocked_schemas: &["pg_catalog", "information_schema", "pg_toast"],
    blocked_columns: &[
        ("referrals", &["apiKey", "apiSecret"]),
        ("swaps", &["preimage"]),
        ("reverseswaps", &["preimage", "minerFeeInvoicePreimage"]),
        ("chainswaps", &["preimage"]),
    ],
    dangerous_functions: &[
        "pg_read_file",
        "pg_read_binary_file",
        "pg_ls_dir",
        "lo_import",
        "lo_export",
        "dblink",
        "dblink_exec",
        "dblink_connect",
        "pg_sleep",
    ],
    max_results: 10_000,
    check_xml_json: false,
    check_linked_servers: false,
    blocked_table_prefixes: &["pg_"],
};

/// Every built-in preset.
pub const PRESETS: &[&PresetData] = &[&MSSQL_DEBUG, &POSTGRES_SECONDARY];

/// Look up a built-in preset by name.
pub fn find_preset(name: &str) -> Option<&'static PresetData> {
    PRESETS
        .iter()
        .copied()
        .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
}
