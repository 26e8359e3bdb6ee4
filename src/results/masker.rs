use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::parser::names::normalize_relation_name;
use crate::policy::Policy;

/// One result row: column name → value.
pub type Row = Map<String, Value>;

/// Replacement for a blocked value that was present.
pub const RESTRICTED_SET: &str = "[RESTRICTED:SET]";
/// Replacement for a blocked value that was null.
pub const RESTRICTED_NULL: &str = "[RESTRICTED:NULL]";

/// Union of the blocked columns of every table in `tables`.
fn blocked_names(tables: &[String], policy: &Policy) -> BTreeSet<String> {
    tables
        .iter()
        .filter_map(|table| policy.blocked_columns_for(&normalize_relation_name(table)))
        .flatten()
        .cloned()
        .collect()
}

/// Whether a result key names a blocked column.
///
/// A key matches a blocked name exactly or ends in `_<name>`, which covers
/// join-prefixed keys such as `wallet_signature`. Unrelated keys sharing
/// the suffix are masked as well.
fn is_masked_key(key: &str, blocked: &BTreeSet<String>) -> bool {
    let key = key.to_ascii_lowercase();
    blocked.contains(&key)
        || blocked.iter().any(|name| {
            key.strip_suffix(name.as_str())
                .is_some_and(|head| head.ends_with('_'))
        })
}

fn is_sentinel(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == RESTRICTED_SET || s == RESTRICTED_NULL)
}

fn sentinel_for(value: &Value) -> Value {
    if value.is_null() {
        Value::String(RESTRICTED_NULL.to_string())
    } else {
        Value::String(RESTRICTED_SET.to_string())
    }
}

/// Replace the values of blocked columns in place.
///
/// `tables` is the table list of the validated query. Values already holding
/// a sentinel are left alone, so masking twice changes nothing.
pub fn mask_rows(rows: &mut [Row], tables: &[String], policy: &Policy) {
    if rows.is_empty() {
        return;
    }
    let blocked = blocked_names(tables, policy);
    if blocked.is_empty() {
        return;
    }

    let mut masked = 0usize;
    for row in rows.iter_mut() {
        for (key, value) in row.iter_mut() {
            if is_masked_key(key, &blocked) && !is_sentinel(value) {
                *value = sentinel_for(value);
                masked += 1;
            }
        }
    }
    if masked > 0 {
        debug!(masked, rows = rows.len(), "masked blocked result values");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).expect("rows should deserialize")
    }

    #[test]
    fn blocked_values_become_sentinels() {
        let policy = Policy::postgres_secondary();
        let mut rows = rows(json!([
            {"id": 1, "preimage": "abc"},
            {"id": 2, "preimage": null}
        ]));
        mask_rows(&mut rows, &["swaps".to_string()], &policy);
        assert_eq!(
            Value::from(rows.into_iter().map(Value::Object).collect::<Vec<_>>()),
            json!([
                {"id": 1, "preimage": RESTRICTED_SET},
                {"id": 2, "preimage": RESTRICTED_NULL}
            ])
        );
    }

    #[test]
    fn keys_match_case_insensitively_and_by_underscore_suffix() {
        let policy = Policy::mssql_debug();
        let mut rows = rows(json!([{
            "Signature": "sig",
            "wallet_addressOwnershipProof": {"nested": true},
            "other_signature": 7,
            "signatureCount": 3,
            "id": 9
        }]));
        mask_rows(&mut rows, &["dbo.Wallet".to_string()], &policy);
        let row = &rows[0];
        assert_eq!(row["Signature"], json!(RESTRICTED_SET));
        assert_eq!(row["wallet_addressOwnershipProof"], json!(RESTRICTED_SET));
        assert_eq!(row["other_signature"], json!(RESTRICTED_SET));
        assert_eq!(row["signatureCount"], json!(3));
        assert_eq!(row["id"], json!(9));
    }

    #[test]
    fn tables_without_blocked_columns_leave_rows_untouched() {
        let policy = Policy::postgres_secondary();
        let original = rows(json!([{"id": 1, "preimage": "abc"}]));
        let mut masked = original.clone();
        mask_rows(&mut masked, &["referrals_log".to_string()], &policy);
        assert_eq!(masked, original);

        let mut empty: Vec<Row> = Vec::new();
        mask_rows(&mut empty, &["swaps".to_string()], &policy);
        assert!(empty.is_empty());
    }

    #[test]
    fn masking_is_idempotent() {
        let policy = Policy::postgres_secondary();
        let tables = vec!["reverseswaps".to_string()];
        let mut once = rows(json!([{"preimage": null, "minerFeeInvoicePreimage": "x"}]));
        mask_rows(&mut once, &tables, &policy);
        let mut twice = once.clone();
        mask_rows(&mut twice, &tables, &policy);
        assert_eq!(twice, once);
        assert_eq!(twice[0]["preimage"], json!(RESTRICTED_NULL));
    }
}
