#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use sql_firewall::results::Row;
use sql_firewall::validator::validate;
use sql_firewall::Policy;

pub(crate) fn mssql() -> Policy {
    Policy::mssql_debug()
}

pub(crate) fn postgres() -> Policy {
    Policy::postgres_secondary()
}

/// Taxonomy kind of the rejection, or `"Ok"` when the query validates.
pub(crate) fn verdict(sql: &str, policy: &Policy) -> &'static str {
    match validate(sql, policy) {
        Ok(_) => "Ok",
        Err(err) => err.kind(),
    }
}

pub(crate) fn rows(value: Value) -> Vec<Row> {
    serde_json::from_value(value).expect("rows should be a JSON array of objects")
}

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}
