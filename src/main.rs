//! CLI entry point for `sql-firewall`.

use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sql_firewall::policy::presets::{self, PRESETS};
use sql_firewall::results::{mask_rows, Row};
use sql_firewall::{FirewallError, Policy, QueryFirewall};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sql-firewall",
    about = "Validate, limit, and mask ad-hoc read-only SQL"
)]
struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a query and print the limited SQL or the rejection
    Check {
        #[command(flatten)]
        policy: PolicySource,

        /// SQL to check (read from stdin when omitted)
        sql: Option<String>,
    },
    /// Mask blocked columns in a JSON array of rows read from stdin
    Mask {
        #[command(flatten)]
        policy: PolicySource,

        /// Comma-separated tables the rows were selected from
        #[arg(long, value_delimiter = ',', required = true)]
        tables: Vec<String>,
    },
    /// Print the effective policy as JSON
    Policy {
        #[command(flatten)]
        policy: PolicySource,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PolicySource {
    /// Built-in policy (mssql-debug, postgres-secondary)
    #[arg(long)]
    preset: Option<String>,

    /// JSON policy document
    #[arg(long)]
    policy: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Verdict {
    Accepted {
        tables: Vec<String>,
        sql: String,
    },
    Rejected {
        kind: &'static str,
        message: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Command::Check { policy, sql } => run_check(load_policy(&policy), sql),
        Command::Mask { policy, tables } => run_mask(&load_policy(&policy), &tables),
        Command::Policy { policy } => match load_policy(&policy).to_json_pretty() {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(e) => fail(&format!("Error serializing policy: {e}")),
        },
    };
    process::exit(code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(2);
}

fn load_policy(source: &PolicySource) -> Policy {
    if let Some(name) = &source.preset {
        return match presets::find_preset(name) {
            Some(preset) => Policy::from(preset),
            None => {
                let known: Vec<&str> = PRESETS.iter().map(|preset| preset.name).collect();
                fail(&format!(
                    "Unknown preset '{name}'; expected one of: {}",
                    known.join(", ")
                ))
            }
        };
    }

    let Some(path) = &source.policy else {
        fail("Either --preset or --policy is required");
    };
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("Error reading {}: {e}", path.display())));
    Policy::from_json(&content).unwrap_or_else(|e| fail(&format!("Error loading policy: {e}")))
}

fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        fail(&format!("Error reading stdin: {e}"));
    }
    input
}

fn run_check(policy: Policy, sql: Option<String>) -> i32 {
    let sql = sql.unwrap_or_else(read_stdin);
    let firewall = QueryFirewall::new(policy);

    let (verdict, code) = match firewall.prepare(&sql) {
        Ok(prepared) => (
            Verdict::Accepted {
                tables: prepared.tables,
                sql: prepared.sql,
            },
            0,
        ),
        Err(err) => (rejection(&err), 1),
    };
    match serde_json::to_string(&verdict) {
        Ok(json) => {
            println!("{json}");
            code
        }
        Err(e) => fail(&format!("Error serializing verdict: {e}")),
    }
}

fn rejection(err: &FirewallError) -> Verdict {
    Verdict::Rejected {
        kind: err.kind(),
        message: err.to_string(),
    }
}

fn run_mask(policy: &Policy, tables: &[String]) -> i32 {
    let input = read_stdin();
    let mut rows: Vec<Row> = serde_json::from_str(&input)
        .unwrap_or_else(|e| fail(&format!("Expected a JSON array of row objects: {e}")));
    mask_rows(&mut rows, tables, policy);
    match serde_json::to_string_pretty(&rows) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => fail(&format!("Error serializing rows: {e}")),
    }
}
