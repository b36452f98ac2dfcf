//! # Parallel-Ledger Runtime
//!
//! Command-line entry point over one data directory.
//!
//! ```text
//! pl-runtime status
//! pl-runtime recover
//! pl-runtime seed accounts.json      # {"alice": 100, "bob": 0}
//! pl-runtime submit batch.json       # [Transaction, ...]
//! ```
//!
//! Configuration comes from the `PL_*` environment variables (see
//! `EngineConfig::from_env` and `TelemetryConfig::from_env`).

use anyhow::{bail, Context, Result};
use pl_runtime::{BatchEngine, EngineConfig};
use pl_telemetry::{init_telemetry, TelemetryConfig};
use shared_types::{AccountId, Balance, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const USAGE: &str = "usage: pl-runtime <status | recover | seed FILE | submit FILE>";

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = EngineConfig::from_env();
    let engine = BatchEngine::open(config).context("opening batch engine")?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["status"] => {
            println!("state      {}", engine.commit_state());
            println!("batch      {}", engine.commit_manager().batch_seq());
            println!("root       {}", hex::encode(engine.state_root()));
            println!("accounts   {}", engine.balances().len());
            println!("recovery   {}", if engine.needs_recovery() { "required" } else { "clean" });
        }
        ["recover"] => {
            let report = engine.recover_from_crash()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ["seed", file] => {
            let accounts: BTreeMap<String, Balance> = read_json(Path::new(file))?;
            let receipt = engine.seed_accounts(
                accounts
                    .into_iter()
                    .map(|(id, balance)| (AccountId::from(id), balance))
                    .collect(),
            )?;
            println!("batch {} root {}", receipt.batch_seq, receipt.root_hex());
        }
        ["submit", file] => {
            let batch: Vec<Transaction> = read_json(Path::new(file))?;
            let report = engine.submit(batch)?;
            for (tx, failure) in report.failed() {
                println!("{tx} failed: {failure}");
            }
            println!(
                "batch {} applied {} of {} in {} waves, root {}",
                report.receipt.batch_seq,
                report.applied().len(),
                report.outcomes.len(),
                report.wave_count(),
                report.receipt.root_hex()
            );
        }
        _ => bail!(USAGE),
    }

    info!("[pl-00] Done");
    Ok(())
}
