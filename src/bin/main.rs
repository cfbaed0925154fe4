// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use farm_ledger_rs::{
    Engine, EnvFeeRate, Farmer, FarmerId, FixedFeeRate, InMemoryTransactions, OrderId,
    PaymentTransaction, PostingError, PostingOutcome, TransactionId, TransactionStatus,
    TransactionStore,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ledger Poster - Post completed payments as journal entries
///
/// Reads payment events from a CSV file, posts each one through the
/// double-entry engine, and writes one result row per input row to
/// stdout. Redelivered events come back as idempotent successes.
#[derive(Parser, Debug)]
#[command(name = "farm-ledger-rs")]
#[command(about = "Posts completed marketplace payments as balanced journal entries", long_about = None)]
struct Args {
    /// Path to CSV file with payment events
    ///
    /// Expected format: tx,status,gross,currency,order,farmer_id,farmer_name
    /// Example: cargo run -- payments.csv > postings.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Platform fee rate override (otherwise PLATFORM_FEE_RATE applies)
    #[arg(long, value_name = "RATE")]
    fee_rate: Option<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // The CLI drives the engine against an in-memory store seeded from
    // the input rows; the host application would plug in its real one.
    let store = Arc::new(InMemoryTransactions::new());
    let engine = build_engine(&store, args.fee_rate);

    let results = match post_payments(BufReader::new(file), &store, &engine) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error processing payments: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_results(&results, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn build_engine(store: &Arc<InMemoryTransactions>, fee_rate: Option<f64>) -> Engine {
    match fee_rate {
        Some(rate) => {
            Engine::with_fee_rate(Arc::clone(store) as Arc<dyn TransactionStore>, Arc::new(FixedFeeRate(rate)))
        }
        None => Engine::with_fee_rate(Arc::clone(store) as Arc<dyn TransactionStore>, Arc::new(EnvFeeRate)),
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `tx, status, gross, currency, order, farmer_id, farmer_name`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    tx: String,
    status: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    gross: Option<Decimal>,
    currency: String,
    order: Option<String>,
    farmer_id: String,
    farmer_name: String,
}

impl CsvRecord {
    /// Converts a CSV record into a seedable transaction.
    ///
    /// Returns `None` for unknown statuses or a missing gross amount.
    fn into_transaction(self) -> Option<PaymentTransaction> {
        let status = match self.status.to_lowercase().as_str() {
            "completed" => TransactionStatus::Completed,
            "pending" => TransactionStatus::Pending,
            "failed" => TransactionStatus::Failed,
            "refunded" => TransactionStatus::Refunded,
            _ => return None,
        };
        Some(PaymentTransaction {
            id: TransactionId(self.tx),
            status,
            gross_amount: self.gross?,
            currency: self.currency,
            order_id: self.order.filter(|o| !o.is_empty()).map(OrderId),
            farmer: Farmer {
                id: FarmerId(self.farmer_id),
                name: self.farmer_name,
            },
            ledger_entry_id: None,
        })
    }
}

/// One output row per posting attempt, in the shape the webhook layer
/// reports: `tx, ok, entry, idempotent, reason`.
#[derive(Debug, Serialize)]
struct ResultRow {
    tx: String,
    ok: bool,
    entry: Option<u64>,
    idempotent: Option<bool>,
    reason: Option<&'static str>,
}

impl ResultRow {
    fn from_outcome(tx: &TransactionId, outcome: &PostingOutcome) -> Self {
        match outcome {
            PostingOutcome::Posted {
                entry_id,
                idempotent,
            } => Self {
                tx: tx.0.clone(),
                ok: true,
                entry: Some(entry_id.0),
                idempotent: Some(*idempotent),
                reason: None,
            },
            PostingOutcome::Rejected { reason } => Self {
                tx: tx.0.clone(),
                ok: false,
                entry: None,
                idempotent: None,
                reason: Some(reason.as_str()),
            },
        }
    }
}

/// Streams payment events from a CSV reader, seeds the store, and posts
/// each row through the engine.
///
/// Malformed rows are skipped. `TransactionNotFound` cannot occur here
/// (every posted row was just seeded); other posting errors abort the
/// run since they indicate invariant violations.
fn post_payments<R: Read>(
    reader: R,
    store: &InMemoryTransactions,
    engine: &Engine,
) -> Result<Vec<ResultRow>, Box<dyn std::error::Error>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut results = Vec::new();
    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("skipping malformed row: {e}");
                continue;
            }
        };
        let Some(transaction) = record.into_transaction() else {
            tracing::debug!("skipping invalid payment record");
            continue;
        };
        let tx = transaction.id.clone();
        store.insert(transaction);

        match engine.post_payment_completed(&tx) {
            Ok(outcome) => results.push(ResultRow::from_outcome(&tx, &outcome)),
            Err(e @ PostingError::TransactionNotFound(_)) => {
                tracing::warn!("transaction {tx} vanished mid-run: {e}");
            }
            Err(e) => return Err(Box::new(e)),
        }
    }
    Ok(results)
}

/// Writes result rows as CSV.
fn write_results<W: Write>(results: &[ResultRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for row in results {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
