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

//! Benchmarks for the posting engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Fresh postings across distinct transactions
//! - Idempotent replay of an already-posted transaction
//! - Scaling with the number of farmer subledgers

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use farm_ledger_rs::{
    Engine, Farmer, FarmerId, FixedFeeRate, InMemoryTransactions, OrderId, PaymentTransaction,
    TransactionId, TransactionStatus,
};
use rust_decimal::Decimal;
use std::sync::Arc;

fn seed(store: &InMemoryTransactions, tx: &str, farmer_id: &str) {
    store.insert(PaymentTransaction {
        id: TransactionId::from(tx),
        status: TransactionStatus::Completed,
        gross_amount: Decimal::new(100_000, 2),
        currency: "BRL".to_owned(),
        order_id: Some(OrderId::from("order-1")),
        farmer: Farmer {
            id: FarmerId::from(farmer_id),
            name: "Ana Souza".to_owned(),
        },
        ledger_entry_id: None,
    });
}

fn bench_fresh_postings(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh_postings");
    group.throughput(Throughput::Elements(1));
    group.bench_function("post_distinct", |b| {
        let store = Arc::new(InMemoryTransactions::new());
        let engine = Engine::with_fee_rate(Arc::clone(&store), Arc::new(FixedFeeRate(0.02)));
        let mut next = 0u64;
        b.iter(|| {
            next += 1;
            let tx = format!("tx-{next}");
            seed(&store, &tx, "farmer-1");
            black_box(
                engine
                    .post_payment_completed(&TransactionId(tx))
                    .unwrap(),
            )
        });
    });
    group.finish();
}

fn bench_idempotent_replay(c: &mut Criterion) {
    let store = Arc::new(InMemoryTransactions::new());
    let engine = Engine::with_fee_rate(Arc::clone(&store), Arc::new(FixedFeeRate(0.02)));
    seed(&store, "tx-hot", "farmer-1");
    engine
        .post_payment_completed(&TransactionId::from("tx-hot"))
        .unwrap();

    c.bench_function("idempotent_replay", |b| {
        b.iter(|| {
            black_box(
                engine
                    .post_payment_completed(&TransactionId::from("tx-hot"))
                    .unwrap(),
            )
        });
    });
}

fn bench_farmer_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("farmer_scaling");
    for farmers in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(farmers));
        group.bench_with_input(BenchmarkId::from_parameter(farmers), &farmers, |b, &farmers| {
            b.iter_batched(
                || {
                    let store = Arc::new(InMemoryTransactions::new());
                    for i in 0..farmers {
                        seed(&store, &format!("tx-{i}"), &format!("farmer-{i}"));
                    }
                    let engine = Engine::with_fee_rate(
                        Arc::clone(&store),
                        Arc::new(FixedFeeRate(0.02)),
                    );
                    (store, engine)
                },
                |(_store, engine)| {
                    for i in 0..farmers {
                        engine
                            .post_payment_completed(&TransactionId(format!("tx-{i}")))
                            .unwrap();
                    }
                    black_box(engine.journal().len())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fresh_postings,
    bench_idempotent_replay,
    bench_farmer_scaling
);
criterion_main!(benches);
