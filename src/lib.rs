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

//! # Farm Ledger
//!
//! This library provides a double-entry posting engine that converts
//! completed marketplace payments into immutable, balanced journal
//! entries: gross payment in, platform fee revenue and farmer payable
//! liability out, exactly once per payment event.
//!
//! ## Core Components
//!
//! - [`Engine`]: The posting engine; its sole public operation is
//!   [`Engine::post_payment_completed`]
//! - [`ChartOfAccounts`]: Lazy, idempotent account creation keyed by
//!   immutable account codes
//! - [`Journal`]: Append-only journal with atomic insert-if-absent by
//!   idempotency key
//! - [`FeePolicy`]: Bounded platform fee with a safe fallback rate
//! - [`TransactionStore`]: The seam to the marketplace's transaction
//!   records
//!
//! ## Example
//!
//! ```
//! use farm_ledger_rs::{
//!     Engine, Farmer, FarmerId, FixedFeeRate, InMemoryTransactions, OrderId,
//!     PaymentTransaction, TransactionId, TransactionStatus,
//! };
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryTransactions::new());
//! store.insert(PaymentTransaction {
//!     id: TransactionId::from("tx-1"),
//!     status: TransactionStatus::Completed,
//!     gross_amount: dec!(1000.00),
//!     currency: "BRL".to_owned(),
//!     order_id: Some(OrderId::from("order-1")),
//!     farmer: Farmer {
//!         id: FarmerId::from("farmer-1"),
//!         name: "Ana Souza".to_owned(),
//!     },
//!     ledger_entry_id: None,
//! });
//!
//! let engine = Engine::with_fee_rate(store, Arc::new(FixedFeeRate(0.02)));
//! let outcome = engine
//!     .post_payment_completed(&TransactionId::from("tx-1"))
//!     .unwrap();
//! assert!(outcome.is_posted());
//! ```
//!
//! ## Concurrency
//!
//! All shared mutation goes through two idempotent operations: the
//! account upsert by code and the entry insert-if-absent by reference
//! key. Both use the dashmap entry API as their uniqueness constraint,
//! so N concurrent deliveries of the same payment produce exactly one
//! entry, and postings for different transactions proceed in parallel
//! without any global lock.

pub mod accounts;
mod base;
mod engine;
pub mod entry;
pub mod error;
pub mod fees;
pub mod transaction;

pub use accounts::{
    Account, AccountType, BaseAccounts, ChartOfAccounts, farmer_subledger_code,
};
pub use base::{
    AccountCode, AccountId, EntryId, FarmerId, OrderId, REF_PAYMENT_COMPLETED, ReferenceKey,
    TransactionId,
};
pub use engine::{Engine, PostingOutcome, RejectReason};
pub use entry::{EntryDraft, Journal, JournalEntry, JournalLine};
pub use error::{PostingError, StoreError};
pub use fees::{EnvFeeRate, FeePolicy, FeeRateSource, FeeSplit, FixedFeeRate, round2};
pub use transaction::{
    Farmer, InMemoryTransactions, PaymentTransaction, TransactionStatus, TransactionStore,
};
