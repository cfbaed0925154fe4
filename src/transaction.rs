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

//! Marketplace transaction records, as seen by the posting engine.
//!
//! The marketplace owns payment transactions; this crate only reads
//! them and writes back a single convenience pointer (the posted entry
//! id). [`TransactionStore`] is the seam: the host application plugs in
//! its real store, tests and the CLI use [`InMemoryTransactions`].

use crate::base::{EntryId, FarmerId, OrderId, TransactionId};
use crate::error::StoreError;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a marketplace payment transaction.
///
/// Only [`Completed`](TransactionStatus::Completed) transactions are
/// eligible for posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// The farmer owed the net proceeds of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: FarmerId,
    pub name: String,
}

/// A marketplace payment transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub gross_amount: Decimal,
    pub currency: String,
    pub order_id: Option<OrderId>,
    pub farmer: Farmer,
    /// Back-reference to the posted journal entry, if any.
    pub ledger_entry_id: Option<EntryId>,
}

/// Read access to marketplace transactions plus the best-effort
/// entry-id link-back.
///
/// Implementations must be safe to call from many posting calls at
/// once.
pub trait TransactionStore: Send + Sync {
    /// Looks up a transaction. `Ok(None)` means the id is unknown.
    fn lookup(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, StoreError>;

    /// Records the posted entry id on the transaction.
    ///
    /// Failures here are logged by the engine and never affect the
    /// posting outcome; the journal remains the source of truth.
    fn link_ledger_entry(&self, id: &TransactionId, entry_id: EntryId) -> Result<(), StoreError>;
}

/// DashMap-backed transaction store for tests and the CLI driver.
#[derive(Debug, Default)]
pub struct InMemoryTransactions {
    transactions: DashMap<TransactionId, PaymentTransaction>,
    /// When set, the next link-back calls fail with this error.
    fail_link: Mutex<Option<StoreError>>,
}

impl InMemoryTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a transaction record.
    pub fn insert(&self, transaction: PaymentTransaction) {
        self.transactions.insert(transaction.id.clone(), transaction);
    }

    /// Makes subsequent link-back calls fail, to exercise the
    /// best-effort path.
    pub fn fail_link_with(&self, error: StoreError) {
        *self.fail_link.lock() = Some(error);
    }

    pub fn clear_link_failure(&self) {
        *self.fail_link.lock() = None;
    }

    pub fn get(&self, id: &TransactionId) -> Option<PaymentTransaction> {
        self.transactions.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionStore for InMemoryTransactions {
    fn lookup(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self.transactions.get(id).map(|entry| entry.value().clone()))
    }

    fn link_ledger_entry(&self, id: &TransactionId, entry_id: EntryId) -> Result<(), StoreError> {
        if let Some(error) = self.fail_link.lock().clone() {
            return Err(error);
        }
        match self.transactions.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().ledger_entry_id = Some(entry_id);
                Ok(())
            }
            None => Err(StoreError::Unavailable(format!(
                "transaction {id} disappeared before link-back"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(id: &str, status: TransactionStatus) -> PaymentTransaction {
        PaymentTransaction {
            id: TransactionId::from(id),
            status,
            gross_amount: dec!(250.00),
            currency: "BRL".to_owned(),
            order_id: Some(OrderId::from("order-7")),
            farmer: Farmer {
                id: FarmerId::from("farmer-1"),
                name: "Ana Souza".to_owned(),
            },
            ledger_entry_id: None,
        }
    }

    #[test]
    fn lookup_returns_none_for_unknown_id() {
        let store = InMemoryTransactions::new();
        let found = store.lookup(&TransactionId::from("missing")).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn lookup_returns_inserted_record() {
        let store = InMemoryTransactions::new();
        store.insert(sample("tx-1", TransactionStatus::Completed));

        let found = store.lookup(&TransactionId::from("tx-1")).unwrap().unwrap();
        assert_eq!(found.status, TransactionStatus::Completed);
        assert_eq!(found.gross_amount, dec!(250.00));
    }

    #[test]
    fn link_back_sets_entry_id() {
        let store = InMemoryTransactions::new();
        store.insert(sample("tx-1", TransactionStatus::Completed));

        store
            .link_ledger_entry(&TransactionId::from("tx-1"), EntryId(99))
            .unwrap();
        let found = store.get(&TransactionId::from("tx-1")).unwrap();
        assert_eq!(found.ledger_entry_id, Some(EntryId(99)));
    }

    #[test]
    fn forced_link_failure_surfaces_error() {
        let store = InMemoryTransactions::new();
        store.insert(sample("tx-1", TransactionStatus::Completed));
        store.fail_link_with(StoreError::Unavailable("write timeout".into()));

        let result = store.link_ledger_entry(&TransactionId::from("tx-1"), EntryId(1));
        assert_eq!(
            result.unwrap_err(),
            StoreError::Unavailable("write timeout".into())
        );

        store.clear_link_failure();
        store
            .link_ledger_entry(&TransactionId::from("tx-1"), EntryId(1))
            .unwrap();
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::from_str::<TransactionStatus>("\"completed\"").unwrap(),
            TransactionStatus::Completed
        );
    }
}
