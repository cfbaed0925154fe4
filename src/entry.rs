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

//! Journal entries and the append-only journal.
//!
//! An entry is an atomic, balanced group of debit/credit lines
//! recording one business event. Entries are validated once, inserted
//! once, and never mutated or deleted afterwards; a wrongly-posted
//! entry would be corrected by a future compensating entry, never in
//! place.
//!
//! [`Journal::post`] is the crate's insert-if-absent primitive: the
//! dashmap entry API serializes the idempotency check and the insert
//! for the same [`ReferenceKey`], which is what closes the race between
//! concurrent duplicate deliveries of the same payment event.

use crate::base::{AccountId, EntryId, OrderId, ReferenceKey};
use crate::error::PostingError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One side of a journal entry.
///
/// Built only through [`JournalLine::debit`] and [`JournalLine::credit`],
/// so a line never carries both a debit and a credit. Zero amounts are
/// allowed (a 0% fee still posts its line); negative amounts are
/// rejected when the entry is posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalLine {
    account_id: AccountId,
    debit: Decimal,
    credit: Decimal,
    memo: String,
}

impl JournalLine {
    pub fn debit(account_id: AccountId, amount: Decimal, memo: impl Into<String>) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            memo: memo.into(),
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal, memo: impl Into<String>) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            memo: memo.into(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn debit_amount(&self) -> Decimal {
        self.debit
    }

    pub fn credit_amount(&self) -> Decimal {
        self.credit
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }
}

/// Everything a caller supplies to post an entry; the journal assigns
/// the id and timestamp.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub reference: ReferenceKey,
    pub order_id: Option<OrderId>,
    pub currency: String,
    pub memo: String,
    pub lines: Vec<JournalLine>,
}

/// An immutable, balanced journal entry.
#[derive(Debug, Serialize)]
pub struct JournalEntry {
    id: EntryId,
    reference: ReferenceKey,
    order_id: Option<OrderId>,
    currency: String,
    memo: String,
    created_at: DateTime<Utc>,
    lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn reference(&self) -> &ReferenceKey {
        &self.reference
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[JournalLine] {
        &self.lines
    }

    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(JournalLine::debit_amount).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.lines.iter().map(JournalLine::credit_amount).sum()
    }
}

/// Append-only journal keyed by idempotency reference.
#[derive(Debug)]
pub struct Journal {
    entries: DashMap<ReferenceKey, Arc<JournalEntry>>,
    next_id: AtomicU64,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Posts an entry if none exists for its reference key.
    ///
    /// Returns the stored entry and `true` when this call created it,
    /// or the pre-existing entry and `false` on an idempotent replay.
    /// Validation runs before the key is taken: a draft must have at
    /// least one line, no negative amounts, and equal debit and credit
    /// totals.
    ///
    /// # Errors
    ///
    /// - [`PostingError::EmptyEntry`]
    /// - [`PostingError::NegativeLineAmount`]
    /// - [`PostingError::UnbalancedEntry`]
    pub fn post(&self, draft: EntryDraft) -> Result<(Arc<JournalEntry>, bool), PostingError> {
        Self::validate(&draft.lines)?;

        match self.entries.entry(draft.reference.clone()) {
            Entry::Occupied(existing) => Ok((Arc::clone(existing.get()), false)),
            Entry::Vacant(slot) => {
                let entry = Arc::new(JournalEntry {
                    id: EntryId(self.next_id.fetch_add(1, Ordering::Relaxed)),
                    reference: draft.reference,
                    order_id: draft.order_id,
                    currency: draft.currency,
                    memo: draft.memo,
                    created_at: Utc::now(),
                    lines: draft.lines,
                });
                slot.insert(Arc::clone(&entry));
                Ok((entry, true))
            }
        }
    }

    fn validate(lines: &[JournalLine]) -> Result<(), PostingError> {
        if lines.is_empty() {
            return Err(PostingError::EmptyEntry);
        }
        let mut debits = Decimal::ZERO;
        let mut credits = Decimal::ZERO;
        for line in lines {
            if line.debit < Decimal::ZERO {
                return Err(PostingError::NegativeLineAmount(line.debit));
            }
            if line.credit < Decimal::ZERO {
                return Err(PostingError::NegativeLineAmount(line.credit));
            }
            debits += line.debit;
            credits += line.credit;
        }
        if debits != credits {
            return Err(PostingError::UnbalancedEntry { debits, credits });
        }
        Ok(())
    }

    /// Looks up the entry posted for a reference key, if any.
    pub fn get(&self, reference: &ReferenceKey) -> Option<Arc<JournalEntry>> {
        self.entries.get(reference).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all posted entries.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, ReferenceKey, Arc<JournalEntry>>>
    {
        self.entries.iter()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balanced_draft(reference_id: &str) -> EntryDraft {
        EntryDraft {
            reference: ReferenceKey::new("payment_completed", reference_id),
            order_id: Some(OrderId::from("order-1")),
            currency: "BRL".to_owned(),
            memo: "Payment settlement".to_owned(),
            lines: vec![
                JournalLine::debit(AccountId(1), dec!(100.00), "gross"),
                JournalLine::credit(AccountId(2), dec!(98.00), "farmer net"),
                JournalLine::credit(AccountId(3), dec!(2.00), "platform fee"),
            ],
        }
    }

    #[test]
    fn post_creates_balanced_entry() {
        let journal = Journal::new();
        let (entry, created) = journal.post(balanced_draft("tx-1")).unwrap();

        assert!(created);
        assert_eq!(entry.total_debits(), dec!(100.00));
        assert_eq!(entry.total_credits(), dec!(100.00));
        assert_eq!(entry.lines().len(), 3);
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn post_same_key_twice_returns_existing() {
        let journal = Journal::new();
        let (first, created_first) = journal.post(balanced_draft("tx-1")).unwrap();
        let (second, created_second) = journal.post(balanced_draft("tx-1")).unwrap();

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.id(), second.id());
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn distinct_keys_create_distinct_entries() {
        let journal = Journal::new();
        let (first, _) = journal.post(balanced_draft("tx-1")).unwrap();
        let (second, _) = journal.post(balanced_draft("tx-2")).unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn unbalanced_draft_is_rejected() {
        let journal = Journal::new();
        let mut draft = balanced_draft("tx-1");
        draft.lines = vec![
            JournalLine::debit(AccountId(1), dec!(100.00), "gross"),
            JournalLine::credit(AccountId(2), dec!(99.00), "short"),
        ];

        let err = journal.post(draft).unwrap_err();
        assert_eq!(
            err,
            PostingError::UnbalancedEntry {
                debits: dec!(100.00),
                credits: dec!(99.00),
            }
        );
        assert!(journal.is_empty());
    }

    #[test]
    fn empty_draft_is_rejected() {
        let journal = Journal::new();
        let mut draft = balanced_draft("tx-1");
        draft.lines.clear();

        assert_eq!(journal.post(draft).unwrap_err(), PostingError::EmptyEntry);
    }

    #[test]
    fn negative_line_is_rejected() {
        let journal = Journal::new();
        let mut draft = balanced_draft("tx-1");
        draft.lines = vec![
            JournalLine::debit(AccountId(1), dec!(-10.00), "bad"),
            JournalLine::credit(AccountId(2), dec!(-10.00), "bad"),
        ];

        assert_eq!(
            journal.post(draft).unwrap_err(),
            PostingError::NegativeLineAmount(dec!(-10.00))
        );
        assert!(journal.is_empty());
    }

    #[test]
    fn zero_amount_line_is_allowed() {
        // A 0% fee keeps the three-line shape with a 0.00 credit.
        let journal = Journal::new();
        let mut draft = balanced_draft("tx-1");
        draft.lines = vec![
            JournalLine::debit(AccountId(1), dec!(50.00), "gross"),
            JournalLine::credit(AccountId(2), dec!(50.00), "farmer net"),
            JournalLine::credit(AccountId(3), dec!(0.00), "platform fee"),
        ];

        let (entry, created) = journal.post(draft).unwrap();
        assert!(created);
        assert_eq!(entry.lines().len(), 3);
    }

    #[test]
    fn lines_carry_one_side_only() {
        let debit = JournalLine::debit(AccountId(1), dec!(10.00), "d");
        assert_eq!(debit.debit_amount(), dec!(10.00));
        assert_eq!(debit.credit_amount(), Decimal::ZERO);

        let credit = JournalLine::credit(AccountId(1), dec!(10.00), "c");
        assert_eq!(credit.debit_amount(), Decimal::ZERO);
        assert_eq!(credit.credit_amount(), dec!(10.00));
    }
}
