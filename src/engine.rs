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

//! The posting engine.
//!
//! [`Engine::post_payment_completed`] turns a completed payment into a
//! balanced journal entry splitting the gross amount into platform fee
//! revenue and farmer payable liability, exactly once per transaction.
//!
//! # Outcomes
//!
//! | Situation | Result |
//! |-----------|--------|
//! | First delivery of a completed payment | `Posted { idempotent: false }` |
//! | Redelivery (sequential or concurrent) | `Posted { idempotent: true }`, same entry id |
//! | Transaction not completed yet | `Rejected(TransactionNotCompleted)` |
//! | Gross amount not positive | `Rejected(InvalidAmount)` |
//! | Fee leaves a negative net | `Rejected(InvalidNetAmount)` |
//! | Transaction id unknown | `Err(TransactionNotFound)` |
//!
//! Rejections create no entry and no new accounts; the call is safe to
//! repeat once the transaction becomes eligible. The engine performs no
//! internal retries: the webhook layer owns retry and backoff on
//! transient store failures, and every write path here is idempotent,
//! so a full re-invocation after a partial failure is always safe.

use crate::accounts::ChartOfAccounts;
use crate::base::{EntryId, ReferenceKey, TransactionId};
use crate::entry::{EntryDraft, Journal, JournalLine};
use crate::error::PostingError;
use crate::fees::{EnvFeeRate, FeePolicy, FeeRateSource};
use crate::transaction::{TransactionStatus, TransactionStore};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a posting call was rejected without creating an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Transaction exists but is not in `completed` status yet.
    TransactionNotCompleted,
    /// Gross amount is zero or negative.
    InvalidAmount,
    /// Fee computation left a negative net payable.
    InvalidNetAmount,
}

impl RejectReason {
    /// Wire code carried back to the webhook layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionNotCompleted => "transaction_not_completed",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidNetAmount => "invalid_net_amount",
        }
    }
}

/// Result of a posting call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PostingOutcome {
    /// A balanced entry exists for the transaction. `idempotent` is
    /// true when the entry predated this call.
    Posted { entry_id: EntryId, idempotent: bool },
    /// The event was evaluated and found ineligible; nothing was
    /// written. Retryable once conditions change.
    Rejected { reason: RejectReason },
}

impl PostingOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(self, Self::Posted { .. })
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        match self {
            Self::Posted { entry_id, .. } => Some(*entry_id),
            Self::Rejected { .. } => None,
        }
    }
}

/// Double-entry posting engine.
///
/// Owns the chart of accounts and the journal; consumes the
/// marketplace's transaction store and a fee-rate source through trait
/// objects so the host wires in its own.
///
/// # Invariants
///
/// - Every posted entry is balanced (debits == credits) at creation
///   and immutable afterwards.
/// - One `(reference_type, reference_id)` key yields at most one entry,
///   under any interleaving of duplicate deliveries.
/// - The same farmer id always resolves to the same payable
///   sub-account.
pub struct Engine {
    chart: ChartOfAccounts,
    journal: Journal,
    transactions: Arc<dyn TransactionStore>,
    fee_rate: Arc<dyn FeeRateSource>,
}

impl Engine {
    /// Creates an engine reading the fee rate from the environment.
    pub fn new(transactions: Arc<dyn TransactionStore>) -> Self {
        Self::with_fee_rate(transactions, Arc::new(EnvFeeRate))
    }

    /// Creates an engine with an explicit fee-rate source.
    pub fn with_fee_rate(
        transactions: Arc<dyn TransactionStore>,
        fee_rate: Arc<dyn FeeRateSource>,
    ) -> Self {
        Self {
            chart: ChartOfAccounts::new(),
            journal: Journal::new(),
            transactions,
            fee_rate,
        }
    }

    /// Posts the journal entry for a completed payment, exactly once.
    ///
    /// # Errors
    ///
    /// - [`PostingError::TransactionNotFound`] when the id is unknown.
    /// - [`PostingError::Store`] when the transaction store fails.
    /// - Account/entry invariant violations
    ///   ([`PostingError::AccountTypeConflict`],
    ///   [`PostingError::UnbalancedEntry`]) indicate store corruption
    ///   or misconfiguration, not bad input.
    pub fn post_payment_completed(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<PostingOutcome, PostingError> {
        let reference = ReferenceKey::payment_completed(transaction_id);

        // Fast path: the entry already exists, nothing to write. The
        // race with a concurrent first delivery is closed again at
        // Journal::post below.
        if let Some(existing) = self.journal.get(&reference) {
            debug!(%transaction_id, entry_id = %existing.id(), "replay, entry already posted");
            return Ok(PostingOutcome::Posted {
                entry_id: existing.id(),
                idempotent: true,
            });
        }

        let transaction = self
            .transactions
            .lookup(transaction_id)?
            .ok_or_else(|| PostingError::TransactionNotFound(transaction_id.clone()))?;

        if transaction.status != TransactionStatus::Completed {
            debug!(%transaction_id, status = ?transaction.status, "transaction not completed yet");
            return Ok(PostingOutcome::Rejected {
                reason: RejectReason::TransactionNotCompleted,
            });
        }

        let gross = transaction.gross_amount;
        if gross <= Decimal::ZERO {
            debug!(%transaction_id, %gross, "non-positive gross amount");
            return Ok(PostingOutcome::Rejected {
                reason: RejectReason::InvalidAmount,
            });
        }

        // Fee rate is read per call so host configuration changes apply
        // without a restart.
        let policy = FeePolicy::from_rate(self.fee_rate.rate());
        let split = policy.split(gross);
        if split.farmer_net < Decimal::ZERO {
            debug!(%transaction_id, fee = %split.fee, "fee exceeds gross");
            return Ok(PostingOutcome::Rejected {
                reason: RejectReason::InvalidNetAmount,
            });
        }

        // Account upserts are idempotent; re-running them after a
        // partial failure is harmless.
        let base = self.chart.ensure_base_accounts()?;
        let farmer_account = self.chart.ensure_farmer_subledger(
            &transaction.farmer.id,
            &transaction.farmer.name,
            &base.payables_parent,
        )?;

        let draft = EntryDraft {
            reference,
            order_id: transaction.order_id.clone(),
            currency: transaction.currency.clone(),
            memo: format!("Payment {transaction_id} settlement"),
            lines: vec![
                JournalLine::debit(base.cash.id(), gross, "Gross payment received"),
                JournalLine::credit(
                    farmer_account.id(),
                    split.farmer_net,
                    format!("Net payable to {}", transaction.farmer.name),
                ),
                JournalLine::credit(base.fee_revenue.id(), split.fee, "Platform fee"),
            ],
        };

        // Balanced by construction: gross == farmer_net + fee. The
        // journal re-checks and owns the insert-if-absent race.
        let (entry, created) = self.journal.post(draft)?;
        if !created {
            debug!(%transaction_id, entry_id = %entry.id(), "lost posting race, reusing entry");
            return Ok(PostingOutcome::Posted {
                entry_id: entry.id(),
                idempotent: true,
            });
        }

        // Best-effort link-back. The entry is the source of truth; a
        // missing pointer is recoverable from the reference key.
        if let Err(error) = self
            .transactions
            .link_ledger_entry(transaction_id, entry.id())
        {
            warn!(%transaction_id, entry_id = %entry.id(), %error, "failed to link entry back to transaction");
        }

        debug!(%transaction_id, entry_id = %entry.id(), gross = %gross, fee = %split.fee, "posted journal entry");
        Ok(PostingOutcome::Posted {
            entry_id: entry.id(),
            idempotent: false,
        })
    }

    /// The journal backing this engine.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The chart of accounts backing this engine.
    pub fn chart(&self) -> &ChartOfAccounts {
        &self.chart
    }
}
