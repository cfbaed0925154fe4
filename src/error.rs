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

//! Error types for ledger posting.
//!
//! Business-rule rejections (transaction not completed, bad amounts)
//! are NOT errors; they come back as structured
//! [`PostingOutcome::Rejected`](crate::PostingOutcome) values. An
//! idempotent replay is not an error either. The variants below cover
//! genuine failures: missing transactions, collaborator outages, and
//! internal invariant violations.

use crate::accounts::AccountType;
use crate::base::{AccountCode, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Failure reported by an external collaborator store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not serve the request (I/O, timeout, etc.).
    #[error("transaction store unavailable: {0}")]
    Unavailable(String),
}

/// Ledger posting errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostingError {
    /// Referenced payment transaction does not exist
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Account code already exists with a different type
    #[error("account {code} already exists as {existing:?}, cannot re-ensure as {requested:?}")]
    AccountTypeConflict {
        code: AccountCode,
        existing: AccountType,
        requested: AccountType,
    },

    /// Entry debits and credits do not sum to the same total
    #[error("journal entry is not balanced: debits {debits} != credits {credits}")]
    UnbalancedEntry { debits: Decimal, credits: Decimal },

    /// Entry has no lines
    #[error("journal entry must contain at least one line")]
    EmptyEntry,

    /// A line carries a negative amount
    #[error("journal line amount must be non-negative, got {0}")]
    NegativeLineAmount(Decimal),

    /// External transaction store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
