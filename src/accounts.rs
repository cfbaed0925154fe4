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

//! Chart of accounts.
//!
//! Accounts are created lazily on first reference and never deleted.
//! The [`AccountCode`] is the natural key: [`ChartOfAccounts::ensure_account`]
//! is an atomic upsert by code, so concurrent first-time creation for
//! the same code can never produce duplicates. `name`, `parent_id`, and
//! `owner_id` are last-writer-wins; `code` and `account_type` are
//! write-once.
//!
//! # Example
//!
//! ```
//! use farm_ledger_rs::{AccountType, ChartOfAccounts};
//!
//! let chart = ChartOfAccounts::new();
//! let base = chart.ensure_base_accounts().unwrap();
//! assert_eq!(base.cash.account_type(), AccountType::Asset);
//! ```

use crate::base::{AccountCode, AccountId, FarmerId};
use crate::error::PostingError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cash clearing asset: funds received from the payment provider,
/// pending distribution.
pub const CASH_CLEARING_CODE: &str = "1000";
pub const CASH_CLEARING_NAME: &str = "Cash Clearing";

/// Parent liability rolling up all farmer payable sub-accounts.
pub const FARMER_PAYABLES_CODE: &str = "2000";
pub const FARMER_PAYABLES_NAME: &str = "Farmer Payables";

/// Revenue account collecting the platform fee.
pub const FEE_REVENUE_CODE: &str = "4000";
pub const FEE_REVENUE_NAME: &str = "Platform Fee Revenue";

/// Length of the farmer-id suffix embedded in a subledger code.
const SUBLEDGER_SUFFIX_LEN: usize = 6;

/// Classification of an account in the double-entry chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Asset,
    Liability,
    Revenue,
    Expense,
    Equity,
}

/// Mutable descriptive fields, updated on re-ensure.
#[derive(Debug, Clone)]
struct AccountDetails {
    name: String,
    parent_id: Option<AccountId>,
    owner_id: Option<FarmerId>,
}

/// A ledger account.
///
/// `id`, `code`, and `account_type` are fixed at creation. The
/// descriptive fields sit behind a mutex so a concurrent re-ensure can
/// rename the account without touching its identity.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    code: AccountCode,
    account_type: AccountType,
    details: Mutex<AccountDetails>,
}

impl Account {
    fn new(
        id: AccountId,
        code: AccountCode,
        account_type: AccountType,
        name: String,
        parent_id: Option<AccountId>,
        owner_id: Option<FarmerId>,
    ) -> Self {
        Self {
            id,
            code,
            account_type,
            details: Mutex::new(AccountDetails {
                name,
                parent_id,
                owner_id,
            }),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn code(&self) -> &AccountCode {
        &self.code
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn name(&self) -> String {
        self.details.lock().name.clone()
    }

    pub fn parent_id(&self) -> Option<AccountId> {
        self.details.lock().parent_id
    }

    pub fn owner_id(&self) -> Option<FarmerId> {
        self.details.lock().owner_id.clone()
    }

    /// Overwrites the mutable fields (last-writer-wins).
    fn update_details(
        &self,
        name: String,
        parent_id: Option<AccountId>,
        owner_id: Option<FarmerId>,
    ) {
        let mut details = self.details.lock();
        details.name = name;
        details.parent_id = parent_id;
        details.owner_id = owner_id;
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let details = self.details.lock();
        let mut state = serializer.serialize_struct("Account", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("type", &self.account_type)?;
        state.serialize_field("name", &details.name)?;
        state.serialize_field("parent", &details.parent_id)?;
        state.serialize_field("owner", &details.owner_id)?;
        state.end()
    }
}

/// The three fixed top-level accounts every posting touches.
#[derive(Debug, Clone)]
pub struct BaseAccounts {
    pub cash: Arc<Account>,
    pub payables_parent: Arc<Account>,
    pub fee_revenue: Arc<Account>,
}

/// Derives the deterministic subledger code for a farmer.
///
/// The code is the payables numeric root joined to a fixed-length
/// suffix of the farmer id (last [`SUBLEDGER_SUFFIX_LEN`] characters,
/// left-padded with `0`). Same farmer id, same code, in any process and
/// any call order. Changing this mapping would silently fragment
/// existing sub-accounts, so it is pinned down by unit tests.
pub fn farmer_subledger_code(farmer_id: &FarmerId) -> AccountCode {
    let chars: Vec<char> = farmer_id.as_str().chars().collect();
    let start = chars.len().saturating_sub(SUBLEDGER_SUFFIX_LEN);
    let suffix: String = chars[start..].iter().collect();
    AccountCode(format!(
        "{FARMER_PAYABLES_CODE}-{suffix:0>width$}",
        width = SUBLEDGER_SUFFIX_LEN
    ))
}

/// Concurrent chart of accounts keyed by account code.
#[derive(Debug)]
pub struct ChartOfAccounts {
    accounts: DashMap<AccountCode, Arc<Account>>,
    next_id: AtomicU64,
}

impl ChartOfAccounts {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Idempotent upsert by code.
    ///
    /// Creates the account if absent; otherwise refreshes the mutable
    /// fields and returns the existing identity. The dashmap entry API
    /// makes the check-and-create atomic, so two concurrent calls for a
    /// new code cannot both create it.
    ///
    /// # Errors
    ///
    /// [`PostingError::AccountTypeConflict`] if the code already exists
    /// with a different account type. Type is write-once: silently
    /// flipping it would corrupt the meaning of every posted line.
    pub fn ensure_account(
        &self,
        code: AccountCode,
        name: impl Into<String>,
        account_type: AccountType,
        parent_id: Option<AccountId>,
        owner_id: Option<FarmerId>,
    ) -> Result<Arc<Account>, PostingError> {
        let name = name.into();
        match self.accounts.entry(code) {
            Entry::Occupied(existing) => {
                let account = Arc::clone(existing.get());
                if account.account_type != account_type {
                    return Err(PostingError::AccountTypeConflict {
                        code: account.code.clone(),
                        existing: account.account_type,
                        requested: account_type,
                    });
                }
                account.update_details(name, parent_id, owner_id);
                Ok(account)
            }
            Entry::Vacant(slot) => {
                let id = AccountId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let account = Arc::new(Account::new(
                    id,
                    slot.key().clone(),
                    account_type,
                    name,
                    parent_id,
                    owner_id,
                ));
                slot.insert(Arc::clone(&account));
                Ok(account)
            }
        }
    }

    /// Ensures the three fixed top-level accounts exist.
    pub fn ensure_base_accounts(&self) -> Result<BaseAccounts, PostingError> {
        let cash = self.ensure_account(
            AccountCode::from(CASH_CLEARING_CODE),
            CASH_CLEARING_NAME,
            AccountType::Asset,
            None,
            None,
        )?;
        let payables_parent = self.ensure_account(
            AccountCode::from(FARMER_PAYABLES_CODE),
            FARMER_PAYABLES_NAME,
            AccountType::Liability,
            None,
            None,
        )?;
        let fee_revenue = self.ensure_account(
            AccountCode::from(FEE_REVENUE_CODE),
            FEE_REVENUE_NAME,
            AccountType::Revenue,
            None,
            None,
        )?;
        Ok(BaseAccounts {
            cash,
            payables_parent,
            fee_revenue,
        })
    }

    /// Ensures the payable sub-account tracking one farmer.
    ///
    /// The code comes from [`farmer_subledger_code`], so repeated calls
    /// for the same farmer always resolve to the same account.
    pub fn ensure_farmer_subledger(
        &self,
        farmer_id: &FarmerId,
        farmer_name: &str,
        parent: &Account,
    ) -> Result<Arc<Account>, PostingError> {
        self.ensure_account(
            farmer_subledger_code(farmer_id),
            format!("Payable - {farmer_name}"),
            AccountType::Liability,
            Some(parent.id()),
            Some(farmer_id.clone()),
        )
    }

    /// Looks up an account by code.
    pub fn get(&self, code: &AccountCode) -> Option<Arc<Account>> {
        self.accounts.get(code).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Iterates over all accounts (snapshot semantics per shard).
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, AccountCode, Arc<Account>>>
    {
        self.accounts.iter()
    }
}

impl Default for ChartOfAccounts {
    fn default() -> Self {
        Self::new()
    }
}
