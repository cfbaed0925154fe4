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

//! Platform fee policy.
//!
//! The fee rate is host configuration, read at call time through
//! [`FeeRateSource`] so it stays injectable in tests. Misconfigured
//! rates never abort a posting: anything non-finite, unrepresentable,
//! or outside `[0, MAX_FEE_RATE]` silently falls back to
//! [`DEFAULT_FEE_RATE`].
//!
//! All monetary rounding goes through [`round2`]: two decimal places,
//! half away from zero on the scaled cents. The balance invariant of a
//! journal entry depends on this exact rule, since the farmer's net is
//! derived as `round2(gross - fee)`.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::env;

/// Fallback platform fee rate (2%).
pub const DEFAULT_FEE_RATE: f64 = 0.02;

/// Highest rate accepted from configuration (20%).
pub const MAX_FEE_RATE: f64 = 0.2;

/// Environment variable the default rate source reads.
pub const FEE_RATE_ENV: &str = "PLATFORM_FEE_RATE";

/// Rounds to two decimal places, half away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Gross split into platform fee and farmer net payable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: Decimal,
    pub farmer_net: Decimal,
}

/// Sanitized fee policy for a single posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    rate: Decimal,
}

impl FeePolicy {
    /// Builds a policy from a raw configured rate, substituting
    /// [`DEFAULT_FEE_RATE`] when the value is not a finite number in
    /// `[0, MAX_FEE_RATE]`.
    pub fn from_rate(raw: f64) -> Self {
        let rate = if raw.is_finite() && (0.0..=MAX_FEE_RATE).contains(&raw) {
            // from_f64 only fails for values Decimal cannot represent;
            // a bounded rate always converts.
            Decimal::from_f64(raw).unwrap_or(Self::default_rate())
        } else {
            Self::default_rate()
        };
        Self { rate }
    }

    fn default_rate() -> Decimal {
        dec!(0.02)
    }

    /// The effective (sanitized) rate.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Splits a gross amount into `fee = round2(gross * rate)` and
    /// `farmer_net = round2(gross - fee)`.
    pub fn split(&self, gross: Decimal) -> FeeSplit {
        let fee = round2(gross * self.rate);
        FeeSplit {
            fee,
            farmer_net: round2(gross - fee),
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::from_rate(DEFAULT_FEE_RATE)
    }
}

/// Where the raw configured fee rate comes from.
///
/// The engine reads the rate once per posting so configuration changes
/// apply to the next call without a restart.
pub trait FeeRateSource: Send + Sync {
    fn rate(&self) -> f64;
}

/// Reads [`FEE_RATE_ENV`] on every call.
///
/// Unset or unparsable values yield NaN, which [`FeePolicy::from_rate`]
/// turns into the default rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvFeeRate;

impl FeeRateSource for EnvFeeRate {
    fn rate(&self) -> f64 {
        env::var(FEE_RATE_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    }
}

/// Fixed rate, for tests and batch runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedFeeRate(pub f64);

impl FeeRateSource for FixedFeeRate {
    fn rate(&self) -> f64 {
        self.0
    }
}
