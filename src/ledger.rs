//! Balances protected by a [`GuardedResource`].
//!
//! A withdrawal reads the balance, checks it covers the amount, and writes
//! the difference. All three steps run under one guard; two withdrawals can
//! never both validate against the same stale balance.

use core::fmt;
use std::error::Error;
use std::time::Duration;

use num_traits::{CheckedAdd, CheckedSub, Zero};

use crate::cell::{GuardedResource, ScopedGuard};
use crate::error::SyncError;

/// Numeric types a [`Ledger`] can hold.
pub trait Balance:
    Copy + PartialOrd + Zero + CheckedAdd + CheckedSub + fmt::Debug + fmt::Display + Send
{
}

impl<B> Balance for B where
    B: Copy + PartialOrd + Zero + CheckedAdd + CheckedSub + fmt::Debug + fmt::Display + Send
{
}

/// Why a ledger operation was refused.
#[derive(Debug)]
pub enum LedgerError<B> {
    /// The balance does not cover the withdrawal.
    InsufficientFunds {
        /// Balance at the time of the check.
        balance: B,
        /// Amount asked for.
        requested: B,
    },
    /// Negative amounts are not accepted.
    InvalidAmount(B),
    /// The result is not representable in `B`.
    Overflow,
    /// The balance could not be locked.
    Sync(SyncError),
}

impl<B> From<SyncError> for LedgerError<B> {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl<B: fmt::Display> fmt::Display for LedgerError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds { balance, requested } => {
                write!(f, "insufficient funds: balance {balance}, requested {requested}")
            }
            Self::InvalidAmount(amount) => write!(f, "invalid amount {amount}"),
            Self::Overflow => f.write_str("balance overflow"),
            Self::Sync(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<B: fmt::Debug + fmt::Display> Error for LedgerError<B> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(err) => Some(err),
            _ => None,
        }
    }
}

/// A balance that only changes under its guard.
///
/// # Examples
///
/// ```rust
/// use holdfast::{Ledger, LedgerError};
///
/// let account = Ledger::new(100i64);
/// assert_eq!(account.withdraw(80).unwrap(), 80);
/// assert!(matches!(
///     account.withdraw(80),
///     Err(LedgerError::InsufficientFunds { balance: 20, requested: 80 })
/// ));
/// ```
#[derive(Debug)]
pub struct Ledger<B> {
    balance: GuardedResource<B>,
}

impl<B: Balance> Ledger<B> {
    /// Opens a ledger with `opening` as its balance.
    pub const fn new(opening: B) -> Self {
        Self {
            balance: GuardedResource::new(opening),
        }
    }

    /// Current balance.
    ///
    /// # Errors
    /// [`LedgerError::Sync`] if the balance is poisoned.
    pub fn balance(&self) -> Result<B, LedgerError<B>> {
        let guard = self.balance.acquire()?;
        let balance = *guard.read();
        Ok(balance)
    }

    /// Adds `amount` and returns the new balance.
    ///
    /// # Errors
    /// Negative amounts, overflow, or a poisoned balance.
    pub fn deposit(&self, amount: B) -> Result<B, LedgerError<B>> {
        Self::validate(amount)?;
        let guard = self.balance.acquire()?;
        let mut balance = guard.write();
        *balance = balance.checked_add(&amount).ok_or(LedgerError::Overflow)?;
        Ok(*balance)
    }

    /// Withdraws `amount` if the balance covers it; returns the amount taken.
    ///
    /// # Errors
    /// [`LedgerError::InsufficientFunds`] leaves the balance unchanged.
    pub fn withdraw(&self, amount: B) -> Result<B, LedgerError<B>> {
        let guard = self.balance.acquire()?;
        Self::debit(&guard, amount)
    }

    /// Like [`withdraw`](Self::withdraw), waiting at most `timeout` for the lock.
    ///
    /// # Errors
    /// Additionally [`SyncError::LockTimeout`] (wrapped), with no change made.
    pub fn try_withdraw(&self, amount: B, timeout: Duration) -> Result<B, LedgerError<B>> {
        let guard = self.balance.try_acquire(timeout)?;
        Self::debit(&guard, amount)
    }

    /// Runs a series of withdrawals with no other thread in between.
    ///
    /// Holds the guard for the whole batch and calls [`withdraw`](Self::withdraw)
    /// for each amount, which re-enters the lock. Amounts the balance cannot
    /// cover are skipped and reported as zero; the batch is not all-or-nothing.
    ///
    /// # Errors
    /// Stops at the first negative amount or lock failure; earlier
    /// withdrawals stay applied.
    pub fn withdraw_batch(&self, amounts: &[B]) -> Result<Vec<B>, LedgerError<B>> {
        let _batch = self.balance.acquire()?;
        amounts
            .iter()
            .map(|&amount| match self.withdraw(amount) {
                Err(LedgerError::InsufficientFunds { .. }) => Ok(B::zero()),
                outcome => outcome,
            })
            .collect()
    }

    fn validate(amount: B) -> Result<(), LedgerError<B>> {
        if amount < B::zero() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn debit(guard: &ScopedGuard<'_, B>, amount: B) -> Result<B, LedgerError<B>> {
        Self::validate(amount)?;
        let mut balance = guard.write();
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance: *balance,
                requested: amount,
            });
        }
        *balance = balance.checked_sub(&amount).ok_or(LedgerError::Overflow)?;
        Ok(amount)
    }

    /// Consumes the ledger and returns the final balance.
    pub fn into_balance(self) -> B {
        self.balance.into_inner()
    }
}
