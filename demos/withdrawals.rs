//! Concurrent withdrawals against one account, with and without the guard
//! held across the whole read-validate-write sequence.

use anyhow::Result;
use holdfast::{GuardedResource, Ledger, LedgerError};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("Guarded Withdrawals");
    println!("===================");

    // 1. One guard around the whole sequence.
    println!("\n1. Guard held across read-validate-write:");
    let account = Ledger::new(100i64);
    thread::scope(|s| {
        for teller in 0..2 {
            let account = &account;
            s.spawn(move || match account.withdraw(80) {
                Ok(amount) => println!("  Teller {teller}: withdrew {amount}"),
                Err(LedgerError::InsufficientFunds { balance, .. }) => {
                    println!("  Teller {teller}: refused, balance is {balance}");
                }
                Err(err) => println!("  Teller {teller}: {err}"),
            });
        }
    });
    println!("  Final balance: {}", account.balance()?);

    // 2. The same operations with the guard dropped between check and debit.
    println!("\n2. Guard released between validate and write:");
    let raw = GuardedResource::new(100i64);
    let validated = Barrier::new(2);
    thread::scope(|s| {
        for teller in 0..2 {
            let (raw, validated) = (&raw, &validated);
            s.spawn(move || {
                let ok = raw.with(|balance| *balance >= 80).unwrap_or(false);
                validated.wait();
                if ok && raw.with(|balance| *balance -= 80).is_ok() {
                    println!("  Teller {teller}: withdrew 80");
                }
            });
        }
    });
    println!("  Final balance: {} (overdrawn)", raw.with(|b| *b)?);

    // 3. Nested locking: a batch holds the guard and re-enters it per item.
    println!("\n3. Batch withdrawal (reentrant):");
    let account = Ledger::new(1_000i64);
    let taken = account.withdraw_batch(&[250, 500, 400, 100])?;
    println!("  Taken: {taken:?}, remaining {}", account.balance()?);

    // 4. Bounded waiting.
    println!("\n4. try_acquire against a busy account:");
    let busy = GuardedResource::new(5u32);
    let guard = busy.acquire()?;
    thread::scope(|s| {
        s.spawn(|| match busy.try_acquire(Duration::from_millis(20)) {
            Ok(_) => println!("  Unexpectedly acquired"),
            Err(err) => println!("  Gave up: {err}"),
        });
    });
    drop(guard);
    println!("  Payload untouched: {}", busy.with(|v| *v)?);

    Ok(())
}
