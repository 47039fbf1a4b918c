use holdfast::{GuardedResource, Ledger, LedgerError};
use proptest::prelude::*;
use std::thread;

#[derive(Debug, Clone)]
enum Operation {
    Deposit(u16),
    Withdraw(u16),
    Batch(Vec<u16>),
}

fn other_thread_can_enter<T: Send>(resource: &GuardedResource<T>) -> bool {
    thread::scope(|s| s.spawn(|| resource.try_acquire_now().is_ok()).join().unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_depth_requires_matching_releases(depth in 1usize..24) {
        let resource = GuardedResource::new(());
        let mut guards = Vec::with_capacity(depth);
        for level in 1..=depth {
            let guard = resource.acquire().unwrap();
            assert_eq!(guard.depth(), level);
            guards.push(guard);
        }

        while let Some(guard) = guards.pop() {
            assert!(!other_thread_can_enter(&resource), "lock handed over with {} guards left", guards.len() + 1);
            drop(guard);
        }
        assert!(other_thread_can_enter(&resource));
    }
}

proptest! {
    #[test]
    fn test_ledger_matches_model(ops in proptest::collection::vec(
        prop_oneof![
            any::<u16>().prop_map(Operation::Deposit),
            any::<u16>().prop_map(Operation::Withdraw),
            proptest::collection::vec(any::<u16>(), 0..8).prop_map(Operation::Batch),
        ],
        1..64
    )) {
        let ledger = Ledger::new(0u64);
        let mut model: u64 = 0;

        for op in ops {
            match op {
                Operation::Deposit(amount) => {
                    model += u64::from(amount);
                    assert_eq!(ledger.deposit(u64::from(amount)).unwrap(), model);
                }
                Operation::Withdraw(amount) => {
                    let amount = u64::from(amount);
                    match ledger.withdraw(amount) {
                        Ok(taken) => {
                            assert!(model >= amount);
                            assert_eq!(taken, amount);
                            model -= amount;
                        }
                        Err(LedgerError::InsufficientFunds { balance, requested }) => {
                            assert!(model < amount);
                            assert_eq!((balance, requested), (model, amount));
                        }
                        Err(other) => panic!("unexpected failure: {other}"),
                    }
                }
                Operation::Batch(amounts) => {
                    let amounts: Vec<u64> = amounts.into_iter().map(u64::from).collect();
                    let taken = ledger.withdraw_batch(&amounts).unwrap();
                    for (&asked, &got) in amounts.iter().zip(&taken) {
                        if model >= asked {
                            assert_eq!(got, asked);
                            model -= asked;
                        } else {
                            assert_eq!(got, 0);
                        }
                    }
                }
            }
            assert_eq!(ledger.balance().unwrap(), model);
        }
    }
}
