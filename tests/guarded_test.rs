use holdfast::{GuardedResource, SyncError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PROBE: Duration = Duration::from_millis(15);

fn probe_from_other_thread<T: Send>(resource: &GuardedResource<T>) -> bool {
    thread::scope(|s| s.spawn(|| resource.try_acquire(PROBE).is_ok()).join().unwrap())
}

#[test]
fn test_reentrant_acquire_needs_matching_releases() {
    let resource = GuardedResource::new(String::new());

    let outer = resource.acquire().unwrap();
    let inner = resource.acquire().unwrap();
    assert_eq!(inner.depth(), 2);
    assert!(!probe_from_other_thread(&resource));

    drop(inner);
    assert!(!probe_from_other_thread(&resource), "released after one of two releases");

    drop(outer);
    assert!(probe_from_other_thread(&resource));
}

#[test]
fn test_nested_helper_calls_do_not_deadlock() {
    struct Registry {
        names: GuardedResource<Vec<String>>,
    }

    impl Registry {
        fn add(&self, name: &str) -> Result<(), SyncError> {
            self.names.with(|names| names.push(name.to_owned()))
        }

        fn add_pair(&self, a: &str, b: &str) -> Result<usize, SyncError> {
            let guard = self.names.acquire()?;
            self.add(a)?;
            self.add(b)?;
            let len = guard.read().len();
            Ok(len)
        }
    }

    let registry = Registry {
        names: GuardedResource::new(Vec::new()),
    };
    assert_eq!(registry.add_pair("x", "y").unwrap(), 2);
}

#[test]
fn test_acquire_blocks_until_release() {
    let resource = Arc::new(GuardedResource::new(0u32));
    let released = Arc::new(AtomicBool::new(false));

    let guard = resource.acquire().unwrap();
    let waiter = {
        let resource = Arc::clone(&resource);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            resource
                .with(|value| {
                    assert!(released.load(Ordering::SeqCst), "acquired while still held");
                    *value += 1;
                })
                .unwrap();
        })
    };

    thread::sleep(Duration::from_millis(30));
    *guard.write() = 10;
    released.store(true, Ordering::SeqCst);
    drop(guard);

    waiter.join().unwrap();
    assert_eq!(resource.with(|v| *v).unwrap(), 11);
}

#[test]
fn test_try_acquire_under_held_lock_leaves_payload() {
    let resource = GuardedResource::new(vec![1, 2, 3]);
    let guard = resource.acquire().unwrap();

    thread::scope(|s| {
        let outcome = s
            .spawn(|| match resource.try_acquire(PROBE) {
                Err(SyncError::LockTimeout(waited)) => waited,
                other => panic!("expected a timeout, got {:?}", other.map(|_| ())),
            })
            .join()
            .unwrap();
        assert_eq!(outcome, PROBE);
    });

    assert_eq!(*guard.read(), vec![1, 2, 3]);
}

#[test]
fn test_mutual_exclusion_under_contention() {
    let resource = GuardedResource::new(0usize);
    let inside = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..500 {
                    let guard = resource.acquire().unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    *guard.write() += 1;
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(resource.into_inner(), 4_000);
}

#[test]
fn test_poisoned_resource_informs_every_acquirer() {
    let resource = Arc::new(GuardedResource::new(vec![0u8; 4]));
    {
        let resource = Arc::clone(&resource);
        let died = thread::spawn(move || {
            resource
                .with(|bytes| {
                    bytes[0] = 1;
                    panic!("crashed between two writes");
                })
                .ok();
        })
        .join();
        assert!(died.is_err());
    }

    let refusals = thread::scope(|s| {
        (0..4)
            .map(|_| s.spawn(|| resource.acquire().err()))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|e| matches!(e, Some(SyncError::ResourcePoisoned)))
            .count()
    });
    assert_eq!(refusals, 4);

    let guard = resource.recover();
    assert_eq!(*guard.read(), vec![1, 0, 0, 0]);
    guard.write()[0] = 0;
    drop(guard);
    resource.clear_poison();
    assert!(resource.acquire().is_ok());
}
