//! LazySingleton strategies side by side.
//!
//! Pass a strategy name (`eager`, `double_checked`, `once_guard`) to run just
//! that one; with no argument all three run.

use anyhow::{Context, Result};
use holdfast::{LazySingleton, Strategy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

struct Catalog {
    entries: Vec<String>,
}

fn load_catalog(loads: &AtomicUsize) -> Catalog {
    loads.fetch_add(1, Ordering::SeqCst);
    println!("  Loading catalog on {:?}...", thread::current().id());
    thread::sleep(Duration::from_millis(50));
    Catalog {
        entries: (0..3).map(|i| format!("item-{i}")).collect(),
    }
}

fn run(strategy: Strategy) {
    println!("\n{strategy}:");
    let loads = AtomicUsize::new(0);
    let started = Instant::now();

    let cell = match strategy {
        Strategy::Eager => LazySingleton::eager_with(|| load_catalog(&loads)),
        Strategy::DoubleChecked => LazySingleton::double_checked(),
        Strategy::OnceGuard => LazySingleton::once_guard(),
    };
    println!("  Constructed after {:?} ({} load(s))", started.elapsed(), loads.load(Ordering::SeqCst));

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let catalog = cell.get_or_init(|| load_catalog(&loads));
                assert_eq!(catalog.entries.len(), 3);
            });
        }
    });

    println!(
        "  8 readers done after {:?}, catalog loaded {} time(s)",
        started.elapsed(),
        loads.load(Ordering::SeqCst)
    );
}

fn main() -> Result<()> {
    println!("LazySingleton Strategies");
    println!("========================");

    let selected = match std::env::args().nth(1) {
        Some(name) => vec![name.parse::<Strategy>().context("choosing a strategy")?],
        None => Strategy::ALL.to_vec(),
    };

    for strategy in selected {
        run(strategy);
    }

    // A failing initializer leaves the cell ready for another try.
    println!("\nRetry after failure:");
    let cell: LazySingleton<u32> = LazySingleton::double_checked();
    if let Err(err) = cell.get_or_try_init(|| "42x".parse::<u32>()) {
        println!("  First attempt: {err}");
    }
    let value = cell.get_or_try_init(|| "42".parse::<u32>())?;
    println!("  Second attempt: {value} ({:?})", cell.state());

    Ok(())
}
