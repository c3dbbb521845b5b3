//! Blocking first-value fetch: wait for a stream's first emission, then
//! resolve instantly from the provider cache on the next ask

use std::thread;
use std::time::{Duration, Instant};

use patchbay::{Plug, Provider, Store, Subject};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    println!("=== Blocking Fetch ===\n");

    let users: Subject<Vec<String>> = Subject::new();
    let store = Store::builder().stream("users", users.clone()).build();
    let provider = Provider::new(store).expect("store has entries");
    let plug = Plug::new(|s| s.stream::<Vec<String>>("users"));

    println!("1. Simulated fetch completing after 300ms");
    let pusher = users.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        pusher.next(vec!["ada".to_string(), "grace".to_string()]);
    });

    println!("\n2. Blocking on the first value");
    let started = Instant::now();
    let first = plug.first_value(&provider.scope()).expect("combinator is valid");
    let value = first.wait();
    println!("   got {value:?} after {:?}", started.elapsed());

    println!("\n3. Asking again: served from the provider cache");
    let started = Instant::now();
    let again = plug.first_value(&provider.scope()).expect("combinator is valid");
    println!(
        "   resolved={} value={:?} after {:?}",
        again.is_resolved(),
        again.try_get(),
        started.elapsed()
    );
    println!(
        "   subscriptions left on the stream: {}",
        users.subscriber_count()
    );

    println!("\n✓ Blocking fetch demo complete!");
}
